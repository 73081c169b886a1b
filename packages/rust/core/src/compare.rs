//! Target-vs-baseline comparison over finished analyses.

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{info, instrument, warn};

use reviewlens_llm::ChatClient;
use reviewlens_shared::Result;

use crate::results::{LanguageVersionResults, VersionResults};
use crate::stages;

/// The two Compare inputs derived from a version map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompareSplit<'r> {
    /// `xmldata` of the target version; empty when the target is absent.
    pub target: &'r str,
    /// Every other version's `xmldata`, concatenated in map order.
    pub baseline: String,
    /// Whether the target version was present.
    pub found: bool,
}

/// Split a version map into target content and concatenated baselines.
pub fn split_target<'r>(results: &'r VersionResults, target: &str) -> CompareSplit<'r> {
    let mut split = CompareSplit {
        target: "",
        baseline: String::new(),
        found: false,
    };
    for (version, analysis) in results {
        if version == target {
            split.target = &analysis.xmldata;
            split.found = true;
        } else {
            split.baseline.push_str(&analysis.xmldata);
        }
    }
    split
}

/// `{language: comparison}`
pub type LanguageComparisons = IndexMap<String, String>;

/// A finished comparison, shaped like the analysis it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Comparison {
    ByVersion(String),
    ByVersionAndLanguage(LanguageComparisons),
}

impl Comparison {
    /// The comparison as one markdown document.
    pub fn render_markdown(&self) -> String {
        match self {
            Self::ByVersion(text) => format!("{}\n", text.trim_end()),
            Self::ByVersionAndLanguage(map) => {
                let mut out = String::new();
                for (lang, text) in map {
                    if !out.is_empty() {
                        out.push('\n');
                    }
                    out.push_str(&format!("## Language {lang}\n\n{}\n", text.trim_end()));
                }
                out
            }
        }
    }
}

/// Compare `target` against every other version. One model call.
///
/// An absent target is compared as empty content.
#[instrument(skip_all, fields(target_version = target, versions = results.len()))]
pub async fn compare_by_version<C: ChatClient>(
    target: &str,
    results: &VersionResults,
    client: &C,
) -> Result<String> {
    let split = split_target(results, target);
    if !split.found {
        warn!(target_version = target, "target version not in analysis results, comparing empty content");
    }
    let text = stages::compare(split.target, &split.baseline, target, client, None).await?;
    info!(target_version = target, "comparison complete");
    Ok(text)
}

/// Per-language comparison. One model call per language.
#[instrument(skip_all, fields(target_version = target, languages = results.len()))]
pub async fn compare_by_version_and_language<C: ChatClient>(
    target: &str,
    results: &LanguageVersionResults,
    client: &C,
) -> Result<LanguageComparisons> {
    let mut comparisons = LanguageComparisons::new();
    for (lang, versions) in results {
        let split = split_target(versions, target);
        if !split.found {
            warn!(target_version = target, lang = %lang, "target version missing for language, comparing empty content");
        }
        let text =
            stages::compare(split.target, &split.baseline, target, client, Some(lang.as_str())).await?;
        info!(target_version = target, lang = %lang, "comparison complete");
        comparisons.insert(lang.clone(), text);
    }
    Ok(comparisons)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::GroupAnalysis;
    use crate::testing::{Stage, StubClient};

    fn versions(pairs: &[(&str, &str)]) -> VersionResults {
        pairs
            .iter()
            .map(|(v, xml)| {
                (
                    (*v).to_string(),
                    GroupAnalysis {
                        xmldata: (*xml).to_string(),
                        report: format!("report {v}"),
                    },
                )
            })
            .collect()
    }

    #[test]
    fn split_target_concatenates_others_in_order() {
        let results = versions(&[("1.0", "<a/>"), ("2.0", "<t/>"), ("3.0", "<c/>")]);
        let split = split_target(&results, "2.0");
        assert!(split.found);
        assert_eq!(split.target, "<t/>");
        assert_eq!(split.baseline, "<a/><c/>");
    }

    #[test]
    fn split_target_missing_is_empty() {
        let results = versions(&[("1.0", "<a/>"), ("3.0", "<c/>")]);
        let split = split_target(&results, "2.0");
        assert!(!split.found);
        assert_eq!(split.target, "");
        assert_eq!(split.baseline, "<a/><c/>");
    }

    #[tokio::test]
    async fn compare_by_version_makes_one_call_with_target_content() {
        let client = StubClient::new();
        let results = versions(&[("1.0", "<version='1.0'/>"), ("2.0", "<version='2.0'/>")]);

        let text = compare_by_version("2.0", &results, &client).await.unwrap();
        assert_eq!(text, "comparison-1");

        let prompts = client.prompts(Stage::Compare);
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("<target>\n<version='2.0'/>\n</target>"));
        assert!(prompts[0].contains("<baseline>\n<version='1.0'/>\n</baseline>"));
        assert!(prompts[0].contains("**Comparative Report for Version 2.0**"));
    }

    #[tokio::test]
    async fn missing_target_still_compares() {
        let client = StubClient::new();
        let results = versions(&[("1.0", "<a/>")]);
        compare_by_version("9.9", &results, &client).await.unwrap();
        assert!(client.prompts(Stage::Compare)[0].contains("<target>\n\n</target>"));
    }

    #[tokio::test]
    async fn compare_by_language_calls_once_per_language() {
        let client = StubClient::new();
        let mut results = LanguageVersionResults::new();
        results.insert("en".into(), versions(&[("1.0", "<en1/>"), ("2.0", "<en2/>")]));
        results.insert("fr".into(), versions(&[("1.0", "<fr1/>")]));

        let comparisons = compare_by_version_and_language("2.0", &results, &client)
            .await
            .unwrap();

        assert_eq!(comparisons.keys().collect::<Vec<_>>(), vec!["en", "fr"]);
        let prompts = client.prompts(Stage::Compare);
        assert_eq!(prompts.len(), 2);
        assert!(prompts[0].contains("<target>\n<en2/>\n</target>"));
        assert!(prompts[0].contains("Language Code en**"));
        assert!(prompts[1].contains("<target>\n\n</target>"));
        assert!(prompts[1].contains("<baseline>\n<fr1/>\n</baseline>"));
    }

    #[test]
    fn markdown_sections_per_language() {
        let mut map = LanguageComparisons::new();
        map.insert("en".into(), "A".into());
        map.insert("fr".into(), "B".into());
        let md = Comparison::ByVersionAndLanguage(map).render_markdown();
        assert_eq!(md, "## Language en\n\nA\n\n## Language fr\n\nB\n");
    }
}
