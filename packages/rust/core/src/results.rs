//! Analysis result shapes returned by the pipeline.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::grouping::GroupKey;

/// Canonical issue markup and narrative report for one bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupAnalysis {
    /// Model-produced issue list. Opaque; never parsed.
    pub xmldata: String,
    /// Markdown report narrated from `xmldata`.
    pub report: String,
}

/// `{version: analysis}`
pub type VersionResults = IndexMap<String, GroupAnalysis>;

/// `{language: analysis}`
pub type LanguageResults = IndexMap<String, GroupAnalysis>;

/// `{language: {version: analysis}}`
pub type LanguageVersionResults = IndexMap<String, VersionResults>;

/// The output of any of the four analysis entry points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum AnalysisResult {
    ByVersion(VersionResults),
    ByVersionAndLanguage(LanguageVersionResults),
    Whole(GroupAnalysis),
    ByLanguage(LanguageResults),
}

impl AnalysisResult {
    /// Every bucket with its key, in result order.
    pub fn groups(&self) -> Vec<(GroupKey, &GroupAnalysis)> {
        match self {
            Self::ByVersion(map) => map
                .iter()
                .map(|(v, a)| (GroupKey::version(v.as_str()), a))
                .collect(),
            Self::ByVersionAndLanguage(map) => map
                .iter()
                .flat_map(|(l, versions)| {
                    versions
                        .iter()
                        .map(move |(v, a)| (GroupKey::language_version(l.as_str(), v.as_str()), a))
                })
                .collect(),
            Self::Whole(a) => vec![(GroupKey::whole(), a)],
            Self::ByLanguage(map) => map
                .iter()
                .map(|(l, a)| (GroupKey::language(l.as_str()), a))
                .collect(),
        }
    }

    pub fn group_count(&self) -> usize {
        match self {
            Self::ByVersionAndLanguage(map) => map.values().map(IndexMap::len).sum(),
            Self::Whole(_) => 1,
            Self::ByVersion(map) | Self::ByLanguage(map) => map.len(),
        }
    }

    /// All reports as one markdown document, one section per bucket.
    pub fn render_markdown(&self) -> String {
        let mut out = String::new();
        for (key, analysis) in self.groups() {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(&format!("## {}\n\n", capitalize(&key.to_string())));
            out.push_str(analysis.report.trim_end());
            out.push('\n');
        }
        out
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
