//! Instruction templates for the four model stages.
//!
//! Templates use `{name}` placeholders filled by [`render`]. Any change to a
//! template's wording must bump [`TEMPLATE_VERSION`] so cached analyses made
//! with the old wording are not reused.

use serde::{Deserialize, Serialize};

/// Revision of the template set. Part of every cache key.
pub const TEMPLATE_VERSION: &str = "1";

/// Shape of the issue markup requested from Analyze and Merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnalysisMode {
    /// `<version='…'>` blocks.
    ByVersion,
    /// `<version='…' lang='…'>` blocks.
    ByVersionAndLanguage,
    /// A single `<issues>` block, no version column.
    Ungrouped,
    /// `<issues lang='…'>` blocks, no version column.
    UngroupedByLanguage,
}

impl AnalysisMode {
    /// Stable tag used in cache keys and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ByVersion => "by-version",
            Self::ByVersionAndLanguage => "by-version-and-language",
            Self::Ungrouped => "ungrouped",
            Self::UngroupedByLanguage => "ungrouped-by-language",
        }
    }

    pub(crate) fn analyze_template(&self) -> String {
        let (columns, grouping_rule, example) = match self {
            Self::ByVersion => (
                COLUMNS_WITH_VERSION,
                "- Group the issue categories by app version code, wrapping each version in a <version='xyz'></version> tag.\n",
                example_blocks("<version='version_a'>", "<version='version_b'>", "</version>"),
            ),
            Self::ByVersionAndLanguage => (
                COLUMNS_WITH_VERSION,
                "- Group the issue categories by app version code and reviewer language, wrapping each pair in a <version='xyz' lang='abc'></version> tag.\n",
                example_blocks(
                    "<version='version_a' lang='abc'>",
                    "<version='version_b' lang='abc'>",
                    "</version>",
                ),
            ),
            Self::Ungrouped => (COLUMNS_WITHOUT_VERSION, "", example_block("<issues>", "</issues>")),
            Self::UngroupedByLanguage => (
                COLUMNS_WITHOUT_VERSION,
                "- Group the issue categories by reviewer language, wrapping each language in an <issues lang='abc'></issues> tag.\n",
                example_blocks("<issues lang='abc'>", "<issues lang='def'>", "</issues>"),
            ),
        };

        format!(
            "You are an assistant that identifies and categorizes negative app reviews. You read reviews in many languages.\n\
             Below, inside <review></review>, is a batch of Google Play reviews as a comma-separated table with a header line. \
             The columns are described in <format></format>. Follow the rules in <instructions></instructions>.\n\
             \n\
             <format>\n{columns}</format>\n\
             \n\
             <review>\n{{document}}\n</review>\n\
             \n\
             <instructions>\n\
             {grouping_rule}\
             - Put each category of negative feedback you find in a <category></category> tag. You choose the categories.\n\
             - Put the number of reviews in that category in a <count></count> tag.\n\
             - Explain in a <description></description> tag why players are unhappy about that category.\n\
             - Output well-formed markup containing only the tags shown in the example below.\n\
             - Do not quote the original review text.\n\
             </instructions>\n\
             \n\
             Answer in this shape:\n{example}"
        )
    }

    pub(crate) fn merge_template(&self) -> String {
        let example = match self {
            Self::ByVersion => {
                example_blocks("<version='version_a'>", "<version='version_b'>", "</version>")
            }
            Self::ByVersionAndLanguage => example_blocks(
                "<version='version_a' lang='abc'>",
                "<version='version_b' lang='abc'>",
                "</version>",
            ),
            Self::Ungrouped => example_block("<issues>", "</issues>"),
            Self::UngroupedByLanguage => {
                example_blocks("<issues lang='abc'>", "<issues lang='def'>", "</issues>")
            }
        };

        format!(
            "You are an assistant that consolidates categorized app review issues. You read many languages.\n\
             Inside <content></content> are issue lists produced from several batches of the same reviews. \
             Your task is to merge the issues with the same or similar meaning. Follow the rules in <instructions></instructions>.\n\
             \n\
             <content>\n{{reviews}}\n</content>\n\
             \n\
             <instructions>\n\
             - Merge issues whose categories have the same or a similar meaning into one issue.\n\
             - The <count></count> of a merged issue must be the sum of the counts of the issues it replaces.\n\
             - Keep the grouping tags of the input.\n\
             - Output only the merged markup.\n\
             </instructions>\n\
             \n\
             Answer in this shape:\n{example}"
        )
    }
}

const COLUMNS_WITH_VERSION: &str = "\
- App Version Code: version code of the app.\n\
- Reviewer Language: language code of the reviewer.\n\
- Device: codename of the reviewer's device.\n\
- Review Date: date the review was last updated.\n\
- Star Rating: star rating given with the review, 1 to 5.\n\
- Review Title: the review title.\n\
- Review Text: the review content.\n";

const COLUMNS_WITHOUT_VERSION: &str = "\
- Reviewer Language: language code of the reviewer.\n\
- Device: codename of the reviewer's device.\n\
- Review Date: date the review was last updated.\n\
- Star Rating: star rating given with the review, 1 to 5.\n\
- Review Title: the review title.\n\
- Review Text: the review content.\n";

const EXAMPLE_ISSUES: &str = "\
<issue>\n\
<category>issue x category</category>\n\
<count>how many reviews are in x category</count>\n\
<description>why players are dissatisfied with this category</description>\n\
</issue>\n\
<issue>\n\
<category>issue y category</category>\n\
<count>how many reviews are in y category</count>\n\
<description>why players are dissatisfied with this category</description>\n\
</issue>\n";

fn example_block(open: &str, close: &str) -> String {
    format!("{open}\n{EXAMPLE_ISSUES}{close}\n")
}

fn example_blocks(first: &str, second: &str, close: &str) -> String {
    format!("{}{}", example_block(first, close), example_block(second, close))
}

pub(crate) const REPORT_TEMPLATE: &str = "\
You are a multilingual assistant and a skilled writer.\n\
Inside <content></content> is a list of negative app review issues. \
Write an analysis of it in markdown, following the rules in <instructions></instructions>.\n\
\n\
<content>\n{reviews}\n</content>\n\
\n\
<instructions>\n\
- Use markdown. Bold text is allowed; headings are not.\n\
- Write in Simplified Chinese. Do not use Traditional Chinese.\n\
- Use exactly three sections: Summary, Key Issues Analysis and Conclusion.\n\
- Add up the counts of every issue and state the total in the Summary as: \"Total number of comments with non-empty and meaningful content is xx\".\n\
- In Key Issues Analysis, give each issue its own bullet with its count and its share of the total, as: \"Count:xxx, Percentage: yy.yy%\".\n\
- On a new line under each bullet, explain in detail what players are dissatisfied with and why.\n\
</instructions>\n";

pub(crate) const COMPARE_TEMPLATE: &str = "\
You are a multilingual assistant analyzing app review issues.\n\
Inside <target></target> is the issue analysis for the target version. \
Inside <baseline></baseline> are the issue analyses of one or more other versions. \
Compare the target against every baseline version, find the problems that are new in the target version \
and the problems that have become worse. Follow the rules in <instructions></instructions>.\n\
\n\
<target>\n{target}\n</target>\n\
<baseline>\n{baseline}\n</baseline>\n\
\n\
<instructions>\n\
- Write a full report in markdown in Simplified Chinese. Do not use Traditional Chinese.\n\
- Bold text is allowed; headings are not.\n\
- Do not include any markup tags in the report.\n\
- Explain your reasoning in detail and back it with the counts.\n\
- Describe every newly appeared problem in detail.\n\
- Describe every problem that has become more serious in detail.\n\
- The baseline may hold several versions; analyze each of them.\n\
- Start the report with this header: {header}\n\
</instructions>\n";

/// Header line the comparison report must open with.
pub(crate) fn compare_header(target_id: &str, lang: Option<&str>) -> String {
    match lang {
        Some(lang) => format!("**Comparative Report for Version {target_id}, Language Code {lang}**"),
        None => format!("**Comparative Report for Version {target_id}**"),
    }
}

/// Fill `{name}` placeholders in one pass.
///
/// Substituted values are not scanned again, so review text containing
/// braces is inserted verbatim. Unknown placeholders are left untouched.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let extra: usize = vars.iter().map(|(_, v)| v.len()).sum();
    let mut out = String::with_capacity(template.len() + extra);
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];

        let replaced = after.find('}').and_then(|close| {
            let name = &after[..close];
            vars.iter()
                .find(|(k, _)| *k == name)
                .map(|(_, value)| (*value, close))
        });

        match replaced {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}
