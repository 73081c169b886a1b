//! Grouper: partition a dataset by version and/or language, then split every
//! bucket into batches.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use reviewlens_shared::{Result, ReviewDataset, ReviewRecord};

use crate::batch::{self, Batch, ColumnSet};

/// How reviews are bucketed before analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Grouping {
    /// One bucket holding every review, version column dropped.
    Whole,
    /// One bucket per app version.
    Version,
    /// One bucket per reviewer language, version column dropped.
    Language,
    /// One bucket per (language, version) pair.
    LanguageThenVersion,
}

impl Grouping {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Whole => "whole",
            Self::Version => "version",
            Self::Language => "language",
            Self::LanguageThenVersion => "language-then-version",
        }
    }

    /// Columns serialized into this grouping's batches.
    pub fn columns(&self) -> ColumnSet {
        match self {
            Self::Whole | Self::Language => ColumnSet::WithoutVersion,
            Self::Version | Self::LanguageThenVersion => ColumnSet::Full,
        }
    }
}

impl fmt::Display for Grouping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies one bucket. Unset parts were not grouped on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupKey {
    pub language: Option<String>,
    pub version: Option<String>,
}

impl GroupKey {
    pub fn whole() -> Self {
        Self {
            language: None,
            version: None,
        }
    }

    pub fn version(version: impl Into<String>) -> Self {
        Self {
            language: None,
            version: Some(version.into()),
        }
    }

    pub fn language(language: impl Into<String>) -> Self {
        Self {
            language: Some(language.into()),
            version: None,
        }
    }

    pub fn language_version(language: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            language: Some(language.into()),
            version: Some(version.into()),
        }
    }

    fn matches(&self, record: &ReviewRecord) -> bool {
        self.language.as_deref().is_none_or(|l| l == record.language)
            && self.version.as_deref().is_none_or(|v| v == record.version)
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.language, &self.version) {
            (None, None) => f.write_str("all reviews"),
            (None, Some(v)) => write!(f, "version {v}"),
            (Some(l), None) => write!(f, "language {l}"),
            (Some(l), Some(v)) => write!(f, "language {l}, version {v}"),
        }
    }
}

/// Bucket keys for `grouping`, in first-occurrence order.
///
/// For [`Grouping::LanguageThenVersion`] every language is paired with every
/// version observed anywhere in the dataset, so a pair may have no rows.
pub fn keys(dataset: &ReviewDataset, grouping: Grouping) -> Vec<GroupKey> {
    match grouping {
        Grouping::Whole => vec![GroupKey::whole()],
        Grouping::Version => dataset.versions().into_iter().map(GroupKey::version).collect(),
        Grouping::Language => dataset
            .languages()
            .into_iter()
            .map(GroupKey::language)
            .collect(),
        Grouping::LanguageThenVersion => {
            let versions = dataset.versions();
            dataset
                .languages()
                .into_iter()
                .flat_map(|l| {
                    versions
                        .iter()
                        .map(move |v| GroupKey::language_version(l, *v))
                })
                .collect()
        }
    }
}

/// Rows per bucket, as borrowed views into `dataset`.
pub fn partition(
    dataset: &ReviewDataset,
    grouping: Grouping,
) -> IndexMap<GroupKey, Vec<&ReviewRecord>> {
    keys(dataset, grouping)
        .into_iter()
        .map(|key| {
            let rows = dataset.iter().filter(|r| key.matches(r)).collect();
            (key, rows)
        })
        .collect()
}

/// Partition `dataset` and split each bucket into batches.
pub fn group(
    dataset: &ReviewDataset,
    grouping: Grouping,
    max_chars: usize,
) -> Result<IndexMap<GroupKey, Vec<Batch>>> {
    let columns = grouping.columns();
    let mut groups = IndexMap::new();
    for (key, rows) in partition(dataset, grouping) {
        let batches = batch::split(rows, columns, max_chars).collect::<Result<Vec<_>>>()?;
        groups.insert(key, batches);
    }
    Ok(groups)
}
