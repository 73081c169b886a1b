//! Core domain types for review datasets.

use chrono::NaiveDate;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// Version code used when a review carries no app version.
pub const UNKNOWN_VERSION: &str = "N/A";

// ---------------------------------------------------------------------------
// ReviewRecord
// ---------------------------------------------------------------------------

/// A single Google Play review row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReviewRecord {
    /// App version code, [`UNKNOWN_VERSION`] when absent.
    pub version: String,
    /// Reviewer language code (e.g. `en`, `zh-Hans`).
    pub language: String,
    /// Device codename.
    pub device: String,
    /// Calendar date of the review's last update.
    pub review_date: NaiveDate,
    /// Star rating, 1 to 5.
    pub star_rating: u8,
    /// Review title, often empty.
    pub title: String,
    /// Review body.
    pub body: String,
}

// ---------------------------------------------------------------------------
// ReviewDataset
// ---------------------------------------------------------------------------

/// An ordered, read-only collection of reviews.
///
/// All derived views (filters, partitions) are projections; the source rows
/// are never mutated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReviewDataset {
    records: Vec<ReviewRecord>,
}

impl ReviewDataset {
    pub fn new(records: Vec<ReviewRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[ReviewRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ReviewRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct version codes in first-occurrence order.
    pub fn versions(&self) -> Vec<&str> {
        distinct(self.records.iter().map(|r| r.version.as_str()))
    }

    /// Distinct language codes in first-occurrence order.
    pub fn languages(&self) -> Vec<&str> {
        distinct(self.records.iter().map(|r| r.language.as_str()))
    }

    /// A new dataset holding only the rows matching `keep`, order preserved.
    pub fn filtered<F>(&self, keep: F) -> Self
    where
        F: Fn(&ReviewRecord) -> bool,
    {
        Self {
            records: self.records.iter().filter(|r| keep(r)).cloned().collect(),
        }
    }
}

impl FromIterator<ReviewRecord> for ReviewDataset {
    fn from_iter<I: IntoIterator<Item = ReviewRecord>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a ReviewDataset {
    type Item = &'a ReviewRecord;
    type IntoIter = std::slice::Iter<'a, ReviewRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    values.collect::<IndexSet<_>>().into_iter().collect()
}
