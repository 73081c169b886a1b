//! Descriptive statistics over a review dataset.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use reviewlens_shared::ReviewDataset;

/// Row counts broken down the ways an analyst usually looks at an export.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DatasetStats {
    pub total: usize,
    /// Number of distinct reviewer languages.
    pub languages: usize,
    pub by_language: BTreeMap<String, usize>,
    pub by_version: BTreeMap<String, usize>,
    pub by_date: BTreeMap<NaiveDate, usize>,
    pub by_rating: BTreeMap<u8, usize>,
}

impl DatasetStats {
    pub fn compute(dataset: &ReviewDataset) -> Self {
        let mut stats = Self {
            total: dataset.len(),
            ..Default::default()
        };
        for r in dataset {
            *stats.by_language.entry(r.language.clone()).or_default() += 1;
            *stats.by_version.entry(r.version.clone()).or_default() += 1;
            *stats.by_date.entry(r.review_date).or_default() += 1;
            *stats.by_rating.entry(r.star_rating).or_default() += 1;
        }
        stats.languages = stats.by_language.len();
        stats
    }

    /// Percentage of rows with the given star rating, 0 for an empty dataset.
    pub fn rating_share(&self, rating: u8) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        let count = self.by_rating.get(&rating).copied().unwrap_or(0);
        count as f64 * 100.0 / self.total as f64
    }
}
