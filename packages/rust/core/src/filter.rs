//! Row selection applied before analysis.

use chrono::NaiveDate;

use reviewlens_shared::{Result, ReviewDataset, ReviewLensError, ReviewRecord};

/// Which reviews to keep. An empty list places no constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReviewFilter {
    pub ratings: Vec<u8>,
    pub versions: Vec<String>,
    pub languages: Vec<String>,
    /// Inclusive lower date bound.
    pub since: Option<NaiveDate>,
    /// Inclusive upper date bound.
    pub until: Option<NaiveDate>,
}

impl ReviewFilter {
    /// Reject ratings outside 1-5 and inverted date ranges.
    pub fn validate(&self) -> Result<()> {
        if let Some(bad) = self.ratings.iter().find(|r| !(1..=5).contains(*r)) {
            return Err(ReviewLensError::validation(format!(
                "star rating {bad} is not between 1 and 5"
            )));
        }
        if let (Some(since), Some(until)) = (self.since, self.until) {
            if since > until {
                return Err(ReviewLensError::validation(format!(
                    "date range is empty: {since} is after {until}"
                )));
            }
        }
        Ok(())
    }

    pub fn matches(&self, record: &ReviewRecord) -> bool {
        (self.ratings.is_empty() || self.ratings.contains(&record.star_rating))
            && (self.versions.is_empty() || self.versions.iter().any(|v| *v == record.version))
            && (self.languages.is_empty() || self.languages.iter().any(|l| *l == record.language))
            && self.since.is_none_or(|d| record.review_date >= d)
            && self.until.is_none_or(|d| record.review_date <= d)
    }

    /// The matching rows as a new dataset, order preserved.
    pub fn apply(&self, dataset: &ReviewDataset) -> ReviewDataset {
        dataset.filtered(|r| self.matches(r))
    }
}
