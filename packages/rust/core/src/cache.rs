//! Content-addressed cache of per-group analyses.
//!
//! A key is the SHA-256 of everything a group's analysis depends on: the
//! analysis mode, the template revision, the model id and the text of every
//! batch in order. Identical inputs hit; any difference misses.

use std::collections::HashMap;

use sha2::{Digest, Sha256};

use crate::batch::Batch;
use crate::prompts::{AnalysisMode, TEMPLATE_VERSION};
use crate::results::GroupAnalysis;

/// In-memory map from content key to finished analysis.
#[derive(Debug, Default)]
pub struct AnalysisCache {
    entries: HashMap<String, GroupAnalysis>,
}

impl AnalysisCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute the cache key for a group.
    pub fn key(mode: AnalysisMode, model_id: &str, batches: &[Batch]) -> String {
        let mut hasher = Sha256::new();
        for part in [mode.as_str(), TEMPLATE_VERSION, model_id] {
            hash_part(&mut hasher, part);
        }
        for batch in batches {
            hash_part(&mut hasher, &batch.text);
        }
        format!("{:x}", hasher.finalize())
    }

    pub fn get(&self, key: &str) -> Option<GroupAnalysis> {
        self.entries.get(key).cloned()
    }

    pub fn insert(&mut self, key: String, analysis: GroupAnalysis) {
        self.entries.insert(key, analysis);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Length-prefixed so `("ab", "c")` and `("a", "bc")` hash differently.
fn hash_part(hasher: &mut Sha256, part: &str) {
    hasher.update((part.len() as u64).to_le_bytes());
    hasher.update(part.as_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(text: &str) -> Batch {
        Batch {
            index: 0,
            text: text.into(),
            row_count: 1,
        }
    }

    #[test]
    fn key_is_deterministic() {
        let batches = [batch("a"), batch("b")];
        assert_eq!(
            AnalysisCache::key(AnalysisMode::ByVersion, "m", &batches),
            AnalysisCache::key(AnalysisMode::ByVersion, "m", &batches)
        );
    }

    #[test]
    fn key_depends_on_every_input() {
        let base = AnalysisCache::key(AnalysisMode::ByVersion, "m", &[batch("ab"), batch("c")]);
        assert_ne!(base, AnalysisCache::key(AnalysisMode::Ungrouped, "m", &[batch("ab"), batch("c")]));
        assert_ne!(base, AnalysisCache::key(AnalysisMode::ByVersion, "other", &[batch("ab"), batch("c")]));
        assert_ne!(base, AnalysisCache::key(AnalysisMode::ByVersion, "m", &[batch("a"), batch("bc")]));
        assert_ne!(base, AnalysisCache::key(AnalysisMode::ByVersion, "m", &[batch("c"), batch("ab")]));
    }

    #[test]
    fn get_returns_inserted_analysis() {
        let mut cache = AnalysisCache::new();
        let key = AnalysisCache::key(AnalysisMode::Ungrouped, "m", &[batch("x")]);
        assert!(cache.get(&key).is_none());

        let analysis = GroupAnalysis {
            xmldata: "<issues/>".into(),
            report: "r".into(),
        };
        cache.insert(key.clone(), analysis.clone());
        assert_eq!(cache.get(&key), Some(analysis));
        assert_eq!(cache.len(), 1);
        assert!(!cache.is_empty());
    }
}
