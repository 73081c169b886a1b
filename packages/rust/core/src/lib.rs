//! Review analysis pipeline for ReviewLens.
//!
//! This crate ties together batching, grouping, the model stage chain and
//! the result/compare assembly into the four analysis entry points on
//! [`ReviewPipeline`]. It performs no I/O apart from [`export::export_run`].

pub mod batch;
pub mod cache;
pub mod compare;
pub mod export;
pub mod filter;
pub mod grouping;
pub mod pipeline;
pub mod prompts;
pub mod results;
pub mod stages;
pub mod stats;

#[cfg(test)]
mod testing;

pub use compare::{Comparison, compare_by_version, compare_by_version_and_language, split_target};
pub use filter::ReviewFilter;
pub use grouping::{GroupKey, Grouping};
pub use pipeline::{PipelineConfig, PipelineProgress, PipelineStats, ReviewPipeline, SilentProgress};
pub use results::{AnalysisResult, GroupAnalysis};
pub use stats::DatasetStats;
