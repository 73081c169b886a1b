//! Review analysis orchestrator.
//!
//! Drives Grouper → Analyze → Merge → Report across every bucket of a
//! dataset, strictly one model call at a time, and assembles the nested
//! result maps. Four entry points cover the supported groupings.

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{info, instrument, warn};

use reviewlens_llm::ChatClient;
use reviewlens_shared::{AppConfig, Result, ReviewDataset, ReviewLensError};

use crate::batch::{self, Batch, ColumnSet, DEFAULT_BATCH_MAX_CHARS};
use crate::cache::AnalysisCache;
use crate::grouping::{self, GroupKey, Grouping};
use crate::prompts::AnalysisMode;
use crate::results::{
    GroupAnalysis, LanguageResults, LanguageVersionResults, VersionResults,
};
use crate::stages;

/// Report text used for a bucket with no reviews.
pub const NO_REVIEWS_REPORT: &str = "No reviews in this group; nothing to analyze.";

/// Tunables for a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Upper bound on characters per batch.
    pub batch_max_chars: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_max_chars: DEFAULT_BATCH_MAX_CHARS,
        }
    }
}

impl PipelineConfig {
    /// The batch budget must leave room for the widest header line plus a
    /// row, whatever the grouping.
    pub fn validate(&self) -> Result<()> {
        batch::check_budget(ColumnSet::Full, self.batch_max_chars)
    }
}

impl TryFrom<&AppConfig> for PipelineConfig {
    type Error = ReviewLensError;

    fn try_from(config: &AppConfig) -> Result<Self> {
        let pipeline = Self {
            batch_max_chars: config.analysis.batch_max_chars,
        };
        pipeline.validate()?;
        Ok(pipeline)
    }
}

/// Progress callback for pipeline runs.
pub trait PipelineProgress: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Batch-level progress within the current group.
    fn task_progress(&self, current: usize, total: usize, detail: &str);
    /// Called once per group as soon as its report exists.
    fn report_ready(&self, group: &GroupKey, report: &str);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl PipelineProgress for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn task_progress(&self, _current: usize, _total: usize, _detail: &str) {}
    fn report_ready(&self, _group: &GroupKey, _report: &str) {}
}

/// Counters accumulated over the lifetime of a pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PipelineStats {
    pub groups: usize,
    pub empty_groups: usize,
    pub batches: usize,
    pub analyze_calls: usize,
    pub merge_calls: usize,
    pub report_calls: usize,
    pub cache_hits: usize,
    pub cache_misses: usize,
}

/// Sequential review analysis over one chat client.
pub struct ReviewPipeline<'a, C: ChatClient> {
    client: &'a C,
    config: PipelineConfig,
    progress: &'a dyn PipelineProgress,
    cache: AnalysisCache,
    stats: PipelineStats,
}

impl<'a, C: ChatClient> ReviewPipeline<'a, C> {
    pub fn new(client: &'a C, config: PipelineConfig, progress: &'a dyn PipelineProgress) -> Self {
        Self {
            client,
            config,
            progress,
            cache: AnalysisCache::new(),
            stats: PipelineStats::default(),
        }
    }

    pub fn stats(&self) -> &PipelineStats {
        &self.stats
    }

    pub fn cache(&self) -> &AnalysisCache {
        &self.cache
    }

    /// `{version: {xmldata, report}}`
    #[instrument(skip_all, fields(rows = dataset.len()))]
    pub async fn analyze_by_version(&mut self, dataset: &ReviewDataset) -> Result<VersionResults> {
        let groups = self.split(dataset, Grouping::Version)?;
        let mut results = VersionResults::new();
        for (key, batches) in groups {
            let analysis = self
                .analyze_group(&key, &batches, AnalysisMode::ByVersion)
                .await?;
            results.insert(key.version.unwrap_or_default(), analysis);
        }
        Ok(results)
    }

    /// `{language: {version: {xmldata, report}}}`
    ///
    /// Every language gets an entry for every version in the dataset; pairs
    /// without reviews hold the empty-group result.
    #[instrument(skip_all, fields(rows = dataset.len()))]
    pub async fn analyze_by_version_and_language(
        &mut self,
        dataset: &ReviewDataset,
    ) -> Result<LanguageVersionResults> {
        let groups = self.split(dataset, Grouping::LanguageThenVersion)?;
        let mut results = LanguageVersionResults::new();
        for (key, batches) in groups {
            let analysis = self
                .analyze_group(&key, &batches, AnalysisMode::ByVersionAndLanguage)
                .await?;
            results
                .entry(key.language.unwrap_or_default())
                .or_insert_with(IndexMap::new)
                .insert(key.version.unwrap_or_default(), analysis);
        }
        Ok(results)
    }

    /// One analysis over all reviews, version column dropped.
    #[instrument(skip_all, fields(rows = dataset.len()))]
    pub async fn analyze_ignoring_version(
        &mut self,
        dataset: &ReviewDataset,
    ) -> Result<GroupAnalysis> {
        let groups = self.split(dataset, Grouping::Whole)?;
        let mut result = GroupAnalysis::default();
        for (key, batches) in groups {
            result = self
                .analyze_group(&key, &batches, AnalysisMode::Ungrouped)
                .await?;
        }
        Ok(result)
    }

    /// `{language: {xmldata, report}}`, version column dropped.
    #[instrument(skip_all, fields(rows = dataset.len()))]
    pub async fn analyze_by_language_ignoring_version(
        &mut self,
        dataset: &ReviewDataset,
    ) -> Result<LanguageResults> {
        let groups = self.split(dataset, Grouping::Language)?;
        let mut results = LanguageResults::new();
        for (key, batches) in groups {
            let analysis = self
                .analyze_group(&key, &batches, AnalysisMode::UngroupedByLanguage)
                .await?;
            results.insert(key.language.unwrap_or_default(), analysis);
        }
        Ok(results)
    }

    fn split(
        &self,
        dataset: &ReviewDataset,
        grouping: Grouping,
    ) -> Result<IndexMap<GroupKey, Vec<Batch>>> {
        self.config.validate()?;
        self.progress.phase("Splitting reviews into batches");
        let groups = grouping::group(dataset, grouping, self.config.batch_max_chars)?;
        info!(
            grouping = grouping.as_str(),
            groups = groups.len(),
            batches = groups.values().map(Vec::len).sum::<usize>(),
            "dataset split"
        );
        Ok(groups)
    }

    /// Analyze → (Merge) → Report for one bucket.
    #[instrument(skip_all, fields(group = %key, batches = batches.len()))]
    async fn analyze_group(
        &mut self,
        key: &GroupKey,
        batches: &[Batch],
        mode: AnalysisMode,
    ) -> Result<GroupAnalysis> {
        self.stats.groups += 1;
        self.stats.batches += batches.len();

        if batches.is_empty() {
            warn!(group = %key, "group has no reviews, skipping model calls");
            self.stats.empty_groups += 1;
            let analysis = GroupAnalysis {
                xmldata: String::new(),
                report: NO_REVIEWS_REPORT.to_string(),
            };
            self.progress.report_ready(key, &analysis.report);
            return Ok(analysis);
        }

        let client = self.client;
        let cache_key = AnalysisCache::key(mode, client.model_id(), batches);
        if let Some(cached) = self.cache.get(&cache_key) {
            self.stats.cache_hits += 1;
            info!(group = %key, "analysis cache hit");
            self.progress.report_ready(key, &cached.report);
            return Ok(cached);
        }
        self.stats.cache_misses += 1;

        self.progress.phase(&format!("Analyzing {key}"));
        let mut outputs = Vec::with_capacity(batches.len());
        for batch in batches {
            self.progress.task_progress(
                batch.index + 1,
                batches.len(),
                &format!("{key}: batch {} ({} reviews)", batch.index + 1, batch.row_count),
            );
            outputs.push(stages::analyze(&batch.text, client, mode).await?);
            self.stats.analyze_calls += 1;
        }

        let xmldata = if outputs.len() == 1 {
            outputs.remove(0)
        } else {
            self.progress.phase(&format!("Merging {key}"));
            let merged = stages::merge(&outputs.concat(), client, mode).await?;
            self.stats.merge_calls += 1;
            merged
        };

        self.progress.phase(&format!("Writing report for {key}"));
        let report = stages::report(&xmldata, client).await?;
        self.stats.report_calls += 1;

        let analysis = GroupAnalysis { xmldata, report };
        self.cache.insert(cache_key, analysis.clone());
        self.progress.report_ready(key, &analysis.report);

        info!(
            group = %key,
            batches = batches.len(),
            merged = batches.len() > 1,
            "group analysis complete"
        );
        Ok(analysis)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use chrono::NaiveDate;
    use reviewlens_shared::ReviewRecord;

    use super::*;
    use crate::testing::{Stage, StubClient};

    fn review(version: &str, language: &str, body: &str) -> ReviewRecord {
        ReviewRecord {
            version: version.into(),
            language: language.into(),
            device: "a52q".into(),
            review_date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            star_rating: 1,
            title: String::new(),
            body: body.into(),
        }
    }

    fn two_by_two() -> ReviewDataset {
        ReviewDataset::new(vec![
            review("1.0", "en", "crashes"),
            review("1.0", "fr", "plante"),
            review("2.0", "en", "lag"),
            review("2.0", "fr", "lent"),
        ])
    }

    #[derive(Default)]
    struct RecordingProgress {
        reports: Mutex<Vec<String>>,
    }

    impl PipelineProgress for RecordingProgress {
        fn phase(&self, _name: &str) {}
        fn task_progress(&self, _current: usize, _total: usize, _detail: &str) {}
        fn report_ready(&self, group: &GroupKey, _report: &str) {
            self.reports.lock().unwrap().push(group.to_string());
        }
    }

    #[tokio::test]
    async fn version_and_language_yields_two_by_two() {
        let client = StubClient::new();
        let mut pipeline = ReviewPipeline::new(&client, PipelineConfig::default(), &SilentProgress);

        let results = pipeline
            .analyze_by_version_and_language(&two_by_two())
            .await
            .unwrap();

        assert_eq!(results.keys().collect::<Vec<_>>(), vec!["en", "fr"]);
        for versions in results.values() {
            assert_eq!(versions.keys().collect::<Vec<_>>(), vec!["1.0", "2.0"]);
            for leaf in versions.values() {
                assert!(!leaf.xmldata.is_empty());
                assert!(!leaf.report.is_empty());
            }
        }
        assert_eq!(client.calls(Stage::Analyze), 4);
        assert_eq!(client.calls(Stage::Merge), 0);
        assert_eq!(client.calls(Stage::Report), 4);
    }

    #[tokio::test]
    async fn oversized_group_is_merged_once() {
        let rows: Vec<_> = (0..60)
            .map(|i| review("3.1", "en", &format!("review {i:02} about login failures and lag")))
            .collect();
        let dataset = ReviewDataset::new(rows);
        let serialized_len = ColumnSet::Full.header().len()
            + dataset
                .iter()
                .map(|r| ColumnSet::Full.row_line(r).unwrap().len() + 1)
                .sum::<usize>();
        let max = serialized_len / 3;

        let client = StubClient::new();
        let config = PipelineConfig {
            batch_max_chars: max,
        };
        let mut pipeline = ReviewPipeline::new(&client, config, &SilentProgress);
        let results = pipeline.analyze_by_version(&dataset).await.unwrap();

        let analyze_prompts = client.prompts(Stage::Analyze);
        assert!(analyze_prompts.len() >= 3);
        assert_eq!(client.calls(Stage::Merge), 1);
        assert_eq!(client.calls(Stage::Report), 1);

        let merge_prompt = &client.prompts(Stage::Merge)[0];
        let expected: String = (1..=analyze_prompts.len())
            .map(|n| format!("<issues>batch-{n}</issues>"))
            .collect();
        assert!(merge_prompt.contains(&expected));
        assert_eq!(results["3.1"].xmldata, "<issues>merged-1</issues>");
        assert_eq!(pipeline.stats().batches, analyze_prompts.len());
    }

    #[tokio::test]
    async fn single_batch_skips_merge() {
        let client = StubClient::new();
        let mut pipeline = ReviewPipeline::new(&client, PipelineConfig::default(), &SilentProgress);
        let results = pipeline
            .analyze_by_version(&ReviewDataset::new(vec![review("1.0", "en", "slow")]))
            .await
            .unwrap();

        assert_eq!(client.calls(Stage::Merge), 0);
        assert_eq!(results["1.0"].xmldata, "<issues>batch-1</issues>");
        assert!(client.prompts(Stage::Report)[0].contains("<issues>batch-1</issues>"));
    }

    #[tokio::test]
    async fn empty_dataset_makes_no_calls() {
        let client = StubClient::new();
        let mut pipeline = ReviewPipeline::new(&client, PipelineConfig::default(), &SilentProgress);
        let empty = ReviewDataset::default();

        assert!(pipeline.analyze_by_version(&empty).await.unwrap().is_empty());
        assert!(pipeline.analyze_by_version_and_language(&empty).await.unwrap().is_empty());
        assert!(
            pipeline
                .analyze_by_language_ignoring_version(&empty)
                .await
                .unwrap()
                .is_empty()
        );

        let whole = pipeline.analyze_ignoring_version(&empty).await.unwrap();
        assert_eq!(whole.xmldata, "");
        assert_eq!(whole.report, NO_REVIEWS_REPORT);
        assert_eq!(client.total_calls(), 0);
        assert_eq!(pipeline.stats().empty_groups, 1);
    }

    #[tokio::test]
    async fn missing_language_version_pair_is_kept_empty() {
        let client = StubClient::new();
        let mut pipeline = ReviewPipeline::new(&client, PipelineConfig::default(), &SilentProgress);
        let dataset = ReviewDataset::new(vec![review("1.0", "en", "a"), review("2.0", "fr", "b")]);

        let results = pipeline
            .analyze_by_version_and_language(&dataset)
            .await
            .unwrap();

        assert_eq!(results["en"]["2.0"].xmldata, "");
        assert_eq!(results["fr"]["1.0"].report, NO_REVIEWS_REPORT);
        assert!(!results["en"]["1.0"].xmldata.is_empty());
        assert_eq!(client.calls(Stage::Analyze), 2);
        assert_eq!(pipeline.stats().groups, 4);
        assert_eq!(pipeline.stats().empty_groups, 2);
    }

    #[tokio::test]
    async fn ignoring_version_drops_the_column() {
        let client = StubClient::new();
        let mut pipeline = ReviewPipeline::new(&client, PipelineConfig::default(), &SilentProgress);
        let result = pipeline.analyze_ignoring_version(&two_by_two()).await.unwrap();

        assert_eq!(result.xmldata, "<issues>batch-1</issues>");
        let prompt = &client.prompts(Stage::Analyze)[0];
        assert!(!prompt.contains("1.0,en"));
        assert!(prompt.contains("<issues>"));
    }

    #[tokio::test]
    async fn by_language_ignoring_version_groups_by_language() {
        let client = StubClient::new();
        let progress = RecordingProgress::default();
        let mut pipeline = ReviewPipeline::new(&client, PipelineConfig::default(), &progress);
        let results = pipeline
            .analyze_by_language_ignoring_version(&two_by_two())
            .await
            .unwrap();

        assert_eq!(results.keys().collect::<Vec<_>>(), vec!["en", "fr"]);
        assert!(client.prompts(Stage::Analyze)[0].contains("<issues lang='abc'>"));
        assert_eq!(
            *progress.reports.lock().unwrap(),
            vec!["language en", "language fr"]
        );
    }

    #[tokio::test]
    async fn repeated_run_is_served_from_cache() {
        let client = StubClient::new();
        let mut pipeline = ReviewPipeline::new(&client, PipelineConfig::default(), &SilentProgress);
        let dataset = two_by_two();

        let first = pipeline.analyze_by_version(&dataset).await.unwrap();
        let calls = client.total_calls();
        let second = pipeline.analyze_by_version(&dataset).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(client.total_calls(), calls);
        assert_eq!(pipeline.stats().cache_hits, 2);
        assert_eq!(pipeline.stats().cache_misses, 2);
        assert_eq!(pipeline.cache().len(), 2);
    }

    #[tokio::test]
    async fn client_failure_propagates() {
        let client = StubClient::failing();
        let mut pipeline = ReviewPipeline::new(&client, PipelineConfig::default(), &SilentProgress);
        let err = pipeline.analyze_by_version(&two_by_two()).await.unwrap_err();
        assert!(matches!(err, ReviewLensError::Model(_)));
    }

    #[tokio::test]
    async fn zero_batch_budget_is_rejected_before_any_call() {
        let client = StubClient::new();
        let config = PipelineConfig { batch_max_chars: 0 };
        let mut pipeline = ReviewPipeline::new(&client, config, &SilentProgress);

        let err = pipeline.analyze_by_version(&two_by_two()).await.unwrap_err();
        assert!(matches!(err, ReviewLensError::Validation { .. }));
        assert_eq!(client.total_calls(), 0);
    }

    #[test]
    fn config_comes_from_app_config() {
        let mut app = AppConfig::default();
        app.analysis.batch_max_chars = 1234;
        assert_eq!(PipelineConfig::try_from(&app).unwrap().batch_max_chars, 1234);
        assert_eq!(PipelineConfig::default().batch_max_chars, 300_000);
        assert!(PipelineConfig::default().validate().is_ok());
    }

    #[test]
    fn config_rejects_budget_without_room_for_rows() {
        let mut app = AppConfig::default();
        app.analysis.batch_max_chars = 0;
        assert!(PipelineConfig::try_from(&app).is_err());

        app.analysis.batch_max_chars = ColumnSet::Full.header().chars().count() + 1;
        assert!(PipelineConfig::try_from(&app).is_err());
    }
}
