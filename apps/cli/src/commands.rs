//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;
use std::time::Instant;

use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use reviewlens_core::export::{RunExport, export_run};
use reviewlens_core::{
    AnalysisResult, Comparison, DatasetStats, GroupKey, Grouping, PipelineConfig,
    PipelineProgress, ReviewFilter, ReviewPipeline, compare_by_version,
    compare_by_version_and_language,
};
use reviewlens_llm::{ClientConfig, OpenRouterClient};
use reviewlens_shared::{AppConfig, init_config, load_config, validate_api_key};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// ReviewLens — find out what players dislike about each release.
#[derive(Parser)]
#[command(
    name = "reviewlens",
    version,
    about = "Categorize, summarize and compare negative Google Play reviews with an LLM.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// How `analyze` segments the reviews.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub(crate) enum GroupBy {
    /// One analysis per app version.
    Version,
    /// One analysis per (language, version) pair.
    VersionLanguage,
    /// One analysis per language, ignoring versions.
    Language,
    /// A single analysis over every review.
    All,
}

impl GroupBy {
    fn grouping(self) -> Grouping {
        match self {
            Self::Version => Grouping::Version,
            Self::VersionLanguage => Grouping::LanguageThenVersion,
            Self::Language => Grouping::Language,
            Self::All => Grouping::Whole,
        }
    }
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Analyze review exports and write a run directory.
    Analyze(AnalyzeArgs),

    /// Print descriptive statistics for review exports.
    Stats {
        /// Review export CSV file(s).
        #[arg(short, long, required = true, num_args = 1..)]
        input: Vec<PathBuf>,
    },

    /// List the models analysis may run with.
    Models,

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Args)]
pub(crate) struct AnalyzeArgs {
    /// Review export CSV file(s).
    #[arg(short, long, required = true, num_args = 1..)]
    input: Vec<PathBuf>,

    /// Segmentation.
    #[arg(long, value_enum, default_value = "version")]
    by: GroupBy,

    /// Version to compare against the others.
    #[arg(long)]
    target: Option<String>,

    /// Versions to compare the target with (defaults to every other version).
    #[arg(long, num_args = 1.., requires = "target")]
    baseline: Vec<String>,

    /// Star ratings to analyze, comma-separated (defaults to config).
    #[arg(long, value_delimiter = ',')]
    ratings: Vec<u8>,

    /// Reviewer languages to keep, comma-separated.
    #[arg(long, value_delimiter = ',')]
    languages: Vec<String>,

    /// Earliest review date (YYYY-MM-DD).
    #[arg(long)]
    since: Option<NaiveDate>,

    /// Latest review date (YYYY-MM-DD).
    #[arg(long)]
    until: Option<NaiveDate>,

    /// Model ID (defaults to config).
    #[arg(long)]
    model: Option<String>,

    /// Characters per batch (defaults to config).
    #[arg(long)]
    max_chars: Option<usize>,

    /// Output directory for the run (defaults to config).
    #[arg(short, long)]
    out: Option<PathBuf>,
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "reviewlens=info",
        1 => "reviewlens=debug",
        _ => "reviewlens=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Analyze(args) => cmd_analyze(args).await,
        Command::Stats { input } => cmd_stats(&input),
        Command::Models => cmd_models(),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(),
        },
    }
}

// ---------------------------------------------------------------------------
// analyze
// ---------------------------------------------------------------------------

async fn cmd_analyze(args: AnalyzeArgs) -> Result<()> {
    let started_at = Utc::now();
    let start = Instant::now();

    if args.target.is_some() && !matches!(args.by, GroupBy::Version | GroupBy::VersionLanguage) {
        return Err(eyre!(
            "--target needs --by version or --by version-language"
        ));
    }

    // Validate model and API key before reading any data
    let config = load_config()?;
    let model = config.model.resolve_model(args.model.as_deref())?;
    let api_key = validate_api_key(&config)?;
    let pipeline_config = build_pipeline_config(&args, &config)?;

    let loaded = reviewlens_ingest::load_exports(&args.input)?;
    println!(
        "  Loaded {} reviews from {} file(s) ({} duplicates dropped, {} rows skipped)",
        loaded.dataset.len(),
        loaded.report.files,
        loaded.report.duplicates_dropped,
        loaded.report.rows_skipped,
    );

    let filter = build_filter(&args, &config);
    filter.validate()?;
    let dataset = filter.apply(&loaded.dataset);
    if dataset.is_empty() {
        warn!("no reviews left after filtering");
    }

    let client = OpenRouterClient::new(ClientConfig::from_model_config(
        &config.model,
        model.clone(),
        api_key,
    ))?;

    info!(
        rows = dataset.len(),
        by = ?args.by,
        model = %model,
        max_chars = pipeline_config.batch_max_chars,
        "starting analysis"
    );

    let progress = CliProgress::new();
    let mut pipeline = ReviewPipeline::new(&client, pipeline_config, &progress);

    let analysis = match args.by {
        GroupBy::Version => AnalysisResult::ByVersion(pipeline.analyze_by_version(&dataset).await?),
        GroupBy::VersionLanguage => AnalysisResult::ByVersionAndLanguage(
            pipeline.analyze_by_version_and_language(&dataset).await?,
        ),
        GroupBy::Language => AnalysisResult::ByLanguage(
            pipeline.analyze_by_language_ignoring_version(&dataset).await?,
        ),
        GroupBy::All => AnalysisResult::Whole(pipeline.analyze_ignoring_version(&dataset).await?),
    };

    let comparison = match (&args.target, &analysis) {
        (Some(target), AnalysisResult::ByVersion(results)) => {
            progress.phase(&format!("Comparing version {target}"));
            Some(Comparison::ByVersion(
                compare_by_version(target, results, &client).await?,
            ))
        }
        (Some(target), AnalysisResult::ByVersionAndLanguage(results)) => {
            progress.phase(&format!("Comparing version {target} per language"));
            Some(Comparison::ByVersionAndLanguage(
                compare_by_version_and_language(target, results, &client).await?,
            ))
        }
        _ => None,
    };
    progress.finish();

    if let Some(comparison) = &comparison {
        println!();
        println!("{}", comparison.render_markdown());
    }

    let output_root = args
        .out
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.defaults.output_dir));
    let stats = pipeline.stats().clone();
    let exported = export_run(&RunExport {
        output_root,
        started_at,
        model: model.clone(),
        grouping: args.by.grouping(),
        target: args.target.clone(),
        baselines: args.baseline.clone(),
        row_count: dataset.len(),
        stats: &stats,
        analysis: &analysis,
        comparison: comparison.as_ref(),
        tool_version: env!("CARGO_PKG_VERSION").to_string(),
    })?;

    println!();
    println!("  Analysis complete!");
    println!("  Run:      {}", exported.manifest.run_id);
    println!("  Reviews:  {}", dataset.len());
    println!("  Groups:   {} ({} empty)", stats.groups, stats.empty_groups);
    println!("  Batches:  {}", stats.batches);
    println!(
        "  Calls:    {} analyze, {} merge, {} report",
        stats.analyze_calls, stats.merge_calls, stats.report_calls
    );
    println!("  Path:     {}", exported.run_path.display());
    println!("  Time:     {:.1}s", start.elapsed().as_secs_f64());
    println!();

    Ok(())
}

/// `--max-chars` wins over the config file; either way the budget is checked.
fn build_pipeline_config(args: &AnalyzeArgs, config: &AppConfig) -> Result<PipelineConfig> {
    match args.max_chars {
        Some(batch_max_chars) => {
            let pipeline_config = PipelineConfig { batch_max_chars };
            pipeline_config.validate()?;
            Ok(pipeline_config)
        }
        None => Ok(PipelineConfig::try_from(config)?),
    }
}

/// Combine flags with config defaults. A target plus explicit baselines
/// limits the data to exactly those versions.
fn build_filter(args: &AnalyzeArgs, config: &AppConfig) -> ReviewFilter {
    let ratings = if args.ratings.is_empty() {
        config.analysis.ratings.clone()
    } else {
        args.ratings.clone()
    };

    let versions = match &args.target {
        Some(target) if !args.baseline.is_empty() => std::iter::once(target.clone())
            .chain(args.baseline.iter().cloned())
            .collect(),
        _ => Vec::new(),
    };

    ReviewFilter {
        ratings,
        versions,
        languages: args.languages.clone(),
        since: args.since,
        until: args.until,
    }
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner. Reports are printed
/// above the spinner as soon as they are ready.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl PipelineProgress for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn task_progress(&self, current: usize, total: usize, detail: &str) {
        self.spinner
            .set_message(format!("Analyzing [{current}/{total}] {detail}"));
    }

    fn report_ready(&self, group: &GroupKey, report: &str) {
        self.spinner.suspend(|| {
            println!();
            println!("── {group} ──");
            println!();
            println!("{}", report.trim_end());
        });
    }
}

// ---------------------------------------------------------------------------
// stats / models / config
// ---------------------------------------------------------------------------

fn cmd_stats(input: &[PathBuf]) -> Result<()> {
    let loaded = reviewlens_ingest::load_exports(input)?;
    let stats = DatasetStats::compute(&loaded.dataset);

    println!();
    println!("  Reviews:    {}", stats.total);
    println!("  Duplicates: {} dropped", loaded.report.duplicates_dropped);
    println!("  Skipped:    {} rows", loaded.report.rows_skipped);
    println!("  Languages:  {}", stats.languages);

    println!();
    println!("  By star rating:");
    for (rating, count) in &stats.by_rating {
        println!(
            "    {rating}★  {count:>7}  {:>6.2}%",
            stats.rating_share(*rating)
        );
    }

    println!();
    println!("  By version:");
    for (version, count) in &stats.by_version {
        println!("    {version:<16} {count:>7}");
    }

    println!();
    println!("  By language:");
    for (language, count) in &stats.by_language {
        println!("    {language:<16} {count:>7}");
    }

    println!();
    println!("  By date:");
    for (date, count) in &stats.by_date {
        println!("    {date}       {count:>7}");
    }
    println!();

    Ok(())
}

fn cmd_models() -> Result<()> {
    let config = load_config()?;
    let model = &config.model;
    if model.supported_models.is_empty() {
        println!("  any model (default: {})", model.default_model);
        return Ok(());
    }
    for id in &model.supported_models {
        let marker = if *id == model.default_model { "*" } else { " " };
        println!("  {marker} {id}");
    }
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
