//! Run export.
//!
//! Writes the outcome of one analysis run to disk:
//!
//! ```text
//! <output_root>/<run_id>/
//! ├── manifest.json
//! ├── analysis.json
//! ├── report.md
//! └── comparison.md   (only when a comparison ran)
//! ```

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument};

use reviewlens_shared::{Result, ReviewLensError};

use crate::compare::Comparison;
use crate::grouping::Grouping;
use crate::pipeline::PipelineStats;
use crate::results::AnalysisResult;

/// Current manifest schema version.
pub const MANIFEST_SCHEMA_VERSION: u32 = 1;

/// Everything needed to export a run.
#[derive(Debug, Clone)]
pub struct RunExport<'a> {
    /// Directory runs are written under.
    pub output_root: PathBuf,
    pub started_at: DateTime<Utc>,
    pub model: String,
    pub grouping: Grouping,
    pub target: Option<String>,
    pub baselines: Vec<String>,
    /// Rows analyzed after filtering.
    pub row_count: usize,
    pub stats: &'a PipelineStats,
    pub analysis: &'a AnalysisResult,
    pub comparison: Option<&'a Comparison>,
    pub tool_version: String,
}

/// Checksum record for one written file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactMeta {
    pub filename: String,
    pub sha256: String,
    pub size_bytes: usize,
}

/// Contents of `manifest.json`.
#[derive(Debug, Clone, Serialize)]
pub struct RunManifest {
    pub schema_version: u32,
    pub run_id: String,
    pub tool_version: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub model: String,
    pub grouping: Grouping,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub baselines: Vec<String>,
    pub row_count: usize,
    pub group_count: usize,
    pub stats: PipelineStats,
    pub artifacts: Vec<ArtifactMeta>,
}

/// Output from a successful export.
#[derive(Debug, Clone)]
pub struct ExportResult {
    /// Directory the run was written to.
    pub run_path: PathBuf,
    pub manifest: RunManifest,
}

/// Write a run directory. Every file is written to a temp name and renamed
/// into place.
#[instrument(skip_all, fields(root = %export.output_root.display(), grouping = %export.grouping))]
pub fn export_run(export: &RunExport<'_>) -> Result<ExportResult> {
    let run_id = uuid::Uuid::now_v7().to_string();
    let run_dir = export.output_root.join(&run_id);
    std::fs::create_dir_all(&run_dir).map_err(|e| ReviewLensError::io(&run_dir, e))?;

    info!(path = %run_dir.display(), "exporting run");

    let analysis_json = to_json(export.analysis)?;
    let mut files: Vec<(&str, String)> = vec![
        ("analysis.json", analysis_json),
        ("report.md", export.analysis.render_markdown()),
    ];
    if let Some(comparison) = export.comparison {
        files.push(("comparison.md", comparison.render_markdown()));
    }

    let mut artifacts = Vec::with_capacity(files.len());
    for (filename, content) in &files {
        artifacts.push(write_atomic(&run_dir, filename, content)?);
    }

    let manifest = RunManifest {
        schema_version: MANIFEST_SCHEMA_VERSION,
        run_id,
        tool_version: export.tool_version.clone(),
        started_at: export.started_at,
        completed_at: Utc::now(),
        model: export.model.clone(),
        grouping: export.grouping,
        target: export.target.clone(),
        baselines: export.baselines.clone(),
        row_count: export.row_count,
        group_count: export.analysis.group_count(),
        stats: export.stats.clone(),
        artifacts,
    };
    write_atomic(&run_dir, "manifest.json", &to_json(&manifest)?)?;

    info!(
        run_id = %manifest.run_id,
        files = manifest.artifacts.len() + 1,
        "run export complete"
    );

    Ok(ExportResult {
        run_path: run_dir,
        manifest,
    })
}

fn to_json<T: Serialize>(data: &T) -> Result<String> {
    serde_json::to_string_pretty(data)
        .map_err(|e| ReviewLensError::validation(format!("JSON serialization failed: {e}")))
}

/// Write to `.<name>.tmp`, then rename over `<name>`.
fn write_atomic(dir: &Path, filename: &str, content: &str) -> Result<ArtifactMeta> {
    let target = dir.join(filename);
    let temp = dir.join(format!(".{filename}.tmp"));

    std::fs::write(&temp, content).map_err(|e| ReviewLensError::io(&temp, e))?;
    std::fs::rename(&temp, &target).map_err(|e| ReviewLensError::io(&target, e))?;

    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let sha256 = format!("{:x}", hasher.finalize());

    debug!(file = %filename, size = content.len(), "wrote run file");

    Ok(ArtifactMeta {
        filename: filename.to_string(),
        sha256,
        size_bytes: content.len(),
    })
}
