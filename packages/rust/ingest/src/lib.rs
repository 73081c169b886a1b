//! Google Play review export ingestion.
//!
//! Reads one or more Play Console CSV exports, drops duplicate rows, and
//! projects them onto [`ReviewRecord`]s. This is the only place ReviewLens
//! touches review files; the analysis core works on the resulting
//! [`ReviewDataset`].

mod decode;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use tracing::{debug, info, instrument, warn};

use reviewlens_shared::{Result, ReviewDataset, ReviewLensError, ReviewRecord, UNKNOWN_VERSION};

const COL_VERSION: &str = "App Version Code";
const COL_LANGUAGE: &str = "Reviewer Language";
const COL_DEVICE: &str = "Device";
const COL_RATING: &str = "Star Rating";
const COL_TITLE: &str = "Review Title";
const COL_TEXT: &str = "Review Text";

/// Date columns in order of preference.
const DATE_COLUMNS: [&str; 3] = [
    "Review Last Update Date and Time",
    "Review Submit Date and Time",
    "Review Date",
];

/// Counters describing what happened during ingestion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Files read.
    pub files: usize,
    /// Data rows seen across all files.
    pub rows_read: usize,
    /// Exact duplicate rows dropped (first occurrence kept).
    pub duplicates_dropped: usize,
    /// Rows skipped for an unusable date or rating.
    pub rows_skipped: usize,
}

/// A loaded dataset plus its ingestion counters.
#[derive(Debug, Clone)]
pub struct IngestResult {
    pub dataset: ReviewDataset,
    pub report: IngestReport,
}

/// Load and concatenate review exports, in the order given.
#[instrument(skip_all, fields(files = paths.len()))]
pub fn load_exports(paths: &[PathBuf]) -> Result<IngestResult> {
    if paths.is_empty() {
        return Err(ReviewLensError::input("no review export files given"));
    }

    let mut loader = Loader::default();
    for path in paths {
        let bytes = std::fs::read(path).map_err(|e| ReviewLensError::io(path, e))?;
        let text = decode::decode_text(&bytes).map_err(|e| {
            ReviewLensError::input(format!("{}: {e}", path.display()))
        })?;
        loader.add_file(path, &text)?;
    }

    let result = loader.finish();
    info!(
        rows = result.dataset.len(),
        rows_read = result.report.rows_read,
        duplicates_dropped = result.report.duplicates_dropped,
        rows_skipped = result.report.rows_skipped,
        "review exports loaded"
    );
    Ok(result)
}

/// Parse a single, already decoded export.
pub fn parse_export(text: &str) -> Result<IngestResult> {
    let mut loader = Loader::default();
    loader.add_file(Path::new("<memory>"), text)?;
    Ok(loader.finish())
}

// ---------------------------------------------------------------------------
// Loader
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Loader {
    seen: HashSet<Vec<(String, String)>>,
    records: Vec<ReviewRecord>,
    report: IngestReport,
}

impl Loader {
    fn add_file(&mut self, path: &Path, text: &str) -> Result<()> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(text.as_bytes());

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| ReviewLensError::input(format!("{}: bad header: {e}", path.display())))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        let columns = ColumnMap::resolve(&headers)
            .map_err(|e| ReviewLensError::input(format!("{}: {e}", path.display())))?;

        self.report.files += 1;

        for (idx, row) in reader.records().enumerate() {
            let row = row.map_err(|e| {
                ReviewLensError::input(format!("{}: row {}: {e}", path.display(), idx + 1))
            })?;
            self.report.rows_read += 1;

            let raw: Vec<(String, String)> = headers
                .iter()
                .zip(row.iter())
                .map(|(h, v)| (h.clone(), v.to_string()))
                .collect();
            if !self.seen.insert(raw) {
                self.report.duplicates_dropped += 1;
                continue;
            }

            match columns.project(&row) {
                Ok(record) => self.records.push(record),
                Err(reason) => {
                    warn!(file = %path.display(), row = idx + 1, %reason, "skipping review row");
                    self.report.rows_skipped += 1;
                }
            }
        }

        debug!(file = %path.display(), rows = self.report.rows_read, "export parsed");
        Ok(())
    }

    fn finish(self) -> IngestResult {
        IngestResult {
            dataset: ReviewDataset::new(self.records),
            report: self.report,
        }
    }
}

// ---------------------------------------------------------------------------
// Column mapping
// ---------------------------------------------------------------------------

/// Positions of the columns we project, resolved from the header row.
#[derive(Debug)]
struct ColumnMap {
    version: Option<usize>,
    language: usize,
    device: Option<usize>,
    date: usize,
    rating: usize,
    title: Option<usize>,
    text: usize,
}

impl ColumnMap {
    fn resolve(headers: &[String]) -> std::result::Result<Self, String> {
        let find = |name: &str| headers.iter().position(|h| h == name);
        let require =
            |name: &str| find(name).ok_or_else(|| format!("missing column '{name}'"));

        let date = DATE_COLUMNS
            .iter()
            .find_map(|name| find(name))
            .ok_or_else(|| format!("missing a date column (one of: {})", DATE_COLUMNS.join(", ")))?;

        Ok(Self {
            version: find(COL_VERSION),
            language: require(COL_LANGUAGE)?,
            device: find(COL_DEVICE),
            date,
            rating: require(COL_RATING)?,
            title: find(COL_TITLE),
            text: require(COL_TEXT)?,
        })
    }

    fn project(&self, row: &csv::StringRecord) -> std::result::Result<ReviewRecord, String> {
        let field = |idx: usize| row.get(idx).unwrap_or("").trim();
        let optional = |idx: Option<usize>| idx.map(field).unwrap_or("");

        let raw_date = field(self.date);
        let review_date =
            parse_review_date(raw_date).ok_or_else(|| format!("unparseable date '{raw_date}'"))?;

        let raw_rating = field(self.rating);
        let star_rating = raw_rating
            .parse::<u8>()
            .ok()
            .filter(|r| (1..=5).contains(r))
            .ok_or_else(|| format!("star rating '{raw_rating}' not in 1-5"))?;

        let version = match optional(self.version) {
            "" => UNKNOWN_VERSION.to_string(),
            v => v.to_string(),
        };

        Ok(ReviewRecord {
            version,
            language: field(self.language).to_string(),
            device: optional(self.device).to_string(),
            review_date,
            star_rating,
            title: optional(self.title).to_string(),
            body: field(self.text).to_string(),
        })
    }
}

/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS` and bare dates.
fn parse_review_date(raw: &str) -> Option<NaiveDate> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt.date());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}
