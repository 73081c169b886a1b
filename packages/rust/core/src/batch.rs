//! Batch splitter.
//!
//! Serializes review rows into a flat comma-separated table (one row per
//! line, fixed column order) and cuts it on line boundaries into chunks no
//! larger than a character budget. Each batch repeats the header line so the
//! model always sees column names.

use reviewlens_shared::{Result, ReviewLensError, ReviewRecord};

/// Character budget per batch used when nothing else is configured.
pub const DEFAULT_BATCH_MAX_CHARS: usize = 300_000;

/// Which columns a batch carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnSet {
    /// Version, language, device, date, rating, title, text.
    Full,
    /// Everything but the version column.
    WithoutVersion,
}

impl ColumnSet {
    /// The header line for this column set.
    pub fn header(self) -> &'static str {
        match self {
            Self::Full => {
                "App Version Code,Reviewer Language,Device,Review Date,Star Rating,Review Title,Review Text"
            }
            Self::WithoutVersion => {
                "Reviewer Language,Device,Review Date,Star Rating,Review Title,Review Text"
            }
        }
    }

    /// Serialize one review as a single line (no trailing newline).
    ///
    /// Line breaks inside a field are flattened to spaces so each row stays
    /// on one line; quoting is left to the CSV writer.
    pub fn row_line(self, record: &ReviewRecord) -> Result<String> {
        let date = record.review_date.format("%Y-%m-%d").to_string();
        let rating = record.star_rating.to_string();

        let mut fields: Vec<String> = Vec::with_capacity(7);
        if self == Self::Full {
            fields.push(flatten_newlines(&record.version));
        }
        fields.extend(
            [
                record.language.as_str(),
                record.device.as_str(),
                date.as_str(),
                rating.as_str(),
                record.title.as_str(),
                record.body.as_str(),
            ]
            .map(flatten_newlines),
        );

        let mut writer = csv::WriterBuilder::new()
            .quote_style(csv::QuoteStyle::Necessary)
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(Vec::new());
        writer
            .write_record(&fields)
            .map_err(|e| ReviewLensError::validation(format!("CSV encoding failed: {e}")))?;
        let mut bytes = writer
            .into_inner()
            .map_err(|e| ReviewLensError::validation(format!("CSV encoding failed: {e}")))?;
        if bytes.last() == Some(&b'\n') {
            bytes.pop();
        }
        String::from_utf8(bytes)
            .map_err(|e| ReviewLensError::validation(format!("CSV encoding failed: {e}")))
    }
}

/// Reject budgets that cannot hold the header line plus a line break, since
/// every batch would then exceed the bound regardless of row size.
pub fn check_budget(columns: ColumnSet, max_chars: usize) -> Result<()> {
    let floor = columns.header().chars().count() + 1;
    if max_chars <= floor {
        return Err(ReviewLensError::validation(format!(
            "batch budget of {max_chars} characters must be larger than {floor} (header line plus newline)"
        )));
    }
    Ok(())
}

/// One size-bounded chunk of serialized reviews.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    /// Zero-based position within its group.
    pub index: usize,
    /// Header line followed by one line per row.
    pub text: String,
    /// Number of review rows in `text`.
    pub row_count: usize,
}

/// Split rows into batches of at most `max_chars` characters, header
/// included.
///
/// Rows are never split; a batch holding a single row whose header plus line
/// alone exceeds the budget is emitted as-is. No rows, no batches. A budget
/// rejected by [`check_budget`] yields one error and ends the iteration.
pub fn split<'a, I>(rows: I, columns: ColumnSet, max_chars: usize) -> Batches<'a, I::IntoIter>
where
    I: IntoIterator<Item = &'a ReviewRecord>,
{
    Batches {
        rows: rows.into_iter(),
        columns,
        max_chars,
        next_index: 0,
        pending: None,
        finished: false,
    }
}

/// Lazy iterator returned by [`split`].
pub struct Batches<'a, I>
where
    I: Iterator<Item = &'a ReviewRecord>,
{
    rows: I,
    columns: ColumnSet,
    max_chars: usize,
    next_index: usize,
    /// A serialized row that did not fit in the previous batch.
    pending: Option<String>,
    finished: bool,
}

impl<'a, I> Batches<'a, I>
where
    I: Iterator<Item = &'a ReviewRecord>,
{
    fn next_batch(&mut self) -> Result<Option<Batch>> {
        let first = match self.pending.take() {
            Some(line) => line,
            None => match self.rows.next() {
                Some(record) => {
                    check_budget(self.columns, self.max_chars)?;
                    self.columns.row_line(record)?
                }
                None => return Ok(None),
            },
        };

        let header = self.columns.header();
        let mut text = String::with_capacity(header.len() + first.len() + 1);
        text.push_str(header);
        text.push('\n');
        text.push_str(&first);
        let mut chars = header.chars().count() + 1 + first.chars().count();
        let mut row_count = 1;

        for record in self.rows.by_ref() {
            let line = self.columns.row_line(record)?;
            let line_chars = line.chars().count();
            if chars + 1 + line_chars > self.max_chars {
                self.pending = Some(line);
                break;
            }
            text.push('\n');
            text.push_str(&line);
            chars += 1 + line_chars;
            row_count += 1;
        }

        let batch = Batch {
            index: self.next_index,
            text,
            row_count,
        };
        self.next_index += 1;
        Ok(Some(batch))
    }
}

impl<'a, I> Iterator for Batches<'a, I>
where
    I: Iterator<Item = &'a ReviewRecord>,
{
    type Item = Result<Batch>;

    fn next(&mut self) -> Option<Result<Batch>> {
        if self.finished {
            return None;
        }
        match self.next_batch() {
            Ok(Some(batch)) => Some(Ok(batch)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

fn flatten_newlines(value: &str) -> String {
    if value.contains(['\n', '\r']) {
        value.replace("\r\n", " ").replace(['\n', '\r'], " ")
    } else {
        value.to_string()
    }
}
