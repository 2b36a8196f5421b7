//! Record Sources
//!
//! Loads import records from files.
//! JSON input is an array of `{value, ou, period}` objects; CSV input has a
//! header row with configurable column names.

use super::record::{Record, RecordValue};
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Maximum row errors kept in a [`SourceLoad`]
const MAX_REPORTED_ERRORS: usize = 100;

/// Errors that prevent loading a source at all
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("Unknown format: {0}")]
    UnknownFormat(String),
}

/// Records read from a source plus the rows that could not be read
#[derive(Debug, Default)]
pub struct SourceLoad {
    pub records: Vec<Record>,
    pub rows_failed: usize,
    pub errors: Vec<String>,
}

impl SourceLoad {
    fn push_error(&mut self, error: String) {
        self.rows_failed += 1;
        self.errors.push(error);
    }

    fn truncate_errors(&mut self) {
        if self.errors.len() > MAX_REPORTED_ERRORS {
            let total = self.errors.len();
            self.errors.truncate(MAX_REPORTED_ERRORS);
            self.errors
                .push(format!("... and {} more errors", total - MAX_REPORTED_ERRORS));
        }
    }
}

/// Supported input formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordSource {
    Json,
    Csv,
}

impl RecordSource {
    /// Guess the format from a file extension
    pub fn detect(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        ext.parse().ok()
    }

    /// Load records with default settings for this format
    pub fn load(&self, path: &Path) -> Result<SourceLoad, SourceError> {
        match self {
            RecordSource::Json => load_json(path),
            RecordSource::Csv => CsvRecordReader::new().read(path),
        }
    }
}

impl FromStr for RecordSource {
    type Err = SourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(RecordSource::Json),
            "csv" => Ok(RecordSource::Csv),
            other => Err(SourceError::UnknownFormat(other.to_string())),
        }
    }
}

/// Load a JSON array of records from a file
pub fn load_json(path: &Path) -> Result<SourceLoad, SourceError> {
    let content = std::fs::read_to_string(path)?;
    parse_json(&content)
}

/// Parse a JSON array of records
///
/// The array itself must be valid; elements that are not records are
/// counted as failed rows.
pub fn parse_json(json: &str) -> Result<SourceLoad, SourceError> {
    let items: Vec<serde_json::Value> = serde_json::from_str(json)?;
    let mut load = SourceLoad::default();

    for (idx, item) in items.into_iter().enumerate() {
        match serde_json::from_value::<Record>(item) {
            Ok(record) => load.records.push(record),
            Err(e) => load.push_error(format!("Item {}: {}", idx, e)),
        }
    }

    load.truncate_errors();
    Ok(load)
}

/// CSV reader with configurable column names
pub struct CsvRecordReader {
    ou_column: String,
    period_column: String,
    value_column: String,
    delimiter: u8,
}

impl Default for CsvRecordReader {
    fn default() -> Self {
        Self::new()
    }
}

impl CsvRecordReader {
    pub fn new() -> Self {
        Self {
            ou_column: "ou".to_string(),
            period_column: "period".to_string(),
            value_column: "value".to_string(),
            delimiter: b',',
        }
    }

    /// Set the org unit column name
    pub fn with_ou_column(mut self, name: &str) -> Self {
        self.ou_column = name.to_string();
        self
    }

    /// Set the period column name
    pub fn with_period_column(mut self, name: &str) -> Self {
        self.period_column = name.to_string();
        self
    }

    /// Set the value column name
    pub fn with_value_column(mut self, name: &str) -> Self {
        self.value_column = name.to_string();
        self
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Read records from a CSV file
    pub fn read(&self, path: &Path) -> Result<SourceLoad, SourceError> {
        let reader = self.builder().from_path(path)?;
        self.read_from(reader)
    }

    /// Read records from a CSV string
    pub fn read_str(&self, csv_data: &str) -> Result<SourceLoad, SourceError> {
        let reader = self.builder().from_reader(csv_data.as_bytes());
        self.read_from(reader)
    }

    fn builder(&self) -> csv::ReaderBuilder {
        let mut builder = csv::ReaderBuilder::new();
        builder
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .delimiter(self.delimiter);
        builder
    }

    fn column(headers: &csv::StringRecord, name: &str) -> Result<usize, SourceError> {
        headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
            .ok_or_else(|| SourceError::MissingColumn(name.to_string()))
    }

    fn read_from<R: std::io::Read>(
        &self,
        mut reader: csv::Reader<R>,
    ) -> Result<SourceLoad, SourceError> {
        let headers = reader.headers()?.clone();
        let ou_idx = Self::column(&headers, &self.ou_column)?;
        let period_idx = Self::column(&headers, &self.period_column)?;
        let value_idx = Self::column(&headers, &self.value_column)?;

        let mut load = SourceLoad::default();

        for (line_num, result) in reader.records().enumerate() {
            // header is line 1
            let line = line_num + 2;

            let row = match result {
                Ok(r) => r,
                Err(e) => {
                    load.push_error(format!("Line {}: {}", line, e));
                    continue;
                }
            };

            let (ou, period) = match (row.get(ou_idx), row.get(period_idx)) {
                (Some(ou), Some(period)) if !ou.is_empty() && !period.is_empty() => (ou, period),
                _ => {
                    load.push_error(format!("Line {}: missing org unit or period", line));
                    continue;
                }
            };

            // Non-numeric values are kept; chunking drops them
            let value = match row.get(value_idx) {
                Some("") | None => RecordValue::Missing,
                Some(raw) => match raw.parse::<f64>() {
                    Ok(number) => RecordValue::Number(number),
                    Err(_) => RecordValue::Text(raw.to_string()),
                },
            };

            load.records.push(Record::new(value, ou, period));
        }

        load.truncate_errors();

        tracing::debug!(
            records = load.records.len(),
            rows_failed = load.rows_failed,
            "Read CSV records"
        );

        Ok(load)
    }
}
