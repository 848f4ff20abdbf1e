//! Error types for the dashboard pipeline.

use std::path::PathBuf;

use chrono::NaiveDate;
use thiserror::Error;

/// Everything the pipeline can fail with.
///
/// Coercion problems (bad dates, bad numbers) never show up here: they
/// degrade to null or zero where they happen.
#[derive(Debug, Error)]
pub enum DashboardError {
    // === Catalog / file system ===
    /// Label is not in the dataset catalog.
    #[error("dataset not found: {label}")]
    NotFound { label: String },

    /// Failed to list a dataset directory.
    #[error("failed to read directory {path}: {source}")]
    DirectoryRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to open or read a file.
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File exists but is not valid delimited text.
    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    // === Shape ===
    /// Required columns are absent. Both lists are kept verbatim for diagnosis.
    #[error("dataset is missing required columns: {}", missing.join(", "))]
    SchemaMismatch {
        missing: Vec<String>,
        actual: Vec<String>,
    },

    /// Dataset has no rows.
    #[error("dataset is empty")]
    EmptyDataset,

    /// Column not present in the dataset.
    #[error("column '{column}' not found in dataset")]
    ColumnNotFound { column: String },

    /// Column length disagrees with the rest of the dataset.
    #[error("column '{column}' has {found} values, expected {expected}")]
    ShapeMismatch {
        column: String,
        expected: usize,
        found: usize,
    },

    // === Selection ===
    /// Explicit date range with start after end.
    #[error("end date must fall after start date (start {start}, end {end})")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    /// Axis/measure combination that cannot be charted.
    #[error("invalid selection: {reason}")]
    InvalidSelection { reason: String },

    /// Neither location detection nor the categorical fallback found a column.
    #[error("no suitable location columns found")]
    NoQualifyingColumns,

    // === Auxiliary inputs ===
    /// Boundary file could not be loaded or lacks the expected shape.
    #[error("failed to load GeoJSON {path}: {message}")]
    GeoJson { path: PathBuf, message: String },

    /// Configuration file could not be parsed.
    #[error("invalid configuration {path}: {message}")]
    Config { path: PathBuf, message: String },
}

impl DashboardError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn selection(reason: impl Into<String>) -> Self {
        Self::InvalidSelection {
            reason: reason.into(),
        }
    }

    /// True for conditions a caller should report and carry on from,
    /// as opposed to failures that halt the current view.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            Self::Io { .. }
                | Self::DirectoryRead { .. }
                | Self::Parse { .. }
                | Self::GeoJson { .. }
                | Self::Config { .. }
        )
    }
}

/// Result type for dashboard operations.
pub type Result<T> = std::result::Result<T, DashboardError>;
