//! Error types for data loading.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for data operations.
pub type Result<T> = std::result::Result<T, DataError>;

/// A single problem found while validating an input row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowViolation {
    /// 1-based data row number (the header is not counted).
    pub row: usize,
    /// Column the problem was found in.
    pub field: &'static str,
    /// What is wrong with the value.
    pub message: String,
}

impl RowViolation {
    /// Create a new violation.
    pub fn new(row: usize, field: &'static str, message: impl Into<String>) -> Self {
        Self {
            row,
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for RowViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row {} [{}]: {}", self.row, self.field, self.message)
    }
}

/// Errors that can occur while loading ledger or price data.
#[derive(Debug, Error)]
pub enum DataError {
    /// Input file could not be opened or read.
    #[error("Cannot read {path}: {source}")]
    File {
        /// Path that failed.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// CSV framing error (bad quoting, ragged rows).
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A required column is absent from the header row.
    #[error("{source_name}: missing required column '{column}'")]
    MissingColumn {
        /// Which input was being read.
        source_name: &'static str,
        /// Canonical column name.
        column: &'static str,
    },

    /// One or more rows failed validation.
    #[error("{source_name}: {} invalid row(s)\n{}", .violations.len(), format_violations(.violations))]
    Validation {
        /// Which input was being read.
        source_name: &'static str,
        /// Every violation found, in row order.
        violations: Vec<RowViolation>,
    },

    /// The input parsed but contained no rows.
    #[error("{0}: no data rows")]
    Empty(&'static str),
}

impl DataError {
    /// Violations carried by a validation error, empty for other variants.
    pub fn violations(&self) -> &[RowViolation] {
        match self {
            Self::Validation { violations, .. } => violations,
            _ => &[],
        }
    }
}

fn format_violations(violations: &[RowViolation]) -> String {
    violations
        .iter()
        .map(|v| format!("  {v}"))
        .collect::<Vec<_>>()
        .join("\n")
}
