//! Umbrella error type for a full analysis run.

use smic_analytics::AnalyticsError;
use smic_data::DataError;
use smic_output::{ExportError, ReportError};
use thiserror::Error;

/// Result type for run-level operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Anything that can stop an analysis run.
#[derive(Debug, Error)]
pub enum Error {
    /// Input files were missing or malformed.
    #[error(transparent)]
    Data(#[from] DataError),

    /// The engine rejected the ledger or a query.
    #[error(transparent)]
    Analytics(#[from] AnalyticsError),

    /// Writing tables or the dashboard bundle failed.
    #[error(transparent)]
    Export(#[from] ExportError),

    /// The report could not be assembled.
    #[error(transparent)]
    Report(#[from] ReportError),

    /// The configuration sources could not be read.
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// The configuration was read but holds unusable values.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
