//! Error types for portfolio analytics.

use chrono::NaiveDate;
use thiserror::Error;

/// Result type for analytics operations.
pub type Result<T> = std::result::Result<T, AnalyticsError>;

/// Errors raised while reconstructing holdings or answering comparison queries.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// A sale exceeds the quantity held; the portfolio cannot go short.
    #[error(
        "Ledger integrity violation: {symbol} sell of {requested} on {date} exceeds held quantity {held} (ledger entry {entry})"
    )]
    LedgerIntegrity {
        /// Date of the offending transaction.
        date: NaiveDate,
        /// Instrument sold.
        symbol: String,
        /// Quantity the transaction tried to sell.
        requested: f64,
        /// Quantity held immediately before the sale.
        held: f64,
        /// 1-based position of the transaction in the date-ordered ledger.
        entry: usize,
    },

    /// The ledger has no events on or before the analysis date.
    #[error("No transactions on or before {0}")]
    NoActivity(NaiveDate),

    /// A comparison asked for a sector the portfolio never held.
    #[error("Unknown sector: {0}")]
    UnknownSector(String),

    /// A sector comparison was requested without naming the sector.
    #[error("Comparison '{0}' requires a sector")]
    SectorRequired(String),

    /// Invalid parameter value.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}
