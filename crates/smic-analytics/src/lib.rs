#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/gcsu-smic/smic-analytics/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod benchmark;
pub mod error;
pub mod holdings;
pub mod returns;
pub mod stats;

// Re-export main types
pub use benchmark::{BenchmarkComparator, ComparisonResult, ComparisonType};
pub use error::{AnalyticsError, Result};
pub use holdings::{
    Holding, HoldingSnapshot, HoldingsHistory, HoldingsReconstructor, InstrumentFlows,
    InstrumentInfo, PositionSummary,
};
pub use returns::{
    Period, ReturnPoint, ReturnSeries, ReturnsData, SectorReturns, SectorTransactionDates,
    SeriesKey, ValuationPoint, Valuations,
};
pub use stats::{PerformanceStats, StatsConfig};
