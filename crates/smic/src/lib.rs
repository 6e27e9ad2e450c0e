#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/gcsu-smic/smic-analytics/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod analysis;
pub mod config;
pub mod error;

// Re-export main types from sub-crates
pub use smic_analytics as analytics;
pub use smic_data as data;
pub use smic_output as output;

pub use analysis::{
    ComparisonQuery, PortfolioAnalysis, generate_comparison_plot, generate_portfolio_analysis,
};
pub use config::AnalysisConfig;
pub use error::{Error, Result};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
