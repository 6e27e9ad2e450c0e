//! Run configuration.
//!
//! [`AnalysisConfig`] is read from an optional TOML file and then from
//! `SMIC_*` environment variables, the latter taking precedence. Every key is
//! optional; missing keys keep their defaults.

use crate::error::{Error, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use smic_analytics::{HoldingsReconstructor, StatsConfig};
use std::path::Path;

/// Prefix of the environment variables that override file settings.
pub const ENV_PREFIX: &str = "SMIC";

/// Settings for one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Price-book symbol of the benchmark index (default: "SPY")
    pub benchmark_symbol: String,

    /// Display name of the benchmark (default: "S&P 500")
    pub benchmark_label: String,

    /// Analysis date. When unset the caller decides, usually today.
    pub as_of: Option<NaiveDate>,

    /// Periods per year for annualisation (default: 252)
    pub trading_days_per_year: f64,

    /// Annual risk-free rate used by the Sharpe ratio (default: 0.0)
    pub risk_free_rate: f64,

    /// Quantity below which a position counts as closed (default: 1e-9)
    pub quantity_tolerance: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            benchmark_symbol: "SPY".to_string(),
            benchmark_label: "S&P 500".to_string(),
            as_of: None,
            trading_days_per_year: 252.0,
            risk_free_rate: 0.0,
            quantity_tolerance: 1e-9,
        }
    }
}

impl AnalysisConfig {
    /// Load settings from `path` (if given) layered with `SMIC_*` variables.
    ///
    /// A missing file is an error only when a path was explicitly passed.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        builder = builder.add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true));

        let loaded: Self = builder.build()?.try_deserialize()?;
        loaded.validate()?;
        tracing::debug!(
            benchmark = %loaded.benchmark_symbol,
            as_of = ?loaded.as_of,
            "loaded analysis configuration"
        );
        Ok(loaded)
    }

    /// Reject settings the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.benchmark_symbol.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "benchmark_symbol must not be empty".to_string(),
            ));
        }
        self.stats_config()?;
        self.reconstructor()?;
        Ok(())
    }

    /// Annualisation settings for the statistics module.
    pub fn stats_config(&self) -> Result<StatsConfig> {
        Ok(StatsConfig::new(
            self.trading_days_per_year,
            self.risk_free_rate,
        )?)
    }

    /// Holdings reconstructor honouring the configured tolerance.
    pub fn reconstructor(&self) -> Result<HoldingsReconstructor> {
        Ok(HoldingsReconstructor::new(self.quantity_tolerance)?)
    }

    /// The configured analysis date, or `fallback` when none is set.
    pub fn as_of_or(&self, fallback: NaiveDate) -> NaiveDate {
        self.as_of.unwrap_or(fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn toml_file(contents: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let config = AnalysisConfig::default();
        assert_eq!(config.benchmark_symbol, "SPY");
        assert_eq!(config.benchmark_label, "S&P 500");
        assert!(config.as_of.is_none());
        assert!(config.validate().is_ok());
        assert_eq!(config.stats_config().unwrap(), StatsConfig::default());
    }

    #[test]
    fn test_load_partial_file() {
        let file = toml_file("benchmark_symbol = \"VOO\"\nas_of = \"2024-06-28\"\n");
        let config = AnalysisConfig::load(Some(file.path())).unwrap();

        assert_eq!(config.benchmark_symbol, "VOO");
        assert_eq!(config.as_of, NaiveDate::from_ymd_opt(2024, 6, 28));
        // Untouched keys keep their defaults.
        assert_eq!(config.benchmark_label, "S&P 500");
        assert_eq!(config.trading_days_per_year, 252.0);
    }

    #[test]
    fn test_load_rejects_bad_values() {
        let file = toml_file("trading_days_per_year = 0\n");
        let err = AnalysisConfig::load(Some(file.path())).unwrap_err();
        assert!(matches!(err, Error::Analytics(_)));

        let file = toml_file("benchmark_symbol = \"  \"\n");
        let err = AnalysisConfig::load(Some(file.path())).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn test_missing_explicit_file() {
        let err = AnalysisConfig::load(Some(Path::new("/no/such/smic.toml"))).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_as_of_fallback() {
        let fallback = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        assert_eq!(AnalysisConfig::default().as_of_or(fallback), fallback);
    }
}
