//! Scalar performance statistics over a return series.

use crate::error::{AnalyticsError, Result};
use crate::returns::ReturnSeries;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

const DAYS_PER_YEAR: f64 = 365.25;

/// Annualisation settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatsConfig {
    /// Periods per year used to annualise volatility and Sharpe (default: 252)
    pub trading_days_per_year: f64,

    /// Annual risk-free rate as a fraction (default: 0.0)
    pub risk_free_rate: f64,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            trading_days_per_year: 252.0,
            risk_free_rate: 0.0,
        }
    }
}

impl StatsConfig {
    /// Validated configuration.
    pub fn new(trading_days_per_year: f64, risk_free_rate: f64) -> Result<Self> {
        if !(trading_days_per_year.is_finite() && trading_days_per_year > 0.0) {
            return Err(AnalyticsError::InvalidParameter(format!(
                "trading days per year must be positive, got {trading_days_per_year}"
            )));
        }
        if !risk_free_rate.is_finite() {
            return Err(AnalyticsError::InvalidParameter(format!(
                "risk-free rate must be finite, got {risk_free_rate}"
            )));
        }
        Ok(Self {
            trading_days_per_year,
            risk_free_rate,
        })
    }
}

/// Headline statistics for one series.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceStats {
    /// First date of the series.
    pub start_date: Option<NaiveDate>,
    /// Last date of the series.
    pub end_date: Option<NaiveDate>,
    /// Cumulative time-weighted return.
    pub total_return: f64,
    /// Compound annual growth rate; equals total return under one year.
    pub annualized_return: f64,
    /// Annualised sample standard deviation of period returns.
    pub volatility: f64,
    /// Largest peak-to-trough decline, as a non-positive fraction.
    pub max_drawdown: f64,
    /// Annualised excess return per unit of volatility.
    pub sharpe_ratio: f64,
    /// Number of points.
    pub observations: usize,
}

impl PerformanceStats {
    /// Compute statistics; an empty series yields all zeros.
    pub fn from_series(series: &ReturnSeries, config: &StatsConfig) -> Self {
        if series.is_empty() {
            return Self::default();
        }

        let total_return = series.total_return();
        let returns = series.period_returns();
        let (start_date, end_date) = (series.first_date(), series.last_date());
        let years = match (start_date, end_date) {
            (Some(start), Some(end)) => (end - start).num_days() as f64 / DAYS_PER_YEAR,
            _ => 0.0,
        };

        let std_dev = sample_std_dev(&returns);
        let volatility = std_dev * config.trading_days_per_year.sqrt();

        Self {
            start_date,
            end_date,
            total_return,
            annualized_return: annualized_return(total_return, years),
            volatility,
            max_drawdown: max_drawdown(series),
            sharpe_ratio: sharpe_ratio(&returns, std_dev, config),
            observations: series.len(),
        }
    }
}

fn annualized_return(total_return: f64, years: f64) -> f64 {
    if years < 1.0 {
        return total_return;
    }
    if total_return <= -1.0 {
        return -1.0;
    }
    (1.0 + total_return).powf(1.0 / years) - 1.0
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn sample_std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance =
        values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

fn max_drawdown(series: &ReturnSeries) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut worst: f64 = 0.0;
    for point in series.points() {
        let growth = point.growth();
        peak = peak.max(growth);
        if peak > 0.0 {
            worst = worst.min(growth / peak - 1.0);
        }
    }
    worst
}

fn sharpe_ratio(returns: &[f64], std_dev: f64, config: &StatsConfig) -> f64 {
    if std_dev <= 0.0 {
        return 0.0;
    }
    let periodic_rf = config.risk_free_rate / config.trading_days_per_year;
    (mean(returns) - periodic_rf) / std_dev * config.trading_days_per_year.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::returns::SeriesKey;
    use approx::assert_relative_eq;
    use rstest::rstest;
    use smic_data::PriceHistory;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn series(points: &[(NaiveDate, f64)]) -> ReturnSeries {
        ReturnSeries::from_prices(SeriesKey::Portfolio, &PriceHistory::new(points.iter().copied()))
    }

    #[test]
    fn test_max_drawdown_tracks_running_peak() {
        let s = series(&[
            (d(2024, 1, 1), 100.0),
            (d(2024, 1, 2), 120.0),
            (d(2024, 1, 3), 90.0),
            (d(2024, 1, 4), 130.0),
            (d(2024, 1, 5), 117.0),
        ]);
        let stats = PerformanceStats::from_series(&s, &StatsConfig::default());
        assert_relative_eq!(stats.max_drawdown, -0.25, epsilon = 1e-12);
        assert_relative_eq!(stats.total_return, 0.17, epsilon = 1e-12);
    }

    #[rstest]
    #[case(0.10, 0.5, 0.10)]
    #[case(0.21, 2.0, 0.10)]
    #[case(-1.5, 3.0, -1.0)]
    fn test_annualized_return(#[case] total: f64, #[case] years: f64, #[case] expected: f64) {
        assert_relative_eq!(annualized_return(total, years), expected, epsilon = 1e-12);
    }

    #[test]
    fn test_volatility_and_sharpe_are_annualised() {
        let s = series(&[
            (d(2024, 1, 1), 100.0),
            (d(2024, 1, 2), 101.0),
            (d(2024, 1, 3), 99.99),
            (d(2024, 1, 4), 101.9898),
        ]);
        let config = StatsConfig::default();
        let stats = PerformanceStats::from_series(&s, &config);

        let returns = s.period_returns();
        let std = sample_std_dev(&returns);
        assert_relative_eq!(stats.volatility, std * 252f64.sqrt(), epsilon = 1e-12);
        assert_relative_eq!(
            stats.sharpe_ratio,
            mean(&returns) / std * 252f64.sqrt(),
            epsilon = 1e-9
        );
        assert_eq!(stats.observations, 4);
    }

    #[test]
    fn test_risk_free_rate_lowers_sharpe() {
        let s = series(&[
            (d(2024, 1, 1), 100.0),
            (d(2024, 1, 2), 102.0),
            (d(2024, 1, 3), 101.0),
            (d(2024, 1, 4), 104.0),
        ]);
        let base = PerformanceStats::from_series(&s, &StatsConfig::default());
        let with_rf =
            PerformanceStats::from_series(&s, &StatsConfig::new(252.0, 0.05).unwrap());
        assert!(with_rf.sharpe_ratio < base.sharpe_ratio);
    }

    #[test]
    fn test_empty_and_flat_series() {
        let empty = ReturnSeries::empty(SeriesKey::Portfolio);
        assert_eq!(
            PerformanceStats::from_series(&empty, &StatsConfig::default()),
            PerformanceStats::default()
        );

        let flat = series(&[(d(2024, 1, 1), 50.0), (d(2024, 2, 1), 50.0), (d(2024, 3, 1), 50.0)]);
        let stats = PerformanceStats::from_series(&flat, &StatsConfig::default());
        assert_eq!(stats.volatility, 0.0);
        assert_eq!(stats.sharpe_ratio, 0.0);
        assert_eq!(stats.max_drawdown, 0.0);
    }

    #[test]
    fn test_invalid_config() {
        assert!(StatsConfig::new(0.0, 0.0).is_err());
        assert!(StatsConfig::new(252.0, f64::INFINITY).is_err());
    }
}
