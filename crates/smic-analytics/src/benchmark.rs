//! Benchmark comparisons
//!
//! Answers one query at a time against an immutable [`ReturnsData`]:
//! pick the two legs, clip them to a common window, align them on a shared
//! date grid and rebase both to zero at the window start.

use crate::error::{AnalyticsError, Result};
use crate::returns::{Period, ReturnSeries, ReturnsData};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use smic_data::InstrumentClass;
use std::fmt;
use std::str::FromStr;

/// Kind of comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComparisonType {
    /// A sector's individual stocks against the sector's ETFs.
    #[serde(rename = "ETF_vs_Stocks")]
    EtfVsStocks,
    /// The whole portfolio against the broad-market index.
    #[serde(rename = "Equity_vs_SP500")]
    EquityVsSp500,
}

impl ComparisonType {
    /// Both comparison types.
    pub const fn all() -> [Self; 2] {
        [Self::EtfVsStocks, Self::EquityVsSp500]
    }

    /// Wire name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::EtfVsStocks => "ETF_vs_Stocks",
            Self::EquityVsSp500 => "Equity_vs_SP500",
        }
    }

    /// Whether queries of this type must name a sector.
    pub const fn requires_sector(&self) -> bool {
        matches!(self, Self::EtfVsStocks)
    }
}

impl fmt::Display for ComparisonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComparisonType {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "etf_vs_stocks" | "etf" => Ok(Self::EtfVsStocks),
            "equity_vs_sp500" | "equity" | "sp500" => Ok(Self::EquityVsSp500),
            _ => Err(AnalyticsError::InvalidParameter(format!(
                "unknown comparison type '{s}' (expected ETF_vs_Stocks or Equity_vs_SP500)"
            ))),
        }
    }
}

/// Two aligned, rebased series plus the window they cover.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    /// Query type.
    pub comparison_type: ComparisonType,
    /// Query window.
    pub period: Period,
    /// Sector queried, if any.
    pub sector: Option<String>,
    /// Legend label for the subject.
    pub subject_label: String,
    /// Legend label for the benchmark.
    pub benchmark_label: String,
    /// Subject leg, rebased to zero at `start`.
    pub subject: ReturnSeries,
    /// Benchmark leg, rebased to zero at `start`.
    pub benchmark: ReturnSeries,
    /// Whether the subject leg holds a positive value inside the period.
    pub subject_available: bool,
    /// Whether the benchmark leg holds a positive value inside the period.
    pub benchmark_available: bool,
    /// First date of the window actually used.
    pub start: Option<NaiveDate>,
    /// Last date of the window actually used.
    pub end: Option<NaiveDate>,
    /// Subject transaction dates, unfiltered.
    pub subject_transactions: Vec<NaiveDate>,
    /// Benchmark transaction dates, unfiltered (empty for an index).
    pub benchmark_transactions: Vec<NaiveDate>,
}

impl ComparisonResult {
    /// Both legs have data.
    pub const fn is_complete(&self) -> bool {
        self.subject_available && self.benchmark_available
    }

    /// Subject minus benchmark return over the window.
    pub fn excess_return(&self) -> Option<f64> {
        (!self.subject.is_empty() && !self.benchmark.is_empty())
            .then(|| self.subject.total_return() - self.benchmark.total_return())
    }

    /// Chart title.
    pub fn title(&self) -> String {
        match (&self.sector, self.comparison_type) {
            (Some(sector), ComparisonType::EtfVsStocks) => {
                format!(
                    "{sector}: {} vs {} ({})",
                    self.subject_label, self.benchmark_label, self.period
                )
            }
            _ => format!("{} vs {} ({})", self.subject_label, self.benchmark_label, self.period),
        }
    }
}

/// Runs comparison queries against one run's return data.
#[derive(Debug, Clone, Copy)]
pub struct BenchmarkComparator<'a> {
    data: &'a ReturnsData,
}

/// Legs picked for a query, before windowing.
struct Legs<'a> {
    subject: &'a ReturnSeries,
    benchmark: &'a ReturnSeries,
    subject_label: String,
    benchmark_label: String,
    subject_transactions: Vec<NaiveDate>,
    benchmark_transactions: Vec<NaiveDate>,
}

impl<'a> BenchmarkComparator<'a> {
    /// Create a comparator over `data`.
    pub const fn new(data: &'a ReturnsData) -> Self {
        Self { data }
    }

    /// Compare two legs over a period.
    ///
    /// # Errors
    ///
    /// [`AnalyticsError::SectorRequired`] when `ETF_vs_Stocks` is asked
    /// without a sector, [`AnalyticsError::UnknownSector`] when the sector was
    /// never held.
    pub fn compare(
        &self,
        comparison_type: ComparisonType,
        sector: Option<&str>,
        period: Period,
    ) -> Result<ComparisonResult> {
        let legs = self.legs(comparison_type, sector)?;
        let (period_start, period_end) = period.bounds(self.data.as_of);
        let subject_available = holds_value_within(legs.subject, period_start, period_end);
        let benchmark_available = holds_value_within(legs.benchmark, period_start, period_end);

        if !subject_available || !benchmark_available {
            tracing::warn!(
                comparison = %comparison_type,
                sector = sector.unwrap_or("-"),
                subject_available,
                benchmark_available,
                "comparison leg has no data"
            );
        }

        let present: Vec<&ReturnSeries> = [
            (legs.subject, subject_available),
            (legs.benchmark, benchmark_available),
        ]
        .into_iter()
        .filter_map(|(series, available)| available.then_some(series))
        .collect();
        let grid = window_grid(&present, period_start, period_end);
        let leg = |series: &ReturnSeries, available: bool| {
            if available && !grid.is_empty() {
                series.rebased(&grid)
            } else {
                ReturnSeries::empty(series.key().clone())
            }
        };
        let subject = leg(legs.subject, subject_available);
        let benchmark = leg(legs.benchmark, benchmark_available);

        tracing::debug!(
            comparison = %comparison_type,
            %period,
            start = ?grid.first(),
            end = ?grid.last(),
            points = grid.len(),
            "compared series"
        );

        Ok(ComparisonResult {
            comparison_type,
            period,
            sector: sector.map(str::to_string),
            subject_label: legs.subject_label,
            benchmark_label: legs.benchmark_label,
            subject,
            benchmark,
            subject_available,
            benchmark_available,
            start: grid.first().copied(),
            end: grid.last().copied(),
            subject_transactions: legs.subject_transactions,
            benchmark_transactions: legs.benchmark_transactions,
        })
    }

    fn legs(&self, comparison_type: ComparisonType, sector: Option<&str>) -> Result<Legs<'a>> {
        let data = self.data;
        match comparison_type {
            ComparisonType::EtfVsStocks => {
                let sector = sector
                    .ok_or_else(|| AnalyticsError::SectorRequired(comparison_type.to_string()))?;
                let returns = data
                    .sectors
                    .get(sector)
                    .ok_or_else(|| AnalyticsError::UnknownSector(sector.to_string()))?;
                let dates = data.transaction_dates.get(sector);
                let leg_dates = |class: InstrumentClass| {
                    dates.map(|d| d.leg(class).to_vec()).unwrap_or_default()
                };
                Ok(Legs {
                    subject: &returns.stocks,
                    benchmark: &returns.etf,
                    subject_label: InstrumentClass::Stock.label().to_string(),
                    benchmark_label: InstrumentClass::Etf.label().to_string(),
                    subject_transactions: leg_dates(InstrumentClass::Stock),
                    benchmark_transactions: leg_dates(InstrumentClass::Etf),
                })
            }
            ComparisonType::EquityVsSp500 => Ok(Legs {
                subject: &data.portfolio,
                benchmark: &data.benchmark,
                subject_label: "Portfolio".to_string(),
                benchmark_label: data.benchmark_label.clone(),
                subject_transactions: data.portfolio_transaction_dates.clone(),
                benchmark_transactions: Vec::new(),
            }),
        }
    }
}

/// Whether `series` holds a positive value on some date inside the period.
///
/// A leg that was fully exited before the period starts only carries zero
/// values there and counts as unavailable.
fn holds_value_within(series: &ReturnSeries, start: Option<NaiveDate>, end: NaiveDate) -> bool {
    series
        .points()
        .iter()
        .any(|p| p.value > 0.0 && start.is_none_or(|s| p.date >= s) && p.date <= end)
}

/// Union of the available legs' dates inside the common window.
///
/// The window opens at the latest of the period start and each leg's first
/// date, and closes at the earliest of the period end and each leg's last
/// date.
fn window_grid(
    present: &[&ReturnSeries],
    period_start: Option<NaiveDate>,
    period_end: NaiveDate,
) -> Vec<NaiveDate> {
    let start = present
        .iter()
        .filter_map(|s| s.first_date())
        .chain(period_start)
        .max();
    let end = present
        .iter()
        .filter_map(|s| s.last_date())
        .chain(std::iter::once(period_end))
        .min();

    match (start, end) {
        (Some(start), Some(end)) if start <= end => {
            ReturnsData::union_dates(present.iter().copied())
                .into_iter()
                .filter(|d| *d >= start && *d <= end)
                .collect()
        }
        _ => Vec::new(),
    }
}
