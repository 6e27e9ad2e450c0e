//! Valuation aggregation and time-weighted returns
//!
//! Snapshots are rolled up into valuation series for the whole portfolio,
//! every sector, every (sector, class) leg and every instrument. Each series
//! is then chained into time-weighted returns:
//!
//! ```text
//! r_t = (V_t + S_t + D_t) / (V_{t-1} + B_t) - 1
//! ```
//!
//! where `B_t` is purchase cost (start-of-day inflow), `S_t` sale proceeds and
//! `D_t` dividends (end-of-day outflows). A period with nothing at risk
//! returns 0.

use crate::holdings::HoldingsHistory;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use smic_data::{InstrumentClass, Ledger, PriceBook, PriceHistory};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// What a valuation or return series measures.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SeriesKey {
    /// Whole portfolio.
    Portfolio,
    /// All holdings tagged with a sector.
    Sector(String),
    /// One instrument class within a sector.
    SectorClass(String, InstrumentClass),
    /// A single instrument.
    Instrument(String),
    /// An external index, by symbol.
    Benchmark(String),
}

impl fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Portfolio => f.write_str("Portfolio"),
            Self::Sector(sector) => write!(f, "{sector}"),
            Self::SectorClass(sector, class) => write!(f, "{sector} {class}"),
            Self::Instrument(symbol) | Self::Benchmark(symbol) => write!(f, "{symbol}"),
        }
    }
}

/// Aggregate value and flows for one key on one date.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ValuationPoint {
    /// Observation date.
    pub date: NaiveDate,
    /// End-of-day market value.
    pub value: f64,
    /// Purchase cost paid on this date.
    pub purchases: f64,
    /// Sale proceeds received on this date.
    pub sales: f64,
    /// Dividends received on this date.
    pub dividends: f64,
}

impl ValuationPoint {
    fn holds_or_buys(&self) -> bool {
        self.value > 0.0 || self.purchases > 0.0
    }
}

/// Valuation series for every key, on the shared observation grid.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Valuations {
    dates: Vec<NaiveDate>,
    series: BTreeMap<SeriesKey, Vec<ValuationPoint>>,
}

impl Valuations {
    /// Roll snapshots up by portfolio, sector, leg and instrument.
    ///
    /// Every key has a point on every grid date; dates before the key was
    /// first held carry zero value.
    pub fn from_history(history: &HoldingsHistory) -> Self {
        let dates = history.dates();
        let keys = history.instruments().values().flat_map(|info| {
            [
                SeriesKey::Sector(info.sector.clone()),
                SeriesKey::SectorClass(info.sector.clone(), info.class),
                SeriesKey::Instrument(info.symbol.clone()),
            ]
        });
        let mut series: BTreeMap<SeriesKey, Vec<ValuationPoint>> =
            std::iter::once(SeriesKey::Portfolio)
                .chain(keys)
                .map(|key| (key, Vec::with_capacity(dates.len())))
                .collect();

        for snapshot in history.snapshots() {
            let mut day: BTreeMap<SeriesKey, ValuationPoint> = BTreeMap::new();
            for (symbol, info) in history.instruments() {
                let value = snapshot.holdings.get(symbol).map_or(0.0, |h| h.market_value);
                let flows = snapshot.flows.get(symbol).copied().unwrap_or_default();
                for key in [
                    SeriesKey::Portfolio,
                    SeriesKey::Sector(info.sector.clone()),
                    SeriesKey::SectorClass(info.sector.clone(), info.class),
                    SeriesKey::Instrument(symbol.clone()),
                ] {
                    let point = day.entry(key).or_insert_with(|| ValuationPoint {
                        date: snapshot.date,
                        ..ValuationPoint::default()
                    });
                    point.value += value;
                    point.purchases += flows.purchases;
                    point.sales += flows.sales;
                    point.dividends += flows.dividends;
                }
            }
            for (key, points) in &mut series {
                let point = day.remove(key).unwrap_or(ValuationPoint {
                    date: snapshot.date,
                    ..ValuationPoint::default()
                });
                points.push(point);
            }
        }

        Self { dates, series }
    }

    /// Observation dates.
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Every key with a series, in key order.
    pub fn keys(&self) -> impl Iterator<Item = &SeriesKey> {
        self.series.keys()
    }

    /// Points for a key; empty when the key never appeared.
    pub fn points(&self, key: &SeriesKey) -> &[ValuationPoint] {
        self.series.get(key).map_or(&[], Vec::as_slice)
    }

    /// Value of a key at or before `date`, zero before the first observation.
    pub fn value_at(&self, key: &SeriesKey, date: NaiveDate) -> f64 {
        let points = self.points(key);
        let idx = points.partition_point(|p| p.date <= date);
        idx.checked_sub(1).map_or(0.0, |i| points[i].value)
    }

    /// Share of portfolio value held by `key` on `date`.
    ///
    /// `None` when the portfolio holds nothing on that date.
    pub fn weight(&self, key: &SeriesKey, date: NaiveDate) -> Option<f64> {
        let total = self.value_at(&SeriesKey::Portfolio, date);
        (total > 0.0).then(|| self.value_at(key, date) / total)
    }

    /// Sectors present, sorted.
    pub fn sectors(&self) -> Vec<String> {
        self.series
            .keys()
            .filter_map(|key| match key {
                SeriesKey::Sector(sector) => Some(sector.clone()),
                _ => None,
            })
            .collect()
    }

    /// Time-weighted return series for a key.
    pub fn returns(&self, key: &SeriesKey) -> ReturnSeries {
        ReturnSeries::from_valuations(key.clone(), self.points(key))
    }
}

/// One point of a return series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReturnPoint {
    /// Observation date.
    pub date: NaiveDate,
    /// Underlying value (market value, or index level for benchmarks).
    pub value: f64,
    /// Return since the first point.
    pub cumulative_return: f64,
    /// Return since the previous point; zero for the first point.
    pub period_return: f64,
}

impl ReturnPoint {
    /// Growth of one unit invested at the first point.
    pub fn growth(&self) -> f64 {
        1.0 + self.cumulative_return
    }
}

/// Ordered return points for one key. The first point's cumulative return is
/// always exactly zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnSeries {
    key: SeriesKey,
    points: Vec<ReturnPoint>,
}

impl ReturnSeries {
    /// Series with no points.
    pub const fn empty(key: SeriesKey) -> Self {
        Self {
            key,
            points: Vec::new(),
        }
    }

    /// Chain time-weighted returns from valuation points.
    ///
    /// Leading points where the key neither holds value nor buys are dropped.
    pub fn from_valuations(key: SeriesKey, valuations: &[ValuationPoint]) -> Self {
        let Some(start) = valuations.iter().position(ValuationPoint::holds_or_buys) else {
            return Self::empty(key);
        };

        let mut points = Vec::with_capacity(valuations.len() - start);
        let mut growth = 1.0;
        let mut previous_value = 0.0;
        for (i, v) in valuations[start..].iter().enumerate() {
            let period_return = if i == 0 {
                0.0
            } else {
                let denominator = previous_value + v.purchases;
                if denominator > 0.0 {
                    (v.value + v.sales + v.dividends) / denominator - 1.0
                } else {
                    0.0
                }
            };
            growth *= 1.0 + period_return;
            points.push(ReturnPoint {
                date: v.date,
                value: v.value,
                cumulative_return: growth - 1.0,
                period_return,
            });
            previous_value = v.value;
        }

        Self { key, points }
    }

    /// Price-only return series for an index or single quote history.
    pub fn from_prices(key: SeriesKey, history: &PriceHistory) -> Self {
        let Some(&(_, base)) = history.points().first() else {
            return Self::empty(key);
        };

        let mut previous = base;
        let points = history
            .points()
            .iter()
            .map(|&(date, close)| {
                let period_return = if previous > 0.0 { close / previous - 1.0 } else { 0.0 };
                previous = close;
                ReturnPoint {
                    date,
                    value: close,
                    cumulative_return: if base > 0.0 { close / base - 1.0 } else { 0.0 },
                    period_return,
                }
            })
            .collect();

        Self { key, points }
    }

    /// Key this series measures.
    pub const fn key(&self) -> &SeriesKey {
        &self.key
    }

    /// Points in date order.
    pub fn points(&self) -> &[ReturnPoint] {
        &self.points
    }

    /// Dates in order.
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.points.iter().map(|p| p.date)
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the series has no points.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// First date.
    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|p| p.date)
    }

    /// Last date.
    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.date)
    }

    /// Final point.
    pub fn last(&self) -> Option<&ReturnPoint> {
        self.points.last()
    }

    /// Point in effect on `date` (forward-filled).
    pub fn point_at(&self, date: NaiveDate) -> Option<&ReturnPoint> {
        let idx = self.points.partition_point(|p| p.date <= date);
        idx.checked_sub(1).map(|i| &self.points[i])
    }

    /// Cumulative return in effect on `date`.
    pub fn cumulative_at(&self, date: NaiveDate) -> Option<f64> {
        self.point_at(date).map(|p| p.cumulative_return)
    }

    /// Cumulative return at the last point, zero when empty.
    pub fn total_return(&self) -> f64 {
        self.last().map_or(0.0, |p| p.cumulative_return)
    }

    /// Period returns after the first point.
    pub fn period_returns(&self) -> Vec<f64> {
        self.points.iter().skip(1).map(|p| p.period_return).collect()
    }

    /// Re-express the series on `grid`, rebased so the first grid date is the
    /// new zero.
    ///
    /// Values and growth are forward-filled onto the grid. Grid dates before
    /// the series' first point are skipped.
    pub fn rebased(&self, grid: &[NaiveDate]) -> Self {
        let mut points = Vec::with_capacity(grid.len());
        let mut base: Option<f64> = None;
        let mut previous_growth = 0.0;
        for &date in grid {
            let Some(p) = self.point_at(date) else {
                continue;
            };
            let growth = p.growth();
            let base_growth = *base.get_or_insert(growth);
            let cumulative_return = if base_growth > 0.0 { growth / base_growth - 1.0 } else { 0.0 };
            let period_return = if points.is_empty() || previous_growth <= 0.0 {
                0.0
            } else {
                growth / previous_growth - 1.0
            };
            previous_growth = growth;
            points.push(ReturnPoint {
                date,
                value: p.value,
                cumulative_return,
                period_return,
            });
        }
        Self {
            key: self.key.clone(),
            points,
        }
    }

    /// Points within `[start, end]`, rebased to the first of them.
    pub fn window(&self, start: NaiveDate, end: NaiveDate) -> Self {
        let grid: Vec<NaiveDate> = self.dates().filter(|d| *d >= start && *d <= end).collect();
        self.rebased(&grid)
    }
}

/// Reporting window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Period {
    /// Everything from the first available date.
    General,
    /// From January 1 of the analysis year.
    #[serde(rename = "YTD")]
    Ytd,
}

impl Period {
    /// Both periods, General first.
    pub const fn all() -> [Self; 2] {
        [Self::General, Self::Ytd]
    }

    /// Display label.
    pub const fn label(&self) -> &'static str {
        match self {
            Self::General => "General",
            Self::Ytd => "YTD",
        }
    }

    /// Lower-case key fragment used in chart maps.
    pub const fn slug(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Ytd => "ytd",
        }
    }

    /// Earliest date the window may start on, and the date it ends on.
    pub fn bounds(&self, as_of: NaiveDate) -> (Option<NaiveDate>, NaiveDate) {
        let start = match self {
            Self::General => None,
            Self::Ytd => NaiveDate::from_ymd_opt(as_of.year(), 1, 1),
        };
        (start, as_of)
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Period {
    type Err = crate::AnalyticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "general" | "all" | "inception" => Ok(Self::General),
            "ytd" => Ok(Self::Ytd),
            other => Err(crate::AnalyticsError::InvalidParameter(format!(
                "unknown period '{other}' (expected General or YTD)"
            ))),
        }
    }
}

/// The three return series tracked per sector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectorReturns {
    /// ETF leg.
    pub etf: ReturnSeries,
    /// Individual stock leg.
    pub stocks: ReturnSeries,
    /// Whole sector.
    pub total: ReturnSeries,
}

impl SectorReturns {
    /// Series for one instrument class.
    pub const fn leg(&self, class: InstrumentClass) -> &ReturnSeries {
        match class {
            InstrumentClass::Etf => &self.etf,
            InstrumentClass::Stock => &self.stocks,
        }
    }
}

/// Dates on which a sector traded, split by leg.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectorTransactionDates {
    /// ETF transaction dates.
    pub etf: Vec<NaiveDate>,
    /// Stock transaction dates.
    pub stocks: Vec<NaiveDate>,
    /// Any transaction in the sector.
    pub all: Vec<NaiveDate>,
}

impl SectorTransactionDates {
    /// Dates for one instrument class.
    pub fn leg(&self, class: InstrumentClass) -> &[NaiveDate] {
        match class {
            InstrumentClass::Etf => &self.etf,
            InstrumentClass::Stock => &self.stocks,
        }
    }
}

/// Everything the comparator needs, built once per run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnsData {
    /// Whole-portfolio series.
    pub portfolio: ReturnSeries,
    /// Per-sector series keyed by sector name.
    pub sectors: BTreeMap<String, SectorReturns>,
    /// Per-instrument series keyed by symbol.
    pub instruments: BTreeMap<String, ReturnSeries>,
    /// Index series; empty when the price book has no quotes for it.
    pub benchmark: ReturnSeries,
    /// Legend label for the index.
    pub benchmark_label: String,
    /// Per-sector transaction dates.
    pub transaction_dates: BTreeMap<String, SectorTransactionDates>,
    /// Every transaction date in the ledger.
    pub portfolio_transaction_dates: Vec<NaiveDate>,
    /// Analysis date.
    pub as_of: NaiveDate,
}

impl ReturnsData {
    /// Build all series for a run.
    ///
    /// The benchmark is read from `prices` under `benchmark_symbol`, cut off
    /// at `as_of`.
    pub fn build(
        valuations: &Valuations,
        ledger: &Ledger,
        prices: &PriceBook,
        benchmark_symbol: &str,
        benchmark_label: impl Into<String>,
        as_of: NaiveDate,
    ) -> Self {
        let portfolio = valuations.returns(&SeriesKey::Portfolio);

        let sectors: BTreeMap<String, SectorReturns> = valuations
            .sectors()
            .into_iter()
            .map(|sector| {
                let returns = SectorReturns {
                    etf: valuations
                        .returns(&SeriesKey::SectorClass(sector.clone(), InstrumentClass::Etf)),
                    stocks: valuations
                        .returns(&SeriesKey::SectorClass(sector.clone(), InstrumentClass::Stock)),
                    total: valuations.returns(&SeriesKey::Sector(sector.clone())),
                };
                (sector, returns)
            })
            .collect();

        let instruments = valuations
            .keys()
            .filter_map(|key| match key {
                SeriesKey::Instrument(symbol) => Some((symbol.clone(), valuations.returns(key))),
                _ => None,
            })
            .collect();

        let benchmark_key = SeriesKey::Benchmark(benchmark_symbol.to_ascii_uppercase());
        let benchmark = match prices.get(benchmark_symbol) {
            Some(history) => {
                let cut = PriceHistory::new(
                    history.points().iter().copied().filter(|(d, _)| *d <= as_of),
                );
                ReturnSeries::from_prices(benchmark_key, &cut)
            }
            None => {
                tracing::warn!(symbol = benchmark_symbol, "no quotes for benchmark index");
                ReturnSeries::empty(benchmark_key)
            }
        };

        let in_range = |dates: Vec<NaiveDate>| -> Vec<NaiveDate> {
            dates.into_iter().filter(|d| *d <= as_of).collect()
        };
        let transaction_dates = sectors
            .keys()
            .map(|sector| {
                let dates = SectorTransactionDates {
                    etf: in_range(ledger.transaction_dates(Some(sector), Some(InstrumentClass::Etf))),
                    stocks: in_range(
                        ledger.transaction_dates(Some(sector), Some(InstrumentClass::Stock)),
                    ),
                    all: in_range(ledger.transaction_dates(Some(sector), None)),
                };
                (sector.clone(), dates)
            })
            .collect();

        tracing::debug!(
            sectors = sectors.len(),
            portfolio_points = portfolio.len(),
            benchmark_points = benchmark.len(),
            "built return series"
        );

        Self {
            portfolio,
            sectors,
            instruments,
            benchmark,
            benchmark_label: benchmark_label.into(),
            transaction_dates,
            portfolio_transaction_dates: in_range(ledger.transaction_dates(None, None)),
            as_of,
        }
    }

    /// Sector names, sorted.
    pub fn sector_names(&self) -> impl Iterator<Item = &str> {
        self.sectors.keys().map(String::as_str)
    }

    /// Union of all dates across the given series.
    pub(crate) fn union_dates<'a>(series: impl IntoIterator<Item = &'a ReturnSeries>) -> Vec<NaiveDate> {
        let set: BTreeSet<NaiveDate> = series.into_iter().flat_map(|s| s.dates()).collect();
        set.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::holdings::HoldingsReconstructor;
    use approx::assert_relative_eq;
    use rstest::rstest;
    use smic_data::{Action, TransactionEvent};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn trade(
        date: NaiveDate,
        symbol: &str,
        sector: &str,
        class: InstrumentClass,
        action: Action,
        quantity: f64,
        price: f64,
    ) -> TransactionEvent {
        TransactionEvent {
            date,
            symbol: symbol.to_string(),
            sector: sector.to_string(),
            class,
            action,
            quantity,
            price,
            amount: quantity * price,
        }
    }

    fn point(date: NaiveDate, value: f64, purchases: f64, sales: f64) -> ValuationPoint {
        ValuationPoint {
            date,
            value,
            purchases,
            sales,
            dividends: 0.0,
        }
    }

    #[test]
    fn test_single_buy_marks_twenty_percent() {
        let ledger = Ledger::from_events(vec![trade(
            d(2024, 1, 1),
            "AAA",
            "Tech",
            InstrumentClass::Stock,
            Action::Buy,
            10.0,
            10.0,
        )])
        .unwrap();
        let mut prices = PriceBook::new();
        prices.insert("AAA", PriceHistory::new([(d(2024, 6, 1), 12.0)]));

        let history = HoldingsReconstructor::default()
            .reconstruct(&ledger, &prices, d(2024, 6, 1))
            .unwrap();
        let series = Valuations::from_history(&history).returns(&SeriesKey::Portfolio);

        let last = series.last().unwrap();
        assert_eq!(last.date, d(2024, 6, 1));
        assert_relative_eq!(last.value, 120.0);
        assert_relative_eq!(last.cumulative_return, 0.20, epsilon = 1e-12);
    }

    #[test]
    fn test_contributions_do_not_count_as_return() {
        let series = ReturnSeries::from_valuations(
            SeriesKey::Portfolio,
            &[
                point(d(2024, 1, 1), 100.0, 100.0, 0.0),
                point(d(2024, 1, 2), 110.0, 0.0, 0.0),
                // 100 more invested; the position ends flat on the day
                point(d(2024, 1, 3), 210.0, 100.0, 0.0),
                point(d(2024, 1, 4), 231.0, 0.0, 0.0),
            ],
        );

        let cumulative: Vec<f64> = series.points().iter().map(|p| p.cumulative_return).collect();
        assert_relative_eq!(cumulative[1], 0.10, epsilon = 1e-12);
        assert_relative_eq!(cumulative[2], 0.10, epsilon = 1e-12);
        assert_relative_eq!(cumulative[3], 0.21, epsilon = 1e-12);
    }

    #[test]
    fn test_sale_proceeds_keep_return_intact() {
        let series = ReturnSeries::from_valuations(
            SeriesKey::Portfolio,
            &[
                point(d(2024, 1, 1), 100.0, 100.0, 0.0),
                point(d(2024, 1, 2), 0.0, 0.0, 105.0),
                point(d(2024, 1, 3), 0.0, 0.0, 0.0),
            ],
        );

        assert_relative_eq!(series.total_return(), 0.05, epsilon = 1e-12);
        assert_relative_eq!(series.points()[2].period_return, 0.0);
    }

    #[test]
    fn test_series_starts_when_key_is_first_held() {
        let series = ReturnSeries::from_valuations(
            SeriesKey::Portfolio,
            &[
                point(d(2024, 1, 1), 0.0, 0.0, 0.0),
                point(d(2024, 1, 2), 50.0, 50.0, 0.0),
                point(d(2024, 1, 3), 55.0, 0.0, 0.0),
            ],
        );
        assert_eq!(series.first_date(), Some(d(2024, 1, 2)));
        assert_eq!(series.points()[0].cumulative_return, 0.0);

        let never = ReturnSeries::from_valuations(
            SeriesKey::Portfolio,
            &[point(d(2024, 1, 1), 0.0, 0.0, 0.0)],
        );
        assert!(never.is_empty());
    }

    #[test]
    fn test_chained_period_returns_reproduce_cumulative() {
        let values = [100.0, 104.0, 98.0, 150.0, 149.0, 160.0];
        let purchases = [100.0, 0.0, 0.0, 50.0, 0.0, 0.0];
        let valuations: Vec<ValuationPoint> = values
            .iter()
            .zip(purchases)
            .enumerate()
            .map(|(i, (&v, b))| point(d(2024, 1, 1 + i as u32), v, b, 0.0))
            .collect();

        let series = ReturnSeries::from_valuations(SeriesKey::Portfolio, &valuations);
        let mut growth = 1.0;
        for p in series.points() {
            growth *= 1.0 + p.period_return;
            assert_relative_eq!(growth - 1.0, p.cumulative_return, max_relative = 1e-9);
        }
    }

    #[test]
    fn test_rebased_starts_at_zero_on_grid() {
        let history = PriceHistory::new([
            (d(2024, 12, 31), 100.0),
            (d(2025, 1, 2), 110.0),
            (d(2025, 3, 1), 121.0),
        ]);
        let series = ReturnSeries::from_prices(SeriesKey::Benchmark("SPY".into()), &history);

        let rebased = series.rebased(&[d(2025, 1, 2), d(2025, 2, 1), d(2025, 3, 1)]);
        let cumulative: Vec<f64> = rebased.points().iter().map(|p| p.cumulative_return).collect();
        assert_eq!(cumulative[0], 0.0);
        assert_relative_eq!(cumulative[1], 0.0);
        assert_relative_eq!(cumulative[2], 0.10, epsilon = 1e-12);
        assert_relative_eq!(rebased.points()[1].value, 110.0);
    }

    #[test]
    fn test_window_drops_points_outside() {
        let history = PriceHistory::new([
            (d(2024, 1, 1), 10.0),
            (d(2024, 2, 1), 20.0),
            (d(2024, 3, 1), 30.0),
        ]);
        let series = ReturnSeries::from_prices(SeriesKey::Instrument("AAA".into()), &history);

        let window = series.window(d(2024, 2, 1), d(2024, 2, 28));
        assert_eq!(window.len(), 1);
        assert_eq!(window.total_return(), 0.0);
    }

    #[test]
    fn test_sector_weights_sum_to_one() {
        let ledger = Ledger::from_events(vec![
            trade(d(2024, 1, 1), "XLK", "Tech", InstrumentClass::Etf, Action::Buy, 2.0, 50.0),
            trade(d(2024, 1, 1), "AAPL", "Tech", InstrumentClass::Stock, Action::Buy, 1.0, 100.0),
            trade(d(2024, 1, 1), "XLE", "Energy", InstrumentClass::Etf, Action::Buy, 4.0, 25.0),
        ])
        .unwrap();

        let history = HoldingsReconstructor::default()
            .reconstruct(&ledger, &PriceBook::new(), d(2024, 1, 31))
            .unwrap();
        let valuations = Valuations::from_history(&history);

        let date = d(2024, 1, 31);
        let total: f64 = valuations
            .sectors()
            .iter()
            .flat_map(|sector| {
                InstrumentClass::all()
                    .map(|class| SeriesKey::SectorClass(sector.clone(), class))
            })
            .filter_map(|key| valuations.weight(&key, date))
            .sum();
        assert_relative_eq!(total, 1.0, epsilon = 1e-12);
        assert_eq!(valuations.sectors(), vec!["Energy".to_string(), "Tech".to_string()]);
    }

    #[test]
    fn test_returns_data_build_splits_sectors() {
        let ledger = Ledger::from_events(vec![
            trade(d(2024, 1, 2), "XLK", "Tech", InstrumentClass::Etf, Action::Buy, 1.0, 100.0),
            trade(d(2024, 2, 1), "XLE", "Energy", InstrumentClass::Etf, Action::Buy, 1.0, 80.0),
        ])
        .unwrap();
        let mut prices = PriceBook::new();
        prices.insert(
            "SPY",
            PriceHistory::new([(d(2023, 1, 3), 380.0), (d(2024, 12, 31), 470.0), (d(2025, 1, 2), 480.0)]),
        );

        let as_of = d(2024, 12, 31);
        let history = HoldingsReconstructor::default()
            .reconstruct(&ledger, &prices, as_of)
            .unwrap();
        let data = ReturnsData::build(
            &Valuations::from_history(&history),
            &ledger,
            &prices,
            "spy",
            "S&P 500",
            as_of,
        );

        assert_eq!(data.sector_names().collect::<Vec<_>>(), vec!["Energy", "Tech"]);
        assert!(data.sectors["Tech"].stocks.is_empty());
        assert_eq!(data.sectors["Tech"].etf.first_date(), Some(d(2024, 1, 2)));
        assert_eq!(data.benchmark.last_date(), Some(as_of));
        assert_eq!(data.transaction_dates["Energy"].etf, vec![d(2024, 2, 1)]);
        assert_eq!(data.portfolio_transaction_dates.len(), 2);
    }

    #[rstest]
    #[case("General", Period::General)]
    #[case("ytd", Period::Ytd)]
    #[case(" YTD ", Period::Ytd)]
    fn test_period_from_str(#[case] raw: &str, #[case] expected: Period) {
        assert_eq!(raw.parse::<Period>().unwrap(), expected);
    }

    #[test]
    fn test_period_bounds() {
        let as_of = d(2025, 6, 30);
        assert_eq!(Period::General.bounds(as_of), (None, as_of));
        assert_eq!(Period::Ytd.bounds(as_of), (Some(d(2025, 1, 1)), as_of));
        assert!("quarterly".parse::<Period>().is_err());
    }
}
