//! Portfolio summary statistics and sector breakdown tables.
//!
//! Values are kept unrounded. Rounding to two decimals only happens when
//! rows are rendered for display or export.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use smic_analytics::{
    BenchmarkComparator, ComparisonType, HoldingsHistory, PerformanceStats, Period, ReturnsData,
    SeriesKey, StatsConfig, Valuations,
};
use smic_data::InstrumentClass;
use std::fmt;

/// One row of the Metric/Value table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MetricRow {
    /// Metric name.
    #[serde(rename = "Metric")]
    pub metric: String,

    /// Rendered value.
    #[serde(rename = "Value")]
    pub value: String,
}

impl MetricRow {
    fn new(metric: &str, value: impl Into<String>) -> Self {
        Self {
            metric: metric.to_string(),
            value: value.into(),
        }
    }
}

/// Headline statistics for the whole portfolio.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SummaryStatistics {
    /// Portfolio name.
    pub name: String,

    /// First valuation date.
    pub start_date: Option<NaiveDate>,

    /// Last valuation date.
    pub end_date: Option<NaiveDate>,

    /// Market value on the last date.
    pub end_value: f64,

    /// Purchases minus sale proceeds.
    pub net_invested: f64,

    /// Time-weighted return since inception.
    pub total_return: f64,

    /// Compound annual growth rate.
    pub annualized_return: f64,

    /// Time-weighted return since January 1 of the analysis year.
    pub ytd_return: f64,

    /// Annualised volatility.
    pub volatility: f64,

    /// Largest peak-to-trough decline (non-positive).
    pub max_drawdown: f64,

    /// Sharpe ratio.
    pub sharpe_ratio: f64,

    /// Gains realized on sales.
    pub realized_pnl: f64,

    /// Market value minus cost basis of open positions.
    pub unrealized_pnl: f64,

    /// Dividend income received.
    pub dividend_income: f64,

    /// Number of open positions on the last date.
    pub open_positions: usize,

    /// Number of ledger events replayed.
    pub transaction_count: usize,

    /// Legend label of the index.
    pub benchmark_label: String,

    /// Index return over the portfolio's comparison window.
    pub benchmark_return: Option<f64>,

    /// Portfolio minus index return over the same window.
    pub excess_return: Option<f64>,
}

impl SummaryStatistics {
    /// Rows for the Metric/Value table, in display order.
    pub fn metric_rows(&self) -> Vec<MetricRow> {
        let date = |d: Option<NaiveDate>| d.map_or_else(|| "N/A".to_string(), |d| d.to_string());
        let optional_pct = |v: Option<f64>| v.map_or_else(|| "N/A".to_string(), format_percent);

        vec![
            MetricRow::new("Start Date", date(self.start_date)),
            MetricRow::new("End Date", date(self.end_date)),
            MetricRow::new("Portfolio Value", format_currency(self.end_value)),
            MetricRow::new("Net Invested", format_currency(self.net_invested)),
            MetricRow::new("Total Return", format_percent(self.total_return)),
            MetricRow::new("Annualized Return", format_percent(self.annualized_return)),
            MetricRow::new("YTD Return", format_percent(self.ytd_return)),
            MetricRow::new("Volatility (Annualized)", format_percent(self.volatility)),
            MetricRow::new("Max Drawdown", format_percent(self.max_drawdown)),
            MetricRow::new("Sharpe Ratio", format!("{:.2}", self.sharpe_ratio)),
            MetricRow::new("Realized P&L", format_currency(self.realized_pnl)),
            MetricRow::new("Unrealized P&L", format_currency(self.unrealized_pnl)),
            MetricRow::new("Dividend Income", format_currency(self.dividend_income)),
            MetricRow::new("Open Positions", self.open_positions.to_string()),
            MetricRow::new("Transactions", self.transaction_count.to_string()),
            MetricRow::new(
                &format!("{} Return", self.benchmark_label),
                optional_pct(self.benchmark_return),
            ),
            MetricRow::new("Excess Return", optional_pct(self.excess_return)),
        ]
    }

    /// Format as ASCII table for terminal display.
    pub fn to_ascii_table(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!("\nPortfolio Summary: {}\n", self.name));
        output.push_str(&"=".repeat(60));
        output.push('\n');
        for row in self.metric_rows() {
            output.push_str(&format!("  {:<28} {:>28}\n", row.metric, row.value));
        }
        output.push_str(&"=".repeat(60));
        output.push('\n');

        output
    }

    /// Format as Markdown.
    pub fn to_markdown(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!("# Portfolio Summary: {}\n\n", self.name));
        output.push_str("| Metric | Value |\n");
        output.push_str("|--------|-------|\n");
        for row in self.metric_rows() {
            output.push_str(&format!("| {} | {} |\n", row.metric, row.value));
        }

        output
    }
}

impl fmt::Display for SummaryStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Portfolio Summary: {}", self.name)?;
        for row in self.metric_rows() {
            writeln!(f, "  {}: {}", row.metric, row.value)?;
        }
        Ok(())
    }
}

/// Start and end weights of one sector, as fractions of portfolio value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SectorBreakdownRow {
    /// Sector name.
    pub sector: String,
    /// ETF leg weight at window start.
    pub etf_weight_start: f64,
    /// ETF leg weight at window end.
    pub etf_weight_end: f64,
    /// Stock leg weight at window start.
    pub stocks_weight_start: f64,
    /// Stock leg weight at window end.
    pub stocks_weight_end: f64,
}

impl SectorBreakdownRow {
    /// Whole-sector weight at window start.
    pub fn total_start(&self) -> f64 {
        self.etf_weight_start + self.stocks_weight_start
    }

    /// Whole-sector weight at window end.
    pub fn total_end(&self) -> f64 {
        self.etf_weight_end + self.stocks_weight_end
    }

    /// Display record with percentages rounded to two decimals.
    pub fn to_record(&self) -> SectorBreakdownRecord {
        SectorBreakdownRecord {
            sector: self.sector.clone(),
            etf_weight_start: round_pct(self.etf_weight_start),
            etf_weight_end: round_pct(self.etf_weight_end),
            stocks_weight_start: round_pct(self.stocks_weight_start),
            stocks_weight_end: round_pct(self.stocks_weight_end),
            total_start: round_pct(self.total_start()),
            total_end: round_pct(self.total_end()),
        }
    }
}

/// Rendered breakdown row, column names as they appear in exported tables.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SectorBreakdownRecord {
    /// Sector name.
    #[serde(rename = "Sector")]
    pub sector: String,
    /// ETF leg weight at window start, percent.
    #[serde(rename = "ETF_Weight_Start (%)")]
    pub etf_weight_start: f64,
    /// ETF leg weight at window end, percent.
    #[serde(rename = "ETF_Weight_End (%)")]
    pub etf_weight_end: f64,
    /// Stock leg weight at window start, percent.
    #[serde(rename = "Stocks_Weight_Start (%)")]
    pub stocks_weight_start: f64,
    /// Stock leg weight at window end, percent.
    #[serde(rename = "Stocks_Weight_End (%)")]
    pub stocks_weight_end: f64,
    /// Sector weight at window start, percent.
    #[serde(rename = "Total_Sector_Start (%)")]
    pub total_start: f64,
    /// Sector weight at window end, percent.
    #[serde(rename = "Total_Sector_End (%)")]
    pub total_end: f64,
}

/// Sector weights at the start and end of one reporting window.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SectorBreakdown {
    /// Window.
    pub period: Period,
    /// First valuation date inside the window.
    pub start: Option<NaiveDate>,
    /// Last valuation date inside the window.
    pub end: Option<NaiveDate>,
    /// One row per sector, sorted by name.
    pub rows: Vec<SectorBreakdownRow>,
}

impl SectorBreakdown {
    /// Rounded display records.
    pub fn records(&self) -> Vec<SectorBreakdownRecord> {
        self.rows.iter().map(SectorBreakdownRow::to_record).collect()
    }

    /// Format as ASCII table for terminal display.
    pub fn to_ascii_table(&self) -> String {
        let mut output = String::new();
        let span = match (self.start, self.end) {
            (Some(start), Some(end)) => format!("{start} to {end}"),
            _ => "no data".to_string(),
        };

        output.push_str(&format!("\n{} Sector Breakdown ({span})\n", self.period));
        output.push_str(&"-".repeat(88));
        output.push('\n');
        output.push_str(&format!(
            "{:<20} {:>10} {:>10} {:>10} {:>10} {:>11} {:>11}\n",
            "Sector", "ETF Start", "ETF End", "Stk Start", "Stk End", "Total Start", "Total End"
        ));
        output.push_str(&"-".repeat(88));
        output.push('\n');
        for r in self.records() {
            output.push_str(&format!(
                "{:<20} {:>9.2}% {:>9.2}% {:>9.2}% {:>9.2}% {:>10.2}% {:>10.2}%\n",
                r.sector,
                r.etf_weight_start,
                r.etf_weight_end,
                r.stocks_weight_start,
                r.stocks_weight_end,
                r.total_start,
                r.total_end
            ));
        }

        output
    }

    /// Format as Markdown.
    pub fn to_markdown(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!("## {} Sector Breakdown\n\n", self.period));
        output.push_str(
            "| Sector | ETF Weight Start | ETF Weight End | Stocks Weight Start | Stocks Weight End | Total Sector Start | Total Sector End |\n",
        );
        output.push_str("|--------|---|---|---|---|---|---|\n");
        for r in self.records() {
            output.push_str(&format!(
                "| {} | {:.2}% | {:.2}% | {:.2}% | {:.2}% | {:.2}% | {:.2}% |\n",
                r.sector,
                r.etf_weight_start,
                r.etf_weight_end,
                r.stocks_weight_start,
                r.stocks_weight_end,
                r.total_start,
                r.total_end
            ));
        }

        output
    }
}

/// Compute headline statistics for a run.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use smic_analytics::{HoldingsReconstructor, ReturnsData, StatsConfig, Valuations};
/// use smic_data::{Action, InstrumentClass, Ledger, PriceBook, PriceHistory, TransactionEvent};
/// use smic_output::generate_summary;
///
/// let d = |m, day| NaiveDate::from_ymd_opt(2024, m, day).unwrap();
/// let ledger = Ledger::from_events(vec![TransactionEvent {
///     date: d(1, 1),
///     symbol: "AAA".into(),
///     sector: "Tech".into(),
///     class: InstrumentClass::Stock,
///     action: Action::Buy,
///     quantity: 10.0,
///     price: 10.0,
///     amount: 100.0,
/// }])
/// .unwrap();
/// let mut prices = PriceBook::new();
/// prices.insert("AAA", PriceHistory::new([(d(6, 1), 12.0)]));
///
/// let history = HoldingsReconstructor::default()
///     .reconstruct(&ledger, &prices, d(6, 1))
///     .unwrap();
/// let valuations = Valuations::from_history(&history);
/// let data = ReturnsData::build(&valuations, &ledger, &prices, "SPY", "S&P 500", d(6, 1));
///
/// let summary = generate_summary("SMIC", &history, &data, &StatsConfig::default());
/// assert_eq!(summary.end_value, 120.0);
/// assert_eq!(summary.metric_rows()[4].value, "20.00%");
/// ```
pub fn generate_summary(
    name: &str,
    history: &HoldingsHistory,
    data: &ReturnsData,
    config: &StatsConfig,
) -> SummaryStatistics {
    let stats = PerformanceStats::from_series(&data.portfolio, config);

    let (ytd_start, ytd_end) = Period::Ytd.bounds(data.as_of);
    let ytd_return = data
        .portfolio
        .window(ytd_start.unwrap_or(NaiveDate::MIN), ytd_end)
        .total_return();

    let comparison = BenchmarkComparator::new(data)
        .compare(ComparisonType::EquityVsSp500, None, Period::General)
        .ok();
    let benchmark_return = comparison
        .as_ref()
        .filter(|c| !c.benchmark.is_empty())
        .map(|c| c.benchmark.total_return());
    let excess_return = comparison.as_ref().and_then(|c| c.excess_return());

    SummaryStatistics {
        name: name.to_string(),
        start_date: stats.start_date,
        end_date: stats.end_date,
        end_value: data.portfolio.last().map_or(0.0, |p| p.value),
        net_invested: history.net_invested(),
        total_return: stats.total_return,
        annualized_return: stats.annualized_return,
        ytd_return,
        volatility: stats.volatility,
        max_drawdown: stats.max_drawdown,
        sharpe_ratio: stats.sharpe_ratio,
        realized_pnl: history.realized_pnl(),
        unrealized_pnl: history.unrealized_pnl(),
        dividend_income: history.dividend_income(),
        open_positions: history.latest().map_or(0, |s| s.holdings.len()),
        transaction_count: history.transaction_count(),
        benchmark_label: data.benchmark_label.clone(),
        benchmark_return,
        excess_return,
    }
}

/// Sector weights at the first and last valuation date inside a window.
pub fn sector_breakdown(valuations: &Valuations, period: Period, as_of: NaiveDate) -> SectorBreakdown {
    let (window_start, window_end) = period.bounds(as_of);
    let in_window: Vec<NaiveDate> = valuations
        .dates()
        .iter()
        .copied()
        .filter(|d| window_start.is_none_or(|s| *d >= s) && *d <= window_end)
        .filter(|d| valuations.value_at(&SeriesKey::Portfolio, *d) > 0.0)
        .collect();
    let start = in_window.first().copied();
    let end = in_window.last().copied();

    let weight = |sector: &str, class: InstrumentClass, date: Option<NaiveDate>| {
        date.and_then(|d| {
            valuations.weight(&SeriesKey::SectorClass(sector.to_string(), class), d)
        })
        .unwrap_or(0.0)
    };

    let rows = valuations
        .sectors()
        .into_iter()
        .map(|sector| SectorBreakdownRow {
            etf_weight_start: weight(&sector, InstrumentClass::Etf, start),
            etf_weight_end: weight(&sector, InstrumentClass::Etf, end),
            stocks_weight_start: weight(&sector, InstrumentClass::Stock, start),
            stocks_weight_end: weight(&sector, InstrumentClass::Stock, end),
            sector,
        })
        .collect();

    SectorBreakdown {
        period,
        start,
        end,
        rows,
    }
}

/// Fraction to percent, rounded to two decimals.
fn round_pct(fraction: f64) -> f64 {
    (fraction * 10_000.0).round() / 100.0
}

fn format_percent(fraction: f64) -> String {
    format!("{:.2}%", fraction * 100.0)
}

/// Dollar amount with thousands separators, e.g. `-$1,234.50`.
fn format_currency(amount: f64) -> String {
    let cents = format!("{:.2}", amount.abs());
    let (whole, frac) = cents.split_once('.').unwrap_or((cents.as_str(), "00"));
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if amount < 0.0 && cents != "0.00" { "-" } else { "" };
    format!("{sign}${grouped}.{frac}")
}
