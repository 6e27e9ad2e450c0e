//! Chart specifications.
//!
//! Every chart is emitted as plain data in the `{data, layout}` shape a
//! plotting front end consumes. Nothing here renders or touches the disk,
//! and the same inputs always serialise to the same JSON.

use crate::summary::SectorBreakdown;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use smic_analytics::{ComparisonResult, ReturnSeries, ReturnsData, SeriesKey, Valuations};
use smic_data::InstrumentClass;
use std::collections::BTreeMap;

/// Trace colours, assigned by trace position.
pub const PALETTE: [&str; 10] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
    "#bcbd22", "#17becf",
];

/// Key of the portfolio value / cumulative return chart.
pub const PERFORMANCE: &str = "performance";
/// Key of the sector weight drift chart.
pub const WEIGHT_DRIFT: &str = "weight_drift";
/// Key of the stacked sector allocation chart.
pub const SECTOR_ALLOCATION: &str = "sector_allocation";
/// Key of the per-sector ETF vs Stocks value chart.
pub const ETF_VS_STOCKS: &str = "etf_vs_stocks";
/// Key of the grouped ETF vs Stocks weight bar chart.
pub const BAR_COMPARISON: &str = "bar_comparison";

fn color(index: usize) -> String {
    PALETTE[index % PALETTE.len()].to_string()
}

/// Plot type of a trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceType {
    /// Line or marker series.
    Scatter,
    /// Bars.
    Bar,
}

/// Line styling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    /// CSS colour.
    pub color: String,
    /// Stroke width in pixels.
    pub width: f64,
    /// `solid`, `dash` or `dot`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dash: Option<String>,
}

/// Marker styling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    /// CSS colour.
    pub color: String,
    /// Marker size in pixels.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<f64>,
    /// Marker symbol name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
}

/// One data series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    /// Legend entry.
    pub name: String,

    /// Plot type.
    #[serde(rename = "type")]
    pub trace_type: TraceType,

    /// `lines`, `markers` or `lines+markers` for scatter traces.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,

    /// ISO dates or category labels.
    pub x: Vec<String>,

    /// Values.
    pub y: Vec<f64>,

    /// Secondary axis reference (`y2`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yaxis: Option<String>,

    /// Stack group for area charts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stackgroup: Option<String>,

    /// Line styling.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<Line>,

    /// Marker styling.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marker: Option<Marker>,
}

impl Trace {
    fn line(name: impl Into<String>, x: Vec<String>, y: Vec<f64>, index: usize) -> Self {
        Self {
            name: name.into(),
            trace_type: TraceType::Scatter,
            mode: Some("lines".to_string()),
            x,
            y,
            yaxis: None,
            stackgroup: None,
            line: Some(Line {
                color: color(index),
                width: 2.0,
                dash: None,
            }),
            marker: None,
        }
    }

    fn markers(name: impl Into<String>, x: Vec<String>, y: Vec<f64>, index: usize) -> Self {
        Self {
            name: name.into(),
            trace_type: TraceType::Scatter,
            mode: Some("markers".to_string()),
            x,
            y,
            yaxis: None,
            stackgroup: None,
            line: None,
            marker: Some(Marker {
                color: color(index),
                size: Some(9.0),
                symbol: Some("triangle-up".to_string()),
            }),
        }
    }

    fn bar(name: impl Into<String>, x: Vec<String>, y: Vec<f64>, index: usize) -> Self {
        Self {
            name: name.into(),
            trace_type: TraceType::Bar,
            mode: None,
            x,
            y,
            yaxis: None,
            stackgroup: None,
            line: None,
            marker: Some(Marker {
                color: color(index),
                size: None,
                symbol: None,
            }),
        }
    }

    fn on_secondary_axis(mut self) -> Self {
        self.yaxis = Some("y2".to_string());
        self
    }

    fn stacked(mut self, group: &str) -> Self {
        self.stackgroup = Some(group.to_string());
        self
    }

    fn dashed(mut self) -> Self {
        if let Some(line) = self.line.as_mut() {
            line.dash = Some("dash".to_string());
        }
        self
    }
}

/// Axis settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Axis {
    /// Axis title.
    pub title: String,
    /// Tick suffix, e.g. `%`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticksuffix: Option<String>,
    /// Tick prefix, e.g. `$`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tickprefix: Option<String>,
    /// Axis this one is drawn over (`y` for a secondary axis).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overlaying: Option<String>,
    /// `left` or `right`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub side: Option<String>,
}

impl Axis {
    fn titled(title: &str) -> Self {
        Self {
            title: title.to_string(),
            ..Self::default()
        }
    }

    fn percent(title: &str) -> Self {
        Self {
            ticksuffix: Some("%".to_string()),
            ..Self::titled(title)
        }
    }

    fn dollars(title: &str) -> Self {
        Self {
            tickprefix: Some("$".to_string()),
            ..Self::titled(title)
        }
    }
}

/// Free-floating text on the plot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    /// Text shown.
    pub text: String,
    /// Horizontal position in paper coordinates.
    pub x: f64,
    /// Vertical position in paper coordinates.
    pub y: f64,
    /// Coordinate system of `x`.
    pub xref: String,
    /// Coordinate system of `y`.
    pub yref: String,
    /// Whether an arrow is drawn.
    pub showarrow: bool,
}

impl Annotation {
    fn centered(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            x: 0.5,
            y: 0.5,
            xref: "paper".to_string(),
            yref: "paper".to_string(),
            showarrow: false,
        }
    }
}

/// Figure layout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    /// Chart title.
    pub title: String,
    /// Horizontal axis.
    pub xaxis: Axis,
    /// Primary vertical axis.
    pub yaxis: Axis,
    /// Secondary vertical axis.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yaxis2: Option<Axis>,
    /// `group` or `stack` for bar charts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub barmode: Option<String>,
    /// Hover behaviour.
    pub hovermode: String,
    /// Text annotations.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<Annotation>,
}

impl Layout {
    fn new(title: impl Into<String>, xaxis: Axis, yaxis: Axis) -> Self {
        Self {
            title: title.into(),
            xaxis,
            yaxis,
            hovermode: "x unified".to_string(),
            ..Self::default()
        }
    }
}

/// A complete figure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
    /// Traces in drawing order.
    pub data: Vec<Trace>,
    /// Figure layout.
    pub layout: Layout,
}

impl ChartSpec {
    /// Trace with the given legend name.
    pub fn trace(&self, name: &str) -> Option<&Trace> {
        self.data.iter().find(|t| t.name == name)
    }
}

fn date_axis(dates: impl IntoIterator<Item = NaiveDate>) -> Vec<String> {
    dates.into_iter().map(|d| d.to_string()).collect()
}

fn cumulative_pct(series: &ReturnSeries) -> Vec<f64> {
    series
        .points()
        .iter()
        .map(|p| p.cumulative_return * 100.0)
        .collect()
}

/// Dates on which the portfolio held something.
fn invested_dates(valuations: &Valuations) -> Vec<NaiveDate> {
    valuations
        .points(&SeriesKey::Portfolio)
        .iter()
        .filter(|p| p.value > 0.0)
        .map(|p| p.date)
        .collect()
}

/// Portfolio value with cumulative return, and the index on the same scale.
pub fn performance_chart(data: &ReturnsData) -> ChartSpec {
    let portfolio = &data.portfolio;
    let x = date_axis(portfolio.dates());
    let value: Vec<f64> = portfolio.points().iter().map(|p| p.value).collect();

    let mut traces = vec![Trace::line("Portfolio Value", x, value, 0)];

    // Both return lines share a grid starting at the later of the two first dates.
    let index_start = data.benchmark.first_date();
    let grid: Vec<NaiveDate> = match index_start {
        Some(start) => portfolio.dates().filter(|d| *d >= start).collect(),
        None => portfolio.dates().collect(),
    };
    let index = data.benchmark.rebased(&grid);
    let own = if index.is_empty() {
        portfolio.clone()
    } else {
        portfolio.rebased(&grid)
    };
    traces.push(
        Trace::line("Portfolio Return", date_axis(own.dates()), cumulative_pct(&own), 1)
            .on_secondary_axis(),
    );
    if !index.is_empty() {
        traces.push(
            Trace::line(
                format!("{} Return", data.benchmark_label),
                date_axis(index.dates()),
                cumulative_pct(&index),
                2,
            )
            .on_secondary_axis()
            .dashed(),
        );
    }

    let mut layout = Layout::new(
        "Portfolio Performance",
        Axis::titled("Date"),
        Axis::dollars("Market Value"),
    );
    layout.yaxis2 = Some(Axis {
        overlaying: Some("y".to_string()),
        side: Some("right".to_string()),
        ..Axis::percent("Cumulative Return")
    });

    ChartSpec {
        data: traces,
        layout,
    }
}

/// Each sector's share of portfolio value over time.
pub fn weight_drift_chart(valuations: &Valuations) -> ChartSpec {
    let dates = invested_dates(valuations);
    let traces = valuations
        .sectors()
        .into_iter()
        .enumerate()
        .map(|(i, sector)| {
            let key = SeriesKey::Sector(sector.clone());
            let y = dates
                .iter()
                .map(|d| valuations.weight(&key, *d).unwrap_or(0.0) * 100.0)
                .collect();
            Trace::line(sector, date_axis(dates.iter().copied()), y, i)
        })
        .collect();

    ChartSpec {
        data: traces,
        layout: Layout::new(
            "Sector Weight Drift",
            Axis::titled("Date"),
            Axis::percent("Weight"),
        ),
    }
}

/// Stacked market value by sector.
pub fn sector_allocation_chart(valuations: &Valuations) -> ChartSpec {
    let dates = invested_dates(valuations);
    let traces = valuations
        .sectors()
        .into_iter()
        .enumerate()
        .map(|(i, sector)| {
            let key = SeriesKey::Sector(sector.clone());
            let y = dates.iter().map(|d| valuations.value_at(&key, *d)).collect();
            Trace::line(sector, date_axis(dates.iter().copied()), y, i).stacked("sectors")
        })
        .collect();

    ChartSpec {
        data: traces,
        layout: Layout::new(
            "Sector Allocation",
            Axis::titled("Date"),
            Axis::dollars("Market Value"),
        ),
    }
}

/// ETF and Stocks market value for every sector.
pub fn etf_vs_stocks_chart(valuations: &Valuations) -> ChartSpec {
    let dates = invested_dates(valuations);
    let mut traces = Vec::new();
    for sector in valuations.sectors() {
        for class in InstrumentClass::all() {
            let key = SeriesKey::SectorClass(sector.clone(), class);
            if valuations.points(&key).is_empty() {
                continue;
            }
            let y = dates.iter().map(|d| valuations.value_at(&key, *d)).collect();
            let index = traces.len();
            let mut trace =
                Trace::line(format!("{sector} {class}"), date_axis(dates.iter().copied()), y, index);
            if class == InstrumentClass::Etf {
                trace = trace.dashed();
            }
            traces.push(trace);
        }
    }

    ChartSpec {
        data: traces,
        layout: Layout::new(
            "ETF vs Stocks by Sector",
            Axis::titled("Date"),
            Axis::dollars("Market Value"),
        ),
    }
}

/// End-of-window ETF and Stocks weight per sector, grouped.
pub fn bar_comparison_chart(breakdown: &SectorBreakdown) -> ChartSpec {
    let records = breakdown.records();
    let sectors: Vec<String> = records.iter().map(|r| r.sector.clone()).collect();
    let etf = records.iter().map(|r| r.etf_weight_end).collect();
    let stocks = records.iter().map(|r| r.stocks_weight_end).collect();

    let mut layout = Layout::new(
        format!("ETF vs Stocks Weight by Sector ({})", breakdown.period),
        Axis::titled("Sector"),
        Axis::percent("Portfolio Weight"),
    );
    layout.barmode = Some("group".to_string());

    ChartSpec {
        data: vec![
            Trace::bar(InstrumentClass::Etf.label(), sectors.clone(), etf, 0),
            Trace::bar(InstrumentClass::Stock.label(), sectors, stocks, 1),
        ],
        layout,
    }
}

/// Subject against benchmark, with transaction markers inside the window.
pub fn comparison_chart(result: &ComparisonResult) -> ChartSpec {
    let mut traces = Vec::new();
    let mut annotations = Vec::new();

    for (index, (label, series, available)) in [
        (&result.subject_label, &result.subject, result.subject_available),
        (&result.benchmark_label, &result.benchmark, result.benchmark_available),
    ]
    .into_iter()
    .enumerate()
    {
        if series.is_empty() {
            let reason = if available { "outside window" } else { "not available" };
            annotations.push(Annotation::centered(format!("{label} data {reason}")));
            continue;
        }
        traces.push(Trace::line(
            label.clone(),
            date_axis(series.dates()),
            cumulative_pct(series),
            index,
        ));
    }

    for (index, (label, series, dates)) in [
        (&result.subject_label, &result.subject, &result.subject_transactions),
        (&result.benchmark_label, &result.benchmark, &result.benchmark_transactions),
    ]
    .into_iter()
    .enumerate()
    {
        let (x, y): (Vec<NaiveDate>, Vec<f64>) = dates
            .iter()
            .filter(|d| result.start.is_some_and(|s| **d >= s))
            .filter(|d| result.end.is_some_and(|e| **d <= e))
            .filter_map(|d| series.cumulative_at(*d).map(|c| (*d, c * 100.0)))
            .unzip();
        if !x.is_empty() {
            traces.push(Trace::markers(
                format!("{label} Transactions"),
                date_axis(x),
                y,
                index,
            ));
        }
    }

    let mut layout = Layout::new(
        result.title(),
        Axis::titled("Date"),
        Axis::percent("Cumulative Return"),
    );
    layout.annotations = annotations;

    ChartSpec {
        data: traces,
        layout,
    }
}

/// The five full-portfolio charts, keyed by chart name.
pub fn portfolio_charts(
    data: &ReturnsData,
    valuations: &Valuations,
    breakdown: &SectorBreakdown,
) -> BTreeMap<String, ChartSpec> {
    BTreeMap::from([
        (PERFORMANCE.to_string(), performance_chart(data)),
        (WEIGHT_DRIFT.to_string(), weight_drift_chart(valuations)),
        (SECTOR_ALLOCATION.to_string(), sector_allocation_chart(valuations)),
        (ETF_VS_STOCKS.to_string(), etf_vs_stocks_chart(valuations)),
        (BAR_COMPARISON.to_string(), bar_comparison_chart(breakdown)),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summary::SectorBreakdownRow;
    use approx::assert_relative_eq;
    use smic_analytics::{ComparisonType, Period};
    use smic_data::PriceHistory;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn series(key: SeriesKey, points: &[(NaiveDate, f64)]) -> ReturnSeries {
        ReturnSeries::from_prices(key, &PriceHistory::new(points.iter().copied()))
    }

    fn result(subject: ReturnSeries, benchmark: ReturnSeries) -> ComparisonResult {
        ComparisonResult {
            comparison_type: ComparisonType::EtfVsStocks,
            period: Period::Ytd,
            sector: Some("Tech".to_string()),
            subject_label: "Stocks".to_string(),
            benchmark_label: "ETF".to_string(),
            subject_available: !subject.is_empty(),
            benchmark_available: !benchmark.is_empty(),
            start: subject.first_date(),
            end: subject.last_date(),
            subject,
            benchmark,
            subject_transactions: vec![d(2024, 12, 1), d(2025, 2, 3)],
            benchmark_transactions: vec![],
        }
    }

    #[test]
    fn test_comparison_chart_marks_transactions_inside_window() {
        let subject = series(
            SeriesKey::SectorClass("Tech".into(), InstrumentClass::Stock),
            &[(d(2025, 1, 2), 50.0), (d(2025, 2, 3), 52.0), (d(2025, 6, 30), 54.0)],
        );
        let benchmark = series(
            SeriesKey::SectorClass("Tech".into(), InstrumentClass::Etf),
            &[(d(2025, 1, 2), 100.0), (d(2025, 2, 3), 101.0), (d(2025, 6, 30), 105.0)],
        );

        let chart = comparison_chart(&result(subject, benchmark));

        assert_eq!(chart.data.len(), 3);
        assert_eq!(chart.layout.title, "Tech: Stocks vs ETF (YTD)");
        let markers = chart.trace("Stocks Transactions").unwrap();
        assert_eq!(markers.x, vec!["2025-02-03".to_string()]);
        assert_relative_eq!(markers.y[0], 4.0, epsilon = 1e-9);
        assert!(chart.layout.annotations.is_empty());
    }

    #[test]
    fn test_missing_leg_gets_annotation() {
        let benchmark = series(
            SeriesKey::SectorClass("Tech".into(), InstrumentClass::Etf),
            &[(d(2025, 1, 2), 100.0)],
        );
        let mut r = result(
            ReturnSeries::empty(SeriesKey::SectorClass("Tech".into(), InstrumentClass::Stock)),
            benchmark,
        );
        r.start = Some(d(2025, 1, 2));
        r.end = Some(d(2025, 1, 2));

        let chart = comparison_chart(&r);
        assert_eq!(chart.data.len(), 1);
        assert_eq!(chart.layout.annotations[0].text, "Stocks data not available");
    }

    #[test]
    fn test_bar_comparison_uses_end_weights() {
        let breakdown = SectorBreakdown {
            period: Period::General,
            start: Some(d(2024, 1, 1)),
            end: Some(d(2024, 12, 31)),
            rows: vec![SectorBreakdownRow {
                sector: "Tech".to_string(),
                etf_weight_start: 0.5,
                etf_weight_end: 0.25,
                stocks_weight_start: 0.5,
                stocks_weight_end: 0.75,
            }],
        };

        let chart = bar_comparison_chart(&breakdown);
        assert_eq!(chart.layout.barmode.as_deref(), Some("group"));
        assert_eq!(chart.data[0].y, vec![25.0]);
        assert_eq!(chart.data[1].y, vec![75.0]);
        assert_eq!(chart.data[1].name, "Stocks");
    }

    #[test]
    fn test_performance_lines_share_the_later_start() {
        let portfolio = series(
            SeriesKey::Portfolio,
            &[
                (d(2024, 3, 1), 1000.0),
                (d(2024, 12, 31), 1100.0),
                (d(2025, 6, 30), 1210.0),
            ],
        );
        let benchmark = series(
            SeriesKey::Benchmark("SPY".into()),
            &[(d(2024, 12, 31), 500.0), (d(2025, 6, 30), 550.0)],
        );
        let data = ReturnsData {
            portfolio,
            sectors: BTreeMap::new(),
            instruments: BTreeMap::new(),
            benchmark,
            benchmark_label: "S&P 500".to_string(),
            transaction_dates: BTreeMap::new(),
            portfolio_transaction_dates: vec![],
            as_of: d(2025, 6, 30),
        };

        let chart = performance_chart(&data);
        assert_eq!(chart.trace("Portfolio Value").unwrap().x.len(), 3);

        let own = chart.trace("Portfolio Return").unwrap();
        let index = chart.trace("S&P 500 Return").unwrap();
        assert_eq!(own.x, index.x);
        assert_eq!(own.x[0], "2024-12-31");
        assert_eq!(own.y[0], 0.0);
        assert_eq!(index.y[0], 0.0);
        assert_relative_eq!(own.y[1], 10.0, epsilon = 1e-9);
        assert_relative_eq!(index.y[1], 10.0, epsilon = 1e-9);
    }

    #[test]
    fn test_emission_is_deterministic() {
        let subject = series(SeriesKey::Portfolio, &[(d(2025, 1, 2), 1.0), (d(2025, 3, 3), 1.1)]);
        let benchmark = series(
            SeriesKey::Benchmark("SPY".into()),
            &[(d(2025, 1, 2), 400.0), (d(2025, 3, 3), 420.0)],
        );
        let r = result(subject, benchmark);

        let a = serde_json::to_string(&comparison_chart(&r)).unwrap();
        let b = serde_json::to_string(&comparison_chart(&r)).unwrap();
        assert_eq!(a, b);
        assert!(a.contains("\"type\":\"scatter\""));
        assert!(a.contains(PALETTE[0]));
    }
}
