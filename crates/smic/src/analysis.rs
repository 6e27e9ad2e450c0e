//! End-to-end analysis runs.
//!
//! [`generate_portfolio_analysis`] replays the ledger once and keeps every
//! intermediate product in an immutable [`PortfolioAnalysis`]. Comparison
//! charts are then answered per query from its `returns_data` with
//! [`generate_comparison_plot`].

use crate::config::AnalysisConfig;
use crate::error::Result;
use chrono::NaiveDate;
use smic_analytics::{
    BenchmarkComparator, ComparisonResult, ComparisonType, HoldingsHistory, Period, ReturnsData,
    Valuations,
};
use smic_data::{Ledger, PriceBook};
use smic_output::{
    ChartSpec, DashboardExport, MetricRow, Report, ReportBuilder, SectorBreakdown,
    SummaryStatistics, comparison_chart, generate_summary, portfolio_charts, sector_breakdown,
};
use std::collections::BTreeMap;

/// Name shown in summary headers.
pub const PORTFOLIO_NAME: &str = "SMIC";

/// Dashboard key prefix for the whole-portfolio comparison.
pub const EQUITY_KEY: &str = "equity";

/// One comparison chart the dashboard carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComparisonQuery {
    /// Dashboard key, `<sector>_<period>` or `equity_<period>`.
    pub key: String,
    /// Which pair of series to compare.
    pub comparison_type: ComparisonType,
    /// Sector for ETF vs Stocks queries.
    pub sector: Option<String>,
    /// Comparison window.
    pub period: Period,
}

impl ComparisonQuery {
    fn new(comparison_type: ComparisonType, sector: Option<&str>, period: Period) -> Self {
        Self {
            key: format!("{}_{}", sector.unwrap_or(EQUITY_KEY), period.slug()),
            comparison_type,
            sector: sector.map(str::to_string),
            period,
        }
    }
}

/// Everything one run produces.
#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioAnalysis {
    /// Analysis date.
    pub as_of: NaiveDate,
    /// Assembled report.
    pub report: Report,
    /// Plain-text rendering of `report`.
    pub report_text: String,
    /// The five portfolio charts keyed by chart name.
    pub charts: BTreeMap<String, ChartSpec>,
    /// Headline statistics.
    pub summary: SummaryStatistics,
    /// Metric/Value rows of `summary`.
    pub metric_rows: Vec<MetricRow>,
    /// Year-to-date sector weights.
    pub ytd_breakdown: SectorBreakdown,
    /// Since-inception sector weights.
    pub general_breakdown: SectorBreakdown,
    /// Return series for comparator queries.
    pub returns_data: ReturnsData,
    /// Valuation series per key.
    pub valuations: Valuations,
    /// Reconstructed holdings.
    pub history: HoldingsHistory,
}

impl PortfolioAnalysis {
    /// Comparator over this run's return series.
    pub const fn comparator(&self) -> BenchmarkComparator<'_> {
        BenchmarkComparator::new(&self.returns_data)
    }

    /// Answer one comparison query.
    pub fn compare(
        &self,
        comparison_type: ComparisonType,
        sector: Option<&str>,
        period: Period,
    ) -> Result<ComparisonResult> {
        Ok(self.comparator().compare(comparison_type, sector, period)?)
    }

    /// Queries for every sector and period, then the portfolio against the
    /// index for each period.
    pub fn comparison_queries(&self) -> Vec<ComparisonQuery> {
        let mut queries = Vec::new();
        for comparison_type in ComparisonType::all() {
            let sectors: Vec<Option<&str>> = if comparison_type.requires_sector() {
                self.returns_data.sector_names().map(Some).collect()
            } else {
                vec![None]
            };
            for sector in sectors {
                queries.extend(
                    Period::all()
                        .into_iter()
                        .map(|period| ComparisonQuery::new(comparison_type, sector, period)),
                );
            }
        }
        queries
    }

    /// Chart for one query.
    pub fn comparison_plot(&self, query: &ComparisonQuery) -> Result<ChartSpec> {
        generate_comparison_plot(
            &self.returns_data,
            query.sector.as_deref(),
            query.comparison_type,
            query.period,
        )
    }

    /// Every comparison chart the dashboard carries, keyed by query key.
    pub fn comparison_charts(&self) -> Result<BTreeMap<String, ChartSpec>> {
        let mut charts = BTreeMap::new();
        for query in self.comparison_queries() {
            let chart = self.comparison_plot(&query)?;
            charts.insert(query.key, chart);
        }
        Ok(charts)
    }

    /// Bundle for the static dashboard page.
    pub fn to_dashboard(&self, comparison_charts: BTreeMap<String, ChartSpec>) -> DashboardExport {
        DashboardExport {
            title: self.report.title.clone(),
            as_of: self.as_of,
            report_text: self.report_text.clone(),
            report_markdown: self.report.to_markdown(),
            charts: self.charts.clone(),
            comparison_charts,
            summary: self.metric_rows.clone(),
            ytd_breakdown: self.ytd_breakdown.records(),
            general_breakdown: self.general_breakdown.records(),
        }
    }
}

/// Run the full-portfolio analysis as of `as_of`.
///
/// # Errors
///
/// Fails on an invalid configuration, on ledger-integrity violations and
/// when the ledger has no activity on or before `as_of`. Missing prices and
/// missing benchmark data are not errors.
pub fn generate_portfolio_analysis(
    ledger: &Ledger,
    prices: &PriceBook,
    config: &AnalysisConfig,
    as_of: NaiveDate,
) -> Result<PortfolioAnalysis> {
    config.validate()?;
    tracing::info!(
        transactions = ledger.len(),
        symbols = ledger.symbols().len(),
        %as_of,
        "starting portfolio analysis"
    );

    let history = config.reconstructor()?.reconstruct(ledger, prices, as_of)?;
    tracing::debug!(snapshots = history.snapshots().len(), "reconstructed holdings");

    let valuations = Valuations::from_history(&history);
    let returns_data = ReturnsData::build(
        &valuations,
        ledger,
        prices,
        &config.benchmark_symbol,
        config.benchmark_label.as_str(),
        as_of,
    );
    tracing::debug!(
        sectors = returns_data.sectors.len(),
        instruments = returns_data.instruments.len(),
        "built return series"
    );

    let summary = generate_summary(PORTFOLIO_NAME, &history, &returns_data, &config.stats_config()?);
    let general_breakdown = sector_breakdown(&valuations, Period::General, as_of);
    let ytd_breakdown = sector_breakdown(&valuations, Period::Ytd, as_of);
    let charts = portfolio_charts(&returns_data, &valuations, &general_breakdown);

    let comparator = BenchmarkComparator::new(&returns_data);
    let mut builder = ReportBuilder::new()
        .as_of(as_of)
        .summary(summary.clone())
        .breakdown(general_breakdown.clone())
        .breakdown(ytd_breakdown.clone());
    for period in Period::all() {
        let result = comparator.compare(ComparisonType::EquityVsSp500, None, period)?;
        builder = builder.comparison(&result);
    }
    let report = builder.build()?;
    let report_text = report.to_text();

    tracing::info!(
        end_value = summary.end_value,
        total_return = summary.total_return,
        charts = charts.len(),
        "portfolio analysis complete"
    );

    Ok(PortfolioAnalysis {
        as_of,
        report,
        report_text,
        charts,
        metric_rows: summary.metric_rows(),
        summary,
        ytd_breakdown,
        general_breakdown,
        returns_data,
        valuations,
        history,
    })
}

/// One benchmark comparison chart.
///
/// # Errors
///
/// [`smic_analytics::AnalyticsError::SectorRequired`] when an ETF vs Stocks
/// query names no sector, [`smic_analytics::AnalyticsError::UnknownSector`]
/// when it names one the portfolio never held.
pub fn generate_comparison_plot(
    data: &ReturnsData,
    sector: Option<&str>,
    comparison_type: ComparisonType,
    period: Period,
) -> Result<ChartSpec> {
    let result = BenchmarkComparator::new(data).compare(comparison_type, sector, period)?;
    tracing::debug!(
        comparison = %comparison_type,
        sector = sector.unwrap_or("-"),
        %period,
        complete = result.is_complete(),
        "generated comparison plot"
    );
    Ok(comparison_chart(&result))
}
