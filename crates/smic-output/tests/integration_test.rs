//! Integration tests for summary, charts and the dashboard bundle.

use chrono::NaiveDate;
use smic_analytics::{
    BenchmarkComparator, ComparisonType, HoldingsHistory, HoldingsReconstructor, Period,
    ReturnsData, StatsConfig, Valuations,
};
use smic_data::{Action, InstrumentClass, Ledger, PriceBook, PriceHistory, TransactionEvent};
use smic_output::{
    DashboardExport, ExportFormat, Exporter, ReportBuilder, comparison_chart, generate_summary,
    portfolio_charts, sector_breakdown,
};
use std::collections::BTreeMap;

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

struct Fixture {
    history: HoldingsHistory,
    valuations: Valuations,
    data: ReturnsData,
}

fn fixture() -> Fixture {
    let ledger = Ledger::from_events(vec![
        trade(d(2024, 1, 2), "XLK", "Tech", InstrumentClass::Etf, Action::Buy, 10.0, 100.0),
        trade(d(2024, 1, 2), "AAPL", "Tech", InstrumentClass::Stock, Action::Buy, 10.0, 150.0),
        trade(d(2024, 3, 1), "XLE", "Energy", InstrumentClass::Etf, Action::Buy, 20.0, 50.0),
        trade(d(2024, 6, 3), "AAPL", "Tech", InstrumentClass::Stock, Action::Sell, 5.0, 170.0),
    ])
    .unwrap();

    let mut prices = PriceBook::new();
    prices.insert("XLK", PriceHistory::new([(d(2024, 6, 28), 110.0)]));
    prices.insert("AAPL", PriceHistory::new([(d(2024, 6, 28), 180.0)]));
    prices.insert("XLE", PriceHistory::new([(d(2024, 6, 28), 55.0)]));
    prices.insert(
        "SPY",
        PriceHistory::new([(d(2023, 12, 29), 470.0), (d(2024, 6, 28), 545.0)]),
    );

    let as_of = d(2024, 6, 28);
    let history = HoldingsReconstructor::default()
        .reconstruct(&ledger, &prices, as_of)
        .unwrap();
    let valuations = Valuations::from_history(&history);
    let data = ReturnsData::build(&valuations, &ledger, &prices, "SPY", "S&P 500", as_of);

    Fixture {
        history,
        valuations,
        data,
    }
}

#[test]
fn test_summary_and_breakdown_workflow() {
    let f = fixture();

    let summary = generate_summary("SMIC", &f.history, &f.data, &StatsConfig::default());
    assert_eq!(summary.start_date, Some(d(2024, 1, 2)));
    assert_eq!(summary.end_date, Some(d(2024, 6, 28)));
    // 10 × 110 + 5 × 180 + 20 × 55
    assert!((summary.end_value - 3100.0).abs() < 1e-9);
    // 5 × (170 − 150)
    assert!((summary.realized_pnl - 100.0).abs() < 1e-9);
    assert_eq!(summary.open_positions, 3);
    assert_eq!(summary.transaction_count, 4);
    assert!(summary.benchmark_return.is_some());

    let general = sector_breakdown(&f.valuations, Period::General, f.data.as_of);
    assert_eq!(general.start, Some(d(2024, 1, 2)));
    let sectors: Vec<&str> = general.rows.iter().map(|r| r.sector.as_str()).collect();
    assert_eq!(sectors, vec!["Energy", "Tech"]);

    let end_total: f64 = general.rows.iter().map(|r| r.total_end()).sum();
    assert!((end_total - 1.0).abs() < 1e-12);
    // Energy was not held on the first date.
    assert_eq!(general.rows[0].etf_weight_start, 0.0);

    let report = ReportBuilder::new()
        .as_of(f.data.as_of)
        .summary(summary)
        .breakdown(general)
        .build()
        .unwrap();
    let text = report.to_text();
    assert!(text.contains("Portfolio Summary: SMIC"));
    assert!(text.contains("General Sector Breakdown"));
}

#[test]
fn test_charts_and_dashboard_bundle() {
    let f = fixture();
    let general = sector_breakdown(&f.valuations, Period::General, f.data.as_of);
    let ytd = sector_breakdown(&f.valuations, Period::Ytd, f.data.as_of);
    let charts = portfolio_charts(&f.data, &f.valuations, &general);

    let keys: Vec<&str> = charts.keys().map(String::as_str).collect();
    assert_eq!(
        keys,
        vec!["bar_comparison", "etf_vs_stocks", "performance", "sector_allocation", "weight_drift"]
    );
    assert_eq!(charts["performance"].data.len(), 3);
    assert_eq!(charts["etf_vs_stocks"].data.len(), 3);

    let comparator = BenchmarkComparator::new(&f.data);
    let mut comparison_charts = BTreeMap::new();
    for period in Period::all() {
        let result = comparator
            .compare(ComparisonType::EtfVsStocks, Some("Tech"), period)
            .unwrap();
        comparison_charts.insert(format!("Tech_{}", period.slug()), comparison_chart(&result));
    }

    let summary = generate_summary("SMIC", &f.history, &f.data, &StatsConfig::default());
    let bundle = DashboardExport {
        title: "SMIC Portfolio Analysis".to_string(),
        as_of: f.data.as_of,
        report_text: summary.to_ascii_table(),
        report_markdown: summary.to_markdown(),
        charts,
        comparison_charts,
        summary: summary.metric_rows(),
        ytd_breakdown: ytd.records(),
        general_breakdown: general.records(),
    };

    let dir = tempfile::tempdir().unwrap();
    let written = bundle.write_to_dir(&dir.path().join("site")).unwrap();
    assert_eq!(written.len(), 4);

    let json = std::fs::read_to_string(&written[0]).unwrap();
    let parsed: DashboardExport = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed.summary, bundle.summary);
    assert_eq!(
        parsed.comparison_charts.keys().collect::<Vec<_>>(),
        vec!["Tech_general", "Tech_ytd"]
    );

    let summary_csv = std::fs::read_to_string(&written[1]).unwrap();
    assert!(summary_csv.starts_with("Metric,Value"));

    // Same input, same bytes.
    assert_eq!(
        bundle.export_to_string(ExportFormat::PrettyJson).unwrap(),
        json
    );
}
