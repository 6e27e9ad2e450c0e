//! Demonstration of a full analysis run from in-memory CSV.

use chrono::NaiveDate;
use smic::analytics::{ComparisonType, Period};
use smic::data::{Ledger, PriceBook};
use smic::output::{ExportFormat, Exporter};
use smic::{AnalysisConfig, generate_comparison_plot, generate_portfolio_analysis};

const LEDGER: &str = "Date,Symbol,Sector,Type,Action,Quantity,Price,Amount\n\
                      2024-01-02,XLK,Technology,ETF,Buy,20,200,\n\
                      2024-01-02,AAPL,Technology,Stock,Buy,15,185,\n\
                      2024-02-01,XLE,Energy,ETF,Buy,40,85,\n\
                      2024-02-01,XOM,Energy,Stock,Buy,30,102,\n\
                      2024-04-15,AAPL,Technology,Stock,Sell,5,170,\n\
                      2024-05-10,XOM,Energy,Stock,Dividend,0,0,28.50\n";

const PRICES: &str = "Date,Symbol,Close\n\
                      2024-03-28,XLK,208\n\
                      2024-03-28,AAPL,171\n\
                      2024-03-28,XLE,94\n\
                      2024-03-28,XOM,116\n\
                      2024-06-28,XLK,227\n\
                      2024-06-28,AAPL,210\n\
                      2024-06-28,XLE,91\n\
                      2024-06-28,XOM,115\n\
                      2023-12-29,SPY,475\n\
                      2024-03-28,SPY,523\n\
                      2024-06-28,SPY,544\n";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== SMIC Portfolio Demo ===\n");

    let ledger = Ledger::from_reader(LEDGER.as_bytes())?;
    let prices = PriceBook::from_reader(PRICES.as_bytes())?;
    let as_of = NaiveDate::from_ymd_opt(2024, 6, 28).ok_or("invalid date")?;

    let analysis = generate_portfolio_analysis(&ledger, &prices, &AnalysisConfig::default(), as_of)?;
    println!("{}", analysis.report_text);

    println!("Comparison charts:");
    for query in analysis.comparison_queries() {
        println!("  {}", query.key);
    }

    println!("\nTechnology: Stocks vs ETF (YTD)");
    let chart = generate_comparison_plot(
        &analysis.returns_data,
        Some("Technology"),
        ComparisonType::EtfVsStocks,
        Period::Ytd,
    )?;
    println!("{}", chart.export_to_string(ExportFormat::PrettyJson)?);

    println!("\nSummary CSV:");
    println!("{}", analysis.metric_rows.export_to_string(ExportFormat::Csv)?);

    Ok(())
}
