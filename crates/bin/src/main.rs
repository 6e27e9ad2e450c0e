//! SMIC CLI binary.
//!
//! Runs the portfolio analytics engine over a transaction ledger and price
//! files, and writes the dashboard bundle.

use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use smic::analytics::{ComparisonType, Period};
use smic::data::{Ledger, PriceBook};
use smic::output::Exporter;
use smic::{AnalysisConfig, generate_comparison_plot, generate_portfolio_analysis};
use std::collections::BTreeMap;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "smic")]
#[command(about = "SMIC: portfolio analytics for the student-managed fund", long_about = None)]
#[command(version)]
struct Cli {
    /// Optional TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Inputs {
    /// Transaction ledger CSV
    #[arg(long)]
    ledger: PathBuf,

    /// Price CSV files (Date, Symbol, Close); later files win on overlap
    #[arg(long, num_args = 1.., required = true)]
    prices: Vec<PathBuf>,

    /// Analysis date (YYYY-MM-DD), defaults to the configured date or today
    #[arg(long)]
    as_of: Option<NaiveDate>,

    /// Benchmark symbol in the price files
    #[arg(long)]
    benchmark: Option<String>,

    /// Benchmark display name
    #[arg(long)]
    benchmark_label: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full analysis and write the dashboard bundle
    Analyze {
        #[command(flatten)]
        inputs: Inputs,

        /// Output directory for the bundle
        #[arg(long, default_value = "dashboard")]
        out: PathBuf,
    },

    /// Print one comparison chart as JSON
    Compare {
        #[command(flatten)]
        inputs: Inputs,

        /// Comparison type (ETF_vs_Stocks or Equity_vs_SP500)
        #[arg(long = "type", default_value = "ETF_vs_Stocks")]
        comparison: ComparisonType,

        /// Sector for ETF_vs_Stocks
        #[arg(long)]
        sector: Option<String>,

        /// Window (General or YTD)
        #[arg(long, default_value = "YTD")]
        period: Period,
    },

    /// List sectors and the instrument classes held in each
    Sectors {
        /// Transaction ledger CSV
        #[arg(long)]
        ledger: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        let mut source = e.source();
        while let Some(cause) = source {
            eprintln!("  caused by: {}", cause);
            source = cause.source();
        }
        process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let config = AnalysisConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Analyze { inputs, out } => analyze(&inputs, config, &out)?,
        Commands::Compare {
            inputs,
            comparison,
            sector,
            period,
        } => compare(&inputs, config, comparison, sector.as_deref(), period)?,
        Commands::Sectors { ledger } => list_sectors(&ledger)?,
    }

    Ok(())
}

/// Apply CLI overrides and load both inputs.
fn prepare(
    inputs: &Inputs,
    mut config: AnalysisConfig,
) -> Result<(Ledger, PriceBook, AnalysisConfig, NaiveDate), Box<dyn Error>> {
    if let Some(symbol) = &inputs.benchmark {
        config.benchmark_symbol = symbol.clone();
    }
    if let Some(label) = &inputs.benchmark_label {
        config.benchmark_label = label.clone();
    }
    if inputs.as_of.is_some() {
        config.as_of = inputs.as_of;
    }
    config.validate()?;
    let as_of = config.as_of_or(Local::now().date_naive());

    let ledger = Ledger::from_path(&inputs.ledger)?;
    let mut prices = PriceBook::new();
    for path in &inputs.prices {
        prices = prices.merge(PriceBook::from_path(path)?);
    }
    tracing::info!(
        transactions = ledger.len(),
        price_symbols = prices.len(),
        %as_of,
        "loaded inputs"
    );

    Ok((ledger, prices, config, as_of))
}

fn analyze(inputs: &Inputs, config: AnalysisConfig, out: &Path) -> Result<(), Box<dyn Error>> {
    let (ledger, prices, config, as_of) = prepare(inputs, config)?;
    let analysis = generate_portfolio_analysis(&ledger, &prices, &config, as_of)?;

    let queries = analysis.comparison_queries();
    let pb = ProgressBar::new(queries.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("█▓░"),
    );
    pb.enable_steady_tick(Duration::from_millis(100));

    let mut comparison_charts = BTreeMap::new();
    for query in &queries {
        pb.set_message(query.key.clone());
        comparison_charts.insert(query.key.clone(), analysis.comparison_plot(query)?);
        pb.inc(1);
    }
    pb.finish_with_message("comparison charts ready");

    let bundle = analysis.to_dashboard(comparison_charts);
    let written = bundle.write_to_dir(out)?;

    println!("{}", analysis.report_text);
    println!("Wrote {} files to {}", written.len(), out.display());
    for path in &written {
        println!("  {}", path.display());
    }

    Ok(())
}

fn compare(
    inputs: &Inputs,
    config: AnalysisConfig,
    comparison: ComparisonType,
    sector: Option<&str>,
    period: Period,
) -> Result<(), Box<dyn Error>> {
    let (ledger, prices, config, as_of) = prepare(inputs, config)?;
    let analysis = generate_portfolio_analysis(&ledger, &prices, &config, as_of)?;

    let chart = generate_comparison_plot(&analysis.returns_data, sector, comparison, period)?;
    println!(
        "{}",
        chart.export_to_string(smic::output::ExportFormat::PrettyJson)?
    );

    Ok(())
}

fn list_sectors(path: &Path) -> Result<(), Box<dyn Error>> {
    let ledger = Ledger::from_path(path)?;

    println!("{:<24} {:<14} {:>12}", "Sector", "Legs", "Transactions");
    println!("{}", "-".repeat(52));
    for sector in ledger.sectors() {
        let legs: Vec<String> = ledger
            .classes_in_sector(&sector)
            .into_iter()
            .map(|class| class.label().to_string())
            .collect();
        let count = ledger.iter().filter(|e| e.sector == sector).count();
        println!("{:<24} {:<14} {:>12}", sector, legs.join(", "), count);
    }
    println!("\n{} transactions across {} sectors", ledger.len(), ledger.sectors().len());

    Ok(())
}
