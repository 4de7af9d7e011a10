//! Barstore CLI: ingestion runs and read-only store queries.
//!
//! Commands:
//! - `run`: fetch, validate and store daily bars for one or more tickers
//! - `tickers`: list stored tickers
//! - `summary`: per-ticker date range, row count and last update
//! - `query`: print or export one ticker's stored rows
//! - `init-config`: write a default configuration file

use anyhow::{bail, Context, Result};
use barstore_core::config::PipelineConfig;
use barstore_core::data::frame::frame_to_stored;
use barstore_core::data::CsvSource;
use barstore_core::store::{ParquetStore, PriceStore, StoreSession, TickerSummary};
use barstore_core::{logging, run_pipeline, Pipeline, RunReport, RunRequest};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG_FILE: &str = "barstore.toml";

#[derive(Parser)]
#[command(
    name = "barstore",
    about = "Barstore CLI: incremental daily OHLCV ingestion into a Parquet store"
)]
struct Cli {
    /// Configuration file. Defaults to ./barstore.toml when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Store directory (overrides the config file and BARSTORE_DB_DIR).
    #[arg(long, global = true)]
    db_dir: Option<PathBuf>,

    /// Log level (overrides the config file and LOG_LEVEL).
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SourceKind {
    Yahoo,
    Csv,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch, validate and store daily bars.
    Run {
        /// Tickers to ingest (e.g., AAPL MSFT SPY).
        #[arg(required = true)]
        tickers: Vec<String>,

        /// Start date (YYYY-MM-DD). Defaults to the day after the last stored date.
        #[arg(long)]
        start: Option<NaiveDate>,

        /// End date (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        end: Option<NaiveDate>,

        /// Ignore stored history and fetch the full lookback window.
        #[arg(long, default_value_t = false)]
        full: bool,

        /// Validate only; do not write to the store.
        #[arg(long, default_value_t = false)]
        validate_only: bool,

        /// Where to fetch prices from.
        #[arg(long, value_enum, default_value_t = SourceKind::Yahoo)]
        source: SourceKind,

        /// Directory of {TICKER}.csv files (with --source csv).
        #[arg(long)]
        csv_dir: Option<PathBuf>,

        /// Print the run report as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// List stored tickers.
    Tickers,
    /// Report each stored ticker's date range and row count.
    Summary {
        /// Print as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Print one ticker's stored rows, or export them as CSV.
    Query {
        ticker: String,

        /// First date to include (YYYY-MM-DD).
        #[arg(long)]
        start: Option<NaiveDate>,

        /// Last date to include (YYYY-MM-DD).
        #[arg(long)]
        end: Option<NaiveDate>,

        /// Write the rows to this CSV file instead of printing them.
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Write a configuration file with every default filled in.
    InitConfig {
        /// Output path.
        #[arg(default_value = DEFAULT_CONFIG_FILE)]
        path: PathBuf,

        /// Overwrite an existing file.
        #[arg(long, default_value_t = false)]
        force: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::InitConfig { path, force } = &cli.command {
        return run_init_config(path, *force);
    }

    let config = load_config(&cli)?;
    config
        .ensure_directories()
        .context("failed to prepare directories")?;
    logging::init(&config.logging)?;

    match cli.command {
        Commands::Run {
            tickers,
            start,
            end,
            full,
            validate_only,
            source,
            csv_dir,
            json,
        } => {
            let mut request = RunRequest::new(tickers);
            request.start = start;
            request.end = end;
            request.incremental = !full;
            request.validate_only = validate_only;
            run_ingest(&config, &request, source, csv_dir, json)
        }
        Commands::Tickers => run_tickers(&config),
        Commands::Summary { json } => run_summary(&config, json),
        Commands::Query {
            ticker,
            start,
            end,
            csv,
        } => run_query(&config, &ticker, start, end, csv.as_deref()),
        Commands::InitConfig { .. } => Ok(()),
    }
}

/// Config file (explicit, or ./barstore.toml when present), then environment, then flags.
fn load_config(cli: &Cli) -> Result<PipelineConfig> {
    let config = match &cli.config {
        Some(path) => PipelineConfig::from_file(path)?,
        None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
            PipelineConfig::from_file(Path::new(DEFAULT_CONFIG_FILE))?
        }
        None => PipelineConfig::default(),
    };

    let mut config = config.apply_env();
    if let Some(dir) = &cli.db_dir {
        config.store.root = dir.clone();
    }
    if let Some(level) = &cli.log_level {
        config.logging.level = level.to_ascii_lowercase();
    }
    Ok(config)
}

fn run_init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "{} already exists (pass --force to overwrite)",
            path.display()
        );
    }
    std::fs::write(path, PipelineConfig::default().to_toml()?)
        .with_context(|| format!("failed to write {}", path.display()))?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}

fn run_ingest(
    config: &PipelineConfig,
    request: &RunRequest,
    source: SourceKind,
    csv_dir: Option<PathBuf>,
    json: bool,
) -> Result<()> {
    let report = match source {
        SourceKind::Yahoo => {
            if csv_dir.is_some() {
                bail!("--csv-dir requires --source csv");
            }
            run_pipeline(config, request)?
        }
        SourceKind::Csv => {
            let Some(dir) = csv_dir else {
                bail!("--source csv requires --csv-dir");
            };
            tracing::info!(dir = %dir.display(), "reading prices from CSV files");
            let store = ParquetStore::new(&config.store.root);
            Pipeline::new(config.clone(), Box::new(CsvSource::new(dir)), store).run(request)?
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if report.has_failures() {
        std::process::exit(1);
    }
    Ok(())
}

fn run_tickers(config: &PipelineConfig) -> Result<()> {
    let mut store = ParquetStore::new(&config.store.root);
    let session = StoreSession::open(&mut store)?;
    let tickers = session.available_tickers()?;

    if tickers.is_empty() {
        println!("Store is empty: {}", config.store.root.display());
        return Ok(());
    }
    for ticker in tickers {
        println!("{ticker}");
    }
    Ok(())
}

fn run_summary(config: &PipelineConfig, json: bool) -> Result<()> {
    let mut store = ParquetStore::new(&config.store.root);
    let session = StoreSession::open(&mut store)?;
    let summary = session.summary()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }
    if summary.is_empty() {
        println!("Store is empty: {}", config.store.root.display());
        return Ok(());
    }
    print_summary(&config.store.root, &summary);
    Ok(())
}

fn run_query(
    config: &PipelineConfig,
    ticker: &str,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    csv_path: Option<&Path>,
) -> Result<()> {
    let Some(ticker) = barstore_core::domain::normalize_ticker(ticker) else {
        bail!("ticker must not be blank");
    };

    let mut store = ParquetStore::new(&config.store.root);
    let session = StoreSession::open(&mut store)?;
    let rows = frame_to_stored(&session.query_ticker(&ticker, start, end)?)?;

    if let Some(path) = csv_path {
        let mut writer = csv::Writer::from_path(path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        writer.write_record([
            "ticker", "date", "open", "high", "low", "close", "volume", "adj_close", "created_at",
        ])?;
        for row in &rows {
            let bar = &row.bar;
            writer.write_record([
                bar.ticker.clone(),
                bar.date.to_string(),
                bar.open.to_string(),
                bar.high.to_string(),
                bar.low.to_string(),
                bar.close.to_string(),
                bar.volume.to_string(),
                bar.adj_close.to_string(),
                row.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            ])?;
        }
        writer.flush()?;
        println!("Wrote {} rows to {}", rows.len(), path.display());
        return Ok(());
    }

    if rows.is_empty() {
        println!("No rows stored for {ticker}");
        return Ok(());
    }

    println!(
        "{:<12} {:>10} {:>10} {:>10} {:>10} {:>14} {:>10}",
        "Date", "Open", "High", "Low", "Close", "Volume", "Adj Close"
    );
    println!("{}", "-".repeat(82));
    for row in &rows {
        let b = &row.bar;
        println!(
            "{:<12} {:>10.2} {:>10.2} {:>10.2} {:>10.2} {:>14} {:>10.2}",
            b.date, b.open, b.high, b.low, b.close, b.volume, b.adj_close
        );
    }
    println!();
    println!("{} rows for {ticker}", rows.len());
    Ok(())
}

fn print_report(report: &RunReport) {
    println!();
    println!("=== Ingestion Report ===");
    println!("Duration:       {:.2}s", report.duration_seconds);
    println!(
        "Processed:      {}/{}",
        report.processed, report.total_tickers
    );
    println!("Failed:         {}", report.failed);
    println!("Skipped:        {}", report.skipped());
    println!("Rows inserted:  {}", report.rows_inserted);
    if !report.warnings.is_empty() {
        println!();
        println!("--- Warnings ---");
        for warning in &report.warnings {
            println!("WARNING: {warning}");
        }
    }
    if !report.errors.is_empty() {
        println!();
        println!("--- Errors ---");
        for error in &report.errors {
            println!("ERROR: {error}");
        }
    }
    println!();
}

fn print_summary(root: &Path, summary: &[TickerSummary]) {
    let total_rows: usize = summary.iter().map(|s| s.row_count).sum();

    println!("Store: {}", root.display());
    println!("Tickers: {}", summary.len());
    println!("Rows: {total_rows}");
    println!();
    println!(
        "{:<8} {:<25} {:>10} {:<20}",
        "Ticker", "Date Range", "Rows", "Last Updated"
    );
    println!("{}", "-".repeat(66));
    for s in summary {
        println!(
            "{:<8} {:<25} {:>10} {:<20}",
            s.ticker,
            format!("{} to {}", s.start_date, s.end_date),
            s.row_count,
            s.last_updated.format("%Y-%m-%d %H:%M:%S")
        );
    }
}
