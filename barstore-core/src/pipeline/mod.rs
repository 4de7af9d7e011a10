//! Pipeline orchestrator: window → fetch → validate → filter → upsert, per ticker.
//!
//! Tickers are processed one after another. A failure while ingesting one
//! ticker is recorded in the run report and never stops the others; only
//! failing to open the store aborts a run. The store is closed again at the
//! end of every run through a `StoreSession`.

pub mod report;
pub mod window;

pub use report::{ReportBuilder, RunReport};
pub use window::{resolve_window, IngestionWindow, WindowError, WindowMode};

use crate::config::PipelineConfig;
use crate::data::frame::FrameError;
use crate::data::{CircuitBreaker, DataError, FetchOutcome, Fetcher, PriceSource, YahooSource};
use crate::domain::normalize_ticker;
use crate::logging::ERROR_TARGET;
use crate::store::{ParquetStore, PriceStore, StoreError, StoreSession, TickerSummary};
use crate::validate::Validator;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// The store could not be opened. Fatal for the whole run.
    #[error("store unavailable: {0}")]
    StoreUnavailable(#[source] StoreError),

    #[error("price source could not be created: {0}")]
    SourceSetup(#[source] DataError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Frame(#[from] FrameError),
}

/// Parameters of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRequest {
    pub tickers: Vec<String>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    #[serde(default = "default_incremental")]
    pub incremental: bool,
    #[serde(default)]
    pub validate_only: bool,
}

fn default_incremental() -> bool {
    true
}

impl RunRequest {
    /// Incremental run over `tickers` ending today.
    pub fn new<I, T>(tickers: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            tickers: tickers.into_iter().map(Into::into).collect(),
            start: None,
            end: None,
            incremental: true,
            validate_only: false,
        }
    }

    pub fn start(mut self, start: NaiveDate) -> Self {
        self.start = Some(start);
        self
    }

    pub fn end(mut self, end: NaiveDate) -> Self {
        self.end = Some(end);
        self
    }

    /// Ignore stored history and fetch the default lookback window.
    pub fn full(mut self) -> Self {
        self.incremental = false;
        self
    }

    pub fn validate_only(mut self) -> Self {
        self.validate_only = true;
        self
    }
}

/// Borrowed stages shared by every ticker of a run.
struct Stages<'a> {
    fetcher: &'a Fetcher,
    validator: &'a Validator,
    lookback_days: i64,
    today: NaiveDate,
}

impl Stages<'_> {
    fn ingest<S: PriceStore + ?Sized>(
        &self,
        ticker: &str,
        request: &RunRequest,
        store: &mut S,
        report: &mut ReportBuilder,
    ) {
        tracing::info!(ticker, "processing ticker");
        if let Err(e) = self.try_ingest(ticker, request, store, report) {
            let message = format!("{ticker}: Pipeline error - {e}");
            tracing::error!(target: ERROR_TARGET, ticker, "{message}");
            report.fail(message);
        }
    }

    fn try_ingest<S: PriceStore + ?Sized>(
        &self,
        ticker: &str,
        request: &RunRequest,
        store: &mut S,
        report: &mut ReportBuilder,
    ) -> Result<(), PipelineError> {
        let last_date = if request.incremental && request.start.is_none() {
            store.last_date(ticker)?
        } else {
            None
        };
        let window = match resolve_window(
            request.start,
            request.end,
            request.incremental,
            last_date,
            self.today,
            self.lookback_days,
        ) {
            Ok(window) => window,
            Err(e) => {
                let message = format!("{ticker}: Invalid date range - {e}");
                tracing::error!(target: ERROR_TARGET, "{message}");
                report.fail(message);
                return Ok(());
            }
        };
        tracing::info!(
            ticker,
            mode = %window.mode,
            start = %window.start,
            end = %window.end,
            "ingestion window"
        );

        if window.is_empty() {
            if let (WindowMode::Incremental, Some(last)) = (window.mode, last_date) {
                let message = format!("{ticker}: Already up to date (last stored date {last})");
                tracing::warn!("{message}");
                report.warn(message);
            } else {
                let message = format!(
                    "{ticker}: Invalid date range - start {} is after end {}",
                    window.start, window.end
                );
                tracing::error!(target: ERROR_TARGET, "{message}");
                report.fail(message);
            }
            return Ok(());
        }

        let rows = match self.fetcher.fetch(ticker, window.start, window.end) {
            FetchOutcome::Rows(rows) => rows,
            FetchOutcome::NoData => {
                report.warn(format!("{ticker}: No data available"));
                return Ok(());
            }
            FetchOutcome::Failed { attempts, error } => {
                tracing::warn!(ticker, attempts, error = %error, "no data downloaded");
                report.warn(format!(
                    "{ticker}: No data available ({error}, {attempts} attempts)"
                ));
                return Ok(());
            }
        };

        let validation = self.validator.validate(&rows);
        if !validation.schema_passed() {
            let message = format!(
                "{ticker}: Schema validation failed - {}",
                validation.schema_messages().join("; ")
            );
            tracing::error!(target: ERROR_TARGET, "{message}");
            report.fail(message);
            return Ok(());
        }

        let rows = if validation.quality_warnings.is_empty() {
            rows
        } else {
            let message = format!(
                "{ticker}: Data quality warnings - {}",
                validation.warning_messages().join("; ")
            );
            tracing::warn!("{message}");
            report.warn(message);

            let filtered = self.validator.filter_invalid_rows(&rows)?;
            if filtered.height() == 0 {
                let message = format!("{ticker}: All rows filtered out due to quality issues");
                tracing::error!(target: ERROR_TARGET, "{message}");
                report.fail(message);
                return Ok(());
            }
            filtered
        };

        if request.validate_only {
            tracing::info!(ticker, rows = rows.height(), "validation-only mode: skipped storage");
            report.succeed(0);
        } else {
            let inserted = store.upsert(&rows)?;
            tracing::info!(ticker, rows = inserted, "stored rows");
            report.succeed(inserted);
        }
        Ok(())
    }
}

pub struct Pipeline<S: PriceStore> {
    config: PipelineConfig,
    fetcher: Fetcher,
    validator: Validator,
    store: S,
    today: Option<NaiveDate>,
}

impl<S: PriceStore> Pipeline<S> {
    pub fn new(config: PipelineConfig, source: Box<dyn PriceSource>, store: S) -> Self {
        let fetcher = Fetcher::new(source, &config.fetch);
        let validator = Validator::new(&config.validation);
        Self {
            config,
            fetcher,
            validator,
            store,
            today: None,
        }
    }

    /// Pin the date treated as "today" when resolving windows.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| chrono::Local::now().date_naive())
    }

    /// Ingest every requested ticker.
    ///
    /// Returns `Err` only when the store cannot be opened; every per-ticker
    /// problem ends up in the report.
    pub fn run(&mut self, request: &RunRequest) -> Result<RunReport, PipelineError> {
        tracing::info!(
            tickers = request.tickers.len(),
            incremental = request.incremental,
            validate_only = request.validate_only,
            "starting pipeline"
        );

        let stages = Stages {
            fetcher: &self.fetcher,
            validator: &self.validator,
            lookback_days: self.config.ingest.lookback_days,
            today: self.today(),
        };
        let mut report = ReportBuilder::new(request.tickers.len());

        let mut session = StoreSession::open(&mut self.store).map_err(|e| {
            tracing::error!(target: ERROR_TARGET, error = %e, "Pipeline fatal error");
            PipelineError::StoreUnavailable(e)
        })?;

        for raw in &request.tickers {
            match normalize_ticker(raw) {
                Some(ticker) => stages.ingest(&ticker, request, &mut *session, &mut report),
                None => {
                    let message = format!("'{raw}': Invalid ticker symbol");
                    tracing::error!(target: ERROR_TARGET, "{message}");
                    report.fail(message);
                }
            }
        }
        drop(session);

        let report = report.finish();
        report.log_summary();
        Ok(report)
    }

    /// Per-ticker coverage of the store.
    pub fn summary(&mut self) -> Result<Vec<TickerSummary>, PipelineError> {
        let session = StoreSession::open(&mut self.store).map_err(PipelineError::StoreUnavailable)?;
        Ok(session.summary()?)
    }
}

/// Build a Yahoo-backed pipeline over the configured Parquet store and run it.
pub fn run_pipeline(
    config: &PipelineConfig,
    request: &RunRequest,
) -> Result<RunReport, PipelineError> {
    let breaker = Arc::new(CircuitBreaker::with_cooldown(
        config.fetch.circuit_breaker_cooldown(),
    ));
    let source = YahooSource::new(breaker, config.fetch.request_timeout())
        .map_err(PipelineError::SourceSetup)?;
    let store = ParquetStore::new(&config.store.root);
    Pipeline::new(config.clone(), Box::new(source), store).run(request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::frame::{bars_to_frame, CLOSE};
    use crate::data::ScriptedSource;
    use crate::domain::PriceBar;
    use chrono::Duration;
    use polars::prelude::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn fast_config(root: &std::path::Path) -> PipelineConfig {
        let mut config = PipelineConfig::default();
        config.store.root = root.to_path_buf();
        config.fetch.retry_delay_ms = 0;
        config.fetch.min_request_interval_ms = 0;
        config
    }

    fn daily(ticker: &str, first: NaiveDate, n: usize) -> DataFrame {
        let bars: Vec<PriceBar> = (0..n)
            .map(|i| PriceBar {
                ticker: ticker.into(),
                date: first + Duration::days(i as i64),
                open: 10.0,
                high: 11.0,
                low: 9.0,
                close: 10.5,
                volume: 100,
                adj_close: 10.5,
            })
            .collect();
        bars_to_frame(&bars).unwrap()
    }

    #[test]
    fn request_builder_defaults() {
        let request = RunRequest::new(["aapl"]);
        assert!(request.incremental);
        assert!(!request.validate_only);
        let request = request.full().validate_only().start(d("2024-01-01"));
        assert!(!request.incremental);
        assert!(request.validate_only);
        assert_eq!(request.start, Some(d("2024-01-01")));
    }

    #[test]
    fn request_deserializes_with_defaults() {
        let request: RunRequest =
            serde_json::from_str(r#"{"tickers":["SPY"],"start":null,"end":null}"#).unwrap();
        assert!(request.incremental);
        assert!(!request.validate_only);
    }

    #[test]
    fn blank_ticker_is_an_error_and_lowercase_is_normalized() {
        let tmp = tempfile::tempdir().unwrap();
        let source = Arc::new(ScriptedSource::new());
        source.push_rows("SPY", daily("SPY", d("2024-01-01"), 10));

        let mut pipeline = Pipeline::new(
            fast_config(tmp.path()),
            Box::new(source.clone()),
            ParquetStore::new(tmp.path()),
        )
        .with_today(d("2024-01-31"));

        let report = pipeline
            .run(&RunRequest::new(["  spy ", "   "]).start(d("2024-01-01")))
            .unwrap();

        assert_eq!(report.processed, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.rows_inserted, 10);
        assert_eq!(source.calls_for("SPY"), 1);
        assert!(!pipeline.store().is_connected());
    }

    #[test]
    fn up_to_date_ticker_skips_fetch() {
        let tmp = tempfile::tempdir().unwrap();
        let source = Arc::new(ScriptedSource::new());
        source.push_rows("SPY", daily("SPY", d("2024-01-22"), 10));

        let mut pipeline = Pipeline::new(
            fast_config(tmp.path()),
            Box::new(source.clone()),
            ParquetStore::new(tmp.path()),
        )
        .with_today(d("2024-01-31"));

        pipeline.run(&RunRequest::new(["SPY"]).start(d("2024-01-22"))).unwrap();
        let report = pipeline.run(&RunRequest::new(["SPY"])).unwrap();

        assert_eq!(source.calls_for("SPY"), 1);
        assert_eq!(report.processed, 0);
        assert_eq!(report.failed, 0);
        assert!(report.warnings[0].contains("Already up to date"));
    }

    #[test]
    fn unrepresentable_lookback_fails_each_ticker_without_fetching() {
        let tmp = tempfile::tempdir().unwrap();
        let source = Arc::new(ScriptedSource::new());
        let mut config = fast_config(tmp.path());
        config.ingest.lookback_days = 200_000_000;

        let mut pipeline =
            Pipeline::new(config, Box::new(source.clone()), ParquetStore::new(tmp.path()))
                .with_today(d("2024-01-31"));
        let report = pipeline.run(&RunRequest::new(["A", "B"])).unwrap();

        assert_eq!(report.failed, 2);
        assert_eq!(report.processed, 0);
        assert_eq!(report.errors.len(), 2);
        assert!(report.errors[0].starts_with("A: Invalid date range - lookback of 200000000 days"));
        assert!(report.errors[1].starts_with("B: Invalid date range - "));
        assert!(source.calls().is_empty());
        assert!(!pipeline.store().is_connected());
    }

    #[test]
    fn unreadable_values_fail_schema() {
        let tmp = tempfile::tempdir().unwrap();
        let source = Arc::new(ScriptedSource::new());
        let mut rows = daily("SPY", d("2024-01-01"), 10);
        rows.with_column(Column::new(CLOSE.into(), vec!["n/a"; 10])).unwrap();
        source.push_rows("SPY", rows);

        let mut pipeline = Pipeline::new(
            fast_config(tmp.path()),
            Box::new(source.clone()),
            ParquetStore::new(tmp.path()),
        )
        .with_today(d("2024-01-31"));

        let report = pipeline.run(&RunRequest::new(["SPY"]).start(d("2024-01-01"))).unwrap();
        assert_eq!(report.failed, 1);
        assert!(report.errors[0].starts_with("SPY: Schema validation failed - "));
    }

    #[test]
    fn summary_lists_stored_tickers() {
        let tmp = tempfile::tempdir().unwrap();
        let source = Arc::new(ScriptedSource::new());
        source.push_rows("QQQ", daily("QQQ", d("2024-01-01"), 10));

        let mut pipeline = Pipeline::new(
            fast_config(tmp.path()),
            Box::new(source),
            ParquetStore::new(tmp.path()),
        )
        .with_today(d("2024-01-31"));
        pipeline.run(&RunRequest::new(["QQQ"]).start(d("2024-01-01"))).unwrap();

        let summary = pipeline.summary().unwrap();
        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0].ticker, "QQQ");
        assert_eq!(summary[0].row_count, 10);
        assert!(!pipeline.store().is_connected());
    }
}
