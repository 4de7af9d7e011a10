//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use barstore_core::config::PipelineConfig;
use barstore_core::data::frame::{self, bars_to_frame};
use barstore_core::domain::PriceBar;
use barstore_core::store::{ParquetStore, PriceStore, StoreError, TickerSummary};
use chrono::{Duration, NaiveDate};
use polars::prelude::DataFrame;
use std::collections::HashSet;
use std::path::Path;

pub fn d(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

/// Default configuration with no sleeping, rooted in `root`.
pub fn fast_config(root: &Path) -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.store.root = root.to_path_buf();
    config.logging.file = false;
    config.fetch.retry_delay_ms = 0;
    config.fetch.min_request_interval_ms = 0;
    config
}

pub fn bar(ticker: &str, date: NaiveDate, close: f64) -> PriceBar {
    PriceBar {
        ticker: ticker.into(),
        date,
        open: close - 0.5,
        high: close + 1.0,
        low: close - 1.0,
        close,
        volume: 1_000_000,
        adj_close: close,
    }
}

/// `n` consecutive calendar days of plausible bars starting at `first`.
pub fn daily_bars(ticker: &str, first: NaiveDate, n: usize) -> Vec<PriceBar> {
    (0..n)
        .map(|i| bar(ticker, first + Duration::days(i as i64), 100.0 + i as f64))
        .collect()
}

pub fn daily_frame(ticker: &str, first: NaiveDate, n: usize) -> DataFrame {
    bars_to_frame(&daily_bars(ticker, first, n)).unwrap()
}

/// Wraps a `ParquetStore` and fails on demand.
pub struct FlakyStore {
    pub inner: ParquetStore,
    pub refuse_connect: bool,
    pub fail_upserts_for: HashSet<String>,
    pub connects: usize,
    pub closes: usize,
}

impl FlakyStore {
    pub fn new(root: &Path) -> Self {
        Self {
            inner: ParquetStore::new(root),
            refuse_connect: false,
            fail_upserts_for: HashSet::new(),
            connects: 0,
            closes: 0,
        }
    }

    pub fn failing_upserts_for(mut self, ticker: &str) -> Self {
        self.fail_upserts_for.insert(ticker.to_string());
        self
    }

    pub fn refusing_connections(mut self) -> Self {
        self.refuse_connect = true;
        self
    }
}

impl PriceStore for FlakyStore {
    fn connect(&mut self) -> Result<(), StoreError> {
        self.connects += 1;
        if self.refuse_connect {
            return Err(StoreError::Io {
                path: self.inner.root().to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "locked"),
            });
        }
        self.inner.connect()
    }

    fn close(&mut self) {
        self.closes += 1;
        self.inner.close()
    }

    fn is_connected(&self) -> bool {
        self.inner.is_connected()
    }

    fn last_date(&self, ticker: &str) -> Result<Option<NaiveDate>, StoreError> {
        self.inner.last_date(ticker)
    }

    fn upsert(&mut self, rows: &DataFrame) -> Result<usize, StoreError> {
        let tickers = frame::str_values(rows, frame::TICKER)?;
        if let Some(t) = tickers
            .iter()
            .flatten()
            .find(|t| self.fail_upserts_for.contains(*t))
        {
            return Err(StoreError::Io {
                path: self.inner.root().join(format!("ticker={t}")),
                source: std::io::Error::other("disk full"),
            });
        }
        self.inner.upsert(rows)
    }

    fn available_tickers(&self) -> Result<Vec<String>, StoreError> {
        self.inner.available_tickers()
    }

    fn summary(&self) -> Result<Vec<TickerSummary>, StoreError> {
        self.inner.summary()
    }

    fn query_ticker(
        &self,
        ticker: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<DataFrame, StoreError> {
        self.inner.query_ticker(ticker, start, end)
    }

    fn query_date_range(&self, start: NaiveDate, end: NaiveDate) -> Result<DataFrame, StoreError> {
        self.inner.query_date_range(start, end)
    }

    fn delete_ticker(&mut self, ticker: &str) -> Result<usize, StoreError> {
        self.inner.delete_ticker(ticker)
    }
}
