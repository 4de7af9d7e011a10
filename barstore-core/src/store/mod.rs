//! Durable storage for daily bars.
//!
//! `PriceStore` is the seam between the pipeline and the storage engine. The
//! shipped engine is `ParquetStore`; tests wrap it to inject failures.

pub mod manifest;
pub mod parquet;

pub use manifest::Manifest;
pub use parquet::{ParquetStore, PartitionMeta};

use crate::data::frame::FrameError;
use chrono::{NaiveDate, NaiveDateTime};
use polars::prelude::{DataFrame, PolarsError};
use serde::{Deserialize, Serialize};
use std::ops::{Deref, DerefMut};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store is not connected")]
    NotConnected,

    #[error("invalid ticker '{0}'")]
    InvalidTicker(String),

    #[error("duplicate key ({ticker}, {date}) in upsert batch")]
    DuplicateKey { ticker: String, date: NaiveDate },

    #[error("incomplete row: {0}")]
    Frame(#[from] FrameError),

    #[error("schema mismatch in {path}: {reason}")]
    SchemaMismatch { path: PathBuf, reason: String },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parquet error at {path}: {source}")]
    Parquet {
        path: PathBuf,
        #[source]
        source: PolarsError,
    },

    #[error("serialization error at {path}: {source}")]
    Serialization {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl From<PolarsError> for StoreError {
    fn from(e: PolarsError) -> Self {
        StoreError::Frame(FrameError::Polars(e))
    }
}

/// Per-ticker coverage as reported by `PriceStore::summary`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerSummary {
    pub ticker: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub row_count: usize,
    pub last_updated: NaiveDateTime,
}

/// Storage engine contract.
///
/// Row sets in and out are canonical frames (see `data::frame`); frames
/// returned by queries also carry `created_at`. Every operation other than
/// `connect`/`close`/`is_connected` fails with `StoreError::NotConnected`
/// on a closed store.
pub trait PriceStore: Send {
    /// Open the store, creating its layout on first use. Idempotent.
    fn connect(&mut self) -> Result<(), StoreError>;

    /// Release the store. Safe to call when never connected.
    fn close(&mut self);

    fn is_connected(&self) -> bool;

    /// Latest stored date for a ticker, `None` when it has no history.
    fn last_date(&self, ticker: &str) -> Result<Option<NaiveDate>, StoreError>;

    /// Replace the stored rows in the batch's date span and insert the batch.
    ///
    /// For each ticker in `rows`, stored rows dated within the batch's own
    /// `[min, max]` date span are removed before the batch is inserted, so
    /// re-upserting the same batch leaves the store unchanged. Returns the
    /// number of rows inserted.
    fn upsert(&mut self, rows: &DataFrame) -> Result<usize, StoreError>;

    /// Distinct stored tickers, sorted.
    fn available_tickers(&self) -> Result<Vec<String>, StoreError>;

    fn summary(&self) -> Result<Vec<TickerSummary>, StoreError>;

    /// Rows for one ticker ordered by date, optionally bounded (inclusive).
    fn query_ticker(
        &self,
        ticker: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<DataFrame, StoreError>;

    /// Rows of every ticker within an inclusive date range, ordered by ticker then date.
    fn query_date_range(&self, start: NaiveDate, end: NaiveDate) -> Result<DataFrame, StoreError>;

    /// Remove a ticker's history. Returns the number of rows removed.
    fn delete_ticker(&mut self, ticker: &str) -> Result<usize, StoreError>;
}

impl<T: PriceStore + ?Sized> PriceStore for Box<T> {
    fn connect(&mut self) -> Result<(), StoreError> {
        (**self).connect()
    }

    fn close(&mut self) {
        (**self).close()
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }

    fn last_date(&self, ticker: &str) -> Result<Option<NaiveDate>, StoreError> {
        (**self).last_date(ticker)
    }

    fn upsert(&mut self, rows: &DataFrame) -> Result<usize, StoreError> {
        (**self).upsert(rows)
    }

    fn available_tickers(&self) -> Result<Vec<String>, StoreError> {
        (**self).available_tickers()
    }

    fn summary(&self) -> Result<Vec<TickerSummary>, StoreError> {
        (**self).summary()
    }

    fn query_ticker(
        &self,
        ticker: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<DataFrame, StoreError> {
        (**self).query_ticker(ticker, start, end)
    }

    fn query_date_range(&self, start: NaiveDate, end: NaiveDate) -> Result<DataFrame, StoreError> {
        (**self).query_date_range(start, end)
    }

    fn delete_ticker(&mut self, ticker: &str) -> Result<usize, StoreError> {
        (**self).delete_ticker(ticker)
    }
}

/// A connected store that is closed again when the session is dropped.
pub struct StoreSession<'a, S: PriceStore + ?Sized> {
    store: &'a mut S,
}

impl<'a, S: PriceStore + ?Sized> StoreSession<'a, S> {
    pub fn open(store: &'a mut S) -> Result<Self, StoreError> {
        store.connect()?;
        Ok(Self { store })
    }
}

impl<S: PriceStore + ?Sized> Deref for StoreSession<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        self.store
    }
}

impl<S: PriceStore + ?Sized> DerefMut for StoreSession<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        self.store
    }
}

impl<S: PriceStore + ?Sized> Drop for StoreSession<'_, S> {
    fn drop(&mut self) {
        self.store.close();
    }
}
