//! Price source trait and structured error types.
//!
//! The PriceSource trait abstracts over data sources (Yahoo Finance, CSV import)
//! so we can swap implementations and script responses in tests.

use chrono::NaiveDate;
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Raw daily OHLCV observation from a provider, before validation.
///
/// Individual values may be missing; the validator decides what to do with them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawBar {
    pub date: NaiveDate,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<i64>,
    pub adj_close: Option<f64>,
}

impl RawBar {
    /// True when no OHLCV value is present (holidays / non-trading days).
    pub fn is_blank(&self) -> bool {
        self.open.is_none()
            && self.high.is_none()
            && self.low.is_none()
            && self.close.is_none()
            && self.volume.is_none()
    }
}

/// Structured error types for provider operations.
///
/// These are designed to be displayable in both log lines and run reports.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("authentication required: {0}")]
    AuthenticationRequired(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("hard stop: data provider has blocked requests (circuit breaker tripped)")]
    CircuitBreakerTripped,

    #[error("invalid date range: {start} is after {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("csv error: {0}")]
    Csv(String),

    #[error("frame error: {0}")]
    Frame(String),

    #[error("data error: {0}")]
    Other(String),
}

impl DataError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DataError::NetworkUnreachable(_)
                | DataError::RateLimited { .. }
                | DataError::ResponseFormatChanged(_)
                | DataError::Other(_)
        )
    }
}

/// Trait for price sources (Yahoo Finance, CSV import, etc).
///
/// Implementations handle the specifics of one provider and return the rows in
/// whatever column layout the provider uses; the fetch client normalizes them.
/// `Ok(None)` means the provider answered but has nothing for the range.
/// Sources never touch the store.
pub trait PriceSource: Send + Sync {
    /// Human-readable name of this source.
    fn name(&self) -> &str;

    /// Fetch daily rows for a ticker over an inclusive date range.
    fn fetch(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Option<DataFrame>, DataError>;

    /// Check if the source is currently available (not rate-limited, not blocked).
    fn is_available(&self) -> bool {
        true
    }
}

impl<T: PriceSource + ?Sized> PriceSource for std::sync::Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn fetch(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Option<DataFrame>, DataError> {
        (**self).fetch(ticker, start, end)
    }

    fn is_available(&self) -> bool {
        (**self).is_available()
    }
}
