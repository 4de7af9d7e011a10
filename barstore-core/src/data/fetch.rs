//! Fetch client: bounded retry policy, call pacing and column normalization
//! around a `PriceSource`.
//!
//! The client never writes to the store and never lets a provider failure
//! escape as anything but a `FetchOutcome::Failed` value.

use super::frame::normalize;
use super::provider::{DataError, PriceSource};
use crate::config::FetchConfig;
use chrono::NaiveDate;
use polars::prelude::DataFrame;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Result of fetching one ticker's window.
#[derive(Debug)]
pub enum FetchOutcome {
    /// Column-normalized rows.
    Rows(DataFrame),
    /// The provider answered but has nothing for the range.
    NoData,
    /// Every attempt failed (or the failure was not worth retrying).
    Failed { attempts: u32, error: DataError },
}

pub struct Fetcher {
    source: Box<dyn PriceSource>,
    max_attempts: u32,
    retry_delay: Duration,
    min_interval: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl Fetcher {
    pub fn new(source: Box<dyn PriceSource>, config: &FetchConfig) -> Self {
        Self {
            source,
            max_attempts: config.max_retries.max(1),
            retry_delay: config.retry_delay(),
            min_interval: config.min_request_interval(),
            last_call: Mutex::new(None),
        }
    }

    /// Enforce the minimum spacing between provider calls. The lock is held
    /// while sleeping so concurrent callers queue behind each other.
    fn pace(&self) {
        let mut last = self.last_call.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.min_interval {
                std::thread::sleep(self.min_interval - elapsed);
            }
        }
        *last = Some(Instant::now());
    }

    /// Fetch an inclusive date window for one ticker.
    pub fn fetch(&self, ticker: &str, start: NaiveDate, end: NaiveDate) -> FetchOutcome {
        if start > end {
            return FetchOutcome::Failed {
                attempts: 0,
                error: DataError::InvalidRange { start, end },
            };
        }

        if !self.source.is_available() {
            return FetchOutcome::Failed {
                attempts: 0,
                error: DataError::CircuitBreakerTripped,
            };
        }

        tracing::info!(ticker, %start, %end, source = self.source.name(), "downloading");

        let mut last_error = None;
        for attempt in 1..=self.max_attempts {
            self.pace();

            match self.source.fetch(ticker, start, end) {
                Ok(Some(df)) if df.height() > 0 => {
                    return match normalize(ticker, &df) {
                        Ok(rows) => {
                            tracing::info!(ticker, rows = rows.height(), "downloaded");
                            FetchOutcome::Rows(rows)
                        }
                        Err(e) => FetchOutcome::Failed {
                            attempts: attempt,
                            error: DataError::Frame(e.to_string()),
                        },
                    };
                }
                Ok(_) | Err(DataError::SymbolNotFound { .. }) => {
                    tracing::warn!(ticker, "no data returned");
                    return FetchOutcome::NoData;
                }
                Err(e) if !e.is_transient() => {
                    tracing::error!(ticker, error = %e, "fetch failed, not retrying");
                    return FetchOutcome::Failed {
                        attempts: attempt,
                        error: e,
                    };
                }
                Err(e) => {
                    tracing::warn!(
                        ticker,
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %e,
                        "fetch attempt failed"
                    );
                    if attempt < self.max_attempts {
                        std::thread::sleep(self.retry_delay);
                    }
                    last_error = Some(e);
                }
            }
        }

        tracing::error!(ticker, attempts = self.max_attempts, "fetch failed after all attempts");
        FetchOutcome::Failed {
            attempts: self.max_attempts,
            error: last_error.unwrap_or_else(|| DataError::Other("max retries exceeded".into())),
        }
    }
}
