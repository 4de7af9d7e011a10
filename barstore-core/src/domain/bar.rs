//! PriceBar: one stored daily observation.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Daily OHLCV observation for a single ticker.
///
/// The natural key is `(ticker, date)`; the store holds at most one row per key.
/// Prices are as supplied by the provider (no corporate-action adjustment beyond
/// what `adj_close` already carries).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub ticker: String,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
    pub adj_close: f64,
}

/// A bar as persisted, with the time it was inserted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredBar {
    #[serde(flatten)]
    pub bar: PriceBar,
    pub created_at: NaiveDateTime,
}
