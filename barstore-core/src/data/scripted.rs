//! Scripted price source for offline runs and tests.
//!
//! Each ticker has a queue of canned responses consumed one per call. When the
//! queue is empty the ticker's standing history (if any) answers, restricted to
//! the requested window like a real provider would; otherwise the answer is
//! "no data". Every call is recorded.

use super::frame::{date_values, DATE};
use super::provider::{DataError, PriceSource};
use chrono::NaiveDate;
use polars::prelude::*;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

type Response = Result<Option<DataFrame>, DataError>;

#[derive(Default)]
struct Script {
    queued: HashMap<String, VecDeque<Response>>,
    history: HashMap<String, DataFrame>,
    calls: Vec<(String, NaiveDate, NaiveDate)>,
}

#[derive(Default)]
pub struct ScriptedSource {
    script: Mutex<Script>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push(&self, ticker: &str, response: Response) {
        self.lock()
            .queued
            .entry(ticker.to_string())
            .or_default()
            .push_back(response);
    }

    /// Answer the next call for `ticker` with exactly these rows.
    pub fn push_rows(&self, ticker: &str, rows: DataFrame) {
        self.push(ticker, Ok(Some(rows)));
    }

    /// Answer the next call for `ticker` with an empty success.
    pub fn push_empty(&self, ticker: &str) {
        self.push(ticker, Ok(None));
    }

    /// Fail the next call for `ticker`.
    pub fn push_error(&self, ticker: &str, error: DataError) {
        self.push(ticker, Err(error));
    }

    /// Serve `rows` (filtered to the requested window) whenever no queued
    /// response is pending for `ticker`.
    pub fn set_history(&self, ticker: &str, rows: DataFrame) {
        self.lock().history.insert(ticker.to_string(), rows);
    }

    /// Every `(ticker, start, end)` requested so far, in call order.
    pub fn calls(&self) -> Vec<(String, NaiveDate, NaiveDate)> {
        self.lock().calls.clone()
    }

    pub fn calls_for(&self, ticker: &str) -> usize {
        self.lock().calls.iter().filter(|(t, _, _)| t == ticker).count()
    }
}

fn window(rows: &DataFrame, start: NaiveDate, end: NaiveDate) -> Response {
    let dates = date_values(rows, DATE).map_err(|e| DataError::Frame(e.to_string()))?;
    let mask: Vec<bool> = dates
        .iter()
        .map(|d| d.is_some_and(|d| d >= start && d <= end))
        .collect();
    let filtered = rows
        .filter(&BooleanChunked::from_slice("window".into(), &mask))
        .map_err(|e| DataError::Frame(e.to_string()))?;
    Ok((filtered.height() > 0).then_some(filtered))
}

impl PriceSource for ScriptedSource {
    fn name(&self) -> &str {
        "scripted"
    }

    fn fetch(&self, ticker: &str, start: NaiveDate, end: NaiveDate) -> Response {
        let mut script = self.lock();
        script.calls.push((ticker.to_string(), start, end));

        if let Some(response) = script.queued.get_mut(ticker).and_then(VecDeque::pop_front) {
            return response;
        }
        match script.history.get(ticker) {
            Some(rows) => window(rows, start, end),
            None => Ok(None),
        }
    }
}
