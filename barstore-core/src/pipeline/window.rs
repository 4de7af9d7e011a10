//! Ingestion window selection.

use chrono::{Duration, NaiveDate};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// A window whose start cannot be represented as a calendar date.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WindowError {
    #[error("lookback of {days} days from {today} is out of range")]
    LookbackOutOfRange { days: i64, today: NaiveDate },

    #[error("no calendar date follows last stored date {0}")]
    NoNextDay(NaiveDate),
}

/// How the start of a window was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowMode {
    /// The caller supplied a start date.
    Explicit,
    /// Resumed from the day after the last stored date.
    Incremental,
    /// Default lookback: no stored history, or incremental mode was off.
    Full,
}

impl fmt::Display for WindowMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WindowMode::Explicit => "explicit",
            WindowMode::Incremental => "incremental",
            WindowMode::Full => "full",
        })
    }
}

/// Inclusive date window to fetch for one ticker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IngestionWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub mode: WindowMode,
}

impl IngestionWindow {
    /// True when there is nothing to fetch (an incremental resume past `end`).
    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }
}

/// Choose the window for one ticker.
///
/// - an explicit `start` always wins;
/// - otherwise, in incremental mode with stored history, resume the day after `last_date`;
/// - otherwise go back `lookback_days` from `today`.
///
/// `end` defaults to `today`. `last_date` is ignored unless incremental mode
/// is on and no explicit start was given. A negative lookback, or one that
/// reaches before the earliest representable date, is an error.
pub fn resolve_window(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    incremental: bool,
    last_date: Option<NaiveDate>,
    today: NaiveDate,
    lookback_days: i64,
) -> Result<IngestionWindow, WindowError> {
    let end = end.unwrap_or(today);
    let (start, mode) = match (start, incremental, last_date) {
        (Some(start), _, _) => (start, WindowMode::Explicit),
        (None, true, Some(last)) => {
            let next = last.succ_opt().ok_or(WindowError::NoNextDay(last))?;
            (next, WindowMode::Incremental)
        }
        _ => {
            let out_of_range = WindowError::LookbackOutOfRange {
                days: lookback_days,
                today,
            };
            let start = Duration::try_days(lookback_days)
                .filter(|_| lookback_days >= 0)
                .and_then(|back| today.checked_sub_signed(back))
                .ok_or(out_of_range)?;
            (start, WindowMode::Full)
        }
    };
    Ok(IngestionWindow { start, end, mode })
}
