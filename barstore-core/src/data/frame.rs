//! Row sets as Polars DataFrames.
//!
//! A row set is a `DataFrame` with the canonical columns below. This module owns
//! the conversions between frames and typed bars, typed column extraction that
//! tolerates the dtype variations providers produce, and column normalization.

use super::provider::RawBar;
use crate::domain::{PriceBar, StoredBar};
use chrono::{NaiveDate, NaiveDateTime};
use polars::prelude::*;
use thiserror::Error;

pub const TICKER: &str = "ticker";
pub const DATE: &str = "date";
pub const OPEN: &str = "open";
pub const HIGH: &str = "high";
pub const LOW: &str = "low";
pub const CLOSE: &str = "close";
pub const VOLUME: &str = "volume";
pub const ADJ_CLOSE: &str = "adj_close";
pub const CREATED_AT: &str = "created_at";

/// Price columns, validated as non-negative.
pub const PRICE_COLUMNS: [&str; 5] = [OPEN, HIGH, LOW, CLOSE, ADJ_CLOSE];

/// Canonical row-set columns in storage order.
pub const CANONICAL_COLUMNS: [&str; 8] = [TICKER, DATE, OPEN, HIGH, LOW, CLOSE, VOLUME, ADJ_CLOSE];

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("missing column '{0}'")]
    MissingColumn(String),

    #[error("missing value in column '{column}' at row {row}")]
    NullValue { column: String, row: usize },

    #[error("column '{column}' has unsupported type {dtype}")]
    UnsupportedType { column: String, dtype: String },

    #[error("column '{column}' has unparseable date '{value}' at row {row}")]
    UnparseableDate {
        column: String,
        row: usize,
        value: String,
    },

    #[error("polars: {0}")]
    Polars(#[from] PolarsError),
}

// ── Date helpers ────────────────────────────────────────────────────

fn epoch() -> NaiveDate {
    NaiveDate::default()
}

pub fn date_to_days(date: NaiveDate) -> i32 {
    (date - epoch()).num_days() as i32
}

pub fn days_to_date(days: i32) -> NaiveDate {
    epoch() + chrono::Duration::days(days as i64)
}

/// Parse the date representations providers emit in text columns.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
        .or_else(|| {
            chrono::DateTime::parse_from_rfc3339(text)
                .ok()
                .map(|dt| dt.date_naive())
        })
}

// ── Column extraction ───────────────────────────────────────────────

fn column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Column, FrameError> {
    df.column(name)
        .map_err(|_| FrameError::MissingColumn(name.to_string()))
}

/// Values of a numeric column as f64, nulls preserved.
pub fn f64_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>, FrameError> {
    let cast = column(df, name)?.cast(&DataType::Float64)?;
    Ok(cast.f64()?.into_iter().collect())
}

/// Values of a numeric column as i64, nulls preserved. Fractions are truncated.
pub fn i64_values(df: &DataFrame, name: &str) -> Result<Vec<Option<i64>>, FrameError> {
    let cast = column(df, name)?.cast(&DataType::Int64)?;
    Ok(cast.i64()?.into_iter().collect())
}

/// Values of a text column, nulls preserved.
pub fn str_values(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>, FrameError> {
    let cast = column(df, name)?.cast(&DataType::String)?;
    Ok(cast
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect())
}

/// Values of a date-like column (Date, Datetime, or parseable text), nulls preserved.
pub fn date_values(df: &DataFrame, name: &str) -> Result<Vec<Option<NaiveDate>>, FrameError> {
    let col = column(df, name)?;
    match col.dtype() {
        DataType::Date => {
            let days = col.cast(&DataType::Int32)?;
            Ok(days.i32()?.into_iter().map(|d| d.map(days_to_date)).collect())
        }
        DataType::Datetime(_, _) => {
            let days = col.cast(&DataType::Date)?.cast(&DataType::Int32)?;
            Ok(days.i32()?.into_iter().map(|d| d.map(days_to_date)).collect())
        }
        DataType::String => col
            .str()?
            .into_iter()
            .enumerate()
            .map(|(row, v)| match v {
                None => Ok(None),
                Some(text) => parse_date(text).map(Some).ok_or_else(|| {
                    FrameError::UnparseableDate {
                        column: name.to_string(),
                        row,
                        value: text.to_string(),
                    }
                }),
            })
            .collect(),
        DataType::Null => Ok(vec![None; col.len()]),
        other => Err(FrameError::UnsupportedType {
            column: name.to_string(),
            dtype: other.to_string(),
        }),
    }
}

fn date_column(name: &str, dates: &[Option<NaiveDate>]) -> PolarsResult<Column> {
    let days: Vec<Option<i32>> = dates.iter().map(|d| d.map(date_to_days)).collect();
    Column::new(name.into(), days).cast(&DataType::Date)
}

fn required<T: Clone>(values: &[Option<T>], column: &str, row: usize) -> Result<T, FrameError> {
    values[row].clone().ok_or_else(|| FrameError::NullValue {
        column: column.to_string(),
        row,
    })
}

// ── Frame construction ──────────────────────────────────────────────

/// Build a canonical row set from provider rows for one ticker.
pub fn raw_bars_to_frame(ticker: &str, bars: &[RawBar]) -> PolarsResult<DataFrame> {
    let dates: Vec<Option<NaiveDate>> = bars.iter().map(|b| Some(b.date)).collect();
    DataFrame::new(vec![
        Column::new(TICKER.into(), vec![ticker.to_string(); bars.len()]),
        date_column(DATE, &dates)?,
        Column::new(OPEN.into(), bars.iter().map(|b| b.open).collect::<Vec<_>>()),
        Column::new(HIGH.into(), bars.iter().map(|b| b.high).collect::<Vec<_>>()),
        Column::new(LOW.into(), bars.iter().map(|b| b.low).collect::<Vec<_>>()),
        Column::new(CLOSE.into(), bars.iter().map(|b| b.close).collect::<Vec<_>>()),
        Column::new(VOLUME.into(), bars.iter().map(|b| b.volume).collect::<Vec<_>>()),
        Column::new(ADJ_CLOSE.into(), bars.iter().map(|b| b.adj_close).collect::<Vec<_>>()),
    ])
}

/// Build a canonical row set from complete bars.
pub fn bars_to_frame(bars: &[PriceBar]) -> PolarsResult<DataFrame> {
    let dates: Vec<Option<NaiveDate>> = bars.iter().map(|b| Some(b.date)).collect();
    DataFrame::new(vec![
        Column::new(TICKER.into(), bars.iter().map(|b| b.ticker.clone()).collect::<Vec<_>>()),
        date_column(DATE, &dates)?,
        Column::new(OPEN.into(), bars.iter().map(|b| b.open).collect::<Vec<_>>()),
        Column::new(HIGH.into(), bars.iter().map(|b| b.high).collect::<Vec<_>>()),
        Column::new(LOW.into(), bars.iter().map(|b| b.low).collect::<Vec<_>>()),
        Column::new(CLOSE.into(), bars.iter().map(|b| b.close).collect::<Vec<_>>()),
        Column::new(VOLUME.into(), bars.iter().map(|b| b.volume).collect::<Vec<_>>()),
        Column::new(ADJ_CLOSE.into(), bars.iter().map(|b| b.adj_close).collect::<Vec<_>>()),
    ])
}

/// Build a stored-table frame: the canonical columns plus `created_at`.
pub fn stored_to_frame(rows: &[StoredBar]) -> PolarsResult<DataFrame> {
    let bars: Vec<PriceBar> = rows.iter().map(|r| r.bar.clone()).collect();
    let mut df = bars_to_frame(&bars)?;
    let millis: Vec<i64> = rows
        .iter()
        .map(|r| r.created_at.and_utc().timestamp_millis())
        .collect();
    let created = Column::new(CREATED_AT.into(), millis)
        .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?;
    df.with_column(created)?;
    Ok(df)
}

/// Convert a row set to complete bars. Any missing value is an error.
pub fn frame_to_bars(df: &DataFrame) -> Result<Vec<PriceBar>, FrameError> {
    let tickers = str_values(df, TICKER)?;
    let dates = date_values(df, DATE)?;
    let opens = f64_values(df, OPEN)?;
    let highs = f64_values(df, HIGH)?;
    let lows = f64_values(df, LOW)?;
    let closes = f64_values(df, CLOSE)?;
    let volumes = i64_values(df, VOLUME)?;
    let adj_closes = f64_values(df, ADJ_CLOSE)?;

    (0..df.height())
        .map(|row| {
            Ok(PriceBar {
                ticker: required(&tickers, TICKER, row)?,
                date: required(&dates, DATE, row)?,
                open: required(&opens, OPEN, row)?,
                high: required(&highs, HIGH, row)?,
                low: required(&lows, LOW, row)?,
                close: required(&closes, CLOSE, row)?,
                volume: required(&volumes, VOLUME, row)?,
                adj_close: required(&adj_closes, ADJ_CLOSE, row)?,
            })
        })
        .collect()
}

/// Convert a stored-table frame back to stored bars.
pub fn frame_to_stored(df: &DataFrame) -> Result<Vec<StoredBar>, FrameError> {
    let bars = frame_to_bars(df)?;
    let millis = i64_values(df, CREATED_AT)?;
    bars.into_iter()
        .enumerate()
        .map(|(row, bar)| {
            let ms = required(&millis, CREATED_AT, row)?;
            let created_at = chrono::DateTime::from_timestamp_millis(ms)
                .map(|dt| dt.naive_utc())
                .ok_or_else(|| FrameError::NullValue {
                    column: CREATED_AT.to_string(),
                    row,
                })?;
            Ok(StoredBar { bar, created_at })
        })
        .collect()
}

// ── Normalization ───────────────────────────────────────────────────

/// Map a provider column name onto a canonical one, if it is one we know.
pub(crate) fn canonical_name(name: &str) -> Option<&'static str> {
    let key = name.trim().to_ascii_lowercase().replace([' ', '-'], "_");
    match key.as_str() {
        "ticker" | "symbol" => Some(TICKER),
        "date" | "index" | "datetime" | "timestamp" => Some(DATE),
        "open" => Some(OPEN),
        "high" => Some(HIGH),
        "low" => Some(LOW),
        "close" => Some(CLOSE),
        "volume" => Some(VOLUME),
        "adj_close" | "adjclose" | "adjusted_close" => Some(ADJ_CLOSE),
        _ => None,
    }
}

/// Column-normalize a provider frame into the row-set shape.
///
/// Known aliases are renamed (`Adj Close` → `adj_close`, `Date` → `date`, ...),
/// the ticker column is attached when absent, a parseable date column is
/// coerced to a pure calendar date, unknown columns are dropped and the rest
/// are put in canonical order. Missing required columns are left missing so the
/// schema pass can report them.
pub fn normalize(ticker: &str, df: &DataFrame) -> Result<DataFrame, FrameError> {
    let mut renamed: Vec<Column> = Vec::with_capacity(CANONICAL_COLUMNS.len());
    for col in df.get_columns() {
        let Some(canonical) = canonical_name(col.name().as_str()) else {
            continue;
        };
        if renamed.iter().any(|c| c.name().as_str() == canonical) {
            continue;
        }
        renamed.push(col.clone().with_name(canonical.into()));
    }

    if !renamed.iter().any(|c| c.name().as_str() == TICKER) {
        renamed.push(Column::new(
            TICKER.into(),
            vec![ticker.to_string(); df.height()],
        ));
    }

    let mut out = DataFrame::new(renamed)?;

    if out.column(DATE).is_ok() {
        if let Ok(dates) = date_values(&out, DATE) {
            out.with_column(date_column(DATE, &dates)?)?;
        }
    }

    let present: Vec<&str> = CANONICAL_COLUMNS
        .iter()
        .copied()
        .filter(|name| out.column(name).is_ok())
        .collect();
    Ok(out.select(present)?)
}
