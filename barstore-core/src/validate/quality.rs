//! Quality (content) checks and row filtering.
//!
//! Quality warnings never invalidate a row set on their own. They drive
//! `filter_invalid_rows`, which removes the offending rows.

use crate::data::frame::{self, FrameError, CLOSE, DATE, HIGH, LOW, PRICE_COLUMNS, TICKER, VOLUME};
use chrono::NaiveDate;
use polars::prelude::*;
use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QualityWarning {
    InsufficientData { rows: usize, minimum: usize },
    NegativeValues { column: String, count: usize },
    HighBelowLow { count: usize },
    MissingValues { column: String, count: usize },
    DuplicateKeys { count: usize },
    DateGaps { count: usize, max_gap_days: i64 },
}

impl fmt::Display for QualityWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InsufficientData { rows, minimum } => {
                write!(f, "Insufficient data: {rows} rows (minimum: {minimum})")
            }
            Self::NegativeValues { column, count } => {
                write!(f, "Found {count} negative values in '{column}'")
            }
            Self::HighBelowLow { count } => write!(f, "Found {count} rows where high < low"),
            Self::MissingValues { column, count } => {
                write!(f, "Column '{column}' has {count} missing values")
            }
            Self::DuplicateKeys { count } => {
                write!(f, "Found {count} duplicate ticker-date combinations")
            }
            Self::DateGaps {
                count,
                max_gap_days,
            } => write!(f, "Found {count} date gaps larger than {max_gap_days} days"),
        }
    }
}

/// Columns whose values must be present and non-negative for a row to survive.
fn non_negative_columns(df: &DataFrame) -> impl Iterator<Item = &'static str> + '_ {
    PRICE_COLUMNS
        .iter()
        .copied()
        .chain(std::iter::once(VOLUME))
        .filter(|c| df.column(c).is_ok())
}

/// Float columns carry NaN for values some providers mark as missing.
fn missing_count(df: &DataFrame, name: &str) -> Result<usize, FrameError> {
    let col = df
        .column(name)
        .map_err(|_| FrameError::MissingColumn(name.to_string()))?;
    let mut count = col.null_count();
    if matches!(col.dtype(), DataType::Float32 | DataType::Float64) {
        count += frame::f64_values(df, name)?
            .iter()
            .filter(|v| v.is_some_and(f64::is_nan))
            .count();
    }
    Ok(count)
}

fn negative_count(df: &DataFrame, name: &str) -> Result<usize, FrameError> {
    Ok(frame::f64_values(df, name)?
        .iter()
        .filter(|v| v.is_some_and(|v| v < 0.0))
        .count())
}

fn high_below_low(df: &DataFrame) -> Result<Vec<bool>, FrameError> {
    let highs = frame::f64_values(df, HIGH)?;
    let lows = frame::f64_values(df, LOW)?;
    Ok(highs
        .iter()
        .zip(&lows)
        .map(|(h, l)| matches!((h, l), (Some(h), Some(l)) if h < l))
        .collect())
}

/// Rows repeating a `(ticker, date)` key already seen earlier in the set.
fn duplicate_count(df: &DataFrame) -> Result<usize, FrameError> {
    let tickers = frame::str_values(df, TICKER)?;
    let dates = frame::date_values(df, DATE)?;
    let mut seen: HashSet<(Option<String>, Option<NaiveDate>)> = HashSet::new();
    Ok(tickers
        .into_iter()
        .zip(dates)
        .filter(|key| !seen.insert(key.clone()))
        .count())
}

fn gap_count(df: &DataFrame, max_gap_days: i64) -> Result<usize, FrameError> {
    let mut dates: Vec<NaiveDate> = frame::date_values(df, DATE)?.into_iter().flatten().collect();
    dates.sort_unstable();
    Ok(dates
        .windows(2)
        .filter(|w| (w[1] - w[0]).num_days() > max_gap_days)
        .count())
}

/// Run the quality pass over a row set that already passed the schema pass.
pub fn check(
    df: &DataFrame,
    required_columns: &[String],
    min_data_points: usize,
    max_gap_days: i64,
) -> Result<Vec<QualityWarning>, FrameError> {
    let mut warnings = Vec::new();

    if df.height() < min_data_points {
        warnings.push(QualityWarning::InsufficientData {
            rows: df.height(),
            minimum: min_data_points,
        });
    }

    for column in non_negative_columns(df) {
        let count = negative_count(df, column)?;
        if count > 0 {
            warnings.push(QualityWarning::NegativeValues {
                column: column.to_string(),
                count,
            });
        }
    }

    if df.column(HIGH).is_ok() && df.column(LOW).is_ok() {
        let count = high_below_low(df)?.into_iter().filter(|&b| b).count();
        if count > 0 {
            warnings.push(QualityWarning::HighBelowLow { count });
        }
    }

    for column in required_columns {
        if df.column(column).is_err() {
            continue;
        }
        let count = missing_count(df, column)?;
        if count > 0 {
            warnings.push(QualityWarning::MissingValues {
                column: column.clone(),
                count,
            });
        }
    }

    if df.column(TICKER).is_ok() && df.column(DATE).is_ok() {
        let count = duplicate_count(df)?;
        if count > 0 {
            warnings.push(QualityWarning::DuplicateKeys { count });
        }
    }

    if df.column(DATE).is_ok() && df.height() > 1 {
        let count = gap_count(df, max_gap_days)?;
        if count > 0 {
            warnings.push(QualityWarning::DateGaps {
                count,
                max_gap_days,
            });
        }
    }

    Ok(warnings)
}

/// Drop rows that cannot be stored.
///
/// A row survives only if every price column and `volume` holds a
/// non-negative value, `high >= low`, and `ticker`, `date` and `close` are
/// present. A missing price or volume fails the `>= 0` comparison and drops
/// the row. Duplicate keys are left in place.
pub fn filter_invalid_rows(df: &DataFrame) -> Result<DataFrame, FrameError> {
    let height = df.height();
    let mut keep = vec![true; height];

    for column in non_negative_columns(df) {
        for (row, value) in frame::f64_values(df, column)?.into_iter().enumerate() {
            if !value.is_some_and(|v| v >= 0.0) {
                keep[row] = false;
            }
        }
    }

    if df.column(HIGH).is_ok() && df.column(LOW).is_ok() {
        for (row, inverted) in high_below_low(df)?.into_iter().enumerate() {
            if inverted {
                keep[row] = false;
            }
        }
    }

    let present = |name: &str| df.column(name).is_ok();
    let mut missing_key: Vec<Vec<bool>> = Vec::with_capacity(3);
    if present(TICKER) {
        missing_key.push(frame::str_values(df, TICKER)?.iter().map(Option::is_none).collect());
    }
    if present(DATE) {
        missing_key.push(frame::date_values(df, DATE)?.iter().map(Option::is_none).collect());
    }
    if present(CLOSE) {
        missing_key.push(frame::f64_values(df, CLOSE)?.iter().map(Option::is_none).collect());
    }
    for mask in missing_key {
        for (row, missing) in mask.into_iter().enumerate() {
            if missing {
                keep[row] = false;
            }
        }
    }

    let filtered = df.filter(&BooleanChunked::from_slice("keep".into(), &keep))?;
    let removed = height - filtered.height();
    if removed > 0 {
        tracing::warn!(removed, remaining = filtered.height(), "filtered out invalid rows");
    }
    Ok(filtered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::frame::{ADJ_CLOSE, CANONICAL_COLUMNS, OPEN};

    fn required() -> Vec<String> {
        CANONICAL_COLUMNS.iter().map(|c| c.to_string()).collect()
    }

    fn frame(dates: &[&str], volumes: &[Option<i64>], lows: &[f64]) -> DataFrame {
        let n = dates.len();
        df!(
            TICKER => vec!["X"; n],
            DATE => dates,
            OPEN => vec![10.0; n],
            HIGH => vec![11.0; n],
            LOW => lows,
            CLOSE => vec![10.5; n],
            VOLUME => volumes,
            ADJ_CLOSE => vec![10.5; n],
        )
        .unwrap()
    }

    #[test]
    fn clean_frame_has_no_warnings() {
        let dates = ["2024-01-02", "2024-01-03", "2024-01-04"];
        let df = frame(&dates, &[Some(1), Some(2), Some(3)], &[9.0; 3]);
        assert!(check(&df, &required(), 3, 7).unwrap().is_empty());
    }

    #[test]
    fn reports_each_problem_once() {
        let dates = ["2024-01-02", "2024-01-02", "2024-02-01"];
        let df = frame(&dates, &[Some(-5), None, Some(3)], &[9.0, 12.0, 9.0]);

        let warnings = check(&df, &required(), 10, 7).unwrap();
        assert_eq!(
            warnings,
            vec![
                QualityWarning::InsufficientData { rows: 3, minimum: 10 },
                QualityWarning::NegativeValues { column: VOLUME.into(), count: 1 },
                QualityWarning::HighBelowLow { count: 1 },
                QualityWarning::MissingValues { column: VOLUME.into(), count: 1 },
                QualityWarning::DuplicateKeys { count: 1 },
                QualityWarning::DateGaps { count: 1, max_gap_days: 7 },
            ]
        );
    }

    #[test]
    fn nan_counts_as_missing() {
        let mut df = frame(&["2024-01-02"], &[Some(1)], &[9.0]);
        df.with_column(Column::new(CLOSE.into(), &[f64::NAN])).unwrap();
        let warnings = check(&df, &required(), 1, 7).unwrap();
        assert_eq!(
            warnings,
            vec![QualityWarning::MissingValues { column: CLOSE.into(), count: 1 }]
        );
    }

    #[test]
    fn gap_threshold_is_exclusive() {
        let df = frame(&["2024-01-01", "2024-01-08", "2024-01-16"], &[Some(1); 3], &[9.0; 3]);
        assert_eq!(
            check(&df, &required(), 1, 7).unwrap(),
            vec![QualityWarning::DateGaps { count: 1, max_gap_days: 7 }]
        );
    }

    #[test]
    fn filter_drops_negative_missing_and_inverted_rows() {
        let dates = ["2024-01-02", "2024-01-03", "2024-01-04", "2024-01-05"];
        let df = frame(&dates, &[Some(-5), None, Some(3), Some(4)], &[9.0, 9.0, 12.0, 9.0]);

        let out = filter_invalid_rows(&df).unwrap();
        assert_eq!(out.height(), 1);
        assert_eq!(
            frame::date_values(&out, DATE).unwrap(),
            vec![Some(NaiveDate::from_ymd_opt(2024, 1, 5).unwrap())]
        );
    }

    #[test]
    fn filter_keeps_duplicates() {
        let df = frame(&["2024-01-02", "2024-01-02"], &[Some(1), Some(1)], &[9.0, 9.0]);
        assert_eq!(filter_invalid_rows(&df).unwrap().height(), 2);
    }

    #[test]
    fn filter_may_empty_the_set() {
        let df = frame(&["2024-01-02"], &[Some(-1)], &[9.0]);
        assert_eq!(filter_invalid_rows(&df).unwrap().height(), 0);
    }

    #[test]
    fn messages_render_counts() {
        assert_eq!(
            QualityWarning::NegativeValues { column: "volume".into(), count: 1 }.to_string(),
            "Found 1 negative values in 'volume'"
        );
        assert_eq!(
            QualityWarning::InsufficientData { rows: 3, minimum: 10 }.to_string(),
            "Insufficient data: 3 rows (minimum: 10)"
        );
    }
}
