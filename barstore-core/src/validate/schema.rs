//! Structural (schema) checks on a row set.
//!
//! Any schema error invalidates the whole row set.

use crate::data::frame::{self, ADJ_CLOSE, CLOSE, DATE, HIGH, LOW, OPEN, TICKER, VOLUME};
use polars::prelude::*;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("row set is empty")]
    Empty,

    #[error("missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("column '{column}' must be string type, found {dtype}")]
    NotText { column: String, dtype: String },

    #[error("column '{column}' must be a valid date: {reason}")]
    NotDate { column: String, reason: String },

    #[error("column '{column}' must be numeric type, found {dtype}")]
    NotNumeric { column: String, dtype: String },

    #[error("row set could not be read: {0}")]
    Unreadable(String),
}

/// Expected type of a known column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Text,
    Date,
    Numeric,
}

fn kind_of(name: &str) -> Option<ColumnKind> {
    match name {
        TICKER => Some(ColumnKind::Text),
        DATE => Some(ColumnKind::Date),
        OPEN | HIGH | LOW | CLOSE | ADJ_CLOSE | VOLUME => Some(ColumnKind::Numeric),
        _ => None,
    }
}

fn is_numeric(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Float32
            | DataType::Float64
            | DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
    )
}

/// Run the schema pass. An empty result means the row set is structurally sound.
///
/// An all-missing column (dtype `Null`) is accepted here; the quality pass
/// reports its missing values.
pub fn check(df: &DataFrame, required_columns: &[String]) -> Vec<SchemaError> {
    if df.height() == 0 {
        return vec![SchemaError::Empty];
    }

    let mut errors = Vec::new();

    let missing: Vec<String> = required_columns
        .iter()
        .filter(|c| df.column(c).is_err())
        .cloned()
        .collect();
    if !missing.is_empty() {
        errors.push(SchemaError::MissingColumns(missing));
    }

    for col in df.get_columns() {
        let name = col.name().as_str();
        let dtype = col.dtype();
        if *dtype == DataType::Null {
            continue;
        }
        match kind_of(name) {
            Some(ColumnKind::Text) if *dtype != DataType::String => {
                errors.push(SchemaError::NotText {
                    column: name.to_string(),
                    dtype: dtype.to_string(),
                });
            }
            Some(ColumnKind::Date) => {
                if let Err(e) = frame::date_values(df, name) {
                    errors.push(SchemaError::NotDate {
                        column: name.to_string(),
                        reason: e.to_string(),
                    });
                }
            }
            Some(ColumnKind::Numeric) if !is_numeric(dtype) => {
                errors.push(SchemaError::NotNumeric {
                    column: name.to_string(),
                    dtype: dtype.to_string(),
                });
            }
            _ => {}
        }
    }

    errors
}
