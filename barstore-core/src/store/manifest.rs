//! Table schema contract persisted at the store root as `_schema.json`.
//!
//! - Table: `stock_prices`
//! - Columns: ticker, date, open, high, low, close, volume, adj_close, created_at
//! - Primary key: (ticker, date)
//! - Indexes: (ticker, date) is the partition-per-ticker layout sorted by date;
//!   (date) is the min/max date range recorded in each partition's `meta.json`

use crate::data::frame::{ADJ_CLOSE, CLOSE, CREATED_AT, DATE, HIGH, LOW, OPEN, TICKER, VOLUME};
use polars::prelude::{DataFrame, DataType, TimeUnit};
use serde::{Deserialize, Serialize};

pub const TABLE_NAME: &str = "stock_prices";
pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Text,
    Date,
    Float64,
    Int64,
    TimestampMs,
}

impl ColumnType {
    fn matches(self, dtype: &DataType) -> bool {
        match self {
            ColumnType::Text => *dtype == DataType::String,
            ColumnType::Date => *dtype == DataType::Date,
            ColumnType::Float64 => *dtype == DataType::Float64,
            ColumnType::Int64 => *dtype == DataType::Int64,
            ColumnType::TimestampMs => {
                matches!(dtype, DataType::Datetime(TimeUnit::Milliseconds, _))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    pub dtype: ColumnType,
    pub nullable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDef {
    pub name: String,
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub table: String,
    pub format_version: u32,
    pub columns: Vec<ColumnDef>,
    pub primary_key: Vec<String>,
    pub indexes: Vec<IndexDef>,
}

fn column(name: &str, dtype: ColumnType) -> ColumnDef {
    ColumnDef {
        name: name.to_string(),
        dtype,
        nullable: false,
    }
}

impl Manifest {
    /// The layout this build reads and writes.
    pub fn current() -> Self {
        Self {
            table: TABLE_NAME.to_string(),
            format_version: FORMAT_VERSION,
            columns: vec![
                column(TICKER, ColumnType::Text),
                column(DATE, ColumnType::Date),
                column(OPEN, ColumnType::Float64),
                column(HIGH, ColumnType::Float64),
                column(LOW, ColumnType::Float64),
                column(CLOSE, ColumnType::Float64),
                column(VOLUME, ColumnType::Int64),
                column(ADJ_CLOSE, ColumnType::Float64),
                column(CREATED_AT, ColumnType::TimestampMs),
            ],
            primary_key: vec![TICKER.to_string(), DATE.to_string()],
            indexes: vec![
                IndexDef {
                    name: "idx_ticker_date".into(),
                    columns: vec![TICKER.into(), DATE.into()],
                },
                IndexDef {
                    name: "idx_date".into(),
                    columns: vec![DATE.into()],
                },
            ],
        }
    }

    /// Describe how `other` (a manifest found on disk) differs from this one.
    pub fn incompatibility(&self, other: &Manifest) -> Option<String> {
        if other.table != self.table {
            return Some(format!("table '{}', expected '{}'", other.table, self.table));
        }
        if other.format_version != self.format_version {
            return Some(format!(
                "format version {}, expected {}",
                other.format_version, self.format_version
            ));
        }
        if other.columns != self.columns {
            return Some("column definitions differ".to_string());
        }
        None
    }

    /// Check a partition frame against the column contract.
    pub fn check_frame(&self, df: &DataFrame) -> Result<(), String> {
        for col in &self.columns {
            let actual = df
                .column(&col.name)
                .map_err(|_| format!("missing column '{}'", col.name))?;
            if !col.dtype.matches(actual.dtype()) {
                return Err(format!(
                    "column '{}': expected {:?}, got {}",
                    col.name,
                    col.dtype,
                    actual.dtype()
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::frame::stored_to_frame;

    #[test]
    fn current_matches_itself() {
        let m = Manifest::current();
        assert_eq!(m.incompatibility(&Manifest::current()), None);
        assert_eq!(m.columns.len(), 9);
        assert_eq!(m.primary_key, vec!["ticker", "date"]);
    }

    #[test]
    fn version_bump_is_incompatible() {
        let mut other = Manifest::current();
        other.format_version = 2;
        assert!(Manifest::current()
            .incompatibility(&other)
            .unwrap()
            .contains("format version"));
    }

    #[test]
    fn stored_frames_conform() {
        let df = stored_to_frame(&[]).unwrap();
        assert_eq!(Manifest::current().check_frame(&df), Ok(()));
    }

    #[test]
    fn wrong_volume_type_is_reported() {
        let mut df = stored_to_frame(&[]).unwrap();
        df.with_column(polars::prelude::Column::new(VOLUME.into(), Vec::<f64>::new()))
            .unwrap();
        let err = Manifest::current().check_frame(&df).unwrap_err();
        assert!(err.contains("volume"));
    }

    #[test]
    fn json_roundtrip() {
        let m = Manifest::current();
        let text = serde_json::to_string(&m).unwrap();
        assert!(text.contains("\"timestamp_ms\""));
        assert_eq!(serde_json::from_str::<Manifest>(&text).unwrap(), m);
    }
}
