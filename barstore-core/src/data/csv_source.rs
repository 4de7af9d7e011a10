//! Offline CSV price source.
//!
//! Reads `{dir}/{TICKER}.csv` as exported by Yahoo Finance
//! (`Date,Open,High,Low,Close,Adj Close,Volume`) or with canonical column names.
//! Column types are inferred the way a dataframe reader would: a column whose
//! non-empty cells all parse as numbers is numeric, anything else stays text.
//! Rows are restricted to the requested window when their date parses.

use super::frame::{canonical_name, parse_date, DATE, VOLUME};
use super::provider::{DataError, PriceSource};
use chrono::NaiveDate;
use polars::prelude::*;
use std::path::PathBuf;

pub struct CsvSource {
    dir: PathBuf,
}

impl CsvSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, ticker: &str) -> PathBuf {
        self.dir.join(format!("{ticker}.csv"))
    }
}

/// Infer a typed column from raw cells. Empty cells are nulls.
fn infer_column(name: &str, cells: &[Option<&str>]) -> Column {
    let is_volume = canonical_name(name) == Some(VOLUME);

    if is_volume {
        let ints: Option<Vec<Option<i64>>> = cells
            .iter()
            .map(|c| match c {
                None => Some(None),
                Some(s) => s.trim().parse::<i64>().ok().map(Some),
            })
            .collect();
        if let Some(values) = ints {
            return Column::new(name.into(), values);
        }
    }

    let floats: Option<Vec<Option<f64>>> = cells
        .iter()
        .map(|c| match c {
            None => Some(None),
            Some(s) => s.trim().parse::<f64>().ok().map(Some),
        })
        .collect();

    // Date columns stay text; normalization coerces them.
    let is_date = canonical_name(name) == Some(DATE);
    match floats {
        Some(values) if !is_date => Column::new(name.into(), values),
        _ => Column::new(
            name.into(),
            cells.iter().map(|c| c.map(str::to_string)).collect::<Vec<_>>(),
        ),
    }
}

impl PriceSource for CsvSource {
    fn name(&self) -> &str {
        "csv_import"
    }

    fn fetch(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Option<DataFrame>, DataError> {
        let path = self.path_for(ticker);
        if !path.is_file() {
            return Err(DataError::SymbolNotFound {
                symbol: ticker.to_string(),
            });
        }

        let mut reader = csv::Reader::from_path(&path)
            .map_err(|e| DataError::Csv(format!("{}: {e}", path.display())))?;
        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| DataError::Csv(format!("{}: {e}", path.display())))?
            .iter()
            .map(str::to_string)
            .collect();

        let date_idx = headers
            .iter()
            .position(|h| canonical_name(h) == Some(DATE));

        let mut records = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| DataError::Csv(format!("{}: {e}", path.display())))?;
            let in_window = date_idx
                .and_then(|i| record.get(i))
                .and_then(parse_date)
                .map_or(true, |d| d >= start && d <= end);
            if in_window {
                records.push(record);
            }
        }

        if records.is_empty() {
            return Ok(None);
        }

        let columns: Vec<Column> = headers
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let cells: Vec<Option<&str>> = records
                    .iter()
                    .map(|r| r.get(i).filter(|s| !s.trim().is_empty()))
                    .collect();
                infer_column(name, &cells)
            })
            .collect();

        let df = DataFrame::new(columns).map_err(|e| DataError::Frame(e.to_string()))?;
        Ok(Some(df))
    }
}
