//! Row-set validation: a structural schema pass followed by a content quality pass.

pub mod quality;
pub mod schema;

pub use quality::{filter_invalid_rows, QualityWarning};
pub use schema::SchemaError;

use crate::config::ValidationConfig;
use crate::data::frame::FrameError;
use polars::prelude::DataFrame;
use serde::Serialize;

/// Outcome of validating one row set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Validation {
    pub schema_errors: Vec<SchemaError>,
    pub quality_warnings: Vec<QualityWarning>,
}

impl Validation {
    /// True only when the schema passed and no quality warning was raised.
    pub fn is_valid(&self) -> bool {
        self.schema_errors.is_empty() && self.quality_warnings.is_empty()
    }

    pub fn schema_passed(&self) -> bool {
        self.schema_errors.is_empty()
    }

    pub fn schema_messages(&self) -> Vec<String> {
        self.schema_errors.iter().map(ToString::to_string).collect()
    }

    pub fn warning_messages(&self) -> Vec<String> {
        self.quality_warnings.iter().map(ToString::to_string).collect()
    }
}

/// Serializable view used by JSON output.
#[derive(Debug, Serialize)]
struct ValidationView {
    valid: bool,
    schema_errors: Vec<String>,
    quality_warnings: Vec<String>,
}

impl Serialize for Validation {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        ValidationView {
            valid: self.is_valid(),
            schema_errors: self.schema_messages(),
            quality_warnings: self.warning_messages(),
        }
        .serialize(serializer)
    }
}

#[derive(Debug, Clone)]
pub struct Validator {
    config: ValidationConfig,
}

impl Validator {
    pub fn new(config: &ValidationConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    pub fn validate_schema(&self, df: &DataFrame) -> Vec<SchemaError> {
        schema::check(df, &self.config.required_columns)
    }

    pub fn validate_quality(&self, df: &DataFrame) -> Result<Vec<QualityWarning>, FrameError> {
        quality::check(
            df,
            &self.config.required_columns,
            self.config.min_data_points,
            self.config.max_gap_days,
        )
    }

    /// Run both passes. The quality pass only runs when the schema passed.
    pub fn validate(&self, df: &DataFrame) -> Validation {
        let schema_errors = self.validate_schema(df);
        if !schema_errors.is_empty() {
            return Validation {
                schema_errors,
                quality_warnings: Vec::new(),
            };
        }

        match self.validate_quality(df) {
            Ok(quality_warnings) => Validation {
                schema_errors,
                quality_warnings,
            },
            Err(e) => Validation {
                schema_errors: vec![SchemaError::Unreadable(e.to_string())],
                quality_warnings: Vec::new(),
            },
        }
    }

    pub fn filter_invalid_rows(&self, df: &DataFrame) -> Result<DataFrame, FrameError> {
        quality::filter_invalid_rows(df)
    }
}
