//! Barstore Core: incremental daily OHLCV ingestion into a columnar store.
//!
//! This crate contains the whole ingestion pipeline:
//! - Domain types (price bars, stored bars, ticker normalization)
//! - Price sources (Yahoo Finance, CSV import) behind a retrying fetch client
//! - Row-set validation (schema pass, quality pass, row filtering)
//! - Parquet store with per-ticker partitions and span-replacing upserts
//! - Pipeline orchestrator with per-ticker failure isolation and run reports
//! - Configuration and tracing setup

pub mod config;
pub mod data;
pub mod domain;
pub mod logging;
pub mod pipeline;
pub mod store;
pub mod validate;

pub use config::PipelineConfig;
pub use pipeline::{run_pipeline, Pipeline, PipelineError, RunReport, RunRequest};
pub use store::{ParquetStore, PriceStore, StoreError, StoreSession};
pub use validate::{Validation, Validator};
