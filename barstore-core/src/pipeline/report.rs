//! Outcome of one pipeline run.

use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Aggregate result of a run. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub processed: usize,
    pub failed: usize,
    pub rows_inserted: usize,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub duration_seconds: f64,
    pub total_tickers: usize,
}

impl RunReport {
    pub fn has_failures(&self) -> bool {
        self.failed > 0 || !self.errors.is_empty()
    }

    /// Tickers that were neither processed nor failed (no data, already up to date).
    pub fn skipped(&self) -> usize {
        self.total_tickers.saturating_sub(self.processed + self.failed)
    }

    pub fn log_summary(&self) {
        let rule = "=".repeat(50);
        tracing::info!("{rule}");
        tracing::info!("PIPELINE EXECUTION SUMMARY");
        tracing::info!("{rule}");
        tracing::info!("Duration: {:.2} seconds", self.duration_seconds);
        tracing::info!("Tickers processed: {}/{}", self.processed, self.total_tickers);
        tracing::info!("Tickers failed: {}", self.failed);
        tracing::info!("Total rows inserted: {}", self.rows_inserted);
        tracing::info!("Errors: {}", self.errors.len());
        tracing::info!("Warnings: {}", self.warnings.len());
        tracing::info!("{rule}");
    }
}

/// Accumulates per-ticker outcomes during a run.
#[derive(Debug)]
pub struct ReportBuilder {
    started: Instant,
    total_tickers: usize,
    processed: usize,
    failed: usize,
    rows_inserted: usize,
    errors: Vec<String>,
    warnings: Vec<String>,
}

impl ReportBuilder {
    pub fn new(total_tickers: usize) -> Self {
        Self {
            started: Instant::now(),
            total_tickers,
            processed: 0,
            failed: 0,
            rows_inserted: 0,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn warn(&mut self, message: String) {
        self.warnings.push(message);
    }

    /// Record an error and count the ticker as failed.
    pub fn fail(&mut self, message: String) {
        self.errors.push(message);
        self.failed += 1;
    }

    pub fn succeed(&mut self, rows_inserted: usize) {
        self.processed += 1;
        self.rows_inserted += rows_inserted;
    }

    pub fn finish(self) -> RunReport {
        RunReport {
            processed: self.processed,
            failed: self.failed,
            rows_inserted: self.rows_inserted,
            errors: self.errors,
            warnings: self.warnings,
            duration_seconds: self.started.elapsed().as_secs_f64(),
            total_tickers: self.total_tickers,
        }
    }
}
