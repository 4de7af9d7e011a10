//! Parquet store with one partition per ticker.
//!
//! Layout:
//! - `{root}/_schema.json` table manifest
//! - `{root}/ticker={TICKER}/prices.parquet` rows sorted by date
//! - `{root}/ticker={TICKER}/meta.json` date range, row count, last update, data hash
//!
//! Every file is written to `.tmp` and renamed into place, so a reader never
//! sees a half-written partition. A partition's Parquet file and sidecar are
//! both staged before either is committed, and the old sidecar is removed
//! first: a sidecar on disk always describes the Parquet file next to it.

use super::manifest::Manifest;
use super::{PriceStore, StoreError, TickerSummary};
use crate::data::frame::{frame_to_bars, frame_to_stored, stored_to_frame};
use crate::domain::{PriceBar, StoredBar};
use chrono::{NaiveDate, NaiveDateTime};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

const MANIFEST_FILE: &str = "_schema.json";
const PARTITION_FILE: &str = "prices.parquet";
const META_FILE: &str = "meta.json";
const PARTITION_PREFIX: &str = "ticker=";

/// Sidecar describing one ticker partition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartitionMeta {
    pub ticker: String,
    pub min_date: NaiveDate,
    pub max_date: NaiveDate,
    pub row_count: usize,
    pub last_updated: NaiveDateTime,
    pub data_hash: String,
}

impl PartitionMeta {
    fn overlaps(&self, start: NaiveDate, end: NaiveDate) -> bool {
        self.min_date <= end && self.max_date >= start
    }
}

pub struct ParquetStore {
    root: PathBuf,
    manifest: Manifest,
    connected: bool,
}

impl ParquetStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            manifest: Manifest::current(),
            connected: false,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn ensure_connected(&self) -> Result<(), StoreError> {
        if self.connected {
            Ok(())
        } else {
            Err(StoreError::NotConnected)
        }
    }

    fn partition_dir(&self, ticker: &str) -> Result<PathBuf, StoreError> {
        let invalid = ticker.is_empty()
            || ticker == "."
            || ticker == ".."
            || ticker.contains(['/', '\\'])
            || ticker.trim() != ticker;
        if invalid {
            return Err(StoreError::InvalidTicker(ticker.to_string()));
        }
        Ok(self.root.join(format!("{PARTITION_PREFIX}{ticker}")))
    }

    fn partition_path(&self, ticker: &str) -> Result<PathBuf, StoreError> {
        Ok(self.partition_dir(ticker)?.join(PARTITION_FILE))
    }

    fn meta_path(&self, ticker: &str) -> Result<PathBuf, StoreError> {
        Ok(self.partition_dir(ticker)?.join(META_FILE))
    }

    // ── Partition I/O ───────────────────────────────────────────────

    /// All stored rows for a ticker, sorted by date. Empty when the ticker is unknown.
    fn read_partition(&self, ticker: &str) -> Result<Vec<StoredBar>, StoreError> {
        let path = self.partition_path(ticker)?;
        if !path.exists() {
            return Ok(Vec::new());
        }

        let file = fs::File::open(&path).map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })?;
        let df = ParquetReader::new(file)
            .finish()
            .map_err(|source| StoreError::Parquet {
                path: path.clone(),
                source,
            })?;
        self.manifest
            .check_frame(&df)
            .map_err(|reason| StoreError::SchemaMismatch {
                path: path.clone(),
                reason,
            })?;

        let mut rows = frame_to_stored(&df)?;
        rows.sort_by_key(|r| r.bar.date);
        Ok(rows)
    }

    /// Replace a ticker's partition with `rows`. An empty set removes the partition.
    fn write_partition(&self, ticker: &str, mut rows: Vec<StoredBar>) -> Result<(), StoreError> {
        let dir = self.partition_dir(ticker)?;
        if rows.is_empty() {
            if dir.exists() {
                fs::remove_dir_all(&dir).map_err(|source| StoreError::Io { path: dir, source })?;
            }
            return Ok(());
        }

        fs::create_dir_all(&dir).map_err(|source| StoreError::Io {
            path: dir.clone(),
            source,
        })?;

        rows.sort_by_key(|r| r.bar.date);
        let mut df = stored_to_frame(&rows)?;
        let meta = partition_meta(ticker, &rows)?;
        let path = dir.join(PARTITION_FILE);
        let meta_path = dir.join(META_FILE);
        let json = serde_json::to_vec_pretty(&meta).map_err(|source| StoreError::Serialization {
            path: meta_path.clone(),
            source,
        })?;

        let staged_rows = stage(&path, |file| {
            ParquetWriter::new(file)
                .finish(&mut df)
                .map(|_| ())
                .map_err(|source| StoreError::Parquet {
                    path: path.clone(),
                    source,
                })
        })?;
        let staged_meta = match stage(&meta_path, |file| write_bytes(file, &json, &meta_path)) {
            Ok(staged) => staged,
            Err(e) => {
                let _ = fs::remove_file(&staged_rows);
                return Err(e);
            }
        };

        // Without a sidecar, readers rebuild metadata from the rows.
        if meta_path.exists() {
            if let Err(source) = fs::remove_file(&meta_path) {
                let _ = fs::remove_file(&staged_rows);
                let _ = fs::remove_file(&staged_meta);
                return Err(StoreError::Io {
                    path: meta_path,
                    source,
                });
            }
        }
        if let Err(e) = commit(&staged_rows, &path) {
            let _ = fs::remove_file(&staged_meta);
            return Err(e);
        }
        commit(&staged_meta, &meta_path)
    }

    /// Partition metadata, rebuilt from the rows when the sidecar is missing.
    pub fn partition_meta(&self, ticker: &str) -> Result<Option<PartitionMeta>, StoreError> {
        self.ensure_connected()?;
        self.load_meta(ticker)
    }

    fn load_meta(&self, ticker: &str) -> Result<Option<PartitionMeta>, StoreError> {
        let path = self.meta_path(ticker)?;
        if path.exists() {
            let text = fs::read_to_string(&path).map_err(|source| StoreError::Io {
                path: path.clone(),
                source,
            })?;
            let meta = serde_json::from_str(&text)
                .map_err(|source| StoreError::Serialization { path, source })?;
            return Ok(Some(meta));
        }

        let rows = self.read_partition(ticker)?;
        if rows.is_empty() {
            return Ok(None);
        }
        tracing::warn!(ticker, "partition metadata missing, rebuilt from rows");
        Ok(Some(partition_meta(ticker, &rows)?))
    }

    fn tickers(&self) -> Result<Vec<String>, StoreError> {
        let entries = fs::read_dir(&self.root).map_err(|source| StoreError::Io {
            path: self.root.clone(),
            source,
        })?;

        let mut tickers = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| StoreError::Io {
                path: self.root.clone(),
                source,
            })?;
            let name = entry.file_name();
            let Some(ticker) = name.to_str().and_then(|n| n.strip_prefix(PARTITION_PREFIX)) else {
                continue;
            };
            if entry.path().join(PARTITION_FILE).is_file() {
                tickers.push(ticker.to_string());
            }
        }
        tickers.sort();
        Ok(tickers)
    }
}

fn write_atomic(
    path: &Path,
    write: impl FnOnce(fs::File) -> Result<(), StoreError>,
) -> Result<(), StoreError> {
    let staged = stage(path, write)?;
    commit(&staged, path)
}

/// Write the full contents of `path` to a sibling `.tmp` file and return its path.
fn stage(
    path: &Path,
    write: impl FnOnce(fs::File) -> Result<(), StoreError>,
) -> Result<PathBuf, StoreError> {
    let tmp_path = path.with_extension(format!(
        "{}.tmp",
        path.extension().and_then(|e| e.to_str()).unwrap_or_default()
    ));
    let file = fs::File::create(&tmp_path).map_err(|source| StoreError::Io {
        path: tmp_path.clone(),
        source,
    })?;

    if let Err(e) = write(file) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e);
    }
    Ok(tmp_path)
}

fn commit(staged: &Path, path: &Path) -> Result<(), StoreError> {
    fs::rename(staged, path).map_err(|source| {
        let _ = fs::remove_file(staged);
        StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    })
}

fn write_bytes(mut file: fs::File, bytes: &[u8], path: &Path) -> Result<(), StoreError> {
    use std::io::Write;
    file.write_all(bytes).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Metadata for a non-empty, date-sorted partition.
fn partition_meta(ticker: &str, rows: &[StoredBar]) -> Result<PartitionMeta, StoreError> {
    let (Some(first), Some(last)) = (rows.first(), rows.last()) else {
        return Err(StoreError::InvalidTicker(ticker.to_string()));
    };
    let bars: Vec<&PriceBar> = rows.iter().map(|r| &r.bar).collect();
    let payload = serde_json::to_vec(&bars).map_err(|source| StoreError::Serialization {
        path: PathBuf::from(META_FILE),
        source,
    })?;

    Ok(PartitionMeta {
        ticker: ticker.to_string(),
        min_date: first.bar.date,
        max_date: last.bar.date,
        row_count: rows.len(),
        last_updated: rows
            .iter()
            .map(|r| r.created_at)
            .max()
            .unwrap_or(last.created_at),
        data_hash: blake3::hash(&payload).to_hex().to_string(),
    })
}

fn in_range(date: NaiveDate, start: Option<NaiveDate>, end: Option<NaiveDate>) -> bool {
    start.map_or(true, |s| date >= s) && end.map_or(true, |e| date <= e)
}

impl PriceStore for ParquetStore {
    fn connect(&mut self) -> Result<(), StoreError> {
        if self.connected {
            return Ok(());
        }

        fs::create_dir_all(&self.root).map_err(|source| StoreError::Io {
            path: self.root.clone(),
            source,
        })?;

        let path = self.root.join(MANIFEST_FILE);
        if path.exists() {
            let text = fs::read_to_string(&path).map_err(|source| StoreError::Io {
                path: path.clone(),
                source,
            })?;
            let on_disk: Manifest =
                serde_json::from_str(&text).map_err(|source| StoreError::Serialization {
                    path: path.clone(),
                    source,
                })?;
            if let Some(reason) = self.manifest.incompatibility(&on_disk) {
                return Err(StoreError::SchemaMismatch { path, reason });
            }
        } else {
            let json = serde_json::to_vec_pretty(&self.manifest).map_err(|source| {
                StoreError::Serialization {
                    path: path.clone(),
                    source,
                }
            })?;
            write_atomic(&path, |file| write_bytes(file, &json, &path))?;
            tracing::info!(root = %self.root.display(), "initialized price store");
        }

        self.connected = true;
        tracing::debug!(root = %self.root.display(), "store connected");
        Ok(())
    }

    fn close(&mut self) {
        if self.connected {
            self.connected = false;
            tracing::debug!(root = %self.root.display(), "store closed");
        }
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn last_date(&self, ticker: &str) -> Result<Option<NaiveDate>, StoreError> {
        self.ensure_connected()?;
        Ok(self.load_meta(ticker)?.map(|m| m.max_date))
    }

    fn upsert(&mut self, rows: &DataFrame) -> Result<usize, StoreError> {
        self.ensure_connected()?;
        if rows.height() == 0 {
            return Ok(0);
        }

        let mut batches: BTreeMap<String, Vec<PriceBar>> = BTreeMap::new();
        for bar in frame_to_bars(rows)? {
            batches.entry(bar.ticker.clone()).or_default().push(bar);
        }

        // Reject the whole batch before touching any partition.
        for (ticker, bars) in &batches {
            self.partition_dir(ticker)?;
            let mut seen = HashSet::with_capacity(bars.len());
            if let Some(dup) = bars.iter().find(|b| !seen.insert(b.date)) {
                return Err(StoreError::DuplicateKey {
                    ticker: ticker.clone(),
                    date: dup.date,
                });
            }
        }

        let created_at = chrono::Utc::now().naive_utc();
        let mut inserted = 0;
        for (ticker, bars) in batches {
            let (Some(min), Some(max)) = (
                bars.iter().map(|b| b.date).min(),
                bars.iter().map(|b| b.date).max(),
            ) else {
                continue;
            };

            let mut merged: Vec<StoredBar> = self
                .read_partition(&ticker)?
                .into_iter()
                .filter(|r| r.bar.date < min || r.bar.date > max)
                .collect();
            let replaced = self
                .load_meta(&ticker)?
                .map_or(0, |m| m.row_count.saturating_sub(merged.len()));

            let count = bars.len();
            merged.extend(bars.into_iter().map(|bar| StoredBar { bar, created_at }));
            self.write_partition(&ticker, merged)?;

            tracing::debug!(ticker, %min, %max, replaced, inserted = count, "upserted partition");
            inserted += count;
        }

        Ok(inserted)
    }

    fn available_tickers(&self) -> Result<Vec<String>, StoreError> {
        self.ensure_connected()?;
        self.tickers()
    }

    fn summary(&self) -> Result<Vec<TickerSummary>, StoreError> {
        self.ensure_connected()?;
        let mut out = Vec::new();
        for ticker in self.tickers()? {
            if let Some(meta) = self.load_meta(&ticker)? {
                out.push(TickerSummary {
                    ticker,
                    start_date: meta.min_date,
                    end_date: meta.max_date,
                    row_count: meta.row_count,
                    last_updated: meta.last_updated,
                });
            }
        }
        Ok(out)
    }

    fn query_ticker(
        &self,
        ticker: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<DataFrame, StoreError> {
        self.ensure_connected()?;
        let rows: Vec<StoredBar> = self
            .read_partition(ticker)?
            .into_iter()
            .filter(|r| in_range(r.bar.date, start, end))
            .collect();
        Ok(stored_to_frame(&rows)?)
    }

    fn query_date_range(&self, start: NaiveDate, end: NaiveDate) -> Result<DataFrame, StoreError> {
        self.ensure_connected()?;
        let mut rows = Vec::new();
        for ticker in self.tickers()? {
            let overlaps = self
                .load_meta(&ticker)?
                .is_some_and(|m| m.overlaps(start, end));
            if !overlaps {
                continue;
            }
            rows.extend(
                self.read_partition(&ticker)?
                    .into_iter()
                    .filter(|r| in_range(r.bar.date, Some(start), Some(end))),
            );
        }
        Ok(stored_to_frame(&rows)?)
    }

    fn delete_ticker(&mut self, ticker: &str) -> Result<usize, StoreError> {
        self.ensure_connected()?;
        let removed = self.load_meta(ticker)?.map_or(0, |m| m.row_count);
        self.write_partition(ticker, Vec::new())?;
        if removed > 0 {
            tracing::info!(ticker, removed, "deleted ticker");
        }
        Ok(removed)
    }
}

impl Drop for ParquetStore {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::frame::{bars_to_frame, date_values, f64_values, DATE, OPEN};

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn bar(ticker: &str, date: &str, close: f64) -> PriceBar {
        PriceBar {
            ticker: ticker.into(),
            date: d(date),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 1_000,
            adj_close: close,
        }
    }

    fn connected(root: &Path) -> ParquetStore {
        let mut store = ParquetStore::new(root);
        store.connect().unwrap();
        store
    }

    #[test]
    fn operations_require_connection() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = ParquetStore::new(tmp.path());
        store.close();

        assert!(matches!(store.last_date("SPY"), Err(StoreError::NotConnected)));
        assert!(matches!(store.available_tickers(), Err(StoreError::NotConnected)));
        let frame = bars_to_frame(&[bar("SPY", "2024-01-02", 1.0)]).unwrap();
        assert!(matches!(store.upsert(&frame), Err(StoreError::NotConnected)));
    }

    #[test]
    fn connect_is_idempotent_and_writes_manifest() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("db");
        let mut store = connected(&root);
        store.close();
        store.connect().unwrap();
        store.connect().unwrap();

        assert!(root.join(MANIFEST_FILE).is_file());
        drop(store);
        let mut reopened = ParquetStore::new(&root);
        reopened.connect().unwrap();
    }

    #[test]
    fn incompatible_manifest_refuses_to_connect() {
        let tmp = tempfile::tempdir().unwrap();
        let mut manifest = Manifest::current();
        manifest.format_version = 99;
        fs::write(
            tmp.path().join(MANIFEST_FILE),
            serde_json::to_string(&manifest).unwrap(),
        )
        .unwrap();

        let mut store = ParquetStore::new(tmp.path());
        assert!(matches!(store.connect(), Err(StoreError::SchemaMismatch { .. })));
        assert!(!store.is_connected());
    }

    #[test]
    fn upsert_then_query() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = connected(tmp.path());
        let frame = bars_to_frame(&[
            bar("SPY", "2024-01-03", 2.0),
            bar("SPY", "2024-01-02", 1.0),
            bar("QQQ", "2024-01-02", 5.0),
        ])
        .unwrap();

        assert_eq!(store.upsert(&frame).unwrap(), 3);
        assert_eq!(store.available_tickers().unwrap(), vec!["QQQ", "SPY"]);
        assert_eq!(store.last_date("SPY").unwrap(), Some(d("2024-01-03")));
        assert_eq!(store.last_date("IWM").unwrap(), None);

        let spy = store.query_ticker("SPY", None, None).unwrap();
        assert_eq!(
            date_values(&spy, DATE).unwrap(),
            vec![Some(d("2024-01-02")), Some(d("2024-01-03"))]
        );
        let bounded = store.query_ticker("SPY", Some(d("2024-01-03")), None).unwrap();
        assert_eq!(bounded.height(), 1);
    }

    #[test]
    fn upsert_replaces_overlapping_span() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = connected(tmp.path());
        let first = bars_to_frame(&[
            bar("SPY", "2024-01-02", 1.0),
            bar("SPY", "2024-01-03", 2.0),
            bar("SPY", "2024-01-04", 3.0),
        ])
        .unwrap();
        store.upsert(&first).unwrap();

        let revised = bars_to_frame(&[
            bar("SPY", "2024-01-03", 20.0),
            bar("SPY", "2024-01-05", 4.0),
        ])
        .unwrap();
        store.upsert(&revised).unwrap();

        let spy = store.query_ticker("SPY", None, None).unwrap();
        assert_eq!(spy.height(), 3);
        assert_eq!(
            f64_values(&spy, OPEN).unwrap(),
            vec![Some(1.0), Some(20.0), Some(4.0)]
        );
    }

    #[test]
    fn duplicate_keys_reject_whole_batch() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = connected(tmp.path());
        let frame = bars_to_frame(&[
            bar("QQQ", "2024-01-02", 1.0),
            bar("SPY", "2024-01-02", 1.0),
            bar("SPY", "2024-01-02", 1.5),
        ])
        .unwrap();

        assert!(matches!(
            store.upsert(&frame),
            Err(StoreError::DuplicateKey { ref ticker, .. }) if ticker == "SPY"
        ));
        assert!(store.available_tickers().unwrap().is_empty());
    }

    #[test]
    fn path_like_tickers_are_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = connected(tmp.path());
        assert!(matches!(store.last_date("../etc"), Err(StoreError::InvalidTicker(_))));
        let frame = bars_to_frame(&[bar("A/B", "2024-01-02", 1.0)]).unwrap();
        assert!(matches!(store.upsert(&frame), Err(StoreError::InvalidTicker(_))));
    }

    #[test]
    fn summary_and_meta_sidecar() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = connected(tmp.path());
        let rows = bars_to_frame(&[
            bar("SPY", "2024-01-02", 1.0),
            bar("SPY", "2024-01-05", 2.0),
        ])
        .unwrap();
        store.upsert(&rows).unwrap();

        let summary = store.summary().unwrap();
        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0].start_date, d("2024-01-02"));
        assert_eq!(summary[0].end_date, d("2024-01-05"));
        assert_eq!(summary[0].row_count, 2);

        let meta = store.partition_meta("SPY").unwrap().unwrap();
        assert_eq!(meta.data_hash.len(), 64);
    }

    #[test]
    fn missing_sidecar_is_rebuilt() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = connected(tmp.path());
        store
            .upsert(&bars_to_frame(&[bar("SPY", "2024-01-02", 1.0)]).unwrap())
            .unwrap();
        let before = store.partition_meta("SPY").unwrap().unwrap();

        fs::remove_file(tmp.path().join("ticker=SPY").join(META_FILE)).unwrap();

        let after = store.partition_meta("SPY").unwrap().unwrap();
        assert_eq!(after.data_hash, before.data_hash);
        assert_eq!(after.max_date, d("2024-01-02"));
    }

    #[test]
    fn failed_sidecar_write_leaves_partition_unchanged() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = connected(tmp.path());
        let first = bars_to_frame(&[bar("SPY", "2024-01-02", 1.0)]).unwrap();
        store.upsert(&first).unwrap();
        let before = store.partition_meta("SPY").unwrap().unwrap();

        // A directory where the staged sidecar goes makes staging it fail.
        let partition = tmp.path().join("ticker=SPY");
        fs::create_dir(partition.join("meta.json.tmp")).unwrap();

        let later = bars_to_frame(&[bar("SPY", "2024-01-09", 2.0)]).unwrap();
        assert!(matches!(store.upsert(&later), Err(StoreError::Io { .. })));

        assert_eq!(store.last_date("SPY").unwrap(), Some(d("2024-01-02")));
        assert_eq!(store.partition_meta("SPY").unwrap().unwrap(), before);
        assert_eq!(store.query_ticker("SPY", None, None).unwrap().height(), 1);
        assert!(!partition.join("prices.parquet.tmp").exists());
    }

    #[test]
    fn corrupt_partition_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = connected(tmp.path());
        store
            .upsert(&bars_to_frame(&[bar("SPY", "2024-01-02", 1.0)]).unwrap())
            .unwrap();
        fs::write(tmp.path().join("ticker=SPY").join(PARTITION_FILE), b"not parquet").unwrap();

        assert!(matches!(
            store.query_ticker("SPY", None, None),
            Err(StoreError::Parquet { .. })
        ));
    }

    #[test]
    fn date_range_spans_tickers_in_order() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = connected(tmp.path());
        store
            .upsert(
                &bars_to_frame(&[
                    bar("SPY", "2024-01-02", 1.0),
                    bar("SPY", "2024-03-01", 2.0),
                    bar("AAPL", "2024-01-03", 3.0),
                    bar("OLD", "2020-01-02", 4.0),
                ])
                .unwrap(),
            )
            .unwrap();

        let df = store.query_date_range(d("2024-01-01"), d("2024-01-31")).unwrap();
        let tickers = crate::data::frame::str_values(&df, "ticker").unwrap();
        assert_eq!(tickers, vec![Some("AAPL".to_string()), Some("SPY".to_string())]);
    }

    #[test]
    fn delete_ticker_removes_partition() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = connected(tmp.path());
        let rows = bars_to_frame(&[
            bar("SPY", "2024-01-02", 1.0),
            bar("SPY", "2024-01-03", 1.0),
        ])
        .unwrap();
        store.upsert(&rows).unwrap();

        assert_eq!(store.delete_ticker("SPY").unwrap(), 2);
        assert_eq!(store.delete_ticker("SPY").unwrap(), 0);
        assert!(store.available_tickers().unwrap().is_empty());
        assert_eq!(store.query_ticker("SPY", None, None).unwrap().height(), 0);
    }
}
