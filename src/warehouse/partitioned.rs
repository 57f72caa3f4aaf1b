//! Partitioned columnar warehouse
//!
//! Layout under the store root:
//!
//! ```text
//! dim/dim_currency.parquet                          full snapshot, overwritten
//! dim/dim_date.parquet                              full snapshot, overwritten
//! fact/<fact_table>/year=YYYY/month=MM/data.parquet one file per month
//! ```
//!
//! Facts carry the natural keys (`full_date`, `from_currency_code`,
//! `to_currency_code`) plus `year`/`month` for partition pruning. A month's
//! partition is replaced wholesale whenever the batch touches that month.

use super::schema::{
    validate_batch, CurrencyDimRow, DateDimRow, PartitionKey, DIM_CURRENCY, DIM_DATE,
};
use super::{LoadReport, WarehouseSink};
use crate::currency::CurrencySet;
use crate::error::{FxError, Result};
use crate::triangulate::CrossRate;
use chrono::NaiveDate;
use polars::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

/// Minimal blob store: whole-object put/get keyed by `/`-separated paths
pub trait ObjectStore: Send + Sync {
    /// Create the container (root) if it does not exist
    fn ensure_container(&self) -> Result<()>;

    /// Write an object, replacing any previous content
    fn put(&self, key: &str, bytes: &[u8]) -> Result<()>;

    /// Read an object; `None` if absent
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// All object keys under a prefix, sorted
    fn list(&self, prefix: &str) -> Result<Vec<String>>;
}

/// Object store on the local filesystem
#[derive(Debug, Clone)]
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty() || key.split('/').any(|part| part.is_empty() || part == "..") {
            return Err(FxError::SinkError(format!("Invalid object key: '{}'", key)));
        }
        Ok(key.split('/').fold(self.root.clone(), |path, part| path.join(part)))
    }

    fn collect_keys(&self, dir: &Path, keys: &mut Vec<String>) -> Result<()> {
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_dir() {
                self.collect_keys(&path, keys)?;
            } else if path.extension().map_or(true, |ext| ext != "tmp") {
                let relative = path
                    .strip_prefix(&self.root)
                    .map_err(|e| FxError::SinkError(format!("Failed to list objects: {}", e)))?;
                let key = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                keys.push(key);
            }
        }
        Ok(())
    }
}

impl ObjectStore for FsObjectStore {
    fn ensure_container(&self) -> Result<()> {
        fs::create_dir_all(&self.root)?;
        Ok(())
    }

    fn put(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Readers only ever see the old or the new object
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(key)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        if self.root.is_dir() {
            self.collect_keys(&self.root, &mut keys)?;
        }
        keys.retain(|k| k.starts_with(prefix));
        keys.sort();
        Ok(keys)
    }
}

pub const DIM_CURRENCY_KEY: &str = "dim/dim_currency.parquet";
pub const DIM_DATE_KEY: &str = "dim/dim_date.parquet";

/// Object key of one fact partition
pub fn fact_partition_key(fact_table: &str, partition: PartitionKey) -> String {
    format!("fact/{}/{}/data.parquet", fact_table, partition)
}

fn to_parquet(df: &mut DataFrame) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    ParquetWriter::new(&mut buf).finish(df)?;
    Ok(buf)
}

fn from_parquet(bytes: Vec<u8>) -> Result<DataFrame> {
    Ok(ParquetReader::new(Cursor::new(bytes)).finish()?)
}

fn currency_frame(rows: &[CurrencyDimRow]) -> Result<DataFrame> {
    let codes: Vec<&str> = rows.iter().map(|r| r.code.as_str()).collect();
    let names: Vec<&str> = rows.iter().map(|r| r.name.as_str()).collect();
    Ok(DataFrame::new(vec![
        Series::new("currency_code", codes),
        Series::new("currency_name", names),
    ])?)
}

fn date_frame(rows: &[DateDimRow]) -> Result<DataFrame> {
    let dates: Vec<NaiveDate> = rows.iter().map(|r| r.full_date).collect();
    Ok(DataFrame::new(vec![
        Series::new("full_date", dates),
        Series::new("year", rows.iter().map(|r| r.year).collect::<Vec<_>>()),
        Series::new("month", rows.iter().map(|r| r.month).collect::<Vec<_>>()),
        Series::new("quarter", rows.iter().map(|r| r.quarter).collect::<Vec<_>>()),
        Series::new("day", rows.iter().map(|r| r.day).collect::<Vec<_>>()),
        Series::new("is_weekend", rows.iter().map(|r| r.is_weekend).collect::<Vec<_>>()),
    ])?)
}

fn fact_frame(partition: PartitionKey, rates: &[CrossRate]) -> Result<DataFrame> {
    let dates: Vec<NaiveDate> = rates.iter().map(|r| r.date).collect();
    let from: Vec<&str> = rates.iter().map(|r| r.from.as_str()).collect();
    let to: Vec<&str> = rates.iter().map(|r| r.to.as_str()).collect();
    let values: Vec<f64> = rates.iter().map(|r| r.rate).collect();
    Ok(DataFrame::new(vec![
        Series::new("full_date", dates),
        Series::new("from_currency_code", from),
        Series::new("to_currency_code", to),
        Series::new("rate", values),
        Series::new("year", vec![partition.year; rates.len()]),
        Series::new("month", vec![partition.month; rates.len()]),
    ])?)
}

/// Dates of a date-dimension or fact frame
fn frame_dates(df: &DataFrame) -> Result<Vec<NaiveDate>> {
    Ok(df
        .column("full_date")?
        .date()?
        .as_date_iter()
        .flatten()
        .collect())
}

/// Decode a fact partition back into cross rates
pub fn read_fact_frame(df: &DataFrame) -> Result<Vec<CrossRate>> {
    let dates = df.column("full_date")?.date()?.as_date_iter();
    let from_codes = df.column("from_currency_code")?.str()?;
    let to_codes = df.column("to_currency_code")?.str()?;
    let values = df.column("rate")?.f64()?;

    let rows = dates
        .zip(from_codes.into_iter())
        .zip(to_codes.into_iter())
        .zip(values.into_iter());

    let mut out = Vec::with_capacity(df.height());
    for (((date, from), to), rate) in rows {
        match (date, from, to, rate) {
            (Some(date), Some(from), Some(to), Some(rate)) => out.push(CrossRate {
                date,
                from: from.parse()?,
                to: to.parse()?,
                rate,
            }),
            _ => {
                return Err(FxError::SinkError(
                    "Null value in fact partition".to_string(),
                ))
            }
        }
    }
    Ok(out)
}

/// Warehouse of Parquet files on an object store
pub struct PartitionedSink<S: ObjectStore> {
    store: S,
    fact_table: String,
    currencies: CurrencySet,
}

impl PartitionedSink<FsObjectStore> {
    /// Sink rooted at a local directory
    pub fn local(root: impl AsRef<Path>, fact_table: impl Into<String>, currencies: CurrencySet) -> Self {
        Self::new(FsObjectStore::new(root), fact_table, currencies)
    }
}

impl<S: ObjectStore> PartitionedSink<S> {
    pub fn new(store: S, fact_table: impl Into<String>, currencies: CurrencySet) -> Self {
        Self {
            store,
            fact_table: fact_table.into(),
            currencies,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Fact partitions currently present, sorted
    pub fn partitions(&self) -> Result<Vec<PartitionKey>> {
        let prefix = format!("fact/{}/", self.fact_table);
        let mut keys = Vec::new();
        for object in self.store.list(&prefix)? {
            if let Some(key) = parse_partition(&object[prefix.len()..]) {
                keys.push(key);
            }
        }
        Ok(keys)
    }

    /// Read one fact partition; empty if absent
    pub fn read_partition(&self, partition: PartitionKey) -> Result<Vec<CrossRate>> {
        match self.store.get(&fact_partition_key(&self.fact_table, partition))? {
            Some(bytes) => read_fact_frame(&from_parquet(bytes)?),
            None => Ok(Vec::new()),
        }
    }

    /// Dates in the stored date dimension snapshot
    pub fn stored_dates(&self) -> Result<Vec<NaiveDate>> {
        match self.store.get(DIM_DATE_KEY)? {
            Some(bytes) => frame_dates(&from_parquet(bytes)?),
            None => Ok(Vec::new()),
        }
    }

    fn put_frame(&self, key: &str, mut df: DataFrame) -> Result<()> {
        let bytes = to_parquet(&mut df)?;
        self.store.put(key, &bytes)?;
        log::info!("Uploaded {:<55} ({} rows)", key, df.height());
        Ok(())
    }
}

/// Parse `year=YYYY/month=MM/data.parquet`
fn parse_partition(rest: &str) -> Option<PartitionKey> {
    let mut parts = rest.split('/');
    let year = parts.next()?.strip_prefix("year=")?.parse().ok()?;
    let month = parts.next()?.strip_prefix("month=")?.parse().ok()?;
    if parts.next()? != "data.parquet" || parts.next().is_some() {
        return None;
    }
    Some(PartitionKey { year, month })
}

impl<S: ObjectStore> WarehouseSink for PartitionedSink<S> {
    fn name(&self) -> &str {
        "partitioned"
    }

    fn ensure_schema(&self) -> Result<()> {
        self.store.ensure_container()
    }

    fn load(&self, rates: &[CrossRate]) -> Result<LoadReport> {
        validate_batch(rates, &self.currencies)?;
        self.store.ensure_container()?;

        let currency_rows = CurrencyDimRow::all(&self.currencies);
        self.put_frame(DIM_CURRENCY_KEY, currency_frame(&currency_rows)?)?;
        log::debug!("{} snapshot written", DIM_CURRENCY);

        let batch_dates = DateDimRow::for_batch(rates);
        if !batch_dates.is_empty() {
            let all_dates: BTreeSet<NaiveDate> = self
                .stored_dates()?
                .into_iter()
                .chain(batch_dates.iter().map(|r| r.full_date))
                .collect();
            let rows: Vec<DateDimRow> = all_dates.into_iter().map(DateDimRow::from_date).collect();
            self.put_frame(DIM_DATE_KEY, date_frame(&rows)?)?;
            log::debug!("{} snapshot written ({} dates)", DIM_DATE, rows.len());
        }

        let mut by_partition: BTreeMap<PartitionKey, Vec<CrossRate>> = BTreeMap::new();
        for rate in rates {
            by_partition.entry(PartitionKey::of(rate.date)).or_default().push(*rate);
        }

        let mut partitions = Vec::with_capacity(by_partition.len());
        let mut written = 0;
        for (partition, mut group) in by_partition {
            group.sort_by(|a, b| a.key().cmp(&b.key()));
            group.dedup_by(|a, b| a.key() == b.key());
            written += group.len();
            self.put_frame(
                &fact_partition_key(&self.fact_table, partition),
                fact_frame(partition, &group)?,
            )?;
            partitions.push(partition);
        }

        log::info!("Partitioned load complete ({} partitions)", partitions.len());

        Ok(LoadReport {
            currency_rows: currency_rows.len(),
            date_rows: batch_dates.len(),
            facts_written: written,
            facts_skipped: rates.len() - written,
            partitions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_partition() {
        assert_eq!(
            parse_partition("year=2026/month=02/data.parquet"),
            Some(PartitionKey { year: 2026, month: 2 })
        );
        assert_eq!(parse_partition("year=2026/month=02/other.parquet"), None);
        assert_eq!(parse_partition("year=2026/data.parquet"), None);
        assert_eq!(parse_partition("month=02/year=2026/data.parquet"), None);
    }

    #[test]
    fn test_fact_partition_key() {
        let key = fact_partition_key("fact_fx_rates", PartitionKey { year: 2026, month: 1 });
        assert_eq!(key, "fact/fact_fx_rates/year=2026/month=01/data.parquet");
    }

    #[test]
    fn test_fs_store_put_get_list() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsObjectStore::new(dir.path().join("fx-data"));
        store.ensure_container().unwrap();

        store.put("dim/a.parquet", b"one").unwrap();
        store.put("fact/t/year=2026/month=01/data.parquet", b"two").unwrap();
        store.put("dim/a.parquet", b"three").unwrap();

        assert_eq!(store.get("dim/a.parquet").unwrap(), Some(b"three".to_vec()));
        assert_eq!(store.get("dim/missing.parquet").unwrap(), None);
        assert_eq!(store.list("dim/").unwrap(), vec!["dim/a.parquet".to_string()]);
        assert_eq!(store.list("").unwrap().len(), 2);
    }

    #[test]
    fn test_fs_store_rejects_escaping_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsObjectStore::new(dir.path());
        assert!(store.put("../outside", b"x").is_err());
        assert!(store.put("a//b", b"x").is_err());
        assert!(store.get("").is_err());
    }

    #[test]
    fn test_list_on_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsObjectStore::new(dir.path().join("absent"));
        assert!(store.list("").unwrap().is_empty());
    }
}
