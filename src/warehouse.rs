//! Star-schema warehouse
//!
//! Two interchangeable sinks implement the same load contract:
//!
//! - **sqlite**: a single embedded database file with surrogate keys
//! - **partitioned**: Parquet snapshots plus monthly fact partitions on an object store
//!
//! Both are idempotent: loading the same batch twice leaves the warehouse
//! in the same state as loading it once.

pub mod partitioned;
#[cfg(feature = "rusqlite-support")]
pub mod query;
pub mod schema;
#[cfg(feature = "rusqlite-support")]
pub mod sqlite;

pub use partitioned::{FsObjectStore, ObjectStore, PartitionedSink};
#[cfg(feature = "rusqlite-support")]
pub use query::{PairAverage, PairChange, WarehouseQueries};
pub use schema::{DateDimRow, PartitionKey};
#[cfg(feature = "rusqlite-support")]
pub use sqlite::{LocalSink, TableCounts};

use crate::config::SinkConfig;
use crate::currency::CurrencySet;
use crate::error::Result;
use crate::triangulate::CrossRate;

/// Outcome of one load call
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LoadReport {
    /// Currency dimension rows ensured
    pub currency_rows: usize,
    /// Distinct dates in the batch
    pub date_rows: usize,
    pub facts_written: usize,
    /// Facts already present (or duplicated within the batch) and left untouched
    pub facts_skipped: usize,
    /// Fact partitions rewritten; empty for the embedded sink
    pub partitions: Vec<PartitionKey>,
}

/// A physical warehouse backend
pub trait WarehouseSink: Send + Sync {
    /// Short backend name used in logs
    fn name(&self) -> &str;

    /// Create every relation if missing; safe to call repeatedly
    fn ensure_schema(&self) -> Result<()>;

    /// Upsert dimensions then insert facts; re-loading a batch never duplicates rows
    fn load(&self, rates: &[CrossRate]) -> Result<LoadReport>;
}

/// Build the sink selected by configuration
pub fn open_sink(config: &SinkConfig, currencies: CurrencySet) -> Result<Box<dyn WarehouseSink>> {
    match config {
        #[cfg(feature = "rusqlite-support")]
        SinkConfig::Local { db_path } => Ok(Box::new(LocalSink::new(db_path, currencies))),
        #[cfg(not(feature = "rusqlite-support"))]
        SinkConfig::Local { .. } => Err(crate::error::FxError::ConfigError(
            "Local sink requires the rusqlite-support feature".to_string(),
        )),
        SinkConfig::Partitioned { root, fact_table } => {
            Ok(Box::new(PartitionedSink::local(root, fact_table.clone(), currencies)))
        }
    }
}
