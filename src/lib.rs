//! # fx_warehouse
//!
//! Daily FX rates into a star-schema warehouse.
//!
//! Base-relative reference rates are fetched for a date range, expanded into
//! every directed cross pair of a fixed currency set, and loaded idempotently
//! into either an embedded database file or Parquet partitions on an object store.
//!
//! ## Example
//!
//! ```rust,no_run
//! use fx_warehouse::prelude::*;
//!
//! # async fn run() -> fx_warehouse::error::Result<()> {
//! let config = PipelineConfig::default();
//! let currencies = config.currency_set()?;
//!
//! let source = FrankfurterSource::new(&config.source, currencies.clone())?;
//! let sink = open_sink(&config.sink, currencies)?;
//!
//! let today = chrono::Local::now().date_naive();
//! let summary = Orchestrator::new(&config, source, sink)?
//!     .run(DateRange::year_to_date(today))
//!     .await?;
//! println!("{} rows loaded", summary.load.facts_written);
//! # Ok(())
//! # }
//! ```

pub mod calendar;
pub mod config;
pub mod currency;
pub mod data;
pub mod error;
pub mod orchestrator;
pub mod triangulate;
pub mod warehouse;

pub mod prelude {
    //! Commonly used types and traits
    pub use crate::calendar::DateRange;
    pub use crate::config::{PipelineConfig, SinkConfig, SourceConfig};
    pub use crate::currency::{Currency, CurrencyCode, CurrencyPair, CurrencySet};
    #[cfg(feature = "async")]
    pub use crate::data::FrankfurterSource;
    pub use crate::data::{RateSource, RawRates, StaticRateSource};
    pub use crate::error::{FxError, Result};
    pub use crate::orchestrator::{Orchestrator, RunSummary};
    pub use crate::triangulate::{CrossRate, Triangulator};
    pub use crate::warehouse::{open_sink, LoadReport, WarehouseSink};
}
