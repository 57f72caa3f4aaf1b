//! Upstream rate data
//!
//! - **source**: the `RateSource` trait plus in-memory and file replay sources
//! - **frankfurter**: ECB reference rates over HTTP (feature `async`)

pub mod frankfurter;
pub mod source;

#[cfg(feature = "async")]
pub use frankfurter::FrankfurterSource;
pub use source::{JsonFileRateSource, RateSource, RawRateSet, RawRates, StaticRateSource};
