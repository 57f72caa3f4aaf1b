//! Rate source abstraction
//!
//! A rate source returns base-relative rates for a closed date range:
//! one [`RawRateSet`] per published trading date. Non-trading days are simply
//! absent from the result.

use super::frankfurter::parse_response;
use crate::calendar::DateRange;
use crate::currency::{CurrencyCode, CurrencySet};
use crate::error::{FxError, Result};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::future::Future;
use std::path::{Path, PathBuf};

/// Rates for one date: 1 unit of base = `rate` units of the currency
pub type RawRateSet = BTreeMap<CurrencyCode, f64>;

/// Raw rates for a range of dates
pub type RawRates = BTreeMap<NaiveDate, RawRateSet>;

/// Trait for upstream rate sources
pub trait RateSource: Send + Sync {
    /// Fetch base-relative rates for every published date in `range`
    fn fetch(&self, range: DateRange) -> impl Future<Output = Result<RawRates>> + Send;

    /// Get the source name
    fn name(&self) -> &str;
}

/// Keep only the dates inside `range`
pub(crate) fn restrict_to_range(rates: RawRates, range: DateRange) -> RawRates {
    rates
        .into_iter()
        .filter(|(date, _)| {
            let inside = range.contains(*date);
            if !inside {
                log::debug!("Dropping {} outside requested range {}", date, range);
            }
            inside
        })
        .collect()
}

/// In-memory rate source, used for fixtures and replays
#[derive(Debug, Clone, Default)]
pub struct StaticRateSource {
    rates: RawRates,
}

impl StaticRateSource {
    pub fn new(rates: RawRates) -> Self {
        Self { rates }
    }

    /// Build from string keys, e.g. `("2026-02-17", [("NOK", 11.74)])`
    pub fn from_pairs<'a, D, R>(days: D) -> Result<Self>
    where
        D: IntoIterator<Item = (&'a str, R)>,
        R: IntoIterator<Item = (&'a str, f64)>,
    {
        let mut rates = RawRates::new();
        for (date, day_rates) in days {
            let date = crate::calendar::parse_date(date)?;
            let mut set = RawRateSet::new();
            for (code, rate) in day_rates {
                set.insert(code.parse()?, rate);
            }
            rates.insert(date, set);
        }
        Ok(Self { rates })
    }

    /// Number of dates held
    pub fn num_dates(&self) -> usize {
        self.rates.len()
    }
}

impl RateSource for StaticRateSource {
    fn fetch(&self, range: DateRange) -> impl Future<Output = Result<RawRates>> + Send {
        let rates = restrict_to_range(self.rates.clone(), range);
        async move { Ok(rates) }
    }

    fn name(&self) -> &str {
        "static"
    }
}

/// Replays a saved provider response from disk
#[derive(Debug, Clone)]
pub struct JsonFileRateSource {
    path: PathBuf,
    currencies: CurrencySet,
}

impl JsonFileRateSource {
    pub fn new(path: impl AsRef<Path>, currencies: CurrencySet) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            currencies,
        }
    }

    fn read(&self, range: DateRange) -> Result<RawRates> {
        let body = std::fs::read_to_string(&self.path).map_err(|e| {
            FxError::SourceError(format!(
                "Failed to read rate file {}: {}",
                self.path.display(),
                e
            ))
        })?;
        parse_response(&body, &self.currencies, range)
    }
}

impl RateSource for JsonFileRateSource {
    fn fetch(&self, range: DateRange) -> impl Future<Output = Result<RawRates>> + Send {
        let result = self.read(range);
        async move { result }
    }

    fn name(&self) -> &str {
        "json-file"
    }
}
