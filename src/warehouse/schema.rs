//! Star-schema definition shared by every sink
//!
//! ```text
//!     dim_currency          dim_date
//!     -------------         ----------
//!     currency_id (PK)      date_id (PK)
//!     currency_code (UQ)    full_date (UQ)
//!     currency_name         year, month, quarter, day, is_weekend
//!
//!                fact_fx_rates
//!                ------------------------------
//!                rate_id (PK)
//!                date_id          -> dim_date
//!                from_currency_id -> dim_currency
//!                to_currency_id   -> dim_currency
//!                rate, created_at
//!                UQ (date_id, from_currency_id, to_currency_id)
//! ```
//!
//! File-based sinks have no sequences, so they carry the natural keys
//! (currency code, full date) in place of the surrogate ids.

use crate::currency::{CurrencyCode, CurrencySet};
use crate::error::{FxError, Result};
use crate::triangulate::CrossRate;
use chrono::{Datelike, NaiveDate, Weekday};
use std::collections::BTreeSet;
use std::fmt;

pub const DIM_CURRENCY: &str = "dim_currency";
pub const DIM_DATE: &str = "dim_date";
pub const FACT_FX_RATES: &str = "fact_fx_rates";

/// Idempotent DDL for the embedded database
pub const SQLITE_DDL: &str = "
CREATE TABLE IF NOT EXISTS dim_currency (
    currency_id   INTEGER PRIMARY KEY,
    currency_code TEXT    NOT NULL UNIQUE CHECK (length(currency_code) = 3),
    currency_name TEXT    NOT NULL CHECK (length(currency_name) > 0)
);

CREATE TABLE IF NOT EXISTS dim_date (
    date_id    INTEGER PRIMARY KEY,
    full_date  TEXT    NOT NULL UNIQUE,
    year       INTEGER NOT NULL,
    month      INTEGER NOT NULL CHECK (month BETWEEN 1 AND 12),
    quarter    INTEGER NOT NULL CHECK (quarter BETWEEN 1 AND 4),
    day        INTEGER NOT NULL CHECK (day BETWEEN 1 AND 31),
    is_weekend INTEGER NOT NULL CHECK (is_weekend IN (0, 1))
);

CREATE INDEX IF NOT EXISTS idx_dim_date_year_month ON dim_date(year, month);

CREATE TABLE IF NOT EXISTS fact_fx_rates (
    rate_id          INTEGER PRIMARY KEY,
    date_id          INTEGER NOT NULL REFERENCES dim_date(date_id),
    from_currency_id INTEGER NOT NULL REFERENCES dim_currency(currency_id),
    to_currency_id   INTEGER NOT NULL REFERENCES dim_currency(currency_id),
    rate             REAL    NOT NULL CHECK (rate > 0),
    created_at       TEXT    NOT NULL DEFAULT CURRENT_TIMESTAMP,
    UNIQUE (date_id, from_currency_id, to_currency_id),
    CHECK (from_currency_id <> to_currency_id)
);
";

/// One row of the currency dimension
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrencyDimRow {
    pub code: CurrencyCode,
    pub name: String,
}

impl CurrencyDimRow {
    /// Dimension rows for the whole configured set, in configured order
    pub fn all(currencies: &CurrencySet) -> Vec<Self> {
        currencies
            .currencies()
            .iter()
            .map(|c| Self {
                code: c.code,
                name: c.name.clone(),
            })
            .collect()
    }
}

/// One row of the date dimension; attributes are pure functions of the date
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct DateDimRow {
    pub full_date: NaiveDate,
    pub year: i32,
    pub month: u32,
    pub quarter: u32,
    pub day: u32,
    pub is_weekend: bool,
}

impl DateDimRow {
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            full_date: date,
            year: date.year(),
            month: date.month(),
            quarter: (date.month() - 1) / 3 + 1,
            day: date.day(),
            is_weekend: matches!(date.weekday(), Weekday::Sat | Weekday::Sun),
        }
    }

    /// Sorted, de-duplicated rows for every date present in a fact batch
    pub fn for_batch(rates: &[CrossRate]) -> Vec<Self> {
        rates
            .iter()
            .map(|r| r.date)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(Self::from_date)
            .collect()
    }
}

/// Hive-style monthly partition of the fact table
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PartitionKey {
    pub year: i32,
    pub month: u32,
}

impl PartitionKey {
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "year={}/month={:02}", self.year, self.month)
    }
}

/// Check every fact row against the schema constraints before any write
pub fn validate_batch(rates: &[CrossRate], currencies: &CurrencySet) -> Result<()> {
    for rate in rates {
        if rate.from == rate.to {
            return Err(FxError::ConstraintViolation(format!(
                "Self pair {} on {}",
                rate.pair(),
                rate.date
            )));
        }
        if !rate.rate.is_finite() || rate.rate <= 0.0 {
            return Err(FxError::ConstraintViolation(format!(
                "Rate for {} on {} must be positive, got {}",
                rate.pair(),
                rate.date,
                rate.rate
            )));
        }
        for code in [rate.from, rate.to] {
            if !currencies.contains(code) {
                return Err(FxError::ConstraintViolation(format!(
                    "Currency {} on {} is not in {}",
                    code, rate.date, DIM_CURRENCY
                )));
            }
        }
    }
    Ok(())
}
