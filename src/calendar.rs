//! Observation date ranges

use crate::error::{FxError, Result};
use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed range of calendar dates (start and end inclusive)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Create a range, rejecting start > end
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(FxError::InvalidDateRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Single-day range
    pub fn single(date: NaiveDate) -> Self {
        Self {
            start: date,
            end: date,
        }
    }

    /// January 1st of `today`'s year through `today`
    pub fn year_to_date(today: NaiveDate) -> Self {
        let start = NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today);
        Self { start, end: today }
    }

    /// The day before `today`, used by the scheduled daily run
    pub fn previous_day(today: NaiveDate) -> Self {
        Self::single(today - Duration::days(1))
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Number of calendar days in the range
    pub fn num_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.start, self.end)
    }
}

/// Parse an ISO `YYYY-MM-DD` date
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|e| FxError::ParseError(format!("Invalid date '{}': {}", s, e)))
}
