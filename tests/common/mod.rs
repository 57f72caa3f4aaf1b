//! Shared fixtures for integration tests

#![allow(dead_code)]

use chrono::NaiveDate;
use fx_warehouse::calendar::DateRange;
use fx_warehouse::config::PipelineConfig;
use fx_warehouse::currency::{CurrencyCode, CurrencySet};
use fx_warehouse::data::{RawRates, StaticRateSource};

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn code(s: &str) -> CurrencyCode {
    s.parse().unwrap()
}

pub fn currencies() -> CurrencySet {
    PipelineConfig::default().currency_set().unwrap()
}

/// Two ECB business days with every default currency quoted
pub fn two_day_source() -> StaticRateSource {
    StaticRateSource::from_pairs([
        (
            "2026-02-17",
            vec![
                ("NOK", 11.74),
                ("SEK", 11.23),
                ("PLN", 4.21),
                ("RON", 4.98),
                ("DKK", 7.46),
                ("CZK", 25.10),
            ],
        ),
        (
            "2026-02-18",
            vec![
                ("NOK", 11.76),
                ("SEK", 11.25),
                ("PLN", 4.22),
                ("RON", 4.97),
                ("DKK", 7.46),
                ("CZK", 25.12),
            ],
        ),
    ])
    .unwrap()
}

pub fn two_day_range() -> DateRange {
    DateRange::new(date(2026, 2, 17), date(2026, 2, 18)).unwrap()
}

/// Same quotes as `two_day_source` as a raw map
pub fn two_day_raw() -> RawRates {
    let mut raw = RawRates::new();
    for (d, quotes) in [
        (
            date(2026, 2, 17),
            [("NOK", 11.74), ("SEK", 11.23), ("PLN", 4.21), ("RON", 4.98), ("DKK", 7.46), ("CZK", 25.10)],
        ),
        (
            date(2026, 2, 18),
            [("NOK", 11.76), ("SEK", 11.25), ("PLN", 4.22), ("RON", 4.97), ("DKK", 7.46), ("CZK", 25.12)],
        ),
    ] {
        raw.insert(d, quotes.iter().map(|(c, r)| (code(c), *r)).collect());
    }
    raw
}
