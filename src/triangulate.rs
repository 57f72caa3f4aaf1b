//! Cross-rate triangulation
//!
//! Expands base-relative rates into every directed pair of the currency set:
//!
//! ```text
//! rate(A -> B) = rate(base -> B) / rate(base -> A)
//! ```
//!
//! The base is inserted into each day's table at 1.0, so pairs involving the
//! base go through the same formula.
//!
//! # Example
//!
//! ```rust
//! use fx_warehouse::config::PipelineConfig;
//! use fx_warehouse::triangulate::Triangulator;
//! use std::collections::BTreeMap;
//!
//! let currencies = PipelineConfig::default().currency_set().unwrap();
//! let triangulator = Triangulator::new(currencies, 6);
//!
//! let mut day = BTreeMap::new();
//! day.insert("NOK".parse().unwrap(), 11.74);
//! day.insert("SEK".parse().unwrap(), 11.23);
//! let mut raw = BTreeMap::new();
//! raw.insert(chrono::NaiveDate::from_ymd_opt(2026, 2, 17).unwrap(), day);
//!
//! // Only EUR, NOK and SEK are present: 3 x 2 pairs survive
//! let rates = triangulator.triangulate(&raw);
//! assert_eq!(rates.len(), 6);
//! ```

use crate::currency::{CurrencyCode, CurrencyPair, CurrencySet};
use crate::data::RawRates;
use chrono::NaiveDate;
use hashbrown::{HashMap, HashSet};
use serde::{Deserialize, Serialize};

/// A directed cross rate for one observation date
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CrossRate {
    pub date: NaiveDate,
    pub from: CurrencyCode,
    pub to: CurrencyCode,
    /// Units of `to` per one unit of `from`
    pub rate: f64,
}

impl CrossRate {
    pub fn pair(&self) -> CurrencyPair {
        CurrencyPair::new(self.from, self.to)
    }

    /// Natural key (date, from, to)
    pub fn key(&self) -> (NaiveDate, CurrencyCode, CurrencyCode) {
        (self.date, self.from, self.to)
    }
}

/// Summary of one triangulation call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TriangulationStats {
    pub records: usize,
    pub dates: usize,
    pub pairs_per_day: usize,
}

impl TriangulationStats {
    pub fn of(rates: &[CrossRate]) -> Self {
        let dates = rates.iter().map(|r| r.date).collect::<HashSet<_>>().len();
        Self {
            records: rates.len(),
            dates,
            pairs_per_day: if dates == 0 { 0 } else { rates.len() / dates },
        }
    }
}

/// Round to a fixed number of decimal places
pub fn round_to(value: f64, decimal_places: u32) -> f64 {
    let factor = 10f64.powi(decimal_places as i32);
    (value * factor).round() / factor
}

/// Stateless cross-rate calculator over a fixed currency set
#[derive(Debug, Clone)]
pub struct Triangulator {
    currencies: CurrencySet,
    decimal_places: u32,
}

impl Triangulator {
    pub fn new(currencies: CurrencySet, decimal_places: u32) -> Self {
        Self {
            currencies,
            decimal_places,
        }
    }

    /// Compute every directed pair for every date in `raw`.
    ///
    /// Output is sorted by (date, from, to). A pair is skipped, with a warning,
    /// when either side is missing from that date's table.
    pub fn triangulate(&self, raw: &RawRates) -> Vec<CrossRate> {
        let pairs = self.currencies.ordered_pairs();
        let mut out = Vec::with_capacity(raw.len() * pairs.len());

        for (&date, day) in raw {
            let table = self.rate_table(date, day);
            self.warn_missing(date, &table);

            for pair in &pairs {
                let (Some(&from_rate), Some(&to_rate)) = (table.get(&pair.from), table.get(&pair.to))
                else {
                    continue;
                };

                let rate = round_to(to_rate / from_rate, self.decimal_places);
                if !rate.is_finite() || rate <= 0.0 {
                    log::warn!(
                        "Cross rate {} on {} is not representable at {} dp ({}) - skipping",
                        pair,
                        date,
                        self.decimal_places,
                        rate
                    );
                    continue;
                }

                out.push(CrossRate {
                    date,
                    from: pair.from,
                    to: pair.to,
                    rate,
                });
            }
        }

        out.sort_by(|a, b| a.key().cmp(&b.key()));

        let stats = TriangulationStats::of(&out);
        log::info!(
            "Triangulation done | {} records | {} trading days | {} pairs per day",
            stats.records,
            stats.dates,
            stats.pairs_per_day
        );

        out
    }

    /// Complete table for one date: base at 1.0 plus usable supplied rates
    fn rate_table(&self, date: NaiveDate, day: &crate::data::RawRateSet) -> HashMap<CurrencyCode, f64> {
        let mut table = HashMap::with_capacity(self.currencies.len());
        table.insert(self.currencies.base(), 1.0);

        for (&code, &rate) in day {
            if code == self.currencies.base() {
                continue;
            }
            if !rate.is_finite() || rate <= 0.0 {
                log::warn!("Unusable rate for {} on {}: {} - treating as missing", code, date, rate);
                continue;
            }
            table.insert(code, rate);
        }

        table
    }

    /// Warn once per missing currency; returns the number of pairs lost for the date
    fn warn_missing(&self, date: NaiveDate, table: &HashMap<CurrencyCode, f64>) -> usize {
        let missing: Vec<CurrencyCode> = self
            .currencies
            .codes()
            .filter(|code| !table.contains_key(code))
            .collect();
        if missing.is_empty() {
            return 0;
        }

        let total = self.currencies.len();
        let present = total - missing.len();
        let skipped = total * (total - 1) - present * present.saturating_sub(1);

        for code in &missing {
            log::warn!("Missing rate for {} on {} - skipping its pairs", code, date);
        }
        log::warn!(
            "{} of {} pairs skipped on {} ({} currencies missing)",
            skipped,
            total * (total - 1),
            date,
            missing.len()
        );
        skipped
    }
}
