//! Triangulation scenarios and properties over the default currency set

mod common;

use approx::assert_relative_eq;
use common::{code, currencies, date, two_day_raw};
use fx_warehouse::data::{RawRateSet, RawRates};
use fx_warehouse::triangulate::{round_to, CrossRate, TriangulationStats, Triangulator};
use proptest::prelude::*;

fn triangulator() -> Triangulator {
    Triangulator::new(currencies(), 6)
}

fn find(rates: &[CrossRate], from: &str, to: &str) -> f64 {
    rates
        .iter()
        .find(|r| r.from == code(from) && r.to == code(to))
        .map(|r| r.rate)
        .unwrap()
}

#[test]
fn test_full_day_has_every_pair() {
    let rates = triangulator().triangulate(&two_day_raw());
    assert_eq!(rates.len(), 84);

    let stats = TriangulationStats::of(&rates);
    assert_eq!(stats.dates, 2);
    assert_eq!(stats.pairs_per_day, 42);
}

#[test]
fn test_known_cross_rates() {
    let mut raw = two_day_raw();
    raw.retain(|d, _| *d == date(2026, 2, 17));
    let rates = triangulator().triangulate(&raw);

    assert_relative_eq!(find(&rates, "NOK", "SEK"), 0.956559, epsilon = 1e-9);
    assert_relative_eq!(find(&rates, "NOK", "PLN"), round_to(4.21 / 11.74, 6), epsilon = 1e-12);
    assert_relative_eq!(find(&rates, "EUR", "CZK"), 25.10, epsilon = 1e-12);
    assert_relative_eq!(find(&rates, "CZK", "EUR"), round_to(1.0 / 25.10, 6), epsilon = 1e-12);
}

#[test]
fn test_missing_quote_drops_only_its_pairs() {
    let mut raw = two_day_raw();
    raw.get_mut(&date(2026, 2, 18)).unwrap().remove(&code("RON"));

    let rates = triangulator().triangulate(&raw);
    let second_day: Vec<_> = rates.iter().filter(|r| r.date == date(2026, 2, 18)).collect();

    // 6 currencies left: 6 x 5
    assert_eq!(second_day.len(), 30);
    assert!(second_day.iter().all(|r| r.from != code("RON") && r.to != code("RON")));
    assert_eq!(rates.len(), 42 + 30);
}

#[test]
fn test_only_base_quoted_yields_nothing() {
    let mut raw = RawRates::new();
    raw.insert(date(2026, 2, 17), RawRateSet::new());
    assert!(triangulator().triangulate(&raw).is_empty());
}

#[test]
fn test_rerun_is_deterministic() {
    let t = triangulator();
    assert_eq!(t.triangulate(&two_day_raw()), t.triangulate(&two_day_raw()));
}

fn raw_day() -> impl Strategy<Value = RawRateSet> {
    prop::collection::vec(0.05f64..50.0, 6).prop_map(|values| {
        ["NOK", "SEK", "PLN", "RON", "DKK", "CZK"]
            .iter()
            .zip(values)
            .map(|(c, v)| (code(c), v))
            .collect()
    })
}

fn raw_rates() -> impl Strategy<Value = RawRates> {
    prop::collection::btree_map(0u32..365, raw_day(), 0..5).prop_map(|days| {
        days.into_iter()
            .map(|(offset, day)| (date(2026, 1, 1) + chrono::Duration::days(offset as i64), day))
            .collect()
    })
}

proptest! {
    #[test]
    fn prop_pair_count_and_ordering(raw in raw_rates()) {
        let rates = triangulator().triangulate(&raw);
        prop_assert_eq!(rates.len(), raw.len() * 42);
        prop_assert!(rates.windows(2).all(|w| w[0].key() < w[1].key()));
    }

    #[test]
    fn prop_rates_are_positive_and_never_self(raw in raw_rates()) {
        for rate in triangulator().triangulate(&raw) {
            prop_assert!(rate.rate > 0.0);
            prop_assert_ne!(rate.from, rate.to);
        }
    }

    #[test]
    fn prop_base_pairs_echo_input(raw in raw_rates()) {
        let rates = triangulator().triangulate(&raw);
        for (d, day) in &raw {
            for (c, value) in day {
                let out = rates
                    .iter()
                    .find(|r| r.date == *d && r.from == code("EUR") && r.to == *c)
                    .map(|r| r.rate);
                prop_assert_eq!(out, Some(round_to(*value, 6)));
            }
        }
    }

    #[test]
    fn prop_inverse_pairs_multiply_to_one(raw in raw_rates()) {
        let rates = triangulator().triangulate(&raw);
        for rate in &rates {
            let inverse = rates
                .iter()
                .find(|r| r.date == rate.date && r.from == rate.to && r.to == rate.from)
                .map(|r| r.rate);
            prop_assert!(inverse.is_some());
            let product = rate.rate * inverse.unwrap_or(0.0);
            prop_assert!((product - 1.0).abs() < 1e-3, "product {} for {}", product, rate.pair());
        }
    }
}
