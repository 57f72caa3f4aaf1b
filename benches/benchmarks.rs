use chrono::{Duration, NaiveDate};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use fx_warehouse::config::PipelineConfig;
use fx_warehouse::data::{RawRateSet, RawRates};
use fx_warehouse::triangulate::Triangulator;

fn raw_rates(days: i64) -> RawRates {
    let start = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
    let quotes = [
        ("NOK", 11.74),
        ("SEK", 11.23),
        ("PLN", 4.21),
        ("RON", 4.98),
        ("DKK", 7.46),
        ("CZK", 25.10),
    ];

    (0..days)
        .map(|i| {
            let drift = 1.0 + (i as f64) * 1e-4;
            let day: RawRateSet = quotes
                .iter()
                .map(|(code, rate)| (code.parse().unwrap(), rate * drift))
                .collect();
            (start + Duration::days(i), day)
        })
        .collect()
}

fn benchmark_triangulation(c: &mut Criterion) {
    let triangulator = Triangulator::new(PipelineConfig::default().currency_set().unwrap(), 6);
    let mut group = c.benchmark_group("triangulate");

    for days in [1, 60, 250] {
        let raw = raw_rates(days);
        group.bench_with_input(BenchmarkId::from_parameter(days), &raw, |b, raw| {
            b.iter(|| triangulator.triangulate(black_box(raw)))
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_triangulation);
criterion_main!(benches);
