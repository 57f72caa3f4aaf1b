//! End-to-end runs with in-memory and replayed sources

mod common;

use common::{currencies, date, two_day_range, two_day_source};
use fx_warehouse::calendar::DateRange;
use fx_warehouse::config::{PipelineConfig, SinkConfig};
use fx_warehouse::data::{JsonFileRateSource, StaticRateSource};
use fx_warehouse::error::FxError;
use fx_warehouse::orchestrator::Orchestrator;
use fx_warehouse::warehouse::open_sink;
use tempfile::TempDir;

fn local_config(dir: &TempDir) -> PipelineConfig {
    PipelineConfig {
        sink: SinkConfig::Local {
            db_path: dir.path().join("fx_warehouse.db"),
        },
        ..PipelineConfig::default()
    }
}

#[cfg(feature = "rusqlite-support")]
#[tokio::test]
async fn test_local_run_twice() {
    use fx_warehouse::warehouse::WarehouseQueries;

    let dir = TempDir::new().unwrap();
    let config = local_config(&dir);

    let sink = open_sink(&config.sink, currencies()).unwrap();
    let first = Orchestrator::new(&config, two_day_source(), sink)
        .unwrap()
        .run(two_day_range())
        .await
        .unwrap();
    assert_eq!(first.fetched_dates, 2);
    assert_eq!(first.rows, 84);
    assert_eq!(first.load.facts_written, 84);

    let sink = open_sink(&config.sink, currencies()).unwrap();
    let second = Orchestrator::new(&config, two_day_source(), sink)
        .unwrap()
        .run(two_day_range())
        .await
        .unwrap();
    assert_eq!(second.load.facts_written, 0);
    assert_eq!(second.load.facts_skipped, 84);

    let db_path = dir.path().join("fx_warehouse.db");
    let counts = WarehouseQueries::open(&db_path).unwrap().table_counts().unwrap();
    assert_eq!((counts.currencies, counts.dates, counts.facts), (7, 2, 84));
}

#[tokio::test]
async fn test_partitioned_run() {
    let dir = TempDir::new().unwrap();
    let config = PipelineConfig {
        sink: SinkConfig::partitioned(dir.path().join("fx-data")),
        ..PipelineConfig::default()
    };

    let sink = open_sink(&config.sink, currencies()).unwrap();
    let summary = Orchestrator::new(&config, two_day_source(), sink)
        .unwrap()
        .run(two_day_range())
        .await
        .unwrap();

    assert_eq!(summary.rows, 84);
    assert_eq!(summary.load.partitions.len(), 1);
    assert!(dir
        .path()
        .join("fx-data/fact/fact_fx_rates/year=2026/month=02/data.parquet")
        .is_file());
}

#[tokio::test]
async fn test_weekend_range_loads_nothing() {
    let dir = TempDir::new().unwrap();
    let config = PipelineConfig {
        sink: SinkConfig::partitioned(dir.path().join("fx-data")),
        ..PipelineConfig::default()
    };

    // 2026-02-21 is a Saturday
    let sink = open_sink(&config.sink, currencies()).unwrap();
    let summary = Orchestrator::new(&config, two_day_source(), sink)
        .unwrap()
        .run(DateRange::single(date(2026, 2, 21)))
        .await
        .unwrap();

    assert_eq!(summary.fetched_dates, 0);
    assert_eq!(summary.rows, 0);
    assert!(summary.load.partitions.is_empty());
}

#[tokio::test]
async fn test_replayed_response() {
    let dir = TempDir::new().unwrap();
    let body = dir.path().join("response.json");
    std::fs::write(
        &body,
        r#"{"amount":1.0,"base":"EUR","start_date":"2026-02-16","end_date":"2026-02-17",
            "rates":{
              "2026-02-16":{"NOK":11.70,"SEK":11.20,"PLN":4.20,"RON":4.98,"DKK":7.46,"CZK":25.05},
              "2026-02-17":{"NOK":11.74,"SEK":11.23,"PLN":4.21,"RON":4.98,"DKK":7.46,"CZK":25.10}
            }}"#,
    )
    .unwrap();

    let config = PipelineConfig {
        sink: SinkConfig::partitioned(dir.path().join("fx-data")),
        ..PipelineConfig::default()
    };
    let source = JsonFileRateSource::new(&body, currencies());
    let sink = open_sink(&config.sink, currencies()).unwrap();

    // Provider snapped the start back a day; only the requested day is kept
    let summary = Orchestrator::new(&config, source, sink)
        .unwrap()
        .run(DateRange::single(date(2026, 2, 17)))
        .await
        .unwrap();

    assert_eq!(summary.fetched_dates, 1);
    assert_eq!(summary.rows, 42);
}

#[cfg(feature = "rusqlite-support")]
#[tokio::test]
async fn test_source_error_is_returned_unchanged() {
    let dir = TempDir::new().unwrap();
    let config = local_config(&dir);
    let source = JsonFileRateSource::new(dir.path().join("missing.json"), currencies());
    let sink = open_sink(&config.sink, currencies()).unwrap();

    let result = Orchestrator::new(&config, source, sink)
        .unwrap()
        .run(two_day_range())
        .await;
    assert!(matches!(result, Err(FxError::SourceError(_))));
    assert!(!dir.path().join("fx_warehouse.db").exists());
}

#[tokio::test]
async fn test_empty_source() {
    let dir = TempDir::new().unwrap();
    let config = PipelineConfig {
        sink: SinkConfig::partitioned(dir.path().join("fx-data")),
        ..PipelineConfig::default()
    };
    let sink = open_sink(&config.sink, currencies()).unwrap();

    let summary = Orchestrator::new(&config, StaticRateSource::default(), sink)
        .unwrap()
        .run(two_day_range())
        .await
        .unwrap();
    assert_eq!(summary.rows, 0);
    assert_eq!(summary.load.facts_written, 0);
}
