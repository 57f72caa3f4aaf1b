//! Pipeline orchestration: extract, triangulate, load

use crate::calendar::DateRange;
use crate::config::PipelineConfig;
use crate::data::RateSource;
use crate::error::Result;
use crate::triangulate::Triangulator;
use crate::warehouse::{LoadReport, WarehouseSink};
use std::time::{Duration, Instant};

/// Result of one pipeline run
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub range: DateRange,
    /// Trading dates returned by the source
    pub fetched_dates: usize,
    /// Cross-rate rows produced by triangulation
    pub rows: usize,
    pub elapsed: Duration,
    pub load: LoadReport,
}

/// Sequences a rate source, the triangulator and a warehouse sink
pub struct Orchestrator<S: RateSource> {
    source: S,
    sink: Box<dyn WarehouseSink>,
    triangulator: Triangulator,
}

impl<S: RateSource> Orchestrator<S> {
    /// Validate the configuration and wire up the stages
    pub fn new(config: &PipelineConfig, source: S, sink: Box<dyn WarehouseSink>) -> Result<Self> {
        config.validate()?;
        let triangulator = Triangulator::new(config.currency_set()?, config.decimal_places);
        Ok(Self {
            source,
            sink,
            triangulator,
        })
    }

    /// Run the pipeline once for `range`.
    ///
    /// Stage errors are returned unchanged; a re-run over the same range is safe.
    pub async fn run(&self, range: DateRange) -> Result<RunSummary> {
        let started = Instant::now();
        log::info!("FX pipeline starting | {} | source={}", range, self.source.name());

        log::info!("[1/3] Extracting");
        let raw = self.source.fetch(range).await?;

        log::info!("[2/3] Triangulating");
        let rates = self.triangulator.triangulate(&raw);

        log::info!("[3/3] Loading into {}", self.sink.name());
        self.sink.ensure_schema()?;
        let load = self.sink.load(&rates)?;

        let elapsed = started.elapsed();
        log::info!(
            "Pipeline complete in {:.2}s | {} rows ({} new)",
            elapsed.as_secs_f64(),
            rates.len(),
            load.facts_written
        );

        Ok(RunSummary {
            range,
            fetched_dates: raw.len(),
            rows: rates.len(),
            elapsed,
            load,
        })
    }
}
