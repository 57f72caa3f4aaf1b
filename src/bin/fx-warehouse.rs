//! fx-warehouse CLI - load daily FX cross rates into a star-schema warehouse
//!
//! ## Example Usage
//!
//! ```bash
//! # Year-to-date backfill into the local database
//! fx-warehouse run
//!
//! # Explicit range into Parquet partitions
//! fx-warehouse run --start 2026-01-01 --end 2026-02-27 --sink partitioned --output ./fx-data
//!
//! # Scheduled daily run (yesterday only)
//! fx-warehouse daily
//!
//! # Lookups
//! fx-warehouse query rate 2026-02-17 NOK/PLN
//! fx-warehouse query ytd-change EUR
//! ```

use anyhow::{bail, Context as _};
use chrono::{Datelike, Local, NaiveDate};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use fx_warehouse::calendar::{parse_date, DateRange};
use fx_warehouse::config::{PipelineConfig, SinkConfig};
use fx_warehouse::currency::{CurrencyCode, CurrencyPair};
use fx_warehouse::data::{FrankfurterSource, JsonFileRateSource, RateSource};
use fx_warehouse::orchestrator::{Orchestrator, RunSummary};
use fx_warehouse::triangulate::CrossRate;
use fx_warehouse::warehouse::{open_sink, WarehouseQueries};
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

/// fx-warehouse: daily FX cross rates into a star-schema warehouse
#[derive(Parser)]
#[command(name = "fx-warehouse")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Daily FX cross rates into a star-schema warehouse", long_about = None)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the configured sink
    #[arg(long, global = true, value_enum)]
    sink: Option<SinkKind>,

    /// Database file (local) or root directory (partitioned) for the sink
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum SinkKind {
    Local,
    Partitioned,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline for a date range (default: year to date)
    Run {
        /// Start date (YYYY-MM-DD)
        #[arg(short = 's', long)]
        start: Option<String>,

        /// End date (YYYY-MM-DD)
        #[arg(short = 'e', long)]
        end: Option<String>,

        /// Replay a saved provider response instead of calling the API
        #[arg(long)]
        input_json: Option<PathBuf>,
    },

    /// Run the pipeline for yesterday only
    Daily,

    /// Create the warehouse schema without loading anything
    Init,

    /// Query the local warehouse
    Query {
        #[command(subcommand)]
        action: QueryAction,
    },

    /// Show the effective configuration
    Info,
}

#[derive(Subcommand)]
enum QueryAction {
    /// Rate of one pair on one date
    Rate {
        #[arg(value_name = "DATE")]
        date: String,
        /// Pair as FROM/TO, e.g. NOK/PLN
        #[arg(value_name = "PAIR")]
        pair: String,
    },

    /// Every pair on one date
    Day {
        #[arg(value_name = "DATE")]
        date: String,
    },

    /// Latest available rates out of a currency
    Latest {
        #[arg(value_name = "FROM", default_value = "EUR")]
        from: String,
    },

    /// Year-to-date average rate out of a currency
    YtdAverage {
        #[arg(value_name = "FROM", default_value = "EUR")]
        from: String,
        /// Calendar year (default: current year)
        #[arg(short = 'y', long)]
        year: Option<i32>,
    },

    /// Year-to-date % change out of a currency
    YtdChange {
        #[arg(value_name = "FROM", default_value = "EUR")]
        from: String,
        #[arg(short = 'y', long)]
        year: Option<i32>,
    },

    /// Row counts per table
    Counts,
}

fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".fx-warehouse").join("config.toml"))
}

fn load_config(path: Option<&Path>) -> anyhow::Result<PipelineConfig> {
    let path = match path {
        Some(path) => Some(path.to_path_buf()),
        None => default_config_path().filter(|p| p.exists()),
    };

    let config = match path {
        Some(path) => {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            toml::from_str::<PipelineConfig>(&contents)
                .with_context(|| format!("Failed to parse config {}", path.display()))?
        }
        None => PipelineConfig::default(),
    };

    config.validate()?;
    Ok(config)
}

/// Apply `--sink` / `--output` on top of the file configuration
fn apply_sink_overrides(config: &mut PipelineConfig, kind: Option<SinkKind>, output: Option<PathBuf>) {
    let kind = kind.unwrap_or(match config.sink {
        SinkConfig::Local { .. } => SinkKind::Local,
        SinkConfig::Partitioned { .. } => SinkKind::Partitioned,
    });

    config.sink = match (kind, &config.sink) {
        (SinkKind::Local, SinkConfig::Local { db_path }) => SinkConfig::Local {
            db_path: output.unwrap_or_else(|| db_path.clone()),
        },
        (SinkKind::Local, _) => SinkConfig::Local {
            db_path: output.unwrap_or_else(|| PathBuf::from("fx_warehouse.db")),
        },
        (SinkKind::Partitioned, SinkConfig::Partitioned { root, fact_table }) => SinkConfig::Partitioned {
            root: output.unwrap_or_else(|| root.clone()),
            fact_table: fact_table.clone(),
        },
        (SinkKind::Partitioned, _) => SinkConfig::partitioned(output.unwrap_or_else(|| PathBuf::from("fx-data"))),
    };
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match load_config(cli.config.as_deref()) {
        Ok(mut config) => {
            apply_sink_overrides(&mut config, cli.sink, cli.output);
            dispatch(cli.command, config).await
        }
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        process::exit(1);
    }
}

async fn dispatch(command: Commands, config: PipelineConfig) -> anyhow::Result<()> {
    let today = Local::now().date_naive();

    match command {
        Commands::Run { start, end, input_json } => {
            let range = resolve_range(start.as_deref(), end.as_deref(), today)?;
            let currencies = config.currency_set()?;
            match input_json {
                Some(path) => run_pipeline(&config, JsonFileRateSource::new(path, currencies), range).await,
                None => {
                    let source = FrankfurterSource::new(&config.source, currencies)?;
                    run_pipeline(&config, source, range).await
                }
            }
        }
        Commands::Daily => {
            let source = FrankfurterSource::new(&config.source, config.currency_set()?)?;
            run_pipeline(&config, source, DateRange::previous_day(today)).await
        }
        Commands::Init => {
            let sink = open_sink(&config.sink, config.currency_set()?)?;
            sink.ensure_schema()?;
            println!("{} {} warehouse schema ready", "✓".green().bold(), sink.name());
            Ok(())
        }
        Commands::Query { action } => run_query(&config, action, today),
        Commands::Info => {
            show_info(&config);
            Ok(())
        }
    }
}

fn resolve_range(start: Option<&str>, end: Option<&str>, today: NaiveDate) -> anyhow::Result<DateRange> {
    let end = end.map(parse_date).transpose()?.unwrap_or(today);
    let start = match start {
        Some(s) => parse_date(s)?,
        None => DateRange::year_to_date(end).start(),
    };
    Ok(DateRange::new(start, end)?)
}

async fn run_pipeline<S: RateSource>(config: &PipelineConfig, source: S, range: DateRange) -> anyhow::Result<()> {
    let sink = open_sink(&config.sink, config.currency_set()?)?;
    let orchestrator = Orchestrator::new(config, source, sink)?;
    let summary = orchestrator.run(range).await?;
    print_summary(&summary);
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    println!();
    println!("{}", "Pipeline complete".green().bold());
    println!("  {} {}", "Range:".bold(), summary.range);
    println!("  {} {}", "Trading days:".bold(), summary.fetched_dates);
    println!("  {} {}", "Cross rates:".bold(), summary.rows);
    println!(
        "  {} {} written, {} already present",
        "Facts:".bold(),
        summary.load.facts_written,
        summary.load.facts_skipped
    );
    if !summary.load.partitions.is_empty() {
        let partitions: Vec<String> = summary.load.partitions.iter().map(|p| p.to_string()).collect();
        println!("  {} {}", "Partitions:".bold(), partitions.join(", "));
    }
    println!("  {} {:.2}s", "Elapsed:".bold(), summary.elapsed.as_secs_f64());
}

fn run_query(config: &PipelineConfig, action: QueryAction, today: NaiveDate) -> anyhow::Result<()> {
    let SinkConfig::Local { db_path } = &config.sink else {
        bail!("Queries are only supported on the local sink");
    };
    if !db_path.exists() {
        bail!("Warehouse not found: {}", db_path.display());
    }
    let queries = WarehouseQueries::open(db_path)?;

    match action {
        QueryAction::Rate { date, pair } => {
            let date = parse_date(&date)?;
            let pair = CurrencyPair::from_string(&pair)?;
            match queries.rate_on(date, pair.from, pair.to)? {
                Some(rate) => println!("{} {} {:.6}", date, pair.to_string().cyan(), rate),
                None => println!("{} {} on {}", "No rate for".yellow(), pair, date),
            }
        }
        QueryAction::Day { date } => {
            print_rates(&queries.rates_on(parse_date(&date)?)?);
        }
        QueryAction::Latest { from } => {
            let from: CurrencyCode = from.parse()?;
            print_rates(&queries.latest_rates_from(from)?);
        }
        QueryAction::YtdAverage { from, year } => {
            let year = year.unwrap_or_else(|| today.year());
            for avg in queries.ytd_average(year, from.parse()?)? {
                println!(
                    "{}/{}  {} -> {}  {:.6}",
                    avg.from, avg.to, avg.first_date, avg.last_date, avg.average
                );
            }
        }
        QueryAction::YtdChange { from, year } => {
            let year = year.unwrap_or_else(|| today.year());
            for change in queries.ytd_change(year, from.parse()?)? {
                let pct = format!("{:+.4}%", change.change_pct);
                let pct = if change.change_pct >= 0.0 { pct.green() } else { pct.red() };
                println!(
                    "{}/{}  {:.6} -> {:.6}  {}",
                    change.from, change.to, change.first_rate, change.last_rate, pct
                );
            }
        }
        QueryAction::Counts => {
            let counts = queries.table_counts()?;
            println!("  {} {}", "dim_currency:".bold(), counts.currencies);
            println!("  {} {}", "dim_date:".bold(), counts.dates);
            println!("  {} {}", "fact_fx_rates:".bold(), counts.facts);
        }
    }

    Ok(())
}

fn print_rates(rates: &[CrossRate]) {
    if rates.is_empty() {
        println!("{}", "No rates found".yellow());
        return;
    }
    for rate in rates {
        println!("{}  {}  {:.6}", rate.date, rate.pair().to_string().cyan(), rate.rate);
    }
}

fn show_info(config: &PipelineConfig) {
    println!("{} v{}", "fx-warehouse".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!();
    println!("{}", "Currencies:".bold());
    for currency in &config.currencies {
        let marker = if currency.code == config.base_currency { " (base)" } else { "" };
        println!("  {} {}{}", currency.code.to_string().cyan(), currency.name, marker.dimmed());
    }
    println!("  {} {}", "Decimal places:".bold(), config.decimal_places);
    println!();
    println!("{}", "Source:".bold());
    println!("  {} {}", "URL:".bold(), config.source.base_url);
    println!("  {} {}s", "Timeout:".bold(), config.source.timeout_secs);
    println!();
    println!("{}", "Sink:".bold());
    match &config.sink {
        SinkConfig::Local { db_path } => {
            println!("  {} local", "Kind:".bold());
            println!("  {} {}", "Database:".bold(), db_path.display());
        }
        SinkConfig::Partitioned { root, fact_table } => {
            println!("  {} partitioned", "Kind:".bold());
            println!("  {} {}", "Root:".bold(), root.display());
            println!("  {} {}", "Fact table:".bold(), fact_table);
        }
    }
    if let Some(path) = default_config_path() {
        println!();
        println!("  {} {}", "Default config:".bold(), path.display().to_string().dimmed());
    }
}
