//! Embedded warehouse file (SQLite)
//!
//! Dimensions and facts are written with "insert, ignore on conflict" keyed on
//! natural keys, so loading the same batch twice leaves the warehouse unchanged.
//! An incoming rate for an already-stored (date, from, to) is discarded.

use super::schema::{
    validate_batch, CurrencyDimRow, DateDimRow, DIM_CURRENCY, DIM_DATE, FACT_FX_RATES, SQLITE_DDL,
};
use super::{LoadReport, WarehouseSink};
use crate::currency::{CurrencyCode, CurrencySet};
use crate::error::{FxError, Result};
use crate::triangulate::CrossRate;
use chrono::NaiveDate;
use hashbrown::HashMap;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use std::path::{Path, PathBuf};

/// Row counts of the three relations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TableCounts {
    pub currencies: usize,
    pub dates: usize,
    pub facts: usize,
}

/// Open a connection with foreign keys enforced
pub fn open_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)
        .map_err(|e| FxError::SinkError(format!("Failed to open database: {}", e)))?;
    conn.pragma_update(None, "foreign_keys", "ON")
        .map_err(|e| FxError::SinkError(format!("Failed to enable foreign keys: {}", e)))?;
    Ok(conn)
}

/// Create all relations; a no-op when they already exist
pub fn apply_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(SQLITE_DDL)
        .map_err(|e| FxError::SinkError(format!("Failed to create warehouse schema: {}", e)))
}

/// Count rows in each relation
pub fn table_counts(conn: &Connection) -> Result<TableCounts> {
    let count = |table: &str| -> Result<usize> {
        let n: i64 = conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))
            .map_err(|e| FxError::SinkError(format!("Failed to count {}: {}", table, e)))?;
        Ok(n as usize)
    };

    Ok(TableCounts {
        currencies: count(DIM_CURRENCY)?,
        dates: count(DIM_DATE)?,
        facts: count(FACT_FX_RATES)?,
    })
}

/// Local warehouse backed by a single database file
pub struct LocalSink {
    db_path: PathBuf,
    currencies: CurrencySet,
}

impl LocalSink {
    pub fn new(db_path: impl AsRef<Path>, currencies: CurrencySet) -> Self {
        Self {
            db_path: db_path.as_ref().to_path_buf(),
            currencies,
        }
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Current row counts of the warehouse file; fails if the file or schema is absent
    pub fn counts(&self) -> Result<TableCounts> {
        let conn = Connection::open_with_flags(&self.db_path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .map_err(|e| FxError::SinkError(format!("Failed to open database: {}", e)))?;
        table_counts(&conn)
    }

    fn upsert_currencies(conn: &Connection, rows: &[CurrencyDimRow]) -> Result<usize> {
        let mut stmt = conn
            .prepare_cached(
                "INSERT INTO dim_currency (currency_code, currency_name)
                 VALUES (?1, ?2)
                 ON CONFLICT (currency_code) DO NOTHING",
            )
            .map_err(|e| FxError::SinkError(format!("Failed to prepare currency upsert: {}", e)))?;

        let mut inserted = 0;
        for row in rows {
            inserted += stmt
                .execute(params![row.code.as_str(), &row.name])
                .map_err(|e| FxError::SinkError(format!("Failed to upsert currency {}: {}", row.code, e)))?;
        }
        Ok(inserted)
    }

    fn upsert_dates(conn: &Connection, rows: &[DateDimRow]) -> Result<usize> {
        let mut stmt = conn
            .prepare_cached(
                "INSERT INTO dim_date (full_date, year, month, quarter, day, is_weekend)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT (full_date) DO NOTHING",
            )
            .map_err(|e| FxError::SinkError(format!("Failed to prepare date upsert: {}", e)))?;

        let mut inserted = 0;
        for row in rows {
            inserted += stmt
                .execute(params![
                    row.full_date,
                    row.year,
                    row.month,
                    row.quarter,
                    row.day,
                    row.is_weekend,
                ])
                .map_err(|e| FxError::SinkError(format!("Failed to upsert date {}: {}", row.full_date, e)))?;
        }
        Ok(inserted)
    }

    /// Resolve currency codes to surrogate ids
    fn currency_ids(conn: &Connection) -> Result<HashMap<CurrencyCode, i64>> {
        let mut stmt = conn
            .prepare_cached("SELECT currency_code, currency_id FROM dim_currency")
            .map_err(|e| FxError::SinkError(format!("Failed to prepare currency lookup: {}", e)))?;

        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))
            .map_err(|e| FxError::SinkError(format!("Failed to query currency ids: {}", e)))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| FxError::SinkError(format!("Failed to collect currency ids: {}", e)))?;

        let mut ids = HashMap::with_capacity(rows.len());
        for (code, id) in rows {
            ids.insert(code.parse()?, id);
        }
        Ok(ids)
    }

    /// Resolve dates to surrogate ids
    fn date_ids(conn: &Connection, rows: &[DateDimRow]) -> Result<HashMap<NaiveDate, i64>> {
        let mut stmt = conn
            .prepare_cached("SELECT date_id FROM dim_date WHERE full_date = ?1")
            .map_err(|e| FxError::SinkError(format!("Failed to prepare date lookup: {}", e)))?;

        let mut ids = HashMap::with_capacity(rows.len());
        for row in rows {
            let id: Option<i64> = stmt
                .query_row(params![row.full_date], |r| r.get(0))
                .optional()
                .map_err(|e| FxError::SinkError(format!("Failed to look up date {}: {}", row.full_date, e)))?;
            let id = id.ok_or_else(|| FxError::MissingDimensionKey {
                table: DIM_DATE.to_string(),
                key: row.full_date.to_string(),
            })?;
            ids.insert(row.full_date, id);
        }
        Ok(ids)
    }

    /// Insert facts against resolved keys; returns (written, skipped)
    fn insert_facts(
        conn: &Connection,
        rates: &[CrossRate],
        currency_ids: &HashMap<CurrencyCode, i64>,
        date_ids: &HashMap<NaiveDate, i64>,
    ) -> Result<(usize, usize)> {
        let mut stmt = conn
            .prepare_cached(
                "INSERT INTO fact_fx_rates (date_id, from_currency_id, to_currency_id, rate)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (date_id, from_currency_id, to_currency_id) DO NOTHING",
            )
            .map_err(|e| FxError::SinkError(format!("Failed to prepare fact insert: {}", e)))?;

        let currency_id = |code: CurrencyCode| -> Result<i64> {
            currency_ids
                .get(&code)
                .copied()
                .ok_or_else(|| FxError::MissingDimensionKey {
                    table: DIM_CURRENCY.to_string(),
                    key: code.to_string(),
                })
        };

        let mut written = 0;
        for rate in rates {
            let date_id = date_ids
                .get(&rate.date)
                .copied()
                .ok_or_else(|| FxError::MissingDimensionKey {
                    table: DIM_DATE.to_string(),
                    key: rate.date.to_string(),
                })?;

            written += stmt
                .execute(params![date_id, currency_id(rate.from)?, currency_id(rate.to)?, rate.rate])
                .map_err(|e| {
                    FxError::SinkError(format!(
                        "Failed to insert {} on {}: {}",
                        rate.pair(),
                        rate.date,
                        e
                    ))
                })?;
        }

        Ok((written, rates.len() - written))
    }
}

impl WarehouseSink for LocalSink {
    fn name(&self) -> &str {
        "local"
    }

    fn ensure_schema(&self) -> Result<()> {
        let conn = open_connection(&self.db_path)?;
        apply_schema(&conn)
    }

    fn load(&self, rates: &[CrossRate]) -> Result<LoadReport> {
        validate_batch(rates, &self.currencies)?;

        log::info!("Connecting to warehouse at: {}", self.db_path.display());
        let mut conn = open_connection(&self.db_path)?;
        apply_schema(&conn)?;

        let tx = conn
            .transaction()
            .map_err(|e| FxError::SinkError(format!("Failed to begin transaction: {}", e)))?;

        let currency_rows = CurrencyDimRow::all(&self.currencies);
        let new_currencies = Self::upsert_currencies(&tx, &currency_rows)?;
        log::info!("{} loaded ({} currencies, {} new)", DIM_CURRENCY, currency_rows.len(), new_currencies);

        let date_rows = DateDimRow::for_batch(rates);
        let new_dates = Self::upsert_dates(&tx, &date_rows)?;
        log::info!("{} loaded ({} dates, {} new)", DIM_DATE, date_rows.len(), new_dates);

        let currency_ids = Self::currency_ids(&tx)?;
        let date_ids = Self::date_ids(&tx, &date_rows)?;
        let (written, skipped) = Self::insert_facts(&tx, rates, &currency_ids, &date_ids)?;

        tx.commit()
            .map_err(|e| FxError::SinkError(format!("Failed to commit load: {}", e)))?;

        if skipped > 0 {
            log::info!("{} rows already present - kept stored values", skipped);
        }
        log::info!("fact_fx_rates loaded ({} rows inserted)", written);

        Ok(LoadReport {
            currency_rows: currency_rows.len(),
            date_rows: date_rows.len(),
            facts_written: written,
            facts_skipped: skipped,
            partitions: Vec::new(),
        })
    }
}
