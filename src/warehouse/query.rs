//! Read-side lookups over the embedded warehouse

use super::sqlite::{table_counts, TableCounts};
use crate::currency::CurrencyCode;
use crate::error::{FxError, Result};
use crate::triangulate::{round_to, CrossRate};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension, Row};
use std::path::Path;

const FACT_JOIN: &str = "
    FROM fact_fx_rates f
    JOIN dim_date     d  ON d.date_id      = f.date_id
    JOIN dim_currency fc ON fc.currency_id = f.from_currency_id
    JOIN dim_currency tc ON tc.currency_id = f.to_currency_id";

/// Average rate of one pair over a year
#[derive(Debug, Clone, PartialEq)]
pub struct PairAverage {
    pub from: CurrencyCode,
    pub to: CurrencyCode,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
    pub average: f64,
}

/// Change of one pair between the first and last loaded day of a year
#[derive(Debug, Clone, PartialEq)]
pub struct PairChange {
    pub from: CurrencyCode,
    pub to: CurrencyCode,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
    pub first_rate: f64,
    pub last_rate: f64,
    /// Percent change, rounded to 4 dp
    pub change_pct: f64,
}

/// Read-only connection to a warehouse file
pub struct WarehouseQueries {
    conn: Connection,
}

fn parse_code(s: String) -> Result<CurrencyCode> {
    s.parse()
}

fn cross_rate(row: &Row<'_>) -> rusqlite::Result<(NaiveDate, String, String, f64)> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

impl WarehouseQueries {
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let path = db_path.as_ref();
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .map_err(|e| FxError::SinkError(format!("Failed to open {} read-only: {}", path.display(), e)))?;
        Ok(Self { conn })
    }

    fn collect_rates(&self, sql: &str, args: impl rusqlite::Params) -> Result<Vec<CrossRate>> {
        let mut stmt = self
            .conn
            .prepare(sql)
            .map_err(|e| FxError::SinkError(format!("Failed to prepare query: {}", e)))?;

        let rows = stmt
            .query_map(args, cross_rate)
            .map_err(|e| FxError::SinkError(format!("Failed to query rates: {}", e)))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| FxError::SinkError(format!("Failed to read rates: {}", e)))?;

        rows.into_iter()
            .map(|(date, from, to, rate)| {
                Ok(CrossRate {
                    date,
                    from: parse_code(from)?,
                    to: parse_code(to)?,
                    rate,
                })
            })
            .collect()
    }

    /// Rate of one pair on one date
    pub fn rate_on(&self, date: NaiveDate, from: CurrencyCode, to: CurrencyCode) -> Result<Option<f64>> {
        let sql = format!(
            "SELECT f.rate {} WHERE d.full_date = ?1 AND fc.currency_code = ?2 AND tc.currency_code = ?3",
            FACT_JOIN
        );
        self.conn
            .query_row(&sql, params![date, from.as_str(), to.as_str()], |row| row.get(0))
            .optional()
            .map_err(|e| FxError::SinkError(format!("Failed to look up {}/{} on {}: {}", from, to, date, e)))
    }

    /// Every pair on one date, ordered by (from, to)
    pub fn rates_on(&self, date: NaiveDate) -> Result<Vec<CrossRate>> {
        let sql = format!(
            "SELECT d.full_date, fc.currency_code, tc.currency_code, f.rate {}
             WHERE d.full_date = ?1
             ORDER BY fc.currency_code, tc.currency_code",
            FACT_JOIN
        );
        self.collect_rates(&sql, params![date])
    }

    /// Most recent loaded date, if any
    pub fn latest_date(&self) -> Result<Option<NaiveDate>> {
        self.conn
            .query_row("SELECT MAX(full_date) FROM dim_date", [], |row| row.get(0))
            .map_err(|e| FxError::SinkError(format!("Failed to read latest date: {}", e)))
    }

    /// Rates out of `from` on the most recent loaded date
    pub fn latest_rates_from(&self, from: CurrencyCode) -> Result<Vec<CrossRate>> {
        let sql = format!(
            "SELECT d.full_date, fc.currency_code, tc.currency_code, f.rate {}
             WHERE d.full_date = (SELECT MAX(full_date) FROM dim_date)
               AND fc.currency_code = ?1
             ORDER BY tc.currency_code",
            FACT_JOIN
        );
        self.collect_rates(&sql, params![from.as_str()])
    }

    /// Average rate per pair out of `from` for one calendar year
    pub fn ytd_average(&self, year: i32, from: CurrencyCode) -> Result<Vec<PairAverage>> {
        let sql = format!(
            "SELECT fc.currency_code, tc.currency_code, MIN(d.full_date), MAX(d.full_date), AVG(f.rate) {}
             WHERE d.year = ?1 AND fc.currency_code = ?2
             GROUP BY fc.currency_code, tc.currency_code
             ORDER BY tc.currency_code",
            FACT_JOIN
        );
        let mut stmt = self
            .conn
            .prepare(&sql)
            .map_err(|e| FxError::SinkError(format!("Failed to prepare YTD average: {}", e)))?;

        let rows = stmt
            .query_map(params![year, from.as_str()], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, NaiveDate>(2)?,
                    row.get::<_, NaiveDate>(3)?,
                    row.get::<_, f64>(4)?,
                ))
            })
            .map_err(|e| FxError::SinkError(format!("Failed to query YTD average: {}", e)))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| FxError::SinkError(format!("Failed to read YTD average: {}", e)))?;

        rows.into_iter()
            .map(|(from, to, first_date, last_date, avg)| {
                Ok(PairAverage {
                    from: parse_code(from)?,
                    to: parse_code(to)?,
                    first_date,
                    last_date,
                    average: round_to(avg, 6),
                })
            })
            .collect()
    }

    /// Percent change per pair out of `from` between the first and last loaded day of `year`
    pub fn ytd_change(&self, year: i32, from: CurrencyCode) -> Result<Vec<PairChange>> {
        let bounds: (Option<NaiveDate>, Option<NaiveDate>) = self
            .conn
            .query_row(
                "SELECT MIN(full_date), MAX(full_date) FROM dim_date WHERE year = ?1",
                params![year],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .map_err(|e| FxError::SinkError(format!("Failed to read year bounds: {}", e)))?;

        let (Some(first_date), Some(last_date)) = bounds else {
            return Ok(Vec::new());
        };

        let first = self.rates_on(first_date)?;
        let last = self.rates_on(last_date)?;

        let changes = first
            .iter()
            .filter(|r| r.from == from)
            .filter_map(|start| {
                last.iter()
                    .find(|end| end.from == start.from && end.to == start.to)
                    .map(|end| PairChange {
                        from: start.from,
                        to: start.to,
                        first_date,
                        last_date,
                        first_rate: start.rate,
                        last_rate: end.rate,
                        change_pct: round_to((end.rate - start.rate) / start.rate * 100.0, 4),
                    })
            })
            .collect();

        Ok(changes)
    }

    pub fn table_counts(&self) -> Result<TableCounts> {
        table_counts(&self.conn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::warehouse::{LocalSink, WarehouseSink};
    use approx::assert_relative_eq;

    fn code(s: &str) -> CurrencyCode {
        s.parse().unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn rate(d: NaiveDate, from: &str, to: &str, value: f64) -> CrossRate {
        CrossRate {
            date: d,
            from: code(from),
            to: code(to),
            rate: value,
        }
    }

    fn seeded(dir: &tempfile::TempDir) -> WarehouseQueries {
        let path = dir.path().join("q.db");
        let sink = LocalSink::new(&path, PipelineConfig::default().currency_set().unwrap());
        sink.load(&[
            rate(date(2026, 1, 2), "EUR", "NOK", 11.50),
            rate(date(2026, 1, 2), "EUR", "SEK", 11.00),
            rate(date(2026, 1, 2), "NOK", "EUR", 0.086957),
            rate(date(2026, 2, 17), "EUR", "NOK", 11.74),
            rate(date(2026, 2, 17), "EUR", "SEK", 11.23),
            rate(date(2026, 2, 17), "NOK", "EUR", 0.085179),
        ])
        .unwrap();
        WarehouseQueries::open(&path).unwrap()
    }

    #[test]
    fn test_rate_on() {
        let dir = tempfile::tempdir().unwrap();
        let q = seeded(&dir);
        assert_eq!(q.rate_on(date(2026, 2, 17), code("EUR"), code("NOK")).unwrap(), Some(11.74));
        assert_eq!(q.rate_on(date(2026, 2, 18), code("EUR"), code("NOK")).unwrap(), None);
    }

    #[test]
    fn test_rates_on_is_ordered() {
        let dir = tempfile::tempdir().unwrap();
        let q = seeded(&dir);
        let rates = q.rates_on(date(2026, 2, 17)).unwrap();
        let pairs: Vec<String> = rates.iter().map(|r| r.pair().to_string()).collect();
        assert_eq!(pairs, vec!["EUR/NOK", "EUR/SEK", "NOK/EUR"]);
    }

    #[test]
    fn test_latest_rates() {
        let dir = tempfile::tempdir().unwrap();
        let q = seeded(&dir);
        assert_eq!(q.latest_date().unwrap(), Some(date(2026, 2, 17)));
        let latest = q.latest_rates_from(code("EUR")).unwrap();
        assert_eq!(latest.len(), 2);
        assert!(latest.iter().all(|r| r.date == date(2026, 2, 17)));
    }

    #[test]
    fn test_ytd_average_and_change() {
        let dir = tempfile::tempdir().unwrap();
        let q = seeded(&dir);

        let averages = q.ytd_average(2026, code("EUR")).unwrap();
        assert_eq!(averages.len(), 2);
        assert_eq!(averages[0].to, code("NOK"));
        assert_relative_eq!(averages[0].average, 11.62, epsilon = 1e-9);
        assert_eq!(averages[0].first_date, date(2026, 1, 2));

        let changes = q.ytd_change(2026, code("EUR")).unwrap();
        assert_eq!(changes.len(), 2);
        assert_relative_eq!(changes[0].change_pct, 2.087, epsilon = 1e-4);

        assert!(q.ytd_change(2025, code("EUR")).unwrap().is_empty());
    }

    #[test]
    fn test_counts() {
        let dir = tempfile::tempdir().unwrap();
        let q = seeded(&dir);
        let counts = q.table_counts().unwrap();
        assert_eq!((counts.currencies, counts.dates, counts.facts), (7, 2, 6));
    }
}
