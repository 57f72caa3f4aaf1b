//! Pipeline configuration
//!
//! All tunable parameters live in one immutable [`PipelineConfig`] that is
//! handed to each component at construction. Defaults match the ECB-backed
//! Frankfurter feed and the seven-currency Nordic/CEE set.

use crate::currency::{Currency, CurrencyCode, CurrencySet};
use crate::error::{FxError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Upper bound on rounding precision; beyond this f64 noise dominates
pub const MAX_DECIMAL_PLACES: u32 = 12;

/// Complete pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_currencies")]
    pub currencies: Vec<Currency>,
    #[serde(default = "default_base_currency")]
    pub base_currency: CurrencyCode,
    /// Decimal places cross rates are rounded to before they are emitted
    #[serde(default = "default_decimal_places")]
    pub decimal_places: u32,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub sink: SinkConfig,
}

/// Upstream rate source settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Warehouse sink selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SinkConfig {
    /// Single embedded database file
    Local {
        #[serde(default = "default_db_path")]
        db_path: PathBuf,
    },
    /// Parquet snapshots and Hive-style monthly fact partitions under a root
    Partitioned {
        root: PathBuf,
        #[serde(default = "default_fact_table")]
        fact_table: String,
    },
}

fn default_currencies() -> Vec<Currency> {
    [
        ("NOK", "Norwegian Krone"),
        ("EUR", "Euro"),
        ("SEK", "Swedish Krona"),
        ("PLN", "Polish Zloty"),
        ("RON", "Romanian Leu"),
        ("DKK", "Danish Krone"),
        ("CZK", "Czech Koruna"),
    ]
    .into_iter()
    .map(|(code, name)| Currency {
        code: CurrencyCode::from_static(code),
        name: name.to_string(),
    })
    .collect()
}

fn default_base_currency() -> CurrencyCode {
    CurrencyCode::from_static("EUR")
}

fn default_decimal_places() -> u32 {
    6
}

fn default_base_url() -> String {
    "https://api.frankfurter.app".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_db_path() -> PathBuf {
    PathBuf::from("fx_warehouse.db")
}

fn default_fact_table() -> String {
    "fact_fx_rates".to_string()
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            currencies: default_currencies(),
            base_currency: default_base_currency(),
            decimal_places: default_decimal_places(),
            source: SourceConfig::default(),
            sink: SinkConfig::default(),
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for SinkConfig {
    fn default() -> Self {
        SinkConfig::Local {
            db_path: default_db_path(),
        }
    }
}

impl SinkConfig {
    /// Partitioned sink rooted at `root` with the default fact table name
    pub fn partitioned(root: impl Into<PathBuf>) -> Self {
        SinkConfig::Partitioned {
            root: root.into(),
            fact_table: default_fact_table(),
        }
    }
}

impl PipelineConfig {
    /// Check every invariant the components rely on
    pub fn validate(&self) -> Result<()> {
        self.currency_set()?;

        if self.decimal_places > MAX_DECIMAL_PLACES {
            return Err(FxError::ConfigError(format!(
                "decimal_places must be at most {}, got {}",
                MAX_DECIMAL_PLACES, self.decimal_places
            )));
        }

        if self.source.timeout_secs == 0 {
            return Err(FxError::ConfigError(
                "source.timeout_secs must be positive".to_string(),
            ));
        }

        if let SinkConfig::Partitioned { fact_table, .. } = &self.sink {
            if fact_table.is_empty() || fact_table.contains(['/', '\\']) {
                return Err(FxError::ConfigError(format!(
                    "Invalid fact table name: '{}'",
                    fact_table
                )));
            }
        }

        Ok(())
    }

    /// Validated currency set with its base
    pub fn currency_set(&self) -> Result<CurrencySet> {
        CurrencySet::new(self.currencies.clone(), self.base_currency)
    }

    /// Parse a configuration from a JSON document
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }
}
