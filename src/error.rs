//! Error types for the FX warehouse

use chrono::NaiveDate;
use thiserror::Error;

/// Main error type for the FX warehouse
#[derive(Error, Debug)]
pub enum FxError {
    /// Transport failure or malformed payload from the upstream rate source
    #[error("Rate source error: {0}")]
    SourceError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid currency code: {0}")]
    InvalidCurrency(String),

    #[error("Invalid date range: start {start} is after end {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error("Parse error: {0}")]
    ParseError(String),

    /// A row violates a warehouse constraint before it reaches the sink
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Missing dimension key in {table}: {key}")]
    MissingDimensionKey { table: String, key: String },

    #[error("Sink error: {0}")]
    SinkError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("Columnar encoding error: {0}")]
    PolarsError(#[from] polars::error::PolarsError),
}

/// Result type alias for FX warehouse operations
pub type Result<T> = std::result::Result<T, FxError>;
