//! Frankfurter (ECB reference rates) data source
//!
//! Free, keyless API backed by the European Central Bank. Rates are published
//! on ECB business days only; weekends and TARGET holidays are absent.

use super::source::{restrict_to_range, RawRateSet, RawRates};
use crate::calendar::{parse_date, DateRange};
use crate::currency::{CurrencyCode, CurrencySet};
use crate::error::{FxError, Result};
use serde::Deserialize;
use std::collections::BTreeMap;

#[cfg(feature = "async")]
use super::source::RateSource;
#[cfg(feature = "async")]
use crate::config::SourceConfig;
#[cfg(feature = "async")]
use reqwest::Client;
#[cfg(feature = "async")]
use std::time::Duration;

/// Time-series response body
#[derive(Debug, Deserialize)]
struct FrankfurterResponse {
    base: String,
    #[serde(default)]
    start_date: Option<String>,
    #[serde(default)]
    end_date: Option<String>,
    #[serde(default)]
    rates: BTreeMap<String, BTreeMap<String, f64>>,
}

/// Parse a time-series response into raw rates for `range`.
///
/// Dates outside the range are dropped (the provider snaps a non-trading start
/// date back to the previous business day) and currencies outside the set are
/// ignored. A mismatched base, bad keys or non-positive rates are malformed input.
pub fn parse_response(body: &str, currencies: &CurrencySet, range: DateRange) -> Result<RawRates> {
    let response: FrankfurterResponse = serde_json::from_str(body)
        .map_err(|e| FxError::SourceError(format!("Malformed rate response: {}", e)))?;

    let base: CurrencyCode = response
        .base
        .parse()
        .map_err(|_| FxError::SourceError(format!("Invalid base in response: {}", response.base)))?;
    if base != currencies.base() {
        return Err(FxError::SourceError(format!(
            "Response base {} does not match configured base {}",
            base,
            currencies.base()
        )));
    }

    let mut rates = RawRates::new();
    for (date_str, day_rates) in response.rates {
        let date = parse_date(&date_str)
            .map_err(|e| FxError::SourceError(format!("Bad date key in response: {}", e)))?;

        let mut set = RawRateSet::new();
        for (code_str, rate) in day_rates {
            let code: CurrencyCode = code_str.parse().map_err(|_| {
                FxError::SourceError(format!("Bad currency key '{}' on {}", code_str, date))
            })?;
            if !currencies.contains(code) {
                log::debug!("Ignoring {} on {}: not in currency set", code, date);
                continue;
            }
            if !rate.is_finite() || rate <= 0.0 {
                return Err(FxError::SourceError(format!(
                    "Non-positive rate for {} on {}: {}",
                    code, date, rate
                )));
            }
            set.insert(code, rate);
        }
        rates.insert(date, set);
    }

    log::info!(
        "Extraction done | {} trading days fetched | {} -> {}",
        rates.len(),
        response.start_date.as_deref().unwrap_or("?"),
        response.end_date.as_deref().unwrap_or("?"),
    );

    Ok(restrict_to_range(rates, range))
}

/// Frankfurter HTTP data source
#[cfg(feature = "async")]
pub struct FrankfurterSource {
    base_url: String,
    currencies: CurrencySet,
    client: Client,
}

#[cfg(feature = "async")]
impl FrankfurterSource {
    /// Create a new Frankfurter source
    pub fn new(config: &SourceConfig, currencies: CurrencySet) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| FxError::SourceError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            currencies,
            client,
        })
    }

    /// Time-series URL for a range
    pub fn url_for(&self, range: DateRange) -> String {
        format!("{}/{}..{}", self.base_url, range.start(), range.end())
    }

    /// Comma-joined non-base codes sent as `symbols`
    fn symbols(&self) -> String {
        self.currencies
            .non_base_codes()
            .iter()
            .map(|c| c.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }

    async fn fetch_range(&self, range: DateRange) -> Result<RawRates> {
        let url = self.url_for(range);
        let symbols = self.symbols();
        let base = self.currencies.base().to_string();

        log::info!("Calling Frankfurter API | {} | base={} symbols={}", url, base, symbols);

        let response = self
            .client
            .get(&url)
            .query(&[("base", base.as_str()), ("symbols", symbols.as_str())])
            .send()
            .await
            .map_err(|e| FxError::SourceError(format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(FxError::SourceError(format!(
                "Frankfurter returned error: {}",
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| FxError::SourceError(format!("Failed to read response: {}", e)))?;

        parse_response(&body, &self.currencies, range)
    }
}

#[cfg(feature = "async")]
impl RateSource for FrankfurterSource {
    fn fetch(&self, range: DateRange) -> impl std::future::Future<Output = Result<RawRates>> + Send {
        self.fetch_range(range)
    }

    fn name(&self) -> &str {
        "frankfurter"
    }
}
