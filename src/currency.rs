//! Currency codes, currency pairs and the configured currency set

use crate::error::{FxError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Three-letter currency code (ISO 4217 style), stored upper-case
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode([u8; 3]);

impl CurrencyCode {
    /// Build from a literal upper-case code; invalid literals panic at compile time in const context
    pub const fn from_static(code: &'static str) -> Self {
        let b = code.as_bytes();
        assert!(
            b.len() == 3
                && b[0].is_ascii_uppercase()
                && b[1].is_ascii_uppercase()
                && b[2].is_ascii_uppercase(),
            "currency code literal must be three upper-case letters"
        );
        Self([b[0], b[1], b[2]])
    }

    /// Get the code as a string slice
    pub fn as_str(&self) -> &str {
        // Only ASCII letters are ever stored
        std::str::from_utf8(&self.0).unwrap_or("???")
    }
}

impl FromStr for CurrencyCode {
    type Err = FxError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let bytes = trimmed.as_bytes();
        if bytes.len() != 3 || !bytes.iter().all(u8::is_ascii_alphabetic) {
            return Err(FxError::InvalidCurrency(s.to_string()));
        }
        Ok(Self([
            bytes[0].to_ascii_uppercase(),
            bytes[1].to_ascii_uppercase(),
            bytes[2].to_ascii_uppercase(),
        ]))
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = FxError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<CurrencyCode> for String {
    fn from(code: CurrencyCode) -> Self {
        code.as_str().to_string()
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A currency in the warehouse: code plus display name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Currency {
    pub code: CurrencyCode,
    pub name: String,
}

impl Currency {
    /// Create a new currency, rejecting an empty display name
    pub fn new(code: &str, name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(FxError::ConfigError(format!(
                "Currency {} has an empty name",
                code
            )));
        }
        Ok(Self {
            code: code.parse()?,
            name,
        })
    }
}

/// Directed currency pair (from -> to)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CurrencyPair {
    pub from: CurrencyCode,
    pub to: CurrencyCode,
}

impl CurrencyPair {
    /// Create new currency pair
    pub fn new(from: CurrencyCode, to: CurrencyCode) -> Self {
        Self { from, to }
    }

    /// Get the inverse pair
    pub fn inverse(&self) -> Self {
        Self {
            from: self.to,
            to: self.from,
        }
    }

    /// Parse from "NOK/SEK" or "NOKSEK"
    pub fn from_string(s: &str) -> Result<Self> {
        let (from, to) = if let Some((from, to)) = s.split_once('/') {
            (from, to)
        } else if s.len() == 6 && s.is_ascii() {
            s.split_at(3)
        } else {
            return Err(FxError::ParseError(format!(
                "Invalid currency pair format: {}",
                s
            )));
        };
        Ok(Self::new(from.parse()?, to.parse()?))
    }
}

impl fmt::Display for CurrencyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.from, self.to)
    }
}

/// The fixed, ordered currency set of a pipeline run with its designated base
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrencySet {
    currencies: Vec<Currency>,
    base: CurrencyCode,
}

impl CurrencySet {
    /// Build a currency set. Codes must be unique and the base must be a member.
    pub fn new(currencies: Vec<Currency>, base: CurrencyCode) -> Result<Self> {
        if currencies.is_empty() {
            return Err(FxError::ConfigError(
                "Currency set must not be empty".to_string(),
            ));
        }

        for (i, currency) in currencies.iter().enumerate() {
            if currencies[..i].iter().any(|c| c.code == currency.code) {
                return Err(FxError::ConfigError(format!(
                    "Duplicate currency code: {}",
                    currency.code
                )));
            }
            if currency.name.trim().is_empty() {
                return Err(FxError::ConfigError(format!(
                    "Currency {} has an empty name",
                    currency.code
                )));
            }
        }

        if !currencies.iter().any(|c| c.code == base) {
            return Err(FxError::ConfigError(format!(
                "Base currency {} is not part of the currency set",
                base
            )));
        }

        Ok(Self { currencies, base })
    }

    /// Base currency used for triangulation
    pub fn base(&self) -> CurrencyCode {
        self.base
    }

    /// All currencies in configured order
    pub fn currencies(&self) -> &[Currency] {
        &self.currencies
    }

    /// All codes in configured order
    pub fn codes(&self) -> impl Iterator<Item = CurrencyCode> + '_ {
        self.currencies.iter().map(|c| c.code)
    }

    /// Codes quoted against the base by the rate source
    pub fn non_base_codes(&self) -> Vec<CurrencyCode> {
        self.codes().filter(|c| *c != self.base).collect()
    }

    pub fn contains(&self, code: CurrencyCode) -> bool {
        self.currencies.iter().any(|c| c.code == code)
    }

    pub fn name_of(&self, code: CurrencyCode) -> Option<&str> {
        self.currencies
            .iter()
            .find(|c| c.code == code)
            .map(|c| c.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.currencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.currencies.is_empty()
    }

    /// Every ordered pair of distinct currencies: N x (N - 1) pairs
    pub fn ordered_pairs(&self) -> Vec<CurrencyPair> {
        let mut pairs = Vec::with_capacity(self.len() * self.len().saturating_sub(1));
        for from in self.codes() {
            for to in self.codes() {
                if from != to {
                    pairs.push(CurrencyPair::new(from, to));
                }
            }
        }
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(s: &str) -> CurrencyCode {
        s.parse().unwrap()
    }

    fn nordic_set() -> CurrencySet {
        CurrencySet::new(
            vec![
                Currency::new("EUR", "Euro").unwrap(),
                Currency::new("NOK", "Norwegian Krone").unwrap(),
                Currency::new("SEK", "Swedish Krona").unwrap(),
            ],
            code("EUR"),
        )
        .unwrap()
    }

    #[test]
    fn test_currency_code_parse() {
        assert_eq!(code("nok").as_str(), "NOK");
        assert_eq!(code(" sek ").to_string(), "SEK");
        assert!("NO".parse::<CurrencyCode>().is_err());
        assert!("N0K".parse::<CurrencyCode>().is_err());
        assert!("NOKK".parse::<CurrencyCode>().is_err());
    }

    #[test]
    fn test_currency_code_ordering() {
        let mut codes = vec![code("SEK"), code("CZK"), code("NOK")];
        codes.sort();
        assert_eq!(codes, vec![code("CZK"), code("NOK"), code("SEK")]);
    }

    #[test]
    fn test_currency_code_serde() {
        let json = serde_json::to_string(&code("PLN")).unwrap();
        assert_eq!(json, "\"PLN\"");
        let parsed: CurrencyCode = serde_json::from_str("\"ron\"").unwrap();
        assert_eq!(parsed, code("RON"));
        assert!(serde_json::from_str::<CurrencyCode>("\"ROMANIA\"").is_err());
    }

    #[test]
    fn test_currency_requires_name() {
        assert!(Currency::new("DKK", "").is_err());
        assert!(Currency::new("DKK", "Danish Krone").is_ok());
    }

    #[test]
    fn test_currency_pair() {
        let pair = CurrencyPair::new(code("NOK"), code("SEK"));
        assert_eq!(format!("{}", pair), "NOK/SEK");
        assert_eq!(pair.inverse(), CurrencyPair::new(code("SEK"), code("NOK")));
        assert_eq!(CurrencyPair::from_string("NOK/SEK").unwrap(), pair);
        assert_eq!(CurrencyPair::from_string("noksek").unwrap(), pair);
        assert!(CurrencyPair::from_string("NOK-SEK-X").is_err());
    }

    #[test]
    fn test_currency_set_rejects_bad_input() {
        let eur = Currency::new("EUR", "Euro").unwrap();
        assert!(CurrencySet::new(vec![], code("EUR")).is_err());
        assert!(CurrencySet::new(vec![eur.clone(), eur.clone()], code("EUR")).is_err());
        assert!(CurrencySet::new(vec![eur], code("USD")).is_err());
    }

    #[test]
    fn test_ordered_pairs() {
        let set = nordic_set();
        let pairs = set.ordered_pairs();
        assert_eq!(pairs.len(), 6);
        assert!(pairs.iter().all(|p| p.from != p.to));
        assert!(pairs.contains(&CurrencyPair::new(code("NOK"), code("SEK"))));
        assert!(pairs.contains(&CurrencyPair::new(code("SEK"), code("NOK"))));
    }

    #[test]
    fn test_non_base_codes() {
        let set = nordic_set();
        assert_eq!(set.non_base_codes(), vec![code("NOK"), code("SEK")]);
        assert_eq!(set.name_of(code("NOK")), Some("Norwegian Krone"));
        assert_eq!(set.name_of(code("USD")), None);
    }
}
