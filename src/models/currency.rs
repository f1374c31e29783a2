use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Error, Result};

/// Currencies whose minor unit is a thousandth (fils, baisa, ...).
const THREE_DECIMAL_CURRENCIES: &[&str] = &["BHD", "IQD", "JOD", "KWD", "LYD", "OMR", "TND"];

fn code_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Z]{3}$").expect("static currency regex"))
}

/// Three-letter ISO-4217 style currency code, always uppercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct CurrencyCode(String);

impl CurrencyCode {
    pub fn new(value: &str) -> Result<Self> {
        let normalized = value.trim().to_uppercase();
        if code_pattern().is_match(&normalized) {
            Ok(Self(normalized))
        } else {
            Err(Error::validation(format!(
                "invalid currency code {value:?}: expected three letters"
            )))
        }
    }

    pub fn kwd() -> Self {
        Self("KWD".to_string())
    }

    pub fn usd() -> Self {
        Self("USD".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of implied decimal places in amounts of this currency.
    pub fn minor_unit_scale(&self) -> u32 {
        if THREE_DECIMAL_CURRENCIES.contains(&self.0.as_str()) {
            3
        } else {
            2
        }
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for CurrencyCode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl AsRef<str> for CurrencyCode {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl<'de> Deserialize<'de> for CurrencyCode {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        CurrencyCode::new(&raw).map_err(serde::de::Error::custom)
    }
}
