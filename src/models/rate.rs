use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{CurrencyCode, Id};
use crate::error::{Error, Result};

/// Implied denominator of stored rates: eight decimal places.
pub const RATE_SCALE: i64 = 100_000_000;

/// Source tag for rates entered or overridden by hand.
pub const MANUAL_SOURCE: &str = "manual";

/// Identity of an observation: at most one live observation per key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RateKey {
    pub from: CurrencyCode,
    pub to: CurrencyCode,
    pub date: NaiveDate,
}

/// One dated exchange-rate observation, `1 from = rate / 1e8 to`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeRateObservation {
    pub id: Id,
    pub from_currency: CurrencyCode,
    pub to_currency: CurrencyCode,
    pub rate_date: NaiveDate,
    /// Fixed-point rate scaled by [`RATE_SCALE`].
    pub rate: i64,
    pub source: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl ExchangeRateObservation {
    pub fn new(
        from_currency: CurrencyCode,
        to_currency: CurrencyCode,
        rate_date: NaiveDate,
        rate: i64,
        source: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        if from_currency == to_currency {
            return Err(Error::validation(format!(
                "rate observation must convert between two currencies, got {from_currency}->{to_currency}"
            )));
        }
        if rate <= 0 {
            return Err(Error::validation(format!(
                "rate for {from_currency}->{to_currency} must be positive, got {rate}"
            )));
        }
        let source = source.into();
        if source.trim().is_empty() {
            return Err(Error::validation("rate source must not be empty"));
        }

        Ok(Self {
            id: Id::new(),
            from_currency,
            to_currency,
            rate_date,
            rate,
            source,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        })
    }

    pub fn key(&self) -> RateKey {
        RateKey {
            from: self.from_currency.clone(),
            to: self.to_currency.clone(),
            date: self.rate_date,
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn is_manual(&self) -> bool {
        self.source == MANUAL_SOURCE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    #[test]
    fn rejects_same_currency_and_non_positive_rates() {
        let kwd = CurrencyCode::kwd();
        let usd = CurrencyCode::usd();
        assert!(
            ExchangeRateObservation::new(kwd.clone(), kwd.clone(), date(), 1, "ecb", now())
                .is_err()
        );
        assert!(
            ExchangeRateObservation::new(kwd.clone(), usd.clone(), date(), 0, "ecb", now())
                .is_err()
        );
        assert!(ExchangeRateObservation::new(kwd, usd, date(), 325_000_000, " ", now()).is_err());
    }

    #[test]
    fn manual_source_is_detected() {
        let obs = ExchangeRateObservation::new(
            CurrencyCode::kwd(),
            CurrencyCode::usd(),
            date(),
            325_000_000,
            MANUAL_SOURCE,
            now(),
        )
        .unwrap();
        assert!(obs.is_manual());
        assert!(!obs.is_deleted());
        assert_eq!(obs.key().date, date());
    }
}
