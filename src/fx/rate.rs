use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::{CurrencyCode, ExchangeRateObservation, Money, RATE_SCALE};

/// How a resolved rate was obtained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RateOrigin {
    Identity,
    Direct { rate_date: NaiveDate, source: String },
    Inverse { rate_date: NaiveDate, source: String },
}

/// A resolved conversion factor `from -> to`, kept as an exact fraction.
///
/// Direct observations resolve to `rate / 1e8`; reverse observations resolve
/// to `1e8 / rate`, so no precision is lost before the final floor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rate {
    pub from: CurrencyCode,
    pub to: CurrencyCode,
    numerator: i64,
    denominator: i64,
    pub origin: RateOrigin,
}

impl Rate {
    pub fn identity(currency: &CurrencyCode) -> Self {
        Self {
            from: currency.clone(),
            to: currency.clone(),
            numerator: 1,
            denominator: 1,
            origin: RateOrigin::Identity,
        }
    }

    pub fn direct(obs: &ExchangeRateObservation) -> Self {
        Self {
            from: obs.from_currency.clone(),
            to: obs.to_currency.clone(),
            numerator: obs.rate,
            denominator: RATE_SCALE,
            origin: RateOrigin::Direct {
                rate_date: obs.rate_date,
                source: obs.source.clone(),
            },
        }
    }

    /// Multiplicative inverse of an observation for the opposite pair.
    pub fn inverse(obs: &ExchangeRateObservation) -> Self {
        Self {
            from: obs.to_currency.clone(),
            to: obs.from_currency.clone(),
            numerator: RATE_SCALE,
            denominator: obs.rate,
            origin: RateOrigin::Inverse {
                rate_date: obs.rate_date,
                source: obs.source.clone(),
            },
        }
    }

    pub fn numerator(&self) -> i64 {
        self.numerator
    }

    pub fn denominator(&self) -> i64 {
        self.denominator
    }

    pub fn is_identity(&self) -> bool {
        matches!(self.origin, RateOrigin::Identity)
    }

    fn ensure_denominator(&self) -> Result<()> {
        if self.denominator <= 0 {
            return Err(Error::validation(format!(
                "rate {}->{} has non-positive denominator {}",
                self.from, self.to, self.denominator
            )));
        }
        Ok(())
    }

    /// The rate in 1e8 fixed point, floored.
    pub fn scaled(&self) -> Result<i64> {
        self.ensure_denominator()?;
        let value = (i128::from(self.numerator) * i128::from(RATE_SCALE))
            .div_euclid(i128::from(self.denominator));
        i64::try_from(value).map_err(|_| Error::Overflow)
    }

    pub fn to_decimal(&self) -> Result<Decimal> {
        self.ensure_denominator()?;
        Decimal::from(self.numerator)
            .checked_div(Decimal::from(self.denominator))
            .map(|d| d.normalize())
            .ok_or(Error::Overflow)
    }

    /// True when `self * other == 1` exactly.
    pub fn is_inverse_of(&self, other: &Rate) -> bool {
        i128::from(self.numerator) * i128::from(other.numerator)
            == i128::from(self.denominator) * i128::from(other.denominator)
    }

    /// Convert `money` into `self.to`: `floor(amount * numerator / denominator)`.
    ///
    /// Floor, not round-half-up, is the documented rounding policy.
    pub fn apply(&self, money: &Money) -> Result<Money> {
        if money.currency != self.from {
            return Err(Error::CurrencyMismatch {
                left: self.from.clone(),
                right: money.currency.clone(),
            });
        }
        if self.is_identity() {
            return Ok(Money::new(money.amount, self.to.clone()));
        }
        self.ensure_denominator()?;
        let product = i128::from(money.amount)
            .checked_mul(i128::from(self.numerator))
            .ok_or(Error::Overflow)?;
        let converted = product.div_euclid(i128::from(self.denominator));
        let amount = i64::try_from(converted).map_err(|_| Error::Overflow)?;
        Ok(Money::new(amount, self.to.clone()))
    }
}

/// Parse a decimal rate such as "3.25" into 1e8 fixed point.
pub fn parse_scaled_rate(value: &str) -> Result<i64> {
    let decimal = Decimal::from_str(value.trim())
        .map_err(|e| Error::validation(format!("invalid rate {value:?}: {e}")))?
        .normalize();
    if decimal.scale() > 8 {
        return Err(Error::validation(format!(
            "rate {value} has more than 8 decimal places"
        )));
    }
    if decimal <= Decimal::ZERO {
        return Err(Error::validation(format!("rate must be positive, got {value}")));
    }
    let scaled = decimal
        .checked_mul(Decimal::from(RATE_SCALE))
        .ok_or(Error::Overflow)?;
    i64::try_from(scaled).map_err(|_| Error::Overflow)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn observation(rate: i64) -> ExchangeRateObservation {
        ExchangeRateObservation::new(
            CurrencyCode::kwd(),
            CurrencyCode::usd(),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            rate,
            "test",
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn direct_rate_floors_the_product() {
        let rate = Rate::direct(&observation(325_000_000));
        let converted = rate.apply(&Money::new(1_000, CurrencyCode::kwd())).unwrap();
        assert_eq!(converted, Money::new(3_250, CurrencyCode::usd()));

        let odd = Rate::direct(&observation(333_333_333));
        let converted = odd.apply(&Money::new(10, CurrencyCode::kwd())).unwrap();
        assert_eq!(converted.amount, 33);
    }

    #[test]
    fn inverse_divides_by_the_observed_rate() {
        let obs = observation(325_000_000);
        let inverse = Rate::inverse(&obs);
        assert_eq!(inverse.from, CurrencyCode::usd());
        assert_eq!(inverse.to, CurrencyCode::kwd());
        let converted = inverse.apply(&Money::new(3_250, CurrencyCode::usd())).unwrap();
        assert_eq!(converted.amount, 1_000);
        assert!(inverse.is_inverse_of(&Rate::direct(&obs)));
    }

    #[test]
    fn negative_amounts_floor_toward_negative_infinity() {
        let rate = Rate::direct(&observation(150_000_000));
        let converted = rate.apply(&Money::new(-3, CurrencyCode::kwd())).unwrap();
        assert_eq!(converted.amount, -5);
    }

    #[test]
    fn apply_rejects_wrong_source_currency() {
        let rate = Rate::direct(&observation(325_000_000));
        assert!(matches!(
            rate.apply(&Money::new(1, CurrencyCode::usd())),
            Err(Error::CurrencyMismatch { .. })
        ));
    }

    #[test]
    fn conversion_overflow_is_reported() {
        let rate = Rate::direct(&observation(i64::MAX));
        assert!(matches!(
            rate.apply(&Money::new(i64::MAX, CurrencyCode::kwd())),
            Err(Error::Overflow)
        ));
    }

    #[test]
    fn scaled_value_of_inverse() {
        let inverse = Rate::inverse(&observation(200_000_000));
        assert_eq!(inverse.scaled().unwrap(), 50_000_000);
        assert_eq!(inverse.to_decimal().unwrap().to_string(), "0.5");
    }

    #[test]
    fn zero_rate_from_storage_is_an_error_not_a_panic() {
        let mut obs = observation(325_000_000);
        obs.rate = 0;
        let inverse = Rate::inverse(&obs);
        assert!(matches!(
            inverse.apply(&Money::new(1_000, CurrencyCode::usd())),
            Err(Error::Validation(_))
        ));
        assert!(matches!(inverse.scaled(), Err(Error::Validation(_))));
        assert!(matches!(inverse.to_decimal(), Err(Error::Validation(_))));
    }

    #[test]
    fn parses_decimal_rates() {
        assert_eq!(parse_scaled_rate("3.25").unwrap(), 325_000_000);
        assert_eq!(parse_scaled_rate("0.30700000").unwrap(), 30_700_000);
        assert!(parse_scaled_rate("0").is_err());
        assert!(parse_scaled_rate("-1").is_err());
        assert!(parse_scaled_rate("0.123456789").is_err());
    }
}
