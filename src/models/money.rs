use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::CurrencyCode;
use crate::error::{Error, Result};
use crate::format::format_minor_units;
use crate::fx::FxResolver;

/// Fixed-point monetary amount: an integer count of minor units of `currency`.
///
/// The scale is implied by the currency (see [`CurrencyCode::minor_unit_scale`]).
/// Arithmetic never wraps and never mixes currencies silently.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Money {
    pub amount: i64,
    pub currency: CurrencyCode,
}

impl Money {
    pub fn new(amount: i64, currency: CurrencyCode) -> Self {
        Self { amount, currency }
    }

    pub fn zero(currency: CurrencyCode) -> Self {
        Self::new(0, currency)
    }

    /// Parse a major-unit decimal string ("12.345") into minor units.
    ///
    /// Rejects values with more decimal places than the currency carries.
    pub fn parse_major(value: &str, currency: CurrencyCode) -> Result<Self> {
        let decimal = Decimal::from_str(value.trim())
            .map_err(|e| Error::validation(format!("invalid amount {value:?}: {e}")))?
            .normalize();
        let scale = currency.minor_unit_scale();
        if decimal.scale() > scale {
            return Err(Error::validation(format!(
                "amount {value} has more than {scale} decimal places for {currency}"
            )));
        }
        let factor = Decimal::from(10_i64.pow(scale));
        let minor = decimal.checked_mul(factor).ok_or(Error::Overflow)?;
        let amount = i64::try_from(minor).map_err(|_| Error::Overflow)?;
        Ok(Self::new(amount, currency))
    }

    pub fn is_zero(&self) -> bool {
        self.amount == 0
    }

    pub fn is_negative(&self) -> bool {
        self.amount < 0
    }

    pub fn is_positive(&self) -> bool {
        self.amount > 0
    }

    /// Value in major units, e.g. 1234 fils -> 1.234.
    pub fn to_decimal(&self) -> Decimal {
        Decimal::new(self.amount, self.currency.minor_unit_scale())
    }

    fn ensure_same_currency(&self, other: &Money) -> Result<()> {
        if self.currency == other.currency {
            Ok(())
        } else {
            Err(Error::CurrencyMismatch {
                left: self.currency.clone(),
                right: other.currency.clone(),
            })
        }
    }

    pub fn checked_add(&self, other: &Money) -> Result<Money> {
        self.ensure_same_currency(other)?;
        let amount = self
            .amount
            .checked_add(other.amount)
            .ok_or(Error::Overflow)?;
        Ok(Money::new(amount, self.currency.clone()))
    }

    pub fn checked_sub(&self, other: &Money) -> Result<Money> {
        self.ensure_same_currency(other)?;
        let amount = self
            .amount
            .checked_sub(other.amount)
            .ok_or(Error::Overflow)?;
        Ok(Money::new(amount, self.currency.clone()))
    }

    /// Scale by an integer factor, e.g. quantity x price.
    pub fn checked_mul(&self, factor: i64) -> Result<Money> {
        let amount = self.amount.checked_mul(factor).ok_or(Error::Overflow)?;
        Ok(Money::new(amount, self.currency.clone()))
    }

    pub fn checked_neg(&self) -> Result<Money> {
        let amount = self.amount.checked_neg().ok_or(Error::Overflow)?;
        Ok(Money::new(amount, self.currency.clone()))
    }

    /// Add `other` after converting it into this amount's currency.
    pub fn add_converted(
        &self,
        other: &Money,
        fx: &dyn FxResolver,
        date: NaiveDate,
    ) -> Result<Money> {
        let converted = fx.convert(other, &self.currency, date)?;
        self.checked_add(&converted)
    }

    /// Subtract `other` after converting it into this amount's currency.
    pub fn sub_converted(
        &self,
        other: &Money,
        fx: &dyn FxResolver,
        date: NaiveDate,
    ) -> Result<Money> {
        let converted = fx.convert(other, &self.currency, date)?;
        self.checked_sub(&converted)
    }

    pub fn try_cmp(&self, other: &Money) -> Result<Ordering> {
        self.ensure_same_currency(other)?;
        Ok(self.amount.cmp(&other.amount))
    }

    /// Sum amounts that must all be in `currency`.
    pub fn sum<'a>(
        currency: &CurrencyCode,
        items: impl IntoIterator<Item = &'a Money>,
    ) -> Result<Money> {
        items
            .into_iter()
            .try_fold(Money::zero(currency.clone()), |acc, m| acc.checked_add(m))
    }
}

impl PartialOrd for Money {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.try_cmp(other).ok()
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}",
            format_minor_units(self.amount, self.currency.minor_unit_scale(), true),
            self.currency
        )
    }
}

/// Integer basis points: 10,000 = 100%.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BasisPoints(pub i32);

impl BasisPoints {
    pub const FULL: BasisPoints = BasisPoints(10_000);

    pub fn to_percent(self) -> Decimal {
        Decimal::new(i64::from(self.0), 2)
    }
}
