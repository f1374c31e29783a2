//! State machines for capital events.
//!
//! Every function here validates and converts first, then mutates. A failure
//! (including a missing exchange rate) leaves the aggregate untouched.

pub mod equity;
pub mod fixed_income;
pub mod private_fund;
pub mod real_estate;

use chrono::{DateTime, NaiveDate, Utc};

use crate::error::{Error, Result};
use crate::fx::FxResolver;
use crate::models::{CurrencyCode, EquityHolding, FixedIncomeHolding, Money, PrivateFund, Property};

/// Everything an event needs besides the aggregate itself.
#[derive(Clone, Copy)]
pub struct EventContext<'a> {
    pub fx: &'a dyn FxResolver,
    pub base_currency: &'a CurrencyCode,
    pub now: DateTime<Utc>,
    /// Business date in the configured timezone, used to stamp settlements.
    pub today: NaiveDate,
}

impl<'a> EventContext<'a> {
    pub fn new(
        fx: &'a dyn FxResolver,
        base_currency: &'a CurrencyCode,
        now: DateTime<Utc>,
        today: NaiveDate,
    ) -> Self {
        Self {
            fx,
            base_currency,
            now,
            today,
        }
    }

    pub fn to_base(&self, money: &Money, as_of: NaiveDate) -> Result<Money> {
        self.fx.convert(money, self.base_currency, as_of)
    }
}

/// Logical deletion of a top-level aggregate. Children are not touched.
pub trait SoftDelete {
    fn soft_delete(&mut self, at: DateTime<Utc>) -> Result<()>;
}

macro_rules! impl_soft_delete {
    ($ty:ty, $not_found:path) => {
        impl SoftDelete for $ty {
            fn soft_delete(&mut self, at: DateTime<Utc>) -> Result<()> {
                if self.deleted_at.is_some() {
                    return Err($not_found(self.id.clone()));
                }
                self.deleted_at = Some(at);
                Ok(())
            }
        }
    };
}

impl_soft_delete!(EquityHolding, Error::HoldingNotFound);
impl_soft_delete!(FixedIncomeHolding, Error::FixedIncomeNotFound);
impl_soft_delete!(Property, Error::PropertyNotFound);
impl_soft_delete!(PrivateFund, Error::FundNotFound);

pub(crate) fn ensure_positive(money: &Money, what: &str) -> Result<()> {
    if money.is_positive() {
        Ok(())
    } else {
        Err(Error::validation(format!(
            "{what} must be positive, got {money}"
        )))
    }
}

pub(crate) fn ensure_non_negative(money: &Money, what: &str) -> Result<()> {
    if money.is_negative() {
        Err(Error::validation(format!(
            "{what} must not be negative, got {money}"
        )))
    } else {
        Ok(())
    }
}

pub(crate) fn ensure_currency(money: &Money, expected: &CurrencyCode) -> Result<()> {
    if &money.currency == expected {
        Ok(())
    } else {
        Err(Error::CurrencyMismatch {
            left: expected.clone(),
            right: money.currency.clone(),
        })
    }
}


#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::models::{Exchange, NewEquityHolding};

    #[test]
    fn soft_delete_is_one_way() {
        let mut holding = EquityHolding::new(
            NewEquityHolding {
                ticker: "ZAIN".to_string(),
                name: "Zain".to_string(),
                exchange: Exchange::BoursaKuwait,
                sector: None,
                country: None,
                cost_basis_currency: CurrencyCode::kwd(),
                notes: None,
            },
            &CurrencyCode::kwd(),
            Utc::now(),
        );
        holding.soft_delete(Utc::now()).unwrap();
        assert!(holding.is_deleted());
        assert!(matches!(
            holding.soft_delete(Utc::now()),
            Err(Error::HoldingNotFound(_))
        ));
    }
}
