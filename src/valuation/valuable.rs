use chrono::NaiveDate;

use super::{AssetClass, Dimension, ValuationPolicy};
use crate::error::Result;
use crate::fx::FxResolver;
use crate::models::{CurrencyCode, EquityHolding, FixedIncomeHolding, Money, PrivateFund, Property};

const UNKNOWN_COUNTRY: &str = "Unknown";
const GLOBAL_GEOGRAPHY: &str = "Global";
const OTHER_SECTOR: &str = "Other";
const DIVERSIFIED_SECTOR: &str = "Diversified";

/// A position with a base-currency value and a cost basis.
///
/// Implemented by every asset-class aggregate so the aggregator never
/// reaches into class-specific fields.
pub trait Valuable {
    fn asset_class(&self) -> AssetClass;

    fn is_live(&self) -> bool;

    /// Currency the position is naturally valued in.
    fn natural_currency(&self) -> &CurrencyCode;

    /// Last stored base-currency value and the date it was computed for.
    fn stored_valuation(&self) -> Option<(&Money, NaiveDate)>;

    /// Current value in the natural currency, from the latest mark.
    fn natural_value(&self) -> Result<Money>;

    fn cost_basis_of(&self) -> Money;

    fn exposure_key(&self, dimension: Dimension) -> Option<String>;

    /// Tracked unrealized gain in base currency, for classes that keep one.
    fn tracked_unrealized(&self) -> Option<&Money> {
        None
    }

    fn realized_gain_loss(&self) -> Option<&Money> {
        None
    }

    /// Income received to date, already in base currency.
    fn income_received(&self) -> Option<&Money> {
        None
    }

    /// Base-currency value as of `as_of`: the stored value when fresh,
    /// otherwise the natural value converted at `as_of`.
    fn valuation_of(
        &self,
        as_of: NaiveDate,
        base_currency: &CurrencyCode,
        fx: &dyn FxResolver,
        policy: &ValuationPolicy,
    ) -> Result<Money> {
        if let Some((value, valued_on)) = self.stored_valuation() {
            if &value.currency == base_currency && policy.is_fresh(valued_on, as_of) {
                return Ok(value.clone());
            }
        }
        let natural = self.natural_value()?;
        if natural.is_zero() {
            return Ok(Money::zero(base_currency.clone()));
        }
        fx.convert(&natural, base_currency, as_of)
    }
}

impl Valuable for EquityHolding {
    fn asset_class(&self) -> AssetClass {
        AssetClass::Equities
    }

    fn is_live(&self) -> bool {
        !self.is_deleted()
    }

    fn natural_currency(&self) -> &CurrencyCode {
        self.quote_currency()
    }

    fn stored_valuation(&self) -> Option<(&Money, NaiveDate)> {
        Some((self.current_value_base()?, self.valued_on()?))
    }

    /// Unpriced positions are worth zero.
    fn natural_value(&self) -> Result<Money> {
        match self.current_price() {
            Some(price) => price.checked_mul(self.quantity()),
            None => Ok(Money::zero(self.cost_basis().currency.clone())),
        }
    }

    fn cost_basis_of(&self) -> Money {
        self.cost_basis().clone()
    }

    fn exposure_key(&self, dimension: Dimension) -> Option<String> {
        Some(match dimension {
            Dimension::Geography => self.country.clone().unwrap_or_else(|| UNKNOWN_COUNTRY.to_string()),
            Dimension::Currency => self.quote_currency().to_string(),
            Dimension::Sector => self.sector.clone().unwrap_or_else(|| OTHER_SECTOR.to_string()),
        })
    }

    fn tracked_unrealized(&self) -> Option<&Money> {
        Some(self.unrealized_gain_loss())
    }

    fn realized_gain_loss(&self) -> Option<&Money> {
        Some(EquityHolding::realized_gain_loss(self))
    }

    fn income_received(&self) -> Option<&Money> {
        Some(self.dividends_received())
    }
}

impl Valuable for FixedIncomeHolding {
    fn asset_class(&self) -> AssetClass {
        AssetClass::FixedIncome
    }

    fn is_live(&self) -> bool {
        !self.is_deleted()
    }

    fn natural_currency(&self) -> &CurrencyCode {
        &self.face_value.currency
    }

    fn stored_valuation(&self) -> Option<(&Money, NaiveDate)> {
        Some((self.current_value_base()?, self.valued_on()?))
    }

    fn natural_value(&self) -> Result<Money> {
        Ok(self
            .current_market_value()
            .unwrap_or(&self.purchase_price)
            .clone())
    }

    fn cost_basis_of(&self) -> Money {
        self.purchase_price.clone()
    }

    /// Fixed income only shows up in the currency breakdown.
    fn exposure_key(&self, dimension: Dimension) -> Option<String> {
        match dimension {
            Dimension::Currency => Some(self.face_value.currency.to_string()),
            Dimension::Geography | Dimension::Sector => None,
        }
    }

    fn income_received(&self) -> Option<&Money> {
        Some(self.interest_received_base())
    }
}

impl Valuable for Property {
    fn asset_class(&self) -> AssetClass {
        AssetClass::RealEstate
    }

    fn is_live(&self) -> bool {
        !self.is_deleted()
    }

    fn natural_currency(&self) -> &CurrencyCode {
        self.value_currency()
    }

    fn stored_valuation(&self) -> Option<(&Money, NaiveDate)> {
        Some((self.current_value_base()?, self.last_valuation_date()?))
    }

    fn natural_value(&self) -> Result<Money> {
        Ok(self.current_value().unwrap_or(&self.purchase_price).clone())
    }

    fn cost_basis_of(&self) -> Money {
        self.purchase_price.clone()
    }

    fn exposure_key(&self, dimension: Dimension) -> Option<String> {
        match dimension {
            Dimension::Geography => Some(
                self.country
                    .clone()
                    .unwrap_or_else(|| UNKNOWN_COUNTRY.to_string()),
            ),
            Dimension::Currency => Some(self.value_currency().to_string()),
            Dimension::Sector => None,
        }
    }
}

impl Valuable for PrivateFund {
    fn asset_class(&self) -> AssetClass {
        AssetClass::PrivateFunds
    }

    fn is_live(&self) -> bool {
        !self.is_deleted()
    }

    fn natural_currency(&self) -> &CurrencyCode {
        self.commitment_currency()
    }

    fn stored_valuation(&self) -> Option<(&Money, NaiveDate)> {
        Some((self.current_nav_base()?, self.nav_date()?))
    }

    /// Latest NAV, else capital called so far.
    fn natural_value(&self) -> Result<Money> {
        Ok(self.current_nav().unwrap_or(self.called_capital()).clone())
    }

    fn cost_basis_of(&self) -> Money {
        self.called_capital().clone()
    }

    fn exposure_key(&self, dimension: Dimension) -> Option<String> {
        Some(match dimension {
            Dimension::Geography => self
                .geography
                .clone()
                .unwrap_or_else(|| GLOBAL_GEOGRAPHY.to_string()),
            Dimension::Currency => self.commitment_currency().to_string(),
            Dimension::Sector => self
                .sector
                .clone()
                .unwrap_or_else(|| DIVERSIFIED_SECTOR.to_string()),
        })
    }

    fn income_received(&self) -> Option<&Money> {
        Some(self.distributions_received_base())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::lifecycle::testing::{book, code, date};
    use crate::valuation::testing::{equity, fund, property};

    fn policy() -> ValuationPolicy {
        ValuationPolicy {
            stale_after: Duration::from_secs(7 * 86_400),
        }
    }

    #[test]
    fn fresh_stored_value_is_reused() {
        let fx = book();
        // 100 x 1300 cents = 130000 cents -> 40000 fils at 3.25.
        let h = equity(&fx, "MSFT", None, None, 1_300, 1);
        let value = h
            .valuation_of(date(2024, 2, 5), &code("KWD"), &fx, &policy())
            .unwrap();
        assert_eq!(value, Money::new(40_000, code("KWD")));
    }

    #[test]
    fn stale_value_is_recomputed_at_as_of() {
        let mut fx = book();
        fx.insert(crate::lifecycle::testing::observation(
            "KWD",
            "USD",
            date(2024, 6, 1),
            260_000_000,
        ));
        let h = equity(&fx, "MSFT", None, None, 1_300, 1);
        // Stored value is from February; June marks at 2.60.
        let value = h
            .valuation_of(date(2024, 6, 2), &code("KWD"), &fx, &policy())
            .unwrap();
        assert_eq!(value, Money::new(50_000, code("KWD")));
    }

    #[test]
    fn unpriced_equity_is_zero_without_a_rate() {
        let fx = crate::fx::RateBook::new();
        let h = EquityHolding::new(
            crate::models::NewEquityHolding {
                ticker: "NEW".to_string(),
                name: "Unpriced".to_string(),
                exchange: crate::models::Exchange::Other,
                sector: None,
                country: None,
                cost_basis_currency: code("USD"),
                notes: None,
            },
            &code("KWD"),
            chrono::Utc::now(),
        );
        let value = h
            .valuation_of(date(2024, 1, 1), &code("KWD"), &fx, &policy())
            .unwrap();
        assert!(value.is_zero());
        assert_eq!(h.exposure_key(Dimension::Geography).as_deref(), Some("Unknown"));
        assert_eq!(h.exposure_key(Dimension::Sector).as_deref(), Some("Other"));
    }

    #[test]
    fn property_falls_back_to_purchase_price() {
        let fx = book();
        let p = property(None, 2_000_000, 1);
        let value = p
            .valuation_of(date(2024, 3, 1), &code("KWD"), &fx, &policy())
            .unwrap();
        assert_eq!(value, Money::new(2_000_000, code("KWD")));
        assert_eq!(p.exposure_key(Dimension::Sector), None);
    }

    #[test]
    fn fund_without_nav_is_valued_at_called_capital() {
        let fx = book();
        let f = fund(&fx, None, 5_000_000, 1_300_000, 1);
        let value = f
            .valuation_of(date(2024, 3, 1), &code("KWD"), &fx, &policy())
            .unwrap();
        assert_eq!(value, Money::new(400_000, code("KWD")));
        assert_eq!(f.exposure_key(Dimension::Geography).as_deref(), Some("Global"));
        assert_eq!(f.exposure_key(Dimension::Sector).as_deref(), Some("Diversified"));
    }
}
