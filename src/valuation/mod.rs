//! Cross-asset-class aggregation: portfolio summaries, exposure breakdowns
//! and occupancy. Everything here is read-only and built on demand from a
//! snapshot of live aggregates.

mod exposure;
mod occupancy;
mod summary;
mod valuable;

pub use exposure::{exposure_by, ExposureBreakdown};
pub use occupancy::{occupancy_report, OccupancyReport, PropertyOccupancy, StatusCount};
pub use summary::{summarize, AllocationItem, AssetClassSummary, PortfolioSummary};
pub use valuable::Valuable;

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::duration::whole_days;
use crate::error::{Error, Result};
use crate::fx::FxResolver;
use crate::models::{CurrencyCode, EquityHolding, FixedIncomeHolding, Money, PrivateFund, Property};

/// When a stored base-currency value may be reused instead of recomputed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValuationPolicy {
    pub stale_after: Duration,
}

impl ValuationPolicy {
    /// A value computed on `valued_on` is usable for `as_of` when it is not
    /// from the future and no older than `stale_after`.
    pub fn is_fresh(&self, valued_on: NaiveDate, as_of: NaiveDate) -> bool {
        valued_on <= as_of && (as_of - valued_on).num_days() <= whole_days(self.stale_after)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetClass {
    Equities,
    FixedIncome,
    RealEstate,
    PrivateFunds,
}

impl AssetClass {
    pub const ALL: [AssetClass; 4] = [
        AssetClass::Equities,
        AssetClass::FixedIncome,
        AssetClass::RealEstate,
        AssetClass::PrivateFunds,
    ];

    pub fn label(self) -> &'static str {
        match self {
            AssetClass::Equities => "Public Equities",
            AssetClass::FixedIncome => "Fixed Income",
            AssetClass::RealEstate => "Real Estate",
            AssetClass::PrivateFunds => "Private Funds",
        }
    }

    /// Chart color used by report renderers.
    pub fn color(self) -> &'static str {
        match self {
            AssetClass::Equities => "#3B82F6",
            AssetClass::FixedIncome => "#10B981",
            AssetClass::RealEstate => "#F59E0B",
            AssetClass::PrivateFunds => "#8B5CF6",
        }
    }
}

/// Grouping key for exposure breakdowns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Geography,
    Currency,
    Sector,
}

impl Dimension {
    pub fn as_str(self) -> &'static str {
        match self {
            Dimension::Geography => "geography",
            Dimension::Currency => "currency",
            Dimension::Sector => "sector",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dimension {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "geography" => Ok(Dimension::Geography),
            "currency" => Ok(Dimension::Currency),
            "sector" => Ok(Dimension::Sector),
            other => Err(Error::validation(format!(
                "unknown exposure dimension {other:?} (expected geography, currency or sector)"
            ))),
        }
    }
}

/// Snapshot of live aggregates, in discovery order per asset class.
#[derive(Debug, Clone, Default)]
pub struct Portfolio {
    pub equities: Vec<EquityHolding>,
    pub fixed_income: Vec<FixedIncomeHolding>,
    pub properties: Vec<Property>,
    pub funds: Vec<PrivateFund>,
}

impl Portfolio {
    /// Every live holding, equities first, then fixed income, real estate
    /// and private funds.
    pub fn holdings(&self) -> impl Iterator<Item = &dyn Valuable> + '_ {
        let equities = self.equities.iter().map(|h| h as &dyn Valuable);
        let fixed_income = self.fixed_income.iter().map(|h| h as &dyn Valuable);
        let properties = self.properties.iter().map(|p| p as &dyn Valuable);
        let funds = self.funds.iter().map(|f| f as &dyn Valuable);
        equities
            .chain(fixed_income)
            .chain(properties)
            .chain(funds)
            .filter(|h| h.is_live())
    }
}

/// Rates, base currency and staleness policy for one aggregation run.
#[derive(Clone, Copy)]
pub struct ValuationContext<'a> {
    pub fx: &'a dyn FxResolver,
    pub base_currency: &'a CurrencyCode,
    pub as_of: NaiveDate,
    pub policy: ValuationPolicy,
}

impl<'a> ValuationContext<'a> {
    pub fn new(
        fx: &'a dyn FxResolver,
        base_currency: &'a CurrencyCode,
        as_of: NaiveDate,
        policy: ValuationPolicy,
    ) -> Self {
        Self {
            fx,
            base_currency,
            as_of,
            policy,
        }
    }

    pub fn zero(&self) -> Money {
        Money::zero(self.base_currency.clone())
    }

    /// Convert into base currency at `as_of`. Zero converts without a rate.
    pub fn to_base(&self, money: &Money) -> Result<Money> {
        if money.is_zero() {
            return Ok(self.zero());
        }
        self.fx.convert(money, self.base_currency, self.as_of)
    }

    pub fn value_of(&self, holding: &dyn Valuable) -> Result<Money> {
        holding.valuation_of(self.as_of, self.base_currency, self.fx, &self.policy)
    }
}
