use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{BasisPoints, CurrencyCode, Id, Money};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixedIncomeType {
    CorporateBond,
    GovernmentBond,
    Sukuk,
    FixedIncomeFund,
    Treasury,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CouponFrequency {
    Annual,
    SemiAnnual,
    Quarterly,
    Monthly,
}

impl CouponFrequency {
    pub fn periods_per_year(self) -> i64 {
        match self {
            CouponFrequency::Annual => 1,
            CouponFrequency::SemiAnnual => 2,
            CouponFrequency::Quarterly => 4,
            CouponFrequency::Monthly => 12,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixedIncomeStatus {
    Active,
    Matured,
    Sold,
    Defaulted,
}

impl FixedIncomeStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, FixedIncomeStatus::Active)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FixedIncomeStatus::Active => "active",
            FixedIncomeStatus::Matured => "matured",
            FixedIncomeStatus::Sold => "sold",
            FixedIncomeStatus::Defaulted => "defaulted",
        }
    }
}

impl fmt::Display for FixedIncomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewFixedIncomeHolding {
    pub name: String,
    #[serde(default)]
    pub isin: Option<String>,
    pub instrument_type: FixedIncomeType,
    #[serde(default)]
    pub issuer: Option<String>,
    pub face_value: Money,
    pub purchase_price: Money,
    pub purchase_date: NaiveDate,
    #[serde(default)]
    pub coupon_rate: Option<BasisPoints>,
    #[serde(default)]
    pub coupon_frequency: Option<CouponFrequency>,
    #[serde(default)]
    pub maturity_date: Option<NaiveDate>,
    #[serde(default)]
    pub expected_return: Option<BasisPoints>,
    #[serde(default)]
    pub management_fee: Option<BasisPoints>,
    #[serde(default)]
    pub is_exchange_traded: bool,
    #[serde(default)]
    pub notes: Option<String>,
}

/// A single bond, sukuk or fund position. Changed only by valuation
/// updates, interest entries and status transitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedIncomeHolding {
    pub id: Id,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isin: Option<String>,
    pub instrument_type: FixedIncomeType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
    pub face_value: Money,
    pub purchase_price: Money,
    pub purchase_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coupon_rate: Option<BasisPoints>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coupon_frequency: Option<CouponFrequency>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maturity_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub irr: Option<BasisPoints>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_return: Option<BasisPoints>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub management_fee: Option<BasisPoints>,
    #[serde(default)]
    pub is_exchange_traded: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) current_market_value: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) current_value_base: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) valued_on: Option<NaiveDate>,
    pub(crate) status: FixedIncomeStatus,
    /// In the face-value currency.
    pub(crate) accrued_interest: Money,
    /// In the face-value currency.
    pub(crate) total_interest_received: Money,
    /// Interest received, converted into base currency on receipt.
    pub(crate) interest_received_base: Money,

    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) deleted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub(crate) version: u64,
}

impl FixedIncomeHolding {
    pub fn new(
        input: NewFixedIncomeHolding,
        base_currency: &CurrencyCode,
        now: DateTime<Utc>,
    ) -> Self {
        let face_currency = input.face_value.currency.clone();
        Self {
            id: Id::new(),
            name: input.name,
            isin: input.isin,
            instrument_type: input.instrument_type,
            issuer: input.issuer,
            face_value: input.face_value,
            purchase_price: input.purchase_price,
            purchase_date: input.purchase_date,
            coupon_rate: input.coupon_rate,
            coupon_frequency: input.coupon_frequency,
            maturity_date: input.maturity_date,
            irr: None,
            expected_return: input.expected_return,
            management_fee: input.management_fee,
            is_exchange_traded: input.is_exchange_traded,
            notes: input.notes,
            current_market_value: None,
            current_value_base: None,
            valued_on: None,
            status: FixedIncomeStatus::Active,
            accrued_interest: Money::zero(face_currency.clone()),
            total_interest_received: Money::zero(face_currency),
            interest_received_base: Money::zero(base_currency.clone()),
            created_at: now,
            deleted_at: None,
            version: 0,
        }
    }

    pub fn status(&self) -> FixedIncomeStatus {
        self.status
    }

    pub fn current_market_value(&self) -> Option<&Money> {
        self.current_market_value.as_ref()
    }

    pub fn current_value_base(&self) -> Option<&Money> {
        self.current_value_base.as_ref()
    }

    pub fn valued_on(&self) -> Option<NaiveDate> {
        self.valued_on
    }

    pub fn accrued_interest(&self) -> &Money {
        &self.accrued_interest
    }

    pub fn total_interest_received(&self) -> &Money {
        &self.total_interest_received
    }

    pub fn interest_received_base(&self) -> &Money {
        &self.interest_received_base
    }

    /// Coupon paid per period in the face-value currency, floored.
    pub fn coupon_per_period(&self) -> Option<Money> {
        let rate = self.coupon_rate?;
        let periods = self.coupon_frequency?.periods_per_year();
        let annual = i128::from(self.face_value.amount) * i128::from(rate.0)
            / i128::from(BasisPoints::FULL.0);
        let amount = i64::try_from(annual.div_euclid(i128::from(periods))).ok()?;
        Some(Money::new(amount, self.face_value.currency.clone()))
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }

    pub fn version(&self) -> u64 {
        self.version
    }
}
