use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{BasisPoints, CurrencyCode, Id, Money};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FundType {
    PrivateEquity,
    VentureCapital,
    HedgeFund,
    RealEstateFund,
    Infrastructure,
    DirectInvestment,
    CoInvestment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FundStatus {
    Active,
    FullyRealized,
    PartiallyRealized,
    WrittenOff,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistributionType {
    ReturnOfCapital,
    Profit,
    Dividend,
}

/// A request for committed capital. `is_paid` flips once, false to true.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapitalCall {
    pub id: Id,
    pub call_number: u32,
    pub call_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    pub amount: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Amount in the commitment currency, fixed on the call date.
    pub(crate) amount_commitment: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) payment_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) amount_base: Option<Money>,
    pub(crate) is_paid: bool,
}

impl CapitalCall {
    pub fn amount_commitment(&self) -> &Money {
        &self.amount_commitment
    }

    pub fn is_paid(&self) -> bool {
        self.is_paid
    }

    pub fn payment_date(&self) -> Option<NaiveDate> {
        self.payment_date
    }

    pub fn amount_base(&self) -> Option<&Money> {
        self.amount_base.as_ref()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapitalCallInput {
    pub call_date: NaiveDate,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    pub amount: Money,
    #[serde(default)]
    pub purpose: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// A payout of proceeds. `is_received` flips once, false to true.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Distribution {
    pub id: Id,
    pub distribution_number: u32,
    pub declaration_date: NaiveDate,
    pub amount: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distribution_type: Option<DistributionType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Amount in the commitment currency, fixed at declaration.
    pub(crate) amount_commitment: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) payment_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) amount_base: Option<Money>,
    pub(crate) is_received: bool,
}

impl Distribution {
    pub fn is_received(&self) -> bool {
        self.is_received
    }

    pub fn payment_date(&self) -> Option<NaiveDate> {
        self.payment_date
    }

    pub fn amount_base(&self) -> Option<&Money> {
        self.amount_base.as_ref()
    }

    pub fn amount_commitment(&self) -> &Money {
        &self.amount_commitment
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistributionInput {
    pub declaration_date: NaiveDate,
    pub amount: Money,
    #[serde(default)]
    pub distribution_type: Option<DistributionType>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundValuation {
    pub id: Id,
    pub valuation_date: NaiveDate,
    pub nav: Money,
    pub nav_base: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub irr: Option<BasisPoints>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundValuationInput {
    pub valuation_date: NaiveDate,
    pub nav: Money,
    #[serde(default)]
    pub irr: Option<BasisPoints>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPrivateFund {
    pub name: String,
    pub fund_type: FundType,
    #[serde(default)]
    pub fund_manager: Option<String>,
    #[serde(default)]
    pub vintage_year: Option<i32>,
    #[serde(default)]
    pub geography: Option<String>,
    #[serde(default)]
    pub sector: Option<String>,
    pub committed_capital: Money,
    #[serde(default)]
    pub management_fee: Option<BasisPoints>,
    #[serde(default)]
    pub carried_interest: Option<BasisPoints>,
    #[serde(default)]
    pub fund_term_years: Option<u32>,
    #[serde(default)]
    pub investment_period_end: Option<NaiveDate>,
    #[serde(default)]
    pub fund_end_date: Option<NaiveDate>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// A fund commitment with its capital calls, distributions and NAV history.
///
/// Running totals are kept in the commitment currency and only move when a
/// call is settled or a distribution is declared or received.
/// `uncalled_capital == committed_capital - called_capital` at all times.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateFund {
    pub id: Id,
    pub name: String,
    pub fund_type: FundType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fund_manager: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vintage_year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geography: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sector: Option<String>,
    pub committed_capital: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub irr: Option<BasisPoints>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub management_fee: Option<BasisPoints>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carried_interest: Option<BasisPoints>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fund_term_years: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub investment_period_end: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fund_end_date: Option<NaiveDate>,
    pub status: FundStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    pub(crate) called_capital: Money,
    pub(crate) uncalled_capital: Money,
    pub(crate) distributions_declared: Money,
    pub(crate) distributions_received: Money,
    /// Distributions received, converted into base currency on receipt.
    pub(crate) distributions_received_base: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) current_nav: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) current_nav_base: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) nav_date: Option<NaiveDate>,

    #[serde(default)]
    pub(crate) capital_calls: Vec<CapitalCall>,
    #[serde(default)]
    pub(crate) distributions: Vec<Distribution>,
    #[serde(default)]
    pub(crate) valuations: Vec<FundValuation>,

    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) deleted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub(crate) version: u64,
}

impl PrivateFund {
    pub fn new(input: NewPrivateFund, base_currency: &CurrencyCode, now: DateTime<Utc>) -> Self {
        let currency = input.committed_capital.currency.clone();
        Self {
            id: Id::new(),
            name: input.name,
            fund_type: input.fund_type,
            fund_manager: input.fund_manager,
            vintage_year: input.vintage_year,
            geography: input.geography,
            sector: input.sector,
            uncalled_capital: input.committed_capital.clone(),
            committed_capital: input.committed_capital,
            irr: None,
            management_fee: input.management_fee,
            carried_interest: input.carried_interest,
            fund_term_years: input.fund_term_years,
            investment_period_end: input.investment_period_end,
            fund_end_date: input.fund_end_date,
            status: FundStatus::Active,
            notes: input.notes,
            called_capital: Money::zero(currency.clone()),
            distributions_declared: Money::zero(currency.clone()),
            distributions_received: Money::zero(currency),
            distributions_received_base: Money::zero(base_currency.clone()),
            current_nav: None,
            current_nav_base: None,
            nav_date: None,
            capital_calls: Vec::new(),
            distributions: Vec::new(),
            valuations: Vec::new(),
            created_at: now,
            deleted_at: None,
            version: 0,
        }
    }

    pub fn commitment_currency(&self) -> &CurrencyCode {
        &self.committed_capital.currency
    }

    pub fn called_capital(&self) -> &Money {
        &self.called_capital
    }

    pub fn uncalled_capital(&self) -> &Money {
        &self.uncalled_capital
    }

    pub fn distributions_declared(&self) -> &Money {
        &self.distributions_declared
    }

    pub fn distributions_received(&self) -> &Money {
        &self.distributions_received
    }

    pub fn distributions_received_base(&self) -> &Money {
        &self.distributions_received_base
    }

    pub fn current_nav(&self) -> Option<&Money> {
        self.current_nav.as_ref()
    }

    pub fn current_nav_base(&self) -> Option<&Money> {
        self.current_nav_base.as_ref()
    }

    pub fn nav_date(&self) -> Option<NaiveDate> {
        self.nav_date
    }

    pub fn capital_calls(&self) -> &[CapitalCall] {
        &self.capital_calls
    }

    pub fn capital_call(&self, call_id: &Id) -> Option<&CapitalCall> {
        self.capital_calls.iter().find(|c| &c.id == call_id)
    }

    pub fn distributions(&self) -> &[Distribution] {
        &self.distributions
    }

    pub fn distribution(&self, distribution_id: &Id) -> Option<&Distribution> {
        self.distributions.iter().find(|d| &d.id == distribution_id)
    }

    pub fn valuations(&self) -> &[FundValuation] {
        &self.valuations
    }

    /// Distributions to paid-in capital in basis points. None before any call settles.
    pub fn dpi(&self) -> Option<BasisPoints> {
        ratio_bps(self.distributions_received.amount, self.called_capital.amount)
    }

    /// Total value to paid-in capital in basis points, using the NAV when it
    /// is in the commitment currency.
    pub fn tvpi(&self) -> Option<BasisPoints> {
        let nav = self
            .current_nav
            .as_ref()
            .filter(|nav| nav.currency == self.committed_capital.currency)
            .map(|nav| nav.amount)
            .unwrap_or(0);
        let total = nav.checked_add(self.distributions_received.amount)?;
        ratio_bps(total, self.called_capital.amount)
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

fn ratio_bps(numerator: i64, denominator: i64) -> Option<BasisPoints> {
    if denominator <= 0 {
        return None;
    }
    let bps = i128::from(numerator) * i128::from(BasisPoints::FULL.0) / i128::from(denominator);
    i32::try_from(bps).ok().map(BasisPoints)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fund() -> PrivateFund {
        PrivateFund::new(
            NewPrivateFund {
                name: "Gulf Growth Fund III".to_string(),
                fund_type: FundType::PrivateEquity,
                fund_manager: Some("Gulf Capital".to_string()),
                vintage_year: Some(2022),
                geography: Some("GCC".to_string()),
                sector: None,
                committed_capital: Money::new(50_000_000, CurrencyCode::usd()),
                management_fee: Some(BasisPoints(200)),
                carried_interest: Some(BasisPoints(2_000)),
                fund_term_years: Some(10),
                investment_period_end: None,
                fund_end_date: None,
                notes: None,
            },
            &CurrencyCode::kwd(),
            Utc::now(),
        )
    }

    #[test]
    fn new_fund_has_everything_uncalled() {
        let fund = fund();
        assert_eq!(fund.uncalled_capital(), &fund.committed_capital);
        assert!(fund.called_capital().is_zero());
        assert_eq!(fund.distributions_received_base().currency, CurrencyCode::kwd());
    }

    #[test]
    fn multiples_need_called_capital() {
        let mut fund = fund();
        assert_eq!(fund.dpi(), None);
        assert_eq!(fund.tvpi(), None);

        fund.called_capital.amount = 10_000_000;
        fund.distributions_received.amount = 5_000_000;
        fund.current_nav = Some(Money::new(12_000_000, CurrencyCode::usd()));
        assert_eq!(fund.dpi(), Some(BasisPoints(5_000)));
        assert_eq!(fund.tvpi(), Some(BasisPoints(17_000)));
    }
}
