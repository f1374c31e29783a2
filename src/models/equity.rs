use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{CurrencyCode, Id, Money};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Exchange {
    Nyse,
    Nasdaq,
    Lse,
    BoursaKuwait,
    Tadawul,
    Dfm,
    Adx,
    Qse,
    Bahrain,
    Muscat,
    Egx,
    Euronext,
    Hkex,
    Tse,
    Other,
}

/// Display status of a position, always derived from quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HoldingStatus {
    Open,
    Partial,
    Closed,
}

impl HoldingStatus {
    /// `0` is closed, strictly between zero and the historical maximum is
    /// partial, anything else is open.
    pub fn derive(quantity: i64, max_quantity: i64) -> Self {
        if quantity == 0 {
            HoldingStatus::Closed
        } else if quantity > 0 && quantity < max_quantity {
            HoldingStatus::Partial
        } else {
            HoldingStatus::Open
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Buy,
    Sell,
}

impl TransactionType {
    pub fn sign(self) -> i64 {
        match self {
            TransactionType::Buy => 1,
            TransactionType::Sell => -1,
        }
    }
}

impl FromStr for TransactionType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "BUY" => Ok(TransactionType::Buy),
            "SELL" => Ok(TransactionType::Sell),
            _ => Err(Error::InvalidTransactionType(s.to_string())),
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionType::Buy => f.write_str("BUY"),
            TransactionType::Sell => f.write_str("SELL"),
        }
    }
}

/// A buy or sell event. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquityTransaction {
    pub id: Id,
    pub transaction_type: TransactionType,
    pub quantity: i64,
    /// Per-share price.
    pub price: Money,
    /// Fees in the price currency.
    pub fees: Money,
    /// `quantity * price + fees`, in the price currency.
    pub total_amount: Money,
    /// `total_amount` converted into the base currency on the transaction date.
    pub total_amount_base: Money,
    pub transaction_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl EquityTransaction {
    pub fn signed_quantity(&self) -> i64 {
        self.transaction_type.sign() * self.quantity
    }
}

/// Caller-supplied transaction. The type arrives unvalidated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EquityTransactionInput {
    pub transaction_type: String,
    pub quantity: i64,
    pub price: Money,
    #[serde(default)]
    pub fees_amount: i64,
    pub transaction_date: NaiveDate,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DividendType {
    Cash,
    Stock,
    Special,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dividend {
    pub id: Id,
    pub amount: Money,
    pub amount_base: Money,
    pub ex_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_date: Option<NaiveDate>,
    pub dividend_type: DividendType,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DividendInput {
    pub amount: Money,
    pub ex_date: NaiveDate,
    #[serde(default)]
    pub payment_date: Option<NaiveDate>,
    pub dividend_type: DividendType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorporateActionType {
    BonusShares,
    RightsIssue,
    StockSplit,
    ReverseSplit,
    Spinoff,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorporateAction {
    pub id: Id,
    pub action_type: CorporateActionType,
    pub action_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ratio_from: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ratio_to: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shares_received: Option<i64>,
    pub quantity_before: i64,
    pub quantity_after: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorporateActionInput {
    pub action_type: CorporateActionType,
    pub action_date: NaiveDate,
    #[serde(default)]
    pub ratio_from: Option<i64>,
    #[serde(default)]
    pub ratio_to: Option<i64>,
    #[serde(default)]
    pub shares_received: Option<i64>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Descriptive fields for a new equity position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEquityHolding {
    pub ticker: String,
    pub name: String,
    pub exchange: Exchange,
    #[serde(default)]
    pub sector: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    pub cost_basis_currency: CurrencyCode,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Aggregate position in one ticker.
///
/// Quantity, cost basis, gains and status are only changed through the
/// lifecycle operations in [`crate::lifecycle::equity`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquityHolding {
    pub id: Id,
    pub ticker: String,
    pub name: String,
    pub exchange: Exchange,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sector: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    pub(crate) quantity: i64,
    pub(crate) max_quantity: i64,
    pub(crate) cost_basis: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) current_price: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) current_value_base: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) valued_on: Option<NaiveDate>,
    pub(crate) realized_gain_loss: Money,
    pub(crate) unrealized_gain_loss: Money,
    pub(crate) dividends_received: Money,
    pub(crate) status: HoldingStatus,

    #[serde(default)]
    pub(crate) transactions: Vec<EquityTransaction>,
    #[serde(default)]
    pub(crate) dividends: Vec<Dividend>,
    #[serde(default)]
    pub(crate) corporate_actions: Vec<CorporateAction>,

    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) deleted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub(crate) version: u64,
}

impl EquityHolding {
    pub fn new(input: NewEquityHolding, base_currency: &CurrencyCode, now: DateTime<Utc>) -> Self {
        Self {
            id: Id::new(),
            ticker: input.ticker.trim().to_uppercase(),
            name: input.name,
            exchange: input.exchange,
            sector: input.sector,
            country: input.country,
            notes: input.notes,
            quantity: 0,
            max_quantity: 0,
            cost_basis: Money::zero(input.cost_basis_currency),
            current_price: None,
            current_value_base: None,
            valued_on: None,
            realized_gain_loss: Money::zero(base_currency.clone()),
            unrealized_gain_loss: Money::zero(base_currency.clone()),
            dividends_received: Money::zero(base_currency.clone()),
            status: HoldingStatus::Closed,
            transactions: Vec::new(),
            dividends: Vec::new(),
            corporate_actions: Vec::new(),
            created_at: now,
            deleted_at: None,
            version: 0,
        }
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn max_quantity(&self) -> i64 {
        self.max_quantity
    }

    pub fn status(&self) -> HoldingStatus {
        self.status
    }

    pub fn cost_basis(&self) -> &Money {
        &self.cost_basis
    }

    pub fn current_price(&self) -> Option<&Money> {
        self.current_price.as_ref()
    }

    pub fn current_value_base(&self) -> Option<&Money> {
        self.current_value_base.as_ref()
    }

    pub fn valued_on(&self) -> Option<NaiveDate> {
        self.valued_on
    }

    pub fn realized_gain_loss(&self) -> &Money {
        &self.realized_gain_loss
    }

    pub fn unrealized_gain_loss(&self) -> &Money {
        &self.unrealized_gain_loss
    }

    pub fn dividends_received(&self) -> &Money {
        &self.dividends_received
    }

    pub fn transactions(&self) -> &[EquityTransaction] {
        &self.transactions
    }

    pub fn dividends(&self) -> &[Dividend] {
        &self.dividends
    }

    pub fn corporate_actions(&self) -> &[CorporateAction] {
        &self.corporate_actions
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

    /// Currency the position is quoted in: price currency once priced,
    /// otherwise the cost-basis currency.
    pub fn quote_currency(&self) -> &CurrencyCode {
        self.current_price
            .as_ref()
            .map(|p| &p.currency)
            .unwrap_or(&self.cost_basis.currency)
    }

    /// Set quantity and keep the historical maximum and status in step.
    pub(crate) fn set_quantity(&mut self, quantity: i64) {
        self.quantity = quantity;
        self.max_quantity = self.max_quantity.max(quantity);
        self.status = HoldingStatus::derive(self.quantity, self.max_quantity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_derivation() {
        assert_eq!(HoldingStatus::derive(0, 100), HoldingStatus::Closed);
        assert_eq!(HoldingStatus::derive(40, 100), HoldingStatus::Partial);
        assert_eq!(HoldingStatus::derive(100, 100), HoldingStatus::Open);
        assert_eq!(HoldingStatus::derive(-10, 100), HoldingStatus::Open);
    }

    #[test]
    fn transaction_type_parsing() {
        assert_eq!("buy".parse::<TransactionType>().unwrap(), TransactionType::Buy);
        assert_eq!("SELL".parse::<TransactionType>().unwrap(), TransactionType::Sell);
        assert!(matches!(
            "SHORT".parse::<TransactionType>(),
            Err(Error::InvalidTransactionType(t)) if t == "SHORT"
        ));
    }

    #[test]
    fn exchange_serializes_upper_snake() {
        let json = serde_json::to_string(&Exchange::BoursaKuwait).unwrap();
        assert_eq!(json, "\"BOURSA_KUWAIT\"");
    }

    #[test]
    fn new_holding_is_closed_and_empty() {
        let holding = EquityHolding::new(
            NewEquityHolding {
                ticker: " nbk ".to_string(),
                name: "National Bank of Kuwait".to_string(),
                exchange: Exchange::BoursaKuwait,
                sector: Some("Banking".to_string()),
                country: Some("Kuwait".to_string()),
                cost_basis_currency: CurrencyCode::kwd(),
                notes: None,
            },
            &CurrencyCode::kwd(),
            Utc::now(),
        );
        assert_eq!(holding.ticker, "NBK");
        assert_eq!(holding.quantity(), 0);
        assert_eq!(holding.status(), HoldingStatus::Closed);
        assert!(holding.cost_basis().is_zero());
    }
}
