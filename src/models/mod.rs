mod actor;
mod currency;
mod equity;
mod fixed_income;
mod id;
mod money;
mod private_fund;
mod rate;
mod real_estate;

pub use actor::{Actor, Role};
pub use currency::CurrencyCode;
pub use equity::{
    CorporateAction, CorporateActionInput, CorporateActionType, Dividend, DividendInput,
    DividendType, EquityHolding, EquityTransaction, EquityTransactionInput, Exchange,
    HoldingStatus, NewEquityHolding, TransactionType,
};
pub use fixed_income::{
    CouponFrequency, FixedIncomeHolding, FixedIncomeStatus, FixedIncomeType,
    NewFixedIncomeHolding,
};
pub use id::Id;
pub use money::{BasisPoints, Money};
pub use private_fund::{
    CapitalCall, CapitalCallInput, Distribution, DistributionInput, DistributionType,
    FundStatus, FundType, FundValuation, FundValuationInput, NewPrivateFund, PrivateFund,
};
pub use rate::{ExchangeRateObservation, RateKey, MANUAL_SOURCE, RATE_SCALE};
pub use real_estate::{
    NewProperty, NewUnit, Property, PropertyType, PropertyValuation, PropertyValuationInput,
    RentalIncome, RentalPeriodInput, Unit, UnitOccupancy, UnitStatus,
};
