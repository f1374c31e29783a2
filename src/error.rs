//! Error types for the valuation and lifecycle engine.
//!
//! Every failure is returned to the caller as a typed result. Rate lookups
//! that fail during a mutation abort the whole mutation; nothing is ever
//! defaulted to a 1:1 conversion.

use chrono::NaiveDate;
use thiserror::Error;

use crate::models::{CurrencyCode, Id, Role};
use crate::storage::StorageError;

pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of [`Error`] variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvalidState,
    Validation,
    Overflow,
    CurrencyMismatch,
    Forbidden,
    Conflict,
    Storage,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Equity holding not found: {0}")]
    HoldingNotFound(Id),

    #[error("Fixed income holding not found: {0}")]
    FixedIncomeNotFound(Id),

    #[error("Property not found: {0}")]
    PropertyNotFound(Id),

    #[error("Unit not found: {0}")]
    UnitNotFound(Id),

    #[error("Rental period {period_id} not found for unit {unit_id}")]
    RentalPeriodNotFound { unit_id: Id, period_id: Id },

    #[error("Private fund not found: {0}")]
    FundNotFound(Id),

    #[error("Capital call {call_id} not found in fund {fund_id}")]
    CallNotFound { fund_id: Id, call_id: Id },

    #[error("Distribution {distribution_id} not found in fund {fund_id}")]
    DistributionNotFound { fund_id: Id, distribution_id: Id },

    #[error("Exchange rate observation not found: {0}")]
    RateObservationNotFound(Id),

    #[error("No exchange rate found for {from}->{to} on or before {date}")]
    RateNotFound {
        from: CurrencyCode,
        to: CurrencyCode,
        date: NaiveDate,
    },

    #[error("Capital call already paid: {0}")]
    AlreadyPaid(Id),

    #[error("Distribution already received: {0}")]
    AlreadyReceived(Id),

    #[error("Rental period already collected: {0}")]
    AlreadyCollected(Id),

    #[error("Cannot move {entity} from {from} to {to}")]
    InvalidStatusTransition {
        entity: &'static str,
        from: String,
        to: String,
    },

    #[error("Invalid transaction type: {0:?} (expected BUY or SELL)")]
    InvalidTransactionType(String),

    #[error("Insufficient quantity: holding has {held}, sell requested {requested}")]
    InsufficientQuantity { held: i64, requested: i64 },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Currency '{0}' is not supported")]
    UnsupportedCurrency(String),

    #[error("Fixed-point arithmetic overflow")]
    Overflow,

    #[error("Currency mismatch: {left} vs {right}")]
    CurrencyMismatch {
        left: CurrencyCode,
        right: CurrencyCode,
    },

    #[error("Role {role} may not {action}")]
    Forbidden { role: Role, action: &'static str },

    #[error("Concurrent modification of {entity} {id}, reload and retry")]
    Conflict { entity: &'static str, id: Id },

    #[error("Storage error: {0}")]
    Storage(anyhow::Error),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::HoldingNotFound(_)
            | Error::FixedIncomeNotFound(_)
            | Error::PropertyNotFound(_)
            | Error::UnitNotFound(_)
            | Error::RentalPeriodNotFound { .. }
            | Error::FundNotFound(_)
            | Error::CallNotFound { .. }
            | Error::DistributionNotFound { .. }
            | Error::RateObservationNotFound(_)
            | Error::RateNotFound { .. } => ErrorKind::NotFound,
            Error::AlreadyPaid(_)
            | Error::AlreadyReceived(_)
            | Error::AlreadyCollected(_)
            | Error::InvalidStatusTransition { .. } => ErrorKind::InvalidState,
            Error::InvalidTransactionType(_)
            | Error::InsufficientQuantity { .. }
            | Error::Validation(_)
            | Error::UnsupportedCurrency(_) => ErrorKind::Validation,
            Error::Overflow => ErrorKind::Overflow,
            Error::CurrencyMismatch { .. } => ErrorKind::CurrencyMismatch,
            Error::Forbidden { .. } => ErrorKind::Forbidden,
            Error::Conflict { .. } => ErrorKind::Conflict,
            Error::Storage(_) => ErrorKind::Storage,
        }
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Error::Validation(message.into())
    }
}

impl From<StorageError> for Error {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Conflict { entity, id } => Error::Conflict { entity, id },
            StorageError::Io(e) => Error::Storage(e.into()),
            StorageError::Serde(e) => Error::Storage(e.into()),
            StorageError::Backend(e) => Error::Storage(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monotonic_guards_are_invalid_state() {
        assert_eq!(Error::AlreadyPaid(Id::from("c1")).kind(), ErrorKind::InvalidState);
        assert_eq!(
            Error::AlreadyReceived(Id::from("d1")).kind(),
            ErrorKind::InvalidState
        );
        assert_eq!(
            Error::AlreadyCollected(Id::from("p1")).kind(),
            ErrorKind::InvalidState
        );
    }

    #[test]
    fn rate_not_found_message_names_pair_and_date() {
        let err = Error::RateNotFound {
            from: CurrencyCode::kwd(),
            to: CurrencyCode::usd(),
            date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
        };
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(
            err.to_string(),
            "No exchange rate found for KWD->USD on or before 2024-01-02"
        );
    }

    #[test]
    fn storage_conflict_maps_to_conflict_kind() {
        let err: Error = StorageError::Conflict {
            entity: "private_fund",
            id: Id::from("f1"),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }
}
