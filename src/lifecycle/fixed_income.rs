use chrono::NaiveDate;

use super::{ensure_currency, ensure_non_negative, ensure_positive, EventContext};
use crate::error::{Error, Result};
use crate::models::{FixedIncomeHolding, FixedIncomeStatus, Money};

fn ensure_live(holding: &FixedIncomeHolding) -> Result<()> {
    if holding.is_deleted() {
        return Err(Error::FixedIncomeNotFound(holding.id.clone()));
    }
    Ok(())
}

fn ensure_active(holding: &FixedIncomeHolding, action: &str) -> Result<()> {
    if holding.status.is_terminal() {
        return Err(Error::validation(format!(
            "cannot {action} on a {} instrument",
            holding.status
        )));
    }
    Ok(())
}

/// Store a new market value and its base-currency conversion.
pub fn update_valuation(
    holding: &mut FixedIncomeHolding,
    market_value: Money,
    as_of: NaiveDate,
    ctx: &EventContext<'_>,
) -> Result<()> {
    ensure_live(holding)?;
    ensure_non_negative(&market_value, "market value")?;
    let value_base = ctx.to_base(&market_value, as_of)?;
    holding.current_market_value = Some(market_value);
    holding.current_value_base = Some(value_base);
    holding.valued_on = Some(as_of);
    Ok(())
}

/// Add an accrual entry in the face-value currency.
pub fn record_accrual(holding: &mut FixedIncomeHolding, amount: Money) -> Result<()> {
    ensure_live(holding)?;
    ensure_active(holding, "accrue interest")?;
    ensure_currency(&amount, &holding.face_value.currency)?;
    ensure_positive(&amount, "accrual")?;
    holding.accrued_interest = holding.accrued_interest.checked_add(&amount)?;
    Ok(())
}

/// Book interest actually received. Accrued interest is reduced by the
/// same amount and never goes below zero.
pub fn record_interest_received(
    holding: &mut FixedIncomeHolding,
    amount: Money,
    received_on: NaiveDate,
    ctx: &EventContext<'_>,
) -> Result<()> {
    ensure_live(holding)?;
    ensure_currency(&amount, &holding.face_value.currency)?;
    ensure_positive(&amount, "interest received")?;

    let amount_base = ctx.to_base(&amount, received_on)?;
    let total = holding.total_interest_received.checked_add(&amount)?;
    let total_base = holding.interest_received_base.checked_add(&amount_base)?;
    let remaining = holding.accrued_interest.checked_sub(&amount)?;

    holding.total_interest_received = total;
    holding.interest_received_base = total_base;
    holding.accrued_interest = if remaining.is_negative() {
        Money::zero(remaining.currency)
    } else {
        remaining
    };
    Ok(())
}

/// Move an active instrument into a terminal status.
pub fn transition_status(holding: &mut FixedIncomeHolding, to: FixedIncomeStatus) -> Result<()> {
    ensure_live(holding)?;
    if holding.status.is_terminal() || !to.is_terminal() {
        return Err(Error::InvalidStatusTransition {
            entity: "fixed_income",
            from: holding.status.to_string(),
            to: to.to_string(),
        });
    }
    holding.status = to;
    Ok(())
}
