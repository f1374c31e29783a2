//! Buy/sell, dividend, corporate-action and pricing events on an equity position.
//!
//! Cost basis uses average cost: a buy adds the converted transaction total,
//! a sell removes the proportional share of the current cost basis.

use chrono::NaiveDate;
use tracing::debug;

use super::{ensure_non_negative, ensure_positive, EventContext};
use crate::error::{Error, Result};
use crate::models::{
    CorporateAction, CorporateActionInput, CorporateActionType, Dividend, DividendInput,
    EquityHolding, EquityTransaction, EquityTransactionInput, Id, Money, TransactionType,
};

/// Short-sale policy for sells.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EquityPolicy {
    /// When false a sell may not take quantity below zero.
    pub allow_short_sales: bool,
}

fn ensure_live(holding: &EquityHolding) -> Result<()> {
    if holding.is_deleted() {
        return Err(Error::HoldingNotFound(holding.id.clone()));
    }
    Ok(())
}

/// `floor(amount * numerator / denominator)` without intermediate overflow.
fn scale(amount: i64, numerator: i64, denominator: i64) -> Result<i64> {
    if denominator == 0 {
        return Err(Error::validation("scale denominator must not be zero"));
    }
    let scaled = (i128::from(amount) * i128::from(numerator)).div_euclid(i128::from(denominator));
    i64::try_from(scaled).map_err(|_| Error::Overflow)
}

/// `ceil(amount * numerator / denominator)` for a positive `denominator`.
fn scale_up(amount: i64, numerator: i64, denominator: i64) -> Result<i64> {
    if denominator <= 0 {
        return Err(Error::validation("scale denominator must be positive"));
    }
    let product = i128::from(amount) * i128::from(numerator);
    let denominator = i128::from(denominator);
    let scaled = -(-product).div_euclid(denominator);
    i64::try_from(scaled).map_err(|_| Error::Overflow)
}

/// Apply a BUY or SELL to the holding and return the recorded transaction.
pub fn apply_transaction(
    holding: &mut EquityHolding,
    input: EquityTransactionInput,
    policy: EquityPolicy,
    ctx: &EventContext<'_>,
) -> Result<EquityTransaction> {
    ensure_live(holding)?;
    let transaction_type: TransactionType = input.transaction_type.parse()?;
    if input.quantity <= 0 {
        return Err(Error::validation(format!(
            "transaction quantity must be positive, got {}",
            input.quantity
        )));
    }
    ensure_non_negative(&input.price, "price")?;
    if input.fees_amount < 0 {
        return Err(Error::validation(format!(
            "fees must not be negative, got {}",
            input.fees_amount
        )));
    }

    let held = holding.quantity;
    let signed = transaction_type.sign() * input.quantity;
    let new_quantity = held.checked_add(signed).ok_or(Error::Overflow)?;
    if transaction_type == TransactionType::Sell && !policy.allow_short_sales && new_quantity < 0 {
        return Err(Error::InsufficientQuantity {
            held,
            requested: input.quantity,
        });
    }

    let date = input.transaction_date;
    let gross = input.price.checked_mul(input.quantity)?;
    let fees = Money::new(input.fees_amount, input.price.currency.clone());
    let total_amount = gross.checked_add(&fees)?;
    let total_amount_base = ctx.to_base(&total_amount, date)?;

    let (cost_basis, realized) = match transaction_type {
        TransactionType::Buy => {
            let cost = holding
                .cost_basis
                .add_converted(&total_amount, ctx.fx, date)?;
            (cost, holding.realized_gain_loss.clone())
        }
        TransactionType::Sell => {
            let sold_from_position = input.quantity.min(held.max(0));
            let removed_amount = if held > 0 {
                scale(holding.cost_basis.amount, sold_from_position, held)?
            } else {
                0
            };
            let removed = Money::new(removed_amount, holding.cost_basis.currency.clone());
            let net_proceeds = gross.checked_sub(&fees)?;
            let gain = ctx
                .to_base(&net_proceeds, date)?
                .sub_converted(&removed, ctx.fx, date)?;
            (
                holding.cost_basis.checked_sub(&removed)?,
                holding.realized_gain_loss.checked_add(&gain)?,
            )
        }
    };

    let transaction = EquityTransaction {
        id: Id::new(),
        transaction_type,
        quantity: input.quantity,
        price: input.price,
        fees,
        total_amount,
        total_amount_base,
        transaction_date: date,
        notes: input.notes,
        created_at: ctx.now,
    };

    let mut next = holding.clone();
    next.cost_basis = cost_basis;
    next.realized_gain_loss = realized;
    next.set_quantity(new_quantity);
    next.transactions.push(transaction.clone());
    if let Some(valued_on) = next.valued_on {
        revalue(&mut next, valued_on.max(date), ctx)?;
    }
    *holding = next;

    debug!(
        holding_id = %holding.id,
        ticker = %holding.ticker,
        transaction_type = %transaction.transaction_type,
        quantity = transaction.quantity,
        new_quantity = holding.quantity,
        status = ?holding.status,
        "equity transaction applied"
    );
    Ok(transaction)
}

/// Record a dividend. Quantity is unchanged; the base-currency amount feeds income.
pub fn record_dividend(
    holding: &mut EquityHolding,
    input: DividendInput,
    ctx: &EventContext<'_>,
) -> Result<Dividend> {
    ensure_live(holding)?;
    ensure_positive(&input.amount, "dividend amount")?;
    let on = input.payment_date.unwrap_or(input.ex_date);
    let amount_base = ctx.to_base(&input.amount, on)?;
    let received = holding.dividends_received.checked_add(&amount_base)?;

    let dividend = Dividend {
        id: Id::new(),
        amount: input.amount,
        amount_base,
        ex_date: input.ex_date,
        payment_date: input.payment_date,
        dividend_type: input.dividend_type,
        created_at: ctx.now,
    };
    holding.dividends_received = received;
    holding.dividends.push(dividend.clone());
    Ok(dividend)
}

fn required_ratio(input: &CorporateActionInput) -> Result<(i64, i64)> {
    match (input.ratio_from, input.ratio_to) {
        (Some(from), Some(to)) if from > 0 && to > 0 => Ok((from, to)),
        _ => Err(Error::validation(format!(
            "{:?} requires positive ratio_from and ratio_to",
            input.action_type
        ))),
    }
}

/// Quantity after applying `to/from`, which must divide evenly.
fn split_quantity(quantity: i64, from: i64, to: i64) -> Result<i64> {
    let product = i128::from(quantity) * i128::from(to);
    if product % i128::from(from) != 0 {
        return Err(Error::validation(format!(
            "ratio {to}:{from} does not divide quantity {quantity} evenly"
        )));
    }
    i64::try_from(product / i128::from(from)).map_err(|_| Error::Overflow)
}

/// Record a corporate action, reconciling quantity where the action changes it.
///
/// Splits keep total cost basis, so cost per share scales by `from/to`.
/// The last price scales by `from/to` too, floored to the minor unit, and the
/// high-water quantity is rounded up so a partial position stays partial.
/// Bonus and rights shares are added from `shares_received`; a bonus issue
/// given only as a ratio is applied like a split. Spinoffs are recorded only.
pub fn record_corporate_action(
    holding: &mut EquityHolding,
    input: CorporateActionInput,
    ctx: &EventContext<'_>,
) -> Result<CorporateAction> {
    ensure_live(holding)?;
    let before = holding.quantity;

    let mut max_quantity = holding.max_quantity;
    let mut current_price = holding.current_price.clone();
    let after = match input.action_type {
        CorporateActionType::StockSplit | CorporateActionType::ReverseSplit => {
            let (from, to) = required_ratio(&input)?;
            match input.action_type {
                CorporateActionType::StockSplit if to <= from => {
                    return Err(Error::validation(format!(
                        "stock split ratio {to}:{from} must increase the share count"
                    )));
                }
                CorporateActionType::ReverseSplit if to >= from => {
                    return Err(Error::validation(format!(
                        "reverse split ratio {to}:{from} must decrease the share count"
                    )));
                }
                _ => {}
            }
            max_quantity = scale_up(max_quantity, to, from)?;
            if let Some(price) = current_price.as_mut() {
                price.amount = scale(price.amount, from, to)?;
            }
            split_quantity(before, from, to)?
        }
        CorporateActionType::BonusShares | CorporateActionType::RightsIssue => {
            match (input.shares_received, input.action_type) {
                (Some(shares), _) if shares > 0 => {
                    before.checked_add(shares).ok_or(Error::Overflow)?
                }
                (Some(shares), _) => {
                    return Err(Error::validation(format!(
                        "shares_received must be positive, got {shares}"
                    )));
                }
                (None, CorporateActionType::BonusShares) => {
                    let (from, to) = required_ratio(&input)?;
                    let bonus = scale(before, to, from)?;
                    before.checked_add(bonus).ok_or(Error::Overflow)?
                }
                (None, _) => {
                    return Err(Error::validation("rights issue requires shares_received"));
                }
            }
        }
        CorporateActionType::Spinoff => before,
    };

    let action = CorporateAction {
        id: Id::new(),
        action_type: input.action_type,
        action_date: input.action_date,
        ratio_from: input.ratio_from,
        ratio_to: input.ratio_to,
        shares_received: input.shares_received,
        quantity_before: before,
        quantity_after: after,
        notes: input.notes,
        created_at: ctx.now,
    };

    let mut next = holding.clone();
    next.max_quantity = max_quantity;
    next.current_price = current_price;
    next.set_quantity(after);
    next.corporate_actions.push(action.clone());
    if let Some(valued_on) = next.valued_on {
        revalue(&mut next, valued_on, ctx)?;
    }
    *holding = next;
    Ok(action)
}

/// Mark the position to `price` as of `as_of`.
pub fn update_price(
    holding: &mut EquityHolding,
    price: Money,
    as_of: NaiveDate,
    ctx: &EventContext<'_>,
) -> Result<()> {
    ensure_live(holding)?;
    ensure_non_negative(&price, "price")?;
    let mut next = holding.clone();
    next.current_price = Some(price);
    revalue(&mut next, as_of, ctx)?;
    *holding = next;
    Ok(())
}

/// Recompute base value and the authoritative unrealized figure from the
/// current price. No-op for an unpriced holding.
fn revalue(holding: &mut EquityHolding, as_of: NaiveDate, ctx: &EventContext<'_>) -> Result<()> {
    let Some(price) = holding.current_price.as_ref() else {
        return Ok(());
    };
    let value = price.checked_mul(holding.quantity)?;
    let value_base = ctx.to_base(&value, as_of)?;
    let cost_base = ctx.to_base(&holding.cost_basis, as_of)?;
    holding.unrealized_gain_loss = value_base.checked_sub(&cost_base)?;
    holding.current_value_base = Some(value_base);
    holding.valued_on = Some(as_of);
    Ok(())
}
