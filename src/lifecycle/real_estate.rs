//! Units, occupancy, rent periods and appraisals on a property.

use chrono::{DateTime, Utc};

use super::{ensure_currency, ensure_positive, EventContext};
use crate::error::{Error, Result};
use crate::models::{
    Id, Money, NewUnit, Property, PropertyValuation, PropertyValuationInput, RentalIncome,
    RentalPeriodInput, Unit, UnitOccupancy,
};

fn ensure_live(property: &Property) -> Result<()> {
    if property.is_deleted() {
        return Err(Error::PropertyNotFound(property.id.clone()));
    }
    Ok(())
}

fn unit_mut<'a>(property: &'a mut Property, unit_id: &Id) -> Result<&'a mut Unit> {
    property
        .unit_mut(unit_id)
        .ok_or_else(|| Error::UnitNotFound(unit_id.clone()))
}

/// Add a vacant unit. Unit numbers are unique within a property.
pub fn add_unit(property: &mut Property, mut input: NewUnit, now: DateTime<Utc>) -> Result<Unit> {
    ensure_live(property)?;
    let number = input.unit_number.trim().to_string();
    if number.is_empty() {
        return Err(Error::validation("unit number must not be empty"));
    }
    if property.units.iter().any(|u| u.unit_number == number) {
        return Err(Error::validation(format!(
            "unit {number} already exists in property {}",
            property.id
        )));
    }
    if let Some(budget) = &input.budgeted_rent {
        ensure_currency(budget, &input.rent_currency)?;
    }
    input.unit_number = number;
    let unit = Unit::new(input, now);
    property.units.push(unit.clone());
    Ok(unit)
}

/// Change a unit's occupancy and lease details. Rent balances are untouched.
pub fn set_unit_occupancy(
    property: &mut Property,
    unit_id: &Id,
    occupancy: UnitOccupancy,
) -> Result<Unit> {
    ensure_live(property)?;
    let unit = unit_mut(property, unit_id)?;
    if let Some(rent) = &occupancy.monthly_rent {
        ensure_currency(rent, &unit.rent_currency)?;
        ensure_positive(rent, "monthly rent")?;
    }
    if let Some(deposit) = &occupancy.deposit {
        ensure_currency(deposit, &unit.rent_currency)?;
    }
    if let (Some(start), Some(end)) = (occupancy.lease_start, occupancy.lease_end) {
        if end < start {
            return Err(Error::validation(format!(
                "lease end {end} is before lease start {start}"
            )));
        }
    }

    unit.status = occupancy.status;
    unit.tenant_name = occupancy.tenant_name;
    unit.lease_start = occupancy.lease_start;
    unit.lease_end = occupancy.lease_end;
    unit.monthly_rent = occupancy.monthly_rent;
    unit.deposit = occupancy.deposit;
    Ok(unit.clone())
}

/// Open a new, uncollected rent period for a unit.
pub fn record_rental_period(
    property: &mut Property,
    unit_id: &Id,
    input: RentalPeriodInput,
    now: DateTime<Utc>,
) -> Result<RentalIncome> {
    ensure_live(property)?;
    let unit = unit_mut(property, unit_id)?;
    if input.period_end < input.period_start {
        return Err(Error::validation(format!(
            "period end {} is before period start {}",
            input.period_end, input.period_start
        )));
    }
    ensure_currency(&input.expected_amount, &unit.rent_currency)?;
    ensure_positive(&input.expected_amount, "expected rent")?;

    let period = RentalIncome {
        id: Id::new(),
        period_start: input.period_start,
        period_end: input.period_end,
        received_amount: Money::zero(input.expected_amount.currency.clone()),
        expected_amount: input.expected_amount,
        payment_date: None,
        is_collected: false,
        notes: input.notes,
        created_at: now,
    };
    unit.rental_income.push(period.clone());
    unit.recompute_outstanding()?;
    Ok(period)
}

/// Record a payment against a rent period.
///
/// Without an amount the remaining balance is collected in full. A partial
/// amount accumulates into `received_amount`; the period is collected only
/// once the expected amount has been received in total.
pub fn mark_rental_collected(
    property: &mut Property,
    unit_id: &Id,
    period_id: &Id,
    amount: Option<Money>,
    ctx: &EventContext<'_>,
) -> Result<RentalIncome> {
    ensure_live(property)?;
    let unit = unit_mut(property, unit_id)?;
    let index = unit
        .rental_income
        .iter()
        .position(|p| &p.id == period_id)
        .ok_or_else(|| Error::RentalPeriodNotFound {
            unit_id: unit_id.clone(),
            period_id: period_id.clone(),
        })?;
    let period = &unit.rental_income[index];
    if period.is_collected {
        return Err(Error::AlreadyCollected(period_id.clone()));
    }

    let remaining = period.remaining()?;
    let payment = amount.unwrap_or_else(|| remaining.clone());
    ensure_currency(&payment, &period.expected_amount.currency)?;
    ensure_positive(&payment, "collected amount")?;
    if payment > remaining {
        return Err(Error::validation(format!(
            "collected amount {payment} exceeds remaining balance {remaining}"
        )));
    }
    let received = period.received_amount.checked_add(&payment)?;
    let collected = received == period.expected_amount;

    let period = &mut unit.rental_income[index];
    period.received_amount = received;
    period.payment_date = Some(ctx.today);
    period.is_collected = collected;
    let updated = period.clone();
    unit.recompute_outstanding()?;
    Ok(updated)
}

/// Append an appraisal; the property's current value follows the latest date.
pub fn record_valuation(
    property: &mut Property,
    input: PropertyValuationInput,
    ctx: &EventContext<'_>,
) -> Result<PropertyValuation> {
    ensure_live(property)?;
    ensure_positive(&input.value, "property value")?;
    let value_base = ctx.to_base(&input.value, input.valuation_date)?;
    let valuation = PropertyValuation {
        id: Id::new(),
        valuation_date: input.valuation_date,
        value: input.value,
        value_base,
        appraiser: input.appraiser,
        valuation_method: input.valuation_method,
        notes: input.notes,
    };
    let is_latest = property
        .last_valuation_date
        .map_or(true, |current| valuation.valuation_date >= current);
    if is_latest {
        property.current_value = Some(valuation.value.clone());
        property.current_value_base = Some(valuation.value_base.clone());
        property.last_valuation_date = Some(valuation.valuation_date);
    }
    property.valuations.push(valuation.clone());
    Ok(valuation)
}
