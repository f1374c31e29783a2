use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use super::{Valuable, ValuationContext};
use crate::error::Result;
use crate::format::percentage_of;
use crate::models::{CurrencyCode, Id, Money, Property, UnitStatus};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusCount {
    pub status: UnitStatus,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PropertyOccupancy {
    pub property_id: Id,
    pub name: String,
    pub total_units: usize,
    pub by_status: Vec<StatusCount>,
    pub occupancy_rate: Decimal,
    /// Contracted monthly rent of occupied units, base currency.
    pub monthly_rent: Money,
    pub outstanding: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OccupancyReport {
    pub as_of_date: NaiveDate,
    pub base_currency: CurrencyCode,
    pub properties: Vec<PropertyOccupancy>,
    pub total_units: usize,
    pub occupied_units: usize,
    pub occupancy_rate: Decimal,
    pub total_monthly_rent: Money,
    pub total_outstanding: Money,
}

fn property_occupancy(property: &Property, ctx: &ValuationContext<'_>) -> Result<PropertyOccupancy> {
    let units = property.units();
    let by_status = UnitStatus::ALL
        .iter()
        .map(|&status| StatusCount {
            status,
            count: units.iter().filter(|u| u.status() == status).count(),
        })
        .collect::<Vec<_>>();

    let mut monthly_rent = ctx.zero();
    let mut outstanding = ctx.zero();
    for unit in units {
        if unit.status() == UnitStatus::Occupied {
            if let Some(rent) = unit.monthly_rent() {
                monthly_rent = monthly_rent.checked_add(&ctx.to_base(rent)?)?;
            }
        }
        outstanding = outstanding.checked_add(&ctx.to_base(unit.outstanding_amount())?)?;
    }

    let occupied = units
        .iter()
        .filter(|u| u.status() == UnitStatus::Occupied)
        .count();

    Ok(PropertyOccupancy {
        property_id: property.id.clone(),
        name: property.name.clone(),
        total_units: units.len(),
        by_status,
        occupancy_rate: ratio(occupied, units.len()),
        monthly_rent,
        outstanding,
    })
}

fn ratio(part: usize, total: usize) -> Decimal {
    let part = i64::try_from(part).unwrap_or(i64::MAX);
    let total = i64::try_from(total).unwrap_or(i64::MAX);
    percentage_of(part, total)
}

/// Unit counts, occupancy and rent position for every live property.
pub fn occupancy_report(properties: &[Property], ctx: &ValuationContext<'_>) -> Result<OccupancyReport> {
    let rows = properties
        .iter()
        .filter(|p| p.is_live())
        .map(|p| property_occupancy(p, ctx))
        .collect::<Result<Vec<_>>>()?;

    let total_units = rows.iter().map(|r| r.total_units).sum();
    let occupied_units = rows
        .iter()
        .flat_map(|r| r.by_status.iter())
        .filter(|s| s.status == UnitStatus::Occupied)
        .map(|s| s.count)
        .sum();

    Ok(OccupancyReport {
        as_of_date: ctx.as_of,
        base_currency: ctx.base_currency.clone(),
        occupancy_rate: ratio(occupied_units, total_units),
        total_monthly_rent: Money::sum(ctx.base_currency, rows.iter().map(|r| &r.monthly_rent))?,
        total_outstanding: Money::sum(ctx.base_currency, rows.iter().map(|r| &r.outstanding))?,
        total_units,
        occupied_units,
        properties: rows,
    })
}
