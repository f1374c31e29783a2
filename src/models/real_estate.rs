use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{BasisPoints, CurrencyCode, Id, Money};
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyType {
    Commercial,
    Residential,
    Mixed,
    Land,
    Industrial,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitStatus {
    Vacant,
    Occupied,
    UnderMaintenance,
    Reserved,
}

impl UnitStatus {
    pub const ALL: [UnitStatus; 4] = [
        UnitStatus::Vacant,
        UnitStatus::Occupied,
        UnitStatus::UnderMaintenance,
        UnitStatus::Reserved,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            UnitStatus::Vacant => "vacant",
            UnitStatus::Occupied => "occupied",
            UnitStatus::UnderMaintenance => "under_maintenance",
            UnitStatus::Reserved => "reserved",
        }
    }
}

impl fmt::Display for UnitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One rent period for a unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RentalIncome {
    pub id: Id,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub expected_amount: Money,
    pub(crate) received_amount: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) payment_date: Option<NaiveDate>,
    pub(crate) is_collected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl RentalIncome {
    pub fn received_amount(&self) -> &Money {
        &self.received_amount
    }

    pub fn payment_date(&self) -> Option<NaiveDate> {
        self.payment_date
    }

    pub fn is_collected(&self) -> bool {
        self.is_collected
    }

    /// `expected - received`; zero once collected.
    pub fn remaining(&self) -> Result<Money> {
        if self.is_collected {
            return Ok(Money::zero(self.expected_amount.currency.clone()));
        }
        self.expected_amount.checked_sub(&self.received_amount)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RentalPeriodInput {
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub expected_amount: Money,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUnit {
    pub unit_number: String,
    #[serde(default)]
    pub unit_type: Option<String>,
    #[serde(default)]
    pub floor: Option<i32>,
    /// Thousandths of a square metre.
    #[serde(default)]
    pub area_sqm: Option<i64>,
    pub rent_currency: CurrencyCode,
    #[serde(default)]
    pub budgeted_rent: Option<Money>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Tenant and lease details applied by an occupancy change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitOccupancy {
    pub status: UnitStatus,
    #[serde(default)]
    pub tenant_name: Option<String>,
    #[serde(default)]
    pub lease_start: Option<NaiveDate>,
    #[serde(default)]
    pub lease_end: Option<NaiveDate>,
    #[serde(default)]
    pub monthly_rent: Option<Money>,
    #[serde(default)]
    pub deposit: Option<Money>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub id: Id,
    pub unit_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub floor: Option<i32>,
    /// Thousandths of a square metre.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area_sqm: Option<i64>,
    pub rent_currency: CurrencyCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budgeted_rent: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    pub(crate) status: UnitStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) tenant_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) lease_start: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) lease_end: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) monthly_rent: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) deposit: Option<Money>,
    pub(crate) outstanding_amount: Money,
    #[serde(default)]
    pub(crate) rental_income: Vec<RentalIncome>,
    pub created_at: DateTime<Utc>,
}

impl Unit {
    pub fn new(input: NewUnit, now: DateTime<Utc>) -> Self {
        Self {
            id: Id::new(),
            unit_number: input.unit_number,
            unit_type: input.unit_type,
            floor: input.floor,
            area_sqm: input.area_sqm,
            outstanding_amount: Money::zero(input.rent_currency.clone()),
            rent_currency: input.rent_currency,
            budgeted_rent: input.budgeted_rent,
            notes: input.notes,
            status: UnitStatus::Vacant,
            tenant_name: None,
            lease_start: None,
            lease_end: None,
            monthly_rent: None,
            deposit: None,
            rental_income: Vec::new(),
            created_at: now,
        }
    }

    pub fn status(&self) -> UnitStatus {
        self.status
    }

    pub fn tenant_name(&self) -> Option<&str> {
        self.tenant_name.as_deref()
    }

    pub fn lease_start(&self) -> Option<NaiveDate> {
        self.lease_start
    }

    pub fn lease_end(&self) -> Option<NaiveDate> {
        self.lease_end
    }

    pub fn monthly_rent(&self) -> Option<&Money> {
        self.monthly_rent.as_ref()
    }

    pub fn deposit(&self) -> Option<&Money> {
        self.deposit.as_ref()
    }

    pub fn outstanding_amount(&self) -> &Money {
        &self.outstanding_amount
    }

    pub fn rental_income(&self) -> &[RentalIncome] {
        &self.rental_income
    }

    pub fn period(&self, period_id: &Id) -> Option<&RentalIncome> {
        self.rental_income.iter().find(|p| &p.id == period_id)
    }

    /// Recompute the outstanding balance from the uncollected periods.
    pub(crate) fn recompute_outstanding(&mut self) -> Result<()> {
        let mut total = Money::zero(self.rent_currency.clone());
        for period in self.rental_income.iter().filter(|p| !p.is_collected) {
            total = total.checked_add(&period.remaining()?)?;
        }
        self.outstanding_amount = total;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyValuation {
    pub id: Id,
    pub valuation_date: NaiveDate,
    pub value: Money,
    pub value_base: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub appraiser: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valuation_method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyValuationInput {
    pub valuation_date: NaiveDate,
    pub value: Money,
    #[serde(default)]
    pub appraiser: Option<String>,
    #[serde(default)]
    pub valuation_method: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProperty {
    pub name: String,
    pub property_type: PropertyType,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    pub purchase_price: Money,
    pub purchase_date: NaiveDate,
    #[serde(default)]
    pub ownership_entity: Option<String>,
    #[serde(default = "full_ownership")]
    pub ownership_percentage: BasisPoints,
    /// Thousandths of a square metre.
    #[serde(default)]
    pub total_area_sqm: Option<i64>,
    #[serde(default)]
    pub notes: Option<String>,
}

fn full_ownership() -> BasisPoints {
    BasisPoints::FULL
}

/// A real-estate asset with its units and their rent periods.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
    pub id: Id,
    pub name: String,
    pub property_type: PropertyType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    pub purchase_price: Money,
    pub purchase_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ownership_entity: Option<String>,
    pub ownership_percentage: BasisPoints,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_area_sqm: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub irr: Option<BasisPoints>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) current_value: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) current_value_base: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) last_valuation_date: Option<NaiveDate>,
    #[serde(default)]
    pub(crate) valuations: Vec<PropertyValuation>,
    #[serde(default)]
    pub(crate) units: Vec<Unit>,

    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) deleted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub(crate) version: u64,
}

impl Property {
    pub fn new(input: NewProperty, now: DateTime<Utc>) -> Self {
        Self {
            id: Id::new(),
            name: input.name,
            property_type: input.property_type,
            address: input.address,
            city: input.city,
            country: input.country,
            purchase_price: input.purchase_price,
            purchase_date: input.purchase_date,
            ownership_entity: input.ownership_entity,
            ownership_percentage: input.ownership_percentage,
            total_area_sqm: input.total_area_sqm,
            irr: None,
            notes: input.notes,
            current_value: None,
            current_value_base: None,
            last_valuation_date: None,
            valuations: Vec::new(),
            units: Vec::new(),
            created_at: now,
            deleted_at: None,
            version: 0,
        }
    }

    pub fn current_value(&self) -> Option<&Money> {
        self.current_value.as_ref()
    }

    pub fn current_value_base(&self) -> Option<&Money> {
        self.current_value_base.as_ref()
    }

    pub fn last_valuation_date(&self) -> Option<NaiveDate> {
        self.last_valuation_date
    }

    /// Currency of the latest valuation, else of the purchase price.
    pub fn value_currency(&self) -> &CurrencyCode {
        self.current_value
            .as_ref()
            .map(|v| &v.currency)
            .unwrap_or(&self.purchase_price.currency)
    }

    pub fn valuations(&self) -> &[PropertyValuation] {
        &self.valuations
    }

    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    pub fn unit(&self, unit_id: &Id) -> Option<&Unit> {
        self.units.iter().find(|u| &u.id == unit_id)
    }

    pub(crate) fn unit_mut(&mut self, unit_id: &Id) -> Option<&mut Unit> {
        self.units.iter_mut().find(|u| &u.id == unit_id)
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

#[cfg(test)]
mod tests {
    use super::*;

    fn period(expected: i64, received: i64, collected: bool) -> RentalIncome {
        RentalIncome {
            id: Id::new(),
            period_start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            period_end: NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
            expected_amount: Money::new(expected, CurrencyCode::kwd()),
            received_amount: Money::new(received, CurrencyCode::kwd()),
            payment_date: None,
            is_collected: collected,
            notes: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn outstanding_sums_uncollected_gaps() {
        let mut unit = Unit::new(
            NewUnit {
                unit_number: "A-101".to_string(),
                unit_type: None,
                floor: Some(1),
                area_sqm: Some(85_500),
                rent_currency: CurrencyCode::kwd(),
                budgeted_rent: None,
                notes: None,
            },
            Utc::now(),
        );
        unit.rental_income = vec![
            period(450_000, 0, false),
            period(450_000, 200_000, false),
            period(450_000, 450_000, true),
        ];
        unit.recompute_outstanding().unwrap();
        assert_eq!(unit.outstanding_amount().amount, 700_000);
    }

    #[test]
    fn new_property_defaults_to_full_ownership_when_deserialized() {
        let json = r#"{
            "name": "Sharq Tower",
            "property_type": "commercial",
            "purchase_price": {"amount": 1000000000, "currency": "KWD"},
            "purchase_date": "2020-06-01"
        }"#;
        let input: NewProperty = serde_json::from_str(json).unwrap();
        assert_eq!(input.ownership_percentage, BasisPoints::FULL);
        let property = Property::new(input, Utc::now());
        assert_eq!(property.value_currency(), &CurrencyCode::kwd());
        assert!(property.units().is_empty());
    }
}
