use super::Engine;
use crate::error::{Error, Result};
use crate::lifecycle::{real_estate, SoftDelete};
use crate::models::{
    Actor, BasisPoints, Id, Money, NewProperty, NewUnit, Property, PropertyValuation,
    PropertyValuationInput, RentalIncome, RentalPeriodInput, Unit, UnitOccupancy,
};
use crate::storage::RecordFilter;

impl Engine {
    pub async fn create_property(&self, actor: &Actor, input: NewProperty) -> Result<Property> {
        if input.name.trim().is_empty() {
            return Err(Error::validation("property name must not be empty"));
        }
        self.ensure_supported(&input.purchase_price)?;
        if !input.purchase_price.is_positive() {
            return Err(Error::validation("purchase price must be positive"));
        }
        let share = input.ownership_percentage;
        if share.0 <= 0 || share > BasisPoints::FULL {
            return Err(Error::validation(format!(
                "ownership percentage {}% is outside (0, 100]",
                share.to_percent()
            )));
        }
        let property = Property::new(input, self.clock.now());
        let description = format!("acquired {} for {}", property.name, property.purchase_price);
        self.create(actor, "create_property", property, description).await
    }

    pub async fn get_property(&self, id: &Id) -> Result<Property> {
        self.load_live(id).await
    }

    pub async fn list_properties(&self, filter: &RecordFilter) -> Result<Vec<Property>> {
        Ok(self.storage.list_properties(filter).await?)
    }

    pub async fn add_unit(&self, actor: &Actor, property_id: &Id, input: NewUnit) -> Result<Unit> {
        self.settings.ensure_supported(&input.rent_currency)?;
        let description = format!("added unit {}", input.unit_number.trim());
        let (_, unit) = self
            .mutate(actor, "add_unit", property_id, description, |p, ctx| {
                real_estate::add_unit(p, input, ctx.now)
            })
            .await?;
        Ok(unit)
    }

    pub async fn set_unit_occupancy(
        &self,
        actor: &Actor,
        property_id: &Id,
        unit_id: &Id,
        occupancy: UnitOccupancy,
    ) -> Result<Unit> {
        let description = format!("unit {unit_id} -> {}", occupancy.status);
        let (_, unit) = self
            .mutate(actor, "set_unit_occupancy", property_id, description, |p, _ctx| {
                real_estate::set_unit_occupancy(p, unit_id, occupancy)
            })
            .await?;
        Ok(unit)
    }

    pub async fn record_rental_period(
        &self,
        actor: &Actor,
        property_id: &Id,
        unit_id: &Id,
        input: RentalPeriodInput,
    ) -> Result<RentalIncome> {
        let description = format!(
            "unit {unit_id} rent {} for {}..{}",
            input.expected_amount, input.period_start, input.period_end
        );
        let (_, period) = self
            .mutate(actor, "record_rental_period", property_id, description, |p, ctx| {
                real_estate::record_rental_period(p, unit_id, input, ctx.now)
            })
            .await?;
        Ok(period)
    }

    /// Collect rent against a period, addressed by unit.
    ///
    /// `amount` of `None` collects the remaining balance.
    pub async fn mark_rental_collected(
        &self,
        actor: &Actor,
        unit_id: &Id,
        period_id: &Id,
        amount: Option<Money>,
    ) -> Result<RentalIncome> {
        const ACTION: &str = "mark_rental_collected";
        self.authorize(actor, ACTION)?;
        let property_id = self
            .list_properties(&RecordFilter::live())
            .await?
            .into_iter()
            .find(|p| p.unit(unit_id).is_some())
            .map(|p| p.id)
            .ok_or_else(|| Error::UnitNotFound(unit_id.clone()))?;

        let description = match &amount {
            Some(amount) => format!("unit {unit_id} period {period_id} collected {amount}"),
            None => format!("unit {unit_id} period {period_id} collected in full"),
        };
        let (_, period) = self
            .mutate(actor, ACTION, &property_id, description, |p, ctx| {
                real_estate::mark_rental_collected(p, unit_id, period_id, amount, ctx)
            })
            .await?;
        Ok(period)
    }

    pub async fn record_property_valuation(
        &self,
        actor: &Actor,
        property_id: &Id,
        input: PropertyValuationInput,
    ) -> Result<PropertyValuation> {
        self.ensure_supported(&input.value)?;
        let description = format!("appraised at {} on {}", input.value, input.valuation_date);
        let (_, valuation) = self
            .mutate(actor, "record_property_valuation", property_id, description, |p, ctx| {
                real_estate::record_valuation(p, input, ctx)
            })
            .await?;
        Ok(valuation)
    }

    pub async fn soft_delete_property(&self, actor: &Actor, property_id: &Id) -> Result<Property> {
        let (property, _) = self
            .mutate(
                actor,
                "soft_delete_property",
                property_id,
                "soft deleted".to_string(),
                |p: &mut Property, ctx| p.soft_delete(ctx.now),
            )
            .await?;
        Ok(property)
    }
}
