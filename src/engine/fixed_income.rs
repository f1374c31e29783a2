use chrono::NaiveDate;

use super::Engine;
use crate::error::{Error, Result};
use crate::lifecycle::{fixed_income, SoftDelete};
use crate::models::{
    Actor, FixedIncomeHolding, FixedIncomeStatus, Id, Money, NewFixedIncomeHolding,
};
use crate::storage::RecordFilter;

impl Engine {
    pub async fn create_fixed_income(
        &self,
        actor: &Actor,
        input: NewFixedIncomeHolding,
    ) -> Result<FixedIncomeHolding> {
        if input.name.trim().is_empty() {
            return Err(Error::validation("instrument name must not be empty"));
        }
        self.ensure_supported(&input.face_value)?;
        self.ensure_supported(&input.purchase_price)?;
        if !input.face_value.is_positive() || !input.purchase_price.is_positive() {
            return Err(Error::validation(
                "face value and purchase price must be positive",
            ));
        }
        if let Some(maturity) = input.maturity_date {
            if maturity < input.purchase_date {
                return Err(Error::validation(format!(
                    "maturity {maturity} is before purchase date {}",
                    input.purchase_date
                )));
            }
        }
        let holding =
            FixedIncomeHolding::new(input, self.settings.base_currency(), self.clock.now());
        let description = format!("opened {} face {}", holding.name, holding.face_value);
        self.create(actor, "create_fixed_income", holding, description).await
    }

    pub async fn get_fixed_income(&self, id: &Id) -> Result<FixedIncomeHolding> {
        self.load_live(id).await
    }

    pub async fn list_fixed_income(&self, filter: &RecordFilter) -> Result<Vec<FixedIncomeHolding>> {
        Ok(self.storage.list_fixed_income(filter).await?)
    }

    pub async fn update_fixed_income_valuation(
        &self,
        actor: &Actor,
        holding_id: &Id,
        market_value: Money,
        as_of: NaiveDate,
    ) -> Result<FixedIncomeHolding> {
        self.ensure_supported(&market_value)?;
        let description = format!("marked at {market_value} on {as_of}");
        let (holding, _) = self
            .mutate(actor, "update_fixed_income_valuation", holding_id, description, |h, ctx| {
                fixed_income::update_valuation(h, market_value, as_of, ctx)
            })
            .await?;
        Ok(holding)
    }

    pub async fn record_accrual(
        &self,
        actor: &Actor,
        holding_id: &Id,
        amount: Money,
    ) -> Result<FixedIncomeHolding> {
        let description = format!("accrued {amount}");
        let (holding, _) = self
            .mutate(actor, "record_accrual", holding_id, description, |h, _ctx| {
                fixed_income::record_accrual(h, amount)
            })
            .await?;
        Ok(holding)
    }

    pub async fn record_interest_received(
        &self,
        actor: &Actor,
        holding_id: &Id,
        amount: Money,
        received_on: NaiveDate,
    ) -> Result<FixedIncomeHolding> {
        let description = format!("received {amount} interest on {received_on}");
        let (holding, _) = self
            .mutate(actor, "record_interest_received", holding_id, description, |h, ctx| {
                fixed_income::record_interest_received(h, amount, received_on, ctx)
            })
            .await?;
        Ok(holding)
    }

    pub async fn transition_fixed_income_status(
        &self,
        actor: &Actor,
        holding_id: &Id,
        to: FixedIncomeStatus,
    ) -> Result<FixedIncomeHolding> {
        let description = format!("status -> {to}");
        let (holding, _) = self
            .mutate(actor, "transition_fixed_income_status", holding_id, description, |h, _ctx| {
                fixed_income::transition_status(h, to)
            })
            .await?;
        Ok(holding)
    }

    pub async fn soft_delete_fixed_income(
        &self,
        actor: &Actor,
        holding_id: &Id,
    ) -> Result<FixedIncomeHolding> {
        let (holding, _) = self
            .mutate(
                actor,
                "soft_delete_fixed_income",
                holding_id,
                "soft deleted".to_string(),
                |h: &mut FixedIncomeHolding, ctx| h.soft_delete(ctx.now),
            )
            .await?;
        Ok(holding)
    }
}
