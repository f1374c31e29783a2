use chrono::NaiveDate;

use super::Engine;
use crate::error::{Error, Result};
use crate::lifecycle::{equity, SoftDelete};
use crate::models::{
    Actor, CorporateAction, CorporateActionInput, Dividend, DividendInput, EquityHolding,
    EquityTransactionInput, Id, Money, NewEquityHolding,
};
use crate::storage::RecordFilter;

impl Engine {
    pub async fn create_equity(&self, actor: &Actor, input: NewEquityHolding) -> Result<EquityHolding> {
        if input.ticker.trim().is_empty() {
            return Err(Error::validation("ticker must not be empty"));
        }
        self.settings.ensure_supported(&input.cost_basis_currency)?;
        let holding = EquityHolding::new(input, self.settings.base_currency(), self.clock.now());
        let description = format!("opened {} ({})", holding.ticker, holding.name);
        self.create(actor, "create_equity", holding, description).await
    }

    pub async fn get_equity(&self, id: &Id) -> Result<EquityHolding> {
        self.load_live(id).await
    }

    pub async fn list_equities(&self, filter: &RecordFilter) -> Result<Vec<EquityHolding>> {
        Ok(self.storage.list_equities(filter).await?)
    }

    /// Apply a BUY or SELL and return the updated holding.
    pub async fn apply_equity_transaction(
        &self,
        actor: &Actor,
        holding_id: &Id,
        input: EquityTransactionInput,
    ) -> Result<EquityHolding> {
        self.ensure_supported(&input.price)?;
        let policy = self.settings.equity_policy();
        let description = format!(
            "{} {} @ {} on {}",
            input.transaction_type.trim().to_uppercase(),
            input.quantity,
            input.price,
            input.transaction_date
        );
        let (holding, _) = self
            .mutate(actor, "apply_equity_transaction", holding_id, description, |h, ctx| {
                equity::apply_transaction(h, input, policy, ctx)
            })
            .await?;
        Ok(holding)
    }

    pub async fn record_dividend(
        &self,
        actor: &Actor,
        holding_id: &Id,
        input: DividendInput,
    ) -> Result<Dividend> {
        self.ensure_supported(&input.amount)?;
        let description = format!("dividend {} ex {}", input.amount, input.ex_date);
        let (_, dividend) = self
            .mutate(actor, "record_dividend", holding_id, description, |h, ctx| {
                equity::record_dividend(h, input, ctx)
            })
            .await?;
        Ok(dividend)
    }

    pub async fn record_corporate_action(
        &self,
        actor: &Actor,
        holding_id: &Id,
        input: CorporateActionInput,
    ) -> Result<CorporateAction> {
        let description = format!("{:?} on {}", input.action_type, input.action_date);
        let (_, action) = self
            .mutate(actor, "record_corporate_action", holding_id, description, |h, ctx| {
                equity::record_corporate_action(h, input, ctx)
            })
            .await?;
        Ok(action)
    }

    pub async fn update_equity_price(
        &self,
        actor: &Actor,
        holding_id: &Id,
        price: Money,
        as_of: NaiveDate,
    ) -> Result<EquityHolding> {
        self.ensure_supported(&price)?;
        let description = format!("priced at {price} on {as_of}");
        let (holding, _) = self
            .mutate(actor, "update_equity_price", holding_id, description, |h, ctx| {
                equity::update_price(h, price, as_of, ctx)
            })
            .await?;
        Ok(holding)
    }

    pub async fn soft_delete_equity(&self, actor: &Actor, holding_id: &Id) -> Result<EquityHolding> {
        let (holding, _) = self
            .mutate(
                actor,
                "soft_delete_equity",
                holding_id,
                "soft deleted".to_string(),
                |h: &mut EquityHolding, ctx| h.soft_delete(ctx.now),
            )
            .await?;
        Ok(holding)
    }
}
