use super::Engine;
use crate::error::{Error, Result};
use crate::lifecycle::{private_fund, SoftDelete};
use crate::models::{
    Actor, CapitalCall, CapitalCallInput, Distribution, DistributionInput, FundValuation,
    FundValuationInput, Id, NewPrivateFund, PrivateFund,
};
use crate::storage::RecordFilter;

impl Engine {
    pub async fn create_fund(&self, actor: &Actor, input: NewPrivateFund) -> Result<PrivateFund> {
        if input.name.trim().is_empty() {
            return Err(Error::validation("fund name must not be empty"));
        }
        self.ensure_supported(&input.committed_capital)?;
        if !input.committed_capital.is_positive() {
            return Err(Error::validation("committed capital must be positive"));
        }
        let fund = PrivateFund::new(input, self.settings.base_currency(), self.clock.now());
        let description = format!("committed {} to {}", fund.committed_capital, fund.name);
        self.create(actor, "create_fund", fund, description).await
    }

    pub async fn get_fund(&self, id: &Id) -> Result<PrivateFund> {
        self.load_live(id).await
    }

    pub async fn list_funds(&self, filter: &RecordFilter) -> Result<Vec<PrivateFund>> {
        Ok(self.storage.list_funds(filter).await?)
    }

    pub async fn record_capital_call(
        &self,
        actor: &Actor,
        fund_id: &Id,
        input: CapitalCallInput,
    ) -> Result<CapitalCall> {
        self.ensure_supported(&input.amount)?;
        let description = format!("call of {} dated {}", input.amount, input.call_date);
        let (_, call) = self
            .mutate(actor, "record_capital_call", fund_id, description, |f, ctx| {
                private_fund::record_capital_call(f, input, ctx)
            })
            .await?;
        Ok(call)
    }

    /// Pay a capital call. A second settlement of the same call fails with
    /// [`Error::AlreadyPaid`] and leaves the fund untouched.
    pub async fn settle_capital_call(
        &self,
        actor: &Actor,
        fund_id: &Id,
        call_id: &Id,
    ) -> Result<CapitalCall> {
        let description = format!("call {call_id} paid");
        let (_, call) = self
            .mutate(actor, "settle_capital_call", fund_id, description, |f, ctx| {
                private_fund::settle_capital_call(f, call_id, ctx)
            })
            .await?;
        Ok(call)
    }

    pub async fn record_distribution(
        &self,
        actor: &Actor,
        fund_id: &Id,
        input: DistributionInput,
    ) -> Result<Distribution> {
        self.ensure_supported(&input.amount)?;
        let description = format!(
            "distribution of {} declared {}",
            input.amount, input.declaration_date
        );
        let (_, distribution) = self
            .mutate(actor, "record_distribution", fund_id, description, |f, ctx| {
                private_fund::record_distribution(f, input, ctx)
            })
            .await?;
        Ok(distribution)
    }

    pub async fn settle_distribution(
        &self,
        actor: &Actor,
        fund_id: &Id,
        distribution_id: &Id,
    ) -> Result<Distribution> {
        let description = format!("distribution {distribution_id} received");
        let (_, distribution) = self
            .mutate(actor, "settle_distribution", fund_id, description, |f, ctx| {
                private_fund::settle_distribution(f, distribution_id, ctx)
            })
            .await?;
        Ok(distribution)
    }

    pub async fn record_fund_valuation(
        &self,
        actor: &Actor,
        fund_id: &Id,
        input: FundValuationInput,
    ) -> Result<FundValuation> {
        self.ensure_supported(&input.nav)?;
        let description = format!("NAV {} on {}", input.nav, input.valuation_date);
        let (_, valuation) = self
            .mutate(actor, "record_fund_valuation", fund_id, description, |f, ctx| {
                private_fund::record_valuation(f, input, ctx)
            })
            .await?;
        Ok(valuation)
    }

    pub async fn soft_delete_fund(&self, actor: &Actor, fund_id: &Id) -> Result<PrivateFund> {
        let (fund, _) = self
            .mutate(
                actor,
                "soft_delete_fund",
                fund_id,
                "soft deleted".to_string(),
                |f: &mut PrivateFund, ctx| f.soft_delete(ctx.now),
            )
            .await?;
        Ok(fund)
    }
}
