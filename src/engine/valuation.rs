use chrono::NaiveDate;
use tracing::info;

use super::Engine;
use crate::error::Result;
use crate::storage::RecordFilter;
use crate::valuation::{
    self, Dimension, ExposureBreakdown, OccupancyReport, Portfolio, PortfolioSummary,
    ValuationContext,
};

impl Engine {
    /// Every live aggregate, read once for an aggregation run.
    pub async fn snapshot(&self) -> Result<Portfolio> {
        let live = RecordFilter::live();
        Ok(Portfolio {
            equities: self.storage.list_equities(&live).await?,
            fixed_income: self.storage.list_fixed_income(&live).await?,
            properties: self.storage.list_properties(&live).await?,
            funds: self.storage.list_funds(&live).await?,
        })
    }

    /// Portfolio totals and allocation in base currency as of `as_of`.
    pub async fn summarize(&self, as_of: NaiveDate) -> Result<PortfolioSummary> {
        let portfolio = self.snapshot().await?;
        let fx = self.rate_book().await?;
        let ctx = ValuationContext::new(
            &fx,
            self.settings.base_currency(),
            as_of,
            self.settings.valuation_policy(),
        );
        let summary = valuation::summarize(&portfolio, &ctx)?;
        info!(
            as_of = %as_of,
            total_value = summary.total_value.amount,
            holdings = summary.asset_classes.iter().map(|c| c.holdings_count).sum::<usize>(),
            "portfolio summarized"
        );
        Ok(summary)
    }

    pub async fn exposure_by(&self, dimension: Dimension, as_of: NaiveDate) -> Result<ExposureBreakdown> {
        let portfolio = self.snapshot().await?;
        let fx = self.rate_book().await?;
        let ctx = ValuationContext::new(
            &fx,
            self.settings.base_currency(),
            as_of,
            self.settings.valuation_policy(),
        );
        valuation::exposure_by(&portfolio, dimension, &ctx)
    }

    pub async fn occupancy_report(&self, as_of: NaiveDate) -> Result<OccupancyReport> {
        let properties = self.storage.list_properties(&RecordFilter::live()).await?;
        let fx = self.rate_book().await?;
        let ctx = ValuationContext::new(
            &fx,
            self.settings.base_currency(),
            as_of,
            self.settings.valuation_policy(),
        );
        valuation::occupancy_report(&properties, &ctx)
    }
}
