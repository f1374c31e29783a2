use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;

use super::{AssetClass, Portfolio, Valuable, ValuationContext};
use crate::error::Result;
use crate::format::percentage_of;
use crate::models::{CurrencyCode, Money};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AllocationItem {
    pub category: String,
    pub value: Money,
    /// Share of the total, two decimal places.
    pub percentage: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetClassSummary {
    pub asset_class: AssetClass,
    pub label: String,
    pub total_value: Money,
    pub total_cost_basis: Money,
    pub unrealized_gain_loss: Money,
    pub realized_gain_loss: Money,
    pub income_received: Money,
    pub holdings_count: usize,
}

/// Consolidated portfolio view in base currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortfolioSummary {
    pub as_of_date: NaiveDate,
    pub base_currency: CurrencyCode,
    pub total_value: Money,
    pub total_cost_basis: Money,
    pub total_unrealized_gain_loss: Money,
    pub total_realized_gain_loss: Money,
    pub total_income: Money,
    pub asset_classes: Vec<AssetClassSummary>,
    /// Classes with a zero value are left out rather than listed at 0%.
    pub allocation: Vec<AllocationItem>,
    pub equities_count: usize,
    pub fixed_income_count: usize,
    pub properties_count: usize,
    pub units_count: usize,
    pub private_funds_count: usize,
}

fn summarize_class<T: Valuable>(
    class: AssetClass,
    holdings: &[T],
    ctx: &ValuationContext<'_>,
) -> Result<AssetClassSummary> {
    let mut value = ctx.zero();
    let mut cost = ctx.zero();
    let mut realized = ctx.zero();
    let mut income = ctx.zero();
    let mut tracked = Some(ctx.zero());
    let mut count = 0;

    for holding in holdings.iter().filter(|h| h.is_live()) {
        count += 1;
        value = value.checked_add(&ctx.value_of(holding)?)?;
        cost = cost.checked_add(&ctx.to_base(&holding.cost_basis_of())?)?;
        if let Some(r) = holding.realized_gain_loss() {
            realized = realized.checked_add(&ctx.to_base(r)?)?;
        }
        if let Some(i) = holding.income_received() {
            income = income.checked_add(&ctx.to_base(i)?)?;
        }
        tracked = match (tracked, holding.tracked_unrealized()) {
            (Some(acc), Some(u)) => Some(acc.checked_add(&ctx.to_base(u)?)?),
            _ => None,
        };
    }

    let unrealized = match tracked {
        Some(tracked) if count > 0 => tracked,
        _ => value.checked_sub(&cost)?,
    };

    debug!(
        asset_class = class.label(),
        holdings = count,
        value = %value,
        "asset class valued"
    );

    Ok(AssetClassSummary {
        asset_class: class,
        label: class.label().to_string(),
        total_value: value,
        total_cost_basis: cost,
        unrealized_gain_loss: unrealized,
        realized_gain_loss: realized,
        income_received: income,
        holdings_count: count,
    })
}

/// Value every live holding in base currency and roll the results up per
/// asset class and for the whole portfolio.
///
/// A missing exchange rate aborts the summary; nothing is valued at zero
/// in its place.
pub fn summarize(portfolio: &Portfolio, ctx: &ValuationContext<'_>) -> Result<PortfolioSummary> {
    let classes = vec![
        summarize_class(AssetClass::Equities, &portfolio.equities, ctx)?,
        summarize_class(AssetClass::FixedIncome, &portfolio.fixed_income, ctx)?,
        summarize_class(AssetClass::RealEstate, &portfolio.properties, ctx)?,
        summarize_class(AssetClass::PrivateFunds, &portfolio.funds, ctx)?,
    ];

    let total = |field: fn(&AssetClassSummary) -> &Money| -> Result<Money> {
        Money::sum(ctx.base_currency, classes.iter().map(field))
    };
    let total_value = total(|c| &c.total_value)?;
    let total_cost_basis = total(|c| &c.total_cost_basis)?;
    let total_unrealized_gain_loss = total(|c| &c.unrealized_gain_loss)?;
    let total_realized_gain_loss = total(|c| &c.realized_gain_loss)?;
    let total_income = total(|c| &c.income_received)?;

    let allocation = if total_value.is_positive() {
        classes
            .iter()
            .filter(|c| !c.total_value.is_zero())
            .map(|c| AllocationItem {
                category: c.label.clone(),
                value: c.total_value.clone(),
                percentage: percentage_of(c.total_value.amount, total_value.amount),
                color: Some(c.asset_class.color().to_string()),
            })
            .collect()
    } else {
        Vec::new()
    };

    let count = |class: AssetClass| {
        classes
            .iter()
            .find(|c| c.asset_class == class)
            .map(|c| c.holdings_count)
            .unwrap_or(0)
    };
    let units_count = portfolio
        .properties
        .iter()
        .filter(|p| p.is_live())
        .map(|p| p.units().len())
        .sum();

    Ok(PortfolioSummary {
        as_of_date: ctx.as_of,
        base_currency: ctx.base_currency.clone(),
        total_value,
        total_cost_basis,
        total_unrealized_gain_loss,
        total_realized_gain_loss,
        total_income,
        equities_count: count(AssetClass::Equities),
        fixed_income_count: count(AssetClass::FixedIncome),
        properties_count: count(AssetClass::RealEstate),
        private_funds_count: count(AssetClass::PrivateFunds),
        units_count,
        asset_classes: classes,
        allocation,
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::Utc;

    use super::*;
    use crate::error::Error;
    use crate::fx::RateBook;
    use crate::lifecycle::testing::{book, code, date};
    use crate::lifecycle::SoftDelete;
    use crate::valuation::testing::{equity, fund, property};
    use crate::valuation::ValuationPolicy;

    fn ctx<'a>(fx: &'a RateBook, base: &'a CurrencyCode) -> ValuationContext<'a> {
        ValuationContext::new(
            fx,
            base,
            date(2024, 2, 5),
            ValuationPolicy {
                stale_after: Duration::from_secs(7 * 86_400),
            },
        )
    }

    #[test]
    fn empty_portfolio_has_no_allocation() {
        let fx = RateBook::new();
        let base = code("KWD");
        let summary = summarize(&Portfolio::default(), &ctx(&fx, &base)).unwrap();
        assert!(summary.total_value.is_zero());
        assert!(summary.allocation.is_empty());
        assert_eq!(summary.asset_classes.len(), 4);
    }

    #[test]
    fn totals_roll_up_across_classes() {
        let fx = book();
        let base = code("KWD");
        let portfolio = Portfolio {
            // 100 x 13.00 USD -> 40.000 KWD, cost 100 x 10.00 USD -> 30.769 KWD
            equities: vec![equity(&fx, "MSFT", Some("USA"), Some("Tech"), 1_300, 1)],
            fixed_income: Vec::new(),
            properties: vec![property(Some("Kuwait"), 60_000, 2)],
            funds: Vec::new(),
        };
        let summary = summarize(&portfolio, &ctx(&fx, &base)).unwrap();

        assert_eq!(summary.total_value, Money::new(100_000, code("KWD")));
        let equities = &summary.asset_classes[0];
        assert_eq!(equities.total_value, Money::new(40_000, code("KWD")));
        assert_eq!(equities.total_cost_basis, Money::new(30_769, code("KWD")));
        // Tracked figure, not value minus cost.
        assert_eq!(equities.unrealized_gain_loss, Money::new(9_231, code("KWD")));

        let real_estate = &summary.asset_classes[2];
        assert_eq!(real_estate.unrealized_gain_loss, Money::new(0, code("KWD")));

        assert_eq!(summary.allocation.len(), 2);
        assert_eq!(summary.allocation[0].category, "Public Equities");
        assert_eq!(summary.allocation[0].percentage, Decimal::new(4000, 2));
        assert_eq!(summary.allocation[1].percentage, Decimal::new(6000, 2));
        assert_eq!(summary.equities_count, 1);
        assert_eq!(summary.properties_count, 1);
        assert_eq!(summary.private_funds_count, 0);
    }

    #[test]
    fn soft_deleted_holdings_are_skipped() {
        let fx = book();
        let base = code("KWD");
        let mut gone = property(None, 50_000, 1);
        gone.soft_delete(Utc::now()).unwrap();
        let portfolio = Portfolio {
            properties: vec![gone, property(None, 10_000, 2)],
            ..Portfolio::default()
        };
        let summary = summarize(&portfolio, &ctx(&fx, &base)).unwrap();
        assert_eq!(summary.total_value, Money::new(10_000, code("KWD")));
        assert_eq!(summary.properties_count, 1);
        assert_eq!(summary.allocation[0].percentage, Decimal::ONE_HUNDRED);
    }

    #[test]
    fn missing_rate_aborts_the_summary() {
        let fx = book();
        let base = code("KWD");
        let mut f = fund(&fx, Some("Europe"), 5_000_000, 0, 1);
        f.committed_capital = crate::models::Money::new(5_000_000, code("EUR"));
        f.called_capital = crate::models::Money::new(100, code("EUR"));
        let portfolio = Portfolio {
            funds: vec![f],
            ..Portfolio::default()
        };
        let err = summarize(&portfolio, &ctx(&fx, &base)).unwrap_err();
        assert!(matches!(err, Error::RateNotFound { .. }));
    }
}
