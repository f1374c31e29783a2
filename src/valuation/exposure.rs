use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Serialize;

use super::{AllocationItem, Dimension, Portfolio, ValuationContext};
use crate::error::Result;
use crate::format::percentage_of;
use crate::models::{CurrencyCode, Money};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExposureBreakdown {
    pub dimension: Dimension,
    pub as_of_date: NaiveDate,
    pub base_currency: CurrencyCode,
    pub total: Money,
    /// Descending by value; equal values keep discovery order.
    pub items: Vec<AllocationItem>,
}

/// Group live holdings by `dimension` and value each group in base currency.
///
/// Holdings without a key for the dimension (fixed income for geography and
/// sector, real estate for sector) are left out.
pub fn exposure_by(
    portfolio: &Portfolio,
    dimension: Dimension,
    ctx: &ValuationContext<'_>,
) -> Result<ExposureBreakdown> {
    let mut groups: Vec<(String, Money)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for holding in portfolio.holdings() {
        let Some(key) = holding.exposure_key(dimension) else {
            continue;
        };
        let value = ctx.value_of(holding)?;
        match index.get(&key) {
            Some(&i) => groups[i].1 = groups[i].1.checked_add(&value)?,
            None => {
                index.insert(key.clone(), groups.len());
                groups.push((key, value));
            }
        }
    }

    let total = Money::sum(ctx.base_currency, groups.iter().map(|(_, v)| v))?;
    // `sort_by` is stable, which keeps first-seen order for ties.
    groups.sort_by(|a, b| b.1.amount.cmp(&a.1.amount));

    let items = groups
        .into_iter()
        .map(|(category, value)| AllocationItem {
            percentage: percentage_of(value.amount, total.amount),
            category,
            value,
            color: None,
        })
        .collect();

    Ok(ExposureBreakdown {
        dimension,
        as_of_date: ctx.as_of,
        base_currency: ctx.base_currency.clone(),
        total,
        items,
    })
}
