//! Capital calls, distributions and NAV updates on a fund commitment.
//!
//! Settlement flags are one-way. A settle attempt on an already settled
//! record fails and leaves every running total as it was.

use tracing::debug;

use super::{ensure_non_negative, ensure_positive, EventContext};
use crate::error::{Error, Result};
use crate::models::{
    CapitalCall, CapitalCallInput, Distribution, DistributionInput, FundValuation,
    FundValuationInput, Id, Money, PrivateFund,
};

fn ensure_live(fund: &PrivateFund) -> Result<()> {
    if fund.is_deleted() {
        return Err(Error::FundNotFound(fund.id.clone()));
    }
    Ok(())
}

fn next_number(len: usize) -> Result<u32> {
    u32::try_from(len + 1).map_err(|_| Error::Overflow)
}

/// Commitment-currency total of calls that are recorded but not yet paid.
fn pending_calls(fund: &PrivateFund) -> Result<Money> {
    Money::sum(
        fund.commitment_currency(),
        fund.capital_calls
            .iter()
            .filter(|c| !c.is_paid)
            .map(|c| &c.amount_commitment),
    )
}

/// Record a new, unpaid capital call.
///
/// The amount is fixed in the commitment currency at the call date. Calls
/// that would exceed the remaining uncalled capital are rejected.
pub fn record_capital_call(
    fund: &mut PrivateFund,
    input: CapitalCallInput,
    ctx: &EventContext<'_>,
) -> Result<CapitalCall> {
    ensure_live(fund)?;
    ensure_positive(&input.amount, "capital call amount")?;
    let amount_commitment = ctx
        .fx
        .convert(&input.amount, fund.commitment_currency(), input.call_date)?;

    let requested = pending_calls(fund)?.checked_add(&amount_commitment)?;
    if requested > fund.uncalled_capital {
        return Err(Error::validation(format!(
            "capital call of {} exceeds uncalled capital {} (pending calls included)",
            amount_commitment, fund.uncalled_capital
        )));
    }

    let call = CapitalCall {
        id: Id::new(),
        call_number: next_number(fund.capital_calls.len())?,
        call_date: input.call_date,
        due_date: input.due_date,
        amount: input.amount,
        purpose: input.purpose,
        notes: input.notes,
        amount_commitment,
        payment_date: None,
        amount_base: None,
        is_paid: false,
    };
    fund.capital_calls.push(call.clone());
    Ok(call)
}

/// Mark a call as paid on `ctx.today` and move its amount from uncalled to called.
pub fn settle_capital_call(
    fund: &mut PrivateFund,
    call_id: &Id,
    ctx: &EventContext<'_>,
) -> Result<CapitalCall> {
    ensure_live(fund)?;
    let index = fund
        .capital_calls
        .iter()
        .position(|c| &c.id == call_id)
        .ok_or_else(|| Error::CallNotFound {
            fund_id: fund.id.clone(),
            call_id: call_id.clone(),
        })?;
    let call = &fund.capital_calls[index];
    if call.is_paid {
        return Err(Error::AlreadyPaid(call_id.clone()));
    }

    let amount_base = ctx.to_base(&call.amount, ctx.today)?;
    let called = fund.called_capital.checked_add(&call.amount_commitment)?;
    let uncalled = fund.committed_capital.checked_sub(&called)?;
    if uncalled.is_negative() {
        return Err(Error::validation(format!(
            "settling call {call_id} would call more than the commitment {}",
            fund.committed_capital
        )));
    }

    fund.called_capital = called;
    fund.uncalled_capital = uncalled;
    let call = &mut fund.capital_calls[index];
    call.is_paid = true;
    call.payment_date = Some(ctx.today);
    call.amount_base = Some(amount_base);

    debug!(
        fund_id = %fund.id,
        call_id = %call_id,
        called = fund.called_capital.amount,
        uncalled = fund.uncalled_capital.amount,
        "capital call settled"
    );
    Ok(fund.capital_calls[index].clone())
}

/// Record a declared distribution. Declared totals move now; received
/// totals move on settlement.
pub fn record_distribution(
    fund: &mut PrivateFund,
    input: DistributionInput,
    ctx: &EventContext<'_>,
) -> Result<Distribution> {
    ensure_live(fund)?;
    ensure_positive(&input.amount, "distribution amount")?;
    let amount_commitment =
        ctx.fx
            .convert(&input.amount, fund.commitment_currency(), input.declaration_date)?;
    let declared = fund.distributions_declared.checked_add(&amount_commitment)?;

    let distribution = Distribution {
        id: Id::new(),
        distribution_number: next_number(fund.distributions.len())?,
        declaration_date: input.declaration_date,
        amount: input.amount,
        distribution_type: input.distribution_type,
        notes: input.notes,
        amount_commitment,
        payment_date: None,
        amount_base: None,
        is_received: false,
    };
    fund.distributions_declared = declared;
    fund.distributions.push(distribution.clone());
    Ok(distribution)
}

/// Mark a distribution as received on `ctx.today`.
pub fn settle_distribution(
    fund: &mut PrivateFund,
    distribution_id: &Id,
    ctx: &EventContext<'_>,
) -> Result<Distribution> {
    ensure_live(fund)?;
    let index = fund
        .distributions
        .iter()
        .position(|d| &d.id == distribution_id)
        .ok_or_else(|| Error::DistributionNotFound {
            fund_id: fund.id.clone(),
            distribution_id: distribution_id.clone(),
        })?;
    let distribution = &fund.distributions[index];
    if distribution.is_received {
        return Err(Error::AlreadyReceived(distribution_id.clone()));
    }

    let amount_base = ctx.to_base(&distribution.amount, ctx.today)?;
    let received = fund
        .distributions_received
        .checked_add(&distribution.amount_commitment)?;
    let received_base = fund.distributions_received_base.checked_add(&amount_base)?;

    fund.distributions_received = received;
    fund.distributions_received_base = received_base;
    let distribution = &mut fund.distributions[index];
    distribution.is_received = true;
    distribution.payment_date = Some(ctx.today);
    distribution.amount_base = Some(amount_base);
    Ok(distribution.clone())
}

/// Append a NAV record; the fund's current NAV follows the latest date.
pub fn record_valuation(
    fund: &mut PrivateFund,
    input: FundValuationInput,
    ctx: &EventContext<'_>,
) -> Result<FundValuation> {
    ensure_live(fund)?;
    ensure_non_negative(&input.nav, "NAV")?;
    let nav_base = ctx.to_base(&input.nav, input.valuation_date)?;

    let valuation = FundValuation {
        id: Id::new(),
        valuation_date: input.valuation_date,
        nav: input.nav,
        nav_base,
        irr: input.irr,
        notes: input.notes,
    };
    let is_latest = fund
        .nav_date
        .map_or(true, |current| valuation.valuation_date >= current);
    if is_latest {
        fund.current_nav = Some(valuation.nav.clone());
        fund.current_nav_base = Some(valuation.nav_base.clone());
        fund.nav_date = Some(valuation.valuation_date);
        if valuation.irr.is_some() {
            fund.irr = valuation.irr;
        }
    }
    fund.valuations.push(valuation.clone());
    Ok(valuation)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::lifecycle::testing::{book, code, ctx, date};
    use crate::models::{BasisPoints, CurrencyCode, FundType, NewPrivateFund};

    fn fund(committed: i64, currency: &str) -> PrivateFund {
        PrivateFund::new(
            NewPrivateFund {
                name: "Buyout Fund IV".to_string(),
                fund_type: FundType::PrivateEquity,
                fund_manager: None,
                vintage_year: Some(2023),
                geography: None,
                sector: None,
                committed_capital: Money::new(committed, code(currency)),
                management_fee: None,
                carried_interest: None,
                fund_term_years: None,
                investment_period_end: None,
                fund_end_date: None,
                notes: None,
            },
            &CurrencyCode::kwd(),
            Utc::now(),
        )
    }

    fn call(amount: i64, currency: &str) -> CapitalCallInput {
        CapitalCallInput {
            call_date: date(2024, 2, 1),
            due_date: None,
            amount: Money::new(amount, code(currency)),
            purpose: Some("investment".to_string()),
            notes: None,
        }
    }

    #[test]
    fn settling_a_call_moves_capital_from_uncalled_to_called() {
        let fx = book();
        let base = CurrencyCode::kwd();
        let ctx = ctx(&fx, &base);
        let mut f = fund(50_000_000, "USD");

        let recorded = record_capital_call(&mut f, call(10_000_000, "USD"), &ctx).unwrap();
        assert_eq!(recorded.call_number, 1);
        assert!(f.called_capital().is_zero());

        let settled = settle_capital_call(&mut f, &recorded.id, &ctx).unwrap();
        assert!(settled.is_paid());
        assert_eq!(settled.payment_date(), Some(date(2024, 3, 1)));
        assert_eq!(settled.amount_base().unwrap().amount, 3_076_923);
        assert_eq!(f.called_capital().amount, 10_000_000);
        assert_eq!(f.uncalled_capital().amount, 40_000_000);
    }

    #[test]
    fn second_settlement_is_already_paid_and_changes_nothing() {
        let fx = book();
        let base = CurrencyCode::kwd();
        let ctx = ctx(&fx, &base);
        let mut f = fund(50_000_000, "USD");
        let recorded = record_capital_call(&mut f, call(10_000_000, "USD"), &ctx).unwrap();
        settle_capital_call(&mut f, &recorded.id, &ctx).unwrap();
        let before = f.clone();

        assert!(matches!(
            settle_capital_call(&mut f, &recorded.id, &ctx),
            Err(Error::AlreadyPaid(_))
        ));
        assert_eq!(f, before);
    }

    #[test]
    fn unknown_call_and_deleted_fund() {
        let fx = book();
        let base = CurrencyCode::kwd();
        let ctx = ctx(&fx, &base);
        let mut f = fund(50_000_000, "USD");
        assert!(matches!(
            settle_capital_call(&mut f, &Id::from("nope"), &ctx),
            Err(Error::CallNotFound { .. })
        ));
        f.deleted_at = Some(Utc::now());
        assert!(matches!(
            record_capital_call(&mut f, call(1, "USD"), &ctx),
            Err(Error::FundNotFound(_))
        ));
    }

    #[test]
    fn calls_beyond_the_commitment_are_rejected() {
        let fx = book();
        let base = CurrencyCode::kwd();
        let ctx = ctx(&fx, &base);
        let mut f = fund(50_000_000, "USD");
        record_capital_call(&mut f, call(30_000_000, "USD"), &ctx).unwrap();
        assert!(matches!(
            record_capital_call(&mut f, call(25_000_000, "USD"), &ctx),
            Err(Error::Validation(_))
        ));
        assert_eq!(f.capital_calls().len(), 1);
    }

    #[test]
    fn foreign_currency_call_is_converted_into_commitment_currency() {
        let fx = book();
        let base = CurrencyCode::kwd();
        let ctx = ctx(&fx, &base);
        let mut f = fund(50_000_000, "USD");
        // the rate applies to minor units as stored
        let recorded = record_capital_call(&mut f, call(100_000, "KWD"), &ctx).unwrap();
        assert_eq!(recorded.amount_commitment().amount, 325_000);
        settle_capital_call(&mut f, &recorded.id, &ctx).unwrap();
        assert_eq!(f.called_capital().amount, 325_000);
        assert_eq!(recorded.amount.amount, 100_000);
        assert_eq!(
            f.called_capital().checked_add(f.uncalled_capital()).unwrap(),
            f.committed_capital
        );
    }

    #[test]
    fn distributions_declare_then_receive_once() {
        let fx = book();
        let base = CurrencyCode::kwd();
        let ctx = ctx(&fx, &base);
        let mut f = fund(50_000_000, "USD");
        let d = record_distribution(
            &mut f,
            DistributionInput {
                declaration_date: date(2024, 2, 15),
                amount: Money::new(3_250_000, code("USD")),
                distribution_type: None,
                notes: None,
            },
            &ctx,
        )
        .unwrap();
        assert_eq!(f.distributions_declared().amount, 3_250_000);
        assert!(f.distributions_received().is_zero());

        let received = settle_distribution(&mut f, &d.id, &ctx).unwrap();
        assert!(received.is_received());
        assert_eq!(f.distributions_received().amount, 3_250_000);
        assert_eq!(f.distributions_received_base().amount, 1_000_000);
        assert!(matches!(
            settle_distribution(&mut f, &d.id, &ctx),
            Err(Error::AlreadyReceived(_))
        ));
        assert_eq!(f.distributions_received().amount, 3_250_000);
    }

    #[test]
    fn older_nav_does_not_replace_current() {
        let fx = book();
        let base = CurrencyCode::kwd();
        let ctx = ctx(&fx, &base);
        let mut f = fund(50_000_000, "USD");
        let input = |d, nav| FundValuationInput {
            valuation_date: d,
            nav: Money::new(nav, code("USD")),
            irr: Some(BasisPoints(1_200)),
            notes: None,
        };
        record_valuation(&mut f, input(date(2024, 2, 1), 13_000_000), &ctx).unwrap();
        record_valuation(&mut f, input(date(2024, 1, 15), 9_750_000), &ctx).unwrap();
        assert_eq!(f.valuations().len(), 2);
        assert_eq!(f.current_nav().unwrap().amount, 13_000_000);
        assert_eq!(f.current_nav_base().unwrap().amount, 4_000_000);
        assert_eq!(f.nav_date(), Some(date(2024, 2, 1)));
    }
}
