mod support;

use anyhow::Result;
use support::{admin, code, date, harness, kwd, new_property, seed_rates, usd};
use wealthbook::models::{
    CouponFrequency, FixedIncomeStatus, FixedIncomeType, Id, NewFixedIncomeHolding, NewUnit,
    PropertyValuationInput, RentalPeriodInput, UnitOccupancy, UnitStatus,
};
use wealthbook::{Error, ErrorKind};

fn unit(number: &str) -> NewUnit {
    NewUnit {
        unit_number: number.to_string(),
        unit_type: Some("2BR".to_string()),
        floor: Some(3),
        area_sqm: Some(110_000),
        rent_currency: code("KWD"),
        budgeted_rent: Some(kwd(450_000)),
        notes: None,
    }
}

fn sukuk() -> NewFixedIncomeHolding {
    NewFixedIncomeHolding {
        name: "Warba Sukuk 2029".to_string(),
        isin: Some("XS0000000001".to_string()),
        instrument_type: FixedIncomeType::Sukuk,
        issuer: Some("Warba Bank".to_string()),
        face_value: usd(10_000_000),
        purchase_price: usd(9_800_000),
        purchase_date: date(2024, 1, 10),
        coupon_rate: None,
        coupon_frequency: Some(CouponFrequency::SemiAnnual),
        maturity_date: Some(date(2029, 1, 10)),
        expected_return: None,
        management_fee: None,
        is_exchange_traded: true,
        notes: None,
    }
}

#[tokio::test]
async fn rent_is_collected_in_parts_then_closed() -> Result<()> {
    let h = harness();
    let actor = admin();
    let property = h.engine.create_property(&actor, new_property("Salmiya Tower", 900_000_000)).await?;
    let a1 = h.engine.add_unit(&actor, &property.id, unit("A1")).await?;
    h.engine
        .set_unit_occupancy(
            &actor,
            &property.id,
            &a1.id,
            UnitOccupancy {
                status: UnitStatus::Occupied,
                tenant_name: Some("Al Noor Trading".to_string()),
                lease_start: Some(date(2024, 1, 1)),
                lease_end: Some(date(2024, 12, 31)),
                monthly_rent: Some(kwd(450_000)),
                deposit: Some(kwd(450_000)),
            },
        )
        .await?;
    let period = h
        .engine
        .record_rental_period(
            &actor,
            &property.id,
            &a1.id,
            RentalPeriodInput {
                period_start: date(2024, 3, 1),
                period_end: date(2024, 3, 31),
                expected_amount: kwd(450_000),
                notes: None,
            },
        )
        .await?;

    let partial = h
        .engine
        .mark_rental_collected(&actor, &a1.id, &period.id, Some(kwd(200_000)))
        .await?;
    assert!(!partial.is_collected());
    assert_eq!(partial.received_amount(), &kwd(200_000));

    let err = h
        .engine
        .mark_rental_collected(&actor, &a1.id, &period.id, Some(kwd(300_000)))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let full = h
        .engine
        .mark_rental_collected(&actor, &a1.id, &period.id, None)
        .await?;
    assert!(full.is_collected());
    assert_eq!(full.received_amount(), &kwd(450_000));
    assert_eq!(full.payment_date(), Some(date(2024, 3, 15)));

    let err = h
        .engine
        .mark_rental_collected(&actor, &a1.id, &period.id, None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::AlreadyCollected(_)));

    let stored = h.engine.get_property(&property.id).await?;
    let stored_unit = stored.unit(&a1.id).unwrap();
    assert!(stored_unit.outstanding_amount().is_zero());
    assert_eq!(stored_unit.status(), UnitStatus::Occupied);
    Ok(())
}

#[tokio::test]
async fn unknown_unit_is_not_found() -> Result<()> {
    let h = harness();
    let err = h
        .engine
        .mark_rental_collected(&admin(), &Id::from("no-unit"), &Id::from("no-period"), None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UnitNotFound(_)));
    Ok(())
}

#[tokio::test]
async fn duplicate_unit_number_is_rejected() -> Result<()> {
    let h = harness();
    let actor = admin();
    let property = h.engine.create_property(&actor, new_property("Salmiya Tower", 900_000_000)).await?;
    h.engine.add_unit(&actor, &property.id, unit("A1")).await?;

    let err = h
        .engine
        .add_unit(&actor, &property.id, unit(" A1 "))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(h.engine.get_property(&property.id).await?.units().len(), 1);
    Ok(())
}

#[tokio::test]
async fn latest_appraisal_sets_current_value() -> Result<()> {
    let h = harness();
    let actor = admin();
    let property = h.engine.create_property(&actor, new_property("Salmiya Tower", 900_000_000)).await?;
    let appraise = |on, fils| PropertyValuationInput {
        valuation_date: on,
        value: kwd(fils),
        appraiser: Some("CBRE".to_string()),
        valuation_method: None,
        notes: None,
    };

    h.engine
        .record_property_valuation(&actor, &property.id, appraise(date(2024, 3, 1), 950_000_000))
        .await?;
    h.engine
        .record_property_valuation(&actor, &property.id, appraise(date(2023, 12, 1), 920_000_000))
        .await?;

    let stored = h.engine.get_property(&property.id).await?;
    assert_eq!(stored.valuations().len(), 2);
    assert_eq!(stored.current_value(), Some(&kwd(950_000_000)));
    assert_eq!(stored.last_valuation_date(), Some(date(2024, 3, 1)));
    Ok(())
}

#[tokio::test]
async fn fixed_income_accrues_and_terminates_once() -> Result<()> {
    let h = harness();
    seed_rates(&h.engine).await?;
    let actor = admin();
    let holding = h.engine.create_fixed_income(&actor, sukuk()).await?;

    h.engine.record_accrual(&actor, &holding.id, usd(250_000)).await?;
    let paid = h
        .engine
        .record_interest_received(&actor, &holding.id, usd(325_000), date(2024, 3, 10))
        .await?;
    assert!(paid.accrued_interest().is_zero());
    assert_eq!(paid.total_interest_received(), &usd(325_000));
    assert_eq!(paid.interest_received_base(), &kwd(100_000));

    let valued = h
        .engine
        .update_fixed_income_valuation(&actor, &holding.id, usd(9_750_000), date(2024, 3, 15))
        .await?;
    assert_eq!(valued.current_value_base(), Some(&kwd(3_000_000)));

    let matured = h
        .engine
        .transition_fixed_income_status(&actor, &holding.id, FixedIncomeStatus::Matured)
        .await?;
    assert_eq!(matured.status(), FixedIncomeStatus::Matured);

    let err = h
        .engine
        .transition_fixed_income_status(&actor, &holding.id, FixedIncomeStatus::Sold)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidStatusTransition { .. }));

    let err = h
        .engine
        .record_accrual(&actor, &holding.id, usd(1_000))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    Ok(())
}

#[tokio::test]
async fn fixed_income_requires_a_name_and_positive_face() -> Result<()> {
    let h = harness();
    let actor = admin();

    let mut unnamed = sukuk();
    unnamed.name = "  ".to_string();
    let err = h.engine.create_fixed_income(&actor, unnamed).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let mut worthless = sukuk();
    worthless.face_value = usd(0);
    let err = h.engine.create_fixed_income(&actor, worthless).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    Ok(())
}
