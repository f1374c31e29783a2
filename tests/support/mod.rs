#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use wealthbook::audit::MemoryAuditSink;
use wealthbook::clock::FixedClock;
use wealthbook::models::{
    Actor, BasisPoints, CurrencyCode, Exchange, FundType, Money, NewEquityHolding, NewPrivateFund,
    NewProperty, PropertyType, Role,
};
use wealthbook::storage::{MemoryStorage, Storage};
use wealthbook::{Engine, Settings};

pub fn code(s: &str) -> CurrencyCode {
    CurrencyCode::new(s).unwrap()
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn kwd(fils: i64) -> Money {
    Money::new(fils, code("KWD"))
}

pub fn usd(cents: i64) -> Money {
    Money::new(cents, code("USD"))
}

/// Noon UTC on 2024-03-15, which is the same business day in Kuwait.
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap()
}

pub fn settings(allow_short_sales: bool) -> Settings {
    Settings::new(
        code("KWD"),
        ["KWD", "USD", "GBP", "EUR"].into_iter().map(code).collect(),
        chrono_tz::Asia::Kuwait,
        Duration::from_secs(7 * 86_400),
        allow_short_sales,
    )
    .unwrap()
}

pub fn admin() -> Actor {
    Actor::new("Fatima", Role::Cfo)
}

pub fn viewer() -> Actor {
    Actor::new("Board observer", Role::Viewer)
}

pub struct Harness {
    pub engine: Engine,
    pub storage: Arc<dyn Storage>,
    pub audit: Arc<MemoryAuditSink>,
}

pub fn harness_with(storage: Arc<dyn Storage>, settings: Settings) -> Harness {
    let audit = Arc::new(MemoryAuditSink::new());
    let engine = Engine::new(storage.clone(), settings)
        .with_audit(audit.clone())
        .with_clock(Arc::new(FixedClock::new(now())));
    Harness {
        engine,
        storage,
        audit,
    }
}

pub fn harness() -> Harness {
    harness_with(Arc::new(MemoryStorage::new()), settings(false))
}

/// Seed KWD→USD 3.25 and KWD→GBP 2.50 from 2024-01-01.
pub async fn seed_rates(engine: &Engine) -> anyhow::Result<()> {
    let actor = admin();
    engine
        .upsert_manual_rate(&actor, &code("KWD"), &code("USD"), date(2024, 1, 1), 325_000_000)
        .await?;
    engine
        .upsert_manual_rate(&actor, &code("KWD"), &code("GBP"), date(2024, 1, 1), 250_000_000)
        .await?;
    Ok(())
}

pub fn new_equity(ticker: &str, country: &str, sector: &str) -> NewEquityHolding {
    NewEquityHolding {
        ticker: ticker.to_string(),
        name: format!("{ticker} Inc."),
        exchange: Exchange::Nasdaq,
        sector: Some(sector.to_string()),
        country: Some(country.to_string()),
        cost_basis_currency: code("USD"),
        notes: None,
    }
}

pub fn new_fund(name: &str, committed_cents: i64) -> NewPrivateFund {
    NewPrivateFund {
        name: name.to_string(),
        fund_type: FundType::PrivateEquity,
        fund_manager: Some("Gulf Capital Partners".to_string()),
        vintage_year: Some(2023),
        geography: Some("MENA".to_string()),
        sector: Some("Healthcare".to_string()),
        committed_capital: usd(committed_cents),
        management_fee: Some(BasisPoints(200)),
        carried_interest: Some(BasisPoints(2_000)),
        fund_term_years: Some(10),
        investment_period_end: None,
        fund_end_date: None,
        notes: None,
    }
}

pub fn new_property(name: &str, purchase_fils: i64) -> NewProperty {
    NewProperty {
        name: name.to_string(),
        property_type: PropertyType::Residential,
        address: None,
        city: Some("Salmiya".to_string()),
        country: Some("Kuwait".to_string()),
        purchase_price: kwd(purchase_fils),
        purchase_date: date(2023, 6, 1),
        ownership_entity: None,
        ownership_percentage: BasisPoints::FULL,
        total_area_sqm: None,
        notes: None,
    }
}
