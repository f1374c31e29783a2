use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use tracing::{debug, warn};

use super::Rate;
use crate::error::{Error, Result};
use crate::models::{CurrencyCode, ExchangeRateObservation, Money};

/// Resolves conversion factors between currencies as of a date.
pub trait FxResolver: Send + Sync {
    fn resolve(&self, from: &CurrencyCode, to: &CurrencyCode, as_of: NaiveDate) -> Result<Rate>;

    fn convert(&self, money: &Money, to: &CurrencyCode, as_of: NaiveDate) -> Result<Money> {
        let rate = self.resolve(&money.currency, to, as_of)?;
        rate.apply(money)
    }
}

/// Date-matching policy for rate lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResolveMode {
    /// Latest observation dated on or before the target date.
    #[default]
    OnOrBefore,
    /// Only an observation dated exactly on the target date.
    Exact,
}

/// Point-in-time snapshot of live rate observations, indexed per pair by date.
///
/// Resolution order: identity, direct pair, reverse pair (inverted), else
/// [`Error::RateNotFound`]. There is no interpolation and no 1:1 fallback.
#[derive(Debug, Clone, Default)]
pub struct RateBook {
    series: HashMap<(CurrencyCode, CurrencyCode), BTreeMap<NaiveDate, ExchangeRateObservation>>,
    mode: ResolveMode,
}

impl RateBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a book from stored observations. Soft-deleted observations are skipped.
    pub fn from_observations(observations: impl IntoIterator<Item = ExchangeRateObservation>) -> Self {
        let mut book = Self::new();
        for obs in observations {
            book.insert(obs);
        }
        book
    }

    pub fn with_mode(mut self, mode: ResolveMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn insert(&mut self, obs: ExchangeRateObservation) {
        if obs.is_deleted() {
            return;
        }
        if obs.rate <= 0 || obs.from_currency == obs.to_currency {
            warn!(
                id = %obs.id,
                from = %obs.from_currency,
                to = %obs.to_currency,
                rate = obs.rate,
                "ignoring invalid rate observation"
            );
            return;
        }
        self.series
            .entry((obs.from_currency.clone(), obs.to_currency.clone()))
            .or_default()
            .insert(obs.rate_date, obs);
    }

    pub fn len(&self) -> usize {
        self.series.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lookup(
        &self,
        from: &CurrencyCode,
        to: &CurrencyCode,
        as_of: NaiveDate,
        mode: ResolveMode,
    ) -> Option<&ExchangeRateObservation> {
        let history = self.series.get(&(from.clone(), to.clone()))?;
        match mode {
            ResolveMode::OnOrBefore => history.range(..=as_of).next_back().map(|(_, obs)| obs),
            ResolveMode::Exact => history.get(&as_of),
        }
    }

    pub fn resolve_with_mode(
        &self,
        from: &CurrencyCode,
        to: &CurrencyCode,
        as_of: NaiveDate,
        mode: ResolveMode,
    ) -> Result<Rate> {
        if from == to {
            return Ok(Rate::identity(from));
        }

        if let Some(obs) = self.lookup(from, to, as_of, mode) {
            debug!(
                from = %from,
                to = %to,
                as_of = %as_of,
                rate_date = %obs.rate_date,
                rate = obs.rate,
                "direct rate resolved"
            );
            return Ok(Rate::direct(obs));
        }

        if let Some(obs) = self.lookup(to, from, as_of, mode) {
            debug!(
                from = %from,
                to = %to,
                as_of = %as_of,
                rate_date = %obs.rate_date,
                rate = obs.rate,
                "reverse rate resolved, inverting"
            );
            return Ok(Rate::inverse(obs));
        }

        Err(Error::RateNotFound {
            from: from.clone(),
            to: to.clone(),
            date: as_of,
        })
    }
}

impl FxResolver for RateBook {
    fn resolve(&self, from: &CurrencyCode, to: &CurrencyCode, as_of: NaiveDate) -> Result<Rate> {
        self.resolve_with_mode(from, to, as_of, self.mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fx::RateOrigin;
    use chrono::{TimeZone, Utc};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn code(s: &str) -> CurrencyCode {
        CurrencyCode::new(s).unwrap()
    }

    fn obs(from: &str, to: &str, on: NaiveDate, rate: i64) -> ExchangeRateObservation {
        ExchangeRateObservation::new(
            code(from),
            code(to),
            on,
            rate,
            "test",
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn identity_needs_no_observation() {
        let book = RateBook::new();
        let rate = book.resolve(&code("EUR"), &code("EUR"), date(1999, 1, 1)).unwrap();
        assert!(rate.is_identity());
    }

    #[test]
    fn falls_back_to_latest_rate_not_after_target() {
        let book = RateBook::from_observations([
            obs("KWD", "USD", date(2023, 12, 1), 320_000_000),
            obs("KWD", "USD", date(2024, 1, 1), 325_000_000),
            obs("KWD", "USD", date(2024, 2, 1), 330_000_000),
        ]);

        let money = Money::new(1_000, code("KWD"));
        let converted = book.convert(&money, &code("USD"), date(2024, 1, 2)).unwrap();
        assert_eq!(converted, Money::new(3_250, code("USD")));
    }

    #[test]
    fn future_observations_are_ignored() {
        let book = RateBook::from_observations([obs("KWD", "USD", date(2024, 2, 1), 330_000_000)]);
        let err = book
            .resolve(&code("KWD"), &code("USD"), date(2024, 1, 31))
            .unwrap_err();
        assert!(matches!(err, Error::RateNotFound { .. }));
    }

    #[test]
    fn reverse_pair_is_inverted() {
        let book = RateBook::from_observations([obs("USD", "KWD", date(2024, 1, 1), 30_700_000)]);
        let direct = book.resolve(&code("USD"), &code("KWD"), date(2024, 1, 5)).unwrap();
        let reverse = book.resolve(&code("KWD"), &code("USD"), date(2024, 1, 5)).unwrap();
        assert!(matches!(reverse.origin, RateOrigin::Inverse { .. }));
        assert!(direct.is_inverse_of(&reverse));
    }

    #[test]
    fn stored_zero_rate_is_ignored() {
        let mut raw =
            serde_json::to_value(obs("USD", "KWD", date(2024, 1, 1), 30_000_000)).unwrap();
        raw["rate"] = serde_json::json!(0);
        let zero: ExchangeRateObservation = serde_json::from_value(raw).unwrap();

        let book = RateBook::from_observations([zero]);
        assert!(book.is_empty());
        let err = book
            .convert(&Money::new(1_000, code("KWD")), &code("USD"), date(2024, 1, 5))
            .unwrap_err();
        assert!(matches!(err, Error::RateNotFound { .. }));
    }

    #[test]
    fn direct_pair_wins_over_reverse() {
        let book = RateBook::from_observations([
            obs("USD", "KWD", date(2024, 1, 3), 30_000_000),
            obs("KWD", "USD", date(2024, 1, 1), 325_000_000),
        ]);
        let rate = book.resolve(&code("KWD"), &code("USD"), date(2024, 1, 5)).unwrap();
        assert!(matches!(rate.origin, RateOrigin::Direct { .. }));
        assert_eq!(rate.scaled().unwrap(), 325_000_000);
    }

    #[test]
    fn exact_mode_disables_fallback() {
        let book = RateBook::from_observations([obs("KWD", "USD", date(2024, 1, 1), 325_000_000)])
            .with_mode(ResolveMode::Exact);
        assert!(book.resolve(&code("KWD"), &code("USD"), date(2024, 1, 2)).is_err());
        assert!(book.resolve(&code("KWD"), &code("USD"), date(2024, 1, 1)).is_ok());
    }

    #[test]
    fn soft_deleted_observations_are_not_loaded() {
        let mut deleted = obs("KWD", "USD", date(2024, 1, 1), 325_000_000);
        deleted.deleted_at = Some(Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap());
        let book = RateBook::from_observations([deleted]);
        assert!(book.is_empty());
    }

    #[test]
    fn missing_rate_names_both_currencies_and_date() {
        let book = RateBook::new();
        let err = book
            .resolve(&code("GBP"), &code("EGP"), date(2024, 3, 1))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "No exchange rate found for GBP->EGP on or before 2024-03-01"
        );
    }
}
