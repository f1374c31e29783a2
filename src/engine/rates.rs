use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::Engine;
use crate::error::{Error, Result};
use crate::fx::{FxResolver, Rate};
use crate::models::{Actor, CurrencyCode, ExchangeRateObservation, Id, Money, MANUAL_SOURCE};
use crate::storage::{RateWriteMode, RateWriteOutcome};

const RATE_ENTITY: &str = "exchange_rate";

/// One observation in a bulk ingestion batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateInput {
    pub from_currency: CurrencyCode,
    pub to_currency: CurrencyCode,
    pub rate_date: NaiveDate,
    /// Fixed-point, eight implied decimals.
    pub rate: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub inserted: usize,
    pub updated: usize,
    /// Keys held by a manual override.
    pub skipped: usize,
}

impl Engine {
    fn ensure_pair_supported(&self, from: &CurrencyCode, to: &CurrencyCode) -> Result<()> {
        self.settings.ensure_supported(from)?;
        self.settings.ensure_supported(to)
    }

    /// Insert or overwrite the observation for `(from, to, date)` and mark it manual.
    pub async fn upsert_manual_rate(
        &self,
        actor: &Actor,
        from: &CurrencyCode,
        to: &CurrencyCode,
        rate_date: NaiveDate,
        rate: i64,
    ) -> Result<ExchangeRateObservation> {
        const ACTION: &str = "upsert_manual_rate";
        self.authorize(actor, ACTION)?;
        self.ensure_pair_supported(from, to)?;
        let observation = ExchangeRateObservation::new(
            from.clone(),
            to.clone(),
            rate_date,
            rate,
            MANUAL_SOURCE,
            self.clock.now(),
        )?;

        let (stored, outcome) = self
            .storage
            .write_rate(observation, RateWriteMode::Manual)
            .await?;

        self.audit(
            actor,
            ACTION,
            RATE_ENTITY,
            &stored.id,
            format!("{from}->{to} on {rate_date} set to {rate} ({outcome:?})"),
        );
        info!(
            from = %from,
            to = %to,
            rate_date = %rate_date,
            rate,
            outcome = ?outcome,
            "manual rate stored"
        );
        Ok(stored)
    }

    /// Load a batch from a named feed.
    ///
    /// The whole batch is validated before anything is written. Existing
    /// feed observations are refreshed; manual overrides are left alone.
    pub async fn ingest_rates(
        &self,
        actor: &Actor,
        source: &str,
        rates: Vec<RateInput>,
    ) -> Result<IngestReport> {
        const ACTION: &str = "ingest_rates";
        self.authorize(actor, ACTION)?;
        if source.trim().eq_ignore_ascii_case(MANUAL_SOURCE) {
            return Err(Error::validation(
                "ingested rates cannot use the manual source tag",
            ));
        }

        let now = self.clock.now();
        let observations = rates
            .into_iter()
            .map(|r| {
                self.ensure_pair_supported(&r.from_currency, &r.to_currency)?;
                ExchangeRateObservation::new(
                    r.from_currency,
                    r.to_currency,
                    r.rate_date,
                    r.rate,
                    source.trim(),
                    now,
                )
            })
            .collect::<Result<Vec<_>>>()?;

        let mut report = IngestReport::default();
        for observation in observations {
            let (_, outcome) = self
                .storage
                .write_rate(observation, RateWriteMode::Ingest)
                .await?;
            match outcome {
                RateWriteOutcome::Inserted => report.inserted += 1,
                RateWriteOutcome::Updated => report.updated += 1,
                RateWriteOutcome::Skipped => report.skipped += 1,
            }
        }

        self.audit(
            actor,
            ACTION,
            RATE_ENTITY,
            &Id::from(source.trim()),
            format!(
                "{} inserted, {} updated, {} skipped",
                report.inserted, report.updated, report.skipped
            ),
        );
        info!(
            source,
            inserted = report.inserted,
            updated = report.updated,
            skipped = report.skipped,
            "rates ingested"
        );
        Ok(report)
    }

    pub async fn soft_delete_rate(&self, actor: &Actor, id: &Id) -> Result<ExchangeRateObservation> {
        const ACTION: &str = "soft_delete_rate";
        self.authorize(actor, ACTION)?;
        let deleted = self
            .storage
            .soft_delete_rate(id, self.clock.now())
            .await?
            .ok_or_else(|| Error::RateObservationNotFound(id.clone()))?;
        self.audit(
            actor,
            ACTION,
            RATE_ENTITY,
            id,
            format!(
                "{}->{} on {} deleted",
                deleted.from_currency, deleted.to_currency, deleted.rate_date
            ),
        );
        info!(id = %id, "rate observation deleted");
        Ok(deleted)
    }

    /// Observations quoted from `base`: on exactly `on` when given, else the
    /// latest per quote currency. Sorted by quote currency.
    pub async fn latest_rates(
        &self,
        base: &CurrencyCode,
        on: Option<NaiveDate>,
    ) -> Result<Vec<ExchangeRateObservation>> {
        let mut latest: BTreeMap<CurrencyCode, ExchangeRateObservation> = BTreeMap::new();
        for obs in self.storage.list_rates(false).await? {
            if &obs.from_currency != base || on.is_some_and(|d| d != obs.rate_date) {
                continue;
            }
            let newer = latest
                .get(&obs.to_currency)
                .map_or(true, |current| obs.rate_date > current.rate_date);
            if newer {
                latest.insert(obs.to_currency.clone(), obs);
            }
        }
        Ok(latest.into_values().collect())
    }

    pub async fn resolve_rate(
        &self,
        from: &CurrencyCode,
        to: &CurrencyCode,
        as_of: NaiveDate,
    ) -> Result<Rate> {
        self.ensure_pair_supported(from, to)?;
        let rate = self.rate_book().await?.resolve(from, to, as_of)?;
        debug!(from = %from, to = %to, as_of = %as_of, rate = ?rate.to_decimal().ok(), "rate resolved");
        Ok(rate)
    }

    pub async fn convert(&self, amount: &Money, to: &CurrencyCode, as_of: NaiveDate) -> Result<Money> {
        self.ensure_pair_supported(&amount.currency, to)?;
        self.rate_book().await?.convert(amount, to, as_of)
    }
}
