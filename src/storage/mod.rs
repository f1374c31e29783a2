mod json_file;
mod memory;

pub use json_file::JsonFileStorage;
pub use memory::MemoryStorage;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::models::{
    EquityHolding, ExchangeRateObservation, FixedIncomeHolding, Id, PrivateFund, Property,
    MANUAL_SOURCE,
};

pub type StorageResult<T> = std::result::Result<T, StorageError>;

#[derive(Debug, Error)]
pub enum StorageError {
    /// The stored version moved on since the record was loaded.
    #[error("version conflict on {entity} {id}")]
    Conflict { entity: &'static str, id: Id },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Serde(#[from] serde_json::Error),

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Listing filter. Soft-deleted records are excluded unless asked for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    pub include_deleted: bool,
    pub country: Option<String>,
    pub sector: Option<String>,
}

impl RecordFilter {
    pub fn live() -> Self {
        Self::default()
    }

    pub fn with_deleted() -> Self {
        Self {
            include_deleted: true,
            ..Self::default()
        }
    }

    fn accepts(&self, deleted: bool, country: Option<&str>, sector: Option<&str>) -> bool {
        if deleted && !self.include_deleted {
            return false;
        }
        let matches = |wanted: &Option<String>, actual: Option<&str>| match wanted {
            Some(wanted) => actual.is_some_and(|a| a.eq_ignore_ascii_case(wanted)),
            None => true,
        };
        matches(&self.country, country) && matches(&self.sector, sector)
    }
}

/// A versioned top-level aggregate as seen by storage backends.
pub trait Record: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
    const ENTITY: &'static str;

    fn record_id(&self) -> &Id;
    fn record_version(&self) -> u64;
    /// Only storage backends should call this, after a successful save.
    fn set_record_version(&mut self, version: u64);
    fn record_created_at(&self) -> DateTime<Utc>;
    fn matches(&self, filter: &RecordFilter) -> bool;
}

macro_rules! impl_record {
    ($ty:ty, $entity:literal, |$r:ident| $country:expr, $sector:expr) => {
        impl Record for $ty {
            const ENTITY: &'static str = $entity;

            fn record_id(&self) -> &Id {
                &self.id
            }

            fn record_version(&self) -> u64 {
                self.version
            }

            fn set_record_version(&mut self, version: u64) {
                self.version = version;
            }

            fn record_created_at(&self) -> DateTime<Utc> {
                self.created_at
            }

            fn matches(&self, filter: &RecordFilter) -> bool {
                let $r = self;
                filter.accepts($r.deleted_at.is_some(), $country, $sector)
            }
        }
    };
}

impl_record!(EquityHolding, "equity_holding", |h| h.country.as_deref(), h.sector.as_deref());
impl_record!(FixedIncomeHolding, "fixed_income_holding", |_h| None, None);
impl_record!(Property, "property", |p| p.country.as_deref(), None);
impl_record!(PrivateFund, "private_fund", |f| f.geography.as_deref(), f.sector.as_deref());

/// Check the optimistic version and return the version to store.
pub fn next_version<T: Record>(stored: Option<&T>, incoming: &T) -> StorageResult<u64> {
    let current = stored.map(Record::record_version).unwrap_or(0);
    if incoming.record_version() != current {
        return Err(StorageError::Conflict {
            entity: T::ENTITY,
            id: incoming.record_id().clone(),
        });
    }
    Ok(current + 1)
}

/// Discovery order used by every backend: creation time, then id.
pub fn sort_records<T: Record>(records: &mut [T]) {
    records.sort_by(|a, b| {
        a.record_created_at()
            .cmp(&b.record_created_at())
            .then_with(|| a.record_id().cmp(b.record_id()))
    });
}

/// How a rate write treats an existing live observation for the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateWriteMode {
    /// Overwrite in place and mark the source `manual`.
    Manual,
    /// Refresh non-manual observations; never replace a manual override.
    Ingest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RateWriteOutcome {
    Inserted,
    Updated,
    Skipped,
}

/// Apply one incoming observation to the stored set, in place.
///
/// Backends call this while holding their write lock, which makes the
/// read-modify-write atomic per `(from, to, date)` key.
pub fn merge_rate(
    stored: &mut Vec<ExchangeRateObservation>,
    mut incoming: ExchangeRateObservation,
    mode: RateWriteMode,
) -> (ExchangeRateObservation, RateWriteOutcome) {
    if mode == RateWriteMode::Manual {
        incoming.source = MANUAL_SOURCE.to_string();
    }
    let key = incoming.key();
    let position = stored
        .iter()
        .position(|obs| !obs.is_deleted() && obs.key() == key);

    match position {
        None => {
            stored.push(incoming.clone());
            (incoming, RateWriteOutcome::Inserted)
        }
        Some(i) if mode == RateWriteMode::Ingest && stored[i].is_manual() => {
            (stored[i].clone(), RateWriteOutcome::Skipped)
        }
        Some(i) => {
            let obs = &mut stored[i];
            obs.rate = incoming.rate;
            obs.source = incoming.source;
            obs.updated_at = incoming.updated_at;
            (obs.clone(), RateWriteOutcome::Updated)
        }
    }
}

/// Persistence collaborator. Every call is atomic on its own.
#[async_trait::async_trait]
pub trait Storage: Send + Sync {
    // Equities
    async fn get_equity(&self, id: &Id) -> StorageResult<Option<EquityHolding>>;
    async fn list_equities(&self, filter: &RecordFilter) -> StorageResult<Vec<EquityHolding>>;
    /// Returns the new version. Fails with `Conflict` on a stale version.
    async fn save_equity(&self, holding: &EquityHolding) -> StorageResult<u64>;

    // Fixed income
    async fn get_fixed_income(&self, id: &Id) -> StorageResult<Option<FixedIncomeHolding>>;
    async fn list_fixed_income(
        &self,
        filter: &RecordFilter,
    ) -> StorageResult<Vec<FixedIncomeHolding>>;
    async fn save_fixed_income(&self, holding: &FixedIncomeHolding) -> StorageResult<u64>;

    // Real estate
    async fn get_property(&self, id: &Id) -> StorageResult<Option<Property>>;
    async fn list_properties(&self, filter: &RecordFilter) -> StorageResult<Vec<Property>>;
    async fn save_property(&self, property: &Property) -> StorageResult<u64>;

    // Private funds
    async fn get_fund(&self, id: &Id) -> StorageResult<Option<PrivateFund>>;
    async fn list_funds(&self, filter: &RecordFilter) -> StorageResult<Vec<PrivateFund>>;
    async fn save_fund(&self, fund: &PrivateFund) -> StorageResult<u64>;

    // Exchange rates
    async fn list_rates(&self, include_deleted: bool) -> StorageResult<Vec<ExchangeRateObservation>>;
    async fn write_rate(
        &self,
        observation: ExchangeRateObservation,
        mode: RateWriteMode,
    ) -> StorageResult<(ExchangeRateObservation, RateWriteOutcome)>;
    /// Stamp `deleted_at`. Returns `None` when no live observation has this id.
    async fn soft_delete_rate(
        &self,
        id: &Id,
        at: DateTime<Utc>,
    ) -> StorageResult<Option<ExchangeRateObservation>>;
}
