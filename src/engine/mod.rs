//! The engine ties collaborators to the state machines: it authorizes the
//! actor, loads the aggregate, snapshots exchange rates, runs the event,
//! saves with an optimistic version check and reports to the audit sink.

mod equities;
mod fixed_income;
mod funds;
mod rates;
mod real_estate;
mod valuation;

pub use rates::{IngestReport, RateInput};

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::audit::{AuditEvent, AuditSink, TracingAuditSink};
use crate::clock::{Clock, SystemClock};
use crate::config::Settings;
use crate::error::{Error, Result};
use crate::fx::RateBook;
use crate::lifecycle::EventContext;
use crate::models::{Actor, EquityHolding, FixedIncomeHolding, Id, Money, PrivateFund, Property};
use crate::storage::{Record, Storage, StorageResult};

/// A stored aggregate the engine can load, mutate and save.
#[async_trait::async_trait]
trait Aggregate: Record {
    fn not_found(id: &Id) -> Error;
    fn is_gone(&self) -> bool;
    async fn load(storage: &dyn Storage, id: &Id) -> StorageResult<Option<Self>>;
    async fn store(storage: &dyn Storage, aggregate: &Self) -> StorageResult<u64>;
}

macro_rules! impl_aggregate {
    ($ty:ty, $not_found:path, $get:ident, $save:ident) => {
        #[async_trait::async_trait]
        impl Aggregate for $ty {
            fn not_found(id: &Id) -> Error {
                $not_found(id.clone())
            }

            fn is_gone(&self) -> bool {
                self.is_deleted()
            }

            async fn load(storage: &dyn Storage, id: &Id) -> StorageResult<Option<Self>> {
                storage.$get(id).await
            }

            async fn store(storage: &dyn Storage, aggregate: &Self) -> StorageResult<u64> {
                storage.$save(aggregate).await
            }
        }
    };
}

impl_aggregate!(EquityHolding, Error::HoldingNotFound, get_equity, save_equity);
impl_aggregate!(FixedIncomeHolding, Error::FixedIncomeNotFound, get_fixed_income, save_fixed_income);
impl_aggregate!(Property, Error::PropertyNotFound, get_property, save_property);
impl_aggregate!(PrivateFund, Error::FundNotFound, get_fund, save_fund);

/// Valuation and lifecycle engine over a storage backend.
///
/// Each mutating call is one load-modify-save against a single aggregate.
/// Saves carry the version that was loaded, so of two concurrent writers to
/// the same aggregate only one commits; the other gets [`Error::Conflict`].
pub struct Engine {
    storage: Arc<dyn Storage>,
    audit: Arc<dyn AuditSink>,
    clock: Arc<dyn Clock>,
    settings: Settings,
}

impl Engine {
    pub fn new(storage: Arc<dyn Storage>, settings: Settings) -> Self {
        Self {
            storage,
            audit: Arc::new(TracingAuditSink),
            clock: Arc::new(SystemClock),
            settings,
        }
    }

    pub fn with_audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    /// Business date in the configured timezone.
    pub fn today(&self) -> NaiveDate {
        self.clock.today_in(self.settings.timezone())
    }

    /// Snapshot of every live rate observation.
    pub async fn rate_book(&self) -> Result<RateBook> {
        let observations = self.storage.list_rates(false).await?;
        Ok(RateBook::from_observations(observations))
    }

    fn ensure_supported(&self, money: &Money) -> Result<()> {
        self.settings.ensure_supported(&money.currency)
    }

    fn authorize(&self, actor: &Actor, action: &'static str) -> Result<()> {
        actor.ensure_can_mutate(action).inspect_err(|_| {
            warn!(
                actor_id = %actor.id,
                role = %actor.role,
                action,
                "mutation forbidden for role"
            );
        })
    }

    fn audit(&self, actor: &Actor, action: &str, entity_type: &str, entity_id: &Id, description: String) {
        self.audit.record(AuditEvent::new(
            actor,
            action,
            entity_type,
            entity_id,
            description,
            self.clock.now(),
        ));
    }

    async fn load_live<A: Aggregate>(&self, id: &Id) -> Result<A> {
        match A::load(self.storage.as_ref(), id).await? {
            Some(aggregate) if !aggregate.is_gone() => Ok(aggregate),
            _ => Err(A::not_found(id)),
        }
    }

    /// Persist a freshly built aggregate.
    async fn create<A: Aggregate>(
        &self,
        actor: &Actor,
        action: &'static str,
        mut aggregate: A,
        description: String,
    ) -> Result<A> {
        self.authorize(actor, action)?;
        let version = A::store(self.storage.as_ref(), &aggregate).await?;
        aggregate.set_record_version(version);
        let id = aggregate.record_id().clone();
        self.audit(actor, action, A::ENTITY, &id, description);
        info!(action, entity = A::ENTITY, id = %id, "aggregate created");
        Ok(aggregate)
    }

    /// Run one event against a live aggregate and commit it.
    ///
    /// Nothing is saved or audited when the event fails.
    async fn mutate<A, T, F>(
        &self,
        actor: &Actor,
        action: &'static str,
        id: &Id,
        description: String,
        event: F,
    ) -> Result<(A, T)>
    where
        A: Aggregate,
        F: FnOnce(&mut A, &EventContext<'_>) -> Result<T> + Send,
        T: Send,
    {
        self.authorize(actor, action)?;
        let mut aggregate: A = self.load_live(id).await?;
        let fx = self.rate_book().await?;
        let ctx = EventContext::new(
            &fx,
            self.settings.base_currency(),
            self.clock.now(),
            self.today(),
        );

        let outcome = event(&mut aggregate, &ctx).inspect_err(|e| {
            warn!(action, entity = A::ENTITY, id = %id, error = %e, "event rejected");
        })?;

        let version = A::store(self.storage.as_ref(), &aggregate)
            .await
            .map_err(Error::from)
            .inspect_err(|e| {
                warn!(action, entity = A::ENTITY, id = %id, error = %e, "save failed");
            })?;
        aggregate.set_record_version(version);

        self.audit(actor, action, A::ENTITY, id, description);
        info!(action, entity = A::ENTITY, id = %id, version, "event committed");
        Ok((aggregate, outcome))
    }
}
