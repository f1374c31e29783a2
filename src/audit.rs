//! Audit trail hook, invoked after a mutation has been persisted.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::models::{Actor, Id, Role};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub actor_id: Id,
    pub role: Role,
    /// Operation name, e.g. `settle_capital_call`.
    pub action: String,
    pub entity_type: String,
    pub entity_id: Id,
    pub description: String,
    pub at: DateTime<Utc>,
}

impl AuditEvent {
    pub fn new(
        actor: &Actor,
        action: &str,
        entity_type: &str,
        entity_id: &Id,
        description: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            actor_id: actor.id.clone(),
            role: actor.role,
            action: action.to_string(),
            entity_type: entity_type.to_string(),
            entity_id: entity_id.clone(),
            description: description.into(),
            at,
        }
    }
}

/// Receives one event per committed mutation. Recording must not fail the
/// mutation, so sinks swallow their own errors.
pub trait AuditSink: Send + Sync {
    fn record(&self, event: AuditEvent);
}

/// Emits audit events as structured `tracing` events on target `wealthbook::audit`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, event: AuditEvent) {
        info!(
            target: "wealthbook::audit",
            actor_id = %event.actor_id,
            role = %event.role,
            action = %event.action,
            entity_type = %event.entity_type,
            entity_id = %event.entity_id,
            at = %event.at,
            "{}",
            event.description
        );
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn record(&self, _event: AuditEvent) {}
}

/// Keeps events in memory for inspection.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    events: Mutex<Vec<AuditEvent>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, event: AuditEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}
