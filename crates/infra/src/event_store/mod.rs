//! Event envelope storage.
//!
//! The store is the single authoritative admission gate against duplicate
//! delivery: `record` deduplicates by provider event id, and everything else
//! in the pipeline relies on that check having happened before any side
//! effect.

mod in_memory;

pub use in_memory::InMemoryEventStore;

use std::sync::Arc;
use std::time::Duration;

use paygrid_core::ProviderEventId;
use paygrid_events::InboundEvent;

/// Event store error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EventStoreError {
    #[error("event not found: {0}")]
    NotFound(ProviderEventId),
    #[error("storage error: {0}")]
    Storage(String),
}

/// Counts per status, for diagnostics and operational dashboards.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct EventStats {
    pub pending: usize,
    pub processing: usize,
    pub processed: usize,
    pub failed: usize,
    pub dead_lettered: usize,
    pub ignored: usize,
}

/// Durable store of inbound events, keyed by provider event id.
pub trait EventStore: Send + Sync {
    /// Persist a new event, or return the existing record for a duplicate
    /// delivery. `is_new == false` means every side effect must be skipped.
    fn record(&self, event: InboundEvent) -> Result<(InboundEvent, bool), EventStoreError>;

    fn get(&self, id: &ProviderEventId) -> Result<Option<InboundEvent>, EventStoreError>;

    /// Persist updated processing state.
    fn update(&self, event: &InboundEvent) -> Result<(), EventStoreError>;

    /// Claim the oldest ready event (`Pending`, or `Failed` whose backoff
    /// elapsed) and mark it `Processing`. Returns `None` when idle.
    fn claim_next(&self) -> Result<Option<InboundEvent>, EventStoreError>;

    /// Crash recovery: requeue events stuck in `Processing` longer than
    /// `timeout`. Returns the requeued ids.
    fn recover_stale(&self, timeout: Duration) -> Result<Vec<ProviderEventId>, EventStoreError>;

    /// Dead-lettered events, oldest first.
    fn list_dead_letters(&self, limit: usize) -> Result<Vec<InboundEvent>, EventStoreError>;

    /// Manual replay: move a dead-lettered event back to `Pending` with a
    /// fresh attempt budget.
    fn retry_dead_letter(&self, id: &ProviderEventId) -> Result<InboundEvent, EventStoreError>;

    fn stats(&self) -> Result<EventStats, EventStoreError>;
}

impl<S: EventStore + ?Sized> EventStore for Arc<S> {
    fn record(&self, event: InboundEvent) -> Result<(InboundEvent, bool), EventStoreError> {
        (**self).record(event)
    }

    fn get(&self, id: &ProviderEventId) -> Result<Option<InboundEvent>, EventStoreError> {
        (**self).get(id)
    }

    fn update(&self, event: &InboundEvent) -> Result<(), EventStoreError> {
        (**self).update(event)
    }

    fn claim_next(&self) -> Result<Option<InboundEvent>, EventStoreError> {
        (**self).claim_next()
    }

    fn recover_stale(&self, timeout: Duration) -> Result<Vec<ProviderEventId>, EventStoreError> {
        (**self).recover_stale(timeout)
    }

    fn list_dead_letters(&self, limit: usize) -> Result<Vec<InboundEvent>, EventStoreError> {
        (**self).list_dead_letters(limit)
    }

    fn retry_dead_letter(&self, id: &ProviderEventId) -> Result<InboundEvent, EventStoreError> {
        (**self).retry_dead_letter(id)
    }

    fn stats(&self) -> Result<EventStats, EventStoreError> {
        (**self).stats()
    }
}
