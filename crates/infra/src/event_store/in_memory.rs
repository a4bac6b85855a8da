//! In-memory event store for tests/dev.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use chrono::Utc;

use paygrid_core::ProviderEventId;
use paygrid_events::{EventStatus, InboundEvent};

use super::{EventStats, EventStore, EventStoreError};

/// In-memory event store. One map keyed by provider event id; dead letters
/// stay in the same table so `lastError`/`attempts` remain queryable.
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    events: RwLock<HashMap<ProviderEventId, InboundEvent>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> std::sync::Arc<Self> {
        std::sync::Arc::new(Self::new())
    }
}

impl EventStore for InMemoryEventStore {
    fn record(&self, event: InboundEvent) -> Result<(InboundEvent, bool), EventStoreError> {
        let mut events = self.events.write().unwrap_or_else(|e| e.into_inner());
        if let Some(existing) = events.get(&event.id) {
            return Ok((existing.clone(), false));
        }
        events.insert(event.id.clone(), event.clone());
        Ok((event, true))
    }

    fn get(&self, id: &ProviderEventId) -> Result<Option<InboundEvent>, EventStoreError> {
        let events = self.events.read().unwrap_or_else(|e| e.into_inner());
        Ok(events.get(id).cloned())
    }

    fn update(&self, event: &InboundEvent) -> Result<(), EventStoreError> {
        let mut events = self.events.write().unwrap_or_else(|e| e.into_inner());
        if !events.contains_key(&event.id) {
            return Err(EventStoreError::NotFound(event.id.clone()));
        }
        events.insert(event.id.clone(), event.clone());
        Ok(())
    }

    fn claim_next(&self) -> Result<Option<InboundEvent>, EventStoreError> {
        let mut events = self.events.write().unwrap_or_else(|e| e.into_inner());
        let now = Utc::now();

        // Oldest ready event first (FIFO by arrival; no cross-wallet
        // ordering is promised beyond that).
        let next = events
            .values()
            .filter(|e| {
                matches!(e.status, EventStatus::Pending | EventStatus::Failed { .. })
                    && e.is_ready(now)
            })
            .min_by_key(|e| e.received_at)
            .map(|e| e.id.clone());

        if let Some(id) = next {
            if let Some(event) = events.get_mut(&id) {
                event.mark_processing();
                return Ok(Some(event.clone()));
            }
        }

        Ok(None)
    }

    fn recover_stale(&self, timeout: Duration) -> Result<Vec<ProviderEventId>, EventStoreError> {
        let mut events = self.events.write().unwrap_or_else(|e| e.into_inner());
        let cutoff = Utc::now() - chrono::Duration::from_std(timeout).unwrap_or_default();

        let mut requeued = Vec::new();
        for event in events.values_mut() {
            if event.status == EventStatus::Processing && event.updated_at < cutoff {
                event.mark_requeued("processing timed out");
                requeued.push(event.id.clone());
            }
        }
        Ok(requeued)
    }

    fn list_dead_letters(&self, limit: usize) -> Result<Vec<InboundEvent>, EventStoreError> {
        let events = self.events.read().unwrap_or_else(|e| e.into_inner());
        let mut result: Vec<_> = events
            .values()
            .filter(|e| matches!(e.status, EventStatus::DeadLettered { .. }))
            .cloned()
            .collect();
        result.sort_by_key(|e| e.updated_at);
        result.truncate(limit);
        Ok(result)
    }

    fn retry_dead_letter(&self, id: &ProviderEventId) -> Result<InboundEvent, EventStoreError> {
        let mut events = self.events.write().unwrap_or_else(|e| e.into_inner());
        let event = events
            .get_mut(id)
            .ok_or_else(|| EventStoreError::NotFound(id.clone()))?;

        if !matches!(event.status, EventStatus::DeadLettered { .. }) {
            return Err(EventStoreError::Storage(format!(
                "event {id} is not dead-lettered"
            )));
        }

        event.status = EventStatus::Pending;
        event.attempts = 0;
        event.scheduled_at = None;
        event.updated_at = Utc::now();
        Ok(event.clone())
    }

    fn stats(&self) -> Result<EventStats, EventStoreError> {
        let events = self.events.read().unwrap_or_else(|e| e.into_inner());
        let mut stats = EventStats::default();
        for event in events.values() {
            match &event.status {
                EventStatus::Pending => stats.pending += 1,
                EventStatus::Processing => stats.processing += 1,
                EventStatus::Processed => stats.processed += 1,
                EventStatus::Failed { .. } => stats.failed += 1,
                EventStatus::DeadLettered { .. } => stats.dead_lettered += 1,
                EventStatus::Ignored => stats.ignored += 1,
            }
        }
        Ok(stats)
    }
}
