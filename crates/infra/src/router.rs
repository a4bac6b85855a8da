//! Typed event routing.
//!
//! One registry, built once at startup, maps event-type strings to handlers.
//! The full set of handled types is enumerable and testable in one place —
//! no dispatch scattered across match arms in different modules.

use std::collections::HashMap;

use tracing::warn;

use paygrid_events::{InboundEvent, TenantContext};

/// Result of one handler invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerOutcome {
    /// Side effects applied (or replayed idempotently).
    Success,
    /// Transient failure (datastore unavailable, lock contention); the
    /// supervisor re-queues with backoff.
    Retryable(String),
    /// Permanent failure (owner deleted, malformed amount); never retried.
    Fatal(String),
}

/// A typed handler for one provider event type.
///
/// Handlers must be safe to invoke twice with the same event: the ledger and
/// commission record enforce idempotency by `source_event_id`, so a replay
/// returns the original side effect instead of duplicating it.
pub trait EventHandler: Send + Sync {
    fn handle(&self, event: &InboundEvent, ctx: &TenantContext) -> HandlerOutcome;
}

/// Dispatch table from event type to handler.
#[derive(Default)]
pub struct EventRouter {
    handlers: HashMap<String, Box<dyn EventHandler>>,
}

impl EventRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        mut self,
        event_type: impl Into<String>,
        handler: impl EventHandler + 'static,
    ) -> Self {
        self.handlers.insert(event_type.into(), Box::new(handler));
        self
    }

    /// All event types this router can handle, sorted.
    pub fn handled_types(&self) -> Vec<&str> {
        let mut types: Vec<_> = self.handlers.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }

    /// Dispatch to the handler for the event's type. An unmatched type is
    /// logged and treated as success: the admission filter should have kept
    /// it out, so this is a defensive default, not an error path.
    pub fn route(&self, event: &InboundEvent, ctx: &TenantContext) -> HandlerOutcome {
        match self.handlers.get(&event.event_type) {
            Some(handler) => handler.handle(event, ctx),
            None => {
                warn!(
                    event_id = %event.id,
                    event_type = %event.event_type,
                    "no handler registered for admitted event type"
                );
                HandlerOutcome::Success
            }
        }
    }
}
