//! Inbound event envelope and its processing state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use paygrid_core::{ProviderEventId, TenantId};

use crate::admission::Channel;
use crate::retry::RetryPolicy;

/// Processing status of an inbound event.
///
/// `Pending -> Processing -> {Processed | Failed -> Pending (after backoff) | DeadLettered}`
///
/// `Ignored` is the audit-only terminal state for events that were persisted
/// but never admitted for processing (no handler exists for their type).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    /// Queued, waiting to be picked up.
    Pending,
    /// Currently being processed by a worker.
    Processing,
    /// Side effects applied exactly once.
    Processed,
    /// Failed, will be retried after backoff.
    Failed { error: String, attempt: u32 },
    /// Exhausted retries or failed terminally; requires manual intervention.
    DeadLettered { error: String, attempts: u32 },
    /// Persisted for audit, never queued (not on any allow-list).
    Ignored,
}

impl EventStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            EventStatus::Processed | EventStatus::DeadLettered { .. } | EventStatus::Ignored
        )
    }

    pub fn is_retriable(&self) -> bool {
        matches!(self, EventStatus::Failed { .. })
    }
}

/// Durable record of one inbound provider event.
///
/// The provider-assigned `id` is the idempotency key: a second delivery with
/// the same `id` must short-circuit at the store before any side effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundEvent {
    /// Provider-assigned, globally unique id.
    pub id: ProviderEventId,
    /// Provider event type string (e.g. `payment_intent.succeeded`).
    pub event_type: String,
    /// Logical channel the event arrived on.
    pub channel: Channel,
    /// Tenant identified by the intake endpoint, if any (tenant channel).
    pub endpoint_tenant: Option<TenantId>,
    /// Raw provider payload, opaque to the envelope.
    pub payload: serde_json::Value,
    /// Current processing status.
    pub status: EventStatus,
    /// Number of processing attempts so far.
    pub attempts: u32,
    /// Error from the most recent failed attempt.
    pub last_error: Option<String>,
    pub received_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    /// Last status change; used for stale-`Processing` crash recovery.
    pub updated_at: DateTime<Utc>,
    /// Earliest time the next attempt may run (backoff scheduling).
    pub scheduled_at: Option<DateTime<Utc>>,
}

impl InboundEvent {
    pub fn new(
        id: ProviderEventId,
        event_type: impl Into<String>,
        channel: Channel,
        payload: serde_json::Value,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            event_type: event_type.into(),
            channel,
            endpoint_tenant: None,
            payload,
            status: EventStatus::Pending,
            attempts: 0,
            last_error: None,
            received_at: now,
            processed_at: None,
            updated_at: now,
            scheduled_at: None,
        }
    }

    pub fn with_endpoint_tenant(mut self, tenant_id: TenantId) -> Self {
        self.endpoint_tenant = Some(tenant_id);
        self
    }

    /// Check if the event is ready to be claimed (backoff elapsed).
    pub fn is_ready(&self, now: DateTime<Utc>) -> bool {
        match self.scheduled_at {
            Some(at) => now >= at,
            None => true,
        }
    }

    /// Claim the event for processing; counts one attempt.
    pub fn mark_processing(&mut self) {
        self.status = EventStatus::Processing;
        self.attempts += 1;
        self.updated_at = Utc::now();
    }

    /// Side effects were applied (or replayed idempotently).
    pub fn mark_processed(&mut self) {
        let now = Utc::now();
        self.status = EventStatus::Processed;
        self.processed_at = Some(now);
        self.updated_at = now;
    }

    /// Record a retryable failure: schedules the next attempt with backoff,
    /// or dead-letters once the policy's attempt budget is exhausted.
    pub fn mark_failed(&mut self, error: impl Into<String>, policy: &RetryPolicy) {
        let error = error.into();
        let now = Utc::now();
        self.last_error = Some(error.clone());
        self.updated_at = now;

        if policy.should_retry(self.attempts) {
            let delay = policy.delay_for_attempt(self.attempts);
            self.scheduled_at =
                Some(now + chrono::Duration::from_std(delay).unwrap_or_default());
            self.status = EventStatus::Failed {
                error,
                attempt: self.attempts,
            };
        } else {
            self.scheduled_at = None;
            self.status = EventStatus::DeadLettered {
                error,
                attempts: self.attempts,
            };
        }
    }

    /// Terminal failure: no retry can help (fatal handler error, missing
    /// tenant context). Preserves `last_error` and `attempts` for diagnosis.
    pub fn mark_dead_lettered(&mut self, error: impl Into<String>) {
        let error = error.into();
        self.last_error = Some(error.clone());
        self.updated_at = Utc::now();
        self.scheduled_at = None;
        self.status = EventStatus::DeadLettered {
            error,
            attempts: self.attempts,
        };
    }

    /// Persisted for audit only; the admission filter declined to queue it.
    pub fn mark_ignored(&mut self) {
        self.status = EventStatus::Ignored;
        self.updated_at = Utc::now();
    }

    /// Crash recovery: a worker died mid-processing, requeue the event.
    pub fn mark_requeued(&mut self, reason: impl Into<String>) {
        self.last_error = Some(reason.into());
        self.status = EventStatus::Pending;
        self.scheduled_at = None;
        self.updated_at = Utc::now();
    }
}
