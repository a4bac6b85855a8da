//! Per-channel admission of provider event types.
//!
//! Providers emit dozens of event types; only a known subset has a handler.
//! Disallowed types are persisted for audit but never queued, so they cannot
//! pile up as permanently-failed work.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Logical intake channel for an inbound event.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// Platform-level endpoint (no tenant in the URL).
    Platform,
    /// Tenant-parameterized endpoint.
    Tenant,
}

impl core::fmt::Display for Channel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Channel::Platform => f.write_str("platform"),
            Channel::Tenant => f.write_str("tenant"),
        }
    }
}

/// Static allow-list of processable event types, one list per channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmissionFilter {
    platform: BTreeSet<String>,
    tenant: BTreeSet<String>,
}

impl AdmissionFilter {
    pub fn new(
        platform: impl IntoIterator<Item = String>,
        tenant: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            platform: platform.into_iter().collect(),
            tenant: tenant.into_iter().collect(),
        }
    }

    /// Allow-lists covering the handler set shipped with this workspace.
    pub fn with_defaults() -> Self {
        Self::new(
            ["payment_intent.succeeded".to_string()],
            [
                "payment_intent.succeeded".to_string(),
                "charge.succeeded".to_string(),
                "charge.refunded".to_string(),
            ],
        )
    }

    /// Whether an event of this type should be queued for processing.
    pub fn should_process(&self, event_type: &str, channel: Channel) -> bool {
        match channel {
            Channel::Platform => self.platform.contains(event_type),
            Channel::Tenant => self.tenant.contains(event_type),
        }
    }

    /// Enumerate the admitted types for a channel (diagnostics, docs).
    pub fn allowed(&self, channel: Channel) -> impl Iterator<Item = &str> {
        match channel {
            Channel::Platform => self.platform.iter(),
            Channel::Tenant => self.tenant.iter(),
        }
        .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_admit_handled_types_per_channel() {
        let filter = AdmissionFilter::with_defaults();

        assert!(filter.should_process("payment_intent.succeeded", Channel::Platform));
        assert!(filter.should_process("charge.succeeded", Channel::Tenant));
        assert!(!filter.should_process("charge.succeeded", Channel::Platform));
    }

    #[test]
    fn unknown_types_are_rejected() {
        let filter = AdmissionFilter::with_defaults();

        assert!(!filter.should_process("customer.subscription.updated", Channel::Platform));
        assert!(!filter.should_process("customer.subscription.updated", Channel::Tenant));
    }

    #[test]
    fn custom_lists_override_defaults() {
        let filter = AdmissionFilter::new(
            ["payout.paid".to_string()],
            std::iter::empty::<String>(),
        );

        assert!(filter.should_process("payout.paid", Channel::Platform));
        assert!(!filter.should_process("payment_intent.succeeded", Channel::Platform));
        assert_eq!(filter.allowed(Channel::Tenant).count(), 0);
    }
}
