//! Commission rate schedule.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use paygrid_core::{CommissionRate, TenantId};

/// Rates in effect: a platform-wide default plus optional per-tenant
/// overrides. Precedence: **more specific wins** — a tenant override beats
/// the platform default; without a tenant id only the default applies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateSchedule {
    default_rate: CommissionRate,
    tenant_overrides: HashMap<TenantId, CommissionRate>,
}

impl RateSchedule {
    pub fn new(default_rate: CommissionRate) -> Self {
        Self {
            default_rate,
            tenant_overrides: HashMap::new(),
        }
    }

    pub fn with_override(mut self, tenant_id: TenantId, rate: CommissionRate) -> Self {
        self.tenant_overrides.insert(tenant_id, rate);
        self
    }

    pub fn default_rate(&self) -> CommissionRate {
        self.default_rate
    }

    /// The rate in effect for a (possibly absent) tenant.
    pub fn resolve(&self, tenant_id: Option<TenantId>) -> CommissionRate {
        tenant_id
            .and_then(|id| self.tenant_overrides.get(&id).copied())
            .unwrap_or(self.default_rate)
    }
}
