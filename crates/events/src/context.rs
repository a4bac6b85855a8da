//! Tenant context resolution.
//!
//! The context is derived **once** per event, before any handler runs, and is
//! passed explicitly to everything that needs tenant scope. There is no
//! ambient "current tenant" lookup in handler code.

use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use paygrid_core::{ProviderEventId, TeamId, TenantId, UserId, WalletOwner};

use crate::envelope::InboundEvent;

/// Tenant/user/team identifiers an event resolved to.
///
/// Immutable after resolution. At least one of `tenant_id`/`user_id` must be
/// present for any event that reaches a ledger-mutating handler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantContext {
    pub tenant_id: Option<TenantId>,
    pub user_id: Option<UserId>,
    pub team_id: Option<TeamId>,
}

impl TenantContext {
    pub fn for_user(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
            ..Default::default()
        }
    }

    pub fn for_team(tenant_id: TenantId, team_id: TeamId) -> Self {
        Self {
            tenant_id: Some(tenant_id),
            team_id: Some(team_id),
            user_id: None,
        }
    }

    /// True if the context carries at least one identifier.
    pub fn is_resolved(&self) -> bool {
        self.tenant_id.is_some() || self.user_id.is_some() || self.team_id.is_some()
    }

    /// The wallet owner this context acts on behalf of. Teams win over users:
    /// an event carrying both identifies a member acting for the team.
    pub fn owner(&self) -> Option<WalletOwner> {
        if let Some(team_id) = self.team_id {
            return Some(WalletOwner::Team(team_id));
        }
        self.user_id.map(WalletOwner::User)
    }
}

/// Context resolution failure. Terminal: retrying cannot manufacture
/// missing metadata.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("no tenant context resolvable for event {0}")]
    NoTenantContext(ProviderEventId),

    #[error("malformed context metadata on event {event_id}: {reason}")]
    Malformed {
        event_id: ProviderEventId,
        reason: String,
    },
}

/// Fallback lookup from a provider object reference (e.g. a payment-intent
/// id) to the context recorded when the local application created it.
pub trait ReferenceDirectory: Send + Sync {
    fn lookup(&self, provider_ref: &str) -> Option<TenantContext>;
}

/// Resolves the tenant context for an inbound event.
///
/// Extraction order:
/// 1. explicit ids embedded in `payload.data.object.metadata` by the
///    application at event-creation time (authoritative),
/// 2. the tenant identified by the intake endpoint (tenant channel),
/// 3. fallback lookup of a cross-referenced provider object id through the
///    [`ReferenceDirectory`].
#[derive(Clone, Default)]
pub struct ContextResolver {
    directory: Option<Arc<dyn ReferenceDirectory>>,
}

impl ContextResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_directory(directory: Arc<dyn ReferenceDirectory>) -> Self {
        Self {
            directory: Some(directory),
        }
    }

    pub fn resolve(&self, event: &InboundEvent) -> Result<TenantContext, ResolveError> {
        let mut ctx = self.from_metadata(event)?;

        if ctx.tenant_id.is_none() {
            ctx.tenant_id = event.endpoint_tenant;
        }

        if !ctx.is_resolved() {
            if let Some(directory) = &self.directory {
                if let Some(reference) = object_reference(&event.payload) {
                    if let Some(found) = directory.lookup(reference) {
                        ctx = found;
                    }
                }
            }
        }

        if ctx.is_resolved() {
            Ok(ctx)
        } else {
            Err(ResolveError::NoTenantContext(event.id.clone()))
        }
    }

    fn from_metadata(&self, event: &InboundEvent) -> Result<TenantContext, ResolveError> {
        let metadata = event
            .payload
            .pointer("/data/object/metadata")
            .and_then(|v| v.as_object());

        let Some(metadata) = metadata else {
            return Ok(TenantContext::default());
        };

        let parse_id = |key: &str| -> Result<Option<uuid::Uuid>, ResolveError> {
            match metadata.get(key).and_then(|v| v.as_str()) {
                Some(raw) => uuid::Uuid::from_str(raw).map(Some).map_err(|e| {
                    ResolveError::Malformed {
                        event_id: event.id.clone(),
                        reason: format!("{key}: {e}"),
                    }
                }),
                None => Ok(None),
            }
        };

        Ok(TenantContext {
            tenant_id: parse_id("tenant_id")?.map(TenantId::from_uuid),
            user_id: parse_id("user_id")?.map(UserId::from_uuid),
            team_id: parse_id("team_id")?.map(TeamId::from_uuid),
        })
    }
}

impl core::fmt::Debug for ContextResolver {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ContextResolver")
            .field("has_directory", &self.directory.is_some())
            .finish()
    }
}

/// The provider object id a payload cross-references, used for fallback
/// lookups: the object's own id, or its parent payment intent.
fn object_reference(payload: &serde_json::Value) -> Option<&str> {
    payload
        .pointer("/data/object/payment_intent")
        .and_then(|v| v.as_str())
        .or_else(|| payload.pointer("/data/object/id").and_then(|v| v.as_str()))
}
