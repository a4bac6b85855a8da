//! Tenant execution scope with guaranteed teardown.
//!
//! The equivalent of "switch to the tenant's database/schema" for the
//! duration of one event. Workers are reused across events, so the switch
//! must revert to the neutral scope unconditionally when processing ends —
//! the guard restores the previous scope on drop, including during unwind.

use std::sync::{Arc, Mutex};

use paygrid_core::TenantId;

/// Process-wide active tenant scope shared by the worker and any
/// scope-sensitive collaborators (repositories, connection selectors).
#[derive(Debug, Clone, Default)]
pub struct TenantScope {
    current: Arc<Mutex<Option<TenantId>>>,
}

impl TenantScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// The currently active tenant; `None` is the neutral/central scope.
    pub fn current(&self) -> Option<TenantId> {
        *self.current.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Switch to `tenant` for the lifetime of the returned guard.
    #[must_use = "the scope reverts when the guard is dropped"]
    pub fn enter(&self, tenant: Option<TenantId>) -> ScopeGuard {
        let previous = {
            let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
            std::mem::replace(&mut *current, tenant)
        };
        ScopeGuard {
            scope: Arc::clone(&self.current),
            previous,
        }
    }
}

/// RAII guard restoring the previous scope on drop.
#[derive(Debug)]
pub struct ScopeGuard {
    scope: Arc<Mutex<Option<TenantId>>>,
    previous: Option<TenantId>,
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        let mut current = self.scope.lock().unwrap_or_else(|e| e.into_inner());
        *current = self.previous.take();
    }
}
