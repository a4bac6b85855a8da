//! `paygrid-events` — inbound provider events and their processing metadata.
//!
//! Everything here is storage-agnostic: the envelope and its status state
//! machine, the per-channel admission allow-lists, the tenant-context
//! resolver, and the retry/backoff policy that drives the state machine.

pub mod admission;
pub mod context;
pub mod envelope;
pub mod retry;
pub mod scope;

pub use admission::{AdmissionFilter, Channel};
pub use context::{ContextResolver, ReferenceDirectory, ResolveError, TenantContext};
pub use envelope::{EventStatus, InboundEvent};
pub use retry::{BackoffStrategy, RetryPolicy};
pub use scope::{ScopeGuard, TenantScope};
