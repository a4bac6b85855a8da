//! `paygrid-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod error;
pub mod id;
pub mod money;
pub mod owner;

pub use error::{DomainError, DomainResult};
pub use id::{ProviderEventId, TeamId, TenantId, UserId};
pub use money::{Amount, CommissionRate};
pub use owner::WalletOwner;
