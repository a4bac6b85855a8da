//! The handler set: one handler per admitted provider event type.
//!
//! Each handler performs at most one ledger mutation and/or one commission
//! computation, keyed by the inbound event id so redelivery replays instead
//! of duplicating.

mod refund;
mod revenue;
mod topup;

pub use refund::ChargeRefundedHandler;
pub use revenue::ChargeSucceededHandler;
pub use topup::WalletTopupHandler;

use paygrid_core::{Amount, WalletOwner};
use paygrid_events::TenantContext;
use paygrid_ledger::LedgerError;

use crate::router::HandlerOutcome;

/// Positive minor-unit amount from a field of `payload.data.object`.
fn object_amount(payload: &serde_json::Value, field: &str) -> Result<Amount, String> {
    let raw = payload
        .pointer(&format!("/data/object/{field}"))
        .and_then(|v| v.as_i64())
        .ok_or_else(|| format!("missing or non-integer '{field}' in payload"))?;
    if raw <= 0 {
        return Err(format!("'{field}' must be positive, got {raw}"));
    }
    Ok(Amount::from_minor(raw))
}

/// The `metadata` object of `payload.data.object`, or `{}`.
fn object_metadata(payload: &serde_json::Value) -> serde_json::Value {
    payload
        .pointer("/data/object/metadata")
        .cloned()
        .unwrap_or_else(|| serde_json::json!({}))
}

/// The wallet owner for a ledger-mutating handler. The resolver guarantees
/// some context exists, but a tenant-only context has no wallet owner.
fn require_owner(ctx: &TenantContext) -> Result<WalletOwner, HandlerOutcome> {
    ctx.owner().ok_or_else(|| {
        HandlerOutcome::Fatal("context has no user or team to own a wallet".to_string())
    })
}

/// Map a ledger failure to a handler outcome: backend trouble is worth a
/// retry, everything else is a data problem retrying cannot fix.
fn ledger_outcome(err: LedgerError) -> HandlerOutcome {
    match err {
        LedgerError::Storage(msg) => HandlerOutcome::Retryable(msg),
        LedgerError::InsufficientBalance { .. } | LedgerError::Validation(_) => {
            HandlerOutcome::Fatal(err.to_string())
        }
    }
}
