//! Outbound notification seam for balance changes.
//!
//! Downstream delivery (email, websockets, push) plugs in behind
//! [`BalanceListener`]; this module ships the structured-log implementation
//! the service runs with by default.

use paygrid_ledger::{BalanceChanged, BalanceListener};
use tracing::info;

/// Emits every balance change as a structured log event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingBalanceListener;

impl BalanceListener for TracingBalanceListener {
    fn balance_changed(&self, fact: &BalanceChanged) {
        info!(
            owner = %fact.owner,
            wallet = %fact.slug,
            balance = fact.balance.minor_units(),
            delta = fact.delta.minor_units(),
            kind = %fact.kind,
            source_event_id = fact.source_event_id.as_ref().map(|id| id.as_str()),
            "wallet balance changed"
        );
    }
}
