//! `payment_intent.succeeded` — wallet top-up.

use std::sync::Arc;

use tracing::debug;

use paygrid_events::{InboundEvent, TenantContext};
use paygrid_ledger::{EntryKind, WalletLedger};

use super::{object_amount, object_metadata, require_owner};
use crate::router::{EventHandler, HandlerOutcome};

/// Wallet slug credited by top-ups.
pub const DEFAULT_SLUG: &str = "default";

/// Credits the owner's default wallet with the payment-intent amount when
/// the intent was created as a wallet top-up (`metadata.type = wallet_topup`).
/// Payment intents for anything else are not this handler's business.
pub struct WalletTopupHandler {
    ledger: Arc<WalletLedger>,
}

impl WalletTopupHandler {
    pub fn new(ledger: Arc<WalletLedger>) -> Self {
        Self { ledger }
    }
}

impl EventHandler for WalletTopupHandler {
    fn handle(&self, event: &InboundEvent, ctx: &TenantContext) -> HandlerOutcome {
        let metadata = object_metadata(&event.payload);
        let purpose = metadata.get("type").and_then(|v| v.as_str());
        if purpose != Some("wallet_topup") {
            debug!(
                event_id = %event.id,
                purpose = purpose.unwrap_or("none"),
                "payment intent is not a wallet top-up, nothing to do"
            );
            return HandlerOutcome::Success;
        }

        let owner = match require_owner(ctx) {
            Ok(owner) => owner,
            Err(outcome) => return outcome,
        };

        let amount = match object_amount(&event.payload, "amount") {
            Ok(amount) => amount,
            Err(reason) => return HandlerOutcome::Fatal(reason),
        };

        match self.ledger.credit(
            owner,
            DEFAULT_SLUG,
            amount,
            EntryKind::Topup,
            Some(event.id.clone()),
            metadata,
        ) {
            Ok(_) => HandlerOutcome::Success,
            Err(err) => super::ledger_outcome(err),
        }
    }
}
