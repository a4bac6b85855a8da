//! `charge.succeeded` — tenant revenue with platform commission.

use std::sync::Arc;

use paygrid_commission::{CommissionEngine, CommissionError};
use paygrid_events::{InboundEvent, TenantContext};
use paygrid_ledger::LedgerError;

use super::{object_amount, object_metadata, require_owner};
use crate::router::{EventHandler, HandlerOutcome};

/// Runs the gross charge amount through the commission engine: net to the
/// owner's revenue wallet, commission to the platform wallet.
pub struct ChargeSucceededHandler {
    engine: Arc<CommissionEngine>,
}

impl ChargeSucceededHandler {
    pub fn new(engine: Arc<CommissionEngine>) -> Self {
        Self { engine }
    }
}

impl EventHandler for ChargeSucceededHandler {
    fn handle(&self, event: &InboundEvent, ctx: &TenantContext) -> HandlerOutcome {
        let owner = match require_owner(ctx) {
            Ok(owner) => owner,
            Err(outcome) => return outcome,
        };

        let gross = match object_amount(&event.payload, "amount") {
            Ok(amount) => amount,
            Err(reason) => return HandlerOutcome::Fatal(reason),
        };

        match self.engine.compute_and_record(
            ctx.tenant_id,
            owner,
            gross,
            "charge",
            &event.id,
            object_metadata(&event.payload),
        ) {
            Ok(_) => HandlerOutcome::Success,
            Err(CommissionError::Ledger(LedgerError::Storage(msg))) => {
                HandlerOutcome::Retryable(msg)
            }
            Err(err) => HandlerOutcome::Fatal(err.to_string()),
        }
    }
}
