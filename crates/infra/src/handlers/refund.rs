//! `charge.refunded` — refund debit against the revenue wallet.

use std::sync::Arc;

use paygrid_events::{InboundEvent, TenantContext};
use paygrid_ledger::{EntryKind, WalletLedger};

use super::{object_amount, object_metadata, require_owner};
use crate::router::{EventHandler, HandlerOutcome};

/// Wallet slug refunds are debited from.
pub const REVENUE_SLUG: &str = paygrid_commission::REVENUE_SLUG;

/// Debits the refunded amount from the owner's revenue wallet.
///
/// A refund larger than the wallet balance is rejected as fatal rather than
/// clamped or allowed to go negative; it points at revenue that was never
/// credited here and needs a human to look at it. See DESIGN.md.
pub struct ChargeRefundedHandler {
    ledger: Arc<WalletLedger>,
}

impl ChargeRefundedHandler {
    pub fn new(ledger: Arc<WalletLedger>) -> Self {
        Self { ledger }
    }
}

impl EventHandler for ChargeRefundedHandler {
    fn handle(&self, event: &InboundEvent, ctx: &TenantContext) -> HandlerOutcome {
        let owner = match require_owner(ctx) {
            Ok(owner) => owner,
            Err(outcome) => return outcome,
        };

        let amount = match object_amount(&event.payload, "amount_refunded") {
            Ok(amount) => amount,
            Err(reason) => return HandlerOutcome::Fatal(reason),
        };

        match self.ledger.debit(
            owner,
            REVENUE_SLUG,
            amount,
            EntryKind::Refund,
            Some(event.id.clone()),
            object_metadata(&event.payload),
        ) {
            Ok(_) => HandlerOutcome::Success,
            Err(err) => super::ledger_outcome(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use paygrid_core::{Amount, ProviderEventId, TeamId, TenantId, WalletOwner};
    use paygrid_events::Channel;
    use paygrid_ledger::InMemoryWalletStore;
    use serde_json::json;

    fn refund_event(id: &str, amount_refunded: i64) -> InboundEvent {
        InboundEvent::new(
            ProviderEventId::new(id).unwrap(),
            "charge.refunded",
            Channel::Tenant,
            json!({"data": {"object": {"amount_refunded": amount_refunded, "metadata": {}}}}),
        )
    }

    fn setup() -> (Arc<WalletLedger>, ChargeRefundedHandler) {
        let ledger = Arc::new(WalletLedger::new(InMemoryWalletStore::arc()));
        (ledger.clone(), ChargeRefundedHandler::new(ledger))
    }

    #[test]
    fn debits_revenue_wallet() {
        let (ledger, handler) = setup();
        let team_id = TeamId::new();
        let team = WalletOwner::Team(team_id);
        ledger
            .credit(
                team,
                REVENUE_SLUG,
                Amount::from_minor(9_210),
                EntryKind::Revenue,
                Some(ProviderEventId::new("ch_456").unwrap()),
                json!({}),
            )
            .unwrap();

        let ctx = TenantContext::for_team(TenantId::new(), team_id);
        let outcome = handler.handle(&refund_event("re_1", 2_000), &ctx);

        assert_eq!(outcome, HandlerOutcome::Success);
        assert_eq!(ledger.balance(team, REVENUE_SLUG), Amount::from_minor(7_210));
    }

    #[test]
    fn refund_past_balance_is_fatal_and_leaves_state_untouched() {
        let (ledger, handler) = setup();
        let team_id = TeamId::new();
        let team = WalletOwner::Team(team_id);
        ledger
            .credit(
                team,
                REVENUE_SLUG,
                Amount::from_minor(1_000),
                EntryKind::Revenue,
                None,
                json!({}),
            )
            .unwrap();

        let ctx = TenantContext::for_team(TenantId::new(), team_id);
        let outcome = handler.handle(&refund_event("re_big", 5_000), &ctx);

        assert!(matches!(outcome, HandlerOutcome::Fatal(_)));
        assert_eq!(ledger.balance(team, REVENUE_SLUG), Amount::from_minor(1_000));
    }

    #[test]
    fn redelivered_refund_applies_once() {
        let (ledger, handler) = setup();
        let team_id = TeamId::new();
        let team = WalletOwner::Team(team_id);
        ledger
            .credit(team, REVENUE_SLUG, Amount::from_minor(9_210), EntryKind::Revenue, None, json!({}))
            .unwrap();

        let ctx = TenantContext::for_team(TenantId::new(), team_id);
        let event = refund_event("re_dup", 2_000);

        assert_eq!(handler.handle(&event, &ctx), HandlerOutcome::Success);
        assert_eq!(handler.handle(&event, &ctx), HandlerOutcome::Success);
        assert_eq!(ledger.balance(team, REVENUE_SLUG), Amount::from_minor(7_210));
    }
}
