//! Wallet ledger service: the credit/debit API the rest of the system uses.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use paygrid_core::{Amount, ProviderEventId, WalletOwner};

use crate::store::{AppendOutcome, WalletStore, WalletStoreError};
use crate::wallet::{EntryFilter, EntryKind, LedgerEntry, WalletAccount, WalletKey};

/// Ledger operation error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LedgerError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance {
        available: Amount,
        requested: Amount,
    },

    /// Transient backend failure; safe to retry.
    #[error("storage error: {0}")]
    Storage(String),
}

impl From<WalletStoreError> for LedgerError {
    fn from(err: WalletStoreError) -> Self {
        match err {
            WalletStoreError::InsufficientBalance {
                available,
                requested,
                ..
            } => LedgerError::InsufficientBalance {
                available,
                requested,
            },
            WalletStoreError::BalanceOverflow(wallet) => {
                LedgerError::Validation(format!("balance overflow on wallet {wallet}"))
            }
            WalletStoreError::Storage(msg) => LedgerError::Storage(msg),
        }
    }
}

/// Fact emitted after a wallet balance changed. Fire-and-forget: consumers
/// (notification fan-out, broadcasts) never affect the committed mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceChanged {
    pub owner: WalletOwner,
    pub slug: String,
    pub balance: Amount,
    pub delta: Amount,
    pub kind: EntryKind,
    pub source_event_id: Option<ProviderEventId>,
    pub occurred_at: DateTime<Utc>,
}

/// Consumer of balance-changed facts.
pub trait BalanceListener: Send + Sync {
    fn balance_changed(&self, fact: &BalanceChanged);
}

/// The wallet ledger.
///
/// Credits and debits are idempotent per `(wallet, source_event_id, kind)`:
/// replaying the same event returns the original entry unchanged instead of
/// creating a duplicate. The store serializes concurrent mutations per
/// wallet.
pub struct WalletLedger {
    store: Arc<dyn WalletStore>,
    listeners: Vec<Arc<dyn BalanceListener>>,
}

impl WalletLedger {
    pub fn new(store: Arc<dyn WalletStore>) -> Self {
        Self {
            store,
            listeners: Vec::new(),
        }
    }

    pub fn with_listener(mut self, listener: Arc<dyn BalanceListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    /// Credit `amount` (must be positive) to the owner's named wallet.
    pub fn credit(
        &self,
        owner: WalletOwner,
        slug: &str,
        amount: Amount,
        kind: EntryKind,
        source_event_id: Option<ProviderEventId>,
        metadata: serde_json::Value,
    ) -> Result<LedgerEntry, LedgerError> {
        if !amount.is_positive() {
            return Err(LedgerError::Validation(format!(
                "credit amount must be positive, got {amount}"
            )));
        }
        self.apply(owner, slug, amount, kind, source_event_id, metadata)
    }

    /// Debit `amount` (must be positive) from the owner's named wallet.
    /// Fails with `InsufficientBalance` if the wallet cannot cover it; no
    /// overdraft by default.
    pub fn debit(
        &self,
        owner: WalletOwner,
        slug: &str,
        amount: Amount,
        kind: EntryKind,
        source_event_id: Option<ProviderEventId>,
        metadata: serde_json::Value,
    ) -> Result<LedgerEntry, LedgerError> {
        if !amount.is_positive() {
            return Err(LedgerError::Validation(format!(
                "debit amount must be positive, got {amount}"
            )));
        }
        let delta = amount
            .checked_neg()
            .map_err(|e| LedgerError::Validation(e.to_string()))?;
        self.apply(owner, slug, delta, kind, source_event_id, metadata)
    }

    fn apply(
        &self,
        owner: WalletOwner,
        slug: &str,
        delta: Amount,
        kind: EntryKind,
        source_event_id: Option<ProviderEventId>,
        metadata: serde_json::Value,
    ) -> Result<LedgerEntry, LedgerError> {
        let key = WalletKey::new(owner, slug);
        let outcome = self.store.append(
            &key,
            delta,
            kind,
            source_event_id.clone(),
            metadata,
            false,
        )?;

        match outcome {
            AppendOutcome::Applied { entry, balance } => {
                debug!(
                    wallet = %key,
                    amount = entry.amount.minor_units(),
                    kind = %kind,
                    source_event_id = source_event_id.as_ref().map(|id| id.as_str()),
                    "ledger entry applied"
                );
                self.notify(&key, &entry, balance);
                Ok(entry)
            }
            AppendOutcome::Replayed(entry) => {
                debug!(
                    wallet = %key,
                    kind = %kind,
                    source_event_id = source_event_id.as_ref().map(|id| id.as_str()),
                    "idempotent replay, returning existing entry"
                );
                Ok(entry)
            }
        }
    }

    // `balance` is the one captured by the store inside the append's
    // critical section; re-reading the wallet here could see later entries.
    fn notify(&self, key: &WalletKey, entry: &LedgerEntry, balance: Amount) {
        if self.listeners.is_empty() {
            return;
        }
        let fact = BalanceChanged {
            owner: key.owner,
            slug: key.slug.clone(),
            balance,
            delta: entry.amount,
            kind: entry.kind,
            source_event_id: entry.source_event_id.clone(),
            occurred_at: entry.created_at,
        };
        for listener in &self.listeners {
            listener.balance_changed(&fact);
        }
    }

    /// Current balance; zero for a wallet that was never touched.
    pub fn balance(&self, owner: WalletOwner, slug: &str) -> Amount {
        self.store
            .wallet(&WalletKey::new(owner, slug))
            .map(|w| w.balance)
            .unwrap_or(Amount::ZERO)
    }

    /// Entries for a wallet, newest first.
    pub fn entries(&self, owner: WalletOwner, slug: &str, filter: &EntryFilter) -> Vec<LedgerEntry> {
        self.store.entries(&WalletKey::new(owner, slug), filter)
    }

    /// All wallets of an owner.
    pub fn wallets_of(&self, owner: &WalletOwner) -> Vec<WalletAccount> {
        self.store.wallets_of(owner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryWalletStore;
    use paygrid_core::UserId;
    use proptest::prelude::*;
    use serde_json::json;
    use std::sync::Mutex;

    fn ledger() -> (Arc<InMemoryWalletStore>, WalletLedger) {
        let store = InMemoryWalletStore::arc();
        let ledger = WalletLedger::new(store.clone());
        (store, ledger)
    }

    fn user() -> WalletOwner {
        WalletOwner::User(UserId::new())
    }

    fn source(id: &str) -> Option<ProviderEventId> {
        Some(ProviderEventId::new(id).unwrap())
    }

    #[test]
    fn credit_then_debit() {
        let (_, ledger) = ledger();
        let owner = user();

        ledger
            .credit(owner, "default", Amount::from_minor(5000), EntryKind::Topup, source("pi_1"), json!({}))
            .unwrap();
        ledger
            .debit(owner, "default", Amount::from_minor(1500), EntryKind::Withdrawal, source("po_1"), json!({}))
            .unwrap();

        assert_eq!(ledger.balance(owner, "default"), Amount::from_minor(3500));
    }

    #[test]
    fn redelivery_is_idempotent() {
        let (_, ledger) = ledger();
        let owner = user();

        let first = ledger
            .credit(owner, "default", Amount::from_minor(5000), EntryKind::Topup, source("pi_123"), json!({}))
            .unwrap();
        let second = ledger
            .credit(owner, "default", Amount::from_minor(5000), EntryKind::Topup, source("pi_123"), json!({}))
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(ledger.balance(owner, "default"), Amount::from_minor(5000));
        assert_eq!(
            ledger.entries(owner, "default", &EntryFilter::default()).len(),
            1
        );
    }

    #[test]
    fn debit_past_balance_is_rejected_without_mutation() {
        let (_, ledger) = ledger();
        let owner = user();

        ledger
            .credit(owner, "default", Amount::from_minor(100), EntryKind::Topup, source("pi_2"), json!({}))
            .unwrap();

        let err = ledger
            .debit(owner, "default", Amount::from_minor(200), EntryKind::Withdrawal, source("po_2"), json!({}))
            .unwrap_err();

        assert!(matches!(err, LedgerError::InsufficientBalance { .. }));
        assert_eq!(ledger.balance(owner, "default"), Amount::from_minor(100));
    }

    #[test]
    fn zero_and_negative_amounts_are_rejected() {
        let (_, ledger) = ledger();
        let owner = user();

        assert!(ledger
            .credit(owner, "default", Amount::ZERO, EntryKind::Topup, None, json!({}))
            .is_err());
        assert!(ledger
            .debit(owner, "default", Amount::from_minor(-5), EntryKind::Withdrawal, None, json!({}))
            .is_err());
    }

    #[test]
    fn listener_receives_fact_for_applied_but_not_replayed() {
        #[derive(Default)]
        struct Recorder(Mutex<Vec<BalanceChanged>>);
        impl BalanceListener for Recorder {
            fn balance_changed(&self, fact: &BalanceChanged) {
                self.0.lock().unwrap().push(fact.clone());
            }
        }

        let recorder = Arc::new(Recorder::default());
        let ledger =
            WalletLedger::new(InMemoryWalletStore::arc()).with_listener(recorder.clone());
        let owner = user();

        ledger
            .credit(owner, "default", Amount::from_minor(100), EntryKind::Topup, source("pi_n"), json!({}))
            .unwrap();
        ledger
            .credit(owner, "default", Amount::from_minor(100), EntryKind::Topup, source("pi_n"), json!({}))
            .unwrap();

        let facts = recorder.0.lock().unwrap();
        assert_eq!(facts.len(), 1);
        assert_eq!(facts[0].balance, Amount::from_minor(100));
        assert_eq!(facts[0].delta, Amount::from_minor(100));
    }

    #[test]
    fn facts_carry_the_balance_as_of_their_own_entry() {
        #[derive(Default)]
        struct Recorder(Mutex<Vec<BalanceChanged>>);
        impl BalanceListener for Recorder {
            fn balance_changed(&self, fact: &BalanceChanged) {
                self.0.lock().unwrap().push(fact.clone());
            }
        }

        let recorder = Arc::new(Recorder::default());
        let ledger = Arc::new(
            WalletLedger::new(InMemoryWalletStore::arc()).with_listener(recorder.clone()),
        );
        let owner = user();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let ledger = Arc::clone(&ledger);
                std::thread::spawn(move || {
                    ledger
                        .credit(
                            owner,
                            "default",
                            Amount::from_minor(100),
                            EntryKind::Topup,
                            Some(ProviderEventId::new(format!("pi_fact_{i}")).unwrap()),
                            json!({}),
                        )
                        .unwrap();
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        // Each fact's balance is the running total as of its own entry, so
        // the eight facts must carry eight distinct totals, 100 through 800.
        let mut balances: Vec<i64> = recorder
            .0
            .lock()
            .unwrap()
            .iter()
            .map(|f| f.balance.minor_units())
            .collect();
        balances.sort_unstable();
        assert_eq!(balances, vec![100, 200, 300, 400, 500, 600, 700, 800]);
    }

    #[test]
    fn concurrent_credits_on_one_wallet_all_apply() {
        let (_, ledger) = ledger();
        let ledger = Arc::new(ledger);
        let owner = user();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let ledger = Arc::clone(&ledger);
                std::thread::spawn(move || {
                    ledger
                        .credit(
                            owner,
                            "default",
                            Amount::from_minor(100),
                            EntryKind::Topup,
                            Some(ProviderEventId::new(format!("pi_conc_{i}")).unwrap()),
                            json!({}),
                        )
                        .unwrap();
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(ledger.balance(owner, "default"), Amount::from_minor(800));
        assert_eq!(
            ledger.entries(owner, "default", &EntryFilter::default()).len(),
            8
        );
    }

    proptest! {
        /// Balance always equals the sum of all committed entries.
        #[test]
        fn balance_equals_sum_of_entries(
            ops in prop::collection::vec((any::<bool>(), 1i64..10_000i64), 1..40)
        ) {
            let (_, ledger) = ledger();
            let owner = user();

            for (i, (is_credit, amount)) in ops.into_iter().enumerate() {
                let amount = Amount::from_minor(amount);
                let source = Some(ProviderEventId::new(format!("evt_{i}")).unwrap());
                if is_credit {
                    ledger
                        .credit(owner, "default", amount, EntryKind::Topup, source, json!({}))
                        .unwrap();
                } else {
                    // Debits may legitimately bounce on insufficient balance;
                    // the invariant must hold either way.
                    let _ = ledger.debit(
                        owner,
                        "default",
                        amount,
                        EntryKind::Withdrawal,
                        source,
                        json!({}),
                    );
                }
            }

            let sum: i64 = ledger
                .entries(owner, "default", &EntryFilter::default())
                .iter()
                .map(|e| e.amount.minor_units())
                .sum();
            prop_assert_eq!(ledger.balance(owner, "default").minor_units(), sum);
            prop_assert!(sum >= 0);
        }
    }
}
