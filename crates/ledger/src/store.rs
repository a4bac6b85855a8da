//! Wallet storage.
//!
//! The store owns the transactional boundary: idempotency check, entry
//! append, and balance update happen under one per-wallet lock so a reader
//! can never observe an entry without its balance update or vice versa.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use paygrid_core::{Amount, ProviderEventId, WalletOwner};

use crate::wallet::{EntryFilter, EntryKind, LedgerEntry, WalletAccount, WalletId, WalletKey};

/// Outcome of an append: freshly applied, or an idempotent replay of an
/// entry that already existed for the same `(wallet, source_event_id, kind)`.
///
/// `Applied` carries the wallet balance as of this entry, captured inside the
/// append's critical section so it is consistent with the entry even under
/// concurrent mutation of the same wallet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppendOutcome {
    Applied { entry: LedgerEntry, balance: Amount },
    Replayed(LedgerEntry),
}

impl AppendOutcome {
    pub fn entry(&self) -> &LedgerEntry {
        match self {
            AppendOutcome::Applied { entry, .. } | AppendOutcome::Replayed(entry) => entry,
        }
    }

    pub fn into_entry(self) -> LedgerEntry {
        match self {
            AppendOutcome::Applied { entry, .. } | AppendOutcome::Replayed(entry) => entry,
        }
    }

    pub fn is_replay(&self) -> bool {
        matches!(self, AppendOutcome::Replayed(_))
    }
}

/// Wallet store error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum WalletStoreError {
    /// The debit would take the balance below zero.
    #[error("insufficient balance on {wallet}: requested {requested}, available {available}")]
    InsufficientBalance {
        wallet: WalletId,
        available: Amount,
        requested: Amount,
    },
    /// Arithmetic overflow updating the materialized balance.
    #[error("balance overflow on {0}")]
    BalanceOverflow(WalletId),
    /// Backend failure (transient; callers may retry).
    #[error("storage error: {0}")]
    Storage(String),
}

/// Wallet store abstraction.
///
/// `append` is the single write path: it must be atomic per wallet and must
/// replay idempotently on a duplicate `(source_event_id, kind)`.
pub trait WalletStore: Send + Sync {
    /// Append an entry and update the materialized balance in one
    /// transaction. Creates the wallet lazily. When `allow_negative` is
    /// false, a debit past the balance fails without mutating anything.
    fn append(
        &self,
        key: &WalletKey,
        amount: Amount,
        kind: EntryKind,
        source_event_id: Option<ProviderEventId>,
        metadata: serde_json::Value,
        allow_negative: bool,
    ) -> Result<AppendOutcome, WalletStoreError>;

    /// Fetch a wallet if it exists (no lazy creation on reads).
    fn wallet(&self, key: &WalletKey) -> Option<WalletAccount>;

    /// Entries for a wallet, newest first.
    fn entries(&self, key: &WalletKey, filter: &EntryFilter) -> Vec<LedgerEntry>;

    /// All wallets of an owner.
    fn wallets_of(&self, owner: &WalletOwner) -> Vec<WalletAccount>;
}

#[derive(Debug, Default)]
struct Inner {
    wallets: HashMap<WalletKey, WalletAccount>,
    entries: HashMap<WalletId, Vec<LedgerEntry>>,
}

/// In-memory wallet store for tests/dev, with the same locking discipline a
/// database-backed store needs: one lock per `(owner, slug)` serializes
/// concurrent mutations of the same wallet; different wallets proceed in
/// parallel up to the inner map lock.
#[derive(Debug, Default)]
pub struct InMemoryWalletStore {
    locks: Mutex<HashMap<WalletKey, Arc<Mutex<()>>>>,
    inner: RwLock<Inner>,
}

impl InMemoryWalletStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    fn wallet_lock(&self, key: &WalletKey) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        Arc::clone(locks.entry(key.clone()).or_default())
    }
}

impl WalletStore for InMemoryWalletStore {
    fn append(
        &self,
        key: &WalletKey,
        amount: Amount,
        kind: EntryKind,
        source_event_id: Option<ProviderEventId>,
        metadata: serde_json::Value,
        allow_negative: bool,
    ) -> Result<AppendOutcome, WalletStoreError> {
        let wallet_lock = self.wallet_lock(key);
        let _serialized = wallet_lock.lock().unwrap_or_else(|e| e.into_inner());

        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        let wallet = inner
            .wallets
            .entry(key.clone())
            .or_insert_with(|| WalletAccount::open(key));
        let wallet_id = wallet.id;
        let balance = wallet.balance;

        // Second line of defense below the event-store dedup: at most one
        // entry per (wallet, source_event_id, kind).
        if let Some(source) = &source_event_id {
            if let Some(existing) = inner.entries.get(&wallet_id).and_then(|entries| {
                entries
                    .iter()
                    .find(|e| e.source_event_id.as_ref() == Some(source) && e.kind == kind)
            }) {
                return Ok(AppendOutcome::Replayed(existing.clone()));
            }
        }

        let new_balance = balance
            .checked_add(amount)
            .map_err(|_| WalletStoreError::BalanceOverflow(wallet_id))?;

        if new_balance.is_negative() && !allow_negative {
            return Err(WalletStoreError::InsufficientBalance {
                wallet: wallet_id,
                available: balance,
                requested: amount.checked_neg().unwrap_or(amount),
            });
        }

        let entry = LedgerEntry {
            id: uuid::Uuid::now_v7(),
            wallet_id,
            amount,
            kind,
            source_event_id,
            metadata,
            created_at: chrono::Utc::now(),
        };

        // Entry append and balance update land together, under the same
        // write lock, never observably separated.
        inner.entries.entry(wallet_id).or_default().push(entry.clone());
        if let Some(wallet) = inner.wallets.get_mut(key) {
            wallet.balance = new_balance;
        }

        Ok(AppendOutcome::Applied {
            entry,
            balance: new_balance,
        })
    }

    fn wallet(&self, key: &WalletKey) -> Option<WalletAccount> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner.wallets.get(key).cloned()
    }

    fn entries(&self, key: &WalletKey, filter: &EntryFilter) -> Vec<LedgerEntry> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        let Some(wallet) = inner.wallets.get(key) else {
            return Vec::new();
        };
        let mut result: Vec<_> = inner
            .entries
            .get(&wallet.id)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|e| filter.kind.is_none_or(|k| e.kind == k))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        result.reverse();
        if let Some(limit) = filter.limit {
            result.truncate(limit);
        }
        result
    }

    fn wallets_of(&self, owner: &WalletOwner) -> Vec<WalletAccount> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        let mut wallets: Vec<_> = inner
            .wallets
            .values()
            .filter(|w| &w.owner == owner)
            .cloned()
            .collect();
        wallets.sort_by(|a, b| a.slug.cmp(&b.slug));
        wallets
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use paygrid_core::UserId;
    use serde_json::json;

    fn key() -> WalletKey {
        WalletKey::new(WalletOwner::User(UserId::new()), "default")
    }

    #[test]
    fn append_creates_wallet_lazily() {
        let store = InMemoryWalletStore::new();
        let key = key();
        assert!(store.wallet(&key).is_none());

        let outcome = store
            .append(
                &key,
                Amount::from_minor(5000),
                EntryKind::Topup,
                Some(ProviderEventId::new("pi_1").unwrap()),
                json!({}),
                false,
            )
            .unwrap();

        assert!(matches!(
            outcome,
            AppendOutcome::Applied { balance, .. } if balance == Amount::from_minor(5000)
        ));
        assert_eq!(store.wallet(&key).unwrap().balance, Amount::from_minor(5000));
    }

    #[test]
    fn duplicate_source_and_kind_replays() {
        let store = InMemoryWalletStore::new();
        let key = key();
        let source = ProviderEventId::new("pi_dup").unwrap();

        let first = store
            .append(
                &key,
                Amount::from_minor(100),
                EntryKind::Topup,
                Some(source.clone()),
                json!({}),
                false,
            )
            .unwrap();
        let second = store
            .append(
                &key,
                Amount::from_minor(100),
                EntryKind::Topup,
                Some(source.clone()),
                json!({}),
                false,
            )
            .unwrap();

        assert!(second.is_replay());
        assert_eq!(first.entry().id, second.entry().id);
        assert_eq!(store.wallet(&key).unwrap().balance, Amount::from_minor(100));

        // Same source, different kind is a distinct movement.
        let third = store
            .append(
                &key,
                Amount::from_minor(-10),
                EntryKind::Commission,
                Some(source),
                json!({}),
                false,
            )
            .unwrap();
        assert!(!third.is_replay());
        assert_eq!(store.wallet(&key).unwrap().balance, Amount::from_minor(90));
    }

    #[test]
    fn overdraft_rejected_without_mutation() {
        let store = InMemoryWalletStore::new();
        let key = key();
        store
            .append(&key, Amount::from_minor(50), EntryKind::Topup, None, json!({}), false)
            .unwrap();

        let err = store
            .append(
                &key,
                Amount::from_minor(-100),
                EntryKind::Withdrawal,
                None,
                json!({}),
                false,
            )
            .unwrap_err();

        assert!(matches!(err, WalletStoreError::InsufficientBalance { .. }));
        assert_eq!(store.wallet(&key).unwrap().balance, Amount::from_minor(50));
        assert_eq!(store.entries(&key, &EntryFilter::default()).len(), 1);
    }

    #[test]
    fn entries_filter_by_kind_and_limit() {
        let store = InMemoryWalletStore::new();
        let key = key();
        for i in 0..3 {
            store
                .append(
                    &key,
                    Amount::from_minor(10 + i),
                    EntryKind::Topup,
                    None,
                    json!({}),
                    false,
                )
                .unwrap();
        }
        store
            .append(&key, Amount::from_minor(-5), EntryKind::Withdrawal, None, json!({}), false)
            .unwrap();

        let topups = store.entries(
            &key,
            &EntryFilter {
                kind: Some(EntryKind::Topup),
                limit: Some(2),
            },
        );
        assert_eq!(topups.len(), 2);
        assert!(topups.iter().all(|e| e.kind == EntryKind::Topup));
        // Newest first.
        assert_eq!(topups[0].amount, Amount::from_minor(12));
    }
}
