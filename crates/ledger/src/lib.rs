//! `paygrid-ledger` — per-owner named wallet balances with an append-only
//! entry log.
//!
//! The materialized `balance` on a wallet is a cache-coherent view of its
//! entry log, never an independent source of truth: every mutation appends a
//! `LedgerEntry` and updates the balance in the same store transaction.

pub mod ledger;
pub mod store;
pub mod wallet;

pub use ledger::{BalanceChanged, BalanceListener, LedgerError, WalletLedger};
pub use store::{AppendOutcome, InMemoryWalletStore, WalletStore, WalletStoreError};
pub use wallet::{EntryFilter, EntryKind, LedgerEntry, WalletAccount, WalletId, WalletKey};
