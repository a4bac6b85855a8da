//! Wallet accounts and ledger entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use paygrid_core::{Amount, ProviderEventId, WalletOwner};

/// Internal wallet identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WalletId(Uuid);

impl WalletId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for WalletId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for WalletId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Natural key of a wallet: `(owner, slug)`. Wallets are created lazily on
/// first access per key and never deleted while the owner exists.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WalletKey {
    pub owner: WalletOwner,
    /// Named sub-wallet, e.g. `default`, `revenue`, `ai-tokens`.
    pub slug: String,
}

impl WalletKey {
    pub fn new(owner: WalletOwner, slug: impl Into<String>) -> Self {
        Self {
            owner,
            slug: slug.into(),
        }
    }
}

impl core::fmt::Display for WalletKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}/{}", self.owner, self.slug)
    }
}

/// A per-owner named balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletAccount {
    pub id: WalletId,
    pub owner: WalletOwner,
    pub slug: String,
    /// Materialized sum of all entries for this wallet.
    pub balance: Amount,
    pub created_at: DateTime<Utc>,
}

impl WalletAccount {
    pub fn open(key: &WalletKey) -> Self {
        Self {
            id: WalletId::new(),
            owner: key.owner,
            slug: key.slug.clone(),
            balance: Amount::ZERO,
            created_at: Utc::now(),
        }
    }
}

/// What kind of movement an entry records.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Topup,
    Refund,
    Commission,
    Revenue,
    Withdrawal,
    Adjustment,
}

impl core::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            EntryKind::Topup => "topup",
            EntryKind::Refund => "refund",
            EntryKind::Commission => "commission",
            EntryKind::Revenue => "revenue",
            EntryKind::Withdrawal => "withdrawal",
            EntryKind::Adjustment => "adjustment",
        };
        f.write_str(s)
    }
}

/// One append-only movement on a wallet. Never updated or deleted once
/// committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: Uuid,
    pub wallet_id: WalletId,
    /// Signed delta: positive = credit, negative = debit.
    pub amount: Amount,
    pub kind: EntryKind,
    /// The inbound event that caused this entry; `None` for manual
    /// adjustments. Together with `kind`, unique per wallet.
    pub source_event_id: Option<ProviderEventId>,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Read filter for entry listings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryFilter {
    pub kind: Option<EntryKind>,
    pub limit: Option<usize>,
}
