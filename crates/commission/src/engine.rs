//! Commission computation and recording.
//!
//! For a tenant transaction of gross `G` at rate `r`, the engine credits the
//! owner's `revenue` wallet with `G - round(G * r)` and the platform wallet
//! with `round(G * r)`, both keyed by the originating event id so redelivery
//! replays instead of double-counting. The rate is captured at processing
//! time and never retroactively recalculated.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use paygrid_core::{Amount, CommissionRate, ProviderEventId, WalletOwner};
use paygrid_ledger::{EntryKind, LedgerError, WalletLedger};

use crate::rates::RateSchedule;

/// Wallet slug commission flows move through.
pub const REVENUE_SLUG: &str = "revenue";

/// Immutable record of one commission computation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionRecord {
    pub id: Uuid,
    pub owner: WalletOwner,
    pub source_event_id: ProviderEventId,
    pub transaction_type: String,
    pub gross_amount: Amount,
    /// Rate in effect at processing time.
    pub commission_rate: CommissionRate,
    /// `round_half_up(gross_amount * commission_rate)`.
    pub commission_amount: Amount,
    pub created_at: DateTime<Utc>,
}

/// Append-only storage for commission records, keyed by source event id.
pub trait CommissionStore: Send + Sync {
    /// Insert unless a record for this source event already exists; returns
    /// the stored record and whether this call inserted it.
    fn insert_if_absent(&self, record: CommissionRecord) -> (CommissionRecord, bool);

    fn find(&self, source_event_id: &ProviderEventId) -> Option<CommissionRecord>;

    fn list_for(&self, owner: &WalletOwner) -> Vec<CommissionRecord>;
}

/// In-memory commission store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryCommissionStore {
    records: RwLock<HashMap<ProviderEventId, CommissionRecord>>,
}

impl InMemoryCommissionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

impl CommissionStore for InMemoryCommissionStore {
    fn insert_if_absent(&self, record: CommissionRecord) -> (CommissionRecord, bool) {
        let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());
        if let Some(existing) = records.get(&record.source_event_id) {
            return (existing.clone(), false);
        }
        records.insert(record.source_event_id.clone(), record.clone());
        (record, true)
    }

    fn find(&self, source_event_id: &ProviderEventId) -> Option<CommissionRecord> {
        let records = self.records.read().unwrap_or_else(|e| e.into_inner());
        records.get(source_event_id).cloned()
    }

    fn list_for(&self, owner: &WalletOwner) -> Vec<CommissionRecord> {
        let records = self.records.read().unwrap_or_else(|e| e.into_inner());
        let mut result: Vec<_> = records
            .values()
            .filter(|r| &r.owner == owner)
            .cloned()
            .collect();
        result.sort_by_key(|r| r.created_at);
        result
    }
}

/// Commission engine error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CommissionError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Computes and records platform commission for tenant transactions.
pub struct CommissionEngine {
    schedule: RateSchedule,
    ledger: Arc<WalletLedger>,
    records: Arc<dyn CommissionStore>,
    /// Owner of the platform-side wallet commission is credited to.
    platform_owner: WalletOwner,
}

impl CommissionEngine {
    pub fn new(
        schedule: RateSchedule,
        ledger: Arc<WalletLedger>,
        records: Arc<dyn CommissionStore>,
        platform_owner: WalletOwner,
    ) -> Self {
        Self {
            schedule,
            ledger,
            records,
            platform_owner,
        }
    }

    /// Compute the commission for `gross`, move the net to the owner's
    /// revenue wallet and the commission to the platform wallet, and record
    /// it. Repeated calls for the same event replay idempotently at both the
    /// record and ledger level.
    pub fn compute_and_record(
        &self,
        tenant_id: Option<paygrid_core::TenantId>,
        owner: WalletOwner,
        gross: Amount,
        transaction_type: &str,
        source_event_id: &ProviderEventId,
        metadata: serde_json::Value,
    ) -> Result<CommissionRecord, CommissionError> {
        if !gross.is_positive() {
            return Err(CommissionError::Validation(format!(
                "gross amount must be positive, got {gross}"
            )));
        }

        // A record from an earlier delivery fixes the rate and amounts; the
        // ledger calls below then replay against the same source event.
        let (record, inserted) = match self.records.find(source_event_id) {
            Some(existing) => (existing, false),
            None => {
                let rate = self.schedule.resolve(tenant_id);
                let commission = rate
                    .apply_to(gross)
                    .map_err(|e| CommissionError::Validation(e.to_string()))?;
                let record = CommissionRecord {
                    id: Uuid::now_v7(),
                    owner,
                    source_event_id: source_event_id.clone(),
                    transaction_type: transaction_type.to_string(),
                    gross_amount: gross,
                    commission_rate: rate,
                    commission_amount: commission,
                    created_at: Utc::now(),
                };
                self.records.insert_if_absent(record)
            }
        };

        let net = record
            .gross_amount
            .checked_sub(record.commission_amount)
            .map_err(|e| CommissionError::Validation(e.to_string()))?;

        if net.is_positive() {
            self.ledger.credit(
                record.owner,
                REVENUE_SLUG,
                net,
                EntryKind::Revenue,
                Some(record.source_event_id.clone()),
                metadata.clone(),
            )?;
        }

        if record.commission_amount.is_positive() {
            self.ledger.credit(
                self.platform_owner,
                REVENUE_SLUG,
                record.commission_amount,
                EntryKind::Commission,
                Some(record.source_event_id.clone()),
                metadata,
            )?;
        }

        if inserted {
            info!(
                owner = %record.owner,
                source_event_id = %record.source_event_id,
                gross = record.gross_amount.minor_units(),
                rate_bps = record.commission_rate.basis_points(),
                commission = record.commission_amount.minor_units(),
                "commission recorded"
            );
        }

        Ok(record)
    }

    pub fn records(&self) -> &Arc<dyn CommissionStore> {
        &self.records
    }
}
