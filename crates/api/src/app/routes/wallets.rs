//! Wallet read endpoints: materialized balances and entry listings.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use paygrid_commission::CommissionStore;
use paygrid_core::WalletOwner;
use paygrid_ledger::{EntryFilter, EntryKind, LedgerEntry};

use crate::app::{errors, services::AppServices};

pub fn router() -> Router {
    Router::new()
        .route("/:owner_type/:owner_id", get(list_wallets))
        .route("/:owner_type/:owner_id/:slug/balance", get(get_balance))
        .route("/:owner_type/:owner_id/:slug/entries", get(list_entries))
}

fn parse_owner(owner_type: &str, owner_id: &str) -> Result<WalletOwner, axum::response::Response> {
    WalletOwner::parse(owner_type, owner_id)
        .map_err(|e| errors::json_error(StatusCode::BAD_REQUEST, "invalid_owner", e.to_string()))
}

pub async fn list_wallets(
    Extension(services): Extension<Arc<AppServices>>,
    Path((owner_type, owner_id)): Path<(String, String)>,
) -> axum::response::Response {
    let owner = match parse_owner(&owner_type, &owner_id) {
        Ok(owner) => owner,
        Err(resp) => return resp,
    };

    let items: Vec<_> = services
        .ledger
        .wallets_of(&owner)
        .into_iter()
        .map(|w| {
            serde_json::json!({
                "slug": w.slug,
                "balance": w.balance.minor_units(),
                "balance_display": w.balance.to_string(),
                "created_at": w.created_at,
            })
        })
        .collect();

    (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
}

pub async fn get_balance(
    Extension(services): Extension<Arc<AppServices>>,
    Path((owner_type, owner_id, slug)): Path<(String, String, String)>,
) -> axum::response::Response {
    let owner = match parse_owner(&owner_type, &owner_id) {
        Ok(owner) => owner,
        Err(resp) => return resp,
    };

    let balance = services.ledger.balance(owner, &slug);
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "owner": owner.to_string(),
            "slug": slug,
            "balance": balance.minor_units(),
            "balance_display": balance.to_string(),
        })),
    )
        .into_response()
}

#[derive(Debug, Deserialize)]
pub struct EntriesQuery {
    kind: Option<EntryKind>,
    limit: Option<usize>,
}

pub async fn list_entries(
    Extension(services): Extension<Arc<AppServices>>,
    Path((owner_type, owner_id, slug)): Path<(String, String, String)>,
    Query(query): Query<EntriesQuery>,
) -> axum::response::Response {
    let owner = match parse_owner(&owner_type, &owner_id) {
        Ok(owner) => owner,
        Err(resp) => return resp,
    };

    let filter = EntryFilter {
        kind: query.kind,
        limit: query.limit,
    };
    let items: Vec<_> = services
        .ledger
        .entries(owner, &slug, &filter)
        .iter()
        .map(entry_to_json)
        .collect();

    (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
}

/// Commission records for an owner, oldest first.
pub async fn list_commissions(
    Extension(services): Extension<Arc<AppServices>>,
    Path((owner_type, owner_id)): Path<(String, String)>,
) -> axum::response::Response {
    let owner = match parse_owner(&owner_type, &owner_id) {
        Ok(owner) => owner,
        Err(resp) => return resp,
    };

    let items: Vec<_> = services
        .commissions
        .list_for(&owner)
        .iter()
        .map(|r| {
            serde_json::json!({
                "id": r.id,
                "source_event_id": r.source_event_id.as_str(),
                "transaction_type": r.transaction_type,
                "gross_amount": r.gross_amount.minor_units(),
                "commission_rate_bps": r.commission_rate.basis_points(),
                "commission_amount": r.commission_amount.minor_units(),
                "created_at": r.created_at,
            })
        })
        .collect();

    (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
}

fn entry_to_json(entry: &LedgerEntry) -> serde_json::Value {
    serde_json::json!({
        "id": entry.id,
        "amount": entry.amount.minor_units(),
        "kind": entry.kind.to_string(),
        "source_event_id": entry.source_event_id.as_ref().map(|id| id.as_str()),
        "metadata": entry.metadata,
        "created_at": entry.created_at,
    })
}
