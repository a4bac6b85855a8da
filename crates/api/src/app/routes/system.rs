//! Health and operational endpoints.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use paygrid_core::ProviderEventId;
use paygrid_events::InboundEvent;
use paygrid_infra::{EventStore, EventStoreError};

use crate::app::{errors, services::AppServices};

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn event_stats(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.events.stats() {
        Ok(stats) => (StatusCode::OK, Json(stats)).into_response(),
        Err(err) => {
            errors::json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", err.to_string())
        }
    }
}

pub async fn list_dead_letters(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.events.list_dead_letters(100) {
        Ok(events) => {
            let items: Vec<_> = events.iter().map(dead_letter_to_json).collect();
            (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
        }
        Err(err) => {
            errors::json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", err.to_string())
        }
    }
}

/// Manual replay of a dead-lettered event with a fresh attempt budget.
pub async fn retry_dead_letter(
    Extension(services): Extension<Arc<AppServices>>,
    Path(event_id): Path<String>,
) -> axum::response::Response {
    let Ok(event_id) = ProviderEventId::new(&event_id) else {
        return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "empty event id");
    };

    match services.events.retry_dead_letter(&event_id) {
        Ok(event) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "event_id": event.id.as_str(),
                "status": "requeued",
            })),
        )
            .into_response(),
        Err(EventStoreError::NotFound(id)) => errors::json_error(
            StatusCode::NOT_FOUND,
            "not_found",
            format!("no dead-lettered event {id}"),
        ),
        Err(err) => errors::json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "store_error",
            err.to_string(),
        ),
    }
}

fn dead_letter_to_json(event: &InboundEvent) -> serde_json::Value {
    serde_json::json!({
        "event_id": event.id.as_str(),
        "event_type": event.event_type,
        "channel": event.channel.to_string(),
        "attempts": event.attempts,
        "last_error": event.last_error,
        "received_at": event.received_at,
    })
}
