//! Webhook intake endpoints.
//!
//! Two endpoints, one per channel: the platform endpoint and the
//! tenant-parameterized endpoint. Both verify the delivery signature, record
//! the event exactly once, and either queue it or persist it as ignored.
//! Processing happens asynchronously in the supervisor; the endpoint replies
//! as soon as the event is durable.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use paygrid_core::{ProviderEventId, TenantId};
use paygrid_events::{Channel, InboundEvent};
use paygrid_infra::EventStore;

use crate::app::{errors, services::AppServices};
use crate::verify;

pub async fn receive_platform(
    Extension(services): Extension<Arc<AppServices>>,
    headers: HeaderMap,
    body: String,
) -> axum::response::Response {
    receive(services, Channel::Platform, None, &headers, &body)
}

pub async fn receive_tenant(
    Extension(services): Extension<Arc<AppServices>>,
    Path(tenant_id): Path<Uuid>,
    headers: HeaderMap,
    body: String,
) -> axum::response::Response {
    receive(
        services,
        Channel::Tenant,
        Some(TenantId::from_uuid(tenant_id)),
        &headers,
        &body,
    )
}

fn receive(
    services: Arc<AppServices>,
    channel: Channel,
    endpoint_tenant: Option<TenantId>,
    headers: &HeaderMap,
    body: &str,
) -> axum::response::Response {
    let Some(signature) = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
    else {
        return errors::json_error(
            StatusCode::BAD_REQUEST,
            "missing_signature",
            "Stripe-Signature header is required",
        );
    };

    if let Err(err) = verify::verify_signature(
        &services.config.webhook_secret,
        signature,
        body,
        Utc::now().timestamp(),
    ) {
        warn!(channel = %channel, error = %err, "rejected webhook delivery");
        return errors::json_error(StatusCode::BAD_REQUEST, "invalid_signature", err.to_string());
    }

    let payload: serde_json::Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(err) => {
            return errors::json_error(
                StatusCode::BAD_REQUEST,
                "invalid_payload",
                format!("payload is not valid JSON: {err}"),
            );
        }
    };

    let Some(event_id) = payload
        .get("id")
        .and_then(|v| v.as_str())
        .and_then(|raw| ProviderEventId::new(raw).ok())
    else {
        return errors::json_error(
            StatusCode::BAD_REQUEST,
            "invalid_payload",
            "payload must carry a non-empty string 'id'",
        );
    };
    let Some(event_type) = payload
        .get("type")
        .and_then(|v| v.as_str())
        .map(str::to_owned)
    else {
        return errors::json_error(
            StatusCode::BAD_REQUEST,
            "invalid_payload",
            "payload must carry a string 'type'",
        );
    };

    let admitted = services.admission.should_process(&event_type, channel);
    let mut event = InboundEvent::new(event_id.clone(), event_type.clone(), channel, payload);
    if let Some(tenant_id) = endpoint_tenant {
        event = event.with_endpoint_tenant(tenant_id);
    }
    if !admitted {
        // Persisted for audit but never enters the queue. Marked before the
        // insert so the supervisor can never claim it.
        event.mark_ignored();
    }

    let (_, is_new) = match services.events.record(event) {
        Ok(recorded) => recorded,
        Err(err) => {
            return errors::json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "store_error",
                err.to_string(),
            );
        }
    };

    let status = if !is_new {
        // Duplicate delivery: acknowledged without side effects so the
        // provider stops redelivering.
        "duplicate"
    } else if admitted {
        info!(event_id = %event_id, event_type, channel = %channel, "webhook event queued");
        "accepted"
    } else {
        info!(event_id = %event_id, event_type, channel = %channel, "webhook event ignored");
        "ignored"
    };

    (
        StatusCode::OK,
        Json(serde_json::json!({
            "received": true,
            "event_id": event_id.as_str(),
            "status": status,
        })),
    )
        .into_response()
}
