//! HTTP surface tests, driven through the router without a socket.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::Utc;
use http_body_util::BodyExt;
use serde_json::json;
use tower::ServiceExt;

use paygrid_api::app::{build_app, services};
use paygrid_api::verify;
use paygrid_core::{Amount, UserId, WalletOwner};
use paygrid_infra::{Config, EventStore};
use paygrid_ledger::EntryKind;

fn app() -> (axum::Router, Arc<services::AppServices>) {
    let (services, _handle) = services::build_services(Config::default());
    (build_app(Arc::clone(&services)), services)
}

fn signed_request(uri: &str, payload: &str, secret: &str) -> Request<Body> {
    let timestamp = Utc::now().timestamp();
    let sig = verify::compute_signature(secret, timestamp, payload).unwrap();
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("stripe-signature", format!("t={timestamp},v1={sig}"))
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_is_ok() {
    let (app, _) = app();
    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn webhook_without_signature_is_rejected() {
    let (app, _) = app();
    let response = app
        .oneshot(
            Request::post("/webhooks/stripe")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn webhook_with_bad_signature_is_rejected() {
    let (app, _) = app();
    let payload = json!({"id": "evt_1", "type": "payment_intent.succeeded"}).to_string();
    let response = app
        .oneshot(signed_request("/webhooks/stripe", &payload, "whsec_wrong"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn webhook_accepts_then_deduplicates() {
    let (app, services) = app();
    let user_id = UserId::new();
    let payload = json!({
        "id": "pi_123",
        "type": "payment_intent.succeeded",
        "data": {"object": {
            "amount": 5000,
            "metadata": {"type": "wallet_topup", "user_id": user_id.to_string()},
        }},
    })
    .to_string();
    let secret = services.config.webhook_secret.clone();

    let first = app
        .clone()
        .oneshot(signed_request("/webhooks/stripe", &payload, &secret))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(body_json(first).await["status"], "accepted");

    let second = app
        .oneshot(signed_request("/webhooks/stripe", &payload, &secret))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(body_json(second).await["status"], "duplicate");
}

#[tokio::test]
async fn unadmitted_event_type_is_ignored() {
    let (app, services) = app();
    let payload = json!({
        "id": "evt_sub",
        "type": "customer.subscription.updated",
        "data": {"object": {"metadata": {}}},
    })
    .to_string();

    let response = app
        .oneshot(signed_request(
            "/webhooks/stripe",
            &payload,
            &services.config.webhook_secret,
        ))
        .await
        .unwrap();
    assert_eq!(body_json(response).await["status"], "ignored");
}

#[tokio::test]
async fn tenant_endpoint_stamps_the_endpoint_tenant() {
    let (app, services) = app();
    let tenant_id = uuid::Uuid::now_v7();
    let payload = json!({
        "id": "ch_tenant",
        "type": "charge.succeeded",
        "data": {"object": {"amount": 10_000, "metadata": {}}},
    })
    .to_string();

    let response = app
        .oneshot(signed_request(
            &format!("/webhooks/stripe/{tenant_id}"),
            &payload,
            &services.config.webhook_secret,
        ))
        .await
        .unwrap();
    assert_eq!(body_json(response).await["status"], "accepted");

    let stored = services
        .events
        .get(&paygrid_core::ProviderEventId::new("ch_tenant").unwrap())
        .unwrap()
        .unwrap();
    assert_eq!(
        stored.endpoint_tenant.map(|t| *t.as_uuid()),
        Some(tenant_id)
    );
}

#[tokio::test]
async fn balance_and_entries_read_back() {
    let (app, services) = app();
    let user_id = UserId::new();
    let owner = WalletOwner::User(user_id);

    services
        .ledger
        .credit(
            owner,
            "default",
            Amount::from_minor(5000),
            EntryKind::Topup,
            None,
            json!({}),
        )
        .unwrap();

    let balance = app
        .clone()
        .oneshot(
            Request::get(format!("/wallets/user/{user_id}/default/balance"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(balance.status(), StatusCode::OK);
    let body = body_json(balance).await;
    assert_eq!(body["balance"], 5000);
    assert_eq!(body["balance_display"], "50.00");

    let entries = app
        .oneshot(
            Request::get(format!("/wallets/user/{user_id}/default/entries?kind=topup"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = body_json(entries).await;
    assert_eq!(body["items"].as_array().unwrap().len(), 1);
    assert_eq!(body["items"][0]["amount"], 5000);
}

#[tokio::test]
async fn unknown_owner_type_is_a_bad_request() {
    let (app, _) = app();
    let response = app
        .oneshot(
            Request::get(format!("/wallets/org/{}/default/balance", uuid::Uuid::now_v7()))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
