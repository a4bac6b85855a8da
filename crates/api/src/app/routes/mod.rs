use axum::{
    routing::{get, post},
    Router,
};

pub mod system;
pub mod wallets;
pub mod webhooks;

/// Router for all endpoints except `/health`.
pub fn router() -> Router {
    Router::new()
        .route("/webhooks/stripe", post(webhooks::receive_platform))
        .route("/webhooks/stripe/:tenant_id", post(webhooks::receive_tenant))
        .nest("/wallets", wallets::router())
        .route(
            "/commissions/:owner_type/:owner_id",
            get(wallets::list_commissions),
        )
        .route("/admin/events/stats", get(system::event_stats))
        .route("/admin/dead-letters", get(system::list_dead_letters))
        .route(
            "/admin/dead-letters/:event_id/retry",
            post(system::retry_dead_letter),
        )
}
