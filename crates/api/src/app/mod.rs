//! HTTP application wiring (Axum router + service wiring).
//!
//! Layout:
//! - `services.rs`: infrastructure wiring (event store, ledger, engine, supervisor)
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use tower::ServiceBuilder;

pub mod errors;
pub mod routes;
pub mod services;

pub use services::AppServices;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(services: Arc<AppServices>) -> Router {
    Router::new()
        .route("/health", get(routes::system::health))
        .merge(routes::router())
        .layer(ServiceBuilder::new().layer(Extension(services)))
}
