use std::sync::Arc;

use paygrid_infra::Config;

#[tokio::main]
async fn main() {
    paygrid_observability::init();

    let config = Config::from_env();
    let bind_addr = config.bind_addr.clone();

    let (services, _supervisor) = paygrid_api::app::services::build_services(config);
    let app = paygrid_api::app::build_app(Arc::clone(&services));

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {bind_addr}: {e}"));

    tracing::info!("listening on {bind_addr}");

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!(error = %e, "server exited with error");
    }
}
