use std::net::SocketAddr;

use axum::{Router, routing::get};
use tracing::info;

pub fn health_router() -> Router {
    // /health preferred, /healthz for probes that expect the k8s spelling
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/healthz", get(|| async { "ok" }))
}

pub async fn run_health_server(addr: SocketAddr) -> anyhow::Result<()> {
    info!("health endpoint listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, health_router()).await?;
    Ok(())
}
