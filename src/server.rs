//! Keep-alive HTTP server.
//!
//! The hosting platform probes `GET /` to decide the process is alive.
//! Nothing here touches bot state.

use axum::Router;
use axum::response::Json;
use axum::routing::get;
use serde::Serialize;
use std::net::SocketAddr;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

/// Start the keep-alive server on the given address.
pub async fn start_keepalive_server(
    bind: SocketAddr,
    shutdown_rx: tokio::sync::watch::Receiver<bool>,
) -> anyhow::Result<tokio::task::JoinHandle<()>> {
    let app = Router::new()
        .route("/", get(root))
        .route("/health", get(health));

    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!(%bind, "keep-alive server listening");

    let handle = tokio::spawn(async move {
        let mut shutdown = shutdown_rx;
        if let Err(error) = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.wait_for(|v| *v).await;
            })
            .await
        {
            tracing::error!(%error, "keep-alive server exited with error");
        }
    });

    Ok(handle)
}

async fn root() -> &'static str {
    "Maestro Bot is breathing!"
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}
