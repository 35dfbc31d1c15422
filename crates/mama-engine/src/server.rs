//! Server startup
//!
//! Wires configuration into the shared state, starts the session worker and
//! serves the router until Ctrl-C.

use std::sync::Arc;
use anyhow::Context;
use axum::{
    routing::{get, post},
    Router,
};
use tracing::{info, warn};

use crate::{
    api,
    config::Config,
    metrics,
    shared_state::{SharedState, UnifiedAppState},
    worker_threads::SessionWorker,
};

pub async fn run_server(cfg: Config) -> anyhow::Result<()> {
    crate::telemetry::init_tracing();
    metrics::init_metrics().map_err(|e| anyhow::anyhow!("Failed to register metrics: {}", e))?;
    cfg.print_config();

    let addr = cfg.api_addr();
    let purge_interval = cfg.purge_interval();
    let shared_state = Arc::new(SharedState::new(cfg));

    let session_worker = SessionWorker::spawn(shared_state.sessions.clone(), purge_interval);
    let app = build_router(UnifiedAppState::new(shared_state));

    info!("Starting HTTP server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    session_worker.shutdown().await;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// Upper bound for every route except context selection
const REQUEST_TIMEOUT_SECS: u64 = 600;

pub fn build_router(state: UnifiedAppState) -> Router {
    use tower_http::{
        cors::{Any, CorsLayer},
        trace::TraceLayer,
        timeout::TimeoutLayer,
    };
    use std::time::Duration;

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
        .allow_headers(Any);

    let bounded = Router::new()
        .route("/auth/login", post(api::login))
        .route("/auth/me", get(api::me))
        .route("/auth/logout", post(api::logout))
        .route("/conversations", post(api::create_conversation))
        .route("/conversations/:id/turns", get(api::get_turns).post(api::append_turn))
        .route("/metrics", get(metrics::get_metrics))
        .route("/healthz", get(|| async { "OK" }))
        .layer(TimeoutLayer::new(Duration::from_secs(REQUEST_TIMEOUT_SECS)));

    // Waits on the summarizer, which has no timeout of its own
    let unbounded = Router::new().route("/context/select", post(api::select_context));

    bounded
        .merge(unbounded)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
