use axum::extract::DefaultBodyLimit;
use axum::Router;
use tokio::sync::watch;
use tower_http::trace::{DefaultOnFailure, DefaultOnResponse, TraceLayer};
use tower_http::LatencyUnit;

pub mod context;
pub mod handlers;
pub mod negotiate;

use crate::service_state::State;

/// Assemble the application router: a single fallback handler carries the
/// whole verb set (MKCOL and the WebDAV verbs included).
pub fn router(state: State) -> Router {
    let body_limit = state.config().body_limit;
    Router::new()
        .fallback(handlers::dispatch)
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

/// Run the HTTP server until the shutdown channel fires.
pub async fn run(state: State, mut shutdown_rx: watch::Receiver<()>) -> Result<(), HttpServerError> {
    let listen_addr = state.config().listen_addr;
    let log_level = state.config().log_level;
    let trace_layer = TraceLayer::new_for_http()
        .on_response(
            DefaultOnResponse::new()
                .include_headers(false)
                .level(log_level)
                .latency_unit(LatencyUnit::Micros),
        )
        .on_failure(DefaultOnFailure::new().latency_unit(LatencyUnit::Micros));

    let router = router(state).layer(trace_layer);

    tracing::info!(addr = ?listen_addr, "server listening");
    let listener = tokio::net::TcpListener::bind(listen_addr).await?;

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.changed().await;
        })
        .await?;

    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum HttpServerError {
    #[error("an error occurred running the HTTP server: {0}")]
    ServingFailed(#[from] std::io::Error),
}
