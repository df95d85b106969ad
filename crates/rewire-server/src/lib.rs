//! Ingress HTTP surface for Rewire.
//!
//! Exposes the observation, ack, and admin endpoints from SPEC_FULL.md §6
//! over a single `axum::Router`, and a `serve` helper that binds a listener
//! and runs it to completion with graceful shutdown on `Ctrl+C`/`SIGTERM`.

mod auth;
mod error;
mod routes;
mod state;

use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::compression::CompressionLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

pub use error::ServerError;
pub use routes::router as build_router;
pub use state::AppState;

/// Admin/observation form bodies are a handful of short fields; 64 KiB is
/// generous headroom without leaving the endpoint open to large-body abuse.
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Wraps [`build_router`]'s output with the teacher-grounded middleware
/// stack: request tracing, response compression, a request body size cap,
/// and a per-request timeout.
#[must_use]
pub fn app(state: AppState) -> Router {
    build_router(state).layer((
        TraceLayer::new_for_http(),
        CompressionLayer::new(),
        DefaultBodyLimit::max(MAX_BODY_BYTES),
        TimeoutLayer::new(Duration::from_secs(30)),
    ))
}

/// Binds `addr` and serves `app` until a `Ctrl+C` or SIGTERM is received.
///
/// # Errors
///
/// Returns an I/O error if the listener cannot be bound, or if the server
/// exits with one while running.
pub async fn serve(addr: &str, state: AppState) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "rewire-server listening");
    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
    tracing::info!("rewire-server shutting down");
}
