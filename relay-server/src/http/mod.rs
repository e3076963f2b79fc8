//! HTTP endpoints for scan-relay.
//!
//! Relay operations (`/submit`, `/pull`, `/lookup`) speak the plain-text
//! vocabulary of [`relay_types::Reply`]; `/health` and `/metrics` are for
//! operators.

mod handlers;
pub mod health;
mod metrics;

use crate::server::CodeRelay;
use axum::{routing::get, Extension, Router};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

pub use handlers::ApiError;
pub use health::HealthStatus;

/// Serve the relay on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, relay: Arc<CodeRelay>, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = build_router(relay);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await
}

/// Build the HTTP router with all endpoints.
///
/// Serve with `into_make_service_with_connect_info::<SocketAddr>()`: the
/// relay handlers rate limit by client address.
pub fn build_router(relay: Arc<CodeRelay>) -> Router {
    Router::new()
        .route(
            "/submit",
            get(handlers::submit_query).post(handlers::submit_form),
        )
        .route("/pull", get(handlers::pull))
        .route("/lookup", get(handlers::lookup))
        .route("/health", get(health::health_handler))
        .route("/metrics", get(metrics::metrics_handler))
        .layer(Extension(relay))
}
