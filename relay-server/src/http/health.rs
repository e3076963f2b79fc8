//! Health check endpoint.

use crate::server::CodeRelay;
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Serialize;
use std::sync::Arc;

/// Health status response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    /// Overall status: `ok`, or `degraded` when the store cannot be read.
    pub status: String,
    /// Server version.
    pub version: String,
    /// Records currently held (including expired ones not yet swept).
    pub records: u64,
    /// Uptime in seconds.
    pub uptime_seconds: u64,
}

/// Health check handler.
pub async fn health_handler(
    Extension(relay): Extension<Arc<CodeRelay>>,
) -> (StatusCode, Json<HealthStatus>) {
    let (code, status, records) = match relay.service().store().len().await {
        Ok(records) => (StatusCode::OK, "ok", records),
        Err(e) => {
            tracing::error!("Health check cannot read store: {}", e);
            (StatusCode::SERVICE_UNAVAILABLE, "degraded", 0)
        }
    };

    (
        code,
        Json(HealthStatus {
            status: status.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            records,
            uptime_seconds: relay.uptime_secs(),
        }),
    )
}
