//! Prometheus metrics endpoint.

use crate::server::CodeRelay;
use axum::{http::header::CONTENT_TYPE, response::IntoResponse, Extension};
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// Prometheus metrics handler.
///
/// Returns metrics in Prometheus text format.
/// Includes both gauges (current state) and counters (monotonic since startup).
pub async fn metrics_handler(Extension(relay): Extension<Arc<CodeRelay>>) -> impl IntoResponse {
    let m = relay.metrics();

    let submits = m.submits_total.load(Ordering::Relaxed);
    let pulls = m.pulls_total.load(Ordering::Relaxed);
    let deliveries = m.deliveries_total.load(Ordering::Relaxed);
    let rejections = m.rejections_total.load(Ordering::Relaxed);
    let storage_errors = m.storage_errors_total.load(Ordering::Relaxed);
    let rate_limits = m.rate_limit_hits.load(Ordering::Relaxed);
    let lookups = m.lookups_total.load(Ordering::Relaxed);
    let swept = m.swept_total.load(Ordering::Relaxed);

    // Gauges (store query is best effort)
    let records = relay.service().store().len().await.unwrap_or(0);
    let tracked_clients = relay.rate_limits().tracked_clients();

    let body = format!(
        r#"# HELP scan_relay_records Records currently held
# TYPE scan_relay_records gauge
scan_relay_records {records}

# HELP scan_relay_rate_limit_clients Client addresses tracked by rate limiters
# TYPE scan_relay_rate_limit_clients gauge
scan_relay_rate_limit_clients {tracked_clients}

# HELP scan_relay_info Server information
# TYPE scan_relay_info gauge
scan_relay_info{{version="{version}"}} 1

# HELP scan_relay_submits_total Codes stored
# TYPE scan_relay_submits_total counter
scan_relay_submits_total {submits}

# HELP scan_relay_pulls_total Valid pull requests handled
# TYPE scan_relay_pulls_total counter
scan_relay_pulls_total {pulls}

# HELP scan_relay_deliveries_total Pulls that returned a code
# TYPE scan_relay_deliveries_total counter
scan_relay_deliveries_total {deliveries}

# HELP scan_relay_rejections_total Requests with a malformed session or code
# TYPE scan_relay_rejections_total counter
scan_relay_rejections_total {rejections}

# HELP scan_relay_storage_errors_total Storage failures surfaced to clients
# TYPE scan_relay_storage_errors_total counter
scan_relay_storage_errors_total {storage_errors}

# HELP scan_relay_rate_limit_hits_total Total rate limit rejections
# TYPE scan_relay_rate_limit_hits_total counter
scan_relay_rate_limit_hits_total {rate_limits}

# HELP scan_relay_lookups_total Name lookups served
# TYPE scan_relay_lookups_total counter
scan_relay_lookups_total {lookups}

# HELP scan_relay_swept_total Expired records removed by the cleanup task
# TYPE scan_relay_swept_total counter
scan_relay_swept_total {swept}
"#,
        version = env!("CARGO_PKG_VERSION"),
    );

    (
        [(CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
}
