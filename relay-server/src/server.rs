//! Main CodeRelay server coordination.
//!
//! CodeRelay owns the relay service, rate limiters, metrics and lookup table,
//! and is shared with every HTTP handler by `Arc`.

use crate::cleanup::spawn_cleanup_task;
use crate::config::Config;
use crate::error::{ErrorKind, RelayError, RelayResult, ServerError};
use crate::limits::RateLimits;
use crate::lookup::LookupTable;
use crate::service::{PullOutcome, RelayService};
use crate::storage::{self, RecordStore};
use relay_types::Code;
use std::sync::atomic::{AtomicU64, Ordering};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;

/// Operational metrics for monitoring relay activity.
///
/// All counters are monotonically increasing (reset only on restart).
#[derive(Debug, Default)]
pub struct RelayMetrics {
    /// Submits that stored a code.
    pub submits_total: AtomicU64,
    /// Pulls that passed validation.
    pub pulls_total: AtomicU64,
    /// Pulls that returned a code.
    pub deliveries_total: AtomicU64,
    /// Requests refused for malformed session or code.
    pub rejections_total: AtomicU64,
    /// Storage medium failures surfaced to clients.
    pub storage_errors_total: AtomicU64,
    /// Requests refused by a rate limiter.
    pub rate_limit_hits: AtomicU64,
    /// Lookups served.
    pub lookups_total: AtomicU64,
    /// Records removed by the background sweep.
    pub swept_total: AtomicU64,
}

impl RelayMetrics {
    fn record_error(&self, err: &RelayError) {
        let counter = match err.kind() {
            ErrorKind::InvalidInput => &self.rejections_total,
            ErrorKind::StorageFailure => &self.storage_errors_total,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Main relay server.
pub struct CodeRelay {
    config: Config,
    service: RelayService,
    /// Rate limiters for submit and pull.
    rate_limits: RateLimits,
    /// Operational metrics (counters).
    metrics: RelayMetrics,
    /// Read-only id → name table.
    lookup: LookupTable,
    started_at: Instant,
}

impl std::fmt::Debug for CodeRelay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodeRelay")
            .field("config", &self.config)
            .field("service", &self.service)
            .field("rate_limits", &self.rate_limits)
            .field("metrics", &self.metrics)
            .field("lookup_ids", &self.lookup.len())
            .finish_non_exhaustive()
    }
}

impl CodeRelay {
    /// Create a new CodeRelay with the given config and store.
    pub fn new(config: Config, store: Arc<dyn RecordStore>) -> Self {
        let rate_limits = RateLimits::new(&config.limits);
        let service = RelayService::new(store, &config.relay);
        Self {
            config,
            service,
            rate_limits,
            metrics: RelayMetrics::default(),
            lookup: LookupTable::empty(),
            started_at: Instant::now(),
        }
    }

    /// Attach a lookup table.
    pub fn with_lookup(mut self, lookup: LookupTable) -> Self {
        self.lookup = lookup;
        self
    }

    /// Get the relay configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the relay service.
    pub fn service(&self) -> &RelayService {
        &self.service
    }

    /// Get access to the rate limiters.
    pub fn rate_limits(&self) -> &RateLimits {
        &self.rate_limits
    }

    /// Get access to the operational metrics.
    pub fn metrics(&self) -> &RelayMetrics {
        &self.metrics
    }

    /// Seconds since this relay was created.
    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    /// Submit a code, counting the outcome.
    pub async fn submit(&self, raw_key: &str, raw_code: &str) -> RelayResult<Code> {
        let result = self.service.submit(raw_key, raw_code).await;
        match &result {
            Ok(_) => {
                self.metrics.submits_total.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                self.metrics.record_error(e);
                log_failure("submit", e);
            }
        }
        result
    }

    /// Pull a code, counting the outcome.
    ///
    /// `ack = None` falls back to `relay.consume_by_default`.
    pub async fn pull(&self, raw_key: &str, ack: Option<bool>) -> RelayResult<PullOutcome> {
        let ack = ack.unwrap_or(self.config.relay.consume_by_default);
        let result = self.service.pull(raw_key, ack).await;
        match &result {
            Ok(outcome) => {
                self.metrics.pulls_total.fetch_add(1, Ordering::Relaxed);
                if matches!(outcome, PullOutcome::Delivered(_)) {
                    self.metrics.deliveries_total.fetch_add(1, Ordering::Relaxed);
                }
            }
            Err(e) => {
                self.metrics.record_error(e);
                log_failure("pull", e);
            }
        }
        result
    }

    /// Resolve a display name for `raw_code`.
    pub fn lookup(&self, raw_code: &str) -> Option<&str> {
        self.metrics.lookups_total.fetch_add(1, Ordering::Relaxed);
        self.lookup.lookup(raw_code)
    }

    /// Run one sweep pass and shrink the rate limiter tables.
    pub async fn sweep(&self) -> RelayResult<u64> {
        self.rate_limits.shrink();
        let removed = self.service.sweep().await?;
        self.metrics.swept_total.fetch_add(removed, Ordering::Relaxed);
        Ok(removed)
    }
}

/// Start the relay described by `config` and serve until `shutdown` resolves.
///
/// Opens the store, loads the lookup table, starts the cleanup task and
/// binds `server.bind_address`.
pub async fn run<F>(config: Config, shutdown: F) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    config.validate()?;

    let store = storage::open(&config.storage).await?;
    let lookup = match &config.lookup.ids_file {
        Some(path) => LookupTable::load(path)?,
        None => LookupTable::empty(),
    };
    tracing::info!("Lookup table holds {} ids", lookup.len());

    let relay = Arc::new(CodeRelay::new(config.clone(), store).with_lookup(lookup));
    let cleanup = spawn_cleanup_task(relay.clone(), config.cleanup.clone());

    let listener = TcpListener::bind(&config.server.bind_address).await?;
    tracing::info!(
        "Relay listening on {} (ttl: {}s)",
        listener.local_addr()?,
        config.relay.ttl_secs
    );

    let served = crate::http::serve(listener, relay, shutdown).await;
    cleanup.abort();
    served?;

    tracing::info!("Relay stopped");
    Ok(())
}

fn log_failure(op: &str, err: &RelayError) {
    match err.kind() {
        ErrorKind::InvalidInput => tracing::debug!("Rejected {}: {}", op, err),
        ErrorKind::StorageFailure => tracing::error!("Storage failure during {}: {}", op, err),
    }
}
