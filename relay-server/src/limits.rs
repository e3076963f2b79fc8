//! Rate limiting for scan-relay.
//!
//! Session keys are long enough that guessing one is hopeless, but only if a
//! single client cannot fire pulls at an unbounded rate. Limits are keyed by
//! client IP address:
//! - **submit** operations per IP per minute
//! - **pull** operations per IP per minute
//! - a global per-second cap across all clients
//!
//! All use the governor crate's rate limiters; keyed ones are backed by DashMap.

use crate::config::LimitsConfig;
use governor::clock::DefaultClock;
use governor::middleware::NoOpMiddleware;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use std::net::IpAddr;
use std::num::NonZeroU32;
use std::sync::Arc;

/// Type alias for a keyed rate limiter using DashMap.
type KeyedLimiter<K> = RateLimiter<
    K,
    dashmap::DashMap<K, InMemoryState>,
    DefaultClock,
    NoOpMiddleware<governor::clock::QuantaInstant>,
>;

/// Type alias for a direct (non-keyed) rate limiter.
type DirectLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Rate limiters for the relay server.
#[derive(Clone)]
pub struct RateLimits {
    /// Limits submits per client IP.
    submit_limiter: Arc<KeyedLimiter<IpAddr>>,

    /// Limits pulls per client IP.
    pull_limiter: Arc<KeyedLimiter<IpAddr>>,

    /// Global rate limiter across all clients.
    global_limiter: Arc<DirectLimiter>,
}

impl std::fmt::Debug for RateLimits {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimits")
            .field("submit_limiter", &"KeyedLimiter<IpAddr>")
            .field("pull_limiter", &"KeyedLimiter<IpAddr>")
            .field("global_limiter", &"DirectLimiter")
            .finish()
    }
}

impl RateLimits {
    /// Create rate limiters from configuration.
    ///
    /// Zero quotas are rejected by [`crate::config::Config::validate`]; if one
    /// slips through it is treated as 1.
    pub fn new(config: &LimitsConfig) -> Self {
        let per_minute = |n: u32| Quota::per_minute(NonZeroU32::new(n).unwrap_or(NonZeroU32::MIN));

        let global_rps =
            NonZeroU32::new(config.global_requests_per_second).unwrap_or(NonZeroU32::MIN);

        Self {
            submit_limiter: Arc::new(RateLimiter::keyed(per_minute(config.submits_per_minute))),
            pull_limiter: Arc::new(RateLimiter::keyed(per_minute(config.pulls_per_minute))),
            global_limiter: Arc::new(RateLimiter::direct(Quota::per_second(global_rps))),
        }
    }

    /// Check if a submit from `ip` is allowed.
    pub fn check_submit(&self, ip: IpAddr) -> Result<(), RateLimitError> {
        self.check_global()?;
        self.submit_limiter
            .check_key(&ip)
            .map_err(|_| RateLimitError::SubmitLimitExceeded)
    }

    /// Check if a pull from `ip` is allowed.
    pub fn check_pull(&self, ip: IpAddr) -> Result<(), RateLimitError> {
        self.check_global()?;
        self.pull_limiter
            .check_key(&ip)
            .map_err(|_| RateLimitError::PullLimitExceeded)
    }

    /// Check if the global request rate is within limits.
    ///
    /// This is a server-wide rate limit that caps aggregate throughput
    /// regardless of individual client limits.
    pub fn check_global(&self) -> Result<(), RateLimitError> {
        self.global_limiter
            .check()
            .map_err(|_| RateLimitError::GlobalLimitExceeded)
    }

    /// Number of tracked client keys across both keyed limiters.
    pub fn tracked_clients(&self) -> usize {
        self.submit_limiter.len() + self.pull_limiter.len()
    }

    /// Evict entries whose rate limit cells have fully recharged.
    ///
    /// Called periodically from the cleanup task.
    pub fn shrink(&self) {
        self.submit_limiter.retain_recent();
        self.pull_limiter.retain_recent();
    }
}

/// Rate limit error types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RateLimitError {
    /// Too many submits from this client.
    #[error("submit rate limit exceeded")]
    SubmitLimitExceeded,
    /// Too many pulls from this client.
    #[error("pull rate limit exceeded")]
    PullLimitExceeded,
    /// Global request rate exceeded across all clients.
    #[error("global rate limit exceeded")]
    GlobalLimitExceeded,
}
