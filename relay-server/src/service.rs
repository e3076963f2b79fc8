//! Submit / pull semantics on top of a [`RecordStore`].
//!
//! Per session key the relay moves through:
//!
//! ```text
//!            submit                 consuming pull
//! NoRecord ─────────► Pending ─────────────────────► NoRecord
//!                      │  ▲
//!                      │  └── submit (code replaced, age reset)
//!                      └───── TTL elapsed ─────────► NoRecord
//! ```

use crate::config::RelayConfig;
use crate::error::{RelayError, RelayResult};
use crate::storage::RecordStore;
use relay_types::{Code, SessionKey};
use std::sync::Arc;
use std::time::Duration;

/// Result of a pull that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PullOutcome {
    /// A code was waiting.
    Delivered(Code),
    /// Nothing to deliver: not submitted yet, already taken, or expired.
    Pending,
}

/// Validates input and drives the record store.
///
/// Holds no records itself; all state lives in the injected store.
#[derive(Clone)]
pub struct RelayService {
    store: Arc<dyn RecordStore>,
    ttl: Duration,
    sweep_on_submit: bool,
}

impl std::fmt::Debug for RelayService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayService")
            .field("ttl", &self.ttl)
            .field("sweep_on_submit", &self.sweep_on_submit)
            .finish_non_exhaustive()
    }
}

impl RelayService {
    /// Create a service over `store` using the TTL and sweep policy from `config`.
    pub fn new(store: Arc<dyn RecordStore>, config: &RelayConfig) -> Self {
        Self {
            store,
            ttl: config.ttl(),
            sweep_on_submit: config.sweep_on_submit,
        }
    }

    /// Record lifetime.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    /// Store `raw_code` for `raw_key`, replacing any code already waiting.
    ///
    /// Both inputs are validated before the store is touched.
    pub async fn submit(&self, raw_key: &str, raw_code: &str) -> RelayResult<Code> {
        let key = SessionKey::parse(raw_key)?;
        let code = Code::parse(raw_code)?;

        if self.sweep_on_submit {
            match self.store.sweep(self.ttl).await {
                Ok(0) => {}
                Ok(removed) => tracing::debug!("Swept {} expired records before submit", removed),
                Err(e) => tracing::warn!("Opportunistic sweep failed: {}", e),
            }
        }

        self.store
            .put(&key, &code)
            .await
            .map_err(RelayError::WriteFailed)?;

        tracing::debug!("Stored code for {:?}", key);
        Ok(code)
    }

    /// Ask for the code waiting under `raw_key`.
    ///
    /// With `ack` the code is consumed: of any number of concurrent pulls,
    /// one receives it and the rest see [`PullOutcome::Pending`]. Without
    /// `ack` the code is only peeked at and stays in place.
    pub async fn pull(&self, raw_key: &str, ack: bool) -> RelayResult<PullOutcome> {
        let key = SessionKey::parse(raw_key)?;

        let record = if ack {
            self.store.consume(&key, self.ttl).await
        } else {
            self.store.get(&key, self.ttl).await
        }
        .map_err(RelayError::StorageUnavailable)?;

        Ok(match record {
            Some(record) => {
                tracing::debug!("Delivered code for {:?} (ack={})", key, ack);
                PullOutcome::Delivered(record.code)
            }
            None => PullOutcome::Pending,
        })
    }

    /// Peek at `raw_key` without consuming.
    pub async fn status(&self, raw_key: &str) -> RelayResult<PullOutcome> {
        self.pull(raw_key, false).await
    }

    /// Remove expired records now.
    pub async fn sweep(&self) -> RelayResult<u64> {
        self.store
            .sweep(self.ttl)
            .await
            .map_err(RelayError::StorageUnavailable)
    }
}
