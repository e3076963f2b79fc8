//! Storage layer for scan-relay.
//!
//! One record per session key, read at most once, gone after the TTL.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::config::{StorageBackend, StorageConfig};
use crate::error::StorageResult;
use async_trait::async_trait;
use relay_types::{Code, SessionKey};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// A code waiting to be picked up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Session the code was submitted under.
    pub key: SessionKey,
    /// The relayed code.
    pub code: Code,
    /// Unix timestamp in milliseconds when the record was written.
    pub created_at_ms: i64,
}

/// Trait for record storage backends.
///
/// Every operation touches a single key except [`RecordStore::sweep`] and
/// [`RecordStore::len`]. Records with an age of at least `max_age` are never
/// returned, whether or not a sweep has removed them yet.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Store a code under `key`, replacing any existing record and
    /// restarting its age.
    async fn put(&self, key: &SessionKey, code: &Code) -> StorageResult<()>;

    /// Read the record for `key` without removing it.
    async fn get(&self, key: &SessionKey, max_age: Duration)
        -> StorageResult<Option<Record>>;

    /// Atomically remove and return the record for `key`.
    ///
    /// When several callers race on the same key, exactly one receives the
    /// record and the rest receive `None`.
    async fn consume(
        &self,
        key: &SessionKey,
        max_age: Duration,
    ) -> StorageResult<Option<Record>>;

    /// Remove every record whose age is at least `max_age`.
    ///
    /// Returns the number of records deleted.
    async fn sweep(&self, max_age: Duration) -> StorageResult<u64>;

    /// Number of records held, including expired ones not yet swept.
    async fn len(&self) -> StorageResult<u64>;
}

/// Open the backend selected in configuration.
pub async fn open(config: &StorageConfig) -> StorageResult<Arc<dyn RecordStore>> {
    match config.backend {
        StorageBackend::Memory => {
            tracing::info!("Using in-memory record store");
            Ok(Arc::new(MemoryStore::new()))
        }
        StorageBackend::Sqlite => {
            tracing::info!("Using SQLite record store at {}", config.database.display());
            Ok(Arc::new(SqliteStore::new(&config.database).await?))
        }
    }
}

/// Current Unix time in milliseconds.
pub(crate) fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

/// Records created at or before this instant are expired.
pub(crate) fn expiry_cutoff(max_age: Duration) -> i64 {
    let max_age_ms = i64::try_from(max_age.as_millis()).unwrap_or(i64::MAX);
    now_millis().saturating_sub(max_age_ms)
}
