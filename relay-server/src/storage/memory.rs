//! In-memory storage backend.

use super::{now_millis, Record, RecordStore};
use crate::error::StorageResult;
use async_trait::async_trait;
use dashmap::DashMap;
use relay_types::{Code, SessionKey};
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct StoredCode {
    code: Code,
    created_at_ms: i64,
    /// Monotonic write time; expiry is judged from this, not the wall clock.
    stored_at: Instant,
}

impl StoredCode {
    fn is_live(&self, max_age: Duration) -> bool {
        self.stored_at.elapsed() < max_age
    }
}

/// DashMap-backed record store.
///
/// Each key lives in one shard guarded by its own lock, so a put, get or
/// consume on one key never waits on unrelated keys. `remove_if` checks age
/// and removes under a single shard write lock, which is what makes
/// [`RecordStore::consume`] exactly-once.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: DashMap<SessionKey, StoredCode>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn put(&self, key: &SessionKey, code: &Code) -> StorageResult<()> {
        self.records.insert(
            key.clone(),
            StoredCode {
                code: code.clone(),
                created_at_ms: now_millis(),
                stored_at: Instant::now(),
            },
        );
        Ok(())
    }

    async fn get(
        &self,
        key: &SessionKey,
        max_age: Duration,
    ) -> StorageResult<Option<Record>> {
        Ok(self
            .records
            .get(key)
            .filter(|entry| entry.is_live(max_age))
            .map(|entry| Record {
                key: key.clone(),
                code: entry.code.clone(),
                created_at_ms: entry.created_at_ms,
            }))
    }

    async fn consume(
        &self,
        key: &SessionKey,
        max_age: Duration,
    ) -> StorageResult<Option<Record>> {
        Ok(self
            .records
            .remove_if(key, |_, stored| stored.is_live(max_age))
            .map(|(key, stored)| Record {
                key,
                code: stored.code,
                created_at_ms: stored.created_at_ms,
            }))
    }

    async fn sweep(&self, max_age: Duration) -> StorageResult<u64> {
        let mut removed = 0u64;

        self.records.retain(|_, stored| {
            let keep = stored.is_live(max_age);
            if !keep {
                removed += 1;
            }
            keep
        });

        Ok(removed)
    }

    async fn len(&self) -> StorageResult<u64> {
        Ok(self.records.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    const DAY: Duration = Duration::from_secs(86_400);

    fn key(s: &str) -> SessionKey {
        SessionKey::parse(s).unwrap()
    }

    fn code(s: &str) -> Code {
        Code::parse(s).unwrap()
    }

    #[tokio::test]
    async fn put_then_get_leaves_record() {
        let store = MemoryStore::new();
        let k = key("s1234567890123456");

        store.put(&k, &code("482913")).await.unwrap();

        let first = store.get(&k, DAY).await.unwrap().unwrap();
        assert_eq!(first.code, code("482913"));
        assert_eq!(first.key, k);

        // Peeking does not remove
        assert!(store.get(&k, DAY).await.unwrap().is_some());
        assert_eq!(store.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn consume_removes_record() {
        let store = MemoryStore::new();
        let k = key("s1234567890123456");

        store.put(&k, &code("482913")).await.unwrap();

        let taken = store.consume(&k, DAY).await.unwrap();
        assert_eq!(taken.map(|r| r.code), Some(code("482913")));

        assert!(store.consume(&k, DAY).await.unwrap().is_none());
        assert!(store.get(&k, DAY).await.unwrap().is_none());
        assert_eq!(store.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn put_overwrites_existing_record() {
        let store = MemoryStore::new();
        let k = key("s1234567890123456");

        store.put(&k, &code("111111")).await.unwrap();
        store.put(&k, &code("222222")).await.unwrap();

        assert_eq!(store.len().await.unwrap(), 1);
        let record = store.consume(&k, DAY).await.unwrap().unwrap();
        assert_eq!(record.code, code("222222"));
    }

    #[tokio::test]
    async fn expired_record_is_invisible_without_sweep() {
        let store = MemoryStore::new();
        let k = key("s1234567890123456");

        store.put(&k, &code("482913")).await.unwrap();

        assert!(store.get(&k, Duration::ZERO).await.unwrap().is_none());
        assert!(store.consume(&k, Duration::ZERO).await.unwrap().is_none());

        // Still held until swept
        assert_eq!(store.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn expiry_after_short_ttl() {
        let store = MemoryStore::new();
        let k = key("s1234567890123456");
        let ttl = Duration::from_millis(20);

        store.put(&k, &code("482913")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;

        assert!(store.consume(&k, ttl).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn sweep_removes_only_expired() {
        let store = MemoryStore::new();
        let old = key("old_session_00001");
        let fresh = key("new_session_00001");

        store.put(&old, &code("111111")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        store.put(&fresh, &code("222222")).await.unwrap();

        let removed = store.sweep(Duration::from_millis(25)).await.unwrap();
        assert_eq!(removed, 1);
        assert!(store.get(&old, DAY).await.unwrap().is_none());
        assert!(store.get(&fresh, DAY).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn wall_clock_step_back_does_not_extend_life() {
        let store = MemoryStore::new();
        let k = key("s1234567890123456");
        let ttl = Duration::from_secs(1);

        // Stamped a day in the future, as if the wall clock then jumped back.
        store.records.insert(
            k.clone(),
            StoredCode {
                code: code("482913"),
                created_at_ms: now_millis() + 86_400_000,
                stored_at: Instant::now() - Duration::from_secs(2),
            },
        );

        assert!(store.get(&k, ttl).await.unwrap().is_none());
        assert!(store.consume(&k, ttl).await.unwrap().is_none());
        assert_eq!(store.sweep(ttl).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn sweep_on_empty_store() {
        let store = MemoryStore::new();
        assert_eq!(store.sweep(Duration::ZERO).await.unwrap(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_consume_delivers_once() {
        for _ in 0..20 {
            let store = Arc::new(MemoryStore::new());
            let k = key("race_session_0001");
            store.put(&k, &code("482913")).await.unwrap();

            let mut handles = Vec::new();
            for _ in 0..16 {
                let store = store.clone();
                let k = k.clone();
                handles.push(tokio::spawn(async move {
                    store.consume(&k, DAY).await.unwrap()
                }));
            }

            let mut delivered = 0;
            for handle in handles {
                if handle.await.unwrap().is_some() {
                    delivered += 1;
                }
            }
            assert_eq!(delivered, 1);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_put_and_get_never_tears() {
        let store = Arc::new(MemoryStore::new());
        let k = key("tear_session_0001");
        let codes = ["111111", "22222222", "3333333333", "44444444444444444444"];
        store.put(&k, &code(codes[0])).await.unwrap();

        let writer = {
            let store = store.clone();
            let k = k.clone();
            tokio::spawn(async move {
                for i in 0..500 {
                    store.put(&k, &code(codes[i % codes.len()])).await.unwrap();
                }
            })
        };

        for _ in 0..500 {
            if let Some(record) = store.get(&k, DAY).await.unwrap() {
                assert!(codes.contains(&record.code.as_str()));
            }
        }
        writer.await.unwrap();
    }
}
