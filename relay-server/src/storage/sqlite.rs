//! SQLite storage backend for scan-relay.

use super::{expiry_cutoff, now_millis, Record, RecordStore};
use crate::error::{StorageError, StorageResult};
use async_trait::async_trait;
use relay_types::{Code, SessionKey};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::time::Duration;

/// SQLite-based record store.
///
/// Uses WAL mode for concurrent reads/writes. Atomicity per key comes from
/// SQLite itself: consume is a `DELETE ... RETURNING` in a transaction that
/// is rolled back if the returned row does not validate.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore")
            .field("connections", &self.pool.size())
            .finish()
    }
}

impl SqliteStore {
    /// Open (or create) the database file at `path`.
    ///
    /// The parent directory must already exist.
    pub async fn new(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.is_dir() {
                return Err(StorageError::InvalidPath {
                    path: path.to_path_buf(),
                });
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(10)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Create an in-memory SQLite store (for testing).
    ///
    /// Limited to one connection: every `:memory:` connection is its own
    /// database.
    pub async fn in_memory() -> StorageResult<Self> {
        let options = SqliteConnectOptions::new().in_memory(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Run database migrations.
    async fn run_migrations(&self) -> StorageResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS records (
                session TEXT PRIMARY KEY NOT NULL,
                code TEXT NOT NULL,
                created_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_records_created_at ON records(created_at)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn put(&self, key: &SessionKey, code: &Code) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO records (session, code, created_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(session) DO UPDATE
                SET code = excluded.code, created_at = excluded.created_at
            "#,
        )
        .bind(key.as_str())
        .bind(code.as_str())
        .bind(now_millis())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(
        &self,
        key: &SessionKey,
        max_age: Duration,
    ) -> StorageResult<Option<Record>> {
        let row = sqlx::query_as::<_, RecordRow>(
            r#"
            SELECT code, created_at
            FROM records
            WHERE session = ?1 AND created_at > ?2
            "#,
        )
        .bind(key.as_str())
        .bind(expiry_cutoff(max_age))
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| r.into_record(key)).transpose()
    }

    async fn consume(
        &self,
        key: &SessionKey,
        max_age: Duration,
    ) -> StorageResult<Option<Record>> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, RecordRow>(
            r#"
            DELETE FROM records
            WHERE session = ?1 AND created_at > ?2
            RETURNING code, created_at
            "#,
        )
        .bind(key.as_str())
        .bind(expiry_cutoff(max_age))
        .fetch_optional(&mut *tx)
        .await?;

        // A row that fails validation stays put so every retry reports it.
        match row.map(|r| r.into_record(key)).transpose() {
            Ok(record) => {
                tx.commit().await?;
                Ok(record)
            }
            Err(e) => {
                tx.rollback().await?;
                Err(e)
            }
        }
    }

    async fn sweep(&self, max_age: Duration) -> StorageResult<u64> {
        let result = sqlx::query("DELETE FROM records WHERE created_at <= ?1")
            .bind(expiry_cutoff(max_age))
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn len(&self) -> StorageResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM records")
            .fetch_one(&self.pool)
            .await?;

        Ok(count.max(0) as u64)
    }
}

/// Internal row type for SQLite queries.
#[derive(sqlx::FromRow)]
struct RecordRow {
    code: String,
    created_at: i64,
}

impl RecordRow {
    /// Re-validate on the way out: the file may have been edited by hand.
    fn into_record(self, key: &SessionKey) -> StorageResult<Record> {
        let code = Code::parse(&self.code).map_err(|_| StorageError::Corrupt {
            reason: format!("stored code for {:?} is not 6-20 digits", key),
        })?;

        Ok(Record {
            key: key.clone(),
            code,
            created_at_ms: self.created_at,
        })
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
    async fn put_then_consume_once() {
        let store = SqliteStore::in_memory().await.unwrap();
        let k = key("s1234567890123456");

        store.put(&k, &code("482913")).await.unwrap();

        let record = store.consume(&k, DAY).await.unwrap().unwrap();
        assert_eq!(record.code, code("482913"));
        assert!(record.created_at_ms > 0);

        assert!(store.consume(&k, DAY).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn get_does_not_remove() {
        let store = SqliteStore::in_memory().await.unwrap();
        let k = key("s1234567890123456");

        store.put(&k, &code("482913")).await.unwrap();

        assert!(store.get(&k, DAY).await.unwrap().is_some());
        assert!(store.get(&k, DAY).await.unwrap().is_some());
        assert_eq!(store.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn put_overwrites_and_resets_age() {
        let store = SqliteStore::in_memory().await.unwrap();
        let k = key("s1234567890123456");

        store.put(&k, &code("111111")).await.unwrap();
        let first = store.get(&k, DAY).await.unwrap().unwrap();

        tokio::time::sleep(Duration::from_millis(5)).await;
        store.put(&k, &code("222222")).await.unwrap();
        let second = store.get(&k, DAY).await.unwrap().unwrap();

        assert_eq!(second.code, code("222222"));
        assert!(second.created_at_ms > first.created_at_ms);
        assert_eq!(store.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn expired_record_is_invisible_without_sweep() {
        let store = SqliteStore::in_memory().await.unwrap();
        let k = key("s1234567890123456");

        store.put(&k, &code("482913")).await.unwrap();

        assert!(store.get(&k, Duration::ZERO).await.unwrap().is_none());
        assert!(store.consume(&k, Duration::ZERO).await.unwrap().is_none());
        assert_eq!(store.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn sweep_removes_only_expired() {
        let store = SqliteStore::in_memory().await.unwrap();
        let old = key("old_session_00001");
        let fresh = key("new_session_00001");

        store.put(&old, &code("111111")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        store.put(&fresh, &code("222222")).await.unwrap();

        let deleted = store.sweep(Duration::from_millis(25)).await.unwrap();
        assert_eq!(deleted, 1);
        assert!(store.get(&old, DAY).await.unwrap().is_none());
        assert!(store.get(&fresh, DAY).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn corrupt_row_is_an_error_not_absence() {
        let store = SqliteStore::in_memory().await.unwrap();
        let k = key("s1234567890123456");

        sqlx::query("INSERT INTO records (session, code, created_at) VALUES (?1, ?2, ?3)")
            .bind(k.as_str())
            .bind("12a3456")
            .bind(now_millis())
            .execute(&store.pool)
            .await
            .unwrap();

        let result = store.get(&k, DAY).await;
        assert!(matches!(result, Err(StorageError::Corrupt { .. })));
    }

    #[tokio::test]
    async fn consume_of_corrupt_row_keeps_failing() {
        let store = SqliteStore::in_memory().await.unwrap();
        let k = key("s1234567890123456");

        sqlx::query("INSERT INTO records (session, code, created_at) VALUES (?1, ?2, ?3)")
            .bind(k.as_str())
            .bind("12a3456")
            .bind(now_millis())
            .execute(&store.pool)
            .await
            .unwrap();

        for _ in 0..2 {
            let result = store.consume(&k, DAY).await;
            assert!(matches!(result, Err(StorageError::Corrupt { .. })));
        }
        assert_eq!(store.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relay.db");
        let k = key("s1234567890123456");

        {
            let store = SqliteStore::new(&path).await.unwrap();
            store.put(&k, &code("482913")).await.unwrap();
            store.pool.close().await;
        }

        let store = SqliteStore::new(&path).await.unwrap();
        let record = store.consume(&k, DAY).await.unwrap().unwrap();
        assert_eq!(record.code, code("482913"));
    }

    #[tokio::test]
    async fn missing_parent_directory_is_invalid_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("relay.db");

        let result = SqliteStore::new(&path).await;
        assert!(matches!(result, Err(StorageError::InvalidPath { .. })));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_consume_delivers_once() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SqliteStore::new(&dir.path().join("race.db")).await.unwrap());
        let k = key("race_session_0001");

        for _ in 0..10 {
            store.put(&k, &code("482913")).await.unwrap();

            let mut handles = Vec::new();
            for _ in 0..8 {
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
}
