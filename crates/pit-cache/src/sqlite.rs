//! SQLite-based response cache.

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pit_core::{CachedResponse, PitError, ResponseCache, Result};
use rusqlite::{Connection, OptionalExtension, params};
use tracing::{debug, instrument};

/// SQLite-backed response cache.
///
/// Stores each response keyed by its canonicalized request URL (the caller
/// canonicalizes before calling `get`/`put`; see [`pit_core::canonicalize_url`]),
/// in a single table that is never pruned: historical regulator data is
/// immutable, so a row written once stays valid forever. Blocking `rusqlite` calls are moved
/// onto a dedicated connection guarded by a `std::sync::Mutex`, matching how
/// the rest of this workspace wraps a synchronous driver behind an async
/// trait.
#[derive(Debug)]
pub struct SqliteCache {
    conn: Mutex<Connection>,
}

impl SqliteCache {
    /// Opens (or creates) a cache database at `path`.
    ///
    /// # Errors
    /// Returns [`PitError::Cache`] if the database cannot be opened or the
    /// schema cannot be created.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path).map_err(|e| PitError::Cache(e.to_string()))?;
        let cache = Self {
            conn: Mutex::new(conn),
        };
        cache.initialize_schema()?;
        Ok(cache)
    }

    /// Opens an in-memory cache database. Data is lost when dropped; useful
    /// for tests.
    ///
    /// # Errors
    /// Returns [`PitError::Cache`] if the schema cannot be created.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| PitError::Cache(e.to_string()))?;
        let cache = Self {
            conn: Mutex::new(conn),
        };
        cache.initialize_schema()?;
        Ok(cache)
    }

    fn initialize_schema(&self) -> Result<()> {
        let conn = self.conn.lock().map_err(|e| PitError::Cache(e.to_string()))?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS response_cache (
                key TEXT PRIMARY KEY,
                status INTEGER NOT NULL,
                etag TEXT,
                fetched_at TEXT NOT NULL,
                body BLOB NOT NULL
            )",
            [],
        )
        .map_err(|e| PitError::Cache(e.to_string()))?;
        debug!("sqlite response cache schema initialized");
        Ok(())
    }
}

#[async_trait]
impl ResponseCache for SqliteCache {
    #[instrument(skip(self), fields(key = %key))]
    async fn get(&self, key: &str) -> Result<Option<CachedResponse>> {
        let conn = self.conn.lock().map_err(|e| PitError::Cache(e.to_string()))?;
        let row = conn
            .query_row(
                "SELECT status, etag, fetched_at, body FROM response_cache WHERE key = ?1",
                params![key],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, Vec<u8>>(3)?,
                    ))
                },
            )
            .optional()
            .map_err(|e| PitError::Cache(e.to_string()))?;

        let Some((status, etag, fetched_at, body)) = row else {
            debug!("cache miss");
            return Ok(None);
        };

        let fetched_at: DateTime<Utc> = fetched_at
            .parse()
            .map_err(|e| PitError::Cache(format!("corrupt fetched_at timestamp: {e}")))?;

        debug!("cache hit");
        Ok(Some(CachedResponse {
            #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
            status: status as u16,
            etag,
            fetched_at,
            body,
        }))
    }

    #[instrument(skip(self, response), fields(key = %key, status = response.status))]
    async fn put(&self, key: &str, response: CachedResponse) -> Result<()> {
        let conn = self.conn.lock().map_err(|e| PitError::Cache(e.to_string()))?;
        conn.execute(
            "INSERT OR REPLACE INTO response_cache (key, status, etag, fetched_at, body)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                key,
                i64::from(response.status),
                response.etag,
                response.fetched_at.to_rfc3339(),
                response.body,
            ],
        )
        .map_err(|e| PitError::Cache(e.to_string()))?;
        debug!("cached {} bytes", response.body.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_response(body: &str) -> CachedResponse {
        CachedResponse {
            status: 200,
            etag: Some("abc123".to_string()),
            fetched_at: Utc::now(),
            body: body.as_bytes().to_vec(),
        }
    }

    #[tokio::test]
    async fn miss_then_hit_round_trips_bytes() {
        let cache = SqliteCache::in_memory().unwrap();
        assert!(cache.get("https://example.com/a").await.unwrap().is_none());

        cache
            .put("https://example.com/a", sample_response("hello"))
            .await
            .unwrap();

        let hit = cache.get("https://example.com/a").await.unwrap().unwrap();
        assert_eq!(hit.body, b"hello");
        assert_eq!(hit.status, 200);
    }

    #[tokio::test]
    async fn put_overwrites_existing_key() {
        let cache = SqliteCache::in_memory().unwrap();
        cache
            .put("https://example.com/a", sample_response("first"))
            .await
            .unwrap();
        cache
            .put("https://example.com/a", sample_response("second"))
            .await
            .unwrap();

        let hit = cache.get("https://example.com/a").await.unwrap().unwrap();
        assert_eq!(hit.body, b"second");
    }

    #[tokio::test]
    async fn distinct_keys_do_not_collide() {
        let cache = SqliteCache::in_memory().unwrap();
        cache
            .put("https://example.com/a", sample_response("a"))
            .await
            .unwrap();
        cache
            .put("https://example.com/b", sample_response("b"))
            .await
            .unwrap();

        assert_eq!(
            cache.get("https://example.com/a").await.unwrap().unwrap().body,
            b"a"
        );
        assert_eq!(
            cache.get("https://example.com/b").await.unwrap().unwrap().body,
            b"b"
        );
    }
}
