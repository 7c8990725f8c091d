//! In-memory response cache.

use std::collections::HashMap;

use async_trait::async_trait;
use pit_core::{CachedResponse, ResponseCache, Result};
use tokio::sync::RwLock;
use tracing::debug;

/// A process-lifetime response cache backed by a `RwLock`-protected
/// `HashMap`. Useful for tests and for short-lived processes where a
/// persistent on-disk cache isn't worth the setup.
#[derive(Debug, Default)]
pub struct InMemoryCache {
    entries: RwLock<HashMap<String, CachedResponse>>,
}

impl InMemoryCache {
    /// Creates a new, empty in-memory cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ResponseCache for InMemoryCache {
    async fn get(&self, key: &str) -> Result<Option<CachedResponse>> {
        let entries = self.entries.read().await;
        match entries.get(key) {
            Some(response) => {
                debug!(key, "cache hit");
                Ok(Some(response.clone()))
            }
            None => {
                debug!(key, "cache miss");
                Ok(None)
            }
        }
    }

    async fn put(&self, key: &str, response: CachedResponse) -> Result<()> {
        let mut entries = self.entries.write().await;
        debug!(key, bytes = response.body.len(), "caching response");
        entries.insert(key.to_string(), response);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample_response(body: &str) -> CachedResponse {
        CachedResponse {
            status: 200,
            etag: None,
            fetched_at: Utc::now(),
            body: body.as_bytes().to_vec(),
        }
    }

    #[tokio::test]
    async fn miss_then_hit() {
        let cache = InMemoryCache::new();
        assert!(cache.get("k").await.unwrap().is_none());
        cache.put("k", sample_response("v")).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap().unwrap().body, b"v");
    }

    #[tokio::test]
    async fn put_overwrites() {
        let cache = InMemoryCache::new();
        cache.put("k", sample_response("first")).await.unwrap();
        cache.put("k", sample_response("second")).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap().unwrap().body, b"second");
    }
}
