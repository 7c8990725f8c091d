//! No-op response cache.

use async_trait::async_trait;
use pit_core::{CachedResponse, ResponseCache, Result};
use tracing::trace;

/// A cache that stores nothing: every `get` is a miss, every `put` is
/// discarded. Useful for disabling caching, or for exercising the regulator
/// client's network path in tests without a real cache backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCache;

impl NoopCache {
    /// Creates a new no-op cache.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ResponseCache for NoopCache {
    async fn get(&self, _key: &str) -> Result<Option<CachedResponse>> {
        trace!("NoopCache::get called, returning None");
        Ok(None)
    }

    async fn put(&self, _key: &str, _response: CachedResponse) -> Result<()> {
        trace!("NoopCache::put called, discarding");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn get_is_always_a_miss() {
        let cache = NoopCache::new();
        assert!(cache.get("anything").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn put_is_discarded() {
        let cache = NoopCache::new();
        let response = CachedResponse {
            status: 200,
            etag: None,
            fetched_at: Utc::now(),
            body: b"ignored".to_vec(),
        };
        cache.put("anything", response).await.unwrap();
        assert!(cache.get("anything").await.unwrap().is_none());
    }

    #[test]
    fn is_copy() {
        let a = NoopCache::new();
        let b = a;
        let _c = b;
    }
}
