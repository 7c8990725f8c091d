//! Content-addressed HTTP response cache.
//!
//! Historical SEC filings never change once accepted, so a cached response is
//! valid forever, there is no TTL or eviction concept here, unlike a typical
//! HTTP cache. The only reason a cache miss turns into a fresh fetch is that
//! the key (URL) has never been seen before.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;

/// A previously-fetched HTTP response, stored verbatim.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CachedResponse {
    /// HTTP status code of the original response.
    pub status: u16,
    /// Entity tag reported by the origin, if any.
    pub etag: Option<String>,
    /// When this response was fetched and written into the cache.
    pub fetched_at: DateTime<Utc>,
    /// Raw response body bytes.
    pub body: Vec<u8>,
}

/// Canonicalizes a request URL into the form it is cached under: query
/// parameters sorted by key, fragment stripped.
///
/// Two URLs that differ only in query-param order or a fragment identifier
/// name the same regulator resource, so they must collide on the same cache
/// key. Falls back to returning `url` unchanged if it does not parse; the
/// caller still has a usable (if less compressible) key in that case.
#[must_use]
pub fn canonicalize_url(url: &str) -> String {
    let Ok(mut parsed) = url::Url::parse(url) else {
        return url.to_string();
    };

    let mut pairs: Vec<(String, String)> = parsed
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    pairs.sort();

    parsed.set_fragment(None);
    if pairs.is_empty() {
        parsed.set_query(None);
    } else {
        let query = pairs
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");
        parsed.set_query(Some(&query));
    }

    parsed.into()
}

/// A cache of raw HTTP responses keyed by canonicalized request URL.
///
/// The trait itself is key-agnostic; callers are expected to pass `key`
/// through [`canonicalize_url`] first (`pit-edgar`'s `RegulatorClient` does),
/// so two URLs differing only in query-param order or a fragment collide on
/// one entry. Implementations never expire or evict a successfully-cached
/// entry: the `pit-cache` crate's `sqlite`, `memory`, and `noop` backends
/// all honor this contract. A `get` miss is the only signal the caller
/// needs to go fetch from the network; a `put` call is expected to be
/// infallible in practice but returns `Result` so a disk-backed
/// implementation can surface I/O errors.
#[async_trait]
pub trait ResponseCache: Send + Sync {
    /// Looks up a previously-cached response for `key`.
    async fn get(&self, key: &str) -> Result<Option<CachedResponse>>;

    /// Stores a response under `key`, overwriting any previous entry.
    async fn put(&self, key: &str, response: CachedResponse) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_params_are_sorted() {
        let a = canonicalize_url("https://data.sec.gov/submissions?b=2&a=1");
        let b = canonicalize_url("https://data.sec.gov/submissions?a=1&b=2");
        assert_eq!(a, b);
    }

    #[test]
    fn fragment_is_stripped() {
        let canonical = canonicalize_url("https://data.sec.gov/submissions?a=1#ignored");
        assert_eq!(canonical, "https://data.sec.gov/submissions?a=1");
    }

    #[test]
    fn query_free_url_round_trips_unchanged() {
        let url = "https://data.sec.gov/submissions/CIK0000320193.json";
        assert_eq!(canonicalize_url(url), url);
    }

    #[test]
    fn unparseable_url_falls_back_to_the_original_string() {
        let not_a_url = "not a url";
        assert_eq!(canonicalize_url(not_a_url), not_a_url);
    }
}
