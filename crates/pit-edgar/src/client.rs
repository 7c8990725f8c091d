//! The shared regulator HTTP client.

use std::sync::Arc;
use std::time::Duration;

use pit_core::{
    canonicalize_url, CachedResponse, EngineConfig, PitError, ResponseCache, Result, TokenBucket,
};
use reqwest::StatusCode;
use tracing::{debug, warn};

const MAX_ATTEMPTS: u32 = 5;
const BACKOFF_BASE: Duration = Duration::from_secs(1);
const BACKOFF_FACTOR: u32 = 2;

/// The single HTTP entry point every `pit-edgar` module calls through.
///
/// Pipeline per [`RegulatorClient::get`] call: consult the cache; on miss,
/// acquire one rate-limit token; issue the GET with the mandatory
/// identifying user-agent header; on transport error or 5xx, retry with
/// exponential backoff (base 1s, factor 2, plus jitter, up to
/// [`MAX_ATTEMPTS`]); on 4xx, fail fast; on success, write through to the
/// cache and return the body.
#[derive(Debug)]
pub struct RegulatorClient {
    http: reqwest::Client,
    cache: Arc<dyn ResponseCache>,
    rate_limiter: TokenBucket,
}

impl RegulatorClient {
    /// Builds a client from engine configuration and a shared cache.
    ///
    /// # Errors
    /// Returns [`PitError::Auth`] if the HTTP client cannot be constructed
    /// with the configured user-agent (this should not happen in practice;
    /// `reqwest` only rejects malformed header values).
    pub fn new(config: &EngineConfig, cache: Arc<dyn ResponseCache>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent().to_string())
            .timeout(Duration::from_secs(config.http_timeout_s()))
            .build()
            .map_err(|e| PitError::Auth(format!("invalid user-agent configuration: {e}")))?;

        Ok(Self {
            http,
            cache,
            rate_limiter: TokenBucket::new(config.rate_limit_rps(), config.rate_limit_rps()),
        })
    }

    /// Fetches `url`, consulting and populating the cache, honoring the
    /// shared rate limiter, and retrying transient failures.
    ///
    /// # Errors
    /// Returns [`PitError::Auth`] on 403 (missing/rejected user-agent),
    /// [`PitError::NotFound`] on 404, or [`PitError::Network`] once retries
    /// are exhausted.
    pub async fn get(&self, url: &str) -> Result<Vec<u8>> {
        let cache_key = canonicalize_url(url);
        if let Some(cached) = self.cache.get(&cache_key).await? {
            debug!(url, "serving from response cache");
            return Ok(cached.body);
        }

        let mut attempt = 0u32;
        loop {
            attempt += 1;
            self.rate_limiter.acquire().await;

            match self.try_fetch(url).await {
                Ok(response) => {
                    self.cache.put(&cache_key, response.clone()).await?;
                    return Ok(response.body);
                }
                Err(FetchError::Fatal(e)) => return Err(e),
                Err(FetchError::Retryable(e)) => {
                    if attempt >= MAX_ATTEMPTS {
                        warn!(url, attempt, "retries exhausted");
                        return Err(PitError::Network(format!(
                            "{url}: exhausted {MAX_ATTEMPTS} attempts: {e}"
                        )));
                    }
                    let delay = backoff_delay(attempt);
                    warn!(url, attempt, ?delay, %e, "retrying after transient error");
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    async fn try_fetch(&self, url: &str) -> std::result::Result<CachedResponse, FetchError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Retryable(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::FORBIDDEN {
            return Err(FetchError::Fatal(PitError::Auth(format!(
                "{url}: user-agent missing or rejected (403)"
            ))));
        }
        if status == StatusCode::NOT_FOUND {
            return Err(FetchError::Fatal(PitError::NotFound(url.to_string())));
        }
        if status.is_server_error() {
            return Err(FetchError::Retryable(format!("HTTP {status}")));
        }
        if !status.is_success() {
            return Err(FetchError::Fatal(PitError::Network(format!(
                "{url}: HTTP {status}"
            ))));
        }

        let etag = response
            .headers()
            .get(reqwest::header::ETAG)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::Retryable(e.to_string()))?
            .to_vec();

        Ok(CachedResponse {
            status: status.as_u16(),
            etag,
            fetched_at: chrono::Utc::now(),
            body,
        })
    }
}

enum FetchError {
    Retryable(String),
    Fatal(PitError),
}

fn backoff_delay(attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1);
    let base_ms = BACKOFF_BASE.as_millis() as u64 * u64::from(BACKOFF_FACTOR.pow(exponent));
    let jitter_ms = fastrand::u64(0..=base_ms / 4 + 1);
    Duration::from_millis(base_ms + jitter_ms)
}
