//! Frozen engine configuration.

use std::path::PathBuf;

use chrono_tz::Tz;

use crate::error::{PitError, Result};

const DEFAULT_MAX_CONCURRENCY: usize = 4;
const DEFAULT_RATE_LIMIT_RPS: u32 = 10;
const DEFAULT_HTTP_TIMEOUT_S: u64 = 30;

/// Immutable configuration for a snapshot engine run.
///
/// Constructed once via [`EngineConfig::builder`] and never mutated afterward.
/// All components (client, rate limiter, cache, builder) share the same
/// config through an `Arc`.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    user_agent: String,
    cache_dir: PathBuf,
    output_dir: PathBuf,
    max_concurrency: usize,
    rate_limit_rps: u32,
    http_timeout_s: u64,
    cutoff_timezone: Tz,
}

impl EngineConfig {
    /// Starts building a new config with the required `user_agent`.
    #[must_use]
    pub fn builder(user_agent: impl Into<String>) -> EngineConfigBuilder {
        EngineConfigBuilder::new(user_agent)
    }

    /// The user-agent string sent with every regulator request.
    #[must_use]
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Directory backing the on-disk response cache.
    #[must_use]
    pub fn cache_dir(&self) -> &std::path::Path {
        &self.cache_dir
    }

    /// Directory external writers should use for serialized output.
    #[must_use]
    pub fn output_dir(&self) -> &std::path::Path {
        &self.output_dir
    }

    /// Maximum number of tickers processed concurrently.
    #[must_use]
    pub const fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Requests per second enforced against the regulator endpoint.
    #[must_use]
    pub const fn rate_limit_rps(&self) -> u32 {
        self.rate_limit_rps
    }

    /// Per-HTTP-request timeout, in seconds.
    #[must_use]
    pub const fn http_timeout_s(&self) -> u64 {
        self.http_timeout_s
    }

    /// Time zone used to convert an `acceptance_datetime` into a cutoff day
    /// boundary (defaults to US Eastern, where the regulator is based).
    #[must_use]
    pub const fn cutoff_timezone(&self) -> Tz {
        self.cutoff_timezone
    }
}

/// Builder for [`EngineConfig`].
#[derive(Clone, Debug)]
pub struct EngineConfigBuilder {
    user_agent: String,
    cache_dir: PathBuf,
    output_dir: PathBuf,
    max_concurrency: usize,
    rate_limit_rps: u32,
    http_timeout_s: u64,
    cutoff_timezone: Tz,
}

impl EngineConfigBuilder {
    fn new(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
            cache_dir: PathBuf::from(".pit-cache"),
            output_dir: PathBuf::from("."),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            rate_limit_rps: DEFAULT_RATE_LIMIT_RPS,
            http_timeout_s: DEFAULT_HTTP_TIMEOUT_S,
            cutoff_timezone: chrono_tz::America::New_York,
        }
    }

    /// Sets the on-disk cache directory.
    #[must_use]
    pub fn cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = dir.into();
        self
    }

    /// Sets the output directory external writers should target.
    #[must_use]
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Sets the maximum number of tickers processed concurrently.
    #[must_use]
    pub const fn max_concurrency(mut self, n: usize) -> Self {
        self.max_concurrency = n;
        self
    }

    /// Sets the enforced requests-per-second ceiling.
    #[must_use]
    pub const fn rate_limit_rps(mut self, rps: u32) -> Self {
        self.rate_limit_rps = rps;
        self
    }

    /// Sets the per-HTTP-request timeout, in seconds.
    #[must_use]
    pub const fn http_timeout_s(mut self, secs: u64) -> Self {
        self.http_timeout_s = secs;
        self
    }

    /// Sets the time zone used for the cutoff day-boundary conversion.
    #[must_use]
    pub const fn cutoff_timezone(mut self, tz: Tz) -> Self {
        self.cutoff_timezone = tz;
        self
    }

    /// Builds the frozen [`EngineConfig`], validating `user_agent` is non-empty.
    ///
    /// # Errors
    /// Returns [`PitError::Auth`] if `user_agent` is empty.
    pub fn build(self) -> Result<EngineConfig> {
        if self.user_agent.trim().is_empty() {
            return Err(PitError::Auth(
                "EngineConfig requires a non-empty user_agent identifying the requester"
                    .to_string(),
            ));
        }

        Ok(EngineConfig {
            user_agent: self.user_agent,
            cache_dir: self.cache_dir,
            output_dir: self.output_dir,
            max_concurrency: self.max_concurrency,
            rate_limit_rps: self.rate_limit_rps,
            http_timeout_s: self.http_timeout_s,
            cutoff_timezone: self.cutoff_timezone,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_fails_on_empty_user_agent() {
        let result = EngineConfig::builder("   ").build();
        assert!(matches!(result, Err(PitError::Auth(_))));
    }

    #[test]
    fn build_applies_defaults() {
        let config = EngineConfig::builder("pit/0.1 (test@example.com)")
            .build()
            .unwrap();
        assert_eq!(config.max_concurrency(), DEFAULT_MAX_CONCURRENCY);
        assert_eq!(config.rate_limit_rps(), DEFAULT_RATE_LIMIT_RPS);
        assert_eq!(config.http_timeout_s(), DEFAULT_HTTP_TIMEOUT_S);
    }

    #[test]
    fn build_honors_overrides() {
        let config = EngineConfig::builder("pit/0.1 (test@example.com)")
            .max_concurrency(8)
            .rate_limit_rps(5)
            .http_timeout_s(60)
            .build()
            .unwrap();
        assert_eq!(config.max_concurrency(), 8);
        assert_eq!(config.rate_limit_rps(), 5);
        assert_eq!(config.http_timeout_s(), 60);
    }
}
