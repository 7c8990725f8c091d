//! Error types for the point-in-time pipeline.
//!
//! This module defines [`PitError`], which covers every error case that can
//! occur while fetching, parsing, gating, or assembling point-in-time
//! fundamental data. `ValidationWarning` (balance-sheet/cashflow identity
//! drift) is deliberately **not** a variant here: per-spec it is non-fatal and
//! row-emitting, so it lives in [`crate::types::TickerIssue`] instead.

use thiserror::Error;

/// Errors that can occur while building a point-in-time snapshot.
#[derive(Error, Debug)]
pub enum PitError {
    /// Transport failure or repeated 5xx after retries are exhausted.
    #[error("network error: {0}")]
    Network(String),

    /// User-agent missing or rejected by the regulator endpoint.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// 404 from the regulator endpoint, treated as "no data for this ticker".
    #[error("not found: {0}")]
    NotFound(String),

    /// Malformed facts/filings payload.
    #[error("parse error: {0}")]
    Parse(String),

    /// Error interacting with the response cache.
    #[error("cache error: {0}")]
    Cache(String),

    /// A row's `asof_date` exceeded the request cutoff, or a selected filing's
    /// acceptance datetime exceeded the cutoff. This is a programmer-error
    /// signal: it must never occur if the filter chain upstream is correct,
    /// and it always aborts the snapshot.
    #[error("cutoff violation: {0}")]
    CutoffViolation(String),

    /// An invalid parameter was supplied (e.g. an empty ticker).
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Any other error.
    #[error("{0}")]
    Other(String),
}

/// Result type alias using [`PitError`].
pub type Result<T> = std::result::Result<T, PitError>;
