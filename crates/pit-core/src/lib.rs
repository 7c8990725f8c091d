#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/pit-fundamentals/pit/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Core vocabulary for point-in-time fundamental snapshots.
//!
//! This crate defines:
//!
//! - [`types`], tickers, issuers, filings, XBRL facts, standard fields, and
//!   the typed statement rows that make up a [`types::SnapshotResult`]
//! - [`error`], [`error::PitError`], the closed error taxonomy
//! - [`config`], [`config::EngineConfig`], the frozen engine configuration
//! - [`cache`], [`cache::ResponseCache`], the content-addressed HTTP body cache trait
//! - [`ratelimit`], [`ratelimit::TokenBucket`], the shared rate limiter

/// Response cache trait and cached-response types.
pub mod cache;
/// Frozen engine configuration.
pub mod config;
/// Error types for the point-in-time pipeline.
pub mod error;
/// Token-bucket rate limiter.
pub mod ratelimit;
/// Core data types (Ticker, IssuerId, Filing, XBRLFact, StandardField, statement rows).
pub mod types;

pub use cache::{canonicalize_url, CachedResponse, ResponseCache};
pub use config::EngineConfig;
pub use error::{PitError, Result};
pub use ratelimit::TokenBucket;
pub use types::{
    BalanceSheetRow, CashFlowRow, CompanyMasterRow, CoverageReport, DerivedMetricsRow, Filing,
    FilingRow, FormType, IncomeStatementRow, IssueKind, IssuerId, PeriodKind, PeriodType,
    SnapshotRequest, SnapshotResult, StandardField, TagMapping, Ticker, TickerIssue, XbrlFact,
};
