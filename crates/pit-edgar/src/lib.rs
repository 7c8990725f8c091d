#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/pit-fundamentals/pit/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! SEC EDGAR regulator client.
//!
//! - [`client`], [`client::RegulatorClient`], the shared HTTP entry point
//!   (cache → rate limit → retry/backoff)
//! - [`cik`], [`cik::CikMap`], ticker→issuer resolution
//! - [`filings`], [`filings::FilingsIndex`], the per-issuer filing list
//!   with the primary point-in-time gate applied
//! - [`xbrl`], [`xbrl::XbrlFetcher`], the company-facts endpoint flattened
//!   into a stream of [`pit_core::XbrlFact`]

/// Ticker → issuer (CIK) resolution.
pub mod cik;
/// Shared regulator HTTP client: cache, rate limiting, retry/backoff.
pub mod client;
/// Per-issuer filings index with the primary PIT gate.
pub mod filings;
/// Company-facts endpoint fetcher.
pub mod xbrl;

pub use cik::CikMap;
pub use client::RegulatorClient;
pub use filings::FilingsIndex;
pub use xbrl::XbrlFetcher;
