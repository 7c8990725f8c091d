#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/pit-fundamentals/pit/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Point-in-time SEC EDGAR fundamentals: a single crate re-exporting the
//! whole pipeline.

// Core types and traits
pub use pit_core::*;

// Cache implementations
#[cfg(feature = "cache-sqlite")]
pub use pit_cache::SqliteCache;
pub use pit_cache::{InMemoryCache, NoopCache};

// The regulator client
pub use pit_edgar::{CikMap, FilingsIndex, RegulatorClient, XbrlFetcher};

// Selection, assembly and orchestration
pub use pit_engine::{ContextEngine, FilingSelector, SnapshotBuilder, StatementAssembler};
pub use pit_engine::context::TargetPeriod;
pub use pit_engine::tagmap;
