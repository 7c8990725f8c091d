#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/pit-fundamentals/pit/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Point-in-time fact selection, tag mapping, statement assembly and
//! concurrent snapshot orchestration.

/// The statement assembler.
pub mod assemble;
/// The snapshot builder: concurrent per-ticker orchestration and coverage.
pub mod builder;
/// The context engine: per-tag, per-period fact selection under a cutoff.
pub mod context;
/// The filing selector: best filing version per fiscal period.
pub mod select;
/// The tag mapper: the append-only priority table of regulator tags.
pub mod tagmap;

pub use assemble::StatementAssembler;
pub use builder::SnapshotBuilder;
pub use context::ContextEngine;
pub use select::FilingSelector;

// Re-export so downstream crates depending only on `pit-engine` still have
// the full vocabulary (`Ticker`, `SnapshotRequest`, `PitError`, ...).
pub use pit_core::*;
