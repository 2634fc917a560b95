//! # llc-partition
//!
//! RRIP-family last-level-cache replacement policies for a two-application
//! timing simulator, plus the dead-block detection and utility-based
//! partitioning (UCP) machinery layered on top of them.
//!
//! Three concrete policies are provided, each a drop-in per-set replacement
//! engine:
//!
//! - [`dbpv::DbpvSet`] — static per-owner insertion position selected by a
//!   configured case, with reuse-count classification at eviction.
//! - [`dbpv_dyn::DbpvDynSet`] — like DBPV, but the insertion position is
//!   retargeted every `max_value` insertions based on the dead-block
//!   percentage observed in the phase just completed.
//! - [`dbasp::DbaspSet`] — partitions ways between the two owners according
//!   to a periodically recomputed [`ucp`] quota, rather than relying on
//!   SRRIP aging alone.
//!
//! ## Quick start
//!
//! ```rust
//! use std::sync::Arc;
//! use llc_partition::config::SrripConfig;
//! use llc_partition::dbpv::DbpvSet;
//! use llc_partition::owner::Owner;
//! use llc_partition::stats::AtomicStatsSink;
//!
//! let stats = Arc::new(AtomicStatsSink::new());
//! let mut set = DbpvSet::new(SrripConfig::dbpv_default(), 0, 16, stats);
//! let mut valid = vec![false; 16];
//! let way = set.get_replacement_index(&valid, Owner::Core0)?;
//! valid[way] = true;
//! set.update_on_hit(way)?;
//! # Ok::<(), llc_partition::error::ReplacementError>(())
//! ```
//!
//! ## Architecture
//!
//! - [`rrpv`] — the shared SRRIP RRPV array and victim search used by DBPV
//!   and DBPV_DYN.
//! - [`ucp`] — the utility-maximization solver that converts recency
//!   histograms into a way quota, used by DBASP.
//! - [`config`] — typed configuration and presets for all three policies.
//! - [`stats`] — the counter-registration sink every policy reports through.
//! - [`owner`] — the two-application identity stamped on each cache block.
//! - [`error`] — the crate's fatal-error type.
//! - [`logging`] — `tracing` subscriber setup for the `sim` binary.

pub mod config;
pub mod dbasp;
pub mod dbpv;
pub mod dbpv_dyn;
pub mod error;
pub mod logging;
pub mod owner;
pub mod rrpv;
pub mod saturating;
pub mod stats;
pub mod ucp;

pub use crate::config::{PolicyConfigSource, SrripConfig};
pub use crate::dbasp::{DbaspContext, DbaspSet};
pub use crate::dbpv::DbpvSet;
pub use crate::dbpv_dyn::{DbpvDynContext, DbpvDynSet};
pub use crate::error::{ReplacementError, Result};
pub use crate::owner::Owner;
pub use crate::stats::{AtomicStatsSink, NullStatsSink, StatsSink};
