//! # Analysis - per-namespace memory attribution
//!
//! Drives [`rdb::Loader`] over a snapshot on a dedicated thread, folds the
//! entries it emits into per-namespace totals, and publishes the finished
//! table for readers.
//!
//! ## Module Responsibilities
//!
//! | Module        | Purpose                                                |
//! |---------------|--------------------------------------------------------|
//! | [`aggregate`] | Namespace rule, running totals, bucket apportioning    |
//! | [`table`]     | Finished table and the atomically swapped handle       |
//! | [`pipeline`]  | Walker thread + bounded channel + publish-on-success   |
//! | [`driver`]    | Replica snapshot trigger over an abstract driver       |
//!
//! A pass either completes and replaces the published table in one swap,
//! or fails and leaves the previous table untouched.

pub mod aggregate;
pub mod driver;
mod error;
pub mod pipeline;
pub mod table;

pub use aggregate::{namespace_of, Aggregator, NamespaceOverhead};
pub use driver::{
    parse_info_prop, prepare_snapshot, RoleProbe, SnapshotDriver, DEFAULT_MAX_POLLS,
    DEFAULT_POLL_INTERVAL,
};
pub use error::{AnalysisError, Result};
pub use pipeline::{Analyzer, PassOptions, PassReport};
pub use table::{OverheadTable, PublishedTable};

#[cfg(test)]
mod tests;
