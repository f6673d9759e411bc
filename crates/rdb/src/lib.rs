//! # Rdb - Redis snapshot decoder
//!
//! Streams a Redis RDB snapshot once, front to back, and turns every
//! key/value record into an [`Entry`] carrying the key's estimated memory
//! overhead on the live server (see the [`memprofile`] crate).
//!
//! ## Pipeline
//!
//! ```text
//! dump.rdb ──► Loader::run ──► opcode loop ──► RedisObject::decode
//!                                   │                 │
//!                                   │          mem_overhead (memprofile)
//!                                   ▼                 │
//!                         crossbeam Sender<Entry> ◄───┘
//! ```
//!
//! ## Module Responsibilities
//!
//! | Module          | Purpose                                            |
//! |-----------------|----------------------------------------------------|
//! | [`format`]      | Opcodes, type tags and encoding constants          |
//! | [`primitive`]   | Length encoding, raw byte reads                    |
//! | [`string`]      | String encodings (raw, integer, LZF), scores       |
//! | [`lzf`]         | LZF decompression (and a compressor for fixtures)  |
//! | [`ziplist`]     | Legacy compact list                                |
//! | [`listpack`]    | Compact list                                       |
//! | [`intset`]      | Sorted integer array                               |
//! | [`module`]      | Skipping opcode-framed module payloads             |
//! | [`object`]      | Typed value decoding and pricing                   |
//! | [`loader`]      | The single-pass walker                             |
//!
//! ## Errors
//!
//! Every decoding failure is fatal to the pass. The byte cursor cannot be
//! resynchronized once framing is lost, so there is no skip-and-continue.

mod entry;
mod error;
pub mod format;
pub mod intset;
pub mod listpack;
mod loader;
pub mod lzf;
pub mod module;
mod object;
pub mod primitive;
pub mod string;
pub mod ziplist;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;

pub use entry::Entry;
pub use error::{RdbError, Result};
pub use loader::{AlwaysEligible, EligibilityProbe, LoadSummary, Loader, DEFAULT_CHECK_INTERVAL};
pub use object::{RedisObject, ZsetMember};

#[cfg(test)]
mod tests;
