//! # Memprofile - Redis memory cost model
//!
//! Pure functions that estimate how many heap bytes a key occupies inside a
//! running Redis server, given only the shape of its value.
//!
//! The model replays the server's allocation pattern on a 64-bit build with
//! jemalloc:
//!
//! ```text
//! keyspace dict
//!   └── dictEntry ──► key sds
//!                └──► robj ──► value structure
//!                               ├── string : sds (or nothing for small ints)
//!                               ├── hash   : dict + n × (dictEntry + sds + sds)
//!                               ├── set    : dict + n × (dictEntry + sds)
//!                               ├── list   : quicklist + nodes × (node + ziplist)
//!                               └── zset   : zset + dict + zskiplist + n × (dictEntry + node)
//! ```
//!
//! Every allocation is rounded up by [`malloc_size`] to the allocator's
//! size class.
//!
//! ## Example
//!
//! ```rust
//! use memprofile::{malloc_size, string_overhead};
//!
//! assert_eq!(malloc_size(20), 32);
//! // "acct:1" -> "42": dictEntry(24) + sds(16) + robj(16), no value sds.
//! assert_eq!(string_overhead(6, b"42"), 56);
//! ```

mod estimate;
mod layout;
mod size_class;
mod skiplist;

pub use estimate::{
    hash_overhead, list_overhead, pack_quicklist, set_overhead, string_overhead,
    zset_overhead_for, QuicklistPacking,
};
pub use layout::{
    bucket_overhead, dict_entry_overhead, dict_ht_overhead, dict_overhead, is_integer_encodable,
    next_power, quicklist_node_overhead, quicklist_overhead,
    redis_obj_overhead, sds_overhead, top_level_overhead, ziplist_overhead, zlentry_overhead,
    zset_overhead, zskiplist_node_overhead, zskiplist_overhead,
};
pub use size_class::{malloc_size, SIZE_CLASSES};
pub use skiplist::random_level;

/// Width of a pointer on the modeled build.
pub const POINTER_SIZE: u64 = 8;
/// Width of `long` / `unsigned long`.
pub const LONG_SIZE: u64 = 8;
/// Bytes taken by the `type:4 encoding:4 lru:24` bit fields of `robj`, beyond the first byte.
pub const LRU_BITS: u64 = 3;

/// `sdshdr8` header, including the NUL terminator.
pub const SDS_HDR8: u64 = 4;
/// `sdshdr16` header, including the NUL terminator.
pub const SDS_HDR16: u64 = 6;
/// `sdshdr32` header, including the NUL terminator.
pub const SDS_HDR32: u64 = 10;
/// `sdshdr64` header, including the NUL terminator.
pub const SDS_HDR64: u64 = 18;

/// Longest decimal string (sign included) that fits in an `i64`.
pub const INT_ENCODING_MAX_LEN: usize = 20;

/// Default `list-max-ziplist-size -2`: 8 KiB per quicklist node.
pub const ZIPLIST_MAX_NODE_BYTES: u64 = 8192;

/// Hard cap on skip-list levels (`ZSKIPLIST_MAXLEVEL`).
pub const SKIPLIST_MAX_LEVEL: u32 = 32;
/// Probability of promoting a skip-list node one more level (`ZSKIPLIST_P`).
pub const SKIPLIST_P: f64 = 0.25;

/// Flat cost added to a key that carries a TTL: one entry in the expires dict.
pub const EXPIRE_ENTRY_OVERHEAD: u64 = 24;
