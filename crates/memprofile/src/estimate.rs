//! Per-type memory estimates.
//!
//! Each function returns the total bytes one key of that type occupies:
//! its keyspace slot ([`top_level_overhead`]) plus the value's internal
//! structures. Callers pass lengths rather than values so the model stays
//! independent of how the values were decoded.

use rand::Rng;

use crate::layout::{
    bucket_overhead, dict_entry_overhead, dict_overhead, is_integer_encodable,
    quicklist_node_overhead, quicklist_overhead, sds_overhead, top_level_overhead,
    ziplist_overhead, zlentry_overhead, zset_overhead, zskiplist_node_overhead,
    zskiplist_overhead,
};
use crate::size_class::malloc_size;
use crate::skiplist::random_level;
use crate::ZIPLIST_MAX_NODE_BYTES;

/// String key. Integer-like values up to 20 characters live inside the
/// object pointer and add nothing.
#[must_use]
pub fn string_overhead(key_len: u64, value: &[u8]) -> u64 {
    let value_overhead = if is_integer_encodable(value) {
        0
    } else {
        sds_overhead(value.len() as u64)
    };
    top_level_overhead(key_len) + value_overhead
}

/// Hash key backed by a dict; `fields` yields `(field_len, value_len)`.
pub fn hash_overhead<I>(key_len: u64, fields: I) -> u64
where
    I: IntoIterator<Item = (u64, u64)>,
{
    let mut count = 0u64;
    let mut data = 0u64;
    for (field_len, value_len) in fields {
        count += 1;
        data += dict_entry_overhead() + sds_overhead(field_len) + sds_overhead(value_len);
    }
    top_level_overhead(key_len) + dict_overhead() + data + bucket_overhead(count)
}

/// Set key backed by a dict; members are stored as dict keys with no value.
pub fn set_overhead<I>(key_len: u64, members: I) -> u64
where
    I: IntoIterator<Item = u64>,
{
    let mut count = 0u64;
    let mut data = 0u64;
    for member_len in members {
        count += 1;
        data += dict_entry_overhead() + sds_overhead(member_len);
    }
    top_level_overhead(key_len) + dict_overhead() + data + bucket_overhead(count)
}

/// Node layout produced by greedily packing list elements into ziplists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuicklistPacking {
    /// Number of nodes that filled up.
    pub full_nodes: u64,
    /// Sum of the quantized sizes of the filled nodes.
    pub node_bytes: u64,
}

/// Packs elements of the given lengths into ziplist nodes capped at
/// [`ZIPLIST_MAX_NODE_BYTES`].
///
/// When an element would overflow the current node, the node is closed and
/// a fresh one is started; the overflowing element itself is not carried
/// into the new node.
pub fn pack_quicklist<I>(elements: I) -> QuicklistPacking
where
    I: IntoIterator<Item = u64>,
{
    let mut packing = QuicklistPacking::default();
    let mut node_size = ziplist_overhead();
    let mut prev_len = 0u64;
    for len in elements {
        let entry = zlentry_overhead(prev_len, len);
        if node_size + entry > ZIPLIST_MAX_NODE_BYTES {
            packing.full_nodes += 1;
            packing.node_bytes += malloc_size(node_size);
            node_size = ziplist_overhead();
        } else {
            node_size += entry;
        }
        prev_len = len;
    }
    packing
}

/// List key backed by a quicklist of ziplist nodes.
pub fn list_overhead<I>(key_len: u64, elements: I) -> u64
where
    I: IntoIterator<Item = u64>,
{
    let packing = pack_quicklist(elements);
    top_level_overhead(key_len)
        + quicklist_overhead()
        + quicklist_node_overhead() * packing.full_nodes
        + packing.node_bytes
}

/// Sorted-set key backed by a dict plus a skip list.
///
/// Each member draws its skip-list level from `rng`, so two calls with
/// differently seeded generators may disagree.
pub fn zset_overhead_for<I, R>(key_len: u64, members: I, rng: &mut R) -> u64
where
    I: IntoIterator<Item = u64>,
    R: Rng + ?Sized,
{
    let mut count = 0u64;
    let mut data = 0u64;
    for member_len in members {
        count += 1;
        data += dict_entry_overhead() + zskiplist_node_overhead(member_len, random_level(rng));
    }
    top_level_overhead(key_len)
        + zset_overhead()
        + dict_overhead()
        + bucket_overhead(count)
        + zskiplist_overhead()
        + data
}
