//! Sizes of the server's internal structures.
//!
//! Every function here models one C struct (or one allocation) of the
//! server on a 64-bit build. Field widths live in the constants at the top
//! of the crate so that a layout change is a one-place edit.

use crate::size_class::malloc_size;
use crate::{
    INT_ENCODING_MAX_LEN, LONG_SIZE, LRU_BITS, POINTER_SIZE, SDS_HDR16, SDS_HDR32, SDS_HDR64,
    SDS_HDR8,
};

/// `dictEntry`: key pointer, value union, next pointer.
#[must_use]
pub fn dict_entry_overhead() -> u64 {
    malloc_size(3 * POINTER_SIZE)
}

/// `robj`: type/encoding/lru bit fields, refcount, value pointer.
#[must_use]
pub fn redis_obj_overhead() -> u64 {
    malloc_size(1 + LRU_BITS + 4 + POINTER_SIZE)
}

/// Short-string (sds) allocation for a string of `len` bytes.
///
/// The header class is chosen by length: `sdshdr8` below 256 bytes,
/// `sdshdr16` below 64 KiB, `sdshdr32` below 4 GiB, `sdshdr64` otherwise.
/// The header sizes include the trailing NUL.
#[must_use]
pub fn sds_overhead(len: u64) -> u64 {
    let header = if len < 1 << 8 {
        SDS_HDR8
    } else if len < 1 << 16 {
        SDS_HDR16
    } else if len < 1 << 32 {
        SDS_HDR32
    } else {
        SDS_HDR64
    };
    malloc_size(header + len)
}

/// `dictht`: table pointer, size, sizemask, used.
#[must_use]
pub fn dict_ht_overhead() -> u64 {
    malloc_size(4 * POINTER_SIZE)
}

/// `dict`: type and privdata pointers, two `dictht`, rehash index, iterator count.
///
/// Both hash-table generations are always counted so an in-flight resize is
/// covered.
#[must_use]
pub fn dict_overhead() -> u64 {
    malloc_size(POINTER_SIZE + POINTER_SIZE + 2 * dict_ht_overhead() + POINTER_SIZE + 4)
}

/// Smallest power of two strictly greater than `size` (1 for 0).
#[must_use]
pub fn next_power(size: u64) -> u64 {
    match size.checked_add(1) {
        Some(n) => n.checked_next_power_of_two().unwrap_or(1 << 63),
        None => 1 << 63,
    }
}

/// Bucket arrays for a hash table holding `count` elements.
///
/// Counts the current array (`next_power(count)` slots) plus half of it for
/// the copy that exists while a resize is in progress.
#[must_use]
pub fn bucket_overhead(count: u64) -> u64 {
    let slots = next_power(count);
    malloc_size(slots.saturating_mul(POINTER_SIZE))
        + malloc_size((slots / 2).saturating_mul(POINTER_SIZE))
}

/// `quicklist`: head, tail, count, len, fill/compress/bookmark bit fields
/// (padded to 40 bytes).
#[must_use]
pub fn quicklist_overhead() -> u64 {
    malloc_size(POINTER_SIZE + POINTER_SIZE + LONG_SIZE + LONG_SIZE + 2 + 2 + 1 + 3)
}

/// `quicklistNode`: prev, next, payload pointer, size, packed bit fields.
#[must_use]
pub fn quicklist_node_overhead() -> u64 {
    malloc_size(POINTER_SIZE + POINTER_SIZE + POINTER_SIZE + 4 + 2 + 2)
}

/// Empty ziplist: `zlbytes` + `zltail` + `zllen` + `zlend`.
///
/// Not quantized: a ziplist is reallocated on every insert, so the size
/// class is applied once per completed node instead.
#[must_use]
pub fn ziplist_overhead() -> u64 {
    4 + 4 + 2 + 1
}

/// One ziplist entry holding `len` bytes after an entry of `prev_len` bytes.
///
/// `prevlen` takes 1 byte, or 5 once the previous entry reaches 254 bytes;
/// the string encoding header takes 1, 2 or 5 bytes.
#[must_use]
pub fn zlentry_overhead(prev_len: u64, len: u64) -> u64 {
    let prevlen = if prev_len >= 254 { 5 } else { 1 };
    let encoding = if len < 64 {
        1
    } else if len < 16_384 {
        2
    } else {
        5
    };
    prevlen + encoding + len
}

/// `zset`: dict pointer plus skiplist pointer.
#[must_use]
pub fn zset_overhead() -> u64 {
    malloc_size(POINTER_SIZE + POINTER_SIZE)
}

/// `zskiplist`: header, tail, length, level (padded).
#[must_use]
pub fn zskiplist_overhead() -> u64 {
    malloc_size(POINTER_SIZE + POINTER_SIZE + LONG_SIZE + 4 + 4)
}

/// `zskiplistNode` with `level` entries in its level array, plus the sds
/// holding a member of `member_len` bytes.
///
/// The node and its level array are a single allocation.
#[must_use]
pub fn zskiplist_node_overhead(member_len: u64, level: u32) -> u64 {
    let level_bytes = u64::from(level) * (POINTER_SIZE + LONG_SIZE);
    malloc_size(POINTER_SIZE + LONG_SIZE + POINTER_SIZE + level_bytes) + sds_overhead(member_len)
}

/// Returns `true` when the server would store `value` as an integer inside
/// the object pointer (`OBJ_ENCODING_INT`), so no sds is allocated.
#[must_use]
pub fn is_integer_encodable(value: &[u8]) -> bool {
    if value.is_empty() || value.len() > INT_ENCODING_MAX_LEN {
        return false;
    }
    std::str::from_utf8(value)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .is_some()
}

/// Keyspace slot for one key: its dict entry, key sds and value object.
#[must_use]
pub fn top_level_overhead(key_len: u64) -> u64 {
    dict_entry_overhead() + sds_overhead(key_len) + redis_obj_overhead()
}
