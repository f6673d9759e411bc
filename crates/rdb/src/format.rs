//! RDB binary format constants.
//!
//! ## File layout
//!
//! ```text
//! ["REDIS"][version: 4 ASCII digits]
//! [opcode | type tag][payload] ...      repeated
//! [0xFF][crc64: 8 bytes]                 (checksum not verified)
//! ```
//!
//! A byte in opcode position is either one of the `OPCODE_*` values below,
//! or a value type tag (`TYPE_*`) announcing a key/value record.

/// Magic prefix of every snapshot file.
pub const RDB_MAGIC: &[u8; 5] = b"REDIS";

/// Header length: magic + four version digits.
pub const HEADER_BYTES: usize = 9;

/// Newest format version this decoder was written against.
pub const MAX_KNOWN_VERSION: u32 = 12;

// -------------------- Opcodes --------------------

/// Function library payload (7.0 GA and later).
pub const OPCODE_FUNCTION2: u8 = 0xF5;
/// Function library payload from 7.0 release candidates.
pub const OPCODE_FUNCTION_PRE_GA: u8 = 0xF6;
/// Module auxiliary data.
pub const OPCODE_MODULE_AUX: u8 = 0xF7;
/// LRU idle time of the next key.
pub const OPCODE_IDLE: u8 = 0xF8;
/// LFU frequency of the next key.
pub const OPCODE_FREQ: u8 = 0xF9;
/// Auxiliary field (key/value string pair).
pub const OPCODE_AUX: u8 = 0xFA;
/// Hash table size hint for the current database.
pub const OPCODE_RESIZEDB: u8 = 0xFB;
/// Absolute expire time of the next key, milliseconds.
pub const OPCODE_EXPIRETIME_MS: u8 = 0xFC;
/// Absolute expire time of the next key, seconds.
pub const OPCODE_EXPIRETIME: u8 = 0xFD;
/// Switches the current database.
pub const OPCODE_SELECTDB: u8 = 0xFE;
/// End of the snapshot.
pub const OPCODE_EOF: u8 = 0xFF;

// -------------------- Value types --------------------

pub const TYPE_STRING: u8 = 0;
pub const TYPE_LIST: u8 = 1;
pub const TYPE_SET: u8 = 2;
/// Sorted set with scores stored as length-prefixed text.
pub const TYPE_ZSET: u8 = 3;
pub const TYPE_HASH: u8 = 4;
/// Sorted set with scores stored as binary doubles.
pub const TYPE_ZSET_2: u8 = 5;
/// Module value, pre-opcode serialization.
pub const TYPE_MODULE: u8 = 6;
/// Module value with self-describing opcodes.
pub const TYPE_MODULE_2: u8 = 7;
pub const TYPE_HASH_ZIPMAP: u8 = 9;
pub const TYPE_LIST_ZIPLIST: u8 = 10;
pub const TYPE_SET_INTSET: u8 = 11;
pub const TYPE_ZSET_ZIPLIST: u8 = 12;
pub const TYPE_HASH_ZIPLIST: u8 = 13;
pub const TYPE_LIST_QUICKLIST: u8 = 14;
pub const TYPE_STREAM_LISTPACKS: u8 = 15;
pub const TYPE_HASH_LISTPACK: u8 = 16;
pub const TYPE_ZSET_LISTPACK: u8 = 17;
pub const TYPE_LIST_QUICKLIST_2: u8 = 18;
pub const TYPE_STREAM_LISTPACKS_2: u8 = 19;
pub const TYPE_SET_LISTPACK: u8 = 20;
pub const TYPE_STREAM_LISTPACKS_3: u8 = 21;
/// Hash with per-field expiry, dict form, as written by 7.4 release candidates.
pub const TYPE_HASH_METADATA_PRE_GA: u8 = 22;
/// Hash with per-field expiry, listpack form, as written by 7.4 release candidates.
pub const TYPE_HASH_LISTPACK_EX_PRE_GA: u8 = 23;
/// Hash with per-field expiry, dict form.
pub const TYPE_HASH_METADATA: u8 = 24;
/// Hash with per-field expiry, listpack form.
pub const TYPE_HASH_LISTPACK_EX: u8 = 25;

/// Returns `true` if `tag` names a value type defined by the format,
/// whether or not this decoder can materialize it.
#[must_use]
pub fn is_value_type(tag: u8) -> bool {
    matches!(tag, 0..=7 | 9..=25)
}

// -------------------- Length encoding --------------------

/// Top two bits `00`: 6-bit length.
pub const LEN_6BIT: u8 = 0;
/// Top two bits `01`: 14-bit length.
pub const LEN_14BIT: u8 = 1;
/// Top two bits `10`: 32- or 64-bit length follows.
pub const LEN_32_OR_64BIT: u8 = 2;
/// Top two bits `11`: special string encoding.
pub const LEN_ENCVAL: u8 = 3;
/// Full first byte announcing a big-endian `u32` length.
pub const LEN_32BIT: u8 = 0x80;
/// Full first byte announcing a big-endian `u64` length.
pub const LEN_64BIT: u8 = 0x81;

/// Special string encoding: 8-bit integer.
pub const ENC_INT8: u8 = 0;
/// Special string encoding: 16-bit integer.
pub const ENC_INT16: u8 = 1;
/// Special string encoding: 32-bit integer.
pub const ENC_INT32: u8 = 2;
/// Special string encoding: LZF-compressed string.
pub const ENC_LZF: u8 = 3;

/// Upper bound on a single decoded string. Protects against absurd
/// allocations when a corrupt length is read.
pub const MAX_STRING_BYTES: u64 = 512 * 1024 * 1024;

// -------------------- Quicklist v2 containers --------------------

pub const QUICKLIST_NODE_PLAIN: u64 = 1;
pub const QUICKLIST_NODE_PACKED: u64 = 2;

// -------------------- Module serialization --------------------

pub const MODULE_OPCODE_EOF: u64 = 0;
pub const MODULE_OPCODE_SINT: u64 = 1;
pub const MODULE_OPCODE_UINT: u64 = 2;
pub const MODULE_OPCODE_FLOAT: u64 = 3;
pub const MODULE_OPCODE_DOUBLE: u64 = 4;
pub const MODULE_OPCODE_STRING: u64 = 5;

// -------------------- Aux fields --------------------

/// Aux key naming the database the replication stream selects first.
pub const AUX_REPL_STREAM_DB: &[u8] = b"repl-stream-db";
/// Aux key carrying a Lua script body.
pub const AUX_LUA: &[u8] = b"lua";
