//! Fixture builder for snapshot bytes.
//!
//! Compiled for this crate's tests and, behind the `testkit` feature, for
//! other crates' tests. Every encoder here writes the exact layout the
//! decoders read, so fixtures can be assembled record by record:
//!
//! ```rust,ignore
//! let bytes = RdbBuilder::new()
//!     .select_db(0)
//!     .string("acct:1", "42")
//!     .eof()
//!     .finish();
//! ```

use byteorder::{BigEndian, LittleEndian, WriteBytesExt};
use std::io;
use std::path::Path;

use crate::format::*;
use crate::lzf;

/// One field of an opcode-framed module payload.
#[derive(Debug, Clone, PartialEq)]
pub enum ModuleField {
    Sint(u64),
    Uint(u64),
    Float(f32),
    Double(f64),
    Str(Vec<u8>),
}

/// One quicklist2 container.
#[derive(Debug, Clone, PartialEq)]
pub enum QuicklistNode {
    /// A single element stored as a plain string.
    Plain(Vec<u8>),
    /// Several elements packed in a listpack.
    Packed(Vec<Vec<u8>>),
}

/// Appends snapshot records to an in-memory buffer.
#[derive(Debug, Clone, Default)]
pub struct RdbBuilder {
    buf: Vec<u8>,
}

impl RdbBuilder {
    /// Starts a file with a valid `REDIS0009` header.
    pub fn new() -> Self {
        Self::with_header(RDB_MAGIC, "0009")
    }

    /// Starts a file with an arbitrary magic and version text.
    pub fn with_header(magic: &[u8; 5], version: &str) -> Self {
        let mut buf = Vec::with_capacity(64);
        buf.extend_from_slice(magic);
        buf.extend_from_slice(version.as_bytes());
        Self { buf }
    }

    /// Starts with no header at all.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Appends raw bytes.
    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    // -------------------- Opcodes --------------------

    pub fn aux(mut self, key: impl AsRef<[u8]>, value: impl AsRef<[u8]>) -> Self {
        self.buf.push(OPCODE_AUX);
        put_string(&mut self.buf, key.as_ref());
        put_string(&mut self.buf, value.as_ref());
        self
    }

    pub fn select_db(mut self, db: u64) -> Self {
        self.buf.push(OPCODE_SELECTDB);
        put_length(&mut self.buf, db);
        self
    }

    pub fn resize_db(mut self, db_size: u64, expires_size: u64) -> Self {
        self.buf.push(OPCODE_RESIZEDB);
        put_length(&mut self.buf, db_size);
        put_length(&mut self.buf, expires_size);
        self
    }

    /// Absolute expire time in Unix milliseconds for the next record.
    pub fn expire_ms(mut self, at_ms: u64) -> Self {
        self.buf.push(OPCODE_EXPIRETIME_MS);
        self.buf.extend_from_slice(&at_ms.to_le_bytes());
        self
    }

    /// Absolute expire time in Unix seconds for the next record.
    pub fn expire_secs(mut self, at_secs: u32) -> Self {
        self.buf.push(OPCODE_EXPIRETIME);
        self.buf.extend_from_slice(&at_secs.to_le_bytes());
        self
    }

    pub fn idle(mut self, idle: u64) -> Self {
        self.buf.push(OPCODE_IDLE);
        put_length(&mut self.buf, idle);
        self
    }

    pub fn freq(mut self, freq: u8) -> Self {
        self.buf.push(OPCODE_FREQ);
        self.buf.push(freq);
        self
    }

    pub fn function2(mut self, library: impl AsRef<[u8]>) -> Self {
        self.buf.push(OPCODE_FUNCTION2);
        put_string(&mut self.buf, library.as_ref());
        self
    }

    pub fn module_aux(mut self, module_id: u64, when: u64, fields: &[ModuleField]) -> Self {
        self.buf.push(OPCODE_MODULE_AUX);
        put_length(&mut self.buf, module_id);
        put_length(&mut self.buf, MODULE_OPCODE_UINT);
        put_length(&mut self.buf, when);
        put_module_fields(&mut self.buf, fields);
        self
    }

    /// End-of-file opcode followed by an (unchecked) zero checksum.
    pub fn eof(mut self) -> Self {
        self.buf.push(OPCODE_EOF);
        self.buf.extend_from_slice(&[0u8; 8]);
        self
    }

    // -------------------- Strings --------------------

    /// String value stored as raw bytes.
    pub fn string(self, key: impl AsRef<[u8]>, value: impl AsRef<[u8]>) -> Self {
        let value = value.as_ref().to_vec();
        self.record(TYPE_STRING, key.as_ref(), |buf| put_string(buf, &value))
    }

    /// String value stored with the smallest inline integer encoding.
    pub fn int_string(self, key: impl AsRef<[u8]>, value: i32) -> Self {
        self.record(TYPE_STRING, key.as_ref(), |buf| put_int_string(buf, value))
    }

    /// String value stored LZF-compressed.
    pub fn lzf_string(self, key: impl AsRef<[u8]>, value: impl AsRef<[u8]>) -> Self {
        let value = value.as_ref().to_vec();
        self.record(TYPE_STRING, key.as_ref(), |buf| put_lzf_string(buf, &value))
    }

    // -------------------- Plain collections --------------------

    pub fn list<I>(self, key: impl AsRef<[u8]>, elements: I) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<[u8]>,
    {
        let elements = collect(elements);
        self.record(TYPE_LIST, key.as_ref(), |buf| put_string_seq(buf, &elements))
    }

    pub fn set<I>(self, key: impl AsRef<[u8]>, members: I) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<[u8]>,
    {
        let members = collect(members);
        self.record(TYPE_SET, key.as_ref(), |buf| put_string_seq(buf, &members))
    }

    pub fn hash<I, F, V>(self, key: impl AsRef<[u8]>, pairs: I) -> Self
    where
        I: IntoIterator<Item = (F, V)>,
        F: AsRef<[u8]>,
        V: AsRef<[u8]>,
    {
        let flat = flatten(pairs);
        self.record(TYPE_HASH, key.as_ref(), |buf| {
            put_length(buf, (flat.len() / 2) as u64);
            for item in &flat {
                put_string(buf, item);
            }
        })
    }

    /// Sorted set with text scores.
    pub fn zset<I, M>(self, key: impl AsRef<[u8]>, members: I) -> Self
    where
        I: IntoIterator<Item = (M, f64)>,
        M: AsRef<[u8]>,
    {
        let members: Vec<(Vec<u8>, f64)> = members
            .into_iter()
            .map(|(m, s)| (m.as_ref().to_vec(), s))
            .collect();
        self.record(TYPE_ZSET, key.as_ref(), |buf| {
            put_length(buf, members.len() as u64);
            for (member, score) in &members {
                put_string(buf, member);
                put_text_double(buf, *score);
            }
        })
    }

    /// Sorted set with binary scores.
    pub fn zset2<I, M>(self, key: impl AsRef<[u8]>, members: I) -> Self
    where
        I: IntoIterator<Item = (M, f64)>,
        M: AsRef<[u8]>,
    {
        let members: Vec<(Vec<u8>, f64)> = members
            .into_iter()
            .map(|(m, s)| (m.as_ref().to_vec(), s))
            .collect();
        self.record(TYPE_ZSET_2, key.as_ref(), |buf| {
            put_length(buf, members.len() as u64);
            for (member, score) in &members {
                put_string(buf, member);
                buf.extend_from_slice(&score.to_le_bytes());
            }
        })
    }

    // -------------------- Compact encodings --------------------

    pub fn list_ziplist<I>(self, key: impl AsRef<[u8]>, elements: I) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<[u8]>,
    {
        let blob = encode_ziplist(collect(elements));
        self.record(TYPE_LIST_ZIPLIST, key.as_ref(), |buf| put_string(buf, &blob))
    }

    /// Quicklist: one ziplist per node.
    pub fn list_quicklist(self, key: impl AsRef<[u8]>, nodes: &[Vec<Vec<u8>>]) -> Self {
        let blobs: Vec<Vec<u8>> = nodes.iter().map(|n| encode_ziplist(n.clone())).collect();
        self.record(TYPE_LIST_QUICKLIST, key.as_ref(), |buf| {
            put_length(buf, blobs.len() as u64);
            for blob in &blobs {
                put_string(buf, blob);
            }
        })
    }

    pub fn list_quicklist2(self, key: impl AsRef<[u8]>, nodes: &[QuicklistNode]) -> Self {
        let nodes = nodes.to_vec();
        self.record(TYPE_LIST_QUICKLIST_2, key.as_ref(), |buf| {
            put_length(buf, nodes.len() as u64);
            for node in &nodes {
                match node {
                    QuicklistNode::Plain(element) => {
                        put_length(buf, QUICKLIST_NODE_PLAIN);
                        put_string(buf, element);
                    }
                    QuicklistNode::Packed(elements) => {
                        put_length(buf, QUICKLIST_NODE_PACKED);
                        put_string(buf, &encode_listpack(elements.clone()));
                    }
                }
            }
        })
    }

    pub fn set_intset(self, key: impl AsRef<[u8]>, members: &[i64]) -> Self {
        let blob = encode_intset(members);
        self.record(TYPE_SET_INTSET, key.as_ref(), |buf| put_string(buf, &blob))
    }

    pub fn set_listpack<I>(self, key: impl AsRef<[u8]>, members: I) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<[u8]>,
    {
        let blob = encode_listpack(collect(members));
        self.record(TYPE_SET_LISTPACK, key.as_ref(), |buf| put_string(buf, &blob))
    }

    pub fn hash_ziplist<I, F, V>(self, key: impl AsRef<[u8]>, pairs: I) -> Self
    where
        I: IntoIterator<Item = (F, V)>,
        F: AsRef<[u8]>,
        V: AsRef<[u8]>,
    {
        let blob = encode_ziplist(flatten(pairs));
        self.record(TYPE_HASH_ZIPLIST, key.as_ref(), |buf| put_string(buf, &blob))
    }

    pub fn hash_listpack<I, F, V>(self, key: impl AsRef<[u8]>, pairs: I) -> Self
    where
        I: IntoIterator<Item = (F, V)>,
        F: AsRef<[u8]>,
        V: AsRef<[u8]>,
    {
        let blob = encode_listpack(flatten(pairs));
        self.record(TYPE_HASH_LISTPACK, key.as_ref(), |buf| put_string(buf, &blob))
    }

    pub fn zset_ziplist<I, M>(self, key: impl AsRef<[u8]>, members: I) -> Self
    where
        I: IntoIterator<Item = (M, f64)>,
        M: AsRef<[u8]>,
    {
        let blob = encode_ziplist(flatten_scores(members));
        self.record(TYPE_ZSET_ZIPLIST, key.as_ref(), |buf| put_string(buf, &blob))
    }

    pub fn zset_listpack<I, M>(self, key: impl AsRef<[u8]>, members: I) -> Self
    where
        I: IntoIterator<Item = (M, f64)>,
        M: AsRef<[u8]>,
    {
        let blob = encode_listpack(flatten_scores(members));
        self.record(TYPE_ZSET_LISTPACK, key.as_ref(), |buf| put_string(buf, &blob))
    }

    /// Module value with opcode framing.
    pub fn module2(self, key: impl AsRef<[u8]>, module_id: u64, fields: &[ModuleField]) -> Self {
        let fields = fields.to_vec();
        self.record(TYPE_MODULE_2, key.as_ref(), |buf| {
            put_length(buf, module_id);
            put_module_fields(buf, &fields);
        })
    }

    /// A type tag and key followed by caller-supplied payload bytes.
    pub fn record_raw(self, tag: u8, key: impl AsRef<[u8]>, payload: &[u8]) -> Self {
        self.record(tag, key.as_ref(), |buf| buf.extend_from_slice(payload))
    }

    // -------------------- Output --------------------

    pub fn finish(self) -> Vec<u8> {
        self.buf
    }

    pub fn write_to<P: AsRef<Path>>(self, path: P) -> io::Result<()> {
        std::fs::write(path, self.buf)
    }

    fn record(mut self, tag: u8, key: &[u8], payload: impl FnOnce(&mut Vec<u8>)) -> Self {
        self.buf.push(tag);
        put_string(&mut self.buf, key);
        payload(&mut self.buf);
        self
    }
}

// -------------------- Encoders --------------------

/// Writes a length field in its shortest form.
pub fn put_length(buf: &mut Vec<u8>, len: u64) {
    if len < 1 << 6 {
        buf.push(len as u8);
    } else if len < 1 << 14 {
        buf.push(0x40 | (len >> 8) as u8);
        buf.push((len & 0xff) as u8);
    } else if let Ok(len) = u32::try_from(len) {
        buf.push(LEN_32BIT);
        buf.extend_from_slice(&len.to_be_bytes());
    } else {
        buf.push(LEN_64BIT);
        buf.extend_from_slice(&len.to_be_bytes());
    }
}

/// Writes a raw length-prefixed string.
pub fn put_string(buf: &mut Vec<u8>, bytes: &[u8]) {
    put_length(buf, bytes.len() as u64);
    buf.extend_from_slice(bytes);
}

/// Writes an integer-encoded string using the narrowest width.
pub fn put_int_string(buf: &mut Vec<u8>, value: i32) {
    let special = |enc: u8| 0xC0 | enc;
    if let Ok(v) = i8::try_from(value) {
        buf.push(special(ENC_INT8));
        buf.push(v as u8);
    } else if let Ok(v) = i16::try_from(value) {
        buf.push(special(ENC_INT16));
        buf.extend_from_slice(&v.to_le_bytes());
    } else {
        buf.push(special(ENC_INT32));
        buf.extend_from_slice(&value.to_le_bytes());
    }
}

/// Writes an LZF-compressed string.
pub fn put_lzf_string(buf: &mut Vec<u8>, bytes: &[u8]) {
    let compressed = lzf::compress(bytes);
    buf.push(0xC0 | ENC_LZF);
    put_length(buf, compressed.len() as u64);
    put_length(buf, bytes.len() as u64);
    buf.extend_from_slice(&compressed);
}

fn put_text_double(buf: &mut Vec<u8>, score: f64) {
    if score.is_nan() {
        buf.push(253);
    } else if score == f64::INFINITY {
        buf.push(254);
    } else if score == f64::NEG_INFINITY {
        buf.push(255);
    } else {
        let text = score.to_string();
        buf.push(text.len() as u8);
        buf.extend_from_slice(text.as_bytes());
    }
}

fn put_module_fields(buf: &mut Vec<u8>, fields: &[ModuleField]) {
    for field in fields {
        match field {
            ModuleField::Sint(v) => {
                put_length(buf, MODULE_OPCODE_SINT);
                put_length(buf, *v);
            }
            ModuleField::Uint(v) => {
                put_length(buf, MODULE_OPCODE_UINT);
                put_length(buf, *v);
            }
            ModuleField::Float(v) => {
                put_length(buf, MODULE_OPCODE_FLOAT);
                buf.extend_from_slice(&v.to_le_bytes());
            }
            ModuleField::Double(v) => {
                put_length(buf, MODULE_OPCODE_DOUBLE);
                buf.extend_from_slice(&v.to_le_bytes());
            }
            ModuleField::Str(v) => {
                put_length(buf, MODULE_OPCODE_STRING);
                put_string(buf, v);
            }
        }
    }
    put_length(buf, MODULE_OPCODE_EOF);
}

fn put_string_seq(buf: &mut Vec<u8>, items: &[Vec<u8>]) {
    put_length(buf, items.len() as u64);
    for item in items {
        put_string(buf, item);
    }
}

/// Packs a module type name (nine characters of `A-Za-z0-9-_`) and an
/// encoding version into a module id.
pub fn module_id(name: &str, encver: u64) -> u64 {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";
    let mut id = 0u64;
    for (i, c) in name.bytes().take(9).enumerate() {
        let index = CHARSET.iter().position(|&x| x == c).unwrap_or(0) as u64;
        id |= index << (64 - 6 * (i + 1));
    }
    id | (encver & 0x3ff)
}

/// Builds a ziplist blob. Elements that are canonical decimal integers are
/// stored with an integer encoding.
pub fn encode_ziplist(elements: Vec<Vec<u8>>) -> Vec<u8> {
    let mut body = Vec::new();
    let mut prev_len = 0usize;
    let mut tail = 10usize;
    for element in &elements {
        let start = body.len();
        tail = 10 + start;
        if prev_len < 254 {
            body.push(prev_len as u8);
        } else {
            body.push(0xFE);
            body.extend_from_slice(&(prev_len as u32).to_le_bytes());
        }
        match canonical_int(element) {
            Some(v) if (0..=12).contains(&v) => body.push(0xF1 + v as u8),
            Some(v) if i8::try_from(v).is_ok() => {
                body.push(0xFE);
                body.push(v as i8 as u8);
            }
            Some(v) if i16::try_from(v).is_ok() => {
                body.push(0xC0);
                body.extend_from_slice(&(v as i16).to_le_bytes());
            }
            Some(v) if (-(1 << 23)..(1 << 23)).contains(&v) => {
                body.push(0xF0);
                let mut b = Vec::with_capacity(3);
                // Infallible on a Vec.
                let _ = b.write_i24::<LittleEndian>(v as i32);
                body.extend_from_slice(&b);
            }
            Some(v) if i32::try_from(v).is_ok() => {
                body.push(0xD0);
                body.extend_from_slice(&(v as i32).to_le_bytes());
            }
            Some(v) => {
                body.push(0xE0);
                body.extend_from_slice(&v.to_le_bytes());
            }
            None => {
                let len = element.len();
                if len < 1 << 6 {
                    body.push(len as u8);
                } else if len < 1 << 14 {
                    body.push(0x40 | (len >> 8) as u8);
                    body.push((len & 0xff) as u8);
                } else {
                    body.push(0x80);
                    let _ = body.write_u32::<BigEndian>(len as u32);
                }
                body.extend_from_slice(element);
            }
        }
        prev_len = body.len() - start;
    }

    let total = 10 + body.len() + 1;
    let count = u16::try_from(elements.len())
        .ok()
        .filter(|&c| c != u16::MAX)
        .unwrap_or(u16::MAX);
    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(&(total as u32).to_le_bytes());
    out.extend_from_slice(&(tail as u32).to_le_bytes());
    out.extend_from_slice(&count.to_le_bytes());
    out.extend_from_slice(&body);
    out.push(0xFF);
    out
}

/// Builds a listpack blob. Canonical decimal integers use integer encodings.
pub fn encode_listpack(elements: Vec<Vec<u8>>) -> Vec<u8> {
    let mut body = Vec::new();
    for element in &elements {
        let start = body.len();
        match canonical_int(element) {
            Some(v) if (0..=127).contains(&v) => body.push(v as u8),
            Some(v) if (-4096..4096).contains(&v) => {
                let raw = (if v < 0 { (1 << 13) + v } else { v }) as u16;
                body.push(0xC0 | (raw >> 8) as u8);
                body.push((raw & 0xff) as u8);
            }
            Some(v) if i16::try_from(v).is_ok() => {
                body.push(0xF1);
                body.extend_from_slice(&(v as i16).to_le_bytes());
            }
            Some(v) if (-(1 << 23)..(1 << 23)).contains(&v) => {
                body.push(0xF2);
                let _ = body.write_i24::<LittleEndian>(v as i32);
            }
            Some(v) if i32::try_from(v).is_ok() => {
                body.push(0xF3);
                body.extend_from_slice(&(v as i32).to_le_bytes());
            }
            Some(v) => {
                body.push(0xF4);
                body.extend_from_slice(&v.to_le_bytes());
            }
            None => {
                let len = element.len();
                if len < 1 << 6 {
                    body.push(0x80 | len as u8);
                } else if len < 1 << 12 {
                    body.push(0xE0 | (len >> 8) as u8);
                    body.push((len & 0xff) as u8);
                } else {
                    body.push(0xF0);
                    body.extend_from_slice(&(len as u32).to_le_bytes());
                }
                body.extend_from_slice(element);
            }
        }
        let entry_len = (body.len() - start) as u64;
        put_backlen(&mut body, entry_len);
    }

    let total = 6 + body.len() + 1;
    let count = u16::try_from(elements.len())
        .ok()
        .filter(|&c| c != u16::MAX)
        .unwrap_or(u16::MAX);
    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(&(total as u32).to_le_bytes());
    out.extend_from_slice(&count.to_le_bytes());
    out.extend_from_slice(&body);
    out.push(0xFF);
    out
}

fn put_backlen(buf: &mut Vec<u8>, len: u64) {
    match len {
        0..=127 => buf.push(len as u8),
        128..=16_382 => {
            buf.push((len >> 7) as u8);
            buf.push(((len & 127) | 128) as u8);
        }
        16_383..=2_097_150 => {
            buf.push((len >> 14) as u8);
            buf.push((((len >> 7) & 127) | 128) as u8);
            buf.push(((len & 127) | 128) as u8);
        }
        2_097_151..=268_435_454 => {
            buf.push((len >> 21) as u8);
            buf.push((((len >> 14) & 127) | 128) as u8);
            buf.push((((len >> 7) & 127) | 128) as u8);
            buf.push(((len & 127) | 128) as u8);
        }
        _ => {
            buf.push((len >> 28) as u8);
            buf.push((((len >> 21) & 127) | 128) as u8);
            buf.push((((len >> 14) & 127) | 128) as u8);
            buf.push((((len >> 7) & 127) | 128) as u8);
            buf.push(((len & 127) | 128) as u8);
        }
    }
}

/// Builds an intset blob using the narrowest width that fits every member.
pub fn encode_intset(members: &[i64]) -> Vec<u8> {
    let width: u32 = if members.iter().all(|&m| i16::try_from(m).is_ok()) {
        2
    } else if members.iter().all(|&m| i32::try_from(m).is_ok()) {
        4
    } else {
        8
    };
    let mut sorted = members.to_vec();
    sorted.sort_unstable();

    let mut out = Vec::with_capacity(8 + sorted.len() * width as usize);
    out.extend_from_slice(&width.to_le_bytes());
    out.extend_from_slice(&(sorted.len() as u32).to_le_bytes());
    for m in sorted {
        match width {
            2 => out.extend_from_slice(&(m as i16).to_le_bytes()),
            4 => out.extend_from_slice(&(m as i32).to_le_bytes()),
            _ => out.extend_from_slice(&m.to_le_bytes()),
        }
    }
    out
}

fn canonical_int(bytes: &[u8]) -> Option<i64> {
    let text = std::str::from_utf8(bytes).ok()?;
    let value = text.parse::<i64>().ok()?;
    (value.to_string() == text).then_some(value)
}

fn collect<I>(items: I) -> Vec<Vec<u8>>
where
    I: IntoIterator,
    I::Item: AsRef<[u8]>,
{
    items.into_iter().map(|i| i.as_ref().to_vec()).collect()
}

fn flatten<I, F, V>(pairs: I) -> Vec<Vec<u8>>
where
    I: IntoIterator<Item = (F, V)>,
    F: AsRef<[u8]>,
    V: AsRef<[u8]>,
{
    pairs
        .into_iter()
        .flat_map(|(f, v)| [f.as_ref().to_vec(), v.as_ref().to_vec()])
        .collect()
}

fn flatten_scores<I, M>(members: I) -> Vec<Vec<u8>>
where
    I: IntoIterator<Item = (M, f64)>,
    M: AsRef<[u8]>,
{
    members
        .into_iter()
        .flat_map(|(m, s)| [m.as_ref().to_vec(), s.to_string().into_bytes()])
        .collect()
}
