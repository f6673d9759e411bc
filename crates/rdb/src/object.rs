//! Typed value decoding.
//!
//! A value record's type tag selects one of several on-disk encodings; each
//! decodes into one of the six [`RedisObject`] variants, which then prices
//! itself with the [`memprofile`] model.

use rand::Rng;
use std::io::Read;

use crate::error::{RdbError, Result};
use crate::format::*;
use crate::intset::read_intset;
use crate::listpack::read_listpack;
use crate::module::skip_module_payload;
use crate::primitive::{read_length, to_usize};
use crate::string::{parse_score, read_binary_double, read_string, read_text_double};
use crate::ziplist::read_ziplist;

/// One member of a sorted set.
#[derive(Debug, Clone, PartialEq)]
pub struct ZsetMember {
    pub member: Vec<u8>,
    pub score: f64,
}

/// A decoded value. Lives only while its record is being priced.
#[derive(Debug, Clone, PartialEq)]
pub enum RedisObject {
    String(Vec<u8>),
    List(Vec<Vec<u8>>),
    /// Field/value pairs in file order.
    Hash(Vec<(Vec<u8>, Vec<u8>)>),
    Set(Vec<Vec<u8>>),
    SortedSet(Vec<ZsetMember>),
    /// A module value that was skipped; only its type id is kept.
    Module { module_id: u64 },
}

impl RedisObject {
    /// Decodes the value that follows a key of type `tag`.
    pub fn decode<R: Read + ?Sized>(rd: &mut R, tag: u8) -> Result<Self> {
        match tag {
            TYPE_STRING => Ok(RedisObject::String(read_string(rd)?)),

            TYPE_LIST => Ok(RedisObject::List(read_string_seq(rd)?)),
            TYPE_LIST_ZIPLIST => Ok(RedisObject::List(read_ziplist(rd)?)),
            TYPE_LIST_QUICKLIST => {
                let nodes = read_length(rd)?;
                let mut elements = Vec::new();
                for _ in 0..nodes {
                    elements.extend(read_ziplist(rd)?);
                }
                Ok(RedisObject::List(elements))
            }
            TYPE_LIST_QUICKLIST_2 => {
                let nodes = read_length(rd)?;
                let mut elements = Vec::new();
                for _ in 0..nodes {
                    match read_length(rd)? {
                        QUICKLIST_NODE_PLAIN => elements.push(read_string(rd)?),
                        QUICKLIST_NODE_PACKED => elements.extend(read_listpack(rd)?),
                        other => {
                            return Err(RdbError::Corrupt(format!(
                                "unknown quicklist container {}",
                                other
                            )))
                        }
                    }
                }
                Ok(RedisObject::List(elements))
            }

            TYPE_SET => Ok(RedisObject::Set(read_string_seq(rd)?)),
            TYPE_SET_INTSET => Ok(RedisObject::Set(read_intset(rd)?)),
            TYPE_SET_LISTPACK => Ok(RedisObject::Set(read_listpack(rd)?)),

            TYPE_HASH => {
                let count = read_length(rd)?;
                let mut pairs = Vec::with_capacity(to_usize(count)?.min(1 << 16));
                for _ in 0..count {
                    let field = read_string(rd)?;
                    let value = read_string(rd)?;
                    pairs.push((field, value));
                }
                Ok(RedisObject::Hash(pairs))
            }
            TYPE_HASH_ZIPLIST => Ok(RedisObject::Hash(into_pairs(read_ziplist(rd)?, "hash")?)),
            TYPE_HASH_LISTPACK => Ok(RedisObject::Hash(into_pairs(read_listpack(rd)?, "hash")?)),
            TYPE_HASH_ZIPMAP => Err(RdbError::Unsupported("hash zipmap")),
            TYPE_HASH_METADATA_PRE_GA
            | TYPE_HASH_LISTPACK_EX_PRE_GA
            | TYPE_HASH_METADATA
            | TYPE_HASH_LISTPACK_EX => Err(RdbError::Unsupported("hash with field expiry")),

            TYPE_ZSET | TYPE_ZSET_2 => {
                let count = read_length(rd)?;
                let mut members = Vec::with_capacity(to_usize(count)?.min(1 << 16));
                for _ in 0..count {
                    let member = read_string(rd)?;
                    let score = if tag == TYPE_ZSET {
                        read_text_double(rd)?
                    } else {
                        read_binary_double(rd)?
                    };
                    members.push(ZsetMember { member, score });
                }
                Ok(RedisObject::SortedSet(members))
            }
            TYPE_ZSET_ZIPLIST => Ok(RedisObject::SortedSet(into_members(read_ziplist(rd)?)?)),
            TYPE_ZSET_LISTPACK => Ok(RedisObject::SortedSet(into_members(read_listpack(rd)?)?)),

            TYPE_MODULE => Err(RdbError::Unsupported("module value without opcode framing")),
            TYPE_MODULE_2 => {
                let module_id = read_length(rd)?;
                skip_module_payload(rd, module_id)?;
                Ok(RedisObject::Module { module_id })
            }

            TYPE_STREAM_LISTPACKS | TYPE_STREAM_LISTPACKS_2 | TYPE_STREAM_LISTPACKS_3 => {
                Err(RdbError::Unsupported("stream"))
            }

            other => Err(RdbError::UnknownOpcode(other)),
        }
    }

    /// Short type name, as `TYPE` would report it.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            RedisObject::String(_) => "string",
            RedisObject::List(_) => "list",
            RedisObject::Hash(_) => "hash",
            RedisObject::Set(_) => "set",
            RedisObject::SortedSet(_) => "zset",
            RedisObject::Module { .. } => "module",
        }
    }

    /// Number of elements (1 for strings, 0 for modules).
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            RedisObject::String(_) => 1,
            RedisObject::List(v) | RedisObject::Set(v) => v.len(),
            RedisObject::Hash(v) => v.len(),
            RedisObject::SortedSet(v) => v.len(),
            RedisObject::Module { .. } => 0,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Estimated heap bytes for this value stored under `key`, including
    /// the key's own keyspace slot. Sorted sets draw skip-list levels from
    /// `rng`.
    pub fn mem_overhead<G: Rng + ?Sized>(&self, key: &[u8], rng: &mut G) -> u64 {
        let key_len = key.len() as u64;
        match self {
            RedisObject::String(value) => memprofile::string_overhead(key_len, value),
            RedisObject::List(elements) => {
                memprofile::list_overhead(key_len, elements.iter().map(|e| e.len() as u64))
            }
            RedisObject::Hash(pairs) => memprofile::hash_overhead(
                key_len,
                pairs.iter().map(|(f, v)| (f.len() as u64, v.len() as u64)),
            ),
            RedisObject::Set(members) => {
                memprofile::set_overhead(key_len, members.iter().map(|m| m.len() as u64))
            }
            RedisObject::SortedSet(members) => memprofile::zset_overhead_for(
                key_len,
                members.iter().map(|m| m.member.len() as u64),
                rng,
            ),
            RedisObject::Module { .. } => 0,
        }
    }
}

/// Length-prefixed sequence of strings (plain list and set encodings).
fn read_string_seq<R: Read + ?Sized>(rd: &mut R) -> Result<Vec<Vec<u8>>> {
    let count = read_length(rd)?;
    let mut elements = Vec::with_capacity(to_usize(count)?.min(1 << 16));
    for _ in 0..count {
        elements.push(read_string(rd)?);
    }
    Ok(elements)
}

fn into_pairs(flat: Vec<Vec<u8>>, what: &str) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
    if flat.len() % 2 != 0 {
        return Err(RdbError::Corrupt(format!(
            "{} container holds an odd number of elements ({})",
            what,
            flat.len()
        )));
    }
    let mut pairs = Vec::with_capacity(flat.len() / 2);
    let mut it = flat.into_iter();
    while let (Some(first), Some(second)) = (it.next(), it.next()) {
        pairs.push((first, second));
    }
    Ok(pairs)
}

fn into_members(flat: Vec<Vec<u8>>) -> Result<Vec<ZsetMember>> {
    into_pairs(flat, "zset")?
        .into_iter()
        .map(|(member, score)| {
            Ok(ZsetMember {
                score: parse_score(&score)?,
                member,
            })
        })
        .collect()
}
