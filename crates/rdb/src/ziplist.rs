//! Ziplist, the legacy compact list encoding.
//!
//! ```text
//! [zlbytes: u32 LE][zltail: u32 LE][zllen: u16 LE] entry ... [0xFF]
//!
//! entry = [prevlen: 1 byte | 0xFE + u32 LE][encoding][content]
//! ```
//!
//! | encoding byte        | content                        |
//! |----------------------|--------------------------------|
//! | `00pppppp`           | string, 6-bit length           |
//! | `01pppppp qqqqqqqq`  | string, 14-bit length          |
//! | `10000000` + u32 BE  | string, 32-bit length          |
//! | `0xC0`               | int16                          |
//! | `0xD0`               | int32                          |
//! | `0xE0`               | int64                          |
//! | `0xF0`               | int24                          |
//! | `0xFE`               | int8                           |
//! | `0xF1`..=`0xFD`      | immediate 0..=12               |
//!
//! When `zllen` is `0xFFFF` the count did not fit and entries are read up
//! to the terminator.

use byteorder::{BigEndian, LittleEndian, ReadBytesExt};
use std::io::Read;

use crate::error::{RdbError, Result};
use crate::primitive::read_bytes;
use crate::string::read_string;

pub(crate) const ZIPLIST_END: u8 = 0xFF;
pub(crate) const ZIPLIST_BIG_PREVLEN: u8 = 0xFE;
pub(crate) const ZIPLIST_UNKNOWN_COUNT: u16 = 0xFFFF;

pub(crate) const ZIP_STR_06B: u8 = 0;
pub(crate) const ZIP_STR_14B: u8 = 1;
pub(crate) const ZIP_STR_32B: u8 = 2;
pub(crate) const ZIP_INT_16B: u8 = 0xC0;
pub(crate) const ZIP_INT_32B: u8 = 0xD0;
pub(crate) const ZIP_INT_64B: u8 = 0xE0;
pub(crate) const ZIP_INT_24B: u8 = 0xF0;
pub(crate) const ZIP_INT_8B: u8 = 0xFE;
pub(crate) const ZIP_INT_IMM_NIBBLE: u8 = 0x0F;

/// Reads a ziplist stored as a string and returns its elements.
pub fn read_ziplist<R: Read + ?Sized>(rd: &mut R) -> Result<Vec<Vec<u8>>> {
    let blob = read_string(rd)?;
    decode_ziplist(&blob)
}

/// Decodes the elements of a raw ziplist blob.
pub fn decode_ziplist(blob: &[u8]) -> Result<Vec<Vec<u8>>> {
    let mut rd = blob;
    let _zlbytes = rd.read_u32::<LittleEndian>()?;
    let _zltail = rd.read_u32::<LittleEndian>()?;
    let count = rd.read_u16::<LittleEndian>()?;

    let mut elements = Vec::new();
    if count == ZIPLIST_UNKNOWN_COUNT {
        loop {
            let first = rd.read_u8()?;
            if first == ZIPLIST_END {
                break;
            }
            elements.push(read_entry(&mut rd, first)?);
        }
    } else {
        elements.reserve(usize::from(count));
        for _ in 0..count {
            let first = rd.read_u8()?;
            elements.push(read_entry(&mut rd, first)?);
        }
        let last = rd.read_u8()?;
        if last != ZIPLIST_END {
            return Err(RdbError::Ziplist(format!(
                "expected terminator 0xff, found {:#04x}",
                last
            )));
        }
    }
    Ok(elements)
}

fn read_entry(rd: &mut &[u8], prevlen: u8) -> Result<Vec<u8>> {
    if prevlen == ZIPLIST_BIG_PREVLEN {
        let _prevlen = rd.read_u32::<LittleEndian>()?;
    }

    let encoding = rd.read_u8()?;
    match encoding >> 6 {
        ZIP_STR_06B => return read_bytes(rd, u64::from(encoding & 0x3f)),
        ZIP_STR_14B => {
            let next = rd.read_u8()?;
            return read_bytes(rd, (u64::from(encoding & 0x3f) << 8) | u64::from(next));
        }
        ZIP_STR_32B => {
            let len = rd.read_u32::<BigEndian>()?;
            return read_bytes(rd, u64::from(len));
        }
        _ => {}
    }

    let value: i64 = match encoding {
        ZIP_INT_8B => rd.read_i8()?.into(),
        ZIP_INT_16B => rd.read_i16::<LittleEndian>()?.into(),
        ZIP_INT_24B => rd.read_i24::<LittleEndian>()?.into(),
        ZIP_INT_32B => rd.read_i32::<LittleEndian>()?.into(),
        ZIP_INT_64B => rd.read_i64::<LittleEndian>()?,
        _ if encoding >> 4 == ZIP_INT_IMM_NIBBLE => {
            let v = i64::from(encoding & 0x0f) - 1;
            if !(0..=12).contains(&v) {
                return Err(RdbError::Ziplist(format!(
                    "immediate integer {:#04x} out of range",
                    encoding
                )));
            }
            v
        }
        other => {
            return Err(RdbError::Ziplist(format!(
                "unknown entry encoding {:#04x}",
                other
            )))
        }
    };
    Ok(value.to_string().into_bytes())
}
