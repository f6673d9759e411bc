//! Listpack, the compact list encoding that replaced ziplist.
//!
//! ```text
//! [total_bytes: u32 LE][num_elements: u16 LE] entry ... [0xFF]
//!
//! entry = [encoding][content][backlen: 1..=5 bytes]
//! ```
//!
//! | encoding               | content                    |
//! |------------------------|----------------------------|
//! | `0xxxxxxx`             | 7-bit unsigned int         |
//! | `10xxxxxx`             | string, 6-bit length       |
//! | `110xxxxx yyyyyyyy`    | 13-bit signed int          |
//! | `1110xxxx yyyyyyyy`    | string, 12-bit length      |
//! | `11110000` + u32 LE    | string, 32-bit length      |
//! | `0xF1` / `0xF2`        | int16 / int24 (LE)         |
//! | `0xF3` / `0xF4`        | int32 / int64 (LE)         |
//!
//! `backlen` stores the size of encoding + content so the list can be
//! walked backwards; forward decoding only needs to skip it.

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Read;

use crate::error::{RdbError, Result};
use crate::primitive::{read_bytes, skip_bytes};
use crate::string::read_string;

pub(crate) const LP_EOF: u8 = 0xFF;
pub(crate) const LP_UNKNOWN_COUNT: u16 = 0xFFFF;

pub(crate) const LP_ENCODING_32BIT_STR: u8 = 0xF0;
pub(crate) const LP_ENCODING_16BIT_INT: u8 = 0xF1;
pub(crate) const LP_ENCODING_24BIT_INT: u8 = 0xF2;
pub(crate) const LP_ENCODING_32BIT_INT: u8 = 0xF3;
pub(crate) const LP_ENCODING_64BIT_INT: u8 = 0xF4;

/// Reads a listpack stored as a string and returns its elements.
pub fn read_listpack<R: Read + ?Sized>(rd: &mut R) -> Result<Vec<Vec<u8>>> {
    let blob = read_string(rd)?;
    decode_listpack(&blob)
}

/// Decodes the elements of a raw listpack blob.
pub fn decode_listpack(blob: &[u8]) -> Result<Vec<Vec<u8>>> {
    let mut rd = blob;
    let _total_bytes = rd.read_u32::<LittleEndian>()?;
    let declared = rd.read_u16::<LittleEndian>()?;

    let mut elements = Vec::new();
    loop {
        let first = rd.read_u8()?;
        if first == LP_EOF {
            break;
        }
        let (element, entry_len) = read_entry(&mut rd, first)?;
        skip_bytes(&mut rd, backlen_size(entry_len))?;
        elements.push(element);
    }

    if declared != LP_UNKNOWN_COUNT && elements.len() != usize::from(declared) {
        return Err(RdbError::Listpack(format!(
            "header declares {} elements, found {}",
            declared,
            elements.len()
        )));
    }
    Ok(elements)
}

/// Number of bytes used by the backlen of an entry of `entry_len` bytes.
pub(crate) fn backlen_size(entry_len: u64) -> u64 {
    match entry_len {
        0..=127 => 1,
        128..=16_382 => 2,
        16_383..=2_097_150 => 3,
        2_097_151..=268_435_454 => 4,
        _ => 5,
    }
}

/// Reads one entry; returns the element and its encoded size (without backlen).
fn read_entry(rd: &mut &[u8], first: u8) -> Result<(Vec<u8>, u64)> {
    if first & 0x80 == 0 {
        return Ok((i64::from(first & 0x7f).to_string().into_bytes(), 1));
    }
    if first & 0xC0 == 0x80 {
        let len = u64::from(first & 0x3f);
        return Ok((read_bytes(rd, len)?, 1 + len));
    }
    if first & 0xE0 == 0xC0 {
        let next = rd.read_u8()?;
        let raw = (i64::from(first & 0x1f) << 8) | i64::from(next);
        let value = if raw >= 1 << 12 { raw - (1 << 13) } else { raw };
        return Ok((value.to_string().into_bytes(), 2));
    }
    if first & 0xF0 == 0xE0 {
        let next = rd.read_u8()?;
        let len = (u64::from(first & 0x0f) << 8) | u64::from(next);
        return Ok((read_bytes(rd, len)?, 2 + len));
    }

    let (value, size): (i64, u64) = match first {
        LP_ENCODING_32BIT_STR => {
            let len = u64::from(rd.read_u32::<LittleEndian>()?);
            return Ok((read_bytes(rd, len)?, 5 + len));
        }
        LP_ENCODING_16BIT_INT => (rd.read_i16::<LittleEndian>()?.into(), 3),
        LP_ENCODING_24BIT_INT => (rd.read_i24::<LittleEndian>()?.into(), 4),
        LP_ENCODING_32BIT_INT => (rd.read_i32::<LittleEndian>()?.into(), 5),
        LP_ENCODING_64BIT_INT => (rd.read_i64::<LittleEndian>()?, 9),
        other => {
            return Err(RdbError::Listpack(format!(
                "unknown entry encoding {:#04x}",
                other
            )))
        }
    };
    Ok((value.to_string().into_bytes(), size))
}
