//! Intset, the sorted integer array used for small all-integer sets.
//!
//! ```text
//! [encoding: u32 LE = 2 | 4 | 8][length: u32 LE][length × int of that width, LE]
//! ```

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Read;

use crate::error::{RdbError, Result};
use crate::string::read_string;

/// Reads an intset stored as a string and returns its members as decimal text.
pub fn read_intset<R: Read + ?Sized>(rd: &mut R) -> Result<Vec<Vec<u8>>> {
    let blob = read_string(rd)?;
    decode_intset(&blob)
}

/// Decodes the members of a raw intset blob.
pub fn decode_intset(blob: &[u8]) -> Result<Vec<Vec<u8>>> {
    let mut rd = blob;
    let width = rd.read_u32::<LittleEndian>()?;
    let count = rd.read_u32::<LittleEndian>()? as usize;

    if !matches!(width, 2 | 4 | 8) {
        return Err(RdbError::Intset(format!("invalid encoding width {}", width)));
    }
    let needed = count.saturating_mul(width as usize);
    if rd.len() < needed {
        return Err(RdbError::Intset(format!(
            "{} members of {} bytes need {} bytes, only {} present",
            count,
            width,
            needed,
            rd.len()
        )));
    }

    let mut members = Vec::with_capacity(count);
    for _ in 0..count {
        let value: i64 = match width {
            2 => rd.read_i16::<LittleEndian>()?.into(),
            4 => rd.read_i32::<LittleEndian>()?.into(),
            _ => rd.read_i64::<LittleEndian>()?,
        };
        members.push(value.to_string().into_bytes());
    }
    Ok(members)
}
