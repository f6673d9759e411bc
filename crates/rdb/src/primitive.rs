//! Length encoding and raw byte reads.
//!
//! The first byte of a length selects its width by its top two bits:
//!
//! ```text
//! 00pppppp                      6-bit length
//! 01pppppp qqqqqqqq             14-bit length
//! 10000000 [4 bytes BE]         32-bit length
//! 10000001 [8 bytes BE]         64-bit length
//! 11ssssss                      special string encoding, selector in s
//! ```
//!
//! Fixed-width numbers elsewhere in the format are little-endian and are
//! read directly with [`byteorder::ReadBytesExt`].

use byteorder::{BigEndian, ReadBytesExt};
use std::io::Read;

use crate::error::{RdbError, Result};
use crate::format::{
    LEN_14BIT, LEN_32BIT, LEN_32_OR_64BIT, LEN_64BIT, LEN_6BIT, MAX_STRING_BYTES,
};

/// A decoded length field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Length {
    /// An ordinary length or count.
    Plain(u64),
    /// A special string encoding; only the string decoder may consume it.
    Special(u8),
}

/// Reads one length field, reporting special encodings instead of failing.
pub fn read_encoded_length<R: Read + ?Sized>(rd: &mut R) -> Result<Length> {
    let first = rd.read_u8()?;
    let low = u64::from(first & 0x3f);
    match first >> 6 {
        LEN_6BIT => Ok(Length::Plain(low)),
        LEN_14BIT => {
            let next = rd.read_u8()?;
            Ok(Length::Plain((low << 8) | u64::from(next)))
        }
        LEN_32_OR_64BIT => match first {
            LEN_32BIT => Ok(Length::Plain(u64::from(rd.read_u32::<BigEndian>()?))),
            LEN_64BIT => Ok(Length::Plain(rd.read_u64::<BigEndian>()?)),
            other => Err(RdbError::InvalidLength(other)),
        },
        _ => Ok(Length::Special(first & 0x3f)),
    }
}

/// Reads a plain length. A special encoding here is a framing error.
pub fn read_length<R: Read + ?Sized>(rd: &mut R) -> Result<u64> {
    match read_encoded_length(rd)? {
        Length::Plain(len) => Ok(len),
        Length::Special(selector) => Err(RdbError::UnexpectedSpecial(selector)),
    }
}

/// Reads exactly `len` bytes.
///
/// Lengths above [`MAX_STRING_BYTES`] are rejected before allocating, and
/// the buffer grows with the data actually read so a corrupt length cannot
/// reserve memory the input does not back.
pub fn read_bytes<R: Read + ?Sized>(rd: &mut R, len: u64) -> Result<Vec<u8>> {
    if len > MAX_STRING_BYTES {
        return Err(RdbError::Corrupt(format!(
            "string length {} exceeds maximum {}",
            len, MAX_STRING_BYTES
        )));
    }
    let mut buf = Vec::with_capacity(len.min(64 * 1024) as usize);
    let read = (&mut *rd).take(len).read_to_end(&mut buf)?;
    if read as u64 != len {
        return Err(RdbError::Io(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            format!("expected {} bytes, got {}", len, read),
        )));
    }
    Ok(buf)
}

/// Discards exactly `len` bytes.
pub fn skip_bytes<R: Read + ?Sized>(rd: &mut R, len: u64) -> Result<()> {
    let skipped = std::io::copy(&mut (&mut *rd).take(len), &mut std::io::sink())?;
    if skipped != len {
        return Err(RdbError::Io(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            format!("expected to skip {} bytes, got {}", len, skipped),
        )));
    }
    Ok(())
}

/// Converts a decoded length into an in-memory count.
pub(crate) fn to_usize(len: u64) -> Result<usize> {
    usize::try_from(len).map_err(|_| RdbError::Corrupt(format!("length {} overflows usize", len)))
}
