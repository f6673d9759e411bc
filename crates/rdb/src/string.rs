//! String and score decoding.

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Read;

use crate::error::{RdbError, Result};
use crate::format::{ENC_INT16, ENC_INT32, ENC_INT8, ENC_LZF};
use crate::lzf;
use crate::primitive::{read_bytes, read_encoded_length, read_length, to_usize, Length};

/// Reads one string in any of the format's string encodings.
///
/// Integer encodings come back as their decimal text, so `"42"` decodes the
/// same whether it was stored inline or as raw bytes.
pub fn read_string<R: Read + ?Sized>(rd: &mut R) -> Result<Vec<u8>> {
    match read_encoded_length(rd)? {
        Length::Plain(len) => read_bytes(rd, len),
        Length::Special(ENC_INT8) => Ok(rd.read_i8()?.to_string().into_bytes()),
        Length::Special(ENC_INT16) => Ok(rd.read_i16::<LittleEndian>()?.to_string().into_bytes()),
        Length::Special(ENC_INT32) => Ok(rd.read_i32::<LittleEndian>()?.to_string().into_bytes()),
        Length::Special(ENC_LZF) => {
            let compressed_len = read_length(rd)?;
            let original_len = read_length(rd)?;
            let compressed = read_bytes(rd, compressed_len)?;
            lzf::decompress(&compressed, to_usize(original_len)?)
        }
        Length::Special(other) => Err(RdbError::UnknownStringEncoding(other)),
    }
}

/// Score length bytes with a fixed meaning in the text encoding.
const SCORE_NAN: u8 = 253;
const SCORE_POS_INF: u8 = 254;
const SCORE_NEG_INF: u8 = 255;

/// Reads a score stored as a one-byte length followed by ASCII text.
pub fn read_text_double<R: Read + ?Sized>(rd: &mut R) -> Result<f64> {
    match rd.read_u8()? {
        SCORE_NAN => Ok(f64::NAN),
        SCORE_POS_INF => Ok(f64::INFINITY),
        SCORE_NEG_INF => Ok(f64::NEG_INFINITY),
        len => {
            let text = read_bytes(rd, u64::from(len))?;
            parse_score(&text)
        }
    }
}

/// Reads a score stored as a little-endian IEEE 754 double.
pub fn read_binary_double<R: Read + ?Sized>(rd: &mut R) -> Result<f64> {
    Ok(rd.read_f64::<LittleEndian>()?)
}

/// Parses a score that was stored as text inside a compact container.
pub fn parse_score(text: &[u8]) -> Result<f64> {
    std::str::from_utf8(text)
        .ok()
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| {
            RdbError::Corrupt(format!(
                "invalid score {:?}",
                String::from_utf8_lossy(text)
            ))
        })
}
