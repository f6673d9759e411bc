//! LZF, the compression scheme used for long strings.
//!
//! A compressed stream is a sequence of chunks, each led by a control byte:
//!
//! ```text
//! 000LLLLL [L+1 literal bytes]                 literal run
//! LLLooooo oooooooo                            back reference, L in 1..=6
//! 111ooooo LLLLLLLL oooooooo                   back reference, extended length
//! ```
//!
//! A back reference copies `len + 2` bytes starting `offset + 1` bytes
//! behind the current output position. The copy runs byte by byte, so a
//! reference may overlap the bytes it produces and replicate a run.

use std::collections::HashMap;

use crate::error::{RdbError, Result};
use crate::format::MAX_STRING_BYTES;

/// Longest literal run a single control byte can carry.
const MAX_LITERAL: usize = 1 << 5;
/// Furthest a back reference may reach.
const MAX_OFFSET: usize = 1 << 13;
/// Longest back reference: 7 + 255 extra, plus the implicit 2.
const MAX_REF: usize = (1 << 8) + (1 << 3);
const MIN_REF: usize = 3;

fn corrupt(msg: impl Into<String>) -> RdbError {
    RdbError::Decompress(msg.into())
}

/// Expands `input` into exactly `out_len` bytes.
///
/// Fails instead of truncating or padding when the stream ends early,
/// overruns `out_len`, or references bytes before the start of the output.
pub fn decompress(input: &[u8], out_len: usize) -> Result<Vec<u8>> {
    if out_len as u64 > MAX_STRING_BYTES {
        return Err(corrupt(format!("declared length {} exceeds maximum", out_len)));
    }
    let mut out: Vec<u8> = Vec::with_capacity(out_len.min(64 * 1024));
    let mut i = 0;

    while i < input.len() {
        let ctrl = usize::from(input[i]);
        i += 1;

        if ctrl < MAX_LITERAL {
            let run = ctrl + 1;
            let literal = input
                .get(i..i + run)
                .ok_or_else(|| corrupt("literal run past end of input"))?;
            if out.len() + run > out_len {
                return Err(corrupt(format!("output exceeds declared length {}", out_len)));
            }
            out.extend_from_slice(literal);
            i += run;
            continue;
        }

        let mut len = ctrl >> 5;
        if len == 7 {
            len += usize::from(*input.get(i).ok_or_else(|| corrupt("truncated reference length"))?);
            i += 1;
        }
        let low = usize::from(*input.get(i).ok_or_else(|| corrupt("truncated reference offset"))?);
        i += 1;

        let distance = ((ctrl & 0x1f) << 8) + low + 1;
        let start = out
            .len()
            .checked_sub(distance)
            .ok_or_else(|| corrupt("back reference before start of output"))?;
        let copy = len + 2;
        if out.len() + copy > out_len {
            return Err(corrupt(format!("output exceeds declared length {}", out_len)));
        }
        for k in 0..copy {
            let b = out[start + k];
            out.push(b);
        }
    }

    if out.len() != out_len {
        return Err(corrupt(format!(
            "expected {} bytes, produced {}",
            out_len,
            out.len()
        )));
    }
    Ok(out)
}

/// Compresses `input` into an LZF stream that [`decompress`] accepts.
///
/// Greedy single-pass matcher keyed on three-byte prefixes. Output may be
/// larger than the input for incompressible data.
pub fn compress(input: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(input.len() + input.len() / MAX_LITERAL + 1);
    let mut last_seen: HashMap<[u8; 3], usize> = HashMap::new();
    let mut literal_start = 0;
    let mut i = 0;

    while i < input.len() {
        let mut best = 0;
        let mut distance = 0;
        if i + MIN_REF <= input.len() {
            let key = [input[i], input[i + 1], input[i + 2]];
            if let Some(&candidate) = last_seen.get(&key) {
                let d = i - candidate;
                if d <= MAX_OFFSET {
                    let limit = (input.len() - i).min(MAX_REF);
                    let mut n = 0;
                    while n < limit && input[candidate + n] == input[i + n] {
                        n += 1;
                    }
                    if n >= MIN_REF {
                        best = n;
                        distance = d;
                    }
                }
            }
            last_seen.insert(key, i);
        }

        if best == 0 {
            i += 1;
            continue;
        }

        push_literals(&mut out, &input[literal_start..i]);
        let len = best - 2;
        let offset = distance - 1;
        if len < 7 {
            out.push(((len << 5) | (offset >> 8)) as u8);
        } else {
            out.push(((7 << 5) | (offset >> 8)) as u8);
            out.push((len - 7) as u8);
        }
        out.push((offset & 0xff) as u8);

        for j in i + 1..i + best {
            if j + MIN_REF <= input.len() {
                last_seen.insert([input[j], input[j + 1], input[j + 2]], j);
            }
        }
        i += best;
        literal_start = i;
    }

    push_literals(&mut out, &input[literal_start..]);
    out
}

fn push_literals(out: &mut Vec<u8>, literals: &[u8]) {
    for chunk in literals.chunks(MAX_LITERAL) {
        out.push((chunk.len() - 1) as u8);
        out.extend_from_slice(chunk);
    }
}
