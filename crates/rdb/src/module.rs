//! Skipping module-serialized payloads.
//!
//! Module values (and module aux records) written with opcode framing can be
//! stepped over without loading the module: each field is prefixed with an
//! opcode saying how to read it, and the payload ends with an EOF opcode.

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Read;

use crate::error::{RdbError, Result};
use crate::format::{
    MODULE_OPCODE_DOUBLE, MODULE_OPCODE_EOF, MODULE_OPCODE_FLOAT, MODULE_OPCODE_SINT,
    MODULE_OPCODE_STRING, MODULE_OPCODE_UINT,
};
use crate::primitive::read_length;
use crate::string::read_string;

const MODULE_CHARSET: &[u8; 64] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";

/// Decodes the 9-character module type name packed into a module id.
///
/// The id holds nine 6-bit characters followed by a 10-bit encoding version.
#[must_use]
pub fn module_type_name(module_id: u64) -> String {
    (0..9)
        .map(|i| {
            let shift = 64 - 6 * (i + 1);
            char::from(MODULE_CHARSET[((module_id >> shift) & 0x3f) as usize])
        })
        .collect()
}

/// Reads the opcode-framed payload of one module value up to its EOF opcode.
pub fn skip_module_payload<R: Read + ?Sized>(rd: &mut R, module_id: u64) -> Result<()> {
    loop {
        match read_length(rd)? {
            MODULE_OPCODE_EOF => return Ok(()),
            MODULE_OPCODE_SINT | MODULE_OPCODE_UINT => {
                read_length(rd)?;
            }
            MODULE_OPCODE_FLOAT => {
                rd.read_f32::<LittleEndian>()?;
            }
            MODULE_OPCODE_DOUBLE => {
                rd.read_f64::<LittleEndian>()?;
            }
            MODULE_OPCODE_STRING => {
                read_string(rd)?;
            }
            other => {
                return Err(RdbError::Corrupt(format!(
                    "unknown module opcode {} in module {}",
                    other,
                    module_type_name(module_id)
                )))
            }
        }
    }
}

/// Skips a module aux record: module id, `when` opcode and value, payload.
///
/// Returns the module id.
pub fn skip_module_aux<R: Read + ?Sized>(rd: &mut R) -> Result<u64> {
    let module_id = read_length(rd)?;
    let when_opcode = read_length(rd)?;
    if when_opcode != MODULE_OPCODE_UINT {
        return Err(RdbError::Corrupt(format!(
            "module aux for {} has when-opcode {}, expected {}",
            module_type_name(module_id),
            when_opcode,
            MODULE_OPCODE_UINT
        )));
    }
    let _when = read_length(rd)?;
    skip_module_payload(rd, module_id)?;
    Ok(module_id)
}
