//! Full reconstruction of a delta's result (§4.E `apply`).

use crate::instruction::{parse_header, parse_instructions, Instruction};
use crate::Error;

/// Reconstructs the bytes a delta encodes against `base`, verifying the
/// declared base and result sizes.
pub fn apply(delta: &[u8], base: &[u8]) -> Result<Vec<u8>, Error> {
    let header = parse_header(delta)?;
    if header.base_size != base.len() as u64 {
        return Err(Error::BaseSizeMismatch {
            expected: header.base_size,
            actual: base.len() as u64,
        });
    }
    let instructions = parse_instructions(&delta[header.instructions_start..])?;
    let mut out = Vec::with_capacity(header.result_size as usize);
    for instruction in &instructions {
        match instruction {
            Instruction::Copy { offset, length } => {
                let start = *offset as usize;
                let end = start
                    .checked_add(*length as usize)
                    .ok_or(Error::CopyOutOfBounds)?;
                if end > base.len() {
                    return Err(Error::CopyOutOfBounds);
                }
                out.extend_from_slice(&base[start..end]);
            }
            Instruction::Insert(bytes) => out.extend_from_slice(bytes),
        }
    }
    if out.len() as u64 != header.result_size {
        return Err(Error::ResultSizeMismatch {
            expected: header.result_size,
            actual: out.len() as u64,
        });
    }
    Ok(out)
}
