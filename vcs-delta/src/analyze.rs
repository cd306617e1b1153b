//! Builds a random-access map over a delta's result offsets (§4.E
//! `analyze`/`find_instructions_for_range`), without materializing the
//! result. Instructions execute in stream order and each writes a
//! contiguous run of result bytes, so the map is simply the running
//! result-offset cursor alongside each instruction.

use crate::instruction::{parse_header, parse_instructions, Instruction};
use crate::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeEntry {
    pub result_start: u64,
    pub result_end: u64,
    pub instruction: Instruction,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Analysis {
    pub base_size: u64,
    pub result_size: u64,
    pub ranges: Vec<RangeEntry>,
}

pub fn analyze(delta: &[u8]) -> Result<Analysis, Error> {
    let header = parse_header(delta)?;
    let instructions = parse_instructions(&delta[header.instructions_start..])?;
    let mut ranges = Vec::with_capacity(instructions.len());
    let mut cursor = 0u64;
    for instruction in instructions {
        let len = match &instruction {
            Instruction::Copy { length, .. } => *length,
            Instruction::Insert(bytes) => bytes.len() as u64,
        };
        ranges.push(RangeEntry {
            result_start: cursor,
            result_end: cursor + len,
            instruction,
        });
        cursor += len;
    }
    if cursor != header.result_size {
        return Err(Error::ResultSizeMismatch {
            expected: header.result_size,
            actual: cursor,
        });
    }
    Ok(Analysis {
        base_size: header.base_size,
        result_size: header.result_size,
        ranges,
    })
}

/// Returns only the instructions whose result range overlaps
/// `[offset, offset + length)`, in result order. Ranges are sorted by
/// construction, so this is a binary-search bracket rather than a scan.
pub fn find_instructions_for_range(analysis: &Analysis, offset: u64, length: u64) -> &[RangeEntry] {
    if length == 0 {
        return &[];
    }
    let want_end = offset.saturating_add(length);
    let start_idx = analysis.ranges.partition_point(|r| r.result_end <= offset);
    let end_idx = analysis.ranges.partition_point(|r| r.result_start < want_end);
    if start_idx >= end_idx {
        &[]
    } else {
        &analysis.ranges[start_idx..end_idx]
    }
}
