//! Encodes a delta against a base (used by the GC's delta search, §4.G).
//! Not part of native Git's own source but a standard technique for this
//! family of formats: a rolling block index over the base plus greedy
//! longest-match extension, the same shape as `rsync`/`xdelta`'s block
//! matching. The only hard constraint is that [`super::apply::apply`] must
//! be able to invert whatever this produces; it intentionally does not aim
//! to reproduce Git's own match-finding byte-for-byte.

use crate::instruction::{write_header, write_instructions};
use crate::Instruction;
use std::collections::HashMap;

/// Block size for the base index; matches shorter than this are not worth
/// a copy instruction's overhead and are left as literal inserts.
const BLOCK: usize = 16;
/// A single copy instruction's length field never exceeds this (matches
/// the on-disk encoding's "length 0 means 0x10000" convention).
const MAX_COPY_LEN: usize = 0x10000;
/// A single insert instruction carries at most 127 literal bytes.
const MAX_INSERT_LEN: usize = 127;

/// Produces a delta that [`super::apply::apply`] can replay against `base`
/// to recover exactly `target`.
pub fn create_delta(base: &[u8], target: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    write_header(base.len() as u64, target.len() as u64, &mut out);
    write_instructions(&build_instructions(base, target), &mut out);
    out
}

fn build_instructions(base: &[u8], target: &[u8]) -> Vec<Instruction> {
    let index = index_blocks(base);
    let mut instructions = Vec::new();
    let mut pending_insert: Vec<u8> = Vec::new();
    let mut i = 0;

    while i < target.len() {
        let best_match = (i + BLOCK <= target.len())
            .then(|| index.get(&target[i..i + BLOCK]))
            .flatten()
            .and_then(|positions| longest_match(base, target, i, positions));

        match best_match {
            Some((pos, len)) => {
                flush_insert(&mut pending_insert, &mut instructions);
                push_copy(pos, len, &mut instructions);
                i += len;
            }
            None => {
                pending_insert.push(target[i]);
                i += 1;
                if pending_insert.len() == MAX_INSERT_LEN {
                    flush_insert(&mut pending_insert, &mut instructions);
                }
            }
        }
    }
    flush_insert(&mut pending_insert, &mut instructions);
    instructions
}

fn index_blocks(base: &[u8]) -> HashMap<&[u8], Vec<usize>> {
    let mut index: HashMap<&[u8], Vec<usize>> = HashMap::new();
    if base.len() >= BLOCK {
        for i in 0..=(base.len() - BLOCK) {
            index.entry(&base[i..i + BLOCK]).or_default().push(i);
        }
    }
    index
}

fn longest_match(base: &[u8], target: &[u8], target_pos: usize, candidates: &[usize]) -> Option<(usize, usize)> {
    let mut best: Option<(usize, usize)> = None;
    for &base_pos in candidates {
        let max_len = (base.len() - base_pos).min(target.len() - target_pos);
        let mut len = 0;
        while len < max_len && base[base_pos + len] == target[target_pos + len] {
            len += 1;
        }
        if best.map_or(true, |(_, best_len)| len > best_len) {
            best = Some((base_pos, len));
        }
    }
    best.filter(|&(_, len)| len >= BLOCK)
}

fn push_copy(mut base_pos: usize, mut remaining: usize, instructions: &mut Vec<Instruction>) {
    while remaining > 0 {
        let take = remaining.min(MAX_COPY_LEN);
        instructions.push(Instruction::Copy {
            offset: base_pos as u64,
            length: take as u64,
        });
        base_pos += take;
        remaining -= take;
    }
}

fn flush_insert(pending: &mut Vec<u8>, instructions: &mut Vec<Instruction>) {
    if !pending.is_empty() {
        instructions.push(Instruction::Insert(std::mem::take(pending)));
    }
}
