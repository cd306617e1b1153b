//! Random-access reads across a delta chain (§4.E `random_read`), without
//! reconstructing every intermediate object in full: to satisfy a copy
//! instruction we recurse into the base with the copy's own range rather
//! than materializing the whole base first.

use crate::analyze::{analyze, find_instructions_for_range};
use crate::instruction::Instruction;
use crate::{Error, MAX_CHAIN_DEPTH};

/// One link of a delta chain, ordered base-first when used as a slice:
/// `base` is the chain root, `links[0]` is applied to `base`, `links[1]` is
/// applied to `links[0]`'s result, and so on — `links.last()` is the delta
/// whose result is the object being read.
pub enum Link<'a> {
    Delta(&'a [u8]),
}

/// Reads `length` bytes starting at `offset` from the object obtained by
/// applying `deltas` (base-first) on top of `base`. Bytes past the end of
/// the fully reconstructed object are simply omitted (a short read); a
/// `length` of zero always returns an empty vector.
pub fn random_read(deltas: &[Link<'_>], base: &[u8], offset: u64, length: u64) -> Result<Vec<u8>, Error> {
    if deltas.len() as u32 > MAX_CHAIN_DEPTH {
        return Err(Error::ChainTooDeep { max: MAX_CHAIN_DEPTH });
    }
    read_at(deltas, base, offset, length, 0)
}

fn read_at(deltas: &[Link<'_>], base: &[u8], offset: u64, length: u64, depth: u32) -> Result<Vec<u8>, Error> {
    if length == 0 {
        return Ok(Vec::new());
    }
    match deltas.split_last() {
        None => {
            let start = (offset as usize).min(base.len());
            let end = ((offset + length) as usize).min(base.len());
            Ok(base[start..end].to_vec())
        }
        Some((Link::Delta(delta), parent_chain)) => {
            if depth >= MAX_CHAIN_DEPTH {
                return Err(Error::ChainTooDeep { max: MAX_CHAIN_DEPTH });
            }
            let analysis = analyze(delta)?;
            let clamped_length = length.min(analysis.result_size.saturating_sub(offset));
            if clamped_length == 0 {
                return Ok(Vec::new());
            }
            let hits = find_instructions_for_range(&analysis, offset, clamped_length);
            let want_end = offset + clamped_length;
            let mut out = Vec::with_capacity(clamped_length as usize);
            for hit in hits {
                let clip_start = offset.max(hit.result_start);
                let clip_end = want_end.min(hit.result_end);
                let within_start = clip_start - hit.result_start;
                let within_len = clip_end - clip_start;
                match &hit.instruction {
                    Instruction::Insert(bytes) => {
                        let s = within_start as usize;
                        let e = (within_start + within_len) as usize;
                        out.extend_from_slice(&bytes[s..e]);
                    }
                    Instruction::Copy { offset: copy_offset, .. } => {
                        let parent_offset = copy_offset + within_start;
                        let bytes = read_at(parent_chain, base, parent_offset, within_len, depth + 1)?;
                        out.extend_from_slice(&bytes);
                    }
                }
            }
            Ok(out)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::{write_header, write_instructions};

    fn build_delta(base_size: u64, result_size: u64, instructions: &[Instruction]) -> Vec<u8> {
        let mut delta = Vec::new();
        write_header(base_size, result_size, &mut delta);
        write_instructions(instructions, &mut delta);
        delta
    }

    #[test]
    fn random_read_single_delta_matches_full_reconstruction() {
        let base = vec![0xF3u8; 512];
        let delta = build_delta(
            512,
            512,
            &[
                Instruction::Insert(vec![0x02]),
                Instruction::Copy { offset: 1, length: 511 },
            ],
        );
        let links = [Link::Delta(&delta)];

        let head = random_read(&links, &base, 0, 10).unwrap();
        assert_eq!(head, {
            let mut v = vec![0x02];
            v.extend(std::iter::repeat(0xF3).take(9));
            v
        });

        let tail = random_read(&links, &base, 100, 50).unwrap();
        assert_eq!(tail, vec![0xF3u8; 50]);
    }

    #[test]
    fn random_read_reads_past_end_are_short() {
        let base = vec![1u8; 16];
        let delta = build_delta(16, 16, &[Instruction::Copy { offset: 0, length: 16 }]);
        let links = [Link::Delta(&delta)];
        let bytes = random_read(&links, &base, 10, 100).unwrap();
        assert_eq!(bytes.len(), 6);
    }

    #[test]
    fn random_read_recurses_through_a_chain() {
        // base -> d1 (doubles) -> d2 (prefixes one byte)
        let base = vec![9u8; 8];
        let d1 = build_delta(8, 8, &[Instruction::Copy { offset: 0, length: 8 }]);
        let d2 = build_delta(
            8,
            9,
            &[
                Instruction::Insert(vec![0xAA]),
                Instruction::Copy { offset: 0, length: 8 },
            ],
        );
        let links = [Link::Delta(&d1), Link::Delta(&d2)];
        let bytes = random_read(&links, &base, 0, 9).unwrap();
        assert_eq!(bytes, {
            let mut v = vec![0xAA];
            v.extend(std::iter::repeat(9u8).take(8));
            v
        });
    }

    #[test]
    fn zero_length_read_is_empty() {
        let base = vec![1u8; 4];
        assert_eq!(random_read(&[], &base, 0, 0).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn chain_depth_exactly_50_resolves_but_51_is_corrupt() {
        let base = vec![5u8; 4];
        let hop = build_delta(4, 4, &[Instruction::Copy { offset: 0, length: 4 }]);
        let links_50: Vec<Link<'_>> = std::iter::repeat_with(|| Link::Delta(&hop)).take(50).collect();
        assert_eq!(random_read(&links_50, &base, 0, 4).unwrap(), base);

        let links_51: Vec<Link<'_>> = std::iter::repeat_with(|| Link::Delta(&hop)).take(51).collect();
        assert!(matches!(
            random_read(&links_51, &base, 0, 4),
            Err(Error::ChainTooDeep { max: MAX_CHAIN_DEPTH })
        ));
    }
}
