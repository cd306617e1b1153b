//! Content similarity for rename following. Content is cut into fixed-length
//! overlapping byte shingles; similarity is the Jaccard-style overlap of the
//! two shingle sets. This is the same shape of heuristic diffcore-rename
//! uses (fixed-size chunks hashed into a table), simplified to hash sets
//! since blame only needs a single best match, not a full cost matrix.

use std::collections::HashSet;
use std::hash::{Hash, Hasher};

const SHINGLE_LEN: usize = 8;

/// Git's own binary-file heuristic: a NUL byte anywhere in the first chunk
/// of content means "don't diff this as text".
pub fn is_binary(data: &[u8]) -> bool {
    data.iter().take(8000).any(|&b| b == 0)
}

fn hash_bytes(data: &[u8]) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    data.hash(&mut hasher);
    hasher.finish()
}

fn shingles(data: &[u8]) -> HashSet<u64> {
    let mut set = HashSet::new();
    if data.len() < SHINGLE_LEN {
        if !data.is_empty() {
            set.insert(hash_bytes(data));
        }
        return set;
    }
    for window in data.windows(SHINGLE_LEN) {
        set.insert(hash_bytes(window));
    }
    set
}

/// Similarity of `a` to `b` on a 0..=100 scale: `2*|A∩B| / (|A|+|B|)` (the
/// Dice coefficient of the two shingle sets). Two empty inputs are trivially
/// identical.
pub fn similarity_score(a: &[u8], b: &[u8]) -> u8 {
    let sa = shingles(a);
    let sb = shingles(b);
    if sa.is_empty() && sb.is_empty() {
        return 100;
    }
    let shared = sa.intersection(&sb).count();
    let denom = (sa.len() + sb.len()).max(1);
    ((2 * shared * 100) / denom) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_content_is_fully_similar() {
        assert_eq!(similarity_score(b"hello world, this is a file", b"hello world, this is a file"), 100);
    }

    #[test]
    fn unrelated_content_is_dissimilar() {
        let a = b"the quick brown fox jumps over the lazy dog repeatedly";
        let b = b"completely different words occupy this other buffer entirely";
        assert!(similarity_score(a, b) < 20);
    }

    #[test]
    fn small_edit_keeps_most_similarity() {
        let a = b"line one\nline two\nline three\nline four\n";
        let b = b"line one\nline TWO\nline three\nline four\n";
        assert!(similarity_score(a, b) > 60);
    }

    #[test]
    fn binary_detection_looks_for_a_nul_byte() {
        assert!(!is_binary(b"plain text content"));
        assert!(is_binary(b"plain\0text"));
    }
}
