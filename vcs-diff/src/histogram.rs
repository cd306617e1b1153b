//! Histogram diff: repeatedly anchors on the rarest line shared by both
//! sides (extended to its maximal common run), splits the problem around
//! that anchor, and recurses. A region with no shared line falls back to
//! [`crate::myers`]. This tends to produce more human-readable hunks than
//! plain Myers on files with repeated boilerplate (braces, blank lines).

use crate::Edit;
use std::collections::HashMap;
use std::hash::Hash;

pub fn diff<T: Eq + Hash>(a: &[T], b: &[T]) -> Vec<Edit> {
    let mut edits = Vec::new();
    recurse(a, 0, a.len(), b, 0, b.len(), &mut edits);
    edits
}

fn recurse<T: Eq + Hash>(
    a: &[T],
    mut a_lo: usize,
    mut a_hi: usize,
    b: &[T],
    mut b_lo: usize,
    mut b_hi: usize,
    edits: &mut Vec<Edit>,
) {
    while a_lo < a_hi && b_lo < b_hi && a[a_lo] == b[b_lo] {
        a_lo += 1;
        b_lo += 1;
    }
    while a_lo < a_hi && b_lo < b_hi && a[a_hi - 1] == b[b_hi - 1] {
        a_hi -= 1;
        b_hi -= 1;
    }
    if a_lo == a_hi && b_lo == b_hi {
        return;
    }
    if a_lo == a_hi || b_lo == b_hi {
        edits.push(Edit::new(
            a_lo as i64,
            (a_hi - a_lo) as i64,
            b_lo as i64,
            (b_hi - b_lo) as i64,
        ));
        return;
    }

    match lowest_occurrence_anchor(a, a_lo, a_hi, b, b_lo, b_hi) {
        Some((a_start, a_end, b_start, b_end)) => {
            recurse(a, a_lo, a_start, b, b_lo, b_start, edits);
            recurse(a, a_end, a_hi, b, b_end, b_hi, edits);
        }
        None => {
            let sub = crate::myers::diff(&a[a_lo..a_hi], &b[b_lo..b_hi]);
            for e in sub {
                edits.push(Edit::new(
                    a_lo as i64 + e.base_start as i64,
                    e.base_length as i64,
                    b_lo as i64 + e.new_start as i64,
                    e.new_length as i64,
                ));
            }
        }
    }
}

/// Finds the `b`-range line with the fewest matching occurrences in the
/// `a`-range (ties broken by the earliest such line in `b`), then extends
/// the match as far as possible in both directions.
fn lowest_occurrence_anchor<T: Eq + Hash>(
    a: &[T],
    a_lo: usize,
    a_hi: usize,
    b: &[T],
    b_lo: usize,
    b_hi: usize,
) -> Option<(usize, usize, usize, usize)> {
    let mut positions: HashMap<&T, Vec<usize>> = HashMap::new();
    for i in a_lo..a_hi {
        positions.entry(&a[i]).or_default().push(i);
    }

    let mut best: Option<(usize, usize, usize)> = None; // (occurrence count, a_idx, b_idx)
    for j in b_lo..b_hi {
        if let Some(occurrences) = positions.get(&b[j]) {
            let count = occurrences.len();
            if best.map_or(true, |(best_count, ..)| count < best_count) {
                best = Some((count, occurrences[0], j));
            }
        }
    }

    let (_, mut a_start, mut b_start) = best?;
    let mut a_end = a_start + 1;
    let mut b_end = b_start + 1;
    while a_start > a_lo && b_start > b_lo && a[a_start - 1] == b[b_start - 1] {
        a_start -= 1;
        b_start -= 1;
    }
    while a_end < a_hi && b_end < b_hi && a[a_end] == b[b_end] {
        a_end += 1;
        b_end += 1;
    }
    Some((a_start, a_end, b_start, b_end))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(a: &[&str], b: &[&str], edits: &[Edit]) {
        let mut out = Vec::new();
        let mut a_cursor = 0usize;
        for e in edits {
            let base_start = e.base_start as usize;
            out.extend_from_slice(&a[a_cursor..base_start]);
            a_cursor = base_start + e.base_length as usize;
            let new_start = e.new_start as usize;
            out.extend_from_slice(&b[new_start..new_start + e.new_length as usize]);
        }
        out.extend_from_slice(&a[a_cursor..]);
        assert_eq!(out, b);
    }

    #[test]
    fn identical_sequences_produce_no_edits() {
        let a = ["a", "b", "c"];
        assert!(diff(&a, &a).is_empty());
    }

    #[test]
    fn anchors_on_a_unique_line_and_splits_around_it() {
        let a = ["{", "p", "{", "ANCHOR", "}", "q", "}"];
        let b = ["{", "p2", "{", "ANCHOR", "}", "q2", "}"];
        let edits = diff(&a, &b);
        apply(&a, &b, &edits);
        // The anchor run ("{", "ANCHOR", "}") is shared, leaving two
        // separate single-line edits either side of it.
        assert_eq!(edits.len(), 2);
        assert_eq!((edits[0].base_start, edits[0].base_length), (1, 1));
        assert_eq!((edits[1].base_start, edits[1].base_length), (5, 1));
    }

    #[test]
    fn falls_back_to_myers_when_no_line_is_shared() {
        // No value in `a` appears anywhere in `b`, so the anchor search
        // comes up empty and the whole range is handed to Myers.
        let a = ["p", "q", "p", "q"];
        let b = ["r", "s", "r", "s"];
        let edits = diff(&a, &b);
        apply(&a, &b, &edits);
        assert_eq!(edits.len(), 1);
        assert_eq!(edits[0].base_length, 4);
        assert_eq!(edits[0].new_length, 4);
    }

    #[test]
    fn disjoint_sequences_replace_everything() {
        let a = ["a", "b"];
        let b = ["c", "d", "e"];
        let edits = diff(&a, &b);
        apply(&a, &b, &edits);
    }
}
