//! The classic Myers O(ND) shortest-edit-script diff: a greedy forward
//! search over the edit graph, snapshotted at every depth so a backward
//! pass can recover one particular shortest path.

use crate::Edit;

fn offset(k: i64, max: i64) -> usize {
    (k + max) as usize
}

/// Returns the `v` array (furthest-reaching x for each diagonal `k`) at
/// every depth up to and including the depth where `a` and `b` converge.
fn shortest_edit<T: PartialEq>(a: &[T], b: &[T]) -> Vec<Vec<i64>> {
    let n = a.len() as i64;
    let m = b.len() as i64;
    let max = (n + m).max(1);
    let mut v = vec![0i64; (2 * max + 1) as usize];
    v[offset(1, max)] = 0;
    let mut trace = Vec::new();

    for d in 0..=max {
        trace.push(v.clone());
        let mut k = -d;
        while k <= d {
            let mut x = if k == -d || (k != d && v[offset(k - 1, max)] < v[offset(k + 1, max)]) {
                v[offset(k + 1, max)]
            } else {
                v[offset(k - 1, max)] + 1
            };
            let mut y = x - k;
            while x < n && y < m && a[x as usize] == b[y as usize] {
                x += 1;
                y += 1;
            }
            v[offset(k, max)] = x;
            if x >= n && y >= m {
                return trace;
            }
            k += 2;
        }
    }
    trace
}

/// Walks the trace backward from `(a.len(), b.len())` to `(0, 0)`,
/// yielding `(prev_x, prev_y, x, y)` moves in forward order. A move where
/// both coordinates advance by one is a diagonal (the lines matched); any
/// other move is a single deletion from `a` or insertion from `b`.
fn backtrack<T: PartialEq>(a: &[T], b: &[T], trace: &[Vec<i64>]) -> Vec<(i64, i64, i64, i64)> {
    let max = ((a.len() + b.len()).max(1)) as i64;
    let mut x = a.len() as i64;
    let mut y = b.len() as i64;
    let mut moves = Vec::new();

    for d in (0..trace.len()).rev() {
        let v = &trace[d];
        let d = d as i64;
        let k = x - y;
        let prev_k = if k == -d || (k != d && v[offset(k - 1, max)] < v[offset(k + 1, max)]) {
            k + 1
        } else {
            k - 1
        };
        let prev_x = v[offset(prev_k, max)];
        let prev_y = prev_x - prev_k;

        while x > prev_x && y > prev_y {
            moves.push((x - 1, y - 1, x, y));
            x -= 1;
            y -= 1;
        }
        if d > 0 {
            moves.push((prev_x, prev_y, x, y));
        }
        x = prev_x;
        y = prev_y;
    }
    moves.reverse();
    moves
}

fn moves_to_edits(moves: &[(i64, i64, i64, i64)]) -> Vec<Edit> {
    let mut edits = Vec::new();
    let mut active = false;
    let (mut base_lo, mut base_hi, mut new_lo, mut new_hi) = (0i64, 0i64, 0i64, 0i64);

    for &(px, py, cx, cy) in moves {
        let is_delete = cx - px == 1 && cy == py;
        let is_insert = cx == px && cy - py == 1;
        if !is_delete && !is_insert {
            if active {
                edits.push(Edit::new(base_lo, base_hi - base_lo, new_lo, new_hi - new_lo));
                active = false;
            }
            continue;
        }
        if !active {
            active = true;
            base_lo = px;
            base_hi = px;
            new_lo = py;
            new_hi = py;
        }
        if is_delete {
            base_hi = cx;
        } else {
            new_hi = cy;
        }
    }
    if active {
        edits.push(Edit::new(base_lo, base_hi - base_lo, new_lo, new_hi - new_lo));
    }
    edits
}

/// Diffs `a` against `b`, returning the changed regions only — runs of
/// lines present unchanged on both sides are implicit in the gaps between
/// edits.
pub fn diff<T: PartialEq>(a: &[T], b: &[T]) -> Vec<Edit> {
    let trace = shortest_edit(a, b);
    let moves = backtrack(a, b, &trace);
    moves_to_edits(&moves)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(a: &[&str], b: &[&str], edits: &[Edit]) {
        // Reconstructing `b` from `a` plus the edit list is the property
        // that matters: every gap between edits is an unchanged run.
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
        let a = ["x", "y", "z"];
        let edits = diff(&a, &a);
        assert!(edits.is_empty());
    }

    #[test]
    fn pure_insert_pure_delete_and_replace() {
        let a = ["a", "b", "c"];
        let b = ["a", "x", "b", "c"];
        let edits = diff(&a, &b);
        apply(&a, &b, &edits);

        let a = ["a", "b", "c"];
        let b = ["a", "c"];
        let edits = diff(&a, &b);
        apply(&a, &b, &edits);

        let a = ["a", "b", "c"];
        let b = ["a", "z", "c"];
        let edits = diff(&a, &b);
        apply(&a, &b, &edits);
    }

    #[test]
    fn disjoint_sequences_replace_everything() {
        let a = ["a", "b"];
        let b = ["c", "d", "e"];
        let edits = diff(&a, &b);
        apply(&a, &b, &edits);
        assert_eq!(edits.len(), 1);
        assert_eq!(edits[0].base_length, 2);
        assert_eq!(edits[0].new_length, 3);
    }
}
