//! A [`Candidate`] is "these lines of the result file are still unexplained,
//! and as of this commit they read like *this* slice of this path's blob".
//! The engine pops candidates in commit-timestamp order and either blames
//! them outright or splits them against a parent diff, forwarding the
//! unchanged part and blaming the changed part.

use bstr::BString;
use vcs_hash::ObjectId;

/// A contiguous run of result lines, currently sitting at `source_start` in
/// whatever blob the owning candidate is examining.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub result_start: u32,
    pub length: u32,
    pub source_start: u32,
}

impl Region {
    pub fn source_end(&self) -> u32 {
        self.source_start + self.length
    }
}

#[derive(Debug, Clone)]
pub struct Candidate {
    pub commit_id: ObjectId,
    pub timestamp: i64,
    pub path: BString,
    pub blob_id: ObjectId,
    pub regions: Vec<Region>,
}

/// Merges regions that are contiguous in both the result and source
/// numbering after sorting by result position.
pub fn coalesce_regions(regions: &mut Vec<Region>) {
    regions.sort_by_key(|r| r.result_start);
    let mut out: Vec<Region> = Vec::with_capacity(regions.len());
    for r in regions.drain(..) {
        if let Some(last) = out.last_mut() {
            if last.result_start + last.length == r.result_start && last.source_end() == r.source_start {
                last.length += r.length;
                continue;
            }
        }
        out.push(r);
    }
    *regions = out;
}

/// A priority-by-commit-timestamp queue of in-flight candidates. Candidates
/// that already exist for the same `(commit_id, path)` merge their region
/// lists instead of coexisting, matching §4.J's dedup step. A plain `Vec`
/// scanned for the max is simpler to reason about than a binary heap with
/// in-place merges, and blame inputs are small enough that this is not a
/// bottleneck.
#[derive(Default)]
pub struct Queue {
    items: Vec<Candidate>,
}

impl Queue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn push_or_merge(&mut self, mut candidate: Candidate) {
        if candidate.regions.is_empty() {
            return;
        }
        if let Some(existing) = self
            .items
            .iter_mut()
            .find(|c| c.commit_id == candidate.commit_id && c.path == candidate.path)
        {
            existing.regions.append(&mut candidate.regions);
            coalesce_regions(&mut existing.regions);
        } else {
            coalesce_regions(&mut candidate.regions);
            self.items.push(candidate);
        }
    }

    pub fn pop_highest_priority(&mut self) -> Option<Candidate> {
        let (idx, _) = self
            .items
            .iter()
            .enumerate()
            .max_by_key(|(_, c)| c.timestamp)?;
        Some(self.items.remove(idx))
    }
}

/// Splits `regions` (numbered in the child blob's line space) against a
/// parent/child diff `edits` (base = parent, new = child). Returns the
/// pieces that fall in an unchanged gap, remapped into the parent's line
/// space, and the pieces that fall inside a changed span, still numbered in
/// child space (the caller blames these to the child commit).
pub fn split_regions_by_edits(regions: &[Region], edits: &[vcs_diff::Edit]) -> (Vec<Region>, Vec<Region>) {
    let mut parent_regions = Vec::new();
    let mut child_regions = Vec::new();

    for region in regions {
        let mut pos = region.source_start;
        let end = region.source_end();
        let mut cumulative_offset: i64 = 0;
        let mut edit_idx = 0usize;

        while pos < end {
            while edit_idx < edits.len() && edits[edit_idx].new_end() <= pos {
                cumulative_offset += edits[edit_idx].base_length as i64 - edits[edit_idx].new_length as i64;
                edit_idx += 1;
            }
            let in_edit = edit_idx < edits.len()
                && edits[edit_idx].new_start <= pos
                && pos < edits[edit_idx].new_end();

            if in_edit {
                let chunk_end = end.min(edits[edit_idx].new_end());
                child_regions.push(Region {
                    result_start: region.result_start + (pos - region.source_start),
                    length: chunk_end - pos,
                    source_start: pos,
                });
                pos = chunk_end;
            } else {
                let gap_end = edits
                    .get(edit_idx)
                    .map_or(end, |e| e.new_start.min(end));
                let len = gap_end - pos;
                let parent_pos = (pos as i64 + cumulative_offset) as u32;
                parent_regions.push(Region {
                    result_start: region.result_start + (pos - region.source_start),
                    length: len,
                    source_start: parent_pos,
                });
                pos = gap_end;
            }
        }
    }

    (parent_regions, child_regions)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(byte: u8) -> ObjectId {
        ObjectId::from_bytes(&[byte; 20]).unwrap()
    }

    #[test]
    fn coalesce_merges_contiguous_runs_only() {
        let mut regions = vec![
            Region { result_start: 0, length: 2, source_start: 0 },
            Region { result_start: 2, length: 3, source_start: 2 },
            Region { result_start: 10, length: 1, source_start: 20 },
        ];
        coalesce_regions(&mut regions);
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0], Region { result_start: 0, length: 5, source_start: 0 });
    }

    #[test]
    fn split_passes_through_unchanged_region_with_no_edits() {
        let regions = vec![Region { result_start: 0, length: 5, source_start: 0 }];
        let (parent, child) = split_regions_by_edits(&regions, &[]);
        assert_eq!(parent, regions);
        assert!(child.is_empty());
    }

    #[test]
    fn split_separates_changed_span_from_unchanged_gaps() {
        // Child has 5 lines; a single-line edit replaced child line 2 (one parent line
        // became two child lines, shifting everything after by one).
        let edits = vec![vcs_diff::Edit { base_start: 2, base_length: 1, new_start: 2, new_length: 2 }];
        let regions = vec![Region { result_start: 0, length: 5, source_start: 0 }];
        let (parent, child) = split_regions_by_edits(&regions, &edits);
        // Unchanged gap before the edit: child [0,2) -> parent [0,2).
        assert_eq!(parent[0], Region { result_start: 0, length: 2, source_start: 0 });
        // Changed span: child [2,4).
        assert_eq!(child[0], Region { result_start: 2, length: 2, source_start: 2 });
        // Unchanged gap after: child [4,5) -> parent [3,4) (offset -1 from the edit).
        assert_eq!(parent[1], Region { result_start: 4, length: 1, source_start: 3 });
        let _ = id(1);
    }
}
