//! Bulk-rewrite half of §4.H: `add`/`keep`/`add_tree` accumulate a fresh
//! entry list, and `finish` sorts, rejects duplicates, enforces the
//! stage-0 invariant, and atomically replaces the backing vector.

use crate::{validate_sorted_no_dup_no_conflict, Entry, Index, Stage};
use vcs_hash::ObjectId;
use vcs_odb::typed::TreeStore;

pub struct Builder<'a> {
    base: &'a Index,
    out: Vec<Entry>,
}

impl<'a> Builder<'a> {
    pub(crate) fn new(base: &'a Index) -> Self {
        Builder { base, out: Vec::new() }
    }

    /// Appends a freshly constructed entry.
    pub fn add(&mut self, entry: Entry) -> &mut Self {
        self.out.push(entry);
        self
    }

    /// Preserves `count` entries from the base index starting at `start`,
    /// by index position in the base's sorted vector — used by callers
    /// rewriting only part of the index (e.g. one subtree) while keeping
    /// everything outside that range untouched.
    pub fn keep(&mut self, start: usize, count: usize) -> &mut Self {
        let end = (start + count).min(self.base.entries.len());
        if start < end {
            self.out.extend_from_slice(&self.base.entries[start..end]);
        }
        self
    }

    /// Recursively pushes every blob entry of `tree_id`, with paths
    /// prefixed by `prefix`, at the given `stage`.
    pub fn add_tree(
        &mut self,
        trees: &TreeStore,
        tree_id: ObjectId,
        prefix: &str,
        stage: Stage,
    ) -> Result<&mut Self, crate::Error> {
        let mut out = Vec::new();
        crate::tree_io::collect_tree_entries(trees, tree_id, prefix, stage, &mut out)?;
        self.out.extend(out);
        Ok(self)
    }

    /// Sorts, validates, and produces the rebuilt [`Index`]. The base
    /// index's on-disk metadata (version, last-read time) carries over
    /// unchanged; only the entry vector is replaced.
    pub fn finish(self) -> Result<Index, crate::Error> {
        let mut entries = self.out;
        entries.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        validate_sorted_no_dup_no_conflict(&entries)?;
        Ok(Index {
            entries,
            version: self.base.version,
            last_read: self.base.last_read,
        })
    }
}
