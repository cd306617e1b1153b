//! Targeted-patch half of §4.H: each [`Edit`] names a path (and optionally
//! a single stage) and either removes, upserts, transforms via `apply`, or
//! (for a tree-scoped delete) drops every existing path under a prefix.
//! `finish` walks the base entries once, applying every matching edit in
//! the order they were added, then adds edits that named paths with no
//! existing row.

use crate::{validate_sorted_no_dup_no_conflict, Entry, Index, Stage};
use bstr::{BString, ByteSlice};

pub enum EditOp {
    /// Computes a replacement from the existing entry (`None` if absent);
    /// returning `None` deletes the row.
    Apply(Box<dyn Fn(Option<&Entry>) -> Option<Entry> + Send + Sync>),
    Remove,
    Upsert(Entry),
    /// Drops every existing entry whose path is `prefix` or starts with
    /// `prefix/`.
    RemoveSubtree,
}

pub struct Edit {
    pub path: BString,
    pub stage: Option<Stage>,
    pub op: EditOp,
}

impl Edit {
    pub fn remove(path: impl Into<BString>, stage: Option<Stage>) -> Self {
        Edit {
            path: path.into(),
            stage,
            op: EditOp::Remove,
        }
    }

    pub fn upsert(entry: Entry) -> Self {
        Edit {
            path: entry.path.clone(),
            stage: Some(entry.stage),
            op: EditOp::Upsert(entry),
        }
    }

    pub fn apply(
        path: impl Into<BString>,
        stage: Option<Stage>,
        f: impl Fn(Option<&Entry>) -> Option<Entry> + Send + Sync + 'static,
    ) -> Self {
        Edit {
            path: path.into(),
            stage,
            op: EditOp::Apply(Box::new(f)),
        }
    }

    pub fn remove_subtree(prefix: impl Into<BString>) -> Self {
        Edit {
            path: prefix.into(),
            stage: None,
            op: EditOp::RemoveSubtree,
        }
    }

    fn matches(&self, entry: &Entry) -> bool {
        entry.path == self.path && self.stage.map_or(true, |s| s == entry.stage)
    }

    fn under_subtree(&self, entry: &Entry) -> bool {
        entry.path == self.path
            || (entry.path.starts_with(self.path.as_slice()) && entry.path.get(self.path.len()) == Some(&b'/'))
    }
}

pub struct Editor<'a> {
    base: &'a Index,
    edits: Vec<Edit>,
}

impl<'a> Editor<'a> {
    pub(crate) fn new(base: &'a Index) -> Self {
        Editor { base, edits: Vec::new() }
    }

    pub fn add(&mut self, edit: Edit) -> &mut Self {
        self.edits.push(edit);
        self
    }

    pub fn remove(&mut self, path: impl Into<BString>, stage: Option<Stage>) -> &mut Self {
        self.add(Edit::remove(path, stage))
    }

    pub fn upsert(&mut self, entry: Entry) -> &mut Self {
        self.add(Edit::upsert(entry))
    }

    pub fn finish(self) -> Result<Index, crate::Error> {
        let mut out = Vec::with_capacity(self.base.entries.len());

        for entry in &self.base.entries {
            if self
                .edits
                .iter()
                .any(|e| matches!(e.op, EditOp::RemoveSubtree) && e.under_subtree(entry))
            {
                continue;
            }
            let mut current = Some(entry.clone());
            for edit in &self.edits {
                let Some(existing) = current.as_ref() else { break };
                if !matches!(edit.op, EditOp::RemoveSubtree) && edit.matches(existing) {
                    current = match &edit.op {
                        EditOp::Remove => None,
                        EditOp::Upsert(new_entry) => Some(new_entry.clone()),
                        EditOp::Apply(f) => f(current.as_ref()),
                        EditOp::RemoveSubtree => unreachable!(),
                    };
                }
            }
            if let Some(entry) = current {
                out.push(entry);
            }
        }

        let existing_keys: std::collections::HashSet<(BString, Stage)> =
            self.base.entries.iter().map(|e| (e.path.clone(), e.stage)).collect();
        for edit in &self.edits {
            match &edit.op {
                EditOp::Upsert(new_entry) => {
                    let key = (new_entry.path.clone(), new_entry.stage);
                    if !existing_keys.contains(&key) {
                        out.push(new_entry.clone());
                    }
                }
                EditOp::Apply(f) => {
                    let any_existing = existing_keys
                        .iter()
                        .any(|(p, s)| *p == edit.path && edit.stage.map_or(true, |st| st == *s));
                    if !any_existing {
                        if let Some(entry) = f(None) {
                            out.push(entry);
                        }
                    }
                }
                EditOp::Remove | EditOp::RemoveSubtree => {}
            }
        }

        out.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        validate_sorted_no_dup_no_conflict(&out)?;
        Ok(Index {
            entries: out,
            version: self.base.version,
            last_read: self.base.last_read,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vcs_hash::ObjectId;
    use vcs_object::tree::Mode;

    fn id(b: u8) -> ObjectId {
        ObjectId::from_bytes(&[b; 20]).unwrap()
    }

    #[test]
    fn remove_drops_a_single_row() {
        let mut base = Index::new();
        base.set_entry(Entry::new("a.txt", Mode::File, id(1)));
        let mut editor = base.create_editor();
        editor.remove("a.txt", Some(Stage::Merged));
        let out = editor.finish().unwrap();
        assert!(!out.has_entry(b"a.txt"));
    }

    #[test]
    fn upsert_inserts_when_absent_and_replaces_when_present() {
        let mut base = Index::new();
        base.set_entry(Entry::new("a.txt", Mode::File, id(1)));
        let mut editor = base.create_editor();
        editor.upsert(Entry::new("a.txt", Mode::File, id(2)));
        editor.upsert(Entry::new("b.txt", Mode::File, id(3)));
        let out = editor.finish().unwrap();
        assert_eq!(out.get_entry(b"a.txt", Stage::Merged).unwrap().id, id(2));
        assert_eq!(out.get_entry(b"b.txt", Stage::Merged).unwrap().id, id(3));
    }

    #[test]
    fn apply_can_transform_or_delete() {
        let mut base = Index::new();
        base.set_entry(Entry::new("a.txt", Mode::File, id(1)));
        let mut editor = base.create_editor();
        editor.add(Edit::apply("a.txt", Some(Stage::Merged), |existing| {
            let mut e = existing.unwrap().clone();
            e.assume_valid = true;
            Some(e)
        }));
        let out = editor.finish().unwrap();
        assert!(out.get_entry(b"a.txt", Stage::Merged).unwrap().assume_valid);
    }

    #[test]
    fn remove_subtree_drops_every_path_beneath_prefix() {
        let mut base = Index::new();
        base.set_entry(Entry::new("dir/a.txt", Mode::File, id(1)));
        base.set_entry(Entry::new("dir/b.txt", Mode::File, id(2)));
        base.set_entry(Entry::new("dirty.txt", Mode::File, id(3)));
        let mut editor = base.create_editor();
        editor.add(Edit::remove_subtree("dir"));
        let out = editor.finish().unwrap();
        assert_eq!(out.count(), 1);
        assert!(out.has_entry(b"dirty.txt"));
    }
}
