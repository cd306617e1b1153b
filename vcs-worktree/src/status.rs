//! Status computation: compares `HEAD`'s tree, the index, and the worktree
//! to classify every path as added/modified/deleted (`HEAD` vs index),
//! worktree-modified (index vs worktree), or untracked (in the worktree
//! but named nowhere else and not ignored).

use crate::checkout::flatten_tree;
use crate::fs::Worktree;
use crate::ignore::IgnoreLookup;
use crate::Error;
use bstr::BString;
use sha1::{Digest, Sha1};
use std::collections::BTreeSet;
use vcs_hash::ObjectId;
use vcs_index::Index;
use vcs_odb::{BlobStore, TreeStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    /// Present in the index but not `HEAD`.
    Added,
    /// Present in `HEAD` but not the index.
    Deleted,
    /// Differs between `HEAD` and the index.
    Modified,
    /// In the worktree but unknown to the index and not ignored.
    Untracked,
    /// Staged in the index but missing/changed on disk relative to the
    /// index's recorded blob.
    WorktreeModified,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEntry {
    pub path: BString,
    pub kind: StatusKind,
}

fn hash(bytes: &[u8]) -> [u8; 20] {
    let mut h = Sha1::new();
    h.update(bytes);
    h.finalize().into()
}

/// `true` if the worktree's bytes at `path` differ from `expected`, by
/// size first and content hash only when sizes agree (§4.I's "by size
/// fast-path or content hash").
fn worktree_differs(worktree: &dyn Worktree, path: &str, expected: &[u8]) -> Result<bool, Error> {
    match worktree.size(path)? {
        Some(size) if size == expected.len() as u64 => {
            let actual = worktree.read(path)?.unwrap_or_default();
            Ok(hash(&actual) != hash(expected))
        }
        _ => Ok(true),
    }
}

/// Computes a status listing for one worktree against one `HEAD` commit's
/// tree and the current index. `ignored` decides whether an untracked path
/// should be reported (callers normally pass a combined `.gitignore` +
/// `info/exclude` + global-excludes lookup, per §6). `worktree_paths` is
/// the caller's enumeration of on-disk files (this crate does not itself
/// walk a filesystem tree).
pub fn status(
    trees: &TreeStore,
    blobs: &BlobStore,
    head_tree: Option<ObjectId>,
    index: &Index,
    worktree: &dyn Worktree,
    ignored: &dyn IgnoreLookup,
    worktree_paths: &[String],
) -> Result<Vec<StatusEntry>, Error> {
    let head = match head_tree {
        Some(id) => flatten_tree(trees, id)?,
        None => Default::default(),
    };

    let mut out = Vec::new();
    let mut seen: BTreeSet<BString> = BTreeSet::new();

    for entry in index.entries(vcs_index::EntryFilter::default()) {
        if entry.stage != vcs_index::Stage::Merged {
            continue; // unresolved conflicts surface via Index::conflicted_paths, not status
        }
        seen.insert(entry.path.clone());
        match head.get(&entry.path) {
            Some((_, head_id)) if *head_id == entry.id => {}
            Some(_) => out.push(StatusEntry { path: entry.path.clone(), kind: StatusKind::Modified }),
            None => out.push(StatusEntry { path: entry.path.clone(), kind: StatusKind::Added }),
        }

        let path_str = entry.path.to_string();
        let staged_bytes = blobs.load_bytes(&entry.id)?.ok_or(Error::NotFound(entry.id))?;
        if worktree_differs(worktree, &path_str, &staged_bytes)? {
            out.push(StatusEntry { path: entry.path.clone(), kind: StatusKind::WorktreeModified });
        }
    }

    for path in head.keys() {
        if !seen.contains(path) {
            out.push(StatusEntry { path: path.clone(), kind: StatusKind::Deleted });
        }
    }

    for path in worktree_paths {
        let bpath = BString::from(path.as_str());
        if seen.contains(&bpath) || head.contains_key(&bpath) {
            continue;
        }
        let is_dir = worktree.is_dir(path);
        if ignored.is_ignored(path, is_dir) {
            continue;
        }
        out.push(StatusEntry { path: bpath, kind: StatusKind::Untracked });
    }

    out.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryWorktree;
    use crate::ignore::NeverIgnore;
    use std::sync::Arc;
    use vcs_index::Entry as IndexEntry;
    use vcs_object::tree::Mode;
    use vcs_object::TreeEntry;
    use vcs_odb::memory::InMemoryStore;

    fn store() -> (TreeStore, BlobStore) {
        let raw = Arc::new(InMemoryStore::new());
        (TreeStore::new(raw.clone()), BlobStore::new(raw))
    }

    #[test]
    fn new_staged_file_not_in_head_is_added() {
        let (trees, blobs) = store();
        let blob = blobs.store_bytes(b"hi").unwrap();
        let head = trees.store(vec![]).unwrap();

        let mut index = Index::new();
        let mut entry = IndexEntry::new("a.txt", Mode::File, blob);
        entry.size = 2;
        index.set_entry(entry);

        let mut wt = MemoryWorktree::new();
        wt.set("a.txt", b"hi".to_vec());
        let result = status(&trees, &blobs, Some(head), &index, &wt, &NeverIgnore, &[]).unwrap();
        assert!(result.iter().any(|e| e.path == "a.txt" && e.kind == StatusKind::Added));
    }

    #[test]
    fn staged_file_edited_on_disk_is_worktree_modified() {
        let (trees, blobs) = store();
        let blob = blobs.store_bytes(b"hi").unwrap();
        let head = trees.store(vec![]).unwrap();

        let mut index = Index::new();
        let mut entry = IndexEntry::new("a.txt", Mode::File, blob);
        entry.size = 2;
        index.set_entry(entry);

        let mut wt = MemoryWorktree::new();
        wt.set("a.txt", b"edited-locally".to_vec());
        let result = status(&trees, &blobs, Some(head), &index, &wt, &NeverIgnore, &[]).unwrap();
        assert!(result.iter().any(|e| e.path == "a.txt" && e.kind == StatusKind::WorktreeModified));
    }

    #[test]
    fn untracked_non_ignored_file_is_reported() {
        let (trees, blobs) = store();
        let head = trees.store(vec![]).unwrap();
        let index = Index::new();
        let mut wt = MemoryWorktree::new();
        wt.set("stray.txt", b"x".to_vec());

        let result = status(&trees, &blobs, Some(head), &index, &wt, &NeverIgnore, &["stray.txt".to_string()]).unwrap();
        assert_eq!(result, vec![StatusEntry { path: "stray.txt".into(), kind: StatusKind::Untracked }]);
    }

    #[test]
    fn deleted_from_index_but_present_in_head_is_reported() {
        let (trees, blobs) = store();
        let blob = blobs.store_bytes(b"hi").unwrap();
        let head = trees.store(vec![TreeEntry::new(Mode::File, "gone.txt", blob)]).unwrap();
        let index = Index::new();
        let wt = MemoryWorktree::new();

        let result = status(&trees, &blobs, Some(head), &index, &wt, &NeverIgnore, &[]).unwrap();
        assert_eq!(result, vec![StatusEntry { path: "gone.txt".into(), kind: StatusKind::Deleted }]);
    }
}
