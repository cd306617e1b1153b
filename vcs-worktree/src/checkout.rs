//! Checkout conflict detection (§4.I): given the current `HEAD` tree, a
//! target tree, the staging area, and the worktree, report every path that
//! a checkout to `target` would clobber.

use crate::fs::Worktree;
use crate::Error;
use bstr::{BString, ByteSlice};
use sha1::{Digest, Sha1};
use std::collections::BTreeMap;
use vcs_hash::ObjectId;
use vcs_index::Index;
use vcs_object::tree::Mode;
use vcs_odb::TreeStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    /// Staged with content differing from `HEAD`.
    DirtyIndex,
    /// Worktree content differs from `HEAD`, and the target would either
    /// overwrite or delete that modified content.
    DirtyWorktree,
    /// The target would create a file where an untracked, non-ignored
    /// file already exists.
    UntrackedFile,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub path: BString,
    pub kind: ConflictKind,
}

/// Which paths to examine, and whether untracked files should be checked
/// at all (§4.I: "untracked checks may be skipped on caller request").
#[derive(Default)]
pub struct CheckOptions<'a> {
    pub path_filter: Option<&'a dyn Fn(&[u8]) -> bool>,
    pub skip_untracked: bool,
}

/// A flattened `path -> (mode, blob_id)` view of a tree, recursing through
/// subtrees; used by both checkout conflict detection and status.
pub(crate) fn flatten_tree(trees: &TreeStore, tree_id: ObjectId) -> Result<BTreeMap<BString, (Mode, ObjectId)>, Error> {
    let mut out = BTreeMap::new();
    flatten_into(trees, tree_id, &BString::default(), &mut out)?;
    Ok(out)
}

fn flatten_into(
    trees: &TreeStore,
    tree_id: ObjectId,
    prefix: &BString,
    out: &mut BTreeMap<BString, (Mode, ObjectId)>,
) -> Result<(), Error> {
    let Some(tree) = trees.load(&tree_id)? else {
        return Ok(());
    };
    for entry in &tree.entries {
        let mut path = prefix.clone();
        if !path.is_empty() {
            path.push(b'/');
        }
        path.extend_from_slice(&entry.name);
        if entry.mode.is_tree() {
            flatten_into(trees, entry.id, &path, out)?;
        } else {
            out.insert(path, (entry.mode, entry.id));
        }
    }
    Ok(())
}

fn content_hash(bytes: &[u8]) -> [u8; 20] {
    let mut hasher = Sha1::new();
    hasher.update(bytes);
    hasher.finalize().into()
}

/// `true` if `worktree`'s content at `path` differs from `expected` blob
/// content — checked by size first, falling back to a content hash only
/// when sizes agree but bytes might not.
fn worktree_differs(worktree: &dyn Worktree, path: &str, expected: Option<&[u8]>) -> Result<bool, Error> {
    let on_disk_size = worktree.size(path)?;
    let expected_size = expected.map(|b| b.len() as u64);
    if on_disk_size != expected_size {
        return Ok(true);
    }
    match (worktree.read(path)?, expected) {
        (Some(actual), Some(expected)) => Ok(content_hash(&actual) != content_hash(expected)),
        (None, None) => Ok(false),
        _ => Ok(true),
    }
}

/// Detects the three conflict kinds from §4.I for a checkout from
/// `head_tree` to `target_tree`.
pub fn detect_conflicts(
    trees: &TreeStore,
    blobs: &vcs_odb::BlobStore,
    head_tree: ObjectId,
    target_tree: ObjectId,
    index: &Index,
    worktree: &dyn Worktree,
    options: CheckOptions<'_>,
) -> Result<Vec<Conflict>, Error> {
    let head = flatten_tree(trees, head_tree)?;
    let target = flatten_tree(trees, target_tree)?;
    let mut conflicts = Vec::new();

    let mut all_paths: Vec<&BString> = head.keys().chain(target.keys()).collect();
    all_paths.sort();
    all_paths.dedup();

    for path in all_paths {
        if let Some(filter) = options.path_filter {
            if !filter(path.as_slice()) {
                continue;
            }
        }
        let path_str = path.to_str_lossy();
        let head_entry = head.get(path);
        let target_entry = target.get(path);

        // DIRTY_INDEX: staged content differs from HEAD's.
        if let Some(staged) = index.get_entry(path.as_slice(), vcs_index::Stage::Merged) {
            let head_id = head_entry.map(|(_, id)| *id);
            if head_id != Some(staged.id) {
                conflicts.push(Conflict {
                    path: path.clone(),
                    kind: ConflictKind::DirtyIndex,
                });
                continue;
            }
        }

        // DIRTY_WORKTREE: worktree content differs from HEAD, and the
        // target would overwrite (differs from HEAD) or delete it.
        let head_bytes = match head_entry {
            Some((_, id)) => blobs.load_bytes(id)?,
            None => None,
        };
        let dirty = head_entry.is_some() && worktree_differs(worktree, &path_str, head_bytes.as_deref())?;
        if dirty {
            let would_overwrite = target_entry.map(|(_, id)| *id) != head_entry.map(|(_, id)| *id);
            let would_delete = target_entry.is_none() && head_entry.is_some();
            if would_overwrite || would_delete {
                conflicts.push(Conflict {
                    path: path.clone(),
                    kind: ConflictKind::DirtyWorktree,
                });
                continue;
            }
        }

        // UNTRACKED_FILE: target creates a file where an untracked,
        // present file already sits.
        if !options.skip_untracked && target_entry.is_some() && head_entry.is_none() {
            let staged = index.has_entry(path.as_slice());
            if !staged && worktree.exists(&path_str) {
                conflicts.push(Conflict {
                    path: path.clone(),
                    kind: ConflictKind::UntrackedFile,
                });
            }
        }
    }

    Ok(conflicts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryWorktree;
    use std::sync::Arc;
    use vcs_index::Entry as IndexEntry;
    use vcs_object::TreeEntry;
    use vcs_odb::memory::InMemoryStore;
    use vcs_odb::BlobStore;

    fn store() -> (TreeStore, BlobStore) {
        let raw = Arc::new(InMemoryStore::new());
        (TreeStore::new(raw.clone()), BlobStore::new(raw))
    }

    #[test]
    fn dirty_worktree_file_that_would_be_overwritten_is_reported() {
        let (trees, blobs) = store();
        let blob_a = blobs.store_bytes(b"a").unwrap();
        let blob_b = blobs.store_bytes(b"b").unwrap();
        let head = trees.store(vec![TreeEntry::new(Mode::File, "f.txt", blob_a)]).unwrap();
        let target = trees.store(vec![TreeEntry::new(Mode::File, "f.txt", blob_b)]).unwrap();

        let mut wt = MemoryWorktree::new();
        wt.set("f.txt", b"locally-edited".to_vec());
        let index = Index::new();

        let conflicts = detect_conflicts(&trees, &blobs, head, target, &index, &wt, CheckOptions::default()).unwrap();
        assert_eq!(conflicts, vec![Conflict { path: "f.txt".into(), kind: ConflictKind::DirtyWorktree }]);
    }

    #[test]
    fn clean_worktree_matching_head_is_never_reported() {
        let (trees, blobs) = store();
        let blob_a = blobs.store_bytes(b"a").unwrap();
        let blob_b = blobs.store_bytes(b"b").unwrap();
        let head = trees.store(vec![TreeEntry::new(Mode::File, "f.txt", blob_a)]).unwrap();
        let target = trees.store(vec![TreeEntry::new(Mode::File, "f.txt", blob_b)]).unwrap();

        let mut wt = MemoryWorktree::new();
        wt.set("f.txt", b"a".to_vec());
        let index = Index::new();

        let conflicts = detect_conflicts(&trees, &blobs, head, target, &index, &wt, CheckOptions::default()).unwrap();
        assert!(conflicts.is_empty());
    }

    #[test]
    fn staged_change_differing_from_head_is_dirty_index() {
        let (trees, blobs) = store();
        let blob_a = blobs.store_bytes(b"a").unwrap();
        let blob_staged = blobs.store_bytes(b"staged").unwrap();
        let head = trees.store(vec![TreeEntry::new(Mode::File, "f.txt", blob_a)]).unwrap();
        let target = head;

        let mut index = Index::new();
        index.set_entry(IndexEntry::new("f.txt", Mode::File, blob_staged));
        let wt = MemoryWorktree::new();

        let conflicts = detect_conflicts(&trees, &blobs, head, target, &index, &wt, CheckOptions::default()).unwrap();
        assert_eq!(conflicts, vec![Conflict { path: "f.txt".into(), kind: ConflictKind::DirtyIndex }]);
    }

    #[test]
    fn untracked_file_blocking_a_new_path_is_reported() {
        let (trees, blobs) = store();
        let blob_b = blobs.store_bytes(b"b").unwrap();
        let head = trees.store(vec![]).unwrap();
        let target = trees.store(vec![TreeEntry::new(Mode::File, "new.txt", blob_b)]).unwrap();

        let mut wt = MemoryWorktree::new();
        wt.set("new.txt", b"already here".to_vec());
        let index = Index::new();

        let conflicts = detect_conflicts(&trees, &blobs, head, target, &index, &wt, CheckOptions::default()).unwrap();
        assert_eq!(conflicts, vec![Conflict { path: "new.txt".into(), kind: ConflictKind::UntrackedFile }]);
    }

    #[test]
    fn skip_untracked_suppresses_that_check() {
        let (trees, blobs) = store();
        let blob_b = blobs.store_bytes(b"b").unwrap();
        let head = trees.store(vec![]).unwrap();
        let target = trees.store(vec![TreeEntry::new(Mode::File, "new.txt", blob_b)]).unwrap();

        let mut wt = MemoryWorktree::new();
        wt.set("new.txt", b"already here".to_vec());
        let index = Index::new();

        let conflicts = detect_conflicts(
            &trees,
            &blobs,
            head,
            target,
            &index,
            &wt,
            CheckOptions { path_filter: None, skip_untracked: true },
        )
        .unwrap();
        assert!(conflicts.is_empty());
    }
}
