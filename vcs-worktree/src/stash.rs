//! Stash entries (§6): a commit with 2 or 3 parents `[head, index,
//! untracked?]`, `refs/stash` holding the most recent one. The index
//! parent is a commit whose tree is the staged snapshot; the optional
//! third parent snapshots untracked files the caller chose to include.

use crate::Error;
use vcs_hash::ObjectId;
use vcs_object::{Commit, Identity};
use vcs_odb::CommitStore;
use vcs_ref::RefStore;

pub const STASH_REF: &str = "refs/stash";

/// The tree snapshots a stash needs: the index's current (staged) tree,
/// and optionally the untracked-files tree, both already built by the
/// caller (typically `Index::write_tree` against separate builders).
pub struct StashTrees {
    pub index_tree: ObjectId,
    pub untracked_tree: Option<ObjectId>,
}

/// Creates a stash commit atop `head` and pushes it as the new
/// `refs/stash` (chaining onto whatever was previously stashed is the
/// caller's concern via `refs/stash@{n}` naming — this crate only manages
/// the single most-recent slot named by §6).
pub fn create(
    commits: &CommitStore,
    refs: &dyn RefStore,
    head: ObjectId,
    branch: &str,
    short_subject: &str,
    identity: Identity,
    trees: StashTrees,
) -> Result<ObjectId, Error> {
    let head_commit = commits.load(&head)?.ok_or(Error::NotFound(head))?;

    let index_commit = commits.store(&Commit {
        tree: trees.index_tree,
        parents: smallvec::smallvec![head],
        author: identity.clone(),
        committer: identity.clone(),
        encoding: None,
        message: format!("index on {branch}: {short_subject}").into(),
    })?;

    let mut parents = smallvec::smallvec![head, index_commit];
    if let Some(untracked_tree) = trees.untracked_tree {
        let untracked_commit = commits.store(&Commit {
            tree: untracked_tree,
            parents: Default::default(),
            author: identity.clone(),
            committer: identity.clone(),
            encoding: None,
            message: format!("untracked files on {branch}: {short_subject}").into(),
        })?;
        parents.push(untracked_commit);
    }

    let stash_commit = commits.store(&Commit {
        tree: head_commit.tree,
        parents,
        author: identity.clone(),
        committer: identity,
        encoding: None,
        message: format!("WIP on {branch}: {short_subject}").into(),
    })?;

    refs.set(STASH_REF, stash_commit)?;
    Ok(stash_commit)
}

/// The parsed shape of a stash commit: its head, index-snapshot, and
/// optional untracked-snapshot parents.
pub struct StashParents {
    pub head: ObjectId,
    pub index: ObjectId,
    pub untracked: Option<ObjectId>,
}

/// Reads back a stash commit's parent roles, failing if it doesn't have
/// the 2-or-3-parent shape §6 requires.
pub fn parents(commits: &CommitStore, stash_commit: ObjectId) -> Result<StashParents, Error> {
    let commit = commits.load(&stash_commit)?.ok_or(Error::NotFound(stash_commit))?;
    match commit.parents.as_slice() {
        [head, index] => Ok(StashParents { head: *head, index: *index, untracked: None }),
        [head, index, untracked] => Ok(StashParents { head: *head, index: *index, untracked: Some(*untracked) }),
        _ => Err(Error::IllegalState("stash commit must have 2 or 3 parents")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use vcs_object::tree::Mode;
    use vcs_object::TreeEntry;
    use vcs_odb::memory::InMemoryStore;
    use vcs_odb::{BlobStore, TreeStore};
    use vcs_ref::MemoryRefStore;

    #[test]
    fn stash_commit_has_head_and_index_parents_and_updates_the_ref() {
        let raw = Arc::new(InMemoryStore::new());
        let commits = CommitStore::new(raw.clone());
        let trees = TreeStore::new(raw.clone());
        let blobs = BlobStore::new(raw);
        let refs = MemoryRefStore::new();

        let blob = blobs.store_bytes(b"content").unwrap();
        let tree = trees.store(vec![TreeEntry::new(Mode::File, "f.txt", blob)]).unwrap();
        let identity = Identity::new("A", "a@x", 1, 0);
        let head = commits
            .store(&Commit {
                tree,
                parents: Default::default(),
                author: identity.clone(),
                committer: identity.clone(),
                encoding: None,
                message: "init".into(),
            })
            .unwrap();

        let staged_blob = blobs.store_bytes(b"staged edit").unwrap();
        let index_tree = trees.store(vec![TreeEntry::new(Mode::File, "f.txt", staged_blob)]).unwrap();

        let stash_id = create(
            &commits,
            &refs,
            head,
            "main",
            "wip changes",
            identity,
            StashTrees { index_tree, untracked_tree: None },
        )
        .unwrap();

        assert_eq!(refs.resolve(STASH_REF).unwrap(), Some(stash_id));
        let parsed = parents(&commits, stash_id).unwrap();
        assert_eq!(parsed.head, head);
        assert!(parsed.untracked.is_none());

        let index_commit = commits.load(&parsed.index).unwrap().unwrap();
        assert_eq!(index_commit.tree, index_tree);
        assert_eq!(index_commit.message.to_string(), "index on main: wip changes");

        let stash_commit = commits.load(&stash_id).unwrap().unwrap();
        assert_eq!(stash_commit.message.to_string(), "WIP on main: wip changes");
    }

    #[test]
    fn stash_with_untracked_files_has_three_parents() {
        let raw = Arc::new(InMemoryStore::new());
        let commits = CommitStore::new(raw.clone());
        let trees = TreeStore::new(raw.clone());
        let blobs = BlobStore::new(raw);
        let refs = MemoryRefStore::new();

        let blob = blobs.store_bytes(b"content").unwrap();
        let tree = trees.store(vec![TreeEntry::new(Mode::File, "f.txt", blob)]).unwrap();
        let identity = Identity::new("A", "a@x", 1, 0);
        let head = commits
            .store(&Commit {
                tree,
                parents: Default::default(),
                author: identity.clone(),
                committer: identity.clone(),
                encoding: None,
                message: "init".into(),
            })
            .unwrap();

        let untracked_blob = blobs.store_bytes(b"scratch").unwrap();
        let untracked_tree = trees.store(vec![TreeEntry::new(Mode::File, "scratch.txt", untracked_blob)]).unwrap();

        let stash_id = create(
            &commits,
            &refs,
            head,
            "main",
            "with untracked",
            identity,
            StashTrees { index_tree: tree, untracked_tree: Some(untracked_tree) },
        )
        .unwrap();

        let parsed = parents(&commits, stash_id).unwrap();
        assert_eq!(parsed.untracked, Some(commits.load(&stash_id).unwrap().unwrap().parents[2]));
    }
}
