//! Component K: `wants \ haves` for transport/pack preparation (§4.K).
//! Walks commits via parents and each commit's tree recursively, yielding
//! every object reachable from `wants` that is not already reachable from
//! `haves`. Visits each object at most once.

use crate::Error;
use std::collections::{HashSet, VecDeque};
use vcs_hash::ObjectId;
use vcs_object::{tree::Mode, Kind};
use vcs_odb::{CommitStore, TreeStore};

/// `wants \ haves`, in a stable (visitation) order: commits before their
/// trees before the blobs those trees name.
pub fn reachable(
    commits: &CommitStore,
    trees: &TreeStore,
    wants: &[ObjectId],
    haves: &[ObjectId],
) -> Result<Vec<(Kind, ObjectId)>, Error> {
    let (_have_objects, excluded) = walk_all(commits, trees, haves, HashSet::new())?;
    let (want_objects, _) = walk_all(commits, trees, wants, excluded)?;
    Ok(want_objects)
}

fn walk_all(
    commits: &CommitStore,
    trees: &TreeStore,
    roots: &[ObjectId],
    mut seen: HashSet<ObjectId>,
) -> Result<(Vec<(Kind, ObjectId)>, HashSet<ObjectId>), Error> {
    let mut out = Vec::new();
    let mut queue: VecDeque<ObjectId> = VecDeque::new();
    for &root in roots {
        if seen.insert(root) {
            queue.push_back(root);
        }
    }

    while let Some(commit_id) = queue.pop_front() {
        out.push((Kind::Commit, commit_id));
        let commit = commits.load(&commit_id)?.ok_or(Error::NotFound(commit_id))?;
        for parent in commit.parents {
            if seen.insert(parent) {
                queue.push_back(parent);
            }
        }
        walk_tree(trees, commit.tree, &mut seen, &mut out)?;
    }
    Ok((out, seen))
}

fn walk_tree(
    trees: &TreeStore,
    tree_id: ObjectId,
    seen: &mut HashSet<ObjectId>,
    out: &mut Vec<(Kind, ObjectId)>,
) -> Result<(), Error> {
    if !seen.insert(tree_id) {
        return Ok(());
    }
    out.push((Kind::Tree, tree_id));
    let tree = trees.load(&tree_id)?.ok_or(Error::NotFound(tree_id))?;
    for entry in tree.entries {
        match entry.mode {
            Mode::Tree => walk_tree(trees, entry.id, seen, out)?,
            Mode::Gitlink => {} // submodule recursion is out of scope (spec §1 non-goal)
            _ => {
                if seen.insert(entry.id) {
                    out.push((Kind::Blob, entry.id));
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use vcs_object::identity::Identity;
    use vcs_object::tree::Mode;
    use vcs_object::{Commit, TreeEntry};

    struct Fixture {
        commits: CommitStore,
        trees: TreeStore,
        blobs: vcs_odb::BlobStore,
    }

    fn fixture() -> Fixture {
        let raw = Arc::new(vcs_odb::memory::InMemoryStore::new());
        Fixture {
            commits: CommitStore::new(raw.clone()),
            trees: TreeStore::new(raw.clone()),
            blobs: vcs_odb::BlobStore::new(raw),
        }
    }

    #[test]
    fn reachable_excludes_haves_closure() {
        let f = fixture();
        let blob1 = f.blobs.store_bytes(b"one").unwrap();
        let tree1 = f
            .trees
            .store(vec![TreeEntry::new(Mode::File, "a.txt", blob1)])
            .unwrap();
        let base = f
            .commits
            .store(&Commit {
                tree: tree1,
                parents: Default::default(),
                author: Identity::new("A", "a@x", 0, 0),
                committer: Identity::new("A", "a@x", 0, 0),
                encoding: None,
                message: "base".into(),
            })
            .unwrap();

        let blob2 = f.blobs.store_bytes(b"two").unwrap();
        let tree2 = f
            .trees
            .store(vec![
                TreeEntry::new(Mode::File, "a.txt", blob1),
                TreeEntry::new(Mode::File, "b.txt", blob2),
            ])
            .unwrap();
        let next = f
            .commits
            .store(&Commit {
                tree: tree2,
                parents: smallvec::smallvec![base],
                author: Identity::new("A", "a@x", 1, 0),
                committer: Identity::new("A", "a@x", 1, 0),
                encoding: None,
                message: "next".into(),
            })
            .unwrap();

        let objects = reachable(&f.commits, &f.trees, &[next], &[base]).unwrap();
        let ids: HashSet<ObjectId> = objects.iter().map(|&(_, id)| id).collect();
        assert!(ids.contains(&next));
        assert!(ids.contains(&tree2));
        assert!(ids.contains(&blob2));
        assert!(!ids.contains(&base));
        assert!(!ids.contains(&tree1));
        assert!(!ids.contains(&blob1));
    }

    #[test]
    fn each_object_visited_once_even_if_shared() {
        let f = fixture();
        let blob = f.blobs.store_bytes(b"shared").unwrap();
        let tree = f
            .trees
            .store(vec![TreeEntry::new(Mode::File, "x.txt", blob)])
            .unwrap();
        let c1 = f
            .commits
            .store(&Commit {
                tree,
                parents: Default::default(),
                author: Identity::new("A", "a@x", 0, 0),
                committer: Identity::new("A", "a@x", 0, 0),
                encoding: None,
                message: "c1".into(),
            })
            .unwrap();
        let c2 = f
            .commits
            .store(&Commit {
                tree,
                parents: smallvec::smallvec![c1],
                author: Identity::new("A", "a@x", 1, 0),
                committer: Identity::new("A", "a@x", 1, 0),
                encoding: None,
                message: "c2".into(),
            })
            .unwrap();

        let objects = reachable(&f.commits, &f.trees, &[c2], &[]).unwrap();
        let blob_occurrences = objects.iter().filter(|&&(_, id)| id == blob).count();
        assert_eq!(blob_occurrences, 1);
    }
}
