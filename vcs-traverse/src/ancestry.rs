//! `walk_ancestry`: commit ids in topological order, approximated the way
//! `git log`'s default (non `--topo-order`) walk does — a max-heap keyed on
//! committer timestamp, which coincides with a topological order for any
//! history where children are never older than their parents.

use crate::Error;
use std::collections::{BinaryHeap, HashSet};
use vcs_hash::ObjectId;
use vcs_odb::CommitStore;

#[derive(Debug, Clone, Copy, Default)]
pub struct WalkOptions {
    pub limit: Option<usize>,
    /// Only commits at or after this committer timestamp are yielded.
    pub since: Option<i64>,
    /// Only commits at or before this committer timestamp are yielded.
    pub until: Option<i64>,
}

pub fn walk_ancestry(commits: &CommitStore, starts: &[ObjectId], options: WalkOptions) -> Result<Vec<ObjectId>, Error> {
    let mut heap: BinaryHeap<(i64, ObjectId)> = BinaryHeap::new();
    let mut visited: HashSet<ObjectId> = HashSet::new();

    for &start in starts {
        if visited.insert(start) {
            let commit = commits.load(&start)?.ok_or(Error::NotFound(start))?;
            heap.push((commit.committer.seconds, start));
        }
    }

    let mut out = Vec::new();
    while let Some((timestamp, id)) = heap.pop() {
        if let Some(limit) = options.limit {
            if out.len() >= limit {
                break;
            }
        }
        if let Some(since) = options.since {
            if timestamp < since {
                continue; // too old to report, and not worth descending further
            }
        }
        let in_range = options.until.map_or(true, |until| timestamp <= until);
        if in_range {
            out.push(id);
        }

        let commit = commits.load(&id)?.ok_or(Error::NotFound(id))?;
        for parent in commit.parents {
            if visited.insert(parent) {
                let parent_commit = commits.load(&parent)?.ok_or(Error::NotFound(parent))?;
                heap.push((parent_commit.committer.seconds, parent));
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use vcs_object::identity::Identity;
    use vcs_object::Commit;

    fn store() -> CommitStore {
        CommitStore::new(Arc::new(vcs_odb::memory::InMemoryStore::new()))
    }

    fn commit(store: &CommitStore, tree: ObjectId, parents: &[ObjectId], seconds: i64) -> ObjectId {
        store
            .store(&Commit {
                tree,
                parents: parents.iter().copied().collect(),
                author: Identity::new("A", "a@x", seconds, 0),
                committer: Identity::new("A", "a@x", seconds, 0),
                encoding: None,
                message: "m".into(),
            })
            .unwrap()
    }

    #[test]
    fn linear_chain_walks_newest_first() {
        let store = store();
        let tree = ObjectId::empty_tree();
        let c1 = commit(&store, tree, &[], 100);
        let c2 = commit(&store, tree, &[c1], 200);
        let order = walk_ancestry(&store, &[c2], WalkOptions::default()).unwrap();
        assert_eq!(order, vec![c2, c1]);
    }

    #[test]
    fn limit_truncates_the_walk() {
        let store = store();
        let tree = ObjectId::empty_tree();
        let c1 = commit(&store, tree, &[], 100);
        let c2 = commit(&store, tree, &[c1], 200);
        let order = walk_ancestry(
            &store,
            &[c2],
            WalkOptions {
                limit: Some(1),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(order, vec![c2]);
    }

    #[test]
    fn since_excludes_older_commits() {
        let store = store();
        let tree = ObjectId::empty_tree();
        let c1 = commit(&store, tree, &[], 100);
        let c2 = commit(&store, tree, &[c1], 200);
        let order = walk_ancestry(
            &store,
            &[c2],
            WalkOptions {
                since: Some(150),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(order, vec![c2]);
    }
}
