//! `find_merge_base` (best common ancestor via a colored BFS frontier) and
//! `is_ancestor` (a bounded BFS from the descendant toward the candidate
//! ancestor), §4.C.

use crate::Error;
use std::collections::{HashMap, HashSet, VecDeque};
use vcs_hash::ObjectId;
use vcs_odb::CommitStore;

const ANCESTOR_OF_A: u8 = 1;
const ANCESTOR_OF_B: u8 = 2;
const BOTH: u8 = ANCESTOR_OF_A | ANCESTOR_OF_B;

/// Breadth-first colored frontier search: flood-fill from `a` and `b`
/// simultaneously, tagging each visited commit with which root(s) can
/// reach it. Candidates are commits reachable from both; the final filter
/// drops any candidate that is itself an ancestor of another candidate, so
/// only the *nearest* common ancestors are reported (§4.C: "returns
/// multiple ids only when bases are incomparable").
pub fn find_merge_base(commits: &CommitStore, a: ObjectId, b: ObjectId) -> Result<Vec<ObjectId>, Error> {
    if a == b {
        return Ok(vec![a]);
    }

    let mut color: HashMap<ObjectId, u8> = HashMap::new();
    let mut parents_of: HashMap<ObjectId, Vec<ObjectId>> = HashMap::new();
    let mut queue: VecDeque<ObjectId> = VecDeque::new();

    color.insert(a, ANCESTOR_OF_A);
    color.insert(b, ANCESTOR_OF_B);
    queue.push_back(a);
    queue.push_back(b);

    while let Some(id) = queue.pop_front() {
        let my_color = color[&id];
        let commit = commits.load(&id)?.ok_or(Error::NotFound(id))?;
        let parents: Vec<ObjectId> = commit.parents.iter().copied().collect();
        for &parent in &parents {
            let existing = color.get(&parent).copied().unwrap_or(0);
            let merged = existing | my_color;
            if merged != existing {
                color.insert(parent, merged);
                queue.push_back(parent);
            }
        }
        parents_of.insert(id, parents);
    }

    let candidates: Vec<ObjectId> = color.iter().filter(|&(_, &c)| c == BOTH).map(|(&id, _)| id).collect();

    let mut result = Vec::new();
    for &candidate in &candidates {
        let mut dominated = false;
        for &other in &candidates {
            if other != candidate && is_ancestor_within(&parents_of, other, candidate)? {
                dominated = true;
                break;
            }
        }
        if !dominated {
            result.push(candidate);
        }
    }
    Ok(result)
}

/// BFS through a precomputed parent map (limited to the set visited during
/// the merge-base search) — true if `descendant`'s history reaches `ancestor`.
fn is_ancestor_within(
    parents_of: &HashMap<ObjectId, Vec<ObjectId>>,
    descendant: ObjectId,
    ancestor: ObjectId,
) -> Result<bool, Error> {
    let mut visited = HashSet::new();
    let mut queue = VecDeque::from([descendant]);
    visited.insert(descendant);
    while let Some(id) = queue.pop_front() {
        let Some(parents) = parents_of.get(&id) else { continue };
        for &parent in parents {
            if parent == ancestor {
                return Ok(true);
            }
            if visited.insert(parent) {
                queue.push_back(parent);
            }
        }
    }
    Ok(false)
}

/// Bounded BFS from `b` toward `a`: true iff `a` is an ancestor of (or equal
/// to) `b`.
pub fn is_ancestor(commits: &CommitStore, a: ObjectId, b: ObjectId) -> Result<bool, Error> {
    if a == b {
        return Ok(true);
    }
    let mut visited = HashSet::new();
    let mut queue = VecDeque::from([b]);
    visited.insert(b);
    while let Some(id) = queue.pop_front() {
        let commit = commits.load(&id)?.ok_or(Error::NotFound(id))?;
        for parent in commit.parents {
            if parent == a {
                return Ok(true);
            }
            if visited.insert(parent) {
                queue.push_back(parent);
            }
        }
    }
    Ok(false)
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

    fn commit(store: &CommitStore, parents: &[ObjectId]) -> ObjectId {
        store
            .store(&Commit {
                tree: ObjectId::empty_tree(),
                parents: parents.iter().copied().collect(),
                author: Identity::new("A", "a@x", 0, 0),
                committer: Identity::new("A", "a@x", 0, 0),
                encoding: None,
                message: "m".into(),
            })
            .unwrap()
    }

    #[test]
    fn linear_history_is_ancestor() {
        let store = store();
        let c1 = commit(&store, &[]);
        let c2 = commit(&store, &[c1]);
        assert!(is_ancestor(&store, c1, c2).unwrap());
        assert!(!is_ancestor(&store, c2, c1).unwrap());
    }

    #[test]
    fn merge_base_of_diverged_branches() {
        let store = store();
        let base = commit(&store, &[]);
        let left = commit(&store, &[base]);
        let right = commit(&store, &[base]);
        let bases = find_merge_base(&store, left, right).unwrap();
        assert_eq!(bases, vec![base]);
    }

    #[test]
    fn merge_base_of_identical_commits_is_itself() {
        let store = store();
        let c = commit(&store, &[]);
        assert_eq!(find_merge_base(&store, c, c).unwrap(), vec![c]);
    }
}
