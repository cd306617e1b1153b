//! The `Repository` facade: a history (object stores + refs) plus a
//! checkout (HEAD + staging) plus, optionally, a worktree — the three
//! pieces §4.I names as what a working copy references.

use crate::Error;
use std::path::PathBuf;
use std::sync::Arc;
use vcs_blame::{BlameResult, Options as BlameOptions};
use vcs_hash::ObjectId;
use vcs_index::Index;
use vcs_object::{Commit, Identity};
use vcs_odb::raw::RawStore;
use vcs_odb::memory::InMemoryStore;
use vcs_odb::{BlobStore, CommitStore, TagStore, TreeStore};
use vcs_ref::{FileRefStore, MemoryRefStore, RefStore};
use vcs_worktree::checkout::{self, CheckOptions, Conflict};
use vcs_worktree::fs::Worktree;
use vcs_worktree::head::{Head, HeadTarget};
use vcs_worktree::status::{self, StatusEntry};
use vcs_worktree::ignore::IgnoreLookup;

/// Bundles the object database's four typed stores over one shared raw
/// store, the way a `.git/objects` directory backs all four kinds.
#[derive(Clone)]
pub struct ObjectDb {
    pub raw: Arc<dyn RawStore>,
    pub blobs: BlobStore,
    pub trees: TreeStore,
    pub commits: CommitStore,
    pub tags: TagStore,
}

impl ObjectDb {
    pub fn new(raw: Arc<dyn RawStore>) -> Self {
        ObjectDb {
            blobs: BlobStore::new(raw.clone()),
            trees: TreeStore::new(raw.clone()),
            commits: CommitStore::new(raw.clone()),
            tags: TagStore::new(raw.clone()),
            raw,
        }
    }
}

/// The embeddable façade: a `Repository` applications construct against a
/// chosen backend (in-memory for tests/embedding, file-based `.git` for a
/// native-compatible checkout; a SQL or KV backend is just another
/// `Arc<dyn RawStore>` + `Arc<dyn RefStore>` pair).
pub struct Repository {
    pub odb: ObjectDb,
    pub refs: Arc<dyn RefStore>,
    pub index: Index,
    /// Present for a non-bare repository; `None` for a bare one (§4.I:
    /// bare repositories cannot checkout, commit against a worktree, etc. —
    /// modeled here by simply having no worktree to act on).
    pub worktree: Option<Box<dyn Worktree>>,
    /// The control directory (`.git`) state markers are read from, for
    /// file-backed repositories; `None` for pure in-memory ones.
    pub control_dir: Option<PathBuf>,
}

impl Repository {
    /// A from-scratch, fully in-memory repository: no filesystem at all.
    /// `HEAD` starts as an unborn symbolic ref to `refs/heads/main`.
    pub fn init_in_memory() -> Self {
        let raw: Arc<dyn RawStore> = Arc::new(InMemoryStore::new());
        let refs: Arc<dyn RefStore> = Arc::new(MemoryRefStore::new());
        refs.set_symbolic(vcs_worktree::HEAD_NAME, "refs/heads/main")
            .expect("HEAD is always a valid ref name");
        Repository {
            odb: ObjectDb::new(raw),
            refs,
            index: Index::new(),
            worktree: None,
            control_dir: None,
        }
    }

    /// Opens (initializing if absent) a file-backed repository rooted at
    /// `git_dir` (what would be `.git`), with loose objects under
    /// `git_dir/objects` and a worktree at `work_dir`.
    pub fn init_file_backend(git_dir: impl Into<PathBuf>, work_dir: impl Into<PathBuf>) -> Result<Self, Error> {
        let git_dir = git_dir.into();
        let raw: Arc<dyn RawStore> = Arc::new(vcs_odb::loose::LooseStore::at(git_dir.join("objects"))?);
        let refs: Arc<dyn RefStore> = Arc::new(FileRefStore::init(&git_dir)?);
        if refs.get(vcs_worktree::HEAD_NAME)?.is_none() {
            refs.set_symbolic(vcs_worktree::HEAD_NAME, "refs/heads/main")?;
        }
        let index_path = git_dir.join("index");
        let index = if index_path.is_file() {
            Index::read(&index_path)?
        } else {
            Index::new()
        };
        Ok(Repository {
            odb: ObjectDb::new(raw),
            refs,
            index,
            worktree: Some(Box::new(vcs_worktree::fs::FsWorktree::new(work_dir.into()))),
            control_dir: Some(git_dir),
        })
    }

    pub fn head(&self) -> Head<'_> {
        Head::new(self.refs.as_ref())
    }

    /// The commit `HEAD` currently resolves to, or `None` for an unborn
    /// branch / broken symbolic chain.
    pub fn head_commit(&self) -> Result<Option<ObjectId>, Error> {
        Ok(self.refs.resolve(vcs_worktree::HEAD_NAME)?)
    }

    /// This repository's in-progress operation state, read from
    /// `control_dir`'s marker files (§4.I); `Bare` if there is no
    /// control directory to read markers from.
    pub fn operation_state(&self) -> Result<vcs_worktree::state::OperationState, Error> {
        match &self.control_dir {
            Some(dir) => Ok(vcs_worktree::state::detect(dir, self.index.has_conflicts())?),
            None => Ok(vcs_worktree::state::OperationState::Bare),
        }
    }

    /// Flow H -> C (trees) -> C (commits) -> D (ref update): builds a tree
    /// from the current index, creates a commit with `HEAD` as its sole
    /// parent (or none, for the first commit), and CAS-updates the current
    /// branch (or detached `HEAD`) to point at it.
    ///
    /// Refuses when the repository state forbids committing (§4.I
    /// capability matrix) or the index has unresolved conflicts.
    pub fn commit(&mut self, message: impl Into<bstr::BString>, author: Identity, committer: Identity) -> Result<ObjectId, Error> {
        if !self.operation_state()?.capabilities().can_commit {
            return Err(vcs_worktree::Error::IllegalState("commit is not permitted in the current repository state").into());
        }
        let tree = self.index.write_tree(&self.odb.trees)?;
        let parent = self.head_commit()?;
        if let Some(parent_id) = parent {
            let parent_commit = self.odb.commits.load(&parent_id)?.ok_or(vcs_worktree::Error::NotFound(parent_id))?;
            if parent_commit.tree == tree {
                return Err(Error::NothingToCommit);
            }
        }

        let commit_id = self.odb.commits.store(&Commit {
            tree,
            parents: parent.into_iter().collect(),
            author,
            committer,
            encoding: None,
            message: message.into(),
        })?;

        match self.head().get_or_unborn_name()? {
            HeadRoute::Branch(name) => {
                self.refs.compare_and_swap(&name, parent, commit_id)?;
            }
            HeadRoute::Detached => {
                self.refs.set(vcs_worktree::HEAD_NAME, commit_id)?;
            }
        }
        Ok(commit_id)
    }

    /// Detects checkout conflicts (§4.I) between the current `HEAD` tree
    /// and `target_commit`'s tree; if none, loads `target_commit`'s tree
    /// into the index and moves `HEAD`.
    pub fn checkout(&mut self, target_commit: ObjectId, options: CheckOptions<'_>) -> Result<(), Error> {
        let target = self.odb.commits.load(&target_commit)?.ok_or(vcs_worktree::Error::NotFound(target_commit))?;
        let head_tree = match self.head_commit()? {
            Some(id) => self.odb.commits.load(&id)?.map(|c| c.tree).unwrap_or_else(vcs_hash::ObjectId::empty_tree),
            None => vcs_hash::ObjectId::empty_tree(),
        };

        if let Some(worktree) = &self.worktree {
            let conflicts: Vec<Conflict> =
                checkout::detect_conflicts(&self.odb.trees, &self.odb.blobs, head_tree, target.tree, &self.index, worktree.as_ref(), options)?;
            if !conflicts.is_empty() {
                return Err(Error::CheckoutConflicts(conflicts.len()));
            }
        }

        self.index.read_tree(
            &self.odb.trees,
            target.tree,
            vcs_index::tree_io::ReadTreeOptions::default(),
        )?;
        self.head().detach(target_commit)?;
        Ok(())
    }

    /// Component J, wired against this repository's stores.
    pub fn blame(&self, start_commit: ObjectId, path: &[u8], options: BlameOptions) -> Result<BlameResult, Error> {
        Ok(vcs_blame::blame(&self.odb.commits, &self.odb.trees, &self.odb.blobs, start_commit, path, options)?)
    }

    pub fn walk_ancestry(&self, starts: &[ObjectId], options: vcs_traverse::WalkOptions) -> Result<Vec<ObjectId>, Error> {
        Ok(vcs_traverse::walk_ancestry(&self.odb.commits, starts, options)?)
    }

    pub fn is_ancestor(&self, ancestor: ObjectId, descendant: ObjectId) -> Result<bool, Error> {
        Ok(vcs_traverse::is_ancestor(&self.odb.commits, ancestor, descendant)?)
    }

    pub fn find_merge_base(&self, a: ObjectId, b: ObjectId) -> Result<Vec<ObjectId>, Error> {
        Ok(vcs_traverse::find_merge_base(&self.odb.commits, a, b)?)
    }

    /// Component K: every object reachable from `wants` but not `haves`.
    pub fn reachable(&self, wants: &[ObjectId], haves: &[ObjectId]) -> Result<Vec<(vcs_object::Kind, ObjectId)>, Error> {
        Ok(vcs_traverse::reachable(&self.odb.commits, &self.odb.trees, wants, haves)?)
    }

    /// Component G: packs every object reachable from `roots`. Pruning the
    /// now-packed loose originals is a separate, explicit call per §9's
    /// open question — see [`vcs_pack::prune`].
    pub fn gc(&self, roots: &[ObjectId], options: vcs_pack::GcOptions) -> Result<vcs_pack::GcOutcome, Error> {
        Ok(vcs_pack::run_gc(self.odb.raw.as_ref(), &self.odb.commits, &self.odb.trees, roots, options)?)
    }

    /// Status against `HEAD`'s tree, the current index, and `worktree_paths`
    /// (the caller's enumeration of on-disk files; this crate does not walk
    /// a filesystem tree itself).
    pub fn status(&self, ignored: &dyn IgnoreLookup, worktree_paths: &[String]) -> Result<Vec<StatusEntry>, Error> {
        let worktree = self.worktree.as_deref().ok_or(vcs_worktree::Error::IllegalState("status requires a worktree"))?;
        let head_tree = match self.head_commit()? {
            Some(id) => self.odb.commits.load(&id)?.map(|c| c.tree),
            None => None,
        };
        Ok(status::status(&self.odb.trees, &self.odb.blobs, head_tree, &self.index, worktree, ignored, worktree_paths)?)
    }
}

/// Where `HEAD` is routed for a commit update: at a branch name (CAS'd) or
/// directly (detached, overwritten unconditionally since there is no
/// shared branch name to race on).
enum HeadRoute {
    Branch(String),
    Detached,
}

trait HeadRouteExt {
    fn get_or_unborn_name(&self) -> Result<HeadRoute, Error>;
}

impl HeadRouteExt for Head<'_> {
    fn get_or_unborn_name(&self) -> Result<HeadRoute, Error> {
        Ok(match self.get()? {
            HeadTarget::Branch { name, .. } | HeadTarget::Unborn { name } => HeadRoute::Branch(name),
            HeadTarget::Detached(_) => HeadRoute::Detached,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vcs_object::tree::Mode;
    use vcs_worktree::ignore::NeverIgnore;

    fn identity() -> Identity {
        Identity::new("A U Thor", "a@x.example", 1_700_000_000, 0)
    }

    #[test]
    fn linear_commit_chain_matches_scenario_1() {
        let mut repo = Repository::init_in_memory();
        let blob1 = repo.odb.blobs.store_bytes(b"# R\n").unwrap();
        repo.index.set_entry(vcs_index::Entry::new("README.md", Mode::File, blob1));
        let c1 = repo.commit("init", identity(), identity()).unwrap();

        let blob2 = repo.odb.blobs.store_bytes(b"# R\nmore\n").unwrap();
        repo.index.set_entry(vcs_index::Entry::new("README.md", Mode::File, blob2));
        let c2 = repo.commit("add", identity(), identity()).unwrap();

        let ancestry = repo.walk_ancestry(&[c2], vcs_traverse::WalkOptions::default()).unwrap();
        assert_eq!(ancestry, vec![c2, c1]);
        assert!(repo.is_ancestor(c1, c2).unwrap());
        assert!(!repo.is_ancestor(c2, c1).unwrap());
    }

    #[test]
    fn committing_with_no_index_changes_is_a_noop_error() {
        let mut repo = Repository::init_in_memory();
        let blob = repo.odb.blobs.store_bytes(b"x").unwrap();
        repo.index.set_entry(vcs_index::Entry::new("f.txt", Mode::File, blob));
        repo.commit("first", identity(), identity()).unwrap();
        let err = repo.commit("again, nothing changed", identity(), identity()).unwrap_err();
        assert!(matches!(err, Error::NothingToCommit));
    }

    #[test]
    fn status_reports_untracked_file_against_empty_history() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init_file_backend(dir.path().join(".git"), dir.path()).unwrap();
        let result = repo.status(&NeverIgnore, &["new.txt".to_string()]).unwrap();
        assert_eq!(result, vec![vcs_worktree::StatusEntry {
            path: "new.txt".into(),
            kind: vcs_worktree::StatusKind::Untracked,
        }]);
    }
}
