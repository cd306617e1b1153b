//! A crate-spanning error that aggregates every sub-crate's error type with
//! `#[from]`, the way gitoxide's facade crate aggregates its sub-crates'
//! errors into one enum for embedding applications to match on.

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Hash(#[from] vcs_hash::Error),
    #[error(transparent)]
    Odb(#[from] vcs_odb::Error),
    #[error(transparent)]
    Ref(#[from] vcs_ref::Error),
    #[error(transparent)]
    Delta(#[from] vcs_delta::Error),
    #[error(transparent)]
    Pack(#[from] vcs_pack::Error),
    #[error(transparent)]
    Traverse(#[from] vcs_traverse::Error),
    #[error(transparent)]
    Index(#[from] vcs_index::Error),
    #[error(transparent)]
    Blame(#[from] vcs_blame::Error),
    #[error(transparent)]
    Worktree(#[from] vcs_worktree::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("nothing to commit: the index matches HEAD's tree")]
    NothingToCommit,
    #[error("checkout refused: {0} conflicting path(s) would be overwritten or lost")]
    CheckoutConflicts(usize),
}
