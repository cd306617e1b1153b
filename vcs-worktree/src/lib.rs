//! Component I: the working-copy façade (§4.I). A `WorkingCopy` ties a
//! history (object stores + refs) to a checkout (HEAD + operation state +
//! staging) and a worktree (file-system view): HEAD resolution, the
//! in-progress operation-state markers and their capability matrix,
//! checkout conflict detection, status, stash, and `.gitignore`/
//! `info/exclude` combination (layered on `vcs-path`'s matcher).

pub mod checkout;
pub mod fs;
pub mod head;
pub mod ignore;
pub mod stash;
pub mod state;
pub mod status;

pub use checkout::{detect_conflicts, Conflict, ConflictKind};
pub use fs::{FsWorktree, Worktree};
pub use head::{Head, HeadTarget};
pub use state::{Capabilities, OperationState};
pub use status::{status, StatusEntry, StatusKind};

use vcs_hash::ObjectId;

pub const HEAD_NAME: &str = "HEAD";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("operation not permitted in the current repository state: {0}")]
    IllegalState(&'static str),
    #[error(transparent)]
    Ref(#[from] vcs_ref::Error),
    #[error(transparent)]
    Odb(#[from] vcs_odb::Error),
    #[error(transparent)]
    Index(#[from] vcs_index::Error),
    #[error(transparent)]
    PathInvalid(#[from] vcs_path::PathError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("object {0} not found")]
    NotFound(ObjectId),
}
