//! Read-only graph traversals over commits and trees: ancestry walk,
//! merge-base, `is_ancestor` (the "additional commit operations" of §4.C),
//! and component K's reachability search feeding pack writing. Both commit
//! parents and the reachability walk carry an explicit visited set and a
//! bounded frontier, per §9's "cyclic graph avoidance" design note.

pub mod ancestry;
pub mod merge_base;
pub mod reachability;

pub use ancestry::{walk_ancestry, WalkOptions};
pub use merge_base::{find_merge_base, is_ancestor};
pub use reachability::reachable;

use vcs_hash::ObjectId;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("object {0} not found while traversing")]
    NotFound(ObjectId),
    #[error(transparent)]
    Store(#[from] vcs_odb::Error),
}
