//! Component D: named pointers. A ref is either *direct* (points straight
//! at an object id) or *symbolic* (points at another ref name). Storage is
//! tiered loose/packed, with loose always shadowing packed for the same
//! name (§3 invariants).

pub mod memory;
pub mod packed;
pub mod store;

pub use memory::MemoryRefStore;
pub use store::FileRefStore;

use vcs_hash::ObjectId;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("ref {0:?} not found")]
    NotFound(String),
    #[error("symbolic ref chain starting at {0:?} exceeds the depth limit")]
    RefCycle(String),
    #[error("compare-and-swap on {name:?} failed: expected {expected:?}, found {current:?}")]
    CasFailure {
        name: String,
        expected: Option<ObjectId>,
        current: Option<ObjectId>,
    },
    #[error(transparent)]
    PathInvalid(#[from] vcs_path::PathError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("malformed packed-refs file: {0}")]
    CorruptPackedRefs(String),
}

/// The maximum number of symbolic hops [`RefStore::resolve`] will follow
/// before declaring a cycle (§3 invariant: "bounded depth, suggested 5").
pub const MAX_SYMBOLIC_DEPTH: u32 = 5;

/// What a ref currently points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Direct(ObjectId),
    Symbolic(String),
}

/// Which tier a [`Record`] was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Storage {
    Loose,
    Packed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub name: String,
    pub value: Value,
    pub storage: Storage,
    /// For a packed, annotated-tag entry: the commit id the tag peels to.
    pub peeled: Option<ObjectId>,
}

/// The component D interface: implemented once per backend (file-based
/// `.git`, in-memory, or a caller's own SQL/KV schema).
pub trait RefStore {
    /// Loose-wins lookup of a single ref, or `None` if it doesn't exist in
    /// either tier.
    fn get(&self, name: &str) -> Result<Option<Record>, Error>;

    /// Follows symbolic refs to a direct object id, or `None` for a chain
    /// that terminates at a name with no record (a "broken" ref).
    fn resolve(&self, name: &str) -> Result<Option<ObjectId>, Error> {
        let mut current = name.to_string();
        let mut depth = 0u32;
        loop {
            let record = match self.get(&current)? {
                Some(r) => r,
                None => return Ok(None),
            };
            match record.value {
                Value::Direct(id) => return Ok(Some(id)),
                Value::Symbolic(target) => {
                    depth += 1;
                    if depth > MAX_SYMBOLIC_DEPTH {
                        return Err(Error::RefCycle(name.to_string()));
                    }
                    current = target;
                }
            }
        }
    }

    /// Writes (or overwrites) `name` as a direct ref.
    fn set(&self, name: &str, id: ObjectId) -> Result<(), Error>;

    /// Writes (or overwrites) `name` as a symbolic ref pointing at `target`.
    fn set_symbolic(&self, name: &str, target: &str) -> Result<(), Error>;

    /// Atomically (per name) sets `name` to `new` iff its current direct
    /// value equals `expected` (`None` means "must not currently exist").
    fn compare_and_swap(&self, name: &str, expected: Option<ObjectId>, new: ObjectId) -> Result<(), Error>;

    /// Removes both loose and packed entries for `name`. File-backed
    /// implementations must prune now-empty parent directories but never
    /// remove the root `refs/` directory itself.
    fn remove(&self, name: &str) -> Result<bool, Error>;

    /// Lists every ref (loose-overrides-packed, deduplicated), optionally
    /// restricted to those starting with `prefix`.
    fn list(&self, prefix: Option<&str>) -> Result<Vec<Record>, Error>;

    /// Migrates loose direct refs into the packed table, removing their
    /// loose copies. Symbolic refs (including `HEAD`) are never packed.
    fn optimize(&self) -> Result<(), Error>;
}
