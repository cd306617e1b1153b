//! The embeddable façade (§2): wires the object database (components A-C),
//! refs (D), staging (H), delta/pack (E-G), traversal (K), blame (J), and
//! the worktree façade (I) into one `Repository` applications construct
//! against a chosen backend — in-memory, a native `.git` directory, or a
//! caller's own store behind [`vcs_odb::RawStore`]/[`vcs_ref::RefStore`].

pub mod error;
pub mod repository;

pub use error::Error;
pub use repository::{ObjectDb, Repository};
