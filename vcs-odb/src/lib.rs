//! Component A (raw byte store) and component C (typed object stores).

pub mod error;
pub mod loose;
pub mod memory;
pub mod raw;
pub mod typed;

pub use error::Error;
pub use raw::RawStore;
pub use typed::{BlobStore, CommitStore, TagStore, TreeStore};
