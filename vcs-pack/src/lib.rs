//! Component F (pack file v2 + `.idx` v2 reader/writer) and component G
//! (the GC controller), §4.F/§4.G. Delta instruction handling itself lives
//! in `vcs-delta`; this crate is the on-disk pack container around it.

pub mod data;
pub mod error;
pub mod gc;
pub mod index;
pub mod reader;
pub mod writer;

pub use error::Error;
pub use gc::{prune, run_gc, GcOptions, GcOutcome};
pub use index::{read as read_index, write as write_index, IndexEntry, PackIndex};
pub use reader::{Handle, PackReader};
pub use writer::{FinalizeOutcome, PackWriter};
