//! Small ambient facilities used by the long-running parts of vcs-core
//! (GC, pack writing, index writing): progress reporting, chunked
//! parallel iteration, and checksum helpers. Grounded in the teacher's
//! `git_features::{progress, parallel, hash}` module used throughout
//! `git-odb/src/pack/*`.

pub mod cancel;
pub mod hash;
pub mod parallel;
pub mod progress;

pub use cancel::CancelToken;
pub use progress::Progress;
