//! Component E: the Git delta instruction codec (§4.E). A delta is a
//! sequence of copy/insert instructions prefixed by two size varints (base
//! size, result size); [`apply`] reconstructs a result in full, [`analyze`]
//! builds a random-access map over result offsets, and [`chain`] walks a
//! multi-delta chain to satisfy a partial read without reconstructing every
//! intermediate object in full.

pub mod analyze;
pub mod apply;
pub mod chain;
pub mod encode;
pub mod instruction;

pub use analyze::{analyze, find_instructions_for_range, Analysis, RangeEntry};
pub use apply::apply;
pub use chain::{random_read, Link};
pub use encode::create_delta;
pub use instruction::Instruction;

/// The maximum number of deltas that may chain to a single base before
/// [`chain::random_read`] and [`apply`]-based chain reconstruction refuse
/// to continue (§4.E: "Chain depth is bounded at 50").
pub const MAX_CHAIN_DEPTH: u32 = 50;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum Error {
    #[error("truncated delta stream")]
    Truncated,
    #[error("delta opcode 0x00 is reserved")]
    ZeroOpcode,
    #[error("delta declares a base size of {expected} but the supplied base is {actual} bytes")]
    BaseSizeMismatch { expected: u64, actual: u64 },
    #[error("delta produced {actual} bytes but declared a result size of {expected}")]
    ResultSizeMismatch { expected: u64, actual: u64 },
    #[error("copy instruction references bytes beyond the end of the base object")]
    CopyOutOfBounds,
    #[error("delta chain exceeds the maximum depth of {max}")]
    ChainTooDeep { max: u32 },
}
