//! Path validation and resolution shared by the object/tree/index layers,
//! plus `.gitignore`-style pattern matching used by the worktree façade.

pub mod ignore;
pub mod realpath;
pub mod validate;

pub use ignore::{IgnoreStack, Pattern};
pub use realpath::{realpath, Error as RealpathError};
pub use validate::{validate_component, Error as PathError};
