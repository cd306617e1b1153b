//! Object kinds, the `<kind> SP size NUL body` framing codec (§4.B), and
//! typed blob/tree/commit/tag record parsing & serialization (§4.C bodies).

pub mod codec;
pub mod commit;
pub mod identity;
pub mod tag;
pub mod tree;

pub use codec::{decode_header, encode_header, Error as CorruptObject, IdComputer};
pub use commit::Commit;
pub use identity::Identity;
pub use tag::Tag;
pub use tree::{Entry as TreeEntry, Mode, Tree};

/// The kind of an object, tagged rather than expressed as a class
/// hierarchy (§9 design note: "polymorphism over kinds").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Blob,
    Tree,
    Commit,
    Tag,
}

impl Kind {
    pub const fn as_bytes(self) -> &'static [u8] {
        match self {
            Kind::Blob => b"blob",
            Kind::Tree => b"tree",
            Kind::Commit => b"commit",
            Kind::Tag => b"tag",
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Kind::Blob => "blob",
            Kind::Tree => "tree",
            Kind::Commit => "commit",
            Kind::Tag => "tag",
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        Some(match bytes {
            b"blob" => Kind::Blob,
            b"tree" => Kind::Tree,
            b"commit" => Kind::Commit,
            b"tag" => Kind::Tag,
            _ => return None,
        })
    }
}

impl std::fmt::Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
