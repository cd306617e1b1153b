//! Content-addressed object identifiers.
//!
//! The design note in the spec leaves room for a second, longer hash; we
//! commit to SHA-1 as [`Kind::Sha1`] is presently the only variant computed,
//! but [`ObjectId`] carries its [`Kind`] so a second algorithm can be added
//! without changing callers that only compare/hex-encode ids.

use std::fmt;
use std::str::FromStr;

mod hasher;
pub use hasher::Hasher;

/// The hash algorithm backing an [`ObjectId`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde1", derive(serde::Serialize, serde::Deserialize))]
pub enum Kind {
    Sha1,
}

impl Kind {
    pub const fn len_in_bytes(self) -> usize {
        match self {
            Kind::Sha1 => 20,
        }
    }

    pub const fn len_in_hex(self) -> usize {
        self.len_in_bytes() * 2
    }
}

/// Error produced when constructing an [`ObjectId`] from untrusted bytes or text.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("expected {expected} bytes for a {kind:?} id, got {actual}")]
    WrongByteLength {
        kind: Kind,
        expected: usize,
        actual: usize,
    },
    #[error("invalid hex object id: {0}")]
    InvalidHex(#[from] hex::FromHexError),
}

/// An owned, content-addressed object id (SHA-1 of the object's framed bytes).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId {
    bytes: [u8; Kind::Sha1.len_in_bytes()],
}

/// The well-known id of the empty tree.
pub const EMPTY_TREE_HEX: &str = "4b825dc642cb6eb9a060e54bf8d69288fbee4904";
/// The well-known id of the empty blob.
pub const EMPTY_BLOB_HEX: &str = "e69de29bb2d1d6434b8b29ae775ad8c2e48c5391";

impl ObjectId {
    pub const fn kind(&self) -> Kind {
        Kind::Sha1
    }

    /// The all-zero id, used as a sentinel (e.g. "no object" in a tree entry
    /// under construction, or CAS's "expect absent").
    pub const fn null() -> Self {
        ObjectId {
            bytes: [0u8; Kind::Sha1.len_in_bytes()],
        }
    }

    pub fn is_null(&self) -> bool {
        self.bytes.iter().all(|&b| b == 0)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.len() != Kind::Sha1.len_in_bytes() {
            return Err(Error::WrongByteLength {
                kind: Kind::Sha1,
                expected: Kind::Sha1.len_in_bytes(),
                actual: bytes.len(),
            });
        }
        let mut out = [0u8; Kind::Sha1.len_in_bytes()];
        out.copy_from_slice(bytes);
        Ok(ObjectId { bytes: out })
    }

    pub fn from_hex(hex_str: &str) -> Result<Self, Error> {
        let mut out = [0u8; Kind::Sha1.len_in_bytes()];
        hex::decode_to_slice(hex_str, &mut out)?;
        Ok(ObjectId { bytes: out })
    }

    pub fn empty_tree() -> Self {
        Self::from_hex(EMPTY_TREE_HEX).expect("well-known constant is valid hex")
    }

    pub fn empty_blob() -> Self {
        Self::from_hex(EMPTY_BLOB_HEX).expect("well-known constant is valid hex")
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.to_hex())
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for ObjectId {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl AsRef<[u8]> for ObjectId {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

#[cfg(feature = "serde1")]
impl serde::Serialize for ObjectId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

#[cfg(feature = "serde1")]
impl<'de> serde::Deserialize<'de> for ObjectId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        ObjectId::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_tree_roundtrips() {
        let id = ObjectId::empty_tree();
        assert_eq!(id.to_hex(), EMPTY_TREE_HEX);
        assert_eq!(ObjectId::from_hex(EMPTY_TREE_HEX).unwrap(), id);
    }

    #[test]
    fn null_is_null() {
        assert!(ObjectId::null().is_null());
        assert!(!ObjectId::empty_tree().is_null());
    }

    #[test]
    fn wrong_length_is_rejected() {
        assert!(matches!(
            ObjectId::from_bytes(&[0u8; 19]),
            Err(Error::WrongByteLength { .. })
        ));
    }

    #[test]
    fn ordering_is_byte_order() {
        let a = ObjectId::from_bytes(&[0u8; 20]).unwrap();
        let b = ObjectId::from_bytes(&{
            let mut v = [0u8; 20];
            v[19] = 1;
            v
        })
        .unwrap();
        assert!(a < b);
    }
}
