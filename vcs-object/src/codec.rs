//! The object framing codec (§4.B): the only place object ids are computed.
//! `kind SP size NUL body`. Streaming-friendly: [`IdComputer`] lets a caller
//! feed the body in chunks while the header is hashed up front.

use crate::Kind;
use vcs_hash::{Hasher, ObjectId};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum Error {
    #[error("object header is malformed")]
    MalformedHeader,
    #[error("unknown object kind {0:?}")]
    UnknownKind(String),
    #[error("declared size {declared} does not match body length {actual}")]
    SizeMismatch { declared: usize, actual: usize },
    #[error("truncated object: expected {expected} header bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },
}

/// Builds the ASCII header `kind SP size NUL`.
pub fn encode_header(kind: Kind, size: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(kind.as_bytes().len() + 12);
    out.extend_from_slice(kind.as_bytes());
    out.push(b' ');
    out.extend_from_slice(size.to_string().as_bytes());
    out.push(0);
    out
}

/// Parses the header at the start of `framed`, returning the kind, declared
/// body size, and the header's length in bytes (so the caller can slice
/// `framed[header_len..]` for the body).
pub fn decode_header(framed: &[u8]) -> Result<(Kind, usize, usize), Error> {
    let space = framed.iter().position(|&b| b == b' ').ok_or(Error::MalformedHeader)?;
    let kind = Kind::from_bytes(&framed[..space])
        .ok_or_else(|| Error::UnknownKind(String::from_utf8_lossy(&framed[..space]).into_owned()))?;
    let nul = framed[space..]
        .iter()
        .position(|&b| b == 0)
        .ok_or(Error::MalformedHeader)?
        + space;
    let size_str = std::str::from_utf8(&framed[space + 1..nul]).map_err(|_| Error::MalformedHeader)?;
    let size: usize = size_str.parse().map_err(|_| Error::MalformedHeader)?;
    Ok((kind, size, nul + 1))
}

/// Parses and validates a fully framed object, returning its kind and body
/// slice. Fails if the declared size disagrees with the actual body length.
pub fn decode(framed: &[u8]) -> Result<(Kind, &[u8]), Error> {
    let (kind, size, header_len) = decode_header(framed)?;
    let body = &framed[header_len..];
    if body.len() != size {
        return Err(Error::SizeMismatch {
            declared: size,
            actual: body.len(),
        });
    }
    Ok((kind, body))
}

/// Frames `body` under `kind` and returns the bytes plus their canonical id.
pub fn encode(kind: Kind, body: &[u8]) -> (Vec<u8>, ObjectId) {
    let mut framed = encode_header(kind, body.len());
    framed.extend_from_slice(body);
    let mut hasher = Hasher::new();
    hasher.update(&framed);
    (framed, hasher.finish())
}

/// Computes just the id of `kind`/`body` without retaining the framed bytes,
/// the common case for typed stores that persist `body` unframed (e.g. a
/// loose blob backend storing raw bytes).
pub fn compute_id(kind: Kind, body: &[u8]) -> ObjectId {
    let mut hasher = Hasher::new();
    hasher.update(&encode_header(kind, body.len()));
    hasher.update(body);
    hasher.finish()
}

/// Incremental id computation for streaming bodies: construct with the
/// kind and total size up front (both are part of the header), then feed
/// body chunks as they become available without buffering them.
pub struct IdComputer {
    hasher: Hasher,
}

impl IdComputer {
    pub fn new(kind: Kind, size: usize) -> Self {
        let mut hasher = Hasher::new();
        hasher.update(&encode_header(kind, size));
        IdComputer { hasher }
    }

    pub fn update(&mut self, chunk: &[u8]) {
        self.hasher.update(chunk);
    }

    pub fn finish(self) -> ObjectId {
        self.hasher.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_blob_has_well_known_id() {
        let (_, id) = encode(Kind::Blob, b"");
        assert_eq!(id, ObjectId::empty_blob());
    }

    #[test]
    fn streaming_id_matches_oneshot() {
        let body = b"hello, world!";
        let (_, oneshot) = encode(Kind::Blob, body);
        let mut streaming = IdComputer::new(Kind::Blob, body.len());
        streaming.update(&body[..5]);
        streaming.update(&body[5..]);
        assert_eq!(streaming.finish(), oneshot);
    }

    #[test]
    fn size_mismatch_is_corrupt() {
        let mut framed = encode_header(Kind::Blob, 5);
        framed.extend_from_slice(b"ab");
        assert!(matches!(decode(&framed), Err(Error::SizeMismatch { .. })));
    }

    #[test]
    fn malformed_header_has_no_nul() {
        assert!(matches!(decode_header(b"blob 3 abc"), Err(Error::MalformedHeader)));
    }
}
