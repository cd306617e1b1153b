use crate::ObjectId;
use sha1::{Digest, Sha1};

/// Incremental hasher so callers can feed an object's framed bytes in chunks
/// without materializing the whole stream, per the spec's streaming
/// requirement on §4.B's codec.
#[derive(Default)]
pub struct Hasher {
    inner: Sha1,
}

impl Hasher {
    pub fn new() -> Self {
        Self { inner: Sha1::new() }
    }

    pub fn update(&mut self, bytes: &[u8]) {
        self.inner.update(bytes);
    }

    pub fn finish(self) -> ObjectId {
        let digest = self.inner.finalize();
        ObjectId::from_bytes(&digest).expect("sha1 digest is exactly 20 bytes")
    }
}
