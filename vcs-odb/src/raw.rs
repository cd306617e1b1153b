//! Component A: a keyed, opaque byte-stream store. No typing, no framing —
//! callers (component B/C) are responsible for what the bytes mean.

use std::io::{self, Read};
use vcs_hash::ObjectId;

/// A keyed store of opaque byte streams.
///
/// Implementations should stream where their medium allows it (a file on
/// disk, a socket); `put`/`get` accept/return `dyn Read` rather than
/// `Vec<u8>` so a large blob need not be buffered in full by a caller that
/// only wants to copy it through. [`RawStore::iterate`] is the exception:
/// listing keys is assumed cheap and bounded by object count, not size.
pub trait RawStore: Send + Sync {
    fn has(&self, id: &ObjectId) -> bool;

    /// Stores the bytes read from `reader` under `id`. Idempotent: storing
    /// the same id twice must not corrupt previously stored content.
    fn put(&self, id: &ObjectId, reader: &mut dyn Read) -> io::Result<()>;

    /// Returns a stream of the bytes stored under `id`, or `None` if unknown.
    fn get(&self, id: &ObjectId) -> io::Result<Option<Box<dyn Read + Send>>>;

    fn delete(&self, id: &ObjectId) -> io::Result<bool>;

    /// Lists all keys currently stored. Implementation-defined order.
    fn iterate(&self) -> io::Result<Vec<ObjectId>>;
}

/// Convenience helpers built atop the streaming primitives above. Blanket
/// impl so every [`RawStore`] gets these for free.
pub trait RawStoreExt: RawStore {
    fn put_bytes(&self, id: &ObjectId, bytes: &[u8]) -> io::Result<()> {
        let mut cursor = std::io::Cursor::new(bytes);
        self.put(id, &mut cursor)
    }

    fn get_bytes(&self, id: &ObjectId) -> io::Result<Option<Vec<u8>>> {
        match self.get(id)? {
            Some(mut reader) => {
                let mut buf = Vec::new();
                reader.read_to_end(&mut buf)?;
                Ok(Some(buf))
            }
            None => Ok(None),
        }
    }
}

impl<T: RawStore + ?Sized> RawStoreExt for T {}
