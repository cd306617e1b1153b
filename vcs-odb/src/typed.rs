//! Component C: typed, content-addressed stores layered over a shared
//! [`RawStore`] (component A) through the codec (component B). Blobs and
//! trees stream; commits and tags are small enough to be record types.
//!
//! All four share one backing [`RawStore`] the way a Git `objects/`
//! directory holds every kind under one fanout: since the kind tag is part
//! of the framed bytes that get hashed, a blob and a tree can never collide
//! on id, so `has`/`load`/`keys` can safely peek the stored header to
//! confirm (or filter by) kind.

use crate::error::Error;
use crate::raw::{RawStore, RawStoreExt};
use smallvec::SmallVec;
use std::io::{Cursor, Read, Seek, SeekFrom, Write};
use std::sync::Arc;
use vcs_hash::ObjectId;
use vcs_object::{codec, Commit, Kind, Tag, Tree, TreeEntry};

/// Streams `body` (of declared `size`) through the framing codec into a
/// temp file while hashing incrementally, then hands the rewound temp file
/// to `raw.put` under the computed id — the same temp-file-then-place
/// pattern `LooseStore` uses for the compressed side, kept here so the
/// plaintext side never needs a second full-size buffer either.
fn store_streamed(raw: &dyn RawStore, kind: Kind, size: usize, body: &mut dyn Read) -> Result<ObjectId, Error> {
    let header = codec::encode_header(kind, size);
    let mut id_computer = codec::IdComputer::new(kind, size);
    let mut tmp = tempfile::tempfile()?;
    tmp.write_all(&header)?;

    let mut buf = [0u8; 64 * 1024];
    let mut read_total = 0usize;
    loop {
        let n = body.read(&mut buf)?;
        if n == 0 {
            break;
        }
        id_computer.update(&buf[..n]);
        tmp.write_all(&buf[..n])?;
        read_total += n;
    }
    if read_total != size {
        return Err(codec::Error::SizeMismatch {
            declared: size,
            actual: read_total,
        }
        .into());
    }

    let id = id_computer.finish();
    tmp.seek(SeekFrom::Start(0))?;
    raw.put(&id, &mut tmp)?;
    Ok(id)
}

/// Loads the framed bytes under `id`, validates the header against `kind`,
/// and returns a reader positioned at the start of the body — the leading
/// bytes already consumed while parsing the header are chained back in so
/// the caller still sees every body byte via one `Read`.
fn load_body_of_kind(raw: &dyn RawStore, id: &ObjectId, kind: Kind) -> Result<Option<Box<dyn Read + Send>>, Error> {
    let mut reader = match raw.get(id)? {
        Some(r) => r,
        None => return Ok(None),
    };
    let mut header = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        let n = reader.read(&mut byte)?;
        if n == 0 {
            return Err(codec::Error::MalformedHeader.into());
        }
        header.push(byte[0]);
        if byte[0] == 0 {
            break;
        }
    }
    let (found_kind, _size, _header_len) = codec::decode_header(&header)?;
    if found_kind != kind {
        return Ok(None);
    }
    Ok(Some(Box::new(reader) as Box<dyn Read + Send>))
}

fn load_bytes_of_kind(raw: &dyn RawStore, id: &ObjectId, kind: Kind) -> Result<Option<Vec<u8>>, Error> {
    match load_body_of_kind(raw, id, kind)? {
        Some(mut r) => {
            let mut buf = Vec::new();
            r.read_to_end(&mut buf)?;
            Ok(Some(buf))
        }
        None => Ok(None),
    }
}

fn peeked_kind(raw: &dyn RawStore, id: &ObjectId) -> Option<Kind> {
    let bytes = raw.get_bytes(id).ok()??;
    let space = bytes.iter().position(|&b| b == b' ')?;
    Kind::from_bytes(&bytes[..space])
}

fn keys_of_kind(raw: &dyn RawStore, kind: Kind) -> Result<Vec<ObjectId>, Error> {
    Ok(raw
        .iterate()?
        .into_iter()
        .filter(|id| peeked_kind(raw, id) == Some(kind))
        .collect())
}

/// Component C over blob bodies: opaque bytes, streamed in both directions.
#[derive(Clone)]
pub struct BlobStore {
    raw: Arc<dyn RawStore>,
}

impl BlobStore {
    pub fn new(raw: Arc<dyn RawStore>) -> Self {
        BlobStore { raw }
    }

    pub fn store(&self, size: usize, body: &mut dyn Read) -> Result<ObjectId, Error> {
        store_streamed(self.raw.as_ref(), Kind::Blob, size, body)
    }

    pub fn store_bytes(&self, bytes: &[u8]) -> Result<ObjectId, Error> {
        self.store(bytes.len(), &mut Cursor::new(bytes))
    }

    pub fn load(&self, id: &ObjectId) -> Result<Option<Box<dyn Read + Send>>, Error> {
        load_body_of_kind(self.raw.as_ref(), id, Kind::Blob)
    }

    pub fn load_bytes(&self, id: &ObjectId) -> Result<Option<Vec<u8>>, Error> {
        load_bytes_of_kind(self.raw.as_ref(), id, Kind::Blob)
    }

    pub fn has(&self, id: &ObjectId) -> bool {
        peeked_kind(self.raw.as_ref(), id) == Some(Kind::Blob)
    }

    pub fn remove(&self, id: &ObjectId) -> Result<bool, Error> {
        if !self.has(id) {
            return Ok(false);
        }
        Ok(self.raw.delete(id)?)
    }

    pub fn keys(&self) -> Result<Vec<ObjectId>, Error> {
        keys_of_kind(self.raw.as_ref(), Kind::Blob)
    }
}

/// Component C over tree bodies: stores sort-and-dedup a caller's entry
/// sequence (duplicate names are a fatal error, per §4.C).
#[derive(Clone)]
pub struct TreeStore {
    raw: Arc<dyn RawStore>,
}

impl TreeStore {
    pub fn new(raw: Arc<dyn RawStore>) -> Self {
        TreeStore { raw }
    }

    pub fn store(&self, entries: Vec<TreeEntry>) -> Result<ObjectId, Error> {
        let tree = Tree::from_entries(entries)?;
        let body = tree.serialize();
        store_streamed(self.raw.as_ref(), Kind::Tree, body.len(), &mut Cursor::new(body))
    }

    pub fn load(&self, id: &ObjectId) -> Result<Option<Tree>, Error> {
        match load_bytes_of_kind(self.raw.as_ref(), id, Kind::Tree)? {
            Some(body) => Ok(Some(Tree::parse(&body)?)),
            None => Ok(None),
        }
    }

    pub fn has(&self, id: &ObjectId) -> bool {
        peeked_kind(self.raw.as_ref(), id) == Some(Kind::Tree)
    }

    pub fn remove(&self, id: &ObjectId) -> Result<bool, Error> {
        if !self.has(id) {
            return Ok(false);
        }
        Ok(self.raw.delete(id)?)
    }

    pub fn keys(&self) -> Result<Vec<ObjectId>, Error> {
        keys_of_kind(self.raw.as_ref(), Kind::Tree)
    }
}

/// Component C over commit records, plus the header-only reads (`§4.C`:
/// "cheap header-only reads") that `vcs-traverse`'s ancestry walk relies on
/// so it never has to parse author/committer/message just to get parents.
#[derive(Clone)]
pub struct CommitStore {
    raw: Arc<dyn RawStore>,
}

impl CommitStore {
    pub fn new(raw: Arc<dyn RawStore>) -> Self {
        CommitStore { raw }
    }

    pub fn store(&self, commit: &Commit) -> Result<ObjectId, Error> {
        let body = commit.serialize();
        store_streamed(self.raw.as_ref(), Kind::Commit, body.len(), &mut Cursor::new(body))
    }

    pub fn load(&self, id: &ObjectId) -> Result<Option<Commit>, Error> {
        match load_bytes_of_kind(self.raw.as_ref(), id, Kind::Commit)? {
            Some(body) => Ok(Some(Commit::parse(&body)?)),
            None => Ok(None),
        }
    }

    pub fn has(&self, id: &ObjectId) -> bool {
        peeked_kind(self.raw.as_ref(), id) == Some(Kind::Commit)
    }

    pub fn remove(&self, id: &ObjectId) -> Result<bool, Error> {
        if !self.has(id) {
            return Ok(false);
        }
        Ok(self.raw.delete(id)?)
    }

    pub fn keys(&self) -> Result<Vec<ObjectId>, Error> {
        keys_of_kind(self.raw.as_ref(), Kind::Commit)
    }

    /// Header-only: the commit's tree id, without parsing the message or
    /// identities.
    pub fn get_tree(&self, id: &ObjectId) -> Result<Option<ObjectId>, Error> {
        match load_bytes_of_kind(self.raw.as_ref(), id, Kind::Commit)? {
            Some(body) => Ok(Some(Commit::tree_id(&body)?)),
            None => Ok(None),
        }
    }

    /// Header-only: the commit's parent ids, without parsing the rest.
    pub fn get_parents(&self, id: &ObjectId) -> Result<Option<SmallVec<[ObjectId; 1]>>, Error> {
        match load_bytes_of_kind(self.raw.as_ref(), id, Kind::Commit)? {
            Some(body) => Ok(Some(Commit::parent_ids(&body)?)),
            None => Ok(None),
        }
    }
}

/// Component C over tag records (annotated tags).
#[derive(Clone)]
pub struct TagStore {
    raw: Arc<dyn RawStore>,
}

impl TagStore {
    pub fn new(raw: Arc<dyn RawStore>) -> Self {
        TagStore { raw }
    }

    pub fn store(&self, tag: &Tag) -> Result<ObjectId, Error> {
        let body = tag.serialize();
        store_streamed(self.raw.as_ref(), Kind::Tag, body.len(), &mut Cursor::new(body))
    }

    pub fn load(&self, id: &ObjectId) -> Result<Option<Tag>, Error> {
        match load_bytes_of_kind(self.raw.as_ref(), id, Kind::Tag)? {
            Some(body) => Ok(Some(Tag::parse(&body)?)),
            None => Ok(None),
        }
    }

    pub fn has(&self, id: &ObjectId) -> bool {
        peeked_kind(self.raw.as_ref(), id) == Some(Kind::Tag)
    }

    pub fn remove(&self, id: &ObjectId) -> Result<bool, Error> {
        if !self.has(id) {
            return Ok(false);
        }
        Ok(self.raw.delete(id)?)
    }

    pub fn keys(&self) -> Result<Vec<ObjectId>, Error> {
        keys_of_kind(self.raw.as_ref(), Kind::Tag)
    }

    /// Follows `object <id>` through this tag, peeling through further tag
    /// objects when `peel` is set until a non-tag target is reached.
    pub fn get_target(&self, id: &ObjectId, peel: bool) -> Result<Option<ObjectId>, Error> {
        let tag = match self.load(id)? {
            Some(t) => t,
            None => return Ok(None),
        };
        if !peel || tag.target_kind != Kind::Tag {
            return Ok(Some(tag.object));
        }
        // recurse through the tag chain; a self-referential chain would
        // loop forever, but tag ids are content-addressed so a tag cannot
        // name itself as its own target without colliding on hash.
        self.get_target(&tag.object, true)
    }
}
