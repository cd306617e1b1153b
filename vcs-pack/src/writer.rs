//! Streaming pack writer (§4.F): `add_object`/`add_ref_delta`/`add_ofs_delta`
//! write directly to the destination as each call arrives, tracking each
//! object's start offset so a later `add_ofs_delta` call can back-reference
//! it. `finalize` appends the trailer and hands back the data an `.idx`
//! writer needs.

use crate::data::{self, OBJ_OFS_DELTA, OBJ_REF_DELTA};
use crate::index::IndexEntry;
use crate::Error;
use std::collections::HashMap;
use std::io::Write;
use vcs_features::hash::crc32_update;
use vcs_hash::{Hasher, ObjectId};
use vcs_object::Kind;

pub struct FinalizeOutcome {
    pub pack_checksum: ObjectId,
    pub entries: Vec<IndexEntry>,
}

pub struct PackWriter<W: Write> {
    out: W,
    hasher: Hasher,
    offset: u64,
    expected_count: u32,
    entries: Vec<IndexEntry>,
    offset_by_id: HashMap<ObjectId, u64>,
}

impl<W: Write> PackWriter<W> {
    pub fn new(mut out: W, expected_count: u32) -> Result<Self, Error> {
        let mut header = Vec::with_capacity(12);
        header.extend_from_slice(b"PACK");
        header.extend_from_slice(&2u32.to_be_bytes());
        header.extend_from_slice(&expected_count.to_be_bytes());
        out.write_all(&header)?;
        let mut hasher = Hasher::new();
        hasher.update(&header);
        Ok(PackWriter {
            out,
            hasher,
            offset: header.len() as u64,
            expected_count,
            entries: Vec::new(),
            offset_by_id: HashMap::new(),
        })
    }

    pub fn add_object(&mut self, id: ObjectId, kind: Kind, bytes: &[u8]) -> Result<(), Error> {
        let mut header_bytes = Vec::new();
        data::write_type_and_size(data::kind_to_type_code(kind), bytes.len() as u64, &mut header_bytes);
        let compressed = data::deflate(bytes);
        self.write_record(id, header_bytes, compressed)
    }

    pub fn add_ref_delta(&mut self, id: ObjectId, base_id: ObjectId, delta: &[u8]) -> Result<(), Error> {
        let mut header_bytes = Vec::new();
        data::write_type_and_size(OBJ_REF_DELTA, delta.len() as u64, &mut header_bytes);
        header_bytes.extend_from_slice(base_id.as_bytes());
        let compressed = data::deflate(delta);
        self.write_record(id, header_bytes, compressed)
    }

    /// Requires `base_id` to have already been written (via `add_object` or
    /// another `add_*` call) earlier in this stream, since `OFS_DELTA`
    /// back-references are relative to this writer's own output.
    pub fn add_ofs_delta(&mut self, id: ObjectId, base_id: ObjectId, delta: &[u8]) -> Result<(), Error> {
        let base_offset = *self.offset_by_id.get(&base_id).ok_or(Error::NotFound(base_id))?;
        let base_distance = self.offset - base_offset;
        let mut header_bytes = Vec::new();
        data::write_type_and_size(OBJ_OFS_DELTA, delta.len() as u64, &mut header_bytes);
        data::write_ofs_delta_offset(base_distance, &mut header_bytes);
        let compressed = data::deflate(delta);
        self.write_record(id, header_bytes, compressed)
    }

    fn write_record(&mut self, id: ObjectId, header_bytes: Vec<u8>, compressed: Vec<u8>) -> Result<(), Error> {
        let start_offset = self.offset;
        let crc = crc32_update(crc32_update(0, &header_bytes), &compressed);

        self.out.write_all(&header_bytes)?;
        self.out.write_all(&compressed)?;
        self.hasher.update(&header_bytes);
        self.hasher.update(&compressed);

        self.offset += (header_bytes.len() + compressed.len()) as u64;
        self.offset_by_id.insert(id, start_offset);
        self.entries.push(IndexEntry {
            id,
            pack_offset: start_offset,
            crc32: crc,
        });
        Ok(())
    }

    /// Appends the 20-byte trailer and returns the checksum plus every
    /// entry's id/offset/crc32, ready to hand to [`crate::index::write`].
    pub fn finalize(mut self) -> Result<FinalizeOutcome, Error> {
        if self.entries.len() as u32 != self.expected_count {
            return Err(Error::ObjectCountMismatch {
                declared: self.expected_count,
                actual: self.entries.len() as u32,
            });
        }
        let pack_checksum = self.hasher.finish();
        self.out.write_all(pack_checksum.as_bytes())?;
        Ok(FinalizeOutcome {
            pack_checksum,
            entries: self.entries,
        })
    }
}
