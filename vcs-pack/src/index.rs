//! Pack index v2 (`.idx`): fanout table + sorted ids + CRC32 table +
//! offsets (with large-offset overflow), pack checksum, idx checksum
//! (§4.F).

use crate::Error;
use vcs_hash::ObjectId;

const MAGIC: &[u8; 4] = b"\xfftOc";
const VERSION: u32 = 2;
const LARGE_OFFSET_FLAG: u32 = 0x8000_0000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub id: ObjectId,
    pub pack_offset: u64,
    pub crc32: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackIndex {
    pub fanout: [u32; 256],
    pub entries: Vec<IndexEntry>,
    pub pack_checksum: ObjectId,
}

impl PackIndex {
    /// O(log n): narrow to the fanout bucket for `id`'s first byte, then
    /// binary search the (sorted) ids within it.
    pub fn find(&self, id: &ObjectId) -> Option<&IndexEntry> {
        let first_byte = id.as_bytes()[0] as usize;
        let start = if first_byte == 0 { 0 } else { self.fanout[first_byte - 1] as usize };
        let end = self.fanout[first_byte] as usize;
        self.entries[start..end].binary_search_by(|e| e.id.cmp(id)).ok().map(|i| &self.entries[start + i])
    }
}

/// Serializes `entries` (sorted by id; duplicate or unsorted input is a
/// caller bug, not something this function defends against) into a
/// complete `.idx` v2 file.
pub fn write(entries: &[IndexEntry], pack_checksum: ObjectId) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&VERSION.to_be_bytes());

    let mut fanout = [0u32; 256];
    for entry in entries {
        let first_byte = entry.id.as_bytes()[0] as usize;
        fanout[first_byte] += 1;
    }
    for i in 1..256 {
        fanout[i] += fanout[i - 1];
    }
    for count in fanout {
        out.extend_from_slice(&count.to_be_bytes());
    }

    for entry in entries {
        out.extend_from_slice(entry.id.as_bytes());
    }
    for entry in entries {
        out.extend_from_slice(&entry.crc32.to_be_bytes());
    }

    let mut large_offsets = Vec::new();
    for entry in entries {
        if entry.pack_offset <= u64::from(u32::MAX >> 1) {
            out.extend_from_slice(&(entry.pack_offset as u32).to_be_bytes());
        } else {
            let large_index = large_offsets.len() as u32;
            large_offsets.push(entry.pack_offset);
            out.extend_from_slice(&(LARGE_OFFSET_FLAG | large_index).to_be_bytes());
        }
    }
    for offset in large_offsets {
        out.extend_from_slice(&offset.to_be_bytes());
    }

    out.extend_from_slice(pack_checksum.as_bytes());
    let idx_checksum = sha1_checksum(&out);
    out.extend_from_slice(idx_checksum.as_bytes());
    out
}

/// The idx trailer checksum: SHA-1 of every byte written before it.
fn sha1_checksum(bytes: &[u8]) -> ObjectId {
    let mut hasher = vcs_hash::Hasher::new();
    hasher.update(bytes);
    hasher.finish()
}

pub fn read(bytes: &[u8]) -> Result<PackIndex, Error> {
    if bytes.len() < 8 || &bytes[0..4] != MAGIC {
        return Err(Error::BadMagic);
    }
    let version = u32::from_be_bytes(bytes[4..8].try_into().expect("4 bytes"));
    if version != VERSION {
        return Err(Error::UnsupportedVersion(version));
    }

    let mut fanout = [0u32; 256];
    let mut cursor = 8usize;
    for slot in &mut fanout {
        *slot = read_u32(bytes, cursor)?;
        cursor += 4;
    }
    let count = fanout[255] as usize;

    let ids_start = cursor;
    let ids_end = ids_start + count * 20;
    let crc_end = ids_end + count * 4;
    let offsets_end = crc_end + count * 4;
    if bytes.len() < offsets_end + 40 {
        return Err(Error::Truncated(offsets_end as u64));
    }

    let mut ids = Vec::with_capacity(count);
    for i in 0..count {
        let start = ids_start + i * 20;
        ids.push(ObjectId::from_bytes(&bytes[start..start + 20]).expect("20 bytes sliced"));
    }
    let mut crcs = Vec::with_capacity(count);
    for i in 0..count {
        crcs.push(read_u32(bytes, crc_end - count * 4 + i * 4)?);
    }
    let mut raw_offsets = Vec::with_capacity(count);
    let mut large_count = 0usize;
    for i in 0..count {
        let raw = read_u32(bytes, offsets_end - count * 4 + i * 4)?;
        if raw & LARGE_OFFSET_FLAG != 0 {
            large_count = large_count.max((raw & !LARGE_OFFSET_FLAG) as usize + 1);
        }
        raw_offsets.push(raw);
    }

    let large_table_start = offsets_end;
    let large_table_end = large_table_start + large_count * 8;
    if bytes.len() < large_table_end + 40 {
        return Err(Error::Truncated(large_table_end as u64));
    }
    let mut large_offsets = Vec::with_capacity(large_count);
    for i in 0..large_count {
        let start = large_table_start + i * 8;
        large_offsets.push(u64::from_be_bytes(bytes[start..start + 8].try_into().expect("8 bytes")));
    }

    let pack_checksum_start = large_table_end;
    let pack_checksum = ObjectId::from_bytes(&bytes[pack_checksum_start..pack_checksum_start + 20]).expect("20 bytes sliced");
    let idx_checksum_start = pack_checksum_start + 20;
    let idx_checksum = ObjectId::from_bytes(&bytes[idx_checksum_start..idx_checksum_start + 20]).expect("20 bytes sliced");
    let computed = sha1_checksum(&bytes[..idx_checksum_start]);
    if computed != idx_checksum {
        return Err(Error::IndexChecksumMismatch);
    }

    let mut entries = Vec::with_capacity(count);
    for i in 0..count {
        let pack_offset = if raw_offsets[i] & LARGE_OFFSET_FLAG != 0 {
            large_offsets[(raw_offsets[i] & !LARGE_OFFSET_FLAG) as usize]
        } else {
            u64::from(raw_offsets[i])
        };
        entries.push(IndexEntry {
            id: ids[i],
            pack_offset,
            crc32: crcs[i],
        });
    }

    Ok(PackIndex {
        fanout,
        entries,
        pack_checksum,
    })
}

fn read_u32(bytes: &[u8], at: usize) -> Result<u32, Error> {
    bytes
        .get(at..at + 4)
        .map(|b| u32::from_be_bytes(b.try_into().expect("4 bytes")))
        .ok_or(Error::Truncated(at as u64))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(byte: u8, offset: u64) -> IndexEntry {
        let mut bytes = [0u8; 20];
        bytes[0] = byte;
        IndexEntry {
            id: ObjectId::from_bytes(&bytes).unwrap(),
            pack_offset: offset,
            crc32: 0xdead_beef,
        }
    }

    #[test]
    fn round_trips_small_offsets() {
        let entries = vec![entry(0x01, 12), entry(0x02, 900), entry(0xff, 42)];
        let pack_checksum = ObjectId::from_bytes(&[9u8; 20]).unwrap();
        let bytes = write(&entries, pack_checksum);
        let parsed = read(&bytes).unwrap();
        assert_eq!(parsed.entries, entries);
        assert_eq!(parsed.pack_checksum, pack_checksum);
        assert_eq!(parsed.fanout[0x01], 1);
        assert_eq!(parsed.fanout[0xff], 3);
    }

    #[test]
    fn round_trips_large_offsets() {
        let huge = 1u64 << 33;
        let entries = vec![entry(0x10, huge), entry(0x20, 5)];
        let bytes = write(&entries, ObjectId::null());
        let parsed = read(&bytes).unwrap();
        assert_eq!(parsed.entries[0].pack_offset, huge);
        assert_eq!(parsed.entries[1].pack_offset, 5);
    }

    #[test]
    fn find_looks_up_by_fanout_bucket() {
        let entries = vec![entry(0x01, 1), entry(0x01, 2), entry(0x02, 3)];
        // entries within a bucket must already be sorted by id for `find` to work
        let mut sorted = entries.clone();
        sorted.sort_by(|a, b| a.id.cmp(&b.id));
        let bytes = write(&sorted, ObjectId::null());
        let parsed = read(&bytes).unwrap();
        for e in &sorted {
            assert_eq!(parsed.find(&e.id), Some(e));
        }
    }

    #[test]
    fn tampered_bytes_fail_checksum() {
        let entries = vec![entry(0x01, 1)];
        let mut bytes = write(&entries, ObjectId::null());
        let last = bytes.len() - 1;
        bytes[last] ^= 0xff;
        assert!(matches!(read(&bytes), Err(Error::IndexChecksumMismatch)));
    }

    #[test]
    fn bad_magic_is_rejected() {
        assert!(matches!(read(b"nope"), Err(Error::BadMagic)));
    }
}
