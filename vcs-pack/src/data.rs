//! The pack object record format (§4.F): the type/size-encoding header that
//! precedes every record, the `OFS_DELTA` negative-offset varint, and the
//! zlib framing shared by both undeltified bodies and delta payloads.

use crate::Error;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::{Cursor, Read, Write};
use vcs_hash::ObjectId;
use vcs_object::Kind;

pub const OBJ_COMMIT: u8 = 1;
pub const OBJ_TREE: u8 = 2;
pub const OBJ_BLOB: u8 = 3;
pub const OBJ_TAG: u8 = 4;
pub const OBJ_OFS_DELTA: u8 = 6;
pub const OBJ_REF_DELTA: u8 = 7;

pub fn kind_to_type_code(kind: Kind) -> u8 {
    match kind {
        Kind::Commit => OBJ_COMMIT,
        Kind::Tree => OBJ_TREE,
        Kind::Blob => OBJ_BLOB,
        Kind::Tag => OBJ_TAG,
    }
}

pub fn type_code_to_kind(code: u8) -> Option<Kind> {
    Some(match code {
        OBJ_COMMIT => Kind::Commit,
        OBJ_TREE => Kind::Tree,
        OBJ_BLOB => Kind::Blob,
        OBJ_TAG => Kind::Tag,
        _ => return None,
    })
}

/// A decoded object record header: which kind of record follows, and (for
/// undeltified records) the inflated body size or (for deltas) the
/// inflated delta payload size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordHeader {
    Base { kind: Kind, inflated_size: u64 },
    OfsDelta { base_distance: u64, inflated_size: u64 },
    RefDelta { base_id: ObjectId, inflated_size: u64 },
}

impl RecordHeader {
    pub fn inflated_size(&self) -> u64 {
        match self {
            RecordHeader::Base { inflated_size, .. }
            | RecordHeader::OfsDelta { inflated_size, .. }
            | RecordHeader::RefDelta { inflated_size, .. } => *inflated_size,
        }
    }
}

/// Reads the type+size-encoding header (and any OFS/REF extra bytes) at the
/// start of `bytes`, returning the header and the number of bytes consumed.
pub fn read_record_header(bytes: &[u8], at: u64) -> Result<(RecordHeader, usize), Error> {
    let (type_code, size, mut consumed) = read_type_and_size(bytes, at)?;
    match type_code {
        OBJ_OFS_DELTA => {
            let (base_distance, n) = read_ofs_delta_offset(&bytes[consumed..], at)?;
            consumed += n;
            Ok((
                RecordHeader::OfsDelta {
                    base_distance,
                    inflated_size: size,
                },
                consumed,
            ))
        }
        OBJ_REF_DELTA => {
            if bytes.len() < consumed + 20 {
                return Err(Error::Truncated(at));
            }
            let base_id = ObjectId::from_bytes(&bytes[consumed..consumed + 20]).expect("exactly 20 bytes sliced");
            consumed += 20;
            Ok((
                RecordHeader::RefDelta {
                    base_id,
                    inflated_size: size,
                },
                consumed,
            ))
        }
        other => {
            let kind = type_code_to_kind(other).ok_or(Error::Truncated(at))?;
            Ok((
                RecordHeader::Base {
                    kind,
                    inflated_size: size,
                },
                consumed,
            ))
        }
    }
}

/// Git's object-record size encoding: first byte holds `(type << 4) |
/// (size & 0x0f)` plus a continuation bit; each further byte contributes 7
/// more bits, least-significant group first.
fn read_type_and_size(bytes: &[u8], at: u64) -> Result<(u8, u64, usize), Error> {
    let first = *bytes.first().ok_or(Error::Truncated(at))?;
    let type_code = (first >> 4) & 0x7;
    let mut size = u64::from(first & 0x0f);
    let mut shift = 4u32;
    let mut consumed = 1usize;
    let mut continuation = first & 0x80 != 0;
    while continuation {
        let byte = *bytes.get(consumed).ok_or(Error::Truncated(at))?;
        size |= u64::from(byte & 0x7f) << shift;
        shift += 7;
        continuation = byte & 0x80 != 0;
        consumed += 1;
    }
    Ok((type_code, size, consumed))
}

pub fn write_type_and_size(type_code: u8, size: u64, out: &mut Vec<u8>) {
    let mut remaining = size >> 4;
    let mut first = (type_code << 4) | (size & 0x0f) as u8;
    if remaining > 0 {
        first |= 0x80;
    }
    out.push(first);
    while remaining > 0 {
        let mut byte = (remaining & 0x7f) as u8;
        remaining >>= 7;
        if remaining > 0 {
            byte |= 0x80;
        }
        out.push(byte);
    }
}

/// `OFS_DELTA`'s negative-offset varint: MSB-first, each added byte biases
/// the accumulated value by `1 << 7` so every encoding is unique (§4.F).
fn read_ofs_delta_offset(bytes: &[u8], at: u64) -> Result<(u64, usize), Error> {
    let mut byte = *bytes.first().ok_or(Error::Truncated(at))?;
    let mut consumed = 1usize;
    let mut value = u64::from(byte & 0x7f);
    while byte & 0x80 != 0 {
        byte = *bytes.get(consumed).ok_or(Error::Truncated(at))?;
        consumed += 1;
        value = ((value + 1) << 7) | u64::from(byte & 0x7f);
    }
    Ok((value, consumed))
}

pub fn write_ofs_delta_offset(value: u64, out: &mut Vec<u8>) {
    let mut bytes = vec![(value & 0x7f) as u8];
    let mut remaining = value >> 7;
    while remaining > 0 {
        remaining -= 1;
        bytes.push(0x80 | (remaining & 0x7f) as u8);
        remaining >>= 7;
    }
    bytes.reverse();
    out.extend_from_slice(&bytes);
}

/// Zlib-inflates a record's compressed body starting at `bytes[0]`, reading
/// no more input than the stream itself consumes, and returns the
/// decompressed bytes alongside how many compressed bytes were read (so the
/// caller can advance past this record to the next one).
pub fn inflate(bytes: &[u8]) -> Result<(Vec<u8>, usize), Error> {
    let mut cursor = Cursor::new(bytes);
    let mut decoder = ZlibDecoder::new(&mut cursor);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| Error::Inflate(e.to_string()))?;
    drop(decoder);
    Ok((out, cursor.position() as usize))
}

pub fn deflate(bytes: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes).expect("writing to an in-memory encoder cannot fail");
    encoder.finish().expect("finishing an in-memory encoder cannot fail")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_and_size_round_trips_small_and_large() {
        for (kind, size) in [(OBJ_BLOB, 0u64), (OBJ_TREE, 15), (OBJ_COMMIT, 16), (OBJ_TAG, 1 << 30)] {
            let mut out = Vec::new();
            write_type_and_size(kind, size, &mut out);
            let (parsed_kind, parsed_size, consumed) = read_type_and_size(&out, 0).unwrap();
            assert_eq!(parsed_kind, kind);
            assert_eq!(parsed_size, size);
            assert_eq!(consumed, out.len());
        }
    }

    #[test]
    fn ofs_delta_offset_round_trips() {
        for value in [0u64, 1, 127, 128, 16383, 1 << 20, 1 << 40] {
            let mut out = Vec::new();
            write_ofs_delta_offset(value, &mut out);
            let (parsed, consumed) = read_ofs_delta_offset(&out, 0).unwrap();
            assert_eq!(parsed, value);
            assert_eq!(consumed, out.len());
        }
    }

    #[test]
    fn record_header_round_trips_ref_delta() {
        let base_id = ObjectId::from_bytes(&[7u8; 20]).unwrap();
        let mut out = Vec::new();
        write_type_and_size(OBJ_REF_DELTA, 42, &mut out);
        out.extend_from_slice(base_id.as_bytes());
        let (header, consumed) = read_record_header(&out, 0).unwrap();
        assert_eq!(
            header,
            RecordHeader::RefDelta {
                base_id,
                inflated_size: 42
            }
        );
        assert_eq!(consumed, out.len());
    }

    #[test]
    fn inflate_reports_bytes_consumed_not_whole_slice() {
        let body = b"hello, world! hello, world! hello, world!";
        let compressed = deflate(body);
        let mut padded = compressed.clone();
        padded.extend_from_slice(b"trailing garbage that belongs to the next record");
        let (inflated, consumed) = inflate(&padded).unwrap();
        assert_eq!(inflated, body);
        assert_eq!(consumed, compressed.len());
    }
}
