//! CRC32 helpers used by the pack index (object record checksums).

/// Compute the CRC32 of `bytes` starting from an existing running `state`,
/// allowing a caller to checksum a record's header and body in two calls
/// the way the teacher's index writer does
/// (`hash::crc32_update(0, header)` then `hash::crc32_update(state, body)`).
pub fn crc32_update(state: u32, bytes: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new_with_initial(state);
    hasher.update(bytes);
    hasher.finalize()
}

pub fn crc32(bytes: &[u8]) -> u32 {
    crc32_update(0, bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incremental_matches_oneshot() {
        let whole = crc32(b"hello world");
        let incremental = crc32_update(crc32_update(0, b"hello "), b"world");
        assert_eq!(whole, incremental);
    }
}
