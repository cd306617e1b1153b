//! Stable error kinds from §7 that this layer can produce.

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("object {0} not found in pack")]
    NotFound(vcs_hash::ObjectId),
    #[error("bad pack magic: expected 'PACK'")]
    BadMagic,
    #[error("unsupported pack version {0}")]
    UnsupportedVersion(u32),
    #[error("truncated pack record at offset {0}")]
    Truncated(u64),
    #[error("zlib stream failed to inflate: {0}")]
    Inflate(String),
    #[error("pack trailer checksum mismatch")]
    PackChecksumMismatch,
    #[error("idx trailer checksum mismatch")]
    IndexChecksumMismatch,
    #[error("delta chain is circular")]
    CircularDelta,
    #[error("delta chain exceeds the maximum depth of {max}")]
    ChainTooDeep { max: u32 },
    #[error("object count mismatch: header declared {declared}, writer received {actual}")]
    ObjectCountMismatch { declared: u32, actual: u32 },
    #[error(transparent)]
    Delta(#[from] vcs_delta::Error),
    #[error(transparent)]
    Object(#[from] vcs_object::CorruptObject),
    #[error(transparent)]
    Odb(#[from] vcs_odb::Error),
    #[error(transparent)]
    Traverse(#[from] vcs_traverse::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("operation cancelled")]
    Cancelled,
}
