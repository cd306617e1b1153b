//! The stable error kinds from spec §7 that this layer can produce.

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("object {0} not found")]
    NotFound(vcs_hash::ObjectId),
    #[error(transparent)]
    CorruptObject(#[from] vcs_object::CorruptObject),
    #[error(transparent)]
    CorruptTree(#[from] vcs_object::tree::Error),
    #[error(transparent)]
    CorruptCommit(#[from] vcs_object::commit::Error),
    #[error(transparent)]
    CorruptTag(#[from] vcs_object::tag::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
