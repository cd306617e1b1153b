//! Commit bodies (§3): `tree <id>\n` `parent <id>\n`* `author <ident>\n`
//! `committer <ident>\n` (`encoding <name>\n`)? `\n` then message bytes.

use crate::identity::{Error as IdentityError, Identity};
use bstr::BString;
use smallvec::SmallVec;
use vcs_hash::ObjectId;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum Error {
    #[error("commit is missing a tree line")]
    MissingTree,
    #[error("commit is missing an author line")]
    MissingAuthor,
    #[error("commit is missing a committer line")]
    MissingCommitter,
    #[error("commit is missing the blank line separating headers from the message")]
    MissingMessageSeparator,
    #[error("malformed id in commit header: {0}")]
    MalformedId(#[from] vcs_hash::Error),
    #[error(transparent)]
    MalformedIdentity(#[from] IdentityError),
    #[error("commit header line is not valid UTF-8")]
    NotUtf8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    pub tree: ObjectId,
    pub parents: SmallVec<[ObjectId; 1]>,
    pub author: Identity,
    pub committer: Identity,
    pub encoding: Option<String>,
    pub message: BString,
}

impl Commit {
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(b"tree ");
        out.extend_from_slice(self.tree.to_hex().as_bytes());
        out.push(b'\n');
        for parent in &self.parents {
            out.extend_from_slice(b"parent ");
            out.extend_from_slice(parent.to_hex().as_bytes());
            out.push(b'\n');
        }
        out.extend_from_slice(b"author ");
        out.extend_from_slice(self.author.to_string().as_bytes());
        out.push(b'\n');
        out.extend_from_slice(b"committer ");
        out.extend_from_slice(self.committer.to_string().as_bytes());
        out.push(b'\n');
        if let Some(encoding) = &self.encoding {
            out.extend_from_slice(b"encoding ");
            out.extend_from_slice(encoding.as_bytes());
            out.push(b'\n');
        }
        out.push(b'\n');
        out.extend_from_slice(&self.message);
        out
    }

    pub fn parse(body: &[u8]) -> Result<Self, Error> {
        let text = std::str::from_utf8(body).map_err(|_| Error::NotUtf8)?;
        let header_end = text.find("\n\n").ok_or(Error::MissingMessageSeparator)?;
        let header = &text[..header_end];
        let message = &body[header_end + 2..];

        let mut tree = None;
        let mut parents = SmallVec::new();
        let mut author = None;
        let mut committer = None;
        let mut encoding = None;

        for line in header.lines() {
            if let Some(rest) = line.strip_prefix("tree ") {
                tree = Some(ObjectId::from_hex(rest)?);
            } else if let Some(rest) = line.strip_prefix("parent ") {
                parents.push(ObjectId::from_hex(rest)?);
            } else if let Some(rest) = line.strip_prefix("author ") {
                author = Some(Identity::parse(rest)?);
            } else if let Some(rest) = line.strip_prefix("committer ") {
                committer = Some(Identity::parse(rest)?);
            } else if let Some(rest) = line.strip_prefix("encoding ") {
                encoding = Some(rest.to_owned());
            }
        }

        Ok(Commit {
            tree: tree.ok_or(Error::MissingTree)?,
            parents,
            author: author.ok_or(Error::MissingAuthor)?,
            committer: committer.ok_or(Error::MissingCommitter)?,
            encoding,
            message: BString::from(message),
        })
    }

    /// Header-only read of the tree id, without parsing the rest of the body.
    pub fn tree_id(body: &[u8]) -> Result<ObjectId, Error> {
        let text = std::str::from_utf8(body).map_err(|_| Error::NotUtf8)?;
        let line = text.lines().next().ok_or(Error::MissingTree)?;
        let rest = line.strip_prefix("tree ").ok_or(Error::MissingTree)?;
        Ok(ObjectId::from_hex(rest)?)
    }

    /// Header-only read of parent ids, without parsing the rest of the body.
    pub fn parent_ids(body: &[u8]) -> Result<SmallVec<[ObjectId; 1]>, Error> {
        let text = std::str::from_utf8(body).map_err(|_| Error::NotUtf8)?;
        let mut parents = SmallVec::new();
        for line in text.lines() {
            if let Some(rest) = line.strip_prefix("parent ") {
                parents.push(ObjectId::from_hex(rest)?);
            } else if !line.starts_with("tree ") {
                break;
            }
        }
        Ok(parents)
    }
}
