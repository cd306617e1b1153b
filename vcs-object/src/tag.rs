//! Tag bodies (§3): `object <id>\n type <kind>\n tag <name>\n tagger <ident>\n \n <message>`.

use crate::identity::{Error as IdentityError, Identity};
use crate::Kind;
use bstr::BString;
use vcs_hash::ObjectId;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum Error {
    #[error("tag is missing an object line")]
    MissingObject,
    #[error("tag is missing a type line")]
    MissingType,
    #[error("tag is missing a tag (name) line")]
    MissingName,
    #[error("tag is missing a tagger line")]
    MissingTagger,
    #[error("tag is missing the blank line separating headers from the message")]
    MissingMessageSeparator,
    #[error("unknown target kind {0:?}")]
    UnknownKind(String),
    #[error("malformed id in tag header: {0}")]
    MalformedId(#[from] vcs_hash::Error),
    #[error(transparent)]
    MalformedIdentity(#[from] IdentityError),
    #[error("tag header line is not valid UTF-8")]
    NotUtf8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub object: ObjectId,
    pub target_kind: Kind,
    pub name: String,
    pub tagger: Identity,
    pub message: BString,
}

impl Tag {
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(b"object ");
        out.extend_from_slice(self.object.to_hex().as_bytes());
        out.push(b'\n');
        out.extend_from_slice(b"type ");
        out.extend_from_slice(self.target_kind.as_bytes());
        out.push(b'\n');
        out.extend_from_slice(b"tag ");
        out.extend_from_slice(self.name.as_bytes());
        out.push(b'\n');
        out.extend_from_slice(b"tagger ");
        out.extend_from_slice(self.tagger.to_string().as_bytes());
        out.push(b'\n');
        out.push(b'\n');
        out.extend_from_slice(&self.message);
        out
    }

    pub fn parse(body: &[u8]) -> Result<Self, Error> {
        let text = std::str::from_utf8(body).map_err(|_| Error::NotUtf8)?;
        let header_end = text.find("\n\n").ok_or(Error::MissingMessageSeparator)?;
        let header = &text[..header_end];
        let message = &body[header_end + 2..];

        let mut object = None;
        let mut target_kind = None;
        let mut name = None;
        let mut tagger = None;

        for line in header.lines() {
            if let Some(rest) = line.strip_prefix("object ") {
                object = Some(ObjectId::from_hex(rest)?);
            } else if let Some(rest) = line.strip_prefix("type ") {
                target_kind = Some(Kind::from_bytes(rest.as_bytes()).ok_or_else(|| Error::UnknownKind(rest.to_owned()))?);
            } else if let Some(rest) = line.strip_prefix("tag ") {
                name = Some(rest.to_owned());
            } else if let Some(rest) = line.strip_prefix("tagger ") {
                tagger = Some(Identity::parse(rest)?);
            }
        }

        Ok(Tag {
            object: object.ok_or(Error::MissingObject)?,
            target_kind: target_kind.ok_or(Error::MissingType)?,
            name: name.ok_or(Error::MissingName)?,
            tagger: tagger.ok_or(Error::MissingTagger)?,
            message: BString::from(message),
        })
    }
}
