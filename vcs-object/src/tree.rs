//! Tree bodies: a sequence of `mode SP name NUL id20` entries (§3), sorted
//! canonically (a subtree's name compares as if it carried a trailing `/`),
//! with duplicate names forbidden.

use crate::codec::Error as CorruptObject;
use bstr::{BStr, BString, ByteSlice};
use vcs_hash::ObjectId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    File,
    Executable,
    Symlink,
    Gitlink,
    Tree,
}

impl Mode {
    pub const fn octal(self) -> &'static [u8] {
        match self {
            Mode::File => b"100644",
            Mode::Executable => b"100755",
            Mode::Symlink => b"120000",
            Mode::Gitlink => b"160000",
            Mode::Tree => b"040000",
        }
    }

    pub fn from_octal(bytes: &[u8]) -> Option<Self> {
        Some(match bytes {
            b"100644" => Mode::File,
            b"100755" => Mode::Executable,
            b"120000" => Mode::Symlink,
            b"160000" => Mode::Gitlink,
            b"040000" | b"40000" => Mode::Tree,
            _ => return None,
        })
    }

    pub const fn is_tree(self) -> bool {
        matches!(self, Mode::Tree)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub mode: Mode,
    pub name: BString,
    pub id: ObjectId,
}

impl Entry {
    pub fn new(mode: Mode, name: impl Into<BString>, id: ObjectId) -> Self {
        Entry {
            mode,
            name: name.into(),
            id,
        }
    }

    /// The sort key used by [`sort_canonical`]: a subtree's name is treated
    /// as if it had a trailing `/`, so e.g. `"foo"` (a blob) sorts before
    /// `"foo.txt"` but `"foo"` (a tree) sorts after `"foo."`.
    fn sort_key(&self) -> BString {
        if self.mode.is_tree() {
            let mut key = self.name.clone();
            key.push(b'/');
            key
        } else {
            self.name.clone()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tree {
    pub entries: Vec<Entry>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum Error {
    #[error(transparent)]
    Corrupt(#[from] CorruptObject),
    #[error("duplicate tree entry name {0:?}")]
    DuplicateName(BString),
    #[error("tree entry name {0:?} is invalid")]
    InvalidName(BString),
}

impl Tree {
    /// Sorts entries canonically and rejects duplicate names. This is the
    /// only path by which a [`Tree`] is considered ready to serialize.
    pub fn from_entries(mut entries: Vec<Entry>) -> Result<Self, Error> {
        for entry in &entries {
            if entry.name.contains(&b'/') || entry.name.contains(&0) || entry.name.is_empty() {
                return Err(Error::InvalidName(entry.name.clone()));
            }
        }
        sort_canonical(&mut entries);
        for pair in entries.windows(2) {
            if pair[0].name == pair[1].name {
                return Err(Error::DuplicateName(pair[0].name.clone()));
            }
        }
        Ok(Tree { entries })
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for entry in &self.entries {
            out.extend_from_slice(entry.mode.octal());
            out.push(b' ');
            out.extend_from_slice(&entry.name);
            out.push(0);
            out.extend_from_slice(entry.id.as_bytes());
        }
        out
    }

    pub fn parse(body: &[u8]) -> Result<Self, Error> {
        let entries = parse_entries(body)?;
        Ok(Tree { entries })
    }

    pub fn get(&self, name: &[u8]) -> Option<&Entry> {
        self.entries.iter().find(|e| e.name.as_slice() == name)
    }
}

/// Sorts entries canonically in place (does not check for duplicates).
pub fn sort_canonical(entries: &mut [Entry]) {
    entries.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
}

/// Parses a raw tree body into entries without sorting/dedup-checking,
/// usable as a lazy/streaming decode step before handing entries to
/// [`Tree::from_entries`] for canonicalization.
pub fn parse_entries(mut body: &[u8]) -> Result<Vec<Entry>, Error> {
    let mut entries = Vec::new();
    while !body.is_empty() {
        let space = body
            .iter()
            .position(|&b| b == b' ')
            .ok_or(CorruptObject::MalformedHeader)?;
        let mode =
            Mode::from_octal(&body[..space]).ok_or(CorruptObject::MalformedHeader)?;
        let nul = body[space..]
            .iter()
            .position(|&b| b == 0)
            .ok_or(CorruptObject::MalformedHeader)?
            + space;
        let name: BString = body[space + 1..nul].as_bstr().to_owned();
        let id_start = nul + 1;
        let id_end = id_start + 20;
        if id_end > body.len() {
            return Err(CorruptObject::Truncated {
                expected: id_end,
                actual: body.len(),
            }
            .into());
        }
        let id = ObjectId::from_bytes(&body[id_start..id_end]).expect("exactly 20 bytes sliced");
        entries.push(Entry { mode, name, id });
        body = &body[id_end..];
    }
    Ok(entries)
}

impl PartialEq<BStr> for Entry {
    fn eq(&self, other: &BStr) -> bool {
        self.name.as_bstr() == other
    }
}
