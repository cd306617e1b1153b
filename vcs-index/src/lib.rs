//! Component H: the staging area. A sorted cache of `(path, stage)` rows
//! (§3), mutated only through a [`Builder`] (bulk rewrite) or [`Editor`]
//! (targeted patch) that rebuild the sorted sequence atomically on
//! `finish`, plus tree build/read (§4.H) and the on-disk `DIRC` format
//! (§4.H external format).

pub mod builder;
pub mod editor;
pub mod format;
pub mod tree_io;

pub use builder::Builder;
pub use editor::{Edit, EditOp, Editor};

use bstr::{BString, ByteSlice};
use std::path::Path;
use std::time::SystemTime;
use vcs_hash::ObjectId;
use vcs_object::tree::Mode;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    PathInvalid(#[from] vcs_path::PathError),
    #[error("index entry for {path:?} has stage 0 alongside conflict stages")]
    ConflictingStages { path: BString },
    #[error("write_tree refused: index has unresolved conflicts")]
    UnresolvedConflicts,
    #[error("duplicate index entry for {path:?} at stage {stage:?}")]
    DuplicateEntry { path: BString, stage: Stage },
    #[error("malformed index file: {0}")]
    Corrupt(String),
    #[error("unsupported index version {0}")]
    UnsupportedVersion(u32),
    #[error("index checksum mismatch")]
    ChecksumMismatch,
    #[error(transparent)]
    Odb(#[from] vcs_odb::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// An index row's merge stage (§3, §GLOSSARY): 0 merged, 1/2/3 base/ours/theirs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Merged = 0,
    Base = 1,
    Ours = 2,
    Theirs = 3,
}

impl Stage {
    pub const fn from_u8(n: u8) -> Option<Self> {
        Some(match n {
            0 => Stage::Merged,
            1 => Stage::Base,
            2 => Stage::Ours,
            3 => Stage::Theirs,
            _ => return None,
        })
    }

    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

/// A POSIX `(seconds, nanoseconds)` timestamp, as stored in `ctime`/`mtime`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Time {
    pub seconds: u32,
    pub nanoseconds: u32,
}

/// A single staged file snapshot (§3: the staging entry tuple).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub path: BString,
    pub stage: Stage,
    pub mode: Mode,
    pub id: ObjectId,
    pub size: u32,
    pub mtime: Time,
    pub ctime: Option<Time>,
    pub dev: Option<u32>,
    pub ino: Option<u32>,
    pub assume_valid: bool,
    pub intent_to_add: bool,
    pub skip_worktree: bool,
}

impl Entry {
    /// A minimal entry for a merged path, the common case produced by
    /// [`tree_io::read_tree`] and by tests.
    pub fn new(path: impl Into<BString>, mode: Mode, id: ObjectId) -> Self {
        Entry {
            path: path.into(),
            stage: Stage::Merged,
            mode,
            id,
            size: 0,
            mtime: Time::default(),
            ctime: Some(Time::default()),
            dev: Some(0),
            ino: Some(0),
            assume_valid: false,
            intent_to_add: false,
            skip_worktree: false,
        }
    }

    fn sort_key(&self) -> (&bstr::BStr, Stage) {
        (self.path.as_bstr(), self.stage)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EntryFilter<'a> {
    pub prefix: Option<&'a str>,
    pub stages: Option<&'a [Stage]>,
}

/// The staging area itself: a sorted `Vec<Entry>` plus the bookkeeping
/// [`Index::is_outdated`] needs.
#[derive(Debug, Clone, Default)]
pub struct Index {
    pub(crate) entries: Vec<Entry>,
    pub(crate) version: u32,
    pub(crate) last_read: Option<SystemTime>,
}

fn validate_sorted_no_dup_no_conflict(entries: &[Entry]) -> Result<(), Error> {
    for pair in entries.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        if a.sort_key() > b.sort_key() {
            return Err(Error::Corrupt("entries are not sorted by (path, stage)".into()));
        }
        if a.path == b.path && a.stage == b.stage {
            return Err(Error::DuplicateEntry {
                path: a.path.clone(),
                stage: a.stage,
            });
        }
    }
    // stage-0/conflict invariant: if stage 0 exists for a path, 1-3 must not.
    let mut i = 0;
    while i < entries.len() {
        let path = &entries[i].path;
        let mut j = i;
        let mut has_merged = false;
        let mut has_conflict = false;
        while j < entries.len() && &entries[j].path == path {
            match entries[j].stage {
                Stage::Merged => has_merged = true,
                _ => has_conflict = true,
            }
            j += 1;
        }
        if has_merged && has_conflict {
            return Err(Error::ConflictingStages { path: path.clone() });
        }
        i = j;
    }
    Ok(())
}

impl Index {
    pub fn new() -> Self {
        Index {
            entries: Vec::new(),
            version: 2,
            last_read: None,
        }
    }

    pub fn count(&self) -> usize {
        self.entries.len()
    }

    pub fn get_entry(&self, path: &[u8], stage: Stage) -> Option<&Entry> {
        self.entries
            .binary_search_by(|e| (e.path.as_slice(), e.stage).cmp(&(path, stage)))
            .ok()
            .map(|idx| &self.entries[idx])
    }

    pub fn get_entries(&self, path: &[u8]) -> Vec<&Entry> {
        self.entries.iter().filter(|e| e.path.as_slice() == path).collect()
    }

    pub fn has_entry(&self, path: &[u8]) -> bool {
        !self.get_entries(path).is_empty()
    }

    pub fn entries(&self, filter: EntryFilter<'_>) -> Vec<&Entry> {
        self.entries
            .iter()
            .filter(|e| filter.prefix.map_or(true, |p| e.path.starts_with(p.as_bytes())))
            .filter(|e| filter.stages.map_or(true, |stages| stages.contains(&e.stage)))
            .collect()
    }

    /// Inserts or overwrites `entry` at its `(path, stage)` key, keeping the
    /// vector sorted.
    pub fn set_entry(&mut self, entry: Entry) {
        match self.entries.binary_search_by(|e| e.sort_key().cmp(&entry.sort_key())) {
            Ok(idx) => self.entries[idx] = entry,
            Err(idx) => self.entries.insert(idx, entry),
        }
    }

    /// Removes the entry at `(path, stage)`, or every stage for `path` if
    /// `stage` is `None`. Returns the number of rows removed.
    pub fn remove_entry(&mut self, path: &[u8], stage: Option<Stage>) -> usize {
        let before = self.entries.len();
        match stage {
            Some(stage) => {
                if let Ok(idx) = self.entries.binary_search_by(|e| (e.path.as_slice(), e.stage).cmp(&(path, stage))) {
                    self.entries.remove(idx);
                }
            }
            None => self.entries.retain(|e| e.path.as_slice() != path),
        }
        before - self.entries.len()
    }

    pub fn has_conflicts(&self) -> bool {
        self.entries.iter().any(|e| e.stage != Stage::Merged)
    }

    pub fn conflicted_paths(&self) -> Vec<&bstr::BStr> {
        let mut out: Vec<&bstr::BStr> = Vec::new();
        for entry in &self.entries {
            if entry.stage != Stage::Merged && out.last().map_or(true, |p| *p != entry.path.as_bstr()) {
                out.push(entry.path.as_bstr());
            }
        }
        out
    }

    /// Which side to keep when resolving a three-way conflict.
    pub fn resolve_conflict(&mut self, path: &[u8], resolution: Resolution) -> Result<(), Error> {
        let rows = self.get_entries(path);
        let winner = match resolution {
            Resolution::Ours => rows.iter().find(|e| e.stage == Stage::Ours).cloned().cloned(),
            Resolution::Theirs => rows.iter().find(|e| e.stage == Stage::Theirs).cloned().cloned(),
            Resolution::Base => rows.iter().find(|e| e.stage == Stage::Base).cloned().cloned(),
            Resolution::Entry(entry) => Some(entry),
        };
        self.remove_entry(path, None);
        if let Some(mut entry) = winner {
            entry.stage = Stage::Merged;
            self.set_entry(entry);
        }
        Ok(())
    }

    pub fn create_builder(&self) -> Builder<'_> {
        Builder::new(self)
    }

    pub fn create_editor(&self) -> Editor<'_> {
        Editor::new(self)
    }

    pub fn write_tree(&self, trees: &vcs_odb::typed::TreeStore) -> Result<ObjectId, Error> {
        tree_io::write_tree(self, trees)
    }

    pub fn read_tree(
        &mut self,
        trees: &vcs_odb::typed::TreeStore,
        tree_id: ObjectId,
        options: tree_io::ReadTreeOptions<'_>,
    ) -> Result<(), Error> {
        tree_io::read_tree(self, trees, tree_id, options)
    }

    pub fn read(path: impl AsRef<Path>) -> Result<Index, Error> {
        format::read(path.as_ref())
    }

    pub fn write(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        format::write(self, path.as_ref())
    }

    /// Compares the backing file's mtime against the moment this index was
    /// last [`Index::read`], the cheap staleness check a working copy runs
    /// before trusting an in-memory index.
    pub fn is_outdated(&self, path: impl AsRef<Path>) -> Result<bool, Error> {
        let last_read = match self.last_read {
            Some(t) => t,
            None => return Ok(true),
        };
        let meta = match std::fs::metadata(path.as_ref()) {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e.into()),
        };
        let modified = meta.modified()?;
        Ok(modified > last_read)
    }
}

/// Which side [`Index::resolve_conflict`] should keep.
pub enum Resolution {
    Ours,
    Theirs,
    Base,
    Entry(Entry),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(b: u8) -> ObjectId {
        ObjectId::from_bytes(&[b; 20]).unwrap()
    }

    #[test]
    fn set_and_get_round_trip() {
        let mut idx = Index::new();
        idx.set_entry(Entry::new("a.txt", Mode::File, id(1)));
        assert_eq!(idx.get_entry(b"a.txt", Stage::Merged).unwrap().id, id(1));
        assert!(idx.has_entry(b"a.txt"));
        assert_eq!(idx.count(), 1);
    }

    #[test]
    fn conflict_detection_and_resolution() {
        let mut idx = Index::new();
        let mut base = Entry::new("a.txt", Mode::File, id(1));
        base.stage = Stage::Base;
        let mut ours = Entry::new("a.txt", Mode::File, id(2));
        ours.stage = Stage::Ours;
        let mut theirs = Entry::new("a.txt", Mode::File, id(3));
        theirs.stage = Stage::Theirs;
        idx.set_entry(base);
        idx.set_entry(ours);
        idx.set_entry(theirs);

        assert!(idx.has_conflicts());
        assert_eq!(idx.conflicted_paths(), vec![bstr::BStr::new(b"a.txt")]);

        idx.resolve_conflict(b"a.txt", Resolution::Ours).unwrap();
        assert!(!idx.has_conflicts());
        assert_eq!(idx.get_entry(b"a.txt", Stage::Merged).unwrap().id, id(2));
    }

    #[test]
    fn remove_entry_drops_single_stage_or_all() {
        let mut idx = Index::new();
        idx.set_entry(Entry::new("a.txt", Mode::File, id(1)));
        assert_eq!(idx.remove_entry(b"a.txt", Some(Stage::Merged)), 1);
        assert!(!idx.has_entry(b"a.txt"));
    }

    #[test]
    fn entries_filters_by_prefix_and_stage() {
        let mut idx = Index::new();
        idx.set_entry(Entry::new("dir/a.txt", Mode::File, id(1)));
        idx.set_entry(Entry::new("other.txt", Mode::File, id(2)));
        let filtered = idx.entries(EntryFilter {
            prefix: Some("dir/"),
            stages: None,
        });
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].path, "dir/a.txt");
    }
}
