//! A file-based [`RawStore`] matching Git's loose-object layout:
//! `objects/xx/yyyy…` (2-hex fanout directory, 38 remaining hex chars as the
//! filename), zlib-deflated. Writes go through a temp file in the same
//! fanout directory and are renamed into place, so a reader never observes
//! a half-written object.

use crate::raw::RawStore;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use vcs_hash::ObjectId;

pub struct LooseStore {
    objects_dir: PathBuf,
}

impl LooseStore {
    /// `objects_dir` is the `.git/objects`-equivalent directory; it is
    /// created (along with its fanout subdirectories, lazily) if missing.
    pub fn at(objects_dir: impl Into<PathBuf>) -> io::Result<Self> {
        let objects_dir = objects_dir.into();
        fs::create_dir_all(&objects_dir)?;
        Ok(LooseStore { objects_dir })
    }

    fn path_for(&self, id: &ObjectId) -> PathBuf {
        let hex = id.to_hex();
        self.objects_dir.join(&hex[..2]).join(&hex[2..])
    }
}

impl RawStore for LooseStore {
    fn has(&self, id: &ObjectId) -> bool {
        self.path_for(id).is_file()
    }

    fn put(&self, id: &ObjectId, reader: &mut dyn Read) -> io::Result<()> {
        let dest = self.path_for(id);
        if dest.is_file() {
            return Ok(()); // idempotent: content is already present under this id
        }
        let dir = dest.parent().expect("path_for always nests under a fanout dir");
        fs::create_dir_all(dir)?;

        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        io::copy(reader, &mut encoder)?;
        let compressed = encoder.finish()?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(&compressed)?;
        tmp.flush()?;
        match tmp.persist(&dest) {
            Ok(_) => Ok(()),
            // another writer raced us to the same content-addressed path; that's fine.
            Err(e) if dest.is_file() => {
                let _ = e;
                Ok(())
            }
            Err(e) => Err(e.error),
        }
    }

    fn get(&self, id: &ObjectId) -> io::Result<Option<Box<dyn Read + Send>>> {
        let path = self.path_for(id);
        if !path.is_file() {
            return Ok(None);
        }
        let file = fs::File::open(path)?;
        Ok(Some(Box::new(ZlibDecoder::new(file)) as Box<dyn Read + Send>))
    }

    fn delete(&self, id: &ObjectId) -> io::Result<bool> {
        let path = self.path_for(id);
        match fs::remove_file(&path) {
            Ok(()) => {
                remove_if_empty(path.parent().expect("fanout dir"));
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn iterate(&self) -> io::Result<Vec<ObjectId>> {
        let mut out = Vec::new();
        if !self.objects_dir.is_dir() {
            return Ok(out);
        }
        for fanout in fs::read_dir(&self.objects_dir)? {
            let fanout = fanout?;
            if !fanout.file_type()?.is_dir() {
                continue;
            }
            let prefix = fanout.file_name();
            let prefix = prefix.to_string_lossy();
            if prefix.len() != 2 || !prefix.chars().all(|c| c.is_ascii_hexdigit()) {
                continue;
            }
            for entry in fs::read_dir(fanout.path())? {
                let entry = entry?;
                if !entry.file_type()?.is_file() {
                    continue;
                }
                let suffix = entry.file_name();
                let hex = format!("{prefix}{}", suffix.to_string_lossy());
                if let Ok(id) = ObjectId::from_hex(&hex) {
                    out.push(id);
                }
            }
        }
        Ok(out)
    }
}

fn remove_if_empty(dir: &Path) {
    if let Ok(mut entries) = fs::read_dir(dir) {
        if entries.next().is_none() {
            let _ = fs::remove_dir(dir);
        }
    }
}
