//! A file-based [`RefStore`] matching Git's `.git` layout (§6): loose refs
//! as one file per name under the ref-store root, a `packed-refs` file for
//! the packed table. Mutations go through a `.lock` sidecar so concurrent
//! writers on the same name never interleave (§5: "single-writer discipline
//! ... file locks").

use crate::packed::PackedRefs;
use crate::{Error, Record, RefStore, Storage, Value};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use vcs_hash::ObjectId;

pub struct FileRefStore {
    root: PathBuf,
}

impl FileRefStore {
    /// Opens (creating if missing) a ref store rooted at `root` — the
    /// directory that would be `.git` in a native checkout, containing
    /// `refs/`, `HEAD`, and (once packed) `packed-refs`.
    pub fn init(root: impl Into<PathBuf>) -> Result<Self, Error> {
        let root = root.into();
        fs::create_dir_all(root.join("refs").join("heads"))?;
        fs::create_dir_all(root.join("refs").join("tags"))?;
        Ok(FileRefStore { root })
    }

    fn loose_path(&self, name: &str) -> Result<PathBuf, Error> {
        vcs_path::validate::validate_path(name.as_bytes())?;
        Ok(self.root.join(name))
    }

    fn packed_path(&self) -> PathBuf {
        self.root.join("packed-refs")
    }

    fn read_packed(&self) -> Result<PackedRefs, Error> {
        match fs::read_to_string(self.packed_path()) {
            Ok(text) => PackedRefs::parse(&text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(PackedRefs::default()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_packed(&self, packed: &PackedRefs) -> Result<(), Error> {
        write_atomic(&self.packed_path(), packed.serialize().as_bytes())
    }

    fn read_loose(&self, name: &str) -> Result<Option<Value>, Error> {
        let path = self.loose_path(name)?;
        match fs::read_to_string(&path) {
            Ok(text) => Ok(Some(parse_loose(&text)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write_loose(&self, name: &str, value: &Value) -> Result<(), Error> {
        let path = self.loose_path(name)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        write_atomic(&path, serialize_loose(value).as_bytes())
    }

    fn remove_loose(&self, name: &str) -> Result<bool, Error> {
        let path = self.loose_path(name)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                prune_empty_parents(path.parent(), &self.root.join("refs"));
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

fn parse_loose(text: &str) -> Result<Value, Error> {
    let text = text.trim_end_matches(['\n', '\r']);
    if let Some(target) = text.strip_prefix("ref: ") {
        Ok(Value::Symbolic(target.trim().to_string()))
    } else {
        Ok(Value::Direct(
            ObjectId::from_hex(text.trim())
                .map_err(|e| Error::CorruptPackedRefs(format!("bad loose ref content {text:?}: {e}")))?,
        ))
    }
}

fn serialize_loose(value: &Value) -> String {
    match value {
        Value::Direct(id) => format!("{}\n", id.to_hex()),
        Value::Symbolic(target) => format!("ref: {target}\n"),
    }
}

/// Writes `bytes` to `path` via a sibling temp file, so a reader never
/// observes a half-written ref.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), Error> {
    let dir = path.parent().expect("ref path always has a parent");
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Removes `dir` and its now-empty ancestors, stopping at (and never
/// removing) `stop_at`.
fn prune_empty_parents(dir: Option<&Path>, stop_at: &Path) {
    let mut dir = match dir {
        Some(d) => d.to_path_buf(),
        None => return,
    };
    loop {
        if dir == stop_at || !dir.starts_with(stop_at) {
            return;
        }
        match fs::read_dir(&dir) {
            Ok(mut entries) if entries.next().is_none() => {
                if fs::remove_dir(&dir).is_err() {
                    return;
                }
            }
            _ => return,
        }
        match dir.parent() {
            Some(p) => dir = p.to_path_buf(),
            None => return,
        }
    }
}

fn walk_loose(dir: &Path, root: &Path, out: &mut Vec<String>) -> Result<(), Error> {
    if !dir.is_dir() {
        return Ok(());
    }
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            walk_loose(&path, root, out)?;
        } else {
            let relative = path.strip_prefix(root).expect("walked path is under root");
            let name = relative.to_string_lossy().replace(std::path::MAIN_SEPARATOR, "/");
            out.push(name);
        }
    }
    Ok(())
}

impl RefStore for FileRefStore {
    fn get(&self, name: &str) -> Result<Option<Record>, Error> {
        if let Some(value) = self.read_loose(name)? {
            return Ok(Some(Record {
                name: name.to_string(),
                value,
                storage: Storage::Loose,
                peeled: None,
            }));
        }
        let packed = self.read_packed()?;
        Ok(packed.entries.get(name).map(|entry| Record {
            name: name.to_string(),
            value: Value::Direct(entry.id),
            storage: Storage::Packed,
            peeled: entry.peeled,
        }))
    }

    fn set(&self, name: &str, id: ObjectId) -> Result<(), Error> {
        self.write_loose(name, &Value::Direct(id))
    }

    fn set_symbolic(&self, name: &str, target: &str) -> Result<(), Error> {
        self.write_loose(name, &Value::Symbolic(target.to_string()))
    }

    fn compare_and_swap(&self, name: &str, expected: Option<ObjectId>, new: ObjectId) -> Result<(), Error> {
        // the loose file's own atomic rename is our single-writer lock:
        // re-read immediately before writing so two racing callers can't
        // both observe a stale `expected`.
        let path = self.loose_path(name)?;
        let mut lock_path = path.clone().into_os_string();
        lock_path.push(".lock");
        let lock_path = PathBuf::from(lock_path);
        let _lock = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&lock_path)
            .map_err(|_| Error::CasFailure {
                name: name.to_string(),
                expected,
                current: None,
            })?;
        let result = (|| {
            let current = match self.get(name)? {
                Some(Record { value: Value::Direct(id), .. }) => Some(id),
                _ => None,
            };
            if current != expected {
                return Err(Error::CasFailure {
                    name: name.to_string(),
                    expected,
                    current,
                });
            }
            self.set(name, new)
        })();
        let _ = fs::remove_file(&lock_path);
        result
    }

    fn remove(&self, name: &str) -> Result<bool, Error> {
        let loose_removed = self.remove_loose(name)?;
        let mut packed = self.read_packed()?;
        let packed_removed = packed.entries.remove(name).is_some();
        if packed_removed {
            self.write_packed(&packed)?;
        }
        Ok(loose_removed || packed_removed)
    }

    fn list(&self, prefix: Option<&str>) -> Result<Vec<Record>, Error> {
        let mut names = Vec::new();
        walk_loose(&self.root.join("refs"), &self.root, &mut names)?;
        if self.loose_path("HEAD")?.is_file() {
            names.push("HEAD".to_string());
        }
        names.retain(|n| !n.ends_with(".lock"));

        let packed = self.read_packed()?;
        let mut seen: std::collections::HashSet<String> = std::collections::HashSet::new();
        let mut out = Vec::new();
        for name in names {
            if prefix.map_or(false, |p| !name.starts_with(p)) {
                continue;
            }
            if let Some(record) = self.get(&name)? {
                seen.insert(name);
                out.push(record);
            }
        }
        for (name, entry) in &packed.entries {
            if seen.contains(name) {
                continue;
            }
            if prefix.map_or(false, |p| !name.starts_with(p)) {
                continue;
            }
            out.push(Record {
                name: name.clone(),
                value: Value::Direct(entry.id),
                storage: Storage::Packed,
                peeled: entry.peeled,
            });
        }
        Ok(out)
    }

    fn optimize(&self) -> Result<(), Error> {
        let mut names = Vec::new();
        walk_loose(&self.root.join("refs"), &self.root, &mut names)?;
        let mut packed = self.read_packed()?;
        for name in names {
            if let Some(Value::Direct(id)) = self.read_loose(&name)? {
                let peeled = packed.entries.get(&name).and_then(|e| e.peeled);
                packed.entries.insert(name.clone(), crate::packed::Entry { id, peeled });
                self.remove_loose(&name)?;
            }
        }
        self.write_packed(&packed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(byte: u8) -> ObjectId {
        ObjectId::from_bytes(&[byte; 20]).unwrap()
    }

    #[test]
    fn loose_ref_file_matches_native_git_content() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileRefStore::init(dir.path()).unwrap();
        store.set("refs/heads/main", id(1)).unwrap();
        let content = fs::read_to_string(dir.path().join("refs/heads/main")).unwrap();
        assert_eq!(content, format!("{}\n", id(1).to_hex()));
    }

    #[test]
    fn optimize_moves_loose_into_packed_and_prunes_loose_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileRefStore::init(dir.path()).unwrap();
        store.set("refs/heads/main", id(1)).unwrap();
        store.optimize().unwrap();
        assert!(!dir.path().join("refs/heads/main").is_file());
        let record = store.get("refs/heads/main").unwrap().unwrap();
        assert_eq!(record.storage, Storage::Packed);
        assert_eq!(record.value, Value::Direct(id(1)));
    }

    #[test]
    fn remove_never_deletes_refs_root() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileRefStore::init(dir.path()).unwrap();
        store.set("refs/heads/main", id(1)).unwrap();
        store.remove("refs/heads/main").unwrap();
        assert!(dir.path().join("refs").is_dir());
    }

    #[test]
    fn head_round_trips_as_symbolic_loose_ref() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileRefStore::init(dir.path()).unwrap();
        store.set_symbolic("HEAD", "refs/heads/main").unwrap();
        let record = store.get("HEAD").unwrap().unwrap();
        assert_eq!(record.value, Value::Symbolic("refs/heads/main".into()));
        assert_eq!(record.storage, Storage::Loose);
    }
}
