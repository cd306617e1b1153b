//! The file-system side of a working copy: reading worktree content for
//! status/checkout comparisons (§4.I). Kept as a small trait so tests can
//! swap in an in-memory worktree without touching a real disk.

use std::collections::BTreeMap;
use std::path::PathBuf;

/// A queryable view of the files on disk under a worktree root.
pub trait Worktree {
    /// Full content of `path` (worktree-relative, `/`-separated), or `None`
    /// if it doesn't exist or isn't a regular file.
    fn read(&self, path: &str) -> std::io::Result<Option<Vec<u8>>>;

    /// Byte length of `path`, without reading its content — the §4.I
    /// "size fast-path" for detecting a dirty worktree file.
    fn size(&self, path: &str) -> std::io::Result<Option<u64>>;

    fn exists(&self, path: &str) -> bool;

    fn is_dir(&self, path: &str) -> bool;
}

/// A real filesystem worktree rooted at a directory.
pub struct FsWorktree {
    root: PathBuf,
}

impl FsWorktree {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FsWorktree { root: root.into() }
    }

    fn full_path(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }
}

impl Worktree for FsWorktree {
    fn read(&self, path: &str) -> std::io::Result<Option<Vec<u8>>> {
        match std::fs::read(self.full_path(path)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn size(&self, path: &str) -> std::io::Result<Option<u64>> {
        match std::fs::metadata(self.full_path(path)) {
            Ok(meta) if meta.is_file() => Ok(Some(meta.len())),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn exists(&self, path: &str) -> bool {
        self.full_path(path).exists()
    }

    fn is_dir(&self, path: &str) -> bool {
        self.full_path(path).is_dir()
    }
}

/// An in-memory worktree, for tests that want to exercise status/checkout
/// logic without touching a real filesystem.
#[derive(Debug, Default, Clone)]
pub struct MemoryWorktree {
    files: BTreeMap<String, Vec<u8>>,
}

impl MemoryWorktree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, path: impl Into<String>, content: impl Into<Vec<u8>>) {
        self.files.insert(path.into(), content.into());
    }

    pub fn remove(&mut self, path: &str) {
        self.files.remove(path);
    }
}

impl Worktree for MemoryWorktree {
    fn read(&self, path: &str) -> std::io::Result<Option<Vec<u8>>> {
        Ok(self.files.get(path).cloned())
    }

    fn size(&self, path: &str) -> std::io::Result<Option<u64>> {
        Ok(self.files.get(path).map(|b| b.len() as u64))
    }

    fn exists(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    fn is_dir(&self, path: &str) -> bool {
        let prefix = format!("{path}/");
        self.files.keys().any(|p| p.starts_with(&prefix))
    }
}
