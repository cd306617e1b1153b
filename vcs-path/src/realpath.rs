//! Symlink-resolving path canonicalization, adapted from the teacher's
//! `git-path/src/realpath.rs`: recursive component-by-component resolution
//! with a bound on the number of symlinks followed, so a `.git` directory
//! reached through a symlinked worktree resolves the same way native Git
//! resolves it.

use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("the maximum allowed number {max_symlinks} of symlinks in a path was exceeded")]
    MaxSymlinksExceeded { max_symlinks: u8 },
    #[error(transparent)]
    ReadLink(#[from] std::io::Error),
    #[error("an empty path is not a valid path")]
    EmptyPath,
    #[error("parent component of {} does not exist", .path.display())]
    MissingParent { path: PathBuf },
}

/// Resolves `path` (relative to `cwd` if relative) to an absolute path with
/// all symlinks followed, refusing to follow more than `max_symlinks` of
/// them to guard against cycles.
pub fn realpath(path: impl AsRef<Path>, cwd: impl AsRef<Path>, max_symlinks: u8) -> Result<PathBuf, Error> {
    let path = path.as_ref();
    if path.as_os_str().is_empty() {
        return Err(Error::EmptyPath);
    }

    let mut real_path = PathBuf::new();
    if path.is_relative() {
        real_path.push(cwd);
    }

    traverse(path.components(), 0, max_symlinks, &mut real_path)?;
    Ok(real_path)
}

fn traverse(
    mut input_path: std::path::Components<'_>,
    mut num_symlinks: u8,
    max_symlinks: u8,
    real_path: &mut PathBuf,
) -> Result<(), Error> {
    use std::path::Component::{CurDir, Normal, ParentDir, Prefix, RootDir};

    match input_path.next() {
        None => Ok(()),
        Some(part) => match part {
            RootDir | Prefix(_) => {
                real_path.push(part);
                traverse(input_path, num_symlinks, max_symlinks, real_path)
            }
            CurDir => traverse(input_path, num_symlinks, max_symlinks, real_path),
            ParentDir => {
                if !real_path.pop() {
                    return Err(Error::MissingParent {
                        path: real_path.clone(),
                    });
                }
                traverse(input_path, num_symlinks, max_symlinks, real_path)
            }
            Normal(part) => {
                real_path.push(part);
                if real_path.is_symlink() {
                    num_symlinks += 1;
                    if num_symlinks > max_symlinks {
                        return Err(Error::MaxSymlinksExceeded { max_symlinks });
                    }
                    let mut resolved_symlink = std::fs::read_link(real_path.as_path())?;
                    if resolved_symlink.is_absolute() {
                        *real_path = PathBuf::from(std::path::MAIN_SEPARATOR.to_string());
                    } else {
                        *real_path = real_path
                            .parent()
                            .ok_or_else(|| Error::MissingParent {
                                path: real_path.clone(),
                            })?
                            .into();
                    }
                    resolved_symlink.push(input_path.collect::<PathBuf>());
                    traverse(resolved_symlink.components(), num_symlinks, max_symlinks, real_path)
                } else {
                    traverse(input_path, num_symlinks, max_symlinks, real_path)
                }
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_path_is_rejected() {
        assert!(matches!(realpath("", "/tmp", 8), Err(Error::EmptyPath)));
    }

    #[test]
    fn plain_relative_path_resolves_against_cwd() {
        let resolved = realpath("a/b", "/tmp/x", 8).unwrap();
        assert_eq!(resolved, PathBuf::from("/tmp/x/a/b"));
    }

    #[test]
    fn dot_and_dotdot_components_are_normalized() {
        let resolved = realpath("./a/../b", "/tmp/x", 8).unwrap();
        assert_eq!(resolved, PathBuf::from("/tmp/x/b"));
    }

    #[test]
    fn symlink_cycle_is_bounded() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        #[cfg(unix)]
        {
            std::os::unix::fs::symlink(&b, &a).unwrap();
            std::os::unix::fs::symlink(&a, &b).unwrap();
            let err = realpath(&a, dir.path(), 4).unwrap_err();
            assert!(matches!(err, Error::MaxSymlinksExceeded { max_symlinks: 4 }));
        }
    }
}
