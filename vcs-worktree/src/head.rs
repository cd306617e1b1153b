//! `HEAD`: a symbolic ref in the normal case (pointing at the checked-out
//! branch), or a direct commit id when detached (§4.I).

use crate::{Error, HEAD_NAME};
use vcs_hash::ObjectId;
use vcs_ref::{RefStore, Value};

/// What `HEAD` currently points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeadTarget {
    /// Checked out on a branch; carries the branch's full ref name
    /// (`refs/heads/<name>`) and its current commit, if the branch has one.
    Branch { name: String, commit: Option<ObjectId> },
    /// Detached: `HEAD` is a direct ref to a commit.
    Detached(ObjectId),
    /// A symbolic `HEAD` whose target branch doesn't exist yet (the state
    /// of a freshly initialized, commit-less repository).
    Unborn { name: String },
}

/// A thin façade over a [`RefStore`] for `HEAD`-specific reads/writes.
pub struct Head<'a> {
    refs: &'a dyn RefStore,
}

impl<'a> Head<'a> {
    pub fn new(refs: &'a dyn RefStore) -> Self {
        Head { refs }
    }

    /// Resolves `HEAD`'s current target, auto-detecting branch vs detached.
    pub fn get(&self) -> Result<HeadTarget, Error> {
        let record = self.refs.get(HEAD_NAME)?.ok_or(Error::IllegalState("HEAD is unset"))?;
        match record.value {
            Value::Direct(id) => Ok(HeadTarget::Detached(id)),
            Value::Symbolic(name) => match self.refs.resolve(HEAD_NAME)? {
                Some(commit) => Ok(HeadTarget::Branch {
                    name,
                    commit: Some(commit),
                }),
                None => Ok(HeadTarget::Unborn { name }),
            },
        }
    }

    /// Points `HEAD` at `target`: a ref name starting with `refs/` is
    /// written as a symbolic ref (checking out a branch); any other value
    /// is parsed as a commit id and written as a direct ref (detaching).
    pub fn set(&self, target: &str) -> Result<(), Error> {
        if target.starts_with("refs/") {
            self.refs.set_symbolic(HEAD_NAME, target)?;
        } else {
            let id = ObjectId::from_hex(target).map_err(|_| Error::IllegalState("HEAD target is neither a ref name nor an object id"))?;
            self.refs.set(HEAD_NAME, id)?;
        }
        Ok(())
    }

    /// Detaches `HEAD` directly onto `commit`.
    pub fn detach(&self, commit: ObjectId) -> Result<(), Error> {
        Ok(self.refs.set(HEAD_NAME, commit)?)
    }

    pub fn current_branch(&self) -> Result<Option<String>, Error> {
        match self.get()? {
            HeadTarget::Branch { name, .. } | HeadTarget::Unborn { name } => Ok(Some(name)),
            HeadTarget::Detached(_) => Ok(None),
        }
    }

    pub fn is_detached(&self) -> Result<bool, Error> {
        Ok(matches!(self.get()?, HeadTarget::Detached(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vcs_ref::MemoryRefStore;

    fn id(b: u8) -> ObjectId {
        ObjectId::from_bytes(&[b; 20]).unwrap()
    }

    #[test]
    fn branch_checkout_reports_name_and_commit() {
        let refs = MemoryRefStore::new();
        refs.set("refs/heads/main", id(1)).unwrap();
        refs.set_symbolic("HEAD", "refs/heads/main").unwrap();
        let head = Head::new(&refs);
        assert_eq!(
            head.get().unwrap(),
            HeadTarget::Branch {
                name: "refs/heads/main".into(),
                commit: Some(id(1)),
            }
        );
        assert!(!head.is_detached().unwrap());
        assert_eq!(head.current_branch().unwrap(), Some("refs/heads/main".into()));
    }

    #[test]
    fn detach_switches_to_a_direct_ref() {
        let refs = MemoryRefStore::new();
        refs.set_symbolic("HEAD", "refs/heads/main").unwrap();
        let head = Head::new(&refs);
        head.detach(id(2)).unwrap();
        assert_eq!(head.get().unwrap(), HeadTarget::Detached(id(2)));
        assert!(head.is_detached().unwrap());
        assert_eq!(head.current_branch().unwrap(), None);
    }

    #[test]
    fn unborn_branch_has_no_commit_yet() {
        let refs = MemoryRefStore::new();
        refs.set_symbolic("HEAD", "refs/heads/main").unwrap();
        let head = Head::new(&refs);
        assert_eq!(
            head.get().unwrap(),
            HeadTarget::Unborn {
                name: "refs/heads/main".into()
            }
        );
    }

    #[test]
    fn set_with_ref_name_writes_symbolic_and_with_hex_writes_direct() {
        let refs = MemoryRefStore::new();
        refs.set("refs/heads/other", id(3)).unwrap();
        let head = Head::new(&refs);
        head.set("refs/heads/other").unwrap();
        assert!(!head.is_detached().unwrap());
        head.set(&id(3).to_hex()).unwrap();
        assert!(head.is_detached().unwrap());
    }
}
