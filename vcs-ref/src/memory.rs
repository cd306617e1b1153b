//! An in-memory [`RefStore`] with a single table: there is no real
//! loose/packed split to model, so every record reports as
//! [`Storage::Loose`] and `optimize` is a no-op. Useful for embedding
//! without a filesystem and for tests.

use crate::{Error, Record, RefStore, Storage, Value};
use std::collections::BTreeMap;
use std::sync::RwLock;
use vcs_hash::ObjectId;

#[derive(Default)]
pub struct MemoryRefStore {
    refs: RwLock<BTreeMap<String, Value>>,
}

impl MemoryRefStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RefStore for MemoryRefStore {
    fn get(&self, name: &str) -> Result<Option<Record>, Error> {
        let refs = self.refs.read().expect("lock not poisoned");
        Ok(refs.get(name).map(|value| Record {
            name: name.to_string(),
            value: value.clone(),
            storage: Storage::Loose,
            peeled: None,
        }))
    }

    fn set(&self, name: &str, id: ObjectId) -> Result<(), Error> {
        vcs_path::validate::validate_path(name.as_bytes())?;
        self.refs.write().expect("lock not poisoned").insert(name.to_string(), Value::Direct(id));
        Ok(())
    }

    fn set_symbolic(&self, name: &str, target: &str) -> Result<(), Error> {
        vcs_path::validate::validate_path(name.as_bytes())?;
        self.refs
            .write()
            .expect("lock not poisoned")
            .insert(name.to_string(), Value::Symbolic(target.to_string()));
        Ok(())
    }

    fn compare_and_swap(&self, name: &str, expected: Option<ObjectId>, new: ObjectId) -> Result<(), Error> {
        let mut refs = self.refs.write().expect("lock not poisoned");
        let current = match refs.get(name) {
            Some(Value::Direct(id)) => Some(*id),
            Some(Value::Symbolic(_)) | None => None,
        };
        if current != expected {
            return Err(Error::CasFailure {
                name: name.to_string(),
                expected,
                current,
            });
        }
        refs.insert(name.to_string(), Value::Direct(new));
        Ok(())
    }

    fn remove(&self, name: &str) -> Result<bool, Error> {
        Ok(self.refs.write().expect("lock not poisoned").remove(name).is_some())
    }

    fn list(&self, prefix: Option<&str>) -> Result<Vec<Record>, Error> {
        let refs = self.refs.read().expect("lock not poisoned");
        Ok(refs
            .iter()
            .filter(|(name, _)| prefix.map_or(true, |p| name.starts_with(p)))
            .map(|(name, value)| Record {
                name: name.clone(),
                value: value.clone(),
                storage: Storage::Loose,
                peeled: None,
            })
            .collect())
    }

    fn optimize(&self) -> Result<(), Error> {
        Ok(())
    }
}
