//! An in-memory [`RawStore`], useful for tests and for embedding this crate
//! in contexts that never need transport/on-disk compatibility.

use crate::raw::RawStore;
use std::collections::HashMap;
use std::io::{self, Cursor, Read};
use std::sync::RwLock;
use vcs_hash::ObjectId;

#[derive(Default)]
pub struct InMemoryStore {
    objects: RwLock<HashMap<ObjectId, Vec<u8>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RawStore for InMemoryStore {
    fn has(&self, id: &ObjectId) -> bool {
        self.objects.read().expect("lock not poisoned").contains_key(id)
    }

    fn put(&self, id: &ObjectId, reader: &mut dyn Read) -> io::Result<()> {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        self.objects.write().expect("lock not poisoned").entry(*id).or_insert(buf);
        Ok(())
    }

    fn get(&self, id: &ObjectId) -> io::Result<Option<Box<dyn Read + Send>>> {
        let guard = self.objects.read().expect("lock not poisoned");
        Ok(guard.get(id).map(|bytes| Box::new(Cursor::new(bytes.clone())) as Box<dyn Read + Send>))
    }

    fn delete(&self, id: &ObjectId) -> io::Result<bool> {
        Ok(self.objects.write().expect("lock not poisoned").remove(id).is_some())
    }

    fn iterate(&self) -> io::Result<Vec<ObjectId>> {
        Ok(self.objects.read().expect("lock not poisoned").keys().copied().collect())
    }
}
