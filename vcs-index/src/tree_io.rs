//! `write_tree`/`read_tree` (§4.H): building nested tree objects from
//! stage-0 entries by splitting paths on `/`, and the reverse — loading a
//! tree's blobs back into the index.

use crate::{Entry, Index, Stage};
use std::collections::BTreeMap;
use vcs_hash::ObjectId;
use vcs_object::tree::Mode;
use vcs_odb::typed::TreeStore;
use vcs_object::TreeEntry;

enum Node {
    Blob { mode: Mode, id: ObjectId },
    Dir(BTreeMap<String, Node>),
}

fn insert(root: &mut BTreeMap<String, Node>, mut components: std::str::Split<'_, char>, mode: Mode, id: ObjectId) {
    let name = components.next().expect("path has at least one component");
    match components.clone().next() {
        None => {
            root.insert(name.to_string(), Node::Blob { mode, id });
        }
        Some(_) => {
            let child = root.entry(name.to_string()).or_insert_with(|| Node::Dir(BTreeMap::new()));
            if let Node::Dir(map) = child {
                insert(map, components, mode, id);
            }
        }
    }
}

fn write_node(node: &BTreeMap<String, Node>, trees: &TreeStore) -> Result<ObjectId, crate::Error> {
    let mut entries = Vec::with_capacity(node.len());
    for (name, child) in node {
        match child {
            Node::Blob { mode, id } => entries.push(TreeEntry::new(*mode, name.as_str(), *id)),
            Node::Dir(map) => {
                let id = write_node(map, trees)?;
                entries.push(TreeEntry::new(Mode::Tree, name.as_str(), id));
            }
        }
    }
    Ok(trees.store(entries)?)
}

/// Builds nested tree objects from every stage-0 entry. Refuses (per §4.H)
/// if the index has unresolved conflicts.
pub fn write_tree(index: &Index, trees: &TreeStore) -> Result<ObjectId, crate::Error> {
    if index.has_conflicts() {
        return Err(crate::Error::UnresolvedConflicts);
    }
    let mut root: BTreeMap<String, Node> = BTreeMap::new();
    for entry in &index.entries {
        let path = entry.path.to_str().map_err(|_| crate::Error::Corrupt("non-UTF8 path".into()))?;
        insert(&mut root, path.split('/'), entry.mode, entry.id);
    }
    write_node(&root, trees)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ReadTreeOptions<'a> {
    pub prefix: Option<&'a str>,
    pub stage: Option<Stage>,
    /// If true, entries already in the index outside the loaded subtree
    /// are kept; the loaded subtree's entries always replace what was
    /// there before. If false, the index is entirely replaced by the
    /// loaded tree (scoped to `prefix`, if given).
    pub keep_existing: bool,
}

/// Recursively pushes every blob entry of `tree_id`, with paths prefixed
/// by `prefix`, at the given `stage` — the shared walk behind both
/// [`read_tree`] and `Builder::add_tree`.
pub(crate) fn collect_tree_entries(
    trees: &TreeStore,
    tree_id: ObjectId,
    prefix: &str,
    stage: Stage,
    out: &mut Vec<Entry>,
) -> Result<(), crate::Error> {
    let tree = trees.load(&tree_id)?.ok_or(vcs_odb::Error::NotFound(tree_id))?;
    for entry in tree.entries {
        let name = entry.name.to_string();
        let path = if prefix.is_empty() {
            name
        } else {
            format!("{prefix}/{name}")
        };
        if entry.mode.is_tree() {
            collect_tree_entries(trees, entry.id, &path, stage, out)?;
        } else {
            out.push(Entry {
                stage,
                ..Entry::new(path, entry.mode, entry.id)
            });
        }
    }
    Ok(())
}

/// Loads `tree_id` into the index at `options.stage` (default merged),
/// under `options.prefix` (default root). Unless `keep_existing` is set,
/// any index entries within that prefix are replaced outright.
pub fn read_tree(
    index: &mut Index,
    trees: &TreeStore,
    tree_id: ObjectId,
    options: ReadTreeOptions<'_>,
) -> Result<(), crate::Error> {
    let stage = options.stage.unwrap_or(Stage::Merged);
    let prefix = options.prefix.unwrap_or("");
    let mut loaded = Vec::new();
    collect_tree_entries(trees, tree_id, prefix, stage, &mut loaded)?;

    let mut editor = index.create_editor();
    if !options.keep_existing {
        if prefix.is_empty() {
            for existing in &index.entries {
                editor.remove(existing.path.clone(), None);
            }
        } else {
            editor.add(crate::editor::Edit::remove_subtree(prefix));
        }
    }
    for entry in loaded {
        editor.upsert(entry);
    }
    *index = editor.finish()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use vcs_odb::memory::InMemoryStore;
    use vcs_odb::BlobStore;

    fn setup() -> (TreeStore, BlobStore) {
        let raw = Arc::new(InMemoryStore::new());
        (TreeStore::new(raw.clone()), BlobStore::new(raw))
    }

    #[test]
    fn write_tree_builds_nested_subtree_and_sorts_top_level() {
        let (trees, blobs) = setup();
        let ba = blobs.store_bytes(b"a").unwrap();
        let bb = blobs.store_bytes(b"b").unwrap();

        let mut idx = Index::new();
        idx.set_entry(Entry::new("a.txt", Mode::File, ba));
        idx.set_entry(Entry::new("dir/b.txt", Mode::File, bb));

        let tree_id = write_tree(&idx, &trees).unwrap();
        let tree = trees.load(&tree_id).unwrap().unwrap();
        assert_eq!(tree.entries[0].name, "a.txt");
        assert_eq!(tree.entries[1].name, "dir");

        let sub = trees.load(&tree.entries[1].id).unwrap().unwrap();
        assert_eq!(sub.entries[0].name, "b.txt");
        assert_eq!(sub.entries[0].id, bb);
    }

    #[test]
    fn write_tree_refuses_on_conflicts() {
        let (trees, _blobs) = setup();
        let mut idx = Index::new();
        let mut conflict = Entry::new("a.txt", Mode::File, ObjectId::empty_blob());
        conflict.stage = Stage::Ours;
        idx.set_entry(conflict);
        assert!(matches!(write_tree(&idx, &trees), Err(crate::Error::UnresolvedConflicts)));
    }

    #[test]
    fn read_tree_round_trips_write_tree_output() {
        let (trees, blobs) = setup();
        let ba = blobs.store_bytes(b"a").unwrap();
        let bb = blobs.store_bytes(b"b").unwrap();
        let mut original = Index::new();
        original.set_entry(Entry::new("a.txt", Mode::File, ba));
        original.set_entry(Entry::new("dir/b.txt", Mode::File, bb));
        let tree_id = write_tree(&original, &trees).unwrap();

        let mut fresh = Index::new();
        read_tree(&mut fresh, &trees, tree_id, ReadTreeOptions::default()).unwrap();
        assert!(fresh.has_entry(b"a.txt"));
        assert!(fresh.has_entry(b"dir/b.txt"));
        assert_eq!(fresh.count(), 2);
    }
}
