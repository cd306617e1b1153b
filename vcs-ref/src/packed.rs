//! The `packed-refs` file format (§4.D, §6): an optional capabilities
//! header, then `<id> SP <name>\n` lines, each optionally followed by a
//! `^<peeled-id>\n` line recording an annotated tag's peeled target.

use crate::Error;
use std::collections::BTreeMap;
use vcs_hash::ObjectId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub id: ObjectId,
    pub peeled: Option<ObjectId>,
}

/// The packed table: name -> (direct id, optional peeled target). Only
/// direct refs are ever packed; symbolic refs are always loose.
#[derive(Debug, Clone, Default)]
pub struct PackedRefs {
    pub entries: BTreeMap<String, Entry>,
}

impl PackedRefs {
    pub fn parse(text: &str) -> Result<Self, Error> {
        let mut entries = BTreeMap::new();
        let mut last_name: Option<String> = None;
        for line in text.lines() {
            if line.is_empty() {
                continue;
            }
            if let Some(rest) = line.strip_prefix('^') {
                let peeled = ObjectId::from_hex(rest)
                    .map_err(|e| Error::CorruptPackedRefs(format!("bad peeled id {rest:?}: {e}")))?;
                let name = last_name
                    .as_ref()
                    .ok_or_else(|| Error::CorruptPackedRefs("peeled line with no preceding ref".into()))?;
                if let Some(entry) = entries.get_mut(name) {
                    let entry: &mut Entry = entry;
                    entry.peeled = Some(peeled);
                }
                continue;
            }
            if line.starts_with('#') {
                continue; // capabilities header, e.g. "# pack-refs with: peeled fully-peeled"
            }
            let space = line
                .find(' ')
                .ok_or_else(|| Error::CorruptPackedRefs(format!("malformed line {line:?}")))?;
            let id = ObjectId::from_hex(&line[..space])
                .map_err(|e| Error::CorruptPackedRefs(format!("bad id in {line:?}: {e}")))?;
            let name = line[space + 1..].to_string();
            entries.insert(name.clone(), Entry { id, peeled: None });
            last_name = Some(name);
        }
        Ok(PackedRefs { entries })
    }

    pub fn serialize(&self) -> String {
        let mut out = String::from("# pack-refs with: peeled fully-peeled\n");
        for (name, entry) in &self.entries {
            out.push_str(&entry.id.to_hex());
            out.push(' ');
            out.push_str(name);
            out.push('\n');
            if let Some(peeled) = entry.peeled {
                out.push('^');
                out.push_str(&peeled.to_hex());
                out.push('\n');
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(byte: u8) -> ObjectId {
        ObjectId::from_bytes(&[byte; 20]).unwrap()
    }

    #[test]
    fn round_trips_with_peeled_entries() {
        let mut packed = PackedRefs::default();
        packed.entries.insert(
            "refs/tags/v1".into(),
            Entry {
                id: id(1),
                peeled: Some(id(2)),
            },
        );
        packed.entries.insert(
            "refs/heads/main".into(),
            Entry { id: id(3), peeled: None },
        );
        let text = packed.serialize();
        let parsed = PackedRefs::parse(&text).unwrap();
        assert_eq!(parsed.entries, packed.entries);
    }

    #[test]
    fn rejects_peeled_line_without_preceding_ref() {
        assert!(PackedRefs::parse(&format!("^{}\n", "a".repeat(40))).is_err());
    }
}
