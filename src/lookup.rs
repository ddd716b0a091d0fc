//! Random access to single members.
//!
//! [`read_member_by_name`] scans header entries one at a time and stops at
//! the first match, then seeks straight to that payload. Nothing past the
//! matching entry is parsed and no other payload is read.
//!
//! [`EntryIndex`] is the alternative for sessions that look up many names:
//! parse the header once, then answer each query from a map.

use std::collections::HashMap;
use std::io::{Read, Seek, SeekFrom};

use tracing::debug;

use crate::entry::FileEntry;
use crate::error::{Error, Result};
use crate::file::ArchivedFile;
use crate::header::EntryScan;

/// Find the first header entry named `name`, parsing entries lazily.
pub fn find_entry<R: Read>(reader: R, name: &str) -> Result<FileEntry> {
    let mut scan = EntryScan::start(reader)?;
    while let Some(entry) = scan.next_entry()? {
        if entry.name == name {
            return Ok(entry);
        }
    }
    Err(Error::EntryNotFound(name.to_owned()))
}

/// Read one member without loading the rest of the archive.
///
/// `reader` is rewound to the start first, so it may be positioned anywhere.
pub fn read_member_by_name<R: Read + Seek>(mut reader: R, name: &str) -> Result<ArchivedFile> {
    reader.seek(SeekFrom::Start(0))?;
    let entry = find_entry(&mut reader, name)?;
    debug!(member = name, offset = entry.offset, size = entry.size, "located member");
    entry.read_payload(&mut reader)
}

/// Name-keyed, read-only view of a header. Never serialized.
///
/// When an archive from another writer repeats a name, the first entry wins,
/// matching [`find_entry`].
#[derive(Debug, Clone, Default)]
pub struct EntryIndex {
    header_length: u32,
    order:         Vec<String>,
    entries:       HashMap<String, FileEntry>,
}

impl EntryIndex {
    pub fn read<R: Read>(reader: R) -> Result<Self> {
        let mut scan = EntryScan::start(reader)?;
        let mut index = Self { header_length: scan.header_length, ..Self::default() };
        while let Some(entry) = scan.next_entry()? {
            if !index.entries.contains_key(&entry.name) {
                index.order.push(entry.name.clone());
                index.entries.insert(entry.name.clone(), entry);
            }
        }
        Ok(index)
    }

    pub fn header_length(&self) -> u32 { self.header_length }

    pub fn len(&self) -> usize { self.entries.len() }

    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    pub fn get(&self, name: &str) -> Option<&FileEntry> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Distinct names in header order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn read_member<R: Read + Seek>(&self, reader: R, name: &str) -> Result<ArchivedFile> {
        self.get(name)
            .ok_or_else(|| Error::EntryNotFound(name.to_owned()))?
            .read_payload(reader)
    }
}
