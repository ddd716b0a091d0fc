//! One header record: name, absolute payload offset and compressed size.
//!
//! Wire layout, little-endian, no padding:
//!
//! ```text
//! [nameLength u16][name: nameLength bytes][offset u32][size u32]
//! ```

use std::fmt;
use std::io::{self, Read, Seek, SeekFrom, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::file::ArchivedFile;
use crate::format::{ENTRY_FIXED_LEN, MAX_NAME_LEN};

/// Upper bound on the buffer reserved up front for one payload. `size` comes
/// from the header and is untrusted; larger payloads grow as they are read.
const PAYLOAD_PREALLOC_LIMIT: u32 = 64 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileEntry {
    pub name:   String,
    /// One past the payload's first byte; see [`FileEntry::payload_start`].
    pub offset: u32,
    pub size:   u32,
}

impl FileEntry {
    /// An entry whose offset is not known yet. [`crate::Header::from_files`]
    /// back-patches it once every size is known.
    pub fn new(name: impl Into<String>, size: u32) -> Result<Self> {
        let name = name.into();
        if name.len() > MAX_NAME_LEN {
            let len = name.len();
            return Err(Error::NameTooLong { name, len });
        }
        Ok(Self { name, offset: 0, size })
    }

    pub fn name_len(&self) -> u16 {
        self.name.len() as u16
    }

    /// Serialized size of this entry.
    pub fn total_bytes(&self) -> u32 {
        ENTRY_FIXED_LEN + u32::from(self.name_len())
    }

    /// Absolute position of the payload's first byte. Offsets are stored one
    /// higher than that, so this is `offset - 1`.
    pub fn payload_start(&self) -> Result<u64> {
        self.offset
            .checked_sub(1)
            .map(u64::from)
            .ok_or_else(|| Error::InvalidOffset { name: self.name.clone(), offset: self.offset })
    }

    pub fn write<W: Write>(&self, mut writer: W) -> io::Result<()> {
        writer.write_u16::<LittleEndian>(self.name_len())?;
        writer.write_all(self.name.as_bytes())?;
        writer.write_u32::<LittleEndian>(self.offset)?;
        writer.write_u32::<LittleEndian>(self.size)?;
        Ok(())
    }

    /// Parse one entry. A stream that ends anywhere inside the record is
    /// `TruncatedEntry`.
    pub fn read<R: Read>(mut reader: R) -> Result<Self> {
        let name_len = reader.read_u16::<LittleEndian>().map_err(truncated)?;
        let mut name = vec![0u8; name_len as usize];
        reader.read_exact(&mut name).map_err(truncated)?;
        let offset = reader.read_u32::<LittleEndian>().map_err(truncated)?;
        let size = reader.read_u32::<LittleEndian>().map_err(truncated)?;
        Ok(Self {
            name: String::from_utf8_lossy(&name).into_owned(),
            offset,
            size,
        })
    }

    /// Seek to this entry's payload and read exactly `size` bytes of it.
    pub fn read_payload<R: Read + Seek>(&self, mut reader: R) -> Result<ArchivedFile> {
        reader.seek(SeekFrom::Start(self.payload_start()?))?;
        let compressed = read_sized(&mut reader, &self.name, self.size)?;
        Ok(ArchivedFile::from_compressed(self.name.clone(), compressed))
    }
}

impl fmt::Display for FileEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (offset {} B, compressed size {} B)", self.name, self.offset, self.size)
    }
}

/// Read exactly `size` payload bytes, reporting how many were actually there
/// when the stream ends early.
pub(crate) fn read_sized<R: Read>(reader: R, name: &str, size: u32) -> Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(size.min(PAYLOAD_PREALLOC_LIMIT) as usize);
    let got = reader.take(u64::from(size)).read_to_end(&mut buf)?;
    if got < size as usize {
        return Err(Error::TruncatedPayload {
            name:      name.to_owned(),
            expected:  size,
            available: got as u64,
        });
    }
    Ok(buf)
}

fn truncated(e: io::Error) -> Error {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        Error::TruncatedEntry
    } else {
        Error::Io(e)
    }
}
