//! The archive index.
//!
//! ```text
//! [magic "AAR?"][headerLength u32][entry_0]...[entry_n]
//! ```
//!
//! `headerLength` counts every byte above, magic included. Payloads follow
//! immediately after the last entry, in entry order. Entry offsets are stored
//! one past the payload's real start: the first payload begins at byte
//! `headerLength` but is recorded as `headerLength + 1`. Readers subtract the
//! one again before seeking, so both sides must keep the convention.

use std::collections::HashSet;
use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use tracing::debug;

use crate::entry::FileEntry;
use crate::error::{Error, Result};
use crate::file::ArchivedFile;
use crate::format::{self, Kind, FIXED_HEADER_LEN};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Header {
    /// Serialized length in bytes, including the magic and this field.
    pub header_length: u32,
    pub entries:       Vec<FileEntry>,
}

impl Header {
    /// Build the header for `files`, assigning offsets in file order.
    ///
    /// Names must be unique; a repeated name is rejected rather than left for
    /// by-name lookup to silently shadow.
    pub fn from_files(files: &[ArchivedFile]) -> Result<Self> {
        let mut seen = HashSet::with_capacity(files.len());
        let mut entries = Vec::with_capacity(files.len());
        let mut header_length = u64::from(FIXED_HEADER_LEN);

        for file in files {
            if !seen.insert(file.name()) {
                return Err(Error::DuplicateEntry(file.name().to_owned()));
            }
            let size = u32::try_from(file.compressed_size()).map_err(|_| Error::ArchiveTooLarge)?;
            let entry = FileEntry::new(file.name(), size)?;
            header_length += u64::from(entry.total_bytes());
            entries.push(entry);
        }

        let header_length = u32::try_from(header_length).map_err(|_| Error::ArchiveTooLarge)?;

        let mut offset = header_length.checked_add(1).ok_or(Error::ArchiveTooLarge)?;
        let mut iter = entries.iter_mut().peekable();
        while let Some(entry) = iter.next() {
            entry.offset = offset;
            // The end of the last payload only has to fit once it becomes
            // someone's offset.
            if iter.peek().is_some() {
                offset = offset.checked_add(entry.size).ok_or(Error::ArchiveTooLarge)?;
            }
        }

        Ok(Self { header_length, entries })
    }

    /// Serialize, failing with `HeaderLengthMismatch` if the declared length
    /// disagrees with what was produced. Nothing is returned on mismatch.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(self.header_length as usize);
        out.extend_from_slice(&format::MAGIC);
        out.write_u32::<LittleEndian>(self.header_length)?;
        for entry in &self.entries {
            entry.write(&mut out)?;
        }
        if out.len() as u64 != u64::from(self.header_length) {
            return Err(Error::HeaderLengthMismatch {
                declared: self.header_length,
                actual:   out.len() as u64,
            });
        }
        Ok(out)
    }

    /// Write the header. The length check runs before the first byte reaches
    /// `writer`.
    pub fn write<W: Write>(&self, mut writer: W) -> Result<()> {
        let bytes = self.to_bytes()?;
        writer.write_all(&bytes)?;
        Ok(())
    }

    /// Parse a header, leaving `reader` positioned at the first payload.
    pub fn read<R: Read>(mut reader: R) -> Result<Self> {
        let mut scan = EntryScan::start(&mut reader)?;
        let mut entries = Vec::new();
        while let Some(entry) = scan.next_entry()? {
            entries.push(entry);
        }
        debug!(entries = entries.len(), header_length = scan.header_length, "parsed header");
        Ok(Self { header_length: scan.header_length, entries })
    }

    /// Sum of all compressed payload sizes.
    pub fn payload_len(&self) -> u64 {
        self.entries.iter().map(|e| u64::from(e.size)).sum()
    }
}

/// Incremental header parser: yields one entry at a time and stops exactly
/// at `headerLength`. Shared by [`Header::read`] and the by-name lookup,
/// which must not materialize the whole entry list.
pub(crate) struct EntryScan<R> {
    reader:            R,
    pub header_length: u32,
    consumed:          u64,
}

impl<R: Read> EntryScan<R> {
    pub fn start(mut reader: R) -> Result<Self> {
        format::expect_magic(&mut reader, Kind::Plain)?;
        let header_length = reader.read_u32::<LittleEndian>().map_err(|e| match e.kind() {
            std::io::ErrorKind::UnexpectedEof => Error::TruncatedEntry,
            _ => Error::Io(e),
        })?;
        if header_length < FIXED_HEADER_LEN {
            return Err(Error::HeaderLengthMismatch {
                declared: header_length,
                actual:   u64::from(FIXED_HEADER_LEN),
            });
        }
        Ok(Self { reader, header_length, consumed: u64::from(FIXED_HEADER_LEN) })
    }

    /// `Ok(None)` once exactly `headerLength` bytes have been consumed.
    pub fn next_entry(&mut self) -> Result<Option<FileEntry>> {
        if self.consumed >= u64::from(self.header_length) {
            return Ok(None);
        }
        let entry = FileEntry::read(&mut self.reader)?;
        self.consumed += u64::from(entry.total_bytes());
        if self.consumed > u64::from(self.header_length) {
            return Err(Error::HeaderLengthMismatch {
                declared: self.header_length,
                actual:   self.consumed,
            });
        }
        Ok(Some(entry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 4 magic + 4 length + 2 name length + 8 name + 8 offset/size = 26
    const ONE_ENTRY: [u8; 26] = [
        0x41, 0x41, 0x52, 0x3F,
        0x1A, 0x00, 0x00, 0x00,
        0x08, 0x00,
        b't', b'e', b's', b't', b'.', b't', b'x', b't',
        0x1B, 0x00, 0x00, 0x00,
        0x04, 0x00, 0x00, 0x00,
    ];

    fn one_entry_header() -> Header {
        Header {
            header_length: 26,
            entries: vec![FileEntry { name: "test.txt".into(), offset: 27, size: 4 }],
        }
    }

    #[test]
    fn serializes_one_entry() {
        assert_eq!(one_entry_header().to_bytes().unwrap(), ONE_ENTRY);
    }

    #[test]
    fn parses_one_entry() {
        let header = Header::read(&ONE_ENTRY[..]).unwrap();
        assert_eq!(header, one_entry_header());
    }

    #[test]
    fn empty_header_is_eight_bytes() {
        let header = Header::from_files(&[]).unwrap();
        assert_eq!(header.header_length, 8);
        let bytes = header.to_bytes().unwrap();
        assert_eq!(bytes, [0x41, 0x41, 0x52, 0x3F, 8, 0, 0, 0]);
        assert_eq!(Header::read(&bytes[..]).unwrap(), header);
    }

    #[test]
    fn from_files_assigns_contiguous_offsets() {
        let files = vec![
            ArchivedFile::from_compressed("a.txt", vec![0; 5]),
            ArchivedFile::from_compressed("bb.txt", vec![0; 7]),
            ArchivedFile::from_compressed("c", vec![0; 2]),
        ];
        let header = Header::from_files(&files).unwrap();
        assert_eq!(header.header_length, 8 + (2 + 5 + 8) + (2 + 6 + 8) + (2 + 1 + 8));
        assert_eq!(header.entries[0].offset, header.header_length + 1);
        assert_eq!(header.entries[1].offset, header.entries[0].offset + 5);
        assert_eq!(header.entries[2].offset, header.entries[1].offset + 7);
        assert_eq!(header.to_bytes().unwrap().len(), header.header_length as usize);
    }

    #[test]
    fn write_rejects_wrong_declared_length() {
        let mut header = one_entry_header();
        header.header_length = 30;
        let mut sink = Vec::new();
        let err = header.write(&mut sink).unwrap_err();
        assert!(matches!(err, Error::HeaderLengthMismatch { declared: 30, actual: 26 }));
        assert!(sink.is_empty(), "nothing is written on mismatch");
    }

    #[test]
    fn rejects_wrong_magic() {
        let mut bytes = ONE_ENTRY;
        bytes[3] = b'X';
        assert!(matches!(Header::read(&bytes[..]).unwrap_err(), Error::InvalidMagic { .. }));
    }

    #[test]
    fn entry_overrunning_declared_length_is_mismatch() {
        let mut bytes = ONE_ENTRY;
        bytes[4] = 20;
        let err = Header::read(&bytes[..]).unwrap_err();
        assert!(matches!(err, Error::HeaderLengthMismatch { declared: 20, actual: 26 }));
    }

    #[test]
    fn declared_length_below_fixed_part_is_mismatch() {
        let bytes = [0x41, 0x41, 0x52, 0x3F, 3, 0, 0, 0];
        assert!(matches!(
            Header::read(&bytes[..]).unwrap_err(),
            Error::HeaderLengthMismatch { declared: 3, .. }
        ));
    }

    #[test]
    fn stream_ending_inside_header_is_truncated_entry() {
        assert!(matches!(Header::read(&ONE_ENTRY[..20]).unwrap_err(), Error::TruncatedEntry));
        assert!(matches!(Header::read(&ONE_ENTRY[..6]).unwrap_err(), Error::TruncatedEntry));
    }

    #[test]
    fn read_stops_at_declared_length() {
        let mut bytes = ONE_ENTRY.to_vec();
        bytes.extend_from_slice(b"PAYL");
        let mut cursor = std::io::Cursor::new(bytes);
        Header::read(&mut cursor).unwrap();
        assert_eq!(cursor.position(), 26);
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let files = vec![
            ArchivedFile::from_compressed("same", vec![1]),
            ArchivedFile::from_compressed("same", vec![2]),
        ];
        assert!(matches!(Header::from_files(&files).unwrap_err(), Error::DuplicateEntry(n) if n == "same"));
    }
}
