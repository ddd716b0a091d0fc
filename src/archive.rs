//! High-level [`Archive`] API, the main embedding surface.
//!
//! ```no_run
//! use aar::{Archive, Envelope};
//!
//! // Write
//! let archive = Archive::create(&["notes.txt", "photo.jpg"])?;
//! let mut out = std::fs::File::create("bundle.aar")?;
//! archive.write_to(&mut out)?;
//!
//! // Read one member without loading the rest
//! let mut input = std::fs::File::open("bundle.aar")?;
//! let notes = aar::read_member_by_name(&mut input, "notes.txt")?;
//! println!("{}", String::from_utf8_lossy(&notes.decompressed()?));
//!
//! // Encrypt the whole archive
//! let envelope = archive.encrypt("correct horse battery staple")?;
//! let back = envelope.decrypt_archive("correct horse battery staple")?;
//! assert_eq!(back, archive);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;

use tracing::{debug, info};

use crate::codec::{GzipCodec, DEFAULT_COMPRESSION_LEVEL};
use crate::entry::read_sized;
use crate::envelope::Envelope;
use crate::error::{Error, Result};
use crate::file::ArchivedFile;
use crate::header::Header;
use crate::perf::compress_inputs;

// ── PackOptions ───────────────────────────────────────────────────────────────

/// Configuration for [`Archive::create_with`].
#[derive(Debug, Clone)]
pub struct PackOptions {
    /// Gzip level (0-9) for every member. Reading never needs to know it.
    pub level: u32,
}

impl Default for PackOptions {
    fn default() -> Self {
        Self { level: DEFAULT_COMPRESSION_LEVEL }
    }
}

impl PackOptions {
    fn codec(&self) -> GzipCodec {
        GzipCodec::new(self.level)
    }
}

// ── Archive ───────────────────────────────────────────────────────────────────

/// A header plus its members, `files[i]` matching `header.entries[i]`.
///
/// Built once and then only read; nothing mutates an archive after
/// construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Archive {
    header: Header,
    files:  Vec<ArchivedFile>,
}

impl Archive {
    // ── Constructors ─────────────────────────────────────────────────────────

    /// Pack files from disk. Each entry is named by its path exactly as given.
    pub fn create<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        Self::create_with(paths, &PackOptions::default())
    }

    pub fn create_with<P: AsRef<Path>>(paths: &[P], opts: &PackOptions) -> Result<Self> {
        let names: Vec<String> = paths
            .iter()
            .map(|p| p.as_ref().to_string_lossy().into_owned())
            .collect();
        Self::create_from(&names, |name| fs::read(name), opts)
    }

    /// Pack inputs fetched through `resolve`. Any failure aborts; no partial
    /// archive is produced.
    pub fn create_from<S, F>(names: &[S], resolve: F, opts: &PackOptions) -> Result<Self>
    where
        S: AsRef<str> + Sync,
        F: Fn(&str) -> io::Result<Vec<u8>> + Sync,
    {
        let files = compress_inputs(names, resolve, &opts.codec())?;
        let archive = Self::from_files(files)?;
        info!(
            files = archive.files.len(),
            header_length = archive.header.header_length,
            total_size = archive.total_size(),
            "created archive"
        );
        Ok(archive)
    }

    /// Assemble already-compressed members, computing the header and offsets.
    pub fn from_files(files: Vec<ArchivedFile>) -> Result<Self> {
        let header = Header::from_files(&files)?;
        Ok(Self { header, files })
    }

    // ── Write ─────────────────────────────────────────────────────────────────

    /// Header, then every payload in entry order with no delimiters.
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        self.header.write(&mut writer)?;
        for file in &self.files {
            file.write(&mut writer)?;
        }
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let total = usize::try_from(self.total_size()).map_err(|_| Error::ArchiveTooLarge)?;
        let mut out = Vec::with_capacity(total);
        self.write_to(&mut out)?;
        Ok(out)
    }

    // ── Read ──────────────────────────────────────────────────────────────────

    /// Parse the header, then read each payload sequentially in entry order.
    pub fn read_from<R: Read>(mut reader: R) -> Result<Self> {
        let header = Header::read(&mut reader)?;
        let mut files = Vec::with_capacity(header.entries.len());
        for entry in &header.entries {
            let compressed = read_sized(&mut reader, &entry.name, entry.size)?;
            debug!(member = %entry.name, size = entry.size, "read member");
            files.push(ArchivedFile::from_compressed(entry.name.clone(), compressed));
        }
        info!(files = files.len(), header_length = header.header_length, "parsed archive");
        Ok(Self { header, files })
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::read_from(bytes)
    }

    /// Parse only the header, leaving payloads unread.
    pub fn read_header<R: Read>(reader: R) -> Result<Header> {
        Header::read(reader)
    }

    // ── Encryption ───────────────────────────────────────────────────────────

    /// Serialize and seal the whole archive under `password`.
    pub fn encrypt(&self, password: &str) -> Result<Envelope> {
        Envelope::seal(&self.to_bytes()?, password)
    }

    // ── Accessors ────────────────────────────────────────────────────────────

    pub fn header(&self) -> &Header { &self.header }

    pub fn files(&self) -> &[ArchivedFile] { &self.files }

    pub fn file(&self, name: &str) -> Option<&ArchivedFile> {
        self.files.iter().find(|f| f.name() == name)
    }

    /// `header_length + Σ size`. No I/O.
    pub fn total_size(&self) -> u64 {
        u64::from(self.header.header_length) + self.header.payload_len()
    }
}
