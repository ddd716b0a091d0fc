use std::io::{self, Read, Write};

use crate::codec::{self, Codec};
use crate::error::Result;

/// A member of an archive: its name and its compressed bytes.
///
/// The uncompressed content is never kept around; [`ArchivedFile::decompressed`]
/// derives it on demand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchivedFile {
    name:       String,
    compressed: Vec<u8>,
}

impl ArchivedFile {
    /// Wrap bytes that are already compressed, e.g. a slice read back from
    /// an archive.
    pub fn from_compressed(name: impl Into<String>, compressed: Vec<u8>) -> Self {
        Self { name: name.into(), compressed }
    }

    /// Compress `data` with the format codec at the default level.
    pub fn from_bytes(name: impl Into<String>, data: &[u8]) -> Result<Self> {
        Self::with_codec(name, data, &codec::GzipCodec::default())
    }

    pub fn with_codec<C: Codec + ?Sized>(name: impl Into<String>, data: &[u8], codec: &C) -> Result<Self> {
        Ok(Self::from_compressed(name, codec.compress(data)?))
    }

    pub fn from_reader<R: Read>(name: impl Into<String>, mut reader: R) -> Result<Self> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Self::from_bytes(name, &data)
    }

    pub fn name(&self) -> &str { &self.name }

    pub fn compressed(&self) -> &[u8] { &self.compressed }

    pub fn compressed_size(&self) -> usize { self.compressed.len() }

    pub fn decompressed(&self) -> Result<Vec<u8>> {
        Ok(codec::decompress(&self.compressed)?)
    }

    /// Write the compressed payload verbatim.
    pub fn write<W: Write>(&self, mut writer: W) -> io::Result<()> {
        writer.write_all(&self.compressed)
    }

    /// Decompress into `writer`. Returns the number of bytes written.
    pub fn write_decompressed<W: Write>(&self, mut writer: W) -> Result<u64> {
        let data = self.decompressed()?;
        writer.write_all(&data)?;
        Ok(data.len() as u64)
    }
}
