//! The compress/decompress boundary.
//!
//! The format has no per-entry codec tag: every payload in an archive is a
//! gzip stream (RFC 1952). [`Codec`] exists so the archive code depends on
//! the two operations rather than on `flate2` directly; [`GzipCodec`] is the
//! only implementation the format accepts.

use std::io::{Read, Write};

use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use thiserror::Error;

/// Default gzip level, the usual zlib/gzip default.
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 6;

/// Highest level deflate understands.
pub const MAX_COMPRESSION_LEVEL: u32 = 9;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Compression error: {0}")]
    Compression(String),
    #[error("Decompression error: {0}")]
    Decompression(String),
}

pub trait Codec: Send + Sync {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, CodecError>;
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, CodecError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GzipCodec {
    level: u32,
}

impl GzipCodec {
    /// `level` is 0 (stored) to 9 (best); anything higher is clamped to 9.
    pub fn new(level: u32) -> Self {
        Self { level: level.min(MAX_COMPRESSION_LEVEL) }
    }

    pub fn level(&self) -> u32 { self.level }
}

impl Default for GzipCodec {
    fn default() -> Self {
        Self::new(DEFAULT_COMPRESSION_LEVEL)
    }
}

impl Codec for GzipCodec {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::new(self.level));
        encoder.write_all(data).map_err(|e| CodecError::Compression(e.to_string()))?;
        encoder.finish().map_err(|e| CodecError::Compression(e.to_string()))
    }

    /// Concatenated gzip members decode as one stream.
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        let mut out = Vec::new();
        MultiGzDecoder::new(data)
            .read_to_end(&mut out)
            .map_err(|e| CodecError::Decompression(e.to_string()))?;
        Ok(out)
    }
}

/// Compress with the format codec at the default level.
pub fn compress(data: &[u8]) -> Result<Vec<u8>, CodecError> {
    GzipCodec::default().compress(data)
}

/// Decompress a payload produced at any [`GzipCodec`] level, or by any
/// other conforming gzip writer.
pub fn decompress(data: &[u8]) -> Result<Vec<u8>, CodecError> {
    GzipCodec::default().decompress(data)
}
