use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::codec::CodecError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid magic: expected {expected:02x?}, found {found:02x?}")]
    InvalidMagic { expected: [u8; 4], found: Vec<u8> },

    #[error("Header length mismatch: declared {declared} bytes, got {actual}")]
    HeaderLengthMismatch { declared: u32, actual: u64 },

    #[error("Header ends inside a file entry")]
    TruncatedEntry,

    #[error("Payload of '{name}' is truncated: expected {expected} bytes, got {available}")]
    TruncatedPayload { name: String, expected: u32, available: u64 },

    #[error("Encrypted archive is truncated before its salt and nonce")]
    TruncatedEnvelope,

    #[error("Entry not found: {0}")]
    EntryNotFound(String),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("Authentication failed: wrong password or corrupted archive")]
    AuthenticationFailed,

    #[error("Encryption failed")]
    EncryptionFailed,

    #[error("Cannot read {}: {source}", path.display())]
    FileRead {
        path:   PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Entry name is {len} bytes long (maximum 65535): {name}")]
    NameTooLong { name: String, len: usize },

    #[error("Duplicate entry name: {0}")]
    DuplicateEntry(String),

    #[error("Archive exceeds the 4 GiB addressable by 32-bit offsets")]
    ArchiveTooLarge,

    #[error("Entry '{name}' has offset {offset}, which cannot address a payload")]
    InvalidOffset { name: String, offset: u32 },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// True when a password was wrong or the ciphertext was altered.
    pub fn is_authentication_failure(&self) -> bool {
        matches!(self, Error::AuthenticationFailed)
    }

    /// True for errors that mean the bytes are not a well-formed archive.
    pub fn is_corrupt_archive(&self) -> bool {
        matches!(
            self,
            Error::InvalidMagic { .. }
                | Error::HeaderLengthMismatch { .. }
                | Error::TruncatedEntry
                | Error::TruncatedPayload { .. }
                | Error::TruncatedEnvelope
                | Error::InvalidOffset { .. }
                | Error::Codec(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
