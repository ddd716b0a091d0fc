//! Wire-level constants shared by the header and the envelope.
//!
//! All integers on disk are little-endian. There is no version field: the
//! magic identifies both the variant (plain or encrypted) and, implicitly,
//! the codec.

use std::io::{self, Read};

use crate::error::{Error, Result};

/// Magic of a plaintext archive: ASCII `"AAR?"`.
pub const MAGIC: [u8; 4] = *b"AAR?";

/// Magic of an encryption envelope: ASCII `"AARX"`.
pub const ENCRYPTED_MAGIC: [u8; 4] = *b"AARX";

pub const MAGIC_LEN: u32 = 4;

/// Magic plus the `headerLength` field.
pub const FIXED_HEADER_LEN: u32 = MAGIC_LEN + 4;

/// `nameLength` + `offset` + `size`, excluding the name bytes.
pub const ENTRY_FIXED_LEN: u32 = 2 + 4 + 4;

pub const MAX_NAME_LEN: usize = u16::MAX as usize;

pub const SALT_LEN: usize = 16;
pub const NONCE_LEN: usize = 12;

/// Which variant a file is, judged by its first four bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Plain,
    Encrypted,
}

impl Kind {
    pub fn magic(self) -> [u8; 4] {
        match self {
            Kind::Plain     => MAGIC,
            Kind::Encrypted => ENCRYPTED_MAGIC,
        }
    }
}

/// Classify a byte prefix by its magic. Returns `None` for anything shorter
/// than four bytes or carrying an unknown magic.
pub fn detect(prefix: &[u8]) -> Option<Kind> {
    match prefix.get(..MAGIC_LEN as usize)? {
        m if m == MAGIC           => Some(Kind::Plain),
        m if m == ENCRYPTED_MAGIC => Some(Kind::Encrypted),
        _                         => None,
    }
}

/// Read four bytes and require them to be `kind`'s magic.
///
/// A stream too short to hold a magic is reported as `InvalidMagic` with the
/// bytes that were available.
pub(crate) fn expect_magic<R: Read>(mut reader: R, kind: Kind) -> Result<()> {
    let expected = kind.magic();
    let mut found = [0u8; 4];
    let mut filled = 0;
    while filled < found.len() {
        match reader.read(&mut found[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(Error::Io(e)),
        }
    }
    if filled < found.len() || found != expected {
        return Err(Error::InvalidMagic {
            expected,
            found: found[..filled].to_vec(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_both_variants() {
        assert_eq!(detect(b"AAR?\x00\x00"), Some(Kind::Plain));
        assert_eq!(detect(b"AARXsalt"), Some(Kind::Encrypted));
        assert_eq!(detect(b"PK\x03\x04"), None);
        assert_eq!(detect(b"AA"), None);
    }

    #[test]
    fn expect_magic_reports_short_stream() {
        let err = expect_magic(&b"AA"[..], Kind::Plain).unwrap_err();
        match err {
            Error::InvalidMagic { found, .. } => assert_eq!(found, b"AA"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn expect_magic_rejects_other_variant() {
        assert!(expect_magic(&ENCRYPTED_MAGIC[..], Kind::Plain).is_err());
        assert!(expect_magic(&ENCRYPTED_MAGIC[..], Kind::Encrypted).is_ok());
    }
}
