//! Whole-archive encryption.
//!
//! ```text
//! [magic "AARX"][salt 16 B][nonce 12 B][ciphertext || GCM tag]
//! ```
//!
//! The plaintext is an entire serialized archive. There is no per-member or
//! streaming mode: sealing and opening both hold the full buffer in memory.

use std::io::{self, Read, Write};

use tracing::info;

use crate::archive::Archive;
use crate::crypto;
use crate::error::{Error, Result};
use crate::format::{self, Kind, ENCRYPTED_MAGIC, NONCE_LEN, SALT_LEN};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    salt:       [u8; SALT_LEN],
    nonce:      [u8; NONCE_LEN],
    ciphertext: Vec<u8>,
}

impl Envelope {
    /// Encrypt `archive_bytes` under a key derived from `password` and a
    /// fresh random salt.
    pub fn seal(archive_bytes: &[u8], password: &str) -> Result<Self> {
        let salt = crypto::generate_salt();
        let key = crypto::derive_key(password, &salt);
        let nonce = crypto::generate_nonce();
        let ciphertext = crypto::seal(&key, &nonce, archive_bytes)?;
        info!(plaintext = archive_bytes.len(), ciphertext = ciphertext.len(), "sealed archive");
        Ok(Self { salt, nonce, ciphertext })
    }

    /// Decrypt and authenticate. Returns the serialized archive bytes, or
    /// `AuthenticationFailed` for a wrong password or altered data.
    pub fn open(&self, password: &str) -> Result<Vec<u8>> {
        let key = crypto::derive_key(password, &self.salt);
        crypto::open(&key, &self.nonce, &self.ciphertext)
    }

    /// [`Envelope::open`] followed by [`Archive::from_bytes`].
    pub fn decrypt_archive(&self, password: &str) -> Result<Archive> {
        Archive::from_bytes(&self.open(password)?)
    }

    pub fn salt(&self) -> &[u8; SALT_LEN] { &self.salt }

    pub fn nonce(&self) -> &[u8; NONCE_LEN] { &self.nonce }

    pub fn ciphertext(&self) -> &[u8] { &self.ciphertext }

    pub fn write_to<W: Write>(&self, mut writer: W) -> io::Result<()> {
        writer.write_all(&ENCRYPTED_MAGIC)?;
        writer.write_all(&self.salt)?;
        writer.write_all(&self.nonce)?;
        writer.write_all(&self.ciphertext)?;
        Ok(())
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(ENCRYPTED_MAGIC.len() + SALT_LEN + NONCE_LEN + self.ciphertext.len());
        out.extend_from_slice(&ENCRYPTED_MAGIC);
        out.extend_from_slice(&self.salt);
        out.extend_from_slice(&self.nonce);
        out.extend_from_slice(&self.ciphertext);
        out
    }

    /// Parse the framing. Everything after the nonce is ciphertext, read to
    /// the end of `reader`.
    pub fn read_from<R: Read>(mut reader: R) -> Result<Self> {
        format::expect_magic(&mut reader, Kind::Encrypted)?;

        let mut salt = [0u8; SALT_LEN];
        reader.read_exact(&mut salt).map_err(truncated)?;
        let mut nonce = [0u8; NONCE_LEN];
        reader.read_exact(&mut nonce).map_err(truncated)?;

        let mut ciphertext = Vec::new();
        reader.read_to_end(&mut ciphertext)?;
        Ok(Self { salt, nonce, ciphertext })
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::read_from(bytes)
    }
}

fn truncated(e: io::Error) -> Error {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        Error::TruncatedEnvelope
    } else {
        Error::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::TAG_LEN;

    #[test]
    fn seal_then_open() {
        let env = Envelope::seal(b"serialized archive bytes", "correct-password").unwrap();
        assert_eq!(env.ciphertext().len(), 24 + TAG_LEN);
        assert_eq!(env.open("correct-password").unwrap(), b"serialized archive bytes");
    }

    #[test]
    fn wrong_password_fails_authentication() {
        let env = Envelope::seal(b"payload", "pw1").unwrap();
        assert!(env.open("pw2").unwrap_err().is_authentication_failure());
    }

    #[test]
    fn framing_layout() {
        let env = Envelope::seal(b"abc", "pw").unwrap();
        let bytes = env.to_bytes();
        assert_eq!(&bytes[..4], b"AARX");
        assert_eq!(&bytes[4..20], env.salt());
        assert_eq!(&bytes[20..32], env.nonce());
        assert_eq!(&bytes[32..], env.ciphertext());
        assert_eq!(bytes.len(), 32 + 3 + TAG_LEN);

        let mut written = Vec::new();
        env.write_to(&mut written).unwrap();
        assert_eq!(written, bytes);
        assert_eq!(Envelope::from_bytes(&bytes).unwrap(), env);
    }

    #[test]
    fn salts_and_nonces_are_fresh() {
        let a = Envelope::seal(b"same", "pw").unwrap();
        let b = Envelope::seal(b"same", "pw").unwrap();
        assert_ne!(a.salt(), b.salt());
        assert_ne!(a.ciphertext(), b.ciphertext());
    }

    #[test]
    fn plain_archive_is_not_an_envelope() {
        let err = Envelope::from_bytes(b"AAR?\x08\x00\x00\x00").unwrap_err();
        assert!(matches!(err, Error::InvalidMagic { expected, .. } if expected == *b"AARX"));
    }

    #[test]
    fn short_framing_is_truncated_envelope() {
        let mut bytes = b"AARX".to_vec();
        bytes.extend_from_slice(&[0u8; 20]);
        assert!(matches!(Envelope::from_bytes(&bytes).unwrap_err(), Error::TruncatedEnvelope));
    }

    #[test]
    fn missing_tag_fails_authentication() {
        let env = Envelope::seal(b"abc", "pw").unwrap();
        let mut bytes = env.to_bytes();
        bytes.truncate(32 + 4);
        let short = Envelope::from_bytes(&bytes).unwrap();
        assert!(short.open("pw").unwrap_err().is_authentication_failure());
    }
}
