//! AES-256-GCM sealing and PBKDF2-HMAC-SHA256 key derivation.
//!
//! Key derivation: PBKDF2-HMAC-SHA256(password, salt, 4096 rounds) → 32-byte key
//! Encryption:     AES-256-GCM, 12-byte random nonce, no associated data
//!
//! Framing (magic, salt, nonce) lives in [`crate::envelope`]; this module only
//! turns bytes into authenticated ciphertext and back.

use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Nonce};
use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;

use crate::error::{Error, Result};
use crate::format::{NONCE_LEN, SALT_LEN};

pub const KEY_LEN: usize = 32;
pub const PBKDF2_ROUNDS: u32 = 4096;

/// Byte length of the GCM authentication tag appended to every ciphertext.
pub const TAG_LEN: usize = 16;

pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    salt
}

pub fn generate_nonce() -> [u8; NONCE_LEN] {
    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);
    nonce
}

/// Derive a 256-bit key. Deterministic for a given password and salt.
pub fn derive_key(password: &str, salt: &[u8]) -> [u8; KEY_LEN] {
    let mut key = [0u8; KEY_LEN];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, PBKDF2_ROUNDS, &mut key);
    key
}

/// Returns `ciphertext || tag`.
pub fn seal(key: &[u8; KEY_LEN], nonce: &[u8; NONCE_LEN], plaintext: &[u8]) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| Error::EncryptionFailed)?;
    cipher
        .encrypt(Nonce::from_slice(nonce), plaintext)
        .map_err(|_| Error::EncryptionFailed)
}

/// Open a payload produced by [`seal`]. Any tag mismatch is
/// `AuthenticationFailed`; no plaintext escapes unless the tag verifies.
pub fn open(key: &[u8; KEY_LEN], nonce: &[u8; NONCE_LEN], ciphertext: &[u8]) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| Error::AuthenticationFailed)?;
    cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| Error::AuthenticationFailed)
}
