//! AES-GCM cipher engine
//!
//! Encrypted payload format (binary):
//! ```text
//! [ivSize bytes: random IV][N bytes: ciphertext][16 bytes: GCM tag]
//! ```
//!
//! The IV is prefixed so decryption can recover it without any side channel.
//! Two wire variants exist and callers must pick the one matching the data
//! they are decoding: a 12-byte-IV variant and a 16-byte-IV variant.

use aes_gcm::{
    aead::{generic_array::typenum::{U12, U16}, generic_array::GenericArray, Aead, KeyInit},
    aes::{Aes128, Aes192, Aes256},
    AesGcm,
};
use rand::RngCore;
use thiserror::Error;

use crate::TAG_SIZE;

/// A reusable symmetric transform description. Pure value, never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CipherSpec {
    /// AES-GCM, no padding, 12-byte IV (the GCM-recommended nonce size)
    AesGcmIv12,
    /// AES-GCM, no padding, 16-byte IV (legacy wire format)
    AesGcmIv16,
}

impl CipherSpec {
    /// Expected IV size in bytes for this transform.
    pub const fn iv_size(self) -> usize {
        match self {
            CipherSpec::AesGcmIv12 => 12,
            CipherSpec::AesGcmIv16 => 16,
        }
    }

    /// Transformation identifier, as negotiated with the server.
    pub const fn transformation(self) -> &'static str {
        "AES/GCM/NoPadding"
    }
}

#[derive(Debug, Error)]
pub enum EncryptionError {
    #[error("invalid AES key size: {0} bytes (expected 16, 24, or 32)")]
    KeySize(usize),

    #[error("AEAD encryption failed")]
    Aead,
}

#[derive(Debug, Error)]
pub enum DecryptionError {
    #[error("invalid AES key size: {0} bytes (expected 16, 24, or 32)")]
    KeySize(usize),

    #[error("input too short: {len} bytes (need at least {iv_size} for the IV)")]
    TooShort { len: usize, iv_size: usize },

    #[error("AEAD authentication failed: wrong key or corrupted data")]
    Aead,
}

/// Encrypt `plaintext` under `key` with a fresh random IV.
///
/// Returns `[IV][ciphertext][tag]`. Stateless and reentrant; the only side
/// effect is drawing the IV from the OS random source.
pub fn encrypt(key: &[u8], spec: CipherSpec, plaintext: &[u8]) -> Result<Vec<u8>, EncryptionError> {
    let mut iv = vec![0u8; spec.iv_size()];
    rand::thread_rng().fill_bytes(&mut iv);

    let ciphertext = match (key.len(), spec) {
        (16, CipherSpec::AesGcmIv12) => seal::<AesGcm<Aes128, U12>>(key, &iv, plaintext),
        (24, CipherSpec::AesGcmIv12) => seal::<AesGcm<Aes192, U12>>(key, &iv, plaintext),
        (32, CipherSpec::AesGcmIv12) => seal::<AesGcm<Aes256, U12>>(key, &iv, plaintext),
        (16, CipherSpec::AesGcmIv16) => seal::<AesGcm<Aes128, U16>>(key, &iv, plaintext),
        (24, CipherSpec::AesGcmIv16) => seal::<AesGcm<Aes192, U16>>(key, &iv, plaintext),
        (32, CipherSpec::AesGcmIv16) => seal::<AesGcm<Aes256, U16>>(key, &iv, plaintext),
        (n, _) => return Err(EncryptionError::KeySize(n)),
    }
    .ok_or(EncryptionError::Aead)?;

    let mut out = Vec::with_capacity(iv.len() + ciphertext.len());
    out.extend_from_slice(&iv);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Decrypt `[IV][ciphertext][tag]` produced by [`encrypt`] (or by any peer
/// writing the same wire format).
pub fn decrypt(key: &[u8], spec: CipherSpec, input: &[u8]) -> Result<Vec<u8>, DecryptionError> {
    let iv_size = spec.iv_size();
    if input.len() < iv_size + TAG_SIZE {
        return Err(DecryptionError::TooShort {
            len: input.len(),
            iv_size,
        });
    }

    let (iv, ciphertext) = input.split_at(iv_size);

    match (key.len(), spec) {
        (16, CipherSpec::AesGcmIv12) => open::<AesGcm<Aes128, U12>>(key, iv, ciphertext),
        (24, CipherSpec::AesGcmIv12) => open::<AesGcm<Aes192, U12>>(key, iv, ciphertext),
        (32, CipherSpec::AesGcmIv12) => open::<AesGcm<Aes256, U12>>(key, iv, ciphertext),
        (16, CipherSpec::AesGcmIv16) => open::<AesGcm<Aes128, U16>>(key, iv, ciphertext),
        (24, CipherSpec::AesGcmIv16) => open::<AesGcm<Aes192, U16>>(key, iv, ciphertext),
        (32, CipherSpec::AesGcmIv16) => open::<AesGcm<Aes256, U16>>(key, iv, ciphertext),
        (n, _) => return Err(DecryptionError::KeySize(n)),
    }
    .ok_or(DecryptionError::Aead)
}

fn seal<C: Aead + KeyInit>(key: &[u8], iv: &[u8], plaintext: &[u8]) -> Option<Vec<u8>> {
    let cipher = C::new_from_slice(key).ok()?;
    cipher.encrypt(GenericArray::from_slice(iv), plaintext).ok()
}

fn open<C: Aead + KeyInit>(key: &[u8], iv: &[u8], ciphertext: &[u8]) -> Option<Vec<u8>> {
    let cipher = C::new_from_slice(key).ok()?;
    cipher.decrypt(GenericArray::from_slice(iv), ciphertext).ok()
}
