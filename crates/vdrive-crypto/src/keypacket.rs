//! Key packets: sealing key material to an X25519 recipient
//!
//! Packet format (binary):
//! ```text
//! [32 bytes: ephemeral X25519 public key][IV + ciphertext + tag]
//! ```
//!
//! The AEAD key is HKDF-SHA256 over the ECDH shared secret with a fixed
//! domain string; the AEAD itself is the 12-byte-IV AES-GCM variant of the
//! cipher engine. Armored packets are the base64 form embedded in API JSON.

use base64::Engine;
use hkdf::Hkdf;
use rand::rngs::OsRng;
use sha2::Sha256;
use thiserror::Error;
use x25519_dalek::{EphemeralSecret, PublicKey, StaticSecret};
use zeroize::Zeroize;

use crate::cipher::{self, CipherSpec, DecryptionError, EncryptionError};
use crate::KEY_SIZE;

const HKDF_INFO: &[u8] = b"vdrive/key-packet/v1";

/// X25519 public key length prefixing every packet.
const EPHEMERAL_LEN: usize = 32;

#[derive(Debug, Error)]
pub enum KeyPacketError {
    #[error("malformed key packet: {0}")]
    Malformed(String),

    #[error("key packet armor is not valid base64: {0}")]
    Armor(#[from] base64::DecodeError),

    #[error(transparent)]
    Encrypt(#[from] EncryptionError),

    #[error(transparent)]
    Decrypt(#[from] DecryptionError),
}

/// Seal `payload` to `recipient`. Fresh ephemeral key per call.
pub fn seal(recipient: &PublicKey, payload: &[u8]) -> Result<Vec<u8>, KeyPacketError> {
    let ephemeral = EphemeralSecret::random_from_rng(OsRng);
    let ephemeral_pub = PublicKey::from(&ephemeral);
    let shared = ephemeral.diffie_hellman(recipient);

    let mut aead_key = derive_aead_key(shared.as_bytes())?;
    let sealed = cipher::encrypt(&aead_key, CipherSpec::AesGcmIv12, payload);
    aead_key.zeroize();

    let sealed = sealed?;
    let mut packet = Vec::with_capacity(EPHEMERAL_LEN + sealed.len());
    packet.extend_from_slice(ephemeral_pub.as_bytes());
    packet.extend_from_slice(&sealed);
    Ok(packet)
}

/// Open a packet sealed to `secret`'s public key.
pub fn open(secret: &StaticSecret, packet: &[u8]) -> Result<Vec<u8>, KeyPacketError> {
    if packet.len() < EPHEMERAL_LEN {
        return Err(KeyPacketError::Malformed(format!(
            "{} bytes, shorter than the ephemeral key prefix",
            packet.len()
        )));
    }

    let (ephemeral_raw, sealed) = packet.split_at(EPHEMERAL_LEN);
    let mut ephemeral_bytes = [0u8; EPHEMERAL_LEN];
    ephemeral_bytes.copy_from_slice(ephemeral_raw);
    let ephemeral_pub = PublicKey::from(ephemeral_bytes);

    let shared = secret.diffie_hellman(&ephemeral_pub);
    let mut aead_key = derive_aead_key(shared.as_bytes())?;
    let payload = cipher::decrypt(&aead_key, CipherSpec::AesGcmIv12, sealed);
    aead_key.zeroize();

    Ok(payload?)
}

/// Seal and armor as base64 (the JSON-embedded packet form).
pub fn seal_armored(recipient: &PublicKey, payload: &[u8]) -> Result<String, KeyPacketError> {
    let packet = seal(recipient, payload)?;
    Ok(base64::engine::general_purpose::STANDARD.encode(packet))
}

/// Open an armored (base64) packet.
pub fn open_armored(secret: &StaticSecret, armored: &str) -> Result<Vec<u8>, KeyPacketError> {
    let packet = base64::engine::general_purpose::STANDARD.decode(armored)?;
    open(secret, &packet)
}

fn derive_aead_key(shared_secret: &[u8; 32]) -> Result<[u8; KEY_SIZE], KeyPacketError> {
    let hkdf = Hkdf::<Sha256>::new(None, shared_secret);
    let mut okm = [0u8; KEY_SIZE];
    hkdf.expand(HKDF_INFO, &mut okm)
        .map_err(|e| KeyPacketError::Malformed(format!("HKDF expand failed: {e}")))?;
    Ok(okm)
}
