//! Content-key factory: unlock a revision's session key from its key packet
//!
//! Signature verification over the packet is deliberately decoupled from
//! decryption: a failed or missing signature does not abort key
//! construction. It comes back as a [`SignatureWarning`] next to the key so
//! the caller can route it to the stale-key invalidation path instead of
//! silently swallowing it.

use base64::Engine;
use thiserror::Error;
use tracing::warn;
use zeroize::Zeroize;

use crate::keypacket::{self, KeyPacketError};
use crate::keys::{NodeKey, SessionKey, VerifyKey};
use crate::KEY_SIZE;

#[derive(Debug, Error)]
pub enum KeyError {
    #[error(transparent)]
    Packet(#[from] KeyPacketError),

    #[error("key packet payload is {0} bytes, expected a {KEY_SIZE}-byte session key")]
    SessionKeySize(usize),

    #[error("node key chain for {node_id} revisits node {revisited}")]
    ChainCycle { node_id: String, revisited: String },

    #[error("node key chain for {node_id} exceeds depth limit {limit}")]
    ChainTooDeep { node_id: String, limit: usize },

    #[error("key store error for node {node_id}: {reason}")]
    Store { node_id: String, reason: String },
}

/// A content-key signature that did not verify. Diagnostic data, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureWarning {
    pub reason: String,
}

/// Key material bound to one file revision. Opaque outside the crypto layer:
/// holds the unlocked session key plus the packet/signature provenance it
/// was built from.
#[derive(Clone)]
pub struct ContentKey {
    session_key: SessionKey,
    key_packet: Vec<u8>,
    signature: String,
    signature_verified: bool,
}

impl ContentKey {
    /// The session key used to encrypt/decrypt and verify this revision's
    /// blocks. Consumed by the cipher engine and the verifier only.
    pub fn session_key(&self) -> &SessionKey {
        &self.session_key
    }

    /// The armored form of the packet this key was unlocked from.
    pub fn armored_packet(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.key_packet)
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }

    pub fn signature_verified(&self) -> bool {
        self.signature_verified
    }
}

impl std::fmt::Debug for ContentKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentKey")
            .field("session_key", &"[REDACTED]")
            .field("key_packet", &self.key_packet.len())
            .field("signature_verified", &self.signature_verified)
            .finish()
    }
}

/// Build a [`ContentKey`] from a binary key packet.
///
/// Decrypts the packet with `decrypt_key`'s private material, then checks
/// `signature` (armored, detached, over the packet bytes) against
/// `verify_keys`. A signature that fails to verify yields
/// `Some(SignatureWarning)` alongside the key, never an `Err`.
pub fn create_content_key(
    decrypt_key: &NodeKey,
    verify_keys: &[VerifyKey],
    key_packet: &[u8],
    signature: &str,
) -> Result<(ContentKey, Option<SignatureWarning>), KeyError> {
    let mut payload = keypacket::open(decrypt_key.secret(), key_packet)?;
    if payload.len() != KEY_SIZE {
        let len = payload.len();
        payload.zeroize();
        return Err(KeyError::SessionKeySize(len));
    }
    let mut bytes = [0u8; KEY_SIZE];
    bytes.copy_from_slice(&payload);
    payload.zeroize();
    let session_key = SessionKey::from_bytes(bytes);

    let warning = verify_packet_signature(decrypt_key, verify_keys, key_packet, signature);

    Ok((
        ContentKey {
            session_key,
            key_packet: key_packet.to_vec(),
            signature: signature.to_string(),
            signature_verified: warning.is_none(),
        },
        warning,
    ))
}

/// Build a [`ContentKey`] from an armored (base64) key packet, the form
/// embedded in API JSON.
pub fn create_content_key_armored(
    decrypt_key: &NodeKey,
    verify_keys: &[VerifyKey],
    key_packet: &str,
    signature: &str,
) -> Result<(ContentKey, Option<SignatureWarning>), KeyError> {
    let raw = base64::engine::general_purpose::STANDARD
        .decode(key_packet)
        .map_err(KeyPacketError::Armor)?;
    create_content_key(decrypt_key, verify_keys, &raw, signature)
}

fn verify_packet_signature(
    decrypt_key: &NodeKey,
    verify_keys: &[VerifyKey],
    key_packet: &[u8],
    signature: &str,
) -> Option<SignatureWarning> {
    if verify_keys
        .iter()
        .any(|k| k.verify_armored(key_packet, signature))
    {
        return None;
    }

    let reason = if verify_keys.is_empty() {
        "no verification keys available".to_string()
    } else {
        format!(
            "signature did not verify against any of {} keys",
            verify_keys.len()
        )
    };
    warn!(
        node_id = %decrypt_key.node_id(),
        reason = %reason,
        "content-key signature verification failed"
    );
    Some(SignatureWarning { reason })
}
