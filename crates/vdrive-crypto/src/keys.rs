//! Key material: session keys, node keys, signing/verification keys

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use rand::RngCore;
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::Zeroize;

use crate::KEY_SIZE;

/// A 256-bit symmetric session key protecting one file revision's content.
/// Zeroized on drop.
#[derive(Clone)]
pub struct SessionKey {
    bytes: [u8; KEY_SIZE],
}

impl SessionKey {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }

    /// Generate a random session key.
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_SIZE];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self { bytes }
    }
}

impl Drop for SessionKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// The asymmetric key pair of one filesystem entry (file or folder).
///
/// A node key decrypts the key packets sealed to it: its children's node
/// keys, and for file nodes the revision content keys.
#[derive(Clone)]
pub struct NodeKey {
    node_id: String,
    secret: StaticSecret,
}

impl NodeKey {
    /// Generate a fresh node key for `node_id`.
    pub fn generate(node_id: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            secret: StaticSecret::random_from_rng(OsRng),
        }
    }

    /// Rebuild a node key from its 32-byte secret scalar (the payload of an
    /// unlocked node-key packet).
    pub fn from_bytes(node_id: impl Into<String>, bytes: [u8; 32]) -> Self {
        Self {
            node_id: node_id.into(),
            secret: StaticSecret::from(bytes),
        }
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    /// Public half; key packets for this node are sealed to it.
    pub fn public(&self) -> PublicKey {
        PublicKey::from(&self.secret)
    }

    /// The secret scalar, as carried inside a parent-sealed key packet.
    pub fn to_bytes(&self) -> [u8; 32] {
        self.secret.to_bytes()
    }

    pub(crate) fn secret(&self) -> &StaticSecret {
        &self.secret
    }
}

impl std::fmt::Debug for NodeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeKey")
            .field("node_id", &self.node_id)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// An Ed25519 signing key belonging to a user address; signs key packets.
#[derive(Clone)]
pub struct SignerKey {
    signing: SigningKey,
}

impl SignerKey {
    pub fn generate() -> Self {
        Self {
            signing: SigningKey::generate(&mut OsRng),
        }
    }

    pub fn verify_key(&self) -> VerifyKey {
        VerifyKey {
            verifying: self.signing.verifying_key(),
        }
    }

    /// Detached signature over `message`, armored as base64.
    pub fn sign_armored(&self, message: &[u8]) -> String {
        use base64::Engine;
        let sig: Signature = self.signing.sign(message);
        base64::engine::general_purpose::STANDARD.encode(sig.to_bytes())
    }
}

impl std::fmt::Debug for SignerKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignerKey")
            .field("signing", &"[REDACTED]")
            .finish()
    }
}

/// The public half used to check key-packet signatures.
#[derive(Debug, Clone)]
pub struct VerifyKey {
    verifying: VerifyingKey,
}

impl VerifyKey {
    /// Check an armored detached signature over `message`.
    ///
    /// Returns false for both a non-matching signature and a signature that
    /// does not parse; the caller treats either as "not verified by this key".
    pub fn verify_armored(&self, message: &[u8], armored_signature: &str) -> bool {
        use base64::Engine;
        let Ok(raw) = base64::engine::general_purpose::STANDARD.decode(armored_signature) else {
            return false;
        };
        let Ok(sig) = Signature::from_slice(&raw) else {
            return false;
        };
        self.verifying.verify(message, &sig).is_ok()
    }
}
