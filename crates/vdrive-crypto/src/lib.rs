//! vdrive-crypto: client-side crypto for the encrypted-upload pipeline
//!
//! Architecture: per-revision content keys protected by a node key chain
//!
//! ```text
//! Address Key (X25519, trust root for one user address)
//!   └── Node Key (per filesystem entry, sealed to its parent's key)
//!         └── Content Key (per file revision, sealed to the node key
//!             as a "key packet", signed by the uploading address)
//!               └── Block AEAD: AES-GCM (key=session key, IV prefixed
//!                   to the ciphertext, 12- or 16-byte IV per wire format)
//! ```
//!
//! Key packets are ECIES-style: ephemeral X25519 ECDH, HKDF-SHA256 to an
//! AES-256 key, AES-GCM over the payload. Signatures over packets are
//! detached Ed25519, armored as base64.

pub mod cache;
pub mod chain;
pub mod cipher;
pub mod content_key;
pub mod keypacket;
pub mod keys;

pub use cache::ContentKeyCache;
pub use chain::{resolve_node_key, LockedNodeKey, NodeKeyStore, MAX_CHAIN_DEPTH};
pub use cipher::{decrypt, encrypt, CipherSpec, DecryptionError, EncryptionError};
pub use content_key::{
    create_content_key, create_content_key_armored, ContentKey, KeyError, SignatureWarning,
};
pub use keypacket::KeyPacketError;
pub use keys::{NodeKey, SessionKey, SignerKey, VerifyKey};

/// Size of a session key in bytes (256-bit)
pub const KEY_SIZE: usize = 32;

/// Size of a GCM authentication tag
pub const TAG_SIZE: usize = 16;
