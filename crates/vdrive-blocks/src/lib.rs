//! vdrive-blocks: the physical unit of an encrypted upload
//!
//! A file revision is split into content-addressed blocks before upload.
//! This crate owns the block model (ordinary content, default thumbnail,
//! photo thumbnail), SHA-256 content hashing, and the challenge-response
//! verifier that proves plaintext possession of each block to the server
//! before it hands out upload URLs.

pub mod block;
pub mod hash;
pub mod verifier;

pub use block::{BlockHash, BlockToken, BlockType, BlockTypeError, UploadBlock, VerifierToken};
pub use hash::{sha256_bytes, sha256_file};
pub use verifier::{VerificationData, Verifier, VerifierError};
