//! Upload-block model and factory
//!
//! One `UploadBlock` is one physical unit of ciphertext sent to the server.
//! Blocks exist only for the duration of an upload attempt: built while
//! staging, consumed by the upload-URL negotiation, never persisted.

use base64::Engine;
use std::path::PathBuf;
use thiserror::Error;

/// Discriminates the three physical block kinds. Closed set; every match
/// over it is exhaustive, so an unsupported kind cannot reach serialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockType {
    /// Ordinary content block
    Content,
    /// Default thumbnail of the file
    DefaultThumbnail,
    /// Photo-specific thumbnail
    PhotoThumbnail,
}

#[derive(Debug, Error)]
#[error("unexpected block type {0:?}: a thumbnail wire code was required")]
pub struct BlockTypeError(pub BlockType);

impl BlockType {
    /// Wire type code for thumbnail descriptors. Content blocks carry no
    /// thumbnail code; asking for one is a construction-time error.
    pub fn thumbnail_code(self) -> Result<&'static str, BlockTypeError> {
        match self {
            BlockType::Content => Err(BlockTypeError(self)),
            BlockType::DefaultThumbnail => Ok("1"),
            BlockType::PhotoThumbnail => Ok("2"),
        }
    }

    pub fn is_thumbnail(self) -> bool {
        match self {
            BlockType::Content => false,
            BlockType::DefaultThumbnail | BlockType::PhotoThumbnail => true,
        }
    }
}

/// Where a block's ciphertext currently lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockToken {
    /// Staged locally, awaiting upload.
    LocalPath(PathBuf),
    /// Already at a server-assigned location (resume / re-upload path).
    UploadId(String),
}

/// A block's SHA-256 digest. The local staging path computes raw digest
/// bytes; the resume path receives the server's already-armored string.
/// Both armor to the same base64 wire form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockHash {
    Digest(Vec<u8>),
    Encoded(String),
}

impl BlockHash {
    /// Base64 form carried in upload requests.
    pub fn armored(&self) -> String {
        match self {
            BlockHash::Digest(raw) => base64::engine::general_purpose::STANDARD.encode(raw),
            BlockHash::Encoded(s) => s.clone(),
        }
    }
}

/// Proof that the uploader possesses a block's plaintext, produced by the
/// verifier against the server's verification code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifierToken(String);

impl VerifierToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for VerifierToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One physical unit of ciphertext within a revision.
///
/// `index` is 1-based and assigned once at construction; the server maps
/// response URLs back to blocks by index, so it must survive unchanged
/// through verification and URL negotiation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadBlock {
    pub index: u64,
    /// Encrypted size in bytes
    pub size: u64,
    pub hash_sha256: BlockHash,
    /// Detached signature over the block, armored
    pub enc_signature: String,
    /// Plaintext size before encryption
    pub raw_size: u64,
    pub token: BlockToken,
    pub block_type: BlockType,
    /// Set once this block's integrity has been proven to the server's
    /// verification code. A `None` here must never reach a non-empty
    /// upload-URL request.
    pub verifier_token: Option<VerifierToken>,
}

impl UploadBlock {
    /// Build a block staged in a local file, before upload. Pure
    /// constructor: no I/O, no validation beyond field presence.
    #[allow(clippy::too_many_arguments)]
    pub fn local(
        index: u64,
        local_file: PathBuf,
        hash_sha256: Vec<u8>,
        enc_signature: impl Into<String>,
        raw_size: u64,
        size: u64,
        block_type: BlockType,
        verifier_token: Option<VerifierToken>,
    ) -> Self {
        Self {
            index,
            size,
            hash_sha256: BlockHash::Digest(hash_sha256),
            enc_signature: enc_signature.into(),
            raw_size,
            token: BlockToken::LocalPath(local_file),
            block_type,
            verifier_token,
        }
    }

    /// Build a block whose data already lives at a server-assigned location
    /// (resume path); the hash arrives in the server's armored string form.
    #[allow(clippy::too_many_arguments)]
    pub fn remote(
        index: u64,
        upload_id: impl Into<String>,
        hash_sha256: impl Into<String>,
        enc_signature: impl Into<String>,
        raw_size: u64,
        size: u64,
        block_type: BlockType,
        verifier_token: Option<VerifierToken>,
    ) -> Self {
        Self {
            index,
            size,
            hash_sha256: BlockHash::Encoded(hash_sha256.into()),
            enc_signature: enc_signature.into(),
            raw_size,
            token: BlockToken::UploadId(upload_id.into()),
            block_type,
            verifier_token,
        }
    }

    pub fn with_verifier_token(mut self, token: VerifierToken) -> Self {
        self.verifier_token = Some(token);
        self
    }
}
