//! Challenge-response block verification
//!
//! The server issues a verification code per revision; before it accepts a
//! block it requires proof that the uploader possesses the plaintext. The
//! proof is HMAC-SHA256 keyed by the verification code over the decrypted
//! block, armored as base64 — the verifier token.
//!
//! Decryption is whole-block: AES-GCM authenticates the tag before any
//! plaintext may be released, so the ciphertext must be complete in memory
//! for the decrypt call. The ciphertext buffer is consumed and freed before
//! the plaintext is spooled to a scratch file under a verifier-private temp
//! dir, the plaintext buffer is freed before the digest pass, and the digest
//! streams back from disk. The scratch area is removed on every exit path,
//! cancellation included (the temp dir is dropped with the verifier, the
//! per-block file with its guard).

use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tempfile::TempDir;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::debug;

use vdrive_crypto::{decrypt, CipherSpec, ContentKey};

use crate::block::{BlockToken, UploadBlock, VerifierToken};

type HmacSha256 = Hmac<Sha256>;

const SPOOL_CHUNK: usize = 64 * 1024;

/// Bootstrap data for one revision's verification pass. Structural
/// equality, byte content included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationData {
    /// Armored content-key packet this challenge was issued for
    pub content_key_packet: String,
    /// Raw challenge bytes from the server
    pub verification_code: Vec<u8>,
}

#[derive(Debug, Error)]
pub enum VerifierError {
    /// Recoverable: retry verifier construction (e.g. after freeing temp
    /// space or refreshing the content key).
    #[error("verifier initialization failed: {0}")]
    Initialize(String),

    /// Fails the block's upload; the orchestration layer re-encrypts and
    /// retries. Routed to error tracking, unlike `Initialize`.
    #[error("block verification failed: {0}")]
    VerifyBlock(String),
}

/// Verifies the blocks of one file revision. Not reused across revisions;
/// dropping it removes the scratch area.
pub struct Verifier {
    content_key: ContentKey,
    verification_code: Vec<u8>,
    spec: CipherSpec,
    scratch: TempDir,
}

impl Verifier {
    /// Build a verifier under `temp_root`, which must be a writable private
    /// directory (the cache/temp-folder provider's contract).
    pub fn new(
        temp_root: &std::path::Path,
        content_key: ContentKey,
        data: &VerificationData,
        spec: CipherSpec,
    ) -> Result<Self, VerifierError> {
        if data.content_key_packet != content_key.armored_packet() {
            return Err(VerifierError::Initialize(
                "verification data was issued for a different content key".into(),
            ));
        }

        let scratch = tempfile::Builder::new()
            .prefix("vdrive-verify-")
            .tempdir_in(temp_root)
            .map_err(|e| {
                VerifierError::Initialize(format!(
                    "scratch dir unavailable under {}: {e}",
                    temp_root.display()
                ))
            })?;

        Ok(Self {
            content_key,
            verification_code: data.verification_code.clone(),
            spec,
            scratch,
        })
    }

    /// Prove possession of `block`'s plaintext. The block must be staged
    /// locally; its ciphertext is decrypted into the scratch area, hashed
    /// back out in a streaming pass, and the keyed digest returned as the
    /// verifier token.
    pub async fn verify(&self, block: &UploadBlock) -> Result<VerifierToken, VerifierError> {
        let path = match &block.token {
            BlockToken::LocalPath(path) => path,
            BlockToken::UploadId(id) => {
                return Err(VerifierError::VerifyBlock(format!(
                    "block {} has no local ciphertext (upload id {id})",
                    block.index
                )))
            }
        };

        let ciphertext = tokio::fs::read(path).await.map_err(|e| {
            VerifierError::VerifyBlock(format!(
                "reading block {}: {}: {e}",
                block.index,
                path.display()
            ))
        })?;

        let token = self.verify_bytes(ciphertext).await?;
        debug!(index = block.index, "block verified");
        Ok(token)
    }

    /// Verification core: decrypt, spool to scratch, stream the keyed hash.
    /// Takes the ciphertext by value so the buffer can be freed before the
    /// plaintext is spooled. Deterministic in (plaintext, verification
    /// code); an empty plaintext is a legal decrypt result and yields a
    /// valid token.
    pub async fn verify_bytes(&self, ciphertext: Vec<u8>) -> Result<VerifierToken, VerifierError> {
        let plaintext = decrypt(
            self.content_key.session_key().as_bytes(),
            self.spec,
            &ciphertext,
        )
        .map_err(|e| VerifierError::VerifyBlock(format!("decrypting block: {e}")))?;
        drop(ciphertext);

        // Removed on drop, so failures below cannot orphan it. Writes go
        // through the open handle, not the path, so removal holds even with
        // a write still in flight when the future is dropped.
        let spool = tempfile::NamedTempFile::new_in(self.scratch.path())
            .map_err(|e| VerifierError::VerifyBlock(format!("creating scratch file: {e}")))?;
        let writer = spool
            .reopen()
            .map_err(|e| VerifierError::VerifyBlock(format!("opening scratch file: {e}")))?;
        let mut writer = tokio::fs::File::from_std(writer);
        for chunk in plaintext.chunks(SPOOL_CHUNK) {
            writer
                .write_all(chunk)
                .await
                .map_err(|e| VerifierError::VerifyBlock(format!("spooling plaintext: {e}")))?;
        }
        writer
            .flush()
            .await
            .map_err(|e| VerifierError::VerifyBlock(format!("spooling plaintext: {e}")))?;
        drop(writer);
        drop(plaintext);

        let mut mac = HmacSha256::new_from_slice(&self.verification_code)
            .map_err(|e| VerifierError::VerifyBlock(format!("keying digest: {e}")))?;

        let mut file = tokio::fs::File::open(spool.path())
            .await
            .map_err(|e| VerifierError::VerifyBlock(format!("reopening scratch file: {e}")))?;
        let mut buf = vec![0u8; SPOOL_CHUNK];
        loop {
            let n = file
                .read(&mut buf)
                .await
                .map_err(|e| VerifierError::VerifyBlock(format!("reading scratch file: {e}")))?;
            if n == 0 {
                break;
            }
            mac.update(&buf[..n]);
        }

        let digest = mac.finalize().into_bytes();
        Ok(VerifierToken::new(
            base64::engine::general_purpose::STANDARD.encode(digest),
        ))
    }
}
