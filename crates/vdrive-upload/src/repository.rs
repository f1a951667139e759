//! Block repository: batched upload-URL negotiation
//!
//! Entry point of the pipeline's server round-trip. Preconditions are
//! enforced before any network work: a block that skipped verification is a
//! programmer error and fails the whole call loudly, and an empty batch
//! never leaves the process.

use thiserror::Error;
use tracing::{debug, info};

use vdrive_blocks::{BlockTypeError, UploadBlock};
use vdrive_core::types::{RevisionRef, UserRef};

use crate::api::{ApiError, BlockDescriptor, UploadBlocksRequest, UploadBlocksUrl, UploadUrlApi};

#[derive(Debug, Error)]
pub enum UploadError {
    /// Programmer error: an unverified block reached URL negotiation.
    #[error("block {index} has no verifier token; refusing to request upload URLs")]
    MissingVerifierToken { index: u64 },

    #[error(transparent)]
    BlockType(#[from] BlockTypeError),

    #[error(transparent)]
    Api(#[from] ApiError),

    /// The server's URL list does not cover every submitted block.
    #[error("response is missing an upload URL for block {index}")]
    IncompleteResponse { index: u64 },
}

pub struct BlockRepository<A: UploadUrlApi> {
    api: A,
}

impl<A: UploadUrlApi> BlockRepository<A> {
    pub fn new(api: A) -> Self {
        Self { api }
    }

    /// Request upload target URLs for a revision's blocks and optional
    /// thumbnail.
    ///
    /// Whole-batch semantics: one request, one success or one failure; the
    /// response maps URLs back to blocks by each block's own `index`, so
    /// the serialized list is ordered by index regardless of the input
    /// collection's order.
    pub async fn get_upload_blocks_url(
        &self,
        user: &UserRef,
        revision: &RevisionRef,
        blocks: &[UploadBlock],
        thumbnail: Option<&UploadBlock>,
    ) -> Result<UploadBlocksUrl, UploadError> {
        if blocks.is_empty() && thumbnail.is_none() {
            debug!(
                revision_id = %revision.revision_id,
                "no blocks to negotiate, skipping request"
            );
            return Ok(UploadBlocksUrl::default());
        }

        let mut block_list = Vec::with_capacity(blocks.len());
        for block in blocks {
            let Some(token) = &block.verifier_token else {
                return Err(UploadError::MissingVerifierToken { index: block.index });
            };
            block_list.push(BlockDescriptor {
                index: block.index,
                size: block.size,
                hash: block.hash_sha256.armored(),
                signature: block.enc_signature.clone(),
                verifier_token: token.as_str().to_string(),
            });
        }
        block_list.sort_by_key(|d| d.index);

        let (thumbnail_flag, thumbnail_hash, thumbnail_size) = match thumbnail {
            Some(thumb) => {
                // Type check up front: a content block in the thumbnail slot
                // is a construction error, not a wire value.
                thumb.block_type.thumbnail_code()?;
                (1, Some(thumb.hash_sha256.armored()), Some(thumb.size))
            }
            None => (0, None, None),
        };

        let request = UploadBlocksRequest {
            address_id: user.address_id.clone(),
            share_id: revision.share_id.clone(),
            link_id: revision.link_id.clone(),
            revision_id: revision.revision_id.clone(),
            block_list,
            thumbnail: thumbnail_flag,
            thumbnail_hash,
            thumbnail_size,
        };

        let response = self.api.request_upload_urls(&request).await?;

        for descriptor in &request.block_list {
            if !response.block_urls.iter().any(|u| u.index == descriptor.index) {
                return Err(UploadError::IncompleteResponse {
                    index: descriptor.index,
                });
            }
        }

        info!(
            user_id = %user.user_id,
            revision_id = %revision.revision_id,
            blocks = request.block_list.len(),
            thumbnail = thumbnail_flag,
            "negotiated upload urls"
        );

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::UploadUrl;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use vdrive_blocks::{BlockType, VerifierToken};

    /// Mock API: counts calls, records the last request, answers with one
    /// URL per submitted index.
    #[derive(Default)]
    struct MockApi {
        calls: AtomicUsize,
        last_request: Mutex<Option<UploadBlocksRequest>>,
    }

    impl UploadUrlApi for MockApi {
        async fn request_upload_urls(
            &self,
            request: &UploadBlocksRequest,
        ) -> Result<UploadBlocksUrl, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_request.lock().unwrap() = Some(request.clone());

            Ok(UploadBlocksUrl {
                block_urls: request
                    .block_list
                    .iter()
                    .map(|d| UploadUrl {
                        index: d.index,
                        token: format!("tok-{}", d.index),
                        url: format!("https://upload.example.com/{}", d.index),
                    })
                    .collect(),
                thumbnail_url: (request.thumbnail == 1).then(|| UploadUrl {
                    index: 0,
                    token: "tok-thumb".into(),
                    url: "https://upload.example.com/thumb".into(),
                }),
            })
        }
    }

    fn verified_block(index: u64) -> UploadBlock {
        UploadBlock::local(
            index,
            format!("/tmp/block-{index}").into(),
            vec![index as u8; 32],
            "sig",
            100,
            128,
            BlockType::Content,
            Some(VerifierToken::new(format!("proof-{index}"))),
        )
    }

    fn refs() -> (UserRef, RevisionRef) {
        (
            UserRef::new("user-1", "addr-1"),
            RevisionRef::new("share-1", "link-1", "rev-1"),
        )
    }

    #[tokio::test]
    async fn test_empty_batch_short_circuit() {
        let api = MockApi::default();
        let repo = BlockRepository::new(api);
        let (user, revision) = refs();

        let result = repo
            .get_upload_blocks_url(&user, &revision, &[], None)
            .await
            .unwrap();

        assert!(result.is_empty());
        assert_eq!(repo.api.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_verifier_token_fails_before_network() {
        let api = MockApi::default();
        let repo = BlockRepository::new(api);
        let (user, revision) = refs();

        let mut unverified = verified_block(2);
        unverified.verifier_token = None;
        let blocks = vec![verified_block(1), unverified];

        let err = repo
            .get_upload_blocks_url(&user, &revision, &blocks, None)
            .await
            .unwrap_err();

        assert!(matches!(err, UploadError::MissingVerifierToken { index: 2 }));
        assert_eq!(repo.api.calls.load(Ordering::SeqCst), 0, "no network call");
    }

    #[tokio::test]
    async fn test_ordering_preserved_under_shuffle() {
        let api = MockApi::default();
        let repo = BlockRepository::new(api);
        let (user, revision) = refs();

        // collection order deliberately scrambled
        let blocks = vec![
            verified_block(3),
            verified_block(1),
            verified_block(4),
            verified_block(2),
        ];

        let result = repo
            .get_upload_blocks_url(&user, &revision, &blocks, None)
            .await
            .unwrap();

        let sent = repo.api.last_request.lock().unwrap().clone().unwrap();
        let sent_indices: Vec<u64> = sent.block_list.iter().map(|d| d.index).collect();
        assert_eq!(sent_indices, vec![1, 2, 3, 4]);
        // each descriptor keeps its own block's token, not a positional one
        for d in &sent.block_list {
            assert_eq!(d.verifier_token, format!("proof-{}", d.index));
        }
        assert_eq!(result.block_urls.len(), 4);
    }

    #[tokio::test]
    async fn test_thumbnail_descriptor() {
        let api = MockApi::default();
        let repo = BlockRepository::new(api);
        let (user, revision) = refs();

        let mut thumb = verified_block(1);
        thumb.block_type = BlockType::PhotoThumbnail;

        let result = repo
            .get_upload_blocks_url(&user, &revision, &[], Some(&thumb))
            .await
            .unwrap();

        let sent = repo.api.last_request.lock().unwrap().clone().unwrap();
        assert_eq!(sent.thumbnail, 1);
        assert_eq!(sent.thumbnail_size, Some(128));
        assert!(sent.thumbnail_hash.is_some());
        assert!(result.thumbnail_url.is_some());
        assert_eq!(repo.api.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_content_block_in_thumbnail_slot_rejected() {
        let api = MockApi::default();
        let repo = BlockRepository::new(api);
        let (user, revision) = refs();

        let thumb = verified_block(1); // BlockType::Content
        let err = repo
            .get_upload_blocks_url(&user, &revision, &[], Some(&thumb))
            .await
            .unwrap_err();

        assert!(matches!(err, UploadError::BlockType(_)));
        assert_eq!(repo.api.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_incomplete_response_detected() {
        struct DroppyApi;
        impl UploadUrlApi for DroppyApi {
            async fn request_upload_urls(
                &self,
                request: &UploadBlocksRequest,
            ) -> Result<UploadBlocksUrl, ApiError> {
                // answers for every block except the last
                Ok(UploadBlocksUrl {
                    block_urls: request
                        .block_list
                        .iter()
                        .take(request.block_list.len() - 1)
                        .map(|d| UploadUrl {
                            index: d.index,
                            token: "t".into(),
                            url: "https://u".into(),
                        })
                        .collect(),
                    thumbnail_url: None,
                })
            }
        }

        let repo = BlockRepository::new(DroppyApi);
        let (user, revision) = refs();
        let blocks = vec![verified_block(1), verified_block(2)];

        let err = repo
            .get_upload_blocks_url(&user, &revision, &blocks, None)
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::IncompleteResponse { index: 2 }));
    }

    #[tokio::test]
    async fn test_api_error_propagates() {
        struct FailingApi;
        impl UploadUrlApi for FailingApi {
            async fn request_upload_urls(
                &self,
                _request: &UploadBlocksRequest,
            ) -> Result<UploadBlocksUrl, ApiError> {
                Err(ApiError::Status(422))
            }
        }

        let repo = BlockRepository::new(FailingApi);
        let (user, revision) = refs();
        let blocks = vec![verified_block(1)];

        let err = repo
            .get_upload_blocks_url(&user, &revision, &blocks, None)
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::Api(ApiError::Status(422))));
    }
}
