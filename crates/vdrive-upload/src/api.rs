//! Wire contract for the upload-URL endpoint
//!
//! One batched request per revision; the response associates each submitted
//! block index with a signed upload URL. Field names follow the
//! server-defined JSON keys (camelCase).

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("server rejected request: status {0}")]
    Status(u16),

    #[error("malformed response: {0}")]
    Decode(String),
}

/// One block's descriptor within the batched request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockDescriptor {
    pub index: u64,
    pub size: u64,
    /// Armored SHA-256 of the block
    pub hash: String,
    /// Armored detached signature
    pub signature: String,
    pub verifier_token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadBlocksRequest {
    pub address_id: String,
    pub share_id: String,
    pub link_id: String,
    pub revision_id: String,
    pub block_list: Vec<BlockDescriptor>,
    /// 0 or 1: whether a thumbnail descriptor accompanies the batch
    pub thumbnail: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_size: Option<u64>,
}

/// A signed upload target for one block, keyed back by index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadUrl {
    pub index: u64,
    /// Opaque server-side block token
    pub token: String,
    pub url: String,
}

/// Result of one URL negotiation. Empty for a zero-block revision.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadBlocksUrl {
    #[serde(default)]
    pub block_urls: Vec<UploadUrl>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<UploadUrl>,
}

impl UploadBlocksUrl {
    pub fn is_empty(&self) -> bool {
        self.block_urls.is_empty() && self.thumbnail_url.is_none()
    }
}

/// The remote upload-URL API, kept behind a trait so the repository stays
/// transport-agnostic (and testable without a server).
pub trait UploadUrlApi {
    fn request_upload_urls(
        &self,
        request: &UploadBlocksRequest,
    ) -> impl std::future::Future<Output = Result<UploadBlocksUrl, ApiError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialized_field_names() {
        let request = UploadBlocksRequest {
            address_id: "addr".into(),
            share_id: "share".into(),
            link_id: "link".into(),
            revision_id: "rev".into(),
            block_list: vec![BlockDescriptor {
                index: 1,
                size: 128,
                hash: "aGFzaA==".into(),
                signature: "c2ln".into(),
                verifier_token: "dG9rZW4=".into(),
            }],
            thumbnail: 0,
            thumbnail_hash: None,
            thumbnail_size: None,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["addressId"], "addr");
        assert_eq!(json["revisionId"], "rev");
        assert_eq!(json["blockList"][0]["verifierToken"], "dG9rZW4=");
        assert!(json.get("thumbnailHash").is_none(), "absent without thumbnail");
    }

    #[test]
    fn test_response_decodes() {
        let body = r#"{
            "blockUrls": [
                {"index": 1, "token": "t1", "url": "https://up/1"},
                {"index": 2, "token": "t2", "url": "https://up/2"}
            ],
            "thumbnailUrl": {"index": 0, "token": "tt", "url": "https://up/t"}
        }"#;

        let parsed: UploadBlocksUrl = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.block_urls.len(), 2);
        assert_eq!(parsed.block_urls[1].index, 2);
        assert_eq!(parsed.thumbnail_url.unwrap().token, "tt");
    }

    #[test]
    fn test_empty_response_default() {
        let parsed: UploadBlocksUrl = serde_json::from_str("{}").unwrap();
        assert!(parsed.is_empty());
        assert_eq!(parsed, UploadBlocksUrl::default());
    }
}
