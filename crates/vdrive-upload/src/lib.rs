//! vdrive-upload: upload-URL negotiation for verified blocks
//!
//! The last step of the block pipeline before bytes move: bundle a
//! revision's verified blocks (plus at most one thumbnail) into one batched
//! request and map the server's per-block URL list back by index. Blocks
//! reach this crate already encrypted, hashed, signed, and verified.

pub mod api;
pub mod client;
pub mod repository;

pub use api::{
    ApiError, BlockDescriptor, UploadBlocksRequest, UploadBlocksUrl, UploadUrl, UploadUrlApi,
};
pub use client::HttpUploadApi;
pub use repository::{BlockRepository, UploadError};
