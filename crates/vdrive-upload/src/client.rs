//! HTTP client for the upload-URL endpoint

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{ClientBuilder, Url};
use std::time::Duration;

use vdrive_core::config::ApiConfig;

use crate::api::{ApiError, UploadBlocksRequest, UploadBlocksUrl, UploadUrlApi};

const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");
const UPLOAD_URLS_PATH: &str = "v1/blocks/upload-urls";

pub struct HttpUploadApi {
    base_url: Url,
    client: reqwest::Client,
}

impl HttpUploadApi {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ApiError::Transport(format!("invalid base url {base_url}: {e}")))?;

        let mut headers = HeaderMap::new();
        headers.insert(
            "X-Vdrive-Client-Version",
            HeaderValue::from_static(PKG_VERSION),
        );

        let client = ClientBuilder::new()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        Ok(Self { base_url, client })
    }

    /// Build a client from the core config section.
    pub fn from_config(cfg: &ApiConfig) -> Result<Self, ApiError> {
        Self::new(&cfg.base_url, Duration::from_secs(cfg.timeout_secs))
    }

    fn endpoint(&self) -> Result<Url, ApiError> {
        self.base_url
            .join(UPLOAD_URLS_PATH)
            .map_err(|e| ApiError::Transport(format!("building endpoint url: {e}")))
    }
}

impl UploadUrlApi for HttpUploadApi {
    async fn request_upload_urls(
        &self,
        request: &UploadBlocksRequest,
    ) -> Result<UploadBlocksUrl, ApiError> {
        let response = self
            .client
            .post(self.endpoint()?)
            .json(request)
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status(status.as_u16()));
        }

        response
            .json::<UploadBlocksUrl>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }
}
