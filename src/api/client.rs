use futures::Stream;
use futures::TryStreamExt;
use reqwest::Client;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::domain::{LayoutMode, ResolutionError};

use super::models::{ApiConfig, MediaMetadata};

/// Asks the server for the compact layout's metadata payload.
const COMPACT_QUERY: &str = "json&screen=1";
/// Switches the server-side layout state back after a compact request.
const REVERT_QUERY: &str = "json&mobile=1";
const STANDARD_QUERY: &str = "json";

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Server returned HTTP {0}")]
    Status(u16),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

pub type Result<T> = std::result::Result<T, ApiError>;

impl From<ApiError> for ResolutionError {
    fn from(e: ApiError) -> Self {
        match e {
            ApiError::RequestError(e) => ResolutionError::Network(e.to_string()),
            ApiError::Status(code) => ResolutionError::Status(code),
            ApiError::InvalidResponse(msg) => ResolutionError::Malformed(msg),
            ApiError::InvalidUrl(msg) => ResolutionError::InvalidUrl(msg),
        }
    }
}

#[derive(Clone)]
pub struct ApiClient {
    config: ApiConfig,
    client: Client,
}

impl ApiClient {
    pub fn new(config: ApiConfig) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// `<base>/<identifier>?<query>`, built by hand so the bare `json`
    /// flag is kept without a trailing `=`. The identifier is always one
    /// path segment, even when it looks like a scheme (`Re:Zero`).
    fn metadata_url(&self, identifier: &str, query: &str) -> Result<Url> {
        let mut url = Url::parse(&self.config.base_url)
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {}", self.config.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| {
                ApiError::InvalidUrl(format!("{}: cannot be a base", self.config.base_url))
            })?
            .pop_if_empty()
            .push(identifier);
        url.set_query(Some(query));
        Ok(url)
    }

    /// Fetch the metadata of one item, in the payload variant its layout needs
    pub async fn fetch_metadata(&self, identifier: &str, layout: LayoutMode) -> Result<MediaMetadata> {
        let query = match layout {
            LayoutMode::Standard => STANDARD_QUERY,
            LayoutMode::Compact => COMPACT_QUERY,
        };
        let url = self.metadata_url(identifier, query)?;

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(ApiError::Status(response.status().as_u16()));
        }

        let metadata: MediaMetadata = response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(format!("JSON decode error: {}", e)))?;

        if metadata.full.trim().is_empty() {
            return Err(ApiError::InvalidResponse("empty `full` field".to_string()));
        }

        Ok(metadata)
    }

    /// Best-effort request putting the server-side session back into the
    /// non-compact layout. Failures are only logged.
    pub async fn revert_layout(&self, identifier: &str) {
        let url = match self.metadata_url(identifier, REVERT_QUERY) {
            Ok(url) => url,
            Err(e) => {
                debug!(%identifier, error = %e, "layout revert skipped");
                return;
            }
        };

        match self.client.get(url).send().await {
            Ok(response) if response.status().is_success() => {}
            Ok(response) => {
                debug!(%identifier, status = response.status().as_u16(), "layout revert refused")
            }
            Err(e) => debug!(%identifier, error = %e, "layout revert failed"),
        }
    }

    /// Download a binary asset as a chunk stream.
    /// Returns (total_size, stream)
    pub async fn download_file_stream(
        &self,
        download_url: &str,
    ) -> Result<(Option<u64>, impl Stream<Item = Result<bytes::Bytes>>)> {
        let response = self.client.get(download_url).send().await?;
        if !response.status().is_success() {
            return Err(ApiError::Status(response.status().as_u16()));
        }

        let total_size = response.content_length();
        let stream = response.bytes_stream().map_err(ApiError::RequestError);

        Ok((total_size, stream))
    }
}
