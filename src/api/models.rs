use serde::{Deserialize, Serialize};

/// Response from the `/<id>?json` metadata endpoint
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MediaMetadata {
    /// Absolute URL of the full-resolution asset
    pub full: String,
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

/// Configuration for the API client
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub site_prefix: String,
    pub default_extension: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.zerochan.net".to_string(),
            site_prefix: "zerochan".to_string(),
            default_extension: "jpg".to_string(),
        }
    }
}
