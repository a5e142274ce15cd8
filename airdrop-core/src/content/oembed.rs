//! oEmbed-backed post fetcher

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use tracing::debug;

use super::{PostFetcher, PostMetadata};
use crate::error::{CoreError, CoreResult, FetchError};

/// Public embed endpoint of the supported platform
pub const DEFAULT_OEMBED_ENDPOINT: &str = "https://publish.twitter.com/oembed";

/// oEmbed fetcher configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OEmbedConfig {
    pub endpoint: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_timeout() -> u64 {
    10
}

impl Default for OEmbedConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_OEMBED_ENDPOINT.to_string(),
            timeout_secs: default_timeout(),
        }
    }
}

impl OEmbedConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - AIRDROP_OEMBED_URL: embed endpoint
    /// - AIRDROP_OEMBED_TIMEOUT: request timeout in seconds
    pub fn from_env() -> Self {
        Self {
            endpoint: env::var("AIRDROP_OEMBED_URL")
                .unwrap_or_else(|_| DEFAULT_OEMBED_ENDPOINT.to_string()),
            timeout_secs: env::var("AIRDROP_OEMBED_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or_else(default_timeout),
        }
    }
}

/// Fetches post metadata from an oEmbed endpoint; no API key needed
pub struct OEmbedFetcher {
    client: Client,
    endpoint: String,
}

impl OEmbedFetcher {
    pub fn new(config: OEmbedConfig) -> CoreResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| CoreError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.endpoint,
        })
    }
}

#[async_trait]
impl PostFetcher for OEmbedFetcher {
    async fn fetch(&self, post_url: &str) -> Result<PostMetadata, FetchError> {
        debug!(post_url, endpoint = %self.endpoint, "Fetching post metadata");

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("url", post_url)])
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        response
            .json::<PostMetadata>()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))
    }
}
