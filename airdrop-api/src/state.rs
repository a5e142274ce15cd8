//! Application state for the API server

use airdrop_core::{CampaignStore, ParticipantStore, RewardPipeline, ShareTemplate};
use std::env;
use std::sync::Arc;

/// API server state
#[derive(Clone)]
pub struct AppState {
    /// Submission pipeline
    pub pipeline: Arc<RewardPipeline>,
    /// Participant records, for admin listing
    pub participants: Arc<dyn ParticipantStore>,
    /// Campaign document, for admin control
    pub campaigns: Arc<dyn CampaignStore>,
    /// Promotional text
    pub share: Arc<ShareTemplate>,
    /// API version
    pub version: String,
}

impl AppState {
    pub fn new(
        pipeline: Arc<RewardPipeline>,
        participants: Arc<dyn ParticipantStore>,
        campaigns: Arc<dyn CampaignStore>,
    ) -> Self {
        Self {
            pipeline,
            participants,
            campaigns,
            share: Arc::new(ShareTemplate::default()),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Replace the share template
    pub fn with_share_template(mut self, share: ShareTemplate) -> Self {
        self.share = Arc::new(share);
        self
    }
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub enable_cors: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            enable_cors: true,
        }
    }
}

impl ApiConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - AIRDROP_HOST: bind address
    /// - AIRDROP_PORT: bind port
    /// - AIRDROP_CORS: enable permissive CORS (true/false)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: env::var("AIRDROP_HOST").unwrap_or(defaults.host),
            port: env::var("AIRDROP_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.port),
            enable_cors: env::var("AIRDROP_CORS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.enable_cors),
        }
    }
}
