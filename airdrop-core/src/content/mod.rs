//! Post content validation
//!
//! A post qualifies when its rendered content mentions the participant's
//! wallet, the campaign keyword, and one of the accepted link markers. The
//! platform rewrites outbound links through its shortener, so the shortener
//! prefix counts as a link too.

pub mod oembed;

use async_trait::async_trait;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

use crate::error::FetchError;

pub use oembed::{OEmbedConfig, OEmbedFetcher};

/// Public metadata of a post, as returned by the embed endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostMetadata {
    #[serde(default)]
    pub author_url: Option<String>,
    #[serde(default)]
    pub author_name: Option<String>,
    /// Rendered post HTML
    #[serde(default)]
    pub html: Option<String>,
}

/// Fetches public post metadata by URL
#[async_trait]
pub trait PostFetcher: Send + Sync {
    async fn fetch(&self, post_url: &str) -> Result<PostMetadata, FetchError>;
}

/// Textual requirements a post must meet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRules {
    /// Required keyword (case-insensitive)
    pub keyword: String,
    /// At least one of these must appear (case-insensitive)
    pub link_markers: Vec<String>,
}

impl Default for ContentRules {
    fn default() -> Self {
        Self {
            keyword: "tokenización".to_string(),
            link_markers: vec!["tokenizados.net".to_string(), "t.co/".to_string()],
        }
    }
}

impl ContentRules {
    /// Load rules from environment variables
    ///
    /// Environment variables:
    /// - AIRDROP_REQUIRED_KEYWORD: keyword the post must mention
    /// - AIRDROP_LINK_MARKERS: comma separated accepted link substrings
    pub fn from_env() -> Self {
        let fallback = Self::default();
        let link_markers = std::env::var("AIRDROP_LINK_MARKERS")
            .ok()
            .map(|s| {
                s.split(',')
                    .map(|m| m.trim().to_string())
                    .filter(|m| !m.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|markers| !markers.is_empty())
            .unwrap_or(fallback.link_markers);

        Self {
            keyword: std::env::var("AIRDROP_REQUIRED_KEYWORD")
                .ok()
                .filter(|k| !k.trim().is_empty())
                .unwrap_or(fallback.keyword),
            link_markers,
        }
    }
}

/// Outcome of each independent content requirement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementCheck {
    pub wallet: bool,
    pub keyword: bool,
    pub link: bool,
}

impl RequirementCheck {
    pub fn passed(&self) -> bool {
        self.wallet && self.keyword && self.link
    }

    /// Names of the requirements that were not met
    pub fn missing(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if !self.wallet {
            missing.push("wallet address");
        }
        if !self.keyword {
            missing.push("required keyword");
        }
        if !self.link {
            missing.push("campaign link");
        }
        missing
    }
}

/// Why a post did not qualify
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentFailure {
    /// The embed endpoint answered with a non-success status
    FetchStatus(u16),
    /// The embed endpoint could not be reached or decoded
    FetchTransport(String),
    /// Metadata was fetched but requirements are missing
    Requirements(RequirementCheck),
}

impl From<FetchError> for ContentFailure {
    fn from(e: FetchError) -> Self {
        match e {
            FetchError::Status(code) => Self::FetchStatus(code),
            FetchError::Transport(msg) => Self::FetchTransport(msg),
        }
    }
}

impl fmt::Display for ContentFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FetchStatus(code) => write!(f, "Could not fetch post information ({code})"),
            Self::FetchTransport(msg) => write!(f, "Could not fetch post information: {msg}"),
            Self::Requirements(check) => write!(
                f,
                "Post does not meet all requirements. Wallet: {}, Keyword: {}, Link: {}",
                check.wallet, check.keyword, check.link
            ),
        }
    }
}

/// Result of validating one post
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentVerdict {
    /// Author handle, when the metadata exposes one
    pub handle: Option<String>,
    pub failure: Option<ContentFailure>,
}

impl ContentVerdict {
    pub fn is_valid(&self) -> bool {
        self.failure.is_none()
    }
}

/// Check fetched metadata against the rules. Pure; same input, same verdict.
pub fn check_content(meta: &PostMetadata, wallet: &str, rules: &ContentRules) -> ContentVerdict {
    let handle = meta.author_url.as_deref().and_then(handle_from_author_url);
    let html = meta.html.as_deref().unwrap_or_default().to_lowercase();

    let check = RequirementCheck {
        wallet: !wallet.is_empty() && html.contains(&wallet.to_lowercase()),
        keyword: !rules.keyword.is_empty() && html.contains(&rules.keyword.to_lowercase()),
        link: rules
            .link_markers
            .iter()
            .any(|marker| html.contains(&marker.to_lowercase())),
    };

    debug!(
        wallet = check.wallet,
        keyword = check.keyword,
        link = check.link,
        handle = ?handle,
        "Post content checked"
    );

    ContentVerdict {
        handle,
        failure: (!check.passed()).then_some(ContentFailure::Requirements(check)),
    }
}

/// Fetch a post and check it. Fetch failures become an invalid verdict.
pub async fn validate_post(
    fetcher: &dyn PostFetcher,
    post_url: &str,
    wallet: &str,
    rules: &ContentRules,
) -> ContentVerdict {
    match fetcher.fetch(post_url).await {
        Ok(meta) => check_content(&meta, wallet, rules),
        Err(e) => {
            warn!(post_url, error = %e, "Post metadata fetch failed");
            ContentVerdict {
                handle: None,
                failure: Some(e.into()),
            }
        }
    }
}

/// Take the first path segment of the author's profile URL
fn handle_from_author_url(author_url: &str) -> Option<String> {
    let url = match Url::parse(author_url) {
        Ok(url) => url,
        Err(e) => {
            warn!(author_url, error = %e, "Could not parse author URL");
            return None;
        }
    };
    url.path()
        .trim_start_matches('/')
        .split('/')
        .next()
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
}
