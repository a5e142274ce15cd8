//! Data Transfer Objects for API requests and responses
//!
//! Field names are camelCase on the wire.

use airdrop_core::{Campaign, Participant, ParticipantStatus, SharePost, StatusCounts};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ============ Submission DTOs ============

/// Submit a post for the reward
///
/// Missing fields deserialize as empty so they are reported by the pipeline
/// with its own message.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    #[serde(default)]
    pub wallet_address: String,
    #[serde(default)]
    pub tweet_url: String,
}

/// Successful submission
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub success: bool,
    pub message: String,
    pub tx_hash: String,
    pub user_id: String,
}

/// Share text query
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareQuery {
    pub wallet_address: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareResponse {
    pub text: String,
    pub intent_url: String,
}

impl From<SharePost> for ShareResponse {
    fn from(post: SharePost) -> Self {
        Self {
            text: post.text,
            intent_url: post.intent_url,
        }
    }
}

// ============ Campaign DTOs ============

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignResponse {
    pub max_users: u32,
    pub current_users: u32,
    pub reward_amount: Decimal,
    pub is_active: bool,
    pub remaining_spots: u32,
    pub is_open: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&Campaign> for CampaignResponse {
    fn from(c: &Campaign) -> Self {
        Self {
            max_users: c.max_users,
            current_users: c.current_users,
            reward_amount: c.reward_amount,
            is_active: c.is_active,
            remaining_spots: c.remaining_spots(),
            is_open: c.is_open(),
            created_at: c.created_at,
        }
    }
}

/// Open or close the campaign
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetActiveRequest {
    pub is_active: bool,
}

// ============ Participant DTOs ============

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantResponse {
    pub id: String,
    pub wallet_address: String,
    pub tweet_url: String,
    pub tweet_id: String,
    pub tweet_username: Option<String>,
    pub tx_hash: Option<String>,
    pub created_at: DateTime<Utc>,
    pub status: ParticipantStatus,
}

impl From<Participant> for ParticipantResponse {
    fn from(p: Participant) -> Self {
        Self {
            id: p.id,
            wallet_address: p.wallet_address,
            tweet_url: p.post_url,
            tweet_id: p.post_id,
            tweet_username: p.author_handle,
            tx_hash: p.tx_hash,
            created_at: p.created_at,
            status: p.status,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub pending: u64,
    pub verified: u64,
    pub rewarded: u64,
    pub manual_review: u64,
    pub rejected: u64,
    pub total: u64,
}

impl From<StatusCounts> for StatsResponse {
    fn from(c: StatusCounts) -> Self {
        Self {
            pending: c.pending,
            verified: c.verified,
            rewarded: c.rewarded,
            manual_review: c.manual_review,
            rejected: c.rejected,
            total: c.total(),
        }
    }
}

/// Operator decision on a record in manual review
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    /// `rewarded` or `rejected`
    pub status: String,
    /// Required when `status` is `rewarded`
    pub tx_hash: Option<String>,
}

// ============ Health DTOs ============

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}
