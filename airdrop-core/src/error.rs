//! Error types for the airdrop core

use std::time::Duration;

use thiserror::Error;

use crate::types::{ConflictKind, ParticipantStatus};

/// Core errors raised by stores and pipeline bookkeeping
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already claimed by another participant: {0}")]
    Conflict(ConflictKind),

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition {
        from: ParticipantStatus,
        to: ParticipantStatus,
    },

    #[error("Campaign is closed")]
    CampaignClosed,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Result type alias for core operations
pub type CoreResult<T> = Result<T, CoreError>;

/// Failure of the external transfer collaborator
///
/// Configuration problems are kept apart from on-chain rejections so operators
/// can tell a missing key from a failed payment.
#[derive(Error, Debug, Clone)]
pub enum TransferError {
    #[error("Transfer not configured: {0}")]
    Configuration(String),

    #[error("Transfer rejected: {0}")]
    Rejected(String),

    #[error("Transfer confirmation timed out after {0:?}")]
    Timeout(Duration),
}

/// Failure of the external post-content fetcher
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("post metadata request returned status {0}")]
    Status(u16),

    #[error("post metadata request failed: {0}")]
    Transport(String),
}
