//! Participant records and their status state machine
//!
//! A record moves forward only:
//!
//! ```text
//! pending ──► verified ──► rewarded
//!    │           │
//!    │           └──► manual_review ──► rewarded
//!    │                      │
//!    └──────► rejected ◄────┘
//! ```
//!
//! `rewarded` and `rejected` are terminal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Participant record identifier (assigned by the store)
pub type ParticipantId = String;

/// Participant status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantStatus {
    /// Just inserted, content checks passed
    #[default]
    Pending,
    /// Claim recorded, transfer about to be attempted
    Verified,
    /// Reward transferred and confirmed
    Rewarded,
    /// Transfer failed or timed out; an operator must resolve it
    ManualReview,
    /// Refused by an operator
    Rejected,
}

impl ParticipantStatus {
    pub const ALL: [ParticipantStatus; 5] = [
        Self::Pending,
        Self::Verified,
        Self::Rewarded,
        Self::ManualReview,
        Self::Rejected,
    ];

    /// Whether no further transition is possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Rewarded | Self::Rejected)
    }

    /// Whether the state machine allows moving to `target`
    pub fn can_transition_to(&self, target: ParticipantStatus) -> bool {
        match (self, target) {
            (Self::Pending, Self::Verified) => true,
            (Self::Pending, Self::Rejected) => true,

            (Self::Verified, Self::Rewarded) => true,
            (Self::Verified, Self::ManualReview) => true,
            (Self::Verified, Self::Rejected) => true,

            (Self::ManualReview, Self::Rewarded) => true,
            (Self::ManualReview, Self::Rejected) => true,

            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Verified => "verified",
            Self::Rewarded => "rewarded",
            Self::ManualReview => "manual_review",
            Self::Rejected => "rejected",
        }
    }

    /// Parse from the wire representation
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == s)
    }
}

impl fmt::Display for ParticipantStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which uniqueness slot an existing record already holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    Wallet,
    Post,
    Handle,
}

impl ConflictKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Wallet => "wallet",
            Self::Post => "post",
            Self::Handle => "handle",
        }
    }
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One campaign entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub wallet_address: String,
    pub post_url: String,
    pub post_id: String,
    pub author_handle: Option<String>,
    pub tx_hash: Option<String>,
    pub created_at: DateTime<Utc>,
    pub status: ParticipantStatus,
}

impl Participant {
    /// Build a stored record from an insert request
    pub fn from_new(id: ParticipantId, new: NewParticipant, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            wallet_address: new.wallet_address,
            post_url: new.post_url,
            post_id: new.post_id,
            author_handle: new.author_handle,
            tx_hash: None,
            created_at,
            status: ParticipantStatus::Pending,
        }
    }

    /// Apply a status change, refusing anything the state machine forbids
    ///
    /// The transaction hash is set once and never cleared.
    pub fn transition_to(
        &mut self,
        to: ParticipantStatus,
        tx_hash: Option<String>,
    ) -> Result<(), crate::CoreError> {
        if !self.status.can_transition_to(to) {
            return Err(crate::CoreError::InvalidTransition {
                from: self.status,
                to,
            });
        }
        self.status = to;
        if self.tx_hash.is_none() {
            self.tx_hash = tx_hash;
        }
        Ok(())
    }

    /// Normalized wallet key used by the uniqueness indexes
    pub fn wallet_key(&self) -> String {
        wallet_key(&self.wallet_address)
    }

    /// Normalized handle key used by the uniqueness indexes
    pub fn handle_key(&self) -> Option<String> {
        self.author_handle.as_deref().map(handle_key)
    }
}

/// Insert request for a new participant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewParticipant {
    pub wallet_address: String,
    pub post_url: String,
    pub post_id: String,
    pub author_handle: Option<String>,
}

/// Wallet addresses are unique regardless of checksum casing
pub fn wallet_key(wallet: &str) -> String {
    wallet.to_ascii_lowercase()
}

/// Handles are unique regardless of casing
pub fn handle_key(handle: &str) -> String {
    handle.to_lowercase()
}

/// Number of participants per status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub pending: u64,
    pub verified: u64,
    pub rewarded: u64,
    pub manual_review: u64,
    pub rejected: u64,
}

impl StatusCounts {
    pub fn record(&mut self, status: ParticipantStatus) {
        match status {
            ParticipantStatus::Pending => self.pending += 1,
            ParticipantStatus::Verified => self.verified += 1,
            ParticipantStatus::Rewarded => self.rewarded += 1,
            ParticipantStatus::ManualReview => self.manual_review += 1,
            ParticipantStatus::Rejected => self.rejected += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.pending + self.verified + self.rewarded + self.manual_review + self.rejected
    }
}

impl<'a> FromIterator<&'a Participant> for StatusCounts {
    fn from_iter<I: IntoIterator<Item = &'a Participant>>(iter: I) -> Self {
        let mut counts = Self::default();
        for participant in iter {
            counts.record(participant.status);
        }
        counts
    }
}
