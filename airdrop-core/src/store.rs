//! Storage interfaces for participants and campaign state
//!
//! Implementations must make [`ParticipantStore::insert_participant`] and the
//! campaign slot operations atomic; concurrent submissions rely on them for
//! uniqueness and capacity enforcement.

use async_trait::async_trait;

use crate::error::CoreResult;
use crate::types::{
    Campaign, CampaignDefaults, NewParticipant, Participant, ParticipantStatus, StatusCounts,
};

/// Participant collection
#[async_trait]
pub trait ParticipantStore: Send + Sync {
    /// Insert a new record in `pending` status
    ///
    /// Fails with `CoreError::Conflict` if the wallet, post id or handle is
    /// already claimed, checked in that order.
    async fn insert_participant(&self, new: NewParticipant) -> CoreResult<Participant>;

    async fn get_participant(&self, id: &str) -> CoreResult<Option<Participant>>;

    /// Lookup by wallet (case-insensitive)
    async fn find_by_wallet(&self, wallet: &str) -> CoreResult<Option<Participant>>;

    async fn find_by_post_id(&self, post_id: &str) -> CoreResult<Option<Participant>>;

    /// Lookup by author handle (case-insensitive)
    async fn find_by_handle(&self, handle: &str) -> CoreResult<Option<Participant>>;

    /// All records, newest first
    async fn list_participants(&self) -> CoreResult<Vec<Participant>>;

    async fn count_by_status(&self) -> CoreResult<StatusCounts>;

    /// Move a record to `to`, setting the transaction hash if given
    ///
    /// Fails with `CoreError::InvalidTransition` when the state machine
    /// forbids the move, and `CoreError::NotFound` for unknown ids.
    async fn transition_participant(
        &self,
        id: &str,
        to: ParticipantStatus,
        tx_hash: Option<String>,
    ) -> CoreResult<Participant>;
}

/// The campaign singleton
#[async_trait]
pub trait CampaignStore: Send + Sync {
    /// Read the campaign, creating it from `defaults` when absent
    async fn load_or_init(&self, defaults: &CampaignDefaults) -> CoreResult<Campaign>;

    /// Atomically take a slot if the campaign is open; `false` otherwise
    async fn try_reserve_slot(&self) -> CoreResult<bool>;

    /// Convert one reservation into a counted participant
    async fn commit_slot(&self) -> CoreResult<Campaign>;

    /// Return one reservation without counting it
    async fn release_slot(&self) -> CoreResult<Campaign>;

    async fn set_active(&self, active: bool) -> CoreResult<Campaign>;
}
