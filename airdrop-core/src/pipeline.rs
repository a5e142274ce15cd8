//! Eligibility-and-reward pipeline
//!
//! One submission walks the gates in order:
//!
//! ```text
//! Received → FormatValidated → CapacityChecked → ContentValidated
//!          → DuplicateChecked → Recorded → TransferAttempted
//!          → { Rewarded | TransferFailed (manual review) }
//! ```
//!
//! Any gate before `Recorded` may reject without side effects. Capacity is
//! enforced twice: a cheap read before any network work, then an atomic slot
//! reservation right before the record is inserted. The insert itself is
//! guarded by the store's uniqueness check, so racing duplicates lose there.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::address::is_valid_address;
use crate::content::{validate_post, ContentFailure, ContentRules, PostFetcher};
use crate::error::{CoreError, CoreResult, TransferError};
use crate::post_ref::{extract_id, validate_url};
use crate::store::{CampaignStore, ParticipantStore};
use crate::transfer::TransferService;
use crate::types::{
    Campaign, CampaignDefaults, ConflictKind, NewParticipant, Participant, ParticipantId,
    ParticipantStatus,
};

/// Default bound on the whole transfer step, confirmation included
pub const DEFAULT_TRANSFER_TIMEOUT: Duration = Duration::from_secs(180);

/// Pipeline tuning
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub rules: ContentRules,
    pub defaults: CampaignDefaults,
    pub transfer_timeout: Duration,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            rules: ContentRules::default(),
            defaults: CampaignDefaults::default(),
            transfer_timeout: DEFAULT_TRANSFER_TIMEOUT,
        }
    }
}

impl PipelineSettings {
    /// Load settings from environment variables
    ///
    /// Besides the content and campaign variables, reads
    /// AIRDROP_TRANSFER_TIMEOUT_SECS (default 180).
    pub fn from_env() -> Self {
        Self {
            rules: ContentRules::from_env(),
            defaults: CampaignDefaults::from_env(),
            transfer_timeout: std::env::var("AIRDROP_TRANSFER_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_TRANSFER_TIMEOUT),
        }
    }
}

/// Why a submission was turned away before anything was recorded
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// Wallet or post URL missing
    MissingInput,
    InvalidWallet,
    InvalidPostUrl,
    /// Inactive or at capacity
    CampaignClosed,
    /// URL passed validation but no post id could be extracted
    UnparsablePostReference,
    /// Post content did not qualify
    ContentRejected {
        failure: ContentFailure,
        handle: Option<String>,
    },
    /// Wallet, post or handle already holds a claim
    Duplicate {
        conflict: ConflictKind,
        handle: Option<String>,
    },
}

impl Rejection {
    /// Client-facing message
    pub fn message(&self) -> String {
        match self {
            Self::MissingInput => "Wallet address and tweet URL are required".to_string(),
            Self::InvalidWallet => "Invalid wallet address".to_string(),
            Self::InvalidPostUrl => "Invalid tweet URL".to_string(),
            Self::CampaignClosed => {
                "Campaign is no longer active or has reached maximum participants".to_string()
            }
            Self::UnparsablePostReference => "Could not extract tweet ID from URL".to_string(),
            Self::ContentRejected { failure, .. } => failure.to_string(),
            Self::Duplicate { conflict, handle } => match (conflict, handle) {
                (ConflictKind::Wallet, _) => {
                    "This wallet has already participated in the campaign".to_string()
                }
                (ConflictKind::Post, _) => {
                    "This tweet has already been used by another participant".to_string()
                }
                (ConflictKind::Handle, Some(handle)) => {
                    format!("The user @{handle} has already participated in the campaign")
                }
                (ConflictKind::Handle, None) => {
                    "This user has already participated in the campaign".to_string()
                }
            },
        }
    }

    /// Short machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingInput => "missing_input",
            Self::InvalidWallet => "invalid_wallet",
            Self::InvalidPostUrl => "invalid_post_url",
            Self::CampaignClosed => "campaign_closed",
            Self::UnparsablePostReference => "unparsable_post_reference",
            Self::ContentRejected { .. } => "content_rejected",
            Self::Duplicate { .. } => "duplicate",
        }
    }
}

/// Final result of a submission
#[derive(Debug, Clone)]
pub enum Outcome {
    /// Paid and recorded
    Rewarded {
        participant: Participant,
        tx_hash: String,
    },
    /// Turned away with no side effects
    Rejected(Rejection),
    /// Recorded but not paid; the record awaits manual review
    TransferFailed {
        participant_id: ParticipantId,
        error: TransferError,
    },
}

/// Operator decision for a record in manual review
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Paid out of band
    Rewarded { tx_hash: String },
    Rejected,
}

impl Resolution {
    /// Status the record moves to
    pub fn status(&self) -> ParticipantStatus {
        match self {
            Resolution::Rewarded { .. } => ParticipantStatus::Rewarded,
            Resolution::Rejected => ParticipantStatus::Rejected,
        }
    }
}

/// Orchestrates validation, recording and payment
pub struct RewardPipeline {
    participants: Arc<dyn ParticipantStore>,
    campaigns: Arc<dyn CampaignStore>,
    fetcher: Arc<dyn PostFetcher>,
    transfer: Arc<dyn TransferService>,
    settings: PipelineSettings,
}

impl RewardPipeline {
    pub fn new(
        participants: Arc<dyn ParticipantStore>,
        campaigns: Arc<dyn CampaignStore>,
        fetcher: Arc<dyn PostFetcher>,
        transfer: Arc<dyn TransferService>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            participants,
            campaigns,
            fetcher,
            transfer,
            settings,
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Current campaign state, created from defaults on first access
    pub async fn campaign(&self) -> CoreResult<Campaign> {
        self.campaigns.load_or_init(&self.settings.defaults).await
    }

    /// Run one submission through every gate
    ///
    /// `Err` is reserved for collaborator failures (store unreachable and the
    /// like); every business outcome is an [`Outcome`].
    pub async fn submit(&self, wallet_address: &str, post_url: &str) -> CoreResult<Outcome> {
        let wallet_address = wallet_address.trim();
        let post_url = post_url.trim();

        // Format gate
        if let Some(rejection) = check_format(wallet_address, post_url) {
            return Ok(self.reject(wallet_address, rejection));
        }

        // Capacity gate (read only; the binding check is the reservation below)
        let campaign = self.campaign().await?;
        if !campaign.is_open() {
            return Ok(self.reject(wallet_address, Rejection::CampaignClosed));
        }

        // Extraction gate
        let Some(post_id) = extract_id(post_url) else {
            return Ok(self.reject(wallet_address, Rejection::UnparsablePostReference));
        };

        // Content gate
        let verdict = validate_post(
            self.fetcher.as_ref(),
            post_url,
            wallet_address,
            &self.settings.rules,
        )
        .await;
        if let Some(failure) = verdict.failure {
            return Ok(self.reject(
                wallet_address,
                Rejection::ContentRejected {
                    failure,
                    handle: verdict.handle,
                },
            ));
        }
        let handle = verdict.handle;

        // Duplicate gate
        if let Some(conflict) = self
            .find_conflict(wallet_address, &post_id, handle.as_deref())
            .await?
        {
            return Ok(self.reject(wallet_address, Rejection::Duplicate { conflict, handle }));
        }

        // Recording: reserve capacity, then insert under the uniqueness guard
        if !self.campaigns.try_reserve_slot().await? {
            return Ok(self.reject(wallet_address, Rejection::CampaignClosed));
        }

        let new = NewParticipant {
            wallet_address: wallet_address.to_string(),
            post_url: post_url.to_string(),
            post_id,
            author_handle: handle.clone(),
        };
        let participant = match self.participants.insert_participant(new).await {
            Ok(participant) => participant,
            Err(CoreError::Conflict(conflict)) => {
                self.release_slot_logged().await;
                return Ok(self.reject(wallet_address, Rejection::Duplicate { conflict, handle }));
            }
            Err(e) => {
                self.release_slot_logged().await;
                return Err(e);
            }
        };

        let participant = match self
            .participants
            .transition_participant(&participant.id, ParticipantStatus::Verified, None)
            .await
        {
            Ok(participant) => participant,
            Err(e) => {
                error!(
                    participant_id = %participant.id,
                    error = %e,
                    "Could not mark participant verified"
                );
                self.abandon(&participant.id).await;
                self.release_slot_logged().await;
                return Err(e);
            }
        };

        info!(
            participant_id = %participant.id,
            wallet = wallet_address,
            post_id = %participant.post_id,
            "Participant recorded, sending reward"
        );

        // Transfer
        match self.send_reward(wallet_address, &campaign).await {
            Ok(tx_hash) => Ok(self.finish_rewarded(participant, tx_hash).await),
            Err(error) => Ok(self.finish_failed(participant, error).await),
        }
    }

    /// Apply an operator decision to a record awaiting manual review
    pub async fn resolve(&self, id: &str, resolution: Resolution) -> CoreResult<Participant> {
        let participant = self
            .participants
            .get_participant(id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("Participant {} not found", id)))?;

        // Pending and verified records still belong to an in-flight submission;
        // terminal ones are settled
        if participant.status != ParticipantStatus::ManualReview {
            return Err(CoreError::InvalidTransition {
                from: participant.status,
                to: resolution.status(),
            });
        }

        match resolution {
            Resolution::Rejected => {
                let updated = self
                    .participants
                    .transition_participant(id, ParticipantStatus::Rejected, None)
                    .await?;
                info!(participant_id = id, "Participant rejected by operator");
                Ok(updated)
            }
            Resolution::Rewarded { tx_hash } => {
                self.campaign().await?;
                if !self.campaigns.try_reserve_slot().await? {
                    return Err(CoreError::CampaignClosed);
                }

                let updated = match self
                    .participants
                    .transition_participant(id, ParticipantStatus::Rewarded, Some(tx_hash))
                    .await
                {
                    Ok(updated) => updated,
                    Err(e) => {
                        self.release_slot_logged().await;
                        return Err(e);
                    }
                };
                self.campaigns.commit_slot().await?;

                info!(
                    participant_id = id,
                    tx_hash = ?updated.tx_hash,
                    "Participant rewarded by operator"
                );
                Ok(updated)
            }
        }
    }

    async fn find_conflict(
        &self,
        wallet: &str,
        post_id: &str,
        handle: Option<&str>,
    ) -> CoreResult<Option<ConflictKind>> {
        if self.participants.find_by_wallet(wallet).await?.is_some() {
            return Ok(Some(ConflictKind::Wallet));
        }
        if self.participants.find_by_post_id(post_id).await?.is_some() {
            return Ok(Some(ConflictKind::Post));
        }
        if let Some(handle) = handle {
            if self.participants.find_by_handle(handle).await?.is_some() {
                return Ok(Some(ConflictKind::Handle));
            }
        }
        Ok(None)
    }

    async fn send_reward(&self, wallet: &str, campaign: &Campaign) -> Result<String, TransferError> {
        let timeout = self.settings.transfer_timeout;
        match tokio::time::timeout(timeout, self.transfer.transfer(wallet, campaign.reward_amount))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(TransferError::Timeout(timeout)),
        }
    }

    async fn finish_rewarded(&self, participant: Participant, tx_hash: String) -> Outcome {
        // The payment went out; bookkeeping failures below are logged, not returned.
        // Only a record that reached `rewarded` is counted in the campaign.
        let participant = match self
            .participants
            .transition_participant(
                &participant.id,
                ParticipantStatus::Rewarded,
                Some(tx_hash.clone()),
            )
            .await
        {
            Ok(updated) => {
                if let Err(e) = self.campaigns.commit_slot().await {
                    error!(
                        participant_id = %updated.id,
                        tx_hash = %tx_hash,
                        error = %e,
                        "Reward sent but campaign counter update failed"
                    );
                }
                updated
            }
            Err(e) => {
                error!(
                    participant_id = %participant.id,
                    tx_hash = %tx_hash,
                    error = %e,
                    "Reward sent but participant status update failed"
                );
                self.release_slot_logged().await;
                participant
            }
        };

        info!(
            participant_id = %participant.id,
            tx_hash = %tx_hash,
            "Reward transferred"
        );

        Outcome::Rewarded {
            participant,
            tx_hash,
        }
    }

    async fn finish_failed(&self, participant: Participant, error: TransferError) -> Outcome {
        error!(
            participant_id = %participant.id,
            wallet = %participant.wallet_address,
            error = %error,
            "Reward transfer failed, participant needs manual review"
        );

        if let Err(e) = self
            .participants
            .transition_participant(&participant.id, ParticipantStatus::ManualReview, None)
            .await
        {
            error!(
                participant_id = %participant.id,
                error = %e,
                "Could not mark participant for manual review"
            );
        }
        self.release_slot_logged().await;

        Outcome::TransferFailed {
            participant_id: participant.id,
            error,
        }
    }

    /// Best-effort rejection of a record whose submission cannot continue
    async fn abandon(&self, id: &str) {
        if let Err(e) = self
            .participants
            .transition_participant(id, ParticipantStatus::Rejected, None)
            .await
        {
            error!(participant_id = id, error = %e, "Could not reject abandoned participant");
        }
    }

    async fn release_slot_logged(&self) {
        if let Err(e) = self.campaigns.release_slot().await {
            error!(error = %e, "Failed to release campaign slot");
        }
    }

    fn reject(&self, wallet: &str, rejection: Rejection) -> Outcome {
        warn!(wallet, reason = rejection.code(), "Submission rejected");
        Outcome::Rejected(rejection)
    }
}

fn check_format(wallet_address: &str, post_url: &str) -> Option<Rejection> {
    if wallet_address.is_empty() || post_url.is_empty() {
        return Some(Rejection::MissingInput);
    }
    if !is_valid_address(wallet_address) {
        return Some(Rejection::InvalidWallet);
    }
    if !validate_url(post_url) {
        return Some(Rejection::InvalidPostUrl);
    }
    None
}
