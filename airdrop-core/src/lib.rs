//! Airdrop Core
//!
//! Data model, validators and the eligibility-and-reward pipeline of the
//! promotional campaign.
//!
//! A participant submits a wallet address and the URL of a public post that
//! mentions it. The [`RewardPipeline`] checks the input format, the campaign
//! capacity, the post content and prior participation, records the claim and
//! sends the reward through a [`TransferService`].
//!
//! External collaborators are traits so they can be injected:
//!
//! - [`ParticipantStore`] / [`CampaignStore`]: document storage
//! - [`PostFetcher`]: public post metadata ([`OEmbedFetcher`])
//! - [`TransferService`]: on-chain payment

pub mod address;
pub mod content;
pub mod error;
pub mod pipeline;
pub mod post_ref;
pub mod share;
pub mod store;
pub mod transfer;
pub mod types;

pub use address::{is_valid_address, to_checksum_address};
pub use content::{
    check_content, validate_post, ContentFailure, ContentRules, ContentVerdict, OEmbedConfig,
    OEmbedFetcher, PostFetcher, PostMetadata, RequirementCheck,
};
pub use error::{CoreError, CoreResult, FetchError, TransferError};
pub use pipeline::{Outcome, PipelineSettings, Rejection, Resolution, RewardPipeline};
pub use share::{SharePost, ShareTemplate};
pub use store::{CampaignStore, ParticipantStore};
pub use transfer::TransferService;
pub use types::*;
