//! Sled persistent storage
//!
//! Participants live in one tree keyed by id, with one index tree per
//! uniqueness key. The insert runs as a single transaction across all four
//! trees; slot changes run as transactions on the campaign tree.

use async_trait::async_trait;
use chrono::Utc;
use serde::{de::DeserializeOwned, Serialize};
use sled::transaction::{
    abort, ConflictableTransactionError, TransactionError, Transactional,
};
use std::path::Path;
use tracing::{debug, warn};
use uuid::Uuid;

use airdrop_core::{
    handle_key, wallet_key, Campaign, CampaignDefaults, CampaignStore, ConflictKind, CoreError,
    CoreResult, NewParticipant, Participant, ParticipantStatus, ParticipantStore, StatusCounts,
    MAIN_CAMPAIGN_ID,
};

const PARTICIPANTS_TREE: &str = "participants";
const WALLET_INDEX_TREE: &str = "wallet_index";
const POST_INDEX_TREE: &str = "post_index";
const HANDLE_INDEX_TREE: &str = "handle_index";
const CAMPAIGN_TREE: &str = "campaign";

/// Sled-backed participant and campaign store
#[derive(Debug, Clone)]
pub struct SledStore {
    db: sled::Db,
    participants: sled::Tree,
    wallet_index: sled::Tree,
    post_index: sled::Tree,
    handle_index: sled::Tree,
    campaign: sled::Tree,
}

impl SledStore {
    /// Open or create the database at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> CoreResult<Self> {
        let db = sled::open(path)
            .map_err(|e| CoreError::Storage(format!("Failed to open sled db: {}", e)))?;

        let open_tree = |name: &str| {
            db.open_tree(name)
                .map_err(|e| CoreError::Storage(format!("Failed to open {} tree: {}", name, e)))
        };

        let store = Self {
            participants: open_tree(PARTICIPANTS_TREE)?,
            wallet_index: open_tree(WALLET_INDEX_TREE)?,
            post_index: open_tree(POST_INDEX_TREE)?,
            handle_index: open_tree(HANDLE_INDEX_TREE)?,
            campaign: open_tree(CAMPAIGN_TREE)?,
            db,
        };
        store.recover_interrupted()?;
        Ok(store)
    }

    /// Settle submissions cut off by a previous shutdown
    ///
    /// A reservation lives only as long as the submission holding it, so none
    /// survive a restart. Records stopped before payment are rejected; records
    /// stopped during payment have an unknown transfer outcome and go to
    /// manual review.
    fn recover_interrupted(&self) -> CoreResult<()> {
        let mut settled = 0usize;
        for participant in self.all_participants()? {
            let to = match participant.status {
                ParticipantStatus::Pending => ParticipantStatus::Rejected,
                ParticipantStatus::Verified => ParticipantStatus::ManualReview,
                _ => continue,
            };
            self.apply_transition(&participant.id, to, None)?;
            warn!(
                participant_id = %participant.id,
                from = %participant.status,
                to = %to,
                "Settled participant left by an interrupted submission"
            );
            settled += 1;
        }

        match self.update_campaign(|c| std::mem::take(&mut c.reserved_slots)) {
            Ok((0, _)) => {}
            Ok((stale, _)) => warn!(stale, "Released campaign slots held before restart"),
            Err(CoreError::NotFound(_)) => {}
            Err(e) => return Err(e),
        }

        if settled > 0 {
            debug!(settled, "Recovery finished");
        }
        Ok(())
    }

    /// Flush pending writes to disk
    pub async fn flush(&self) -> CoreResult<()> {
        self.db
            .flush_async()
            .await
            .map_err(|e| CoreError::Storage(format!("Failed to flush db: {}", e)))?;
        Ok(())
    }

    fn serialize<T: Serialize>(value: &T) -> CoreResult<Vec<u8>> {
        Ok(serde_json::to_vec(value)?)
    }

    fn deserialize<T: DeserializeOwned>(bytes: &[u8]) -> CoreResult<T> {
        Ok(serde_json::from_slice(bytes)?)
    }

    fn lookup(&self, index: &sled::Tree, key: &str) -> CoreResult<Option<Participant>> {
        let id = index
            .get(key.as_bytes())
            .map_err(|e| CoreError::Storage(format!("Failed to read index: {}", e)))?;
        match id {
            Some(id) => self.get_by_key(&id),
            None => Ok(None),
        }
    }

    fn get_by_key(&self, key: &[u8]) -> CoreResult<Option<Participant>> {
        match self
            .participants
            .get(key)
            .map_err(|e| CoreError::Storage(format!("Failed to get participant: {}", e)))?
        {
            Some(bytes) => Ok(Some(Self::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    fn all_participants(&self) -> CoreResult<Vec<Participant>> {
        let mut list = Vec::new();
        for item in self.participants.iter() {
            let (_, value) = item
                .map_err(|e| CoreError::Storage(format!("Failed to iterate participants: {}", e)))?;
            list.push(Self::deserialize(&value)?);
        }
        Ok(list)
    }

    /// Read-modify-write of the campaign document in one transaction
    fn update_campaign<T, F>(&self, f: F) -> CoreResult<(T, Campaign)>
    where
        F: Fn(&mut Campaign) -> T,
    {
        self.campaign
            .transaction(|tx| {
                let Some(bytes) = tx.get(MAIN_CAMPAIGN_ID)? else {
                    return abort(CoreError::NotFound("campaign".to_string()));
                };
                let mut campaign: Campaign = serde_json::from_slice(&bytes)
                    .map_err(|e| ConflictableTransactionError::Abort(CoreError::from(e)))?;
                let out = f(&mut campaign);
                let bytes = serde_json::to_vec(&campaign)
                    .map_err(|e| ConflictableTransactionError::Abort(CoreError::from(e)))?;
                tx.insert(MAIN_CAMPAIGN_ID, bytes)?;
                Ok((out, campaign))
            })
            .map_err(into_core_error)
    }

    fn apply_transition(
        &self,
        id: &str,
        to: ParticipantStatus,
        tx_hash: Option<String>,
    ) -> CoreResult<Participant> {
        self.participants
            .transaction(|tx| {
                let Some(bytes) = tx.get(id.as_bytes())? else {
                    return abort(CoreError::NotFound(format!("Participant {} not found", id)));
                };
                let mut participant: Participant = serde_json::from_slice(&bytes)
                    .map_err(|e| ConflictableTransactionError::Abort(CoreError::from(e)))?;
                if let Err(e) = participant.transition_to(to, tx_hash.clone()) {
                    return abort(e);
                }
                let bytes = serde_json::to_vec(&participant)
                    .map_err(|e| ConflictableTransactionError::Abort(CoreError::from(e)))?;
                tx.insert(id.as_bytes(), bytes)?;
                Ok(participant)
            })
            .map_err(into_core_error)
    }
}

fn into_core_error(e: TransactionError<CoreError>) -> CoreError {
    match e {
        TransactionError::Abort(e) => e,
        TransactionError::Storage(e) => CoreError::Storage(format!("Transaction failed: {}", e)),
    }
}

#[async_trait]
impl ParticipantStore for SledStore {
    async fn insert_participant(&self, new: NewParticipant) -> CoreResult<Participant> {
        let wallet = wallet_key(&new.wallet_address);
        let handle = new.author_handle.as_deref().map(handle_key);
        let participant = Participant::from_new(Uuid::new_v4().to_string(), new, Utc::now());
        let value = Self::serialize(&participant)?;
        let id = participant.id.as_bytes();

        (
            &self.participants,
            &self.wallet_index,
            &self.post_index,
            &self.handle_index,
        )
            .transaction(|(records, wallets, posts, handles)| {
                if wallets.get(wallet.as_bytes())?.is_some() {
                    return abort(CoreError::Conflict(ConflictKind::Wallet));
                }
                if posts.get(participant.post_id.as_bytes())?.is_some() {
                    return abort(CoreError::Conflict(ConflictKind::Post));
                }
                if let Some(handle) = &handle {
                    if handles.get(handle.as_bytes())?.is_some() {
                        return abort(CoreError::Conflict(ConflictKind::Handle));
                    }
                    handles.insert(handle.as_bytes(), id)?;
                }
                wallets.insert(wallet.as_bytes(), id)?;
                posts.insert(participant.post_id.as_bytes(), id)?;
                records.insert(id, value.as_slice())?;
                Ok(())
            })
            .map_err(into_core_error)?;

        debug!(participant_id = %participant.id, "Participant inserted");
        Ok(participant)
    }

    async fn get_participant(&self, id: &str) -> CoreResult<Option<Participant>> {
        self.get_by_key(id.as_bytes())
    }

    async fn find_by_wallet(&self, wallet: &str) -> CoreResult<Option<Participant>> {
        self.lookup(&self.wallet_index, &wallet_key(wallet))
    }

    async fn find_by_post_id(&self, post_id: &str) -> CoreResult<Option<Participant>> {
        self.lookup(&self.post_index, post_id)
    }

    async fn find_by_handle(&self, handle: &str) -> CoreResult<Option<Participant>> {
        self.lookup(&self.handle_index, &handle_key(handle))
    }

    async fn list_participants(&self) -> CoreResult<Vec<Participant>> {
        let mut list = self.all_participants()?;
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(list)
    }

    async fn count_by_status(&self) -> CoreResult<StatusCounts> {
        let list = self.all_participants()?;
        Ok(list.iter().collect())
    }

    async fn transition_participant(
        &self,
        id: &str,
        to: ParticipantStatus,
        tx_hash: Option<String>,
    ) -> CoreResult<Participant> {
        self.apply_transition(id, to, tx_hash)
    }
}

#[async_trait]
impl CampaignStore for SledStore {
    async fn load_or_init(&self, defaults: &CampaignDefaults) -> CoreResult<Campaign> {
        self.campaign
            .transaction(|tx| {
                if let Some(bytes) = tx.get(MAIN_CAMPAIGN_ID)? {
                    return serde_json::from_slice(&bytes)
                        .map_err(|e| ConflictableTransactionError::Abort(CoreError::from(e)));
                }
                let campaign = Campaign::from_defaults(defaults);
                let bytes = serde_json::to_vec(&campaign)
                    .map_err(|e| ConflictableTransactionError::Abort(CoreError::from(e)))?;
                tx.insert(MAIN_CAMPAIGN_ID, bytes)?;
                Ok(campaign)
            })
            .map_err(into_core_error)
    }

    async fn try_reserve_slot(&self) -> CoreResult<bool> {
        match self.update_campaign(Campaign::reserve_slot) {
            Ok((reserved, _)) => Ok(reserved),
            Err(CoreError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn commit_slot(&self) -> CoreResult<Campaign> {
        Ok(self.update_campaign(Campaign::commit_slot)?.1)
    }

    async fn release_slot(&self) -> CoreResult<Campaign> {
        Ok(self.update_campaign(Campaign::release_slot)?.1)
    }

    async fn set_active(&self, active: bool) -> CoreResult<Campaign> {
        Ok(self.update_campaign(|c| c.is_active = active)?.1)
    }
}
