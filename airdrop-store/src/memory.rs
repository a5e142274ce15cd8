//! In-memory storage
//!
//! All maps sit behind one lock so the uniqueness check and the insert happen
//! as a single step.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use airdrop_core::{
    handle_key, wallet_key, Campaign, CampaignDefaults, CampaignStore, ConflictKind, CoreError,
    CoreResult, NewParticipant, Participant, ParticipantStatus, ParticipantStore, StatusCounts,
};

#[derive(Debug, Default)]
struct Participants {
    records: HashMap<String, Participant>,
    /// Insertion order, oldest first
    order: Vec<String>,
    by_wallet: HashMap<String, String>,
    by_post: HashMap<String, String>,
    by_handle: HashMap<String, String>,
}

impl Participants {
    fn lookup(&self, index: &HashMap<String, String>, key: &str) -> Option<Participant> {
        index.get(key).and_then(|id| self.records.get(id)).cloned()
    }
}

/// In-memory participant and campaign store
#[derive(Debug, Default)]
pub struct MemoryStore {
    participants: RwLock<Participants>,
    campaign: RwLock<Option<Campaign>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing campaign document
    pub fn with_campaign(campaign: Campaign) -> Self {
        Self {
            participants: RwLock::default(),
            campaign: RwLock::new(Some(campaign)),
        }
    }

    /// Drop all data
    pub async fn clear(&self) {
        *self.participants.write().await = Participants::default();
        *self.campaign.write().await = None;
    }

    async fn mutate_campaign<F>(&self, f: F) -> CoreResult<Campaign>
    where
        F: FnOnce(&mut Campaign),
    {
        let mut guard = self.campaign.write().await;
        let campaign = guard
            .as_mut()
            .ok_or_else(|| CoreError::NotFound("campaign".to_string()))?;
        f(campaign);
        Ok(campaign.clone())
    }
}

#[async_trait]
impl ParticipantStore for MemoryStore {
    async fn insert_participant(&self, new: NewParticipant) -> CoreResult<Participant> {
        let mut state = self.participants.write().await;

        let wallet = wallet_key(&new.wallet_address);
        let handle = new.author_handle.as_deref().map(handle_key);

        if state.by_wallet.contains_key(&wallet) {
            return Err(CoreError::Conflict(ConflictKind::Wallet));
        }
        if state.by_post.contains_key(&new.post_id) {
            return Err(CoreError::Conflict(ConflictKind::Post));
        }
        if let Some(handle) = &handle {
            if state.by_handle.contains_key(handle) {
                return Err(CoreError::Conflict(ConflictKind::Handle));
            }
        }

        let id = Uuid::new_v4().to_string();
        let participant = Participant::from_new(id.clone(), new, Utc::now());

        state.by_wallet.insert(wallet, id.clone());
        state.by_post.insert(participant.post_id.clone(), id.clone());
        if let Some(handle) = handle {
            state.by_handle.insert(handle, id.clone());
        }
        state.order.push(id.clone());
        state.records.insert(id, participant.clone());

        Ok(participant)
    }

    async fn get_participant(&self, id: &str) -> CoreResult<Option<Participant>> {
        Ok(self.participants.read().await.records.get(id).cloned())
    }

    async fn find_by_wallet(&self, wallet: &str) -> CoreResult<Option<Participant>> {
        let state = self.participants.read().await;
        Ok(state.lookup(&state.by_wallet, &wallet_key(wallet)))
    }

    async fn find_by_post_id(&self, post_id: &str) -> CoreResult<Option<Participant>> {
        let state = self.participants.read().await;
        Ok(state.lookup(&state.by_post, post_id))
    }

    async fn find_by_handle(&self, handle: &str) -> CoreResult<Option<Participant>> {
        let state = self.participants.read().await;
        Ok(state.lookup(&state.by_handle, &handle_key(handle)))
    }

    async fn list_participants(&self) -> CoreResult<Vec<Participant>> {
        let state = self.participants.read().await;
        let mut list: Vec<Participant> = state
            .order
            .iter()
            .rev()
            .filter_map(|id| state.records.get(id).cloned())
            .collect();
        // Stable sort keeps insertion order for equal timestamps
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(list)
    }

    async fn count_by_status(&self) -> CoreResult<StatusCounts> {
        let state = self.participants.read().await;
        Ok(state.records.values().collect())
    }

    async fn transition_participant(
        &self,
        id: &str,
        to: ParticipantStatus,
        tx_hash: Option<String>,
    ) -> CoreResult<Participant> {
        let mut state = self.participants.write().await;
        let participant = state
            .records
            .get_mut(id)
            .ok_or_else(|| CoreError::NotFound(format!("Participant {} not found", id)))?;
        participant.transition_to(to, tx_hash)?;
        Ok(participant.clone())
    }
}

#[async_trait]
impl CampaignStore for MemoryStore {
    async fn load_or_init(&self, defaults: &CampaignDefaults) -> CoreResult<Campaign> {
        let mut guard = self.campaign.write().await;
        let campaign = guard.get_or_insert_with(|| Campaign::from_defaults(defaults));
        Ok(campaign.clone())
    }

    async fn try_reserve_slot(&self) -> CoreResult<bool> {
        let mut guard = self.campaign.write().await;
        Ok(guard.as_mut().map(Campaign::reserve_slot).unwrap_or(false))
    }

    async fn commit_slot(&self) -> CoreResult<Campaign> {
        self.mutate_campaign(Campaign::commit_slot).await
    }

    async fn release_slot(&self) -> CoreResult<Campaign> {
        self.mutate_campaign(Campaign::release_slot).await
    }

    async fn set_active(&self, active: bool) -> CoreResult<Campaign> {
        self.mutate_campaign(|c| c.is_active = active).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn new_participant(n: u32) -> NewParticipant {
        NewParticipant {
            wallet_address: format!("0x{:040x}", n),
            post_url: format!("https://x.com/user{n}/status/{n}"),
            post_id: n.to_string(),
            author_handle: Some(format!("user{n}")),
        }
    }

    #[tokio::test]
    async fn test_insert_and_lookup() {
        let store = MemoryStore::new();
        let p = store.insert_participant(new_participant(0xab)).await.unwrap();
        assert_eq!(p.status, ParticipantStatus::Pending);

        let upper = format!("0x{:040X}", 0xab);
        let found = store.find_by_wallet(&upper).await.unwrap().unwrap();
        assert_eq!(found.id, p.id);
        assert_eq!(store.find_by_post_id("171").await.unwrap().unwrap().id, p.id);
        assert_eq!(store.find_by_handle("USER171").await.unwrap().unwrap().id, p.id);
        assert!(store.find_by_post_id("2").await.unwrap().is_none());
        assert_eq!(store.get_participant(&p.id).await.unwrap(), Some(p));
    }

    #[tokio::test]
    async fn test_conflict_precedence() {
        let store = MemoryStore::new();
        store.insert_participant(new_participant(1)).await.unwrap();

        let same_wallet = NewParticipant {
            post_id: "99".to_string(),
            author_handle: None,
            ..new_participant(1)
        };
        let err = store.insert_participant(same_wallet).await.unwrap_err();
        assert!(matches!(err, CoreError::Conflict(ConflictKind::Wallet)));

        let same_post = NewParticipant {
            post_id: "1".to_string(),
            ..new_participant(2)
        };
        let err = store.insert_participant(same_post).await.unwrap_err();
        assert!(matches!(err, CoreError::Conflict(ConflictKind::Post)));

        let same_handle = NewParticipant {
            author_handle: Some("User1".to_string()),
            ..new_participant(3)
        };
        let err = store.insert_participant(same_handle).await.unwrap_err();
        assert!(matches!(err, CoreError::Conflict(ConflictKind::Handle)));

        assert_eq!(store.list_participants().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_duplicate_inserts() {
        let store = Arc::new(MemoryStore::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.insert_participant(new_participant(7)).await
            }));
        }
        let mut ok = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                ok += 1;
            }
        }
        assert_eq!(ok, 1);
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let store = MemoryStore::new();
        for n in 1..=3 {
            store.insert_participant(new_participant(n)).await.unwrap();
        }
        let ids: Vec<String> = store
            .list_participants()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.post_id)
            .collect();
        assert_eq!(ids, vec!["3", "2", "1"]);
    }

    #[tokio::test]
    async fn test_transition_rules() {
        let store = MemoryStore::new();
        let p = store.insert_participant(new_participant(1)).await.unwrap();

        store
            .transition_participant(&p.id, ParticipantStatus::Verified, None)
            .await
            .unwrap();
        let rewarded = store
            .transition_participant(&p.id, ParticipantStatus::Rewarded, Some("0xaa".into()))
            .await
            .unwrap();
        assert_eq!(rewarded.tx_hash.as_deref(), Some("0xaa"));

        let err = store
            .transition_participant(&p.id, ParticipantStatus::Pending, None)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidTransition { .. }));

        let err = store
            .transition_participant("missing", ParticipantStatus::Verified, None)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));

        let counts = store.count_by_status().await.unwrap();
        assert_eq!(counts.rewarded, 1);
    }

    #[tokio::test]
    async fn test_campaign_lazy_init_and_slots() {
        let store = MemoryStore::new();
        assert!(!store.try_reserve_slot().await.unwrap());

        let defaults = CampaignDefaults {
            max_users: 2,
            ..Default::default()
        };
        let c = store.load_or_init(&defaults).await.unwrap();
        assert_eq!(c.max_users, 2);
        assert_eq!(c.current_users, 0);

        assert!(store.try_reserve_slot().await.unwrap());
        assert!(store.try_reserve_slot().await.unwrap());
        assert!(!store.try_reserve_slot().await.unwrap());

        let c = store.commit_slot().await.unwrap();
        assert_eq!((c.current_users, c.reserved_slots), (1, 1));
        let c = store.release_slot().await.unwrap();
        assert_eq!((c.current_users, c.reserved_slots), (1, 0));

        // Defaults do not overwrite an existing document
        let c = store.load_or_init(&CampaignDefaults::default()).await.unwrap();
        assert_eq!(c.max_users, 2);
    }

    #[tokio::test]
    async fn test_set_active_closes_campaign() {
        let store = MemoryStore::new();
        store.load_or_init(&CampaignDefaults::default()).await.unwrap();
        let c = store.set_active(false).await.unwrap();
        assert!(!c.is_open());
        assert!(!store.try_reserve_slot().await.unwrap());
    }
}
