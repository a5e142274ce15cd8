//! End-to-end pipeline tests against the in-memory store

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use airdrop_core::{
    CampaignDefaults, CampaignStore, ConflictKind, ContentFailure, CoreError, CoreResult,
    FetchError, NewParticipant, Outcome, Participant, ParticipantStatus, ParticipantStore,
    PipelineSettings, PostFetcher, PostMetadata, Rejection, Resolution, RewardPipeline,
    StatusCounts, TransferError, TransferService,
};
use airdrop_store::MemoryStore;

/// Serves canned metadata per post URL
#[derive(Default)]
struct ScriptedFetcher {
    posts: Mutex<HashMap<String, PostMetadata>>,
    calls: AtomicUsize,
}

impl ScriptedFetcher {
    fn publish(&self, url: &str, handle: &str, html: String) {
        self.posts.lock().unwrap().insert(
            url.to_string(),
            PostMetadata {
                author_url: Some(format!("https://twitter.com/{handle}")),
                author_name: Some(handle.to_string()),
                html: Some(html),
            },
        );
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PostFetcher for ScriptedFetcher {
    async fn fetch(&self, post_url: &str) -> Result<PostMetadata, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.posts
            .lock()
            .unwrap()
            .get(post_url)
            .cloned()
            .ok_or(FetchError::Status(404))
    }
}

#[derive(Clone, Copy)]
enum TransferMode {
    Succeed,
    Fail,
    Hang,
}

struct ScriptedTransfer {
    mode: TransferMode,
    calls: AtomicUsize,
}

impl ScriptedTransfer {
    fn new(mode: TransferMode) -> Self {
        Self {
            mode,
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TransferService for ScriptedTransfer {
    async fn transfer(&self, to: &str, amount: Decimal) -> Result<String, TransferError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        assert_eq!(amount, Decimal::new(2, 3));
        match self.mode {
            TransferMode::Succeed => {
                // Let concurrent submissions interleave
                tokio::task::yield_now().await;
                Ok(format!("0x{:064x}", n + 1))
            }
            TransferMode::Fail => Err(TransferError::Rejected(format!("insufficient funds for {to}"))),
            TransferMode::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok("0xlate".to_string())
            }
        }
    }
}

struct Harness {
    store: Arc<MemoryStore>,
    fetcher: Arc<ScriptedFetcher>,
    transfer: Arc<ScriptedTransfer>,
    pipeline: RewardPipeline,
}

fn harness(mode: TransferMode, max_users: u32) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let fetcher = Arc::new(ScriptedFetcher::default());
    let transfer = Arc::new(ScriptedTransfer::new(mode));
    let settings = PipelineSettings {
        defaults: CampaignDefaults {
            max_users,
            ..Default::default()
        },
        transfer_timeout: Duration::from_millis(200),
        ..Default::default()
    };
    let pipeline = RewardPipeline::new(
        store.clone(),
        store.clone(),
        fetcher.clone(),
        transfer.clone(),
        settings,
    );
    Harness {
        store,
        fetcher,
        transfer,
        pipeline,
    }
}

fn wallet(n: u32) -> String {
    format!("0x{:040x}", n)
}

fn post_url(handle: &str, id: u64) -> String {
    format!("https://x.com/{handle}/status/{id}")
}

fn qualifying_html(wallet: &str) -> String {
    format!(
        "<blockquote><p>Aprendiendo sobre Tokenización con https://t.co/abc123 {wallet}</p></blockquote>"
    )
}

impl Harness {
    /// Publish a qualifying post and return its URL
    fn qualifying_post(&self, handle: &str, id: u64, wallet: &str) -> String {
        let url = post_url(handle, id);
        self.fetcher.publish(&url, handle, qualifying_html(wallet));
        url
    }
}

#[tokio::test]
async fn test_successful_submission_is_rewarded() {
    let h = harness(TransferMode::Succeed, 5);
    let w = wallet(1);
    let url = h.qualifying_post("alice", 1111, &w);

    let outcome = h.pipeline.submit(&w, &url).await.unwrap();
    let Outcome::Rewarded {
        participant,
        tx_hash,
    } = outcome
    else {
        panic!("expected reward, got {outcome:?}");
    };

    assert_eq!(participant.status, ParticipantStatus::Rewarded);
    assert_eq!(participant.tx_hash.as_deref(), Some(tx_hash.as_str()));
    assert_eq!(participant.post_id, "1111");
    assert_eq!(participant.author_handle.as_deref(), Some("alice"));

    let campaign = h.pipeline.campaign().await.unwrap();
    assert_eq!(campaign.current_users, 1);
    assert_eq!(campaign.reserved_slots, 0);
    assert_eq!(h.transfer.calls(), 1);
}

#[tokio::test]
async fn test_bad_url_rejected_without_side_effects() {
    let h = harness(TransferMode::Succeed, 5);

    let outcome = h.pipeline.submit(&wallet(1), "not-a-url").await.unwrap();
    assert!(matches!(
        outcome,
        Outcome::Rejected(Rejection::InvalidPostUrl)
    ));
    assert_eq!(h.fetcher.calls(), 0);
    assert!(h.store.list_participants().await.unwrap().is_empty());

    let outcome = h.pipeline.submit("", &post_url("a", 1)).await.unwrap();
    assert!(matches!(outcome, Outcome::Rejected(Rejection::MissingInput)));
}

#[tokio::test]
async fn test_missing_keyword_rejected() {
    let h = harness(TransferMode::Succeed, 5);
    let w = wallet(2);
    let url = post_url("bob", 2222);
    h.fetcher
        .publish(&url, "bob", format!("Mi wallet {w} https://t.co/xyz"));

    let outcome = h.pipeline.submit(&w, &url).await.unwrap();
    let Outcome::Rejected(Rejection::ContentRejected { failure, handle }) = outcome else {
        panic!("expected content rejection, got {outcome:?}");
    };
    let ContentFailure::Requirements(check) = failure else {
        panic!("expected requirement failure");
    };
    assert!(check.wallet && check.link && !check.keyword);
    assert_eq!(handle.as_deref(), Some("bob"));

    assert!(h.store.list_participants().await.unwrap().is_empty());
    assert_eq!(h.transfer.calls(), 0);
}

#[tokio::test]
async fn test_unreachable_post_rejected() {
    let h = harness(TransferMode::Succeed, 5);
    let outcome = h
        .pipeline
        .submit(&wallet(3), &post_url("ghost", 404))
        .await
        .unwrap();
    assert!(matches!(
        outcome,
        Outcome::Rejected(Rejection::ContentRejected {
            failure: ContentFailure::FetchStatus(404),
            ..
        })
    ));
}

#[tokio::test]
async fn test_transfer_failure_goes_to_manual_review() {
    let h = harness(TransferMode::Fail, 5);
    let w = wallet(4);
    let url = h.qualifying_post("carol", 4444, &w);

    let outcome = h.pipeline.submit(&w, &url).await.unwrap();
    let Outcome::TransferFailed {
        participant_id,
        error,
    } = outcome
    else {
        panic!("expected transfer failure, got {outcome:?}");
    };
    assert!(matches!(error, TransferError::Rejected(_)));

    let record = h.store.get_participant(&participant_id).await.unwrap().unwrap();
    assert_eq!(record.status, ParticipantStatus::ManualReview);
    assert!(record.tx_hash.is_none());

    let campaign = h.pipeline.campaign().await.unwrap();
    assert_eq!(campaign.current_users, 0);
    assert_eq!(campaign.reserved_slots, 0);

    // The failed record still holds the wallet
    let again = h.pipeline.submit(&w, &url).await.unwrap();
    assert!(matches!(
        again,
        Outcome::Rejected(Rejection::Duplicate {
            conflict: ConflictKind::Wallet,
            ..
        })
    ));
}

#[tokio::test(start_paused = true)]
async fn test_transfer_timeout_goes_to_manual_review() {
    let h = harness(TransferMode::Hang, 5);
    let w = wallet(5);
    let url = h.qualifying_post("dave", 5555, &w);

    let outcome = h.pipeline.submit(&w, &url).await.unwrap();
    let Outcome::TransferFailed {
        participant_id,
        error,
    } = outcome
    else {
        panic!("expected timeout, got {outcome:?}");
    };
    assert!(matches!(error, TransferError::Timeout(_)));

    let record = h.store.get_participant(&participant_id).await.unwrap().unwrap();
    assert_eq!(record.status, ParticipantStatus::ManualReview);
}

#[tokio::test]
async fn test_closed_campaign_rejects_before_fetch() {
    let h = harness(TransferMode::Succeed, 5);
    h.pipeline.campaign().await.unwrap();
    h.store.set_active(false).await.unwrap();

    let w = wallet(6);
    let url = h.qualifying_post("erin", 6666, &w);
    let outcome = h.pipeline.submit(&w, &url).await.unwrap();

    assert!(matches!(outcome, Outcome::Rejected(Rejection::CampaignClosed)));
    assert_eq!(h.fetcher.calls(), 0);
}

#[tokio::test]
async fn test_duplicates_by_post_and_handle() {
    let h = harness(TransferMode::Succeed, 5);
    let first = wallet(7);
    let url = h.qualifying_post("frank", 7777, &first);
    assert!(matches!(
        h.pipeline.submit(&first, &url).await.unwrap(),
        Outcome::Rewarded { .. }
    ));

    // Same post, another wallet that the post also mentions
    let second = wallet(8);
    h.fetcher.publish(
        &url,
        "frank",
        format!("{} {}", qualifying_html(&first), second),
    );
    let outcome = h.pipeline.submit(&second, &url).await.unwrap();
    assert!(matches!(
        outcome,
        Outcome::Rejected(Rejection::Duplicate {
            conflict: ConflictKind::Post,
            ..
        })
    ));

    // Another post by the same author, in different casing
    let third = wallet(9);
    let other = h.qualifying_post("Frank", 7778, &third);
    let outcome = h.pipeline.submit(&third, &other).await.unwrap();
    let Outcome::Rejected(rejection) = outcome else {
        panic!("expected rejection");
    };
    assert_eq!(
        rejection,
        Rejection::Duplicate {
            conflict: ConflictKind::Handle,
            handle: Some("Frank".to_string()),
        }
    );
    assert_eq!(
        rejection.message(),
        "The user @Frank has already participated in the campaign"
    );
    assert_eq!(h.transfer.calls(), 1);
}

#[tokio::test]
async fn test_concurrent_submissions_respect_capacity() {
    let h = harness(TransferMode::Succeed, 2);
    let w0 = wallet(10);
    let u0 = h.qualifying_post("gina", 1000, &w0);
    assert!(matches!(
        h.pipeline.submit(&w0, &u0).await.unwrap(),
        Outcome::Rewarded { .. }
    ));

    let (w1, w2) = (wallet(11), wallet(12));
    let u1 = h.qualifying_post("hank", 1001, &w1);
    let u2 = h.qualifying_post("iris", 1002, &w2);

    let (a, b) = tokio::join!(h.pipeline.submit(&w1, &u1), h.pipeline.submit(&w2, &u2));
    let outcomes = [a.unwrap(), b.unwrap()];

    let rewarded = outcomes
        .iter()
        .filter(|o| matches!(o, Outcome::Rewarded { .. }))
        .count();
    let closed = outcomes
        .iter()
        .filter(|o| matches!(o, Outcome::Rejected(Rejection::CampaignClosed)))
        .count();
    assert_eq!((rewarded, closed), (1, 1));

    let campaign = h.pipeline.campaign().await.unwrap();
    assert_eq!(campaign.current_users, 2);
    assert_eq!(campaign.reserved_slots, 0);
    assert!(!campaign.is_open());
    assert_eq!(h.store.list_participants().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_concurrent_same_wallet_pays_once() {
    let h = harness(TransferMode::Succeed, 5);
    let w = wallet(13);
    let u1 = h.qualifying_post("jack", 1301, &w);
    let u2 = h.qualifying_post("kate", 1302, &w);

    let (a, b) = tokio::join!(h.pipeline.submit(&w, &u1), h.pipeline.submit(&w, &u2));
    let outcomes = [a.unwrap(), b.unwrap()];

    assert_eq!(h.transfer.calls(), 1);
    assert!(outcomes.iter().any(|o| matches!(
        o,
        Outcome::Rejected(Rejection::Duplicate {
            conflict: ConflictKind::Wallet,
            ..
        })
    )));
    assert_eq!(h.pipeline.campaign().await.unwrap().reserved_slots, 0);
}

#[tokio::test]
async fn test_resolve_manual_review() {
    let h = harness(TransferMode::Fail, 5);
    let w = wallet(14);
    let url = h.qualifying_post("liam", 1400, &w);
    let Outcome::TransferFailed { participant_id, .. } = h.pipeline.submit(&w, &url).await.unwrap()
    else {
        panic!("expected transfer failure");
    };

    let resolved = h
        .pipeline
        .resolve(
            &participant_id,
            Resolution::Rewarded {
                tx_hash: "0xmanual".to_string(),
            },
        )
        .await
        .unwrap();
    assert_eq!(resolved.status, ParticipantStatus::Rewarded);
    assert_eq!(resolved.tx_hash.as_deref(), Some("0xmanual"));
    assert_eq!(h.pipeline.campaign().await.unwrap().current_users, 1);

    // Terminal
    let err = h
        .pipeline
        .resolve(&participant_id, Resolution::Rejected)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::InvalidTransition { .. }));

    let err = h
        .pipeline
        .resolve("missing", Resolution::Rejected)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::NotFound(_)));
}

#[tokio::test]
async fn test_resolve_rewarded_blocked_when_full() {
    let h = harness(TransferMode::Fail, 1);
    let w = wallet(15);
    let url = h.qualifying_post("mia", 1500, &w);
    let Outcome::TransferFailed { participant_id, .. } = h.pipeline.submit(&w, &url).await.unwrap()
    else {
        panic!("expected transfer failure");
    };

    h.store.try_reserve_slot().await.unwrap();
    h.store.commit_slot().await.unwrap();

    let err = h
        .pipeline
        .resolve(
            &participant_id,
            Resolution::Rewarded {
                tx_hash: "0x1".to_string(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::CampaignClosed));

    let rejected = h
        .pipeline
        .resolve(&participant_id, Resolution::Rejected)
        .await
        .unwrap();
    assert_eq!(rejected.status, ParticipantStatus::Rejected);
}

#[tokio::test]
async fn test_resolve_refuses_in_flight_records() {
    let h = harness(TransferMode::Succeed, 5);
    h.pipeline.campaign().await.unwrap();
    let participant = h
        .store
        .insert_participant(NewParticipant {
            wallet_address: wallet(16),
            post_url: post_url("noah", 1600),
            post_id: "1600".to_string(),
            author_handle: Some("noah".to_string()),
        })
        .await
        .unwrap();
    h.store
        .transition_participant(&participant.id, ParticipantStatus::Verified, None)
        .await
        .unwrap();

    let err = h
        .pipeline
        .resolve(
            &participant.id,
            Resolution::Rewarded {
                tx_hash: "0xearly".to_string(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CoreError::InvalidTransition {
            from: ParticipantStatus::Verified,
            to: ParticipantStatus::Rewarded,
        }
    ));

    let err = h
        .pipeline
        .resolve(&participant.id, Resolution::Rejected)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::InvalidTransition { .. }));

    let campaign = h.pipeline.campaign().await.unwrap();
    assert_eq!(campaign.current_users, 0);
    assert_eq!(campaign.reserved_slots, 0);
    let stored = h.store.get_participant(&participant.id).await.unwrap().unwrap();
    assert_eq!(stored.status, ParticipantStatus::Verified);
}

/// Participant store that cannot move records to `verified`
struct VerifyFails(Arc<MemoryStore>);

#[async_trait]
impl ParticipantStore for VerifyFails {
    async fn insert_participant(&self, new: NewParticipant) -> CoreResult<Participant> {
        self.0.insert_participant(new).await
    }

    async fn get_participant(&self, id: &str) -> CoreResult<Option<Participant>> {
        self.0.get_participant(id).await
    }

    async fn find_by_wallet(&self, wallet: &str) -> CoreResult<Option<Participant>> {
        self.0.find_by_wallet(wallet).await
    }

    async fn find_by_post_id(&self, post_id: &str) -> CoreResult<Option<Participant>> {
        self.0.find_by_post_id(post_id).await
    }

    async fn find_by_handle(&self, handle: &str) -> CoreResult<Option<Participant>> {
        self.0.find_by_handle(handle).await
    }

    async fn list_participants(&self) -> CoreResult<Vec<Participant>> {
        self.0.list_participants().await
    }

    async fn count_by_status(&self) -> CoreResult<StatusCounts> {
        self.0.count_by_status().await
    }

    async fn transition_participant(
        &self,
        id: &str,
        to: ParticipantStatus,
        tx_hash: Option<String>,
    ) -> CoreResult<Participant> {
        if to == ParticipantStatus::Verified {
            return Err(CoreError::Storage("disk full".to_string()));
        }
        self.0.transition_participant(id, to, tx_hash).await
    }
}

#[tokio::test]
async fn test_failed_verify_update_rejects_record() {
    let store = Arc::new(MemoryStore::new());
    let fetcher = Arc::new(ScriptedFetcher::default());
    let transfer = Arc::new(ScriptedTransfer::new(TransferMode::Succeed));
    let pipeline = RewardPipeline::new(
        Arc::new(VerifyFails(store.clone())),
        store.clone(),
        fetcher.clone(),
        transfer.clone(),
        PipelineSettings::default(),
    );

    let w = wallet(17);
    let url = post_url("olivia", 1700);
    fetcher.publish(&url, "olivia", qualifying_html(&w));

    let err = pipeline.submit(&w, &url).await.unwrap_err();
    assert!(matches!(err, CoreError::Storage(_)));
    assert_eq!(transfer.calls(), 0);

    let records = store.list_participants().await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, ParticipantStatus::Rejected);

    let campaign = pipeline.campaign().await.unwrap();
    assert_eq!(campaign.current_users, 0);
    assert_eq!(campaign.reserved_slots, 0);
}
