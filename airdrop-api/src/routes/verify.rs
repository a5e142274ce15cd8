//! Submission endpoint

use airdrop_core::Outcome;
use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use tracing::info;

use crate::dto::{VerifyRequest, VerifyResponse};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Validate a post and pay the reward
///
/// 200 when paid, 400 for any gate rejection, 500 with the record id when
/// the record was created but the transfer failed.
pub async fn verify_post(
    State(state): State<AppState>,
    payload: Result<Json<VerifyRequest>, JsonRejection>,
) -> ApiResult<Json<VerifyResponse>> {
    let Json(req) =
        payload.map_err(|e| ApiError::BadRequest(format!("Invalid request body: {}", e.body_text())))?;

    let outcome = state
        .pipeline
        .submit(&req.wallet_address, &req.tweet_url)
        .await
        .map_err(|e| ApiError::internal("Internal server error", e))?;

    match outcome {
        Outcome::Rewarded {
            participant,
            tx_hash,
        } => {
            info!(participant_id = %participant.id, tx_hash = %tx_hash, "Submission rewarded");
            Ok(Json(VerifyResponse {
                success: true,
                message: "Post verified and reward sent successfully!".to_string(),
                tx_hash,
                user_id: participant.id,
            }))
        }
        Outcome::Rejected(rejection) => Err(ApiError::Rejected(rejection)),
        Outcome::TransferFailed { participant_id, .. } => {
            Err(ApiError::TransferFailed { participant_id })
        }
    }
}
