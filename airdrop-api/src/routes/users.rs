//! Participant endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use airdrop_core::Resolution;

use crate::dto::{ParticipantResponse, StatsResponse, UpdateStatusRequest};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// All participants, newest first
pub async fn list_users(State(state): State<AppState>) -> ApiResult<Json<Vec<ParticipantResponse>>> {
    let participants = state
        .participants
        .list_participants()
        .await
        .map_err(|e| ApiError::internal("Error fetching users", e))?;

    Ok(Json(
        participants.into_iter().map(ParticipantResponse::from).collect(),
    ))
}

/// Participant counts per status
pub async fn user_stats(State(state): State<AppState>) -> ApiResult<Json<StatsResponse>> {
    let counts = state
        .participants
        .count_by_status()
        .await
        .map_err(|e| ApiError::internal("Error fetching users", e))?;

    Ok(Json(StatsResponse::from(counts)))
}

/// Resolve a participant awaiting manual review
pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateStatusRequest>,
) -> ApiResult<Json<ParticipantResponse>> {
    let resolution = parse_resolution(&req)?;
    let participant = state.pipeline.resolve(&id, resolution).await?;

    Ok(Json(ParticipantResponse::from(participant)))
}

fn parse_resolution(req: &UpdateStatusRequest) -> ApiResult<Resolution> {
    match req.status.as_str() {
        "rewarded" => {
            let tx_hash = req
                .tx_hash
                .as_deref()
                .map(str::trim)
                .filter(|h| !h.is_empty())
                .ok_or_else(|| {
                    ApiError::BadRequest("txHash is required when status is rewarded".to_string())
                })?;
            Ok(Resolution::Rewarded {
                tx_hash: tx_hash.to_string(),
            })
        }
        "rejected" => Ok(Resolution::Rejected),
        other => Err(ApiError::BadRequest(format!(
            "Unsupported status: {} (expected rewarded or rejected)",
            other
        ))),
    }
}
