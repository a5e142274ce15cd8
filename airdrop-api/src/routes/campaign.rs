//! Campaign endpoints

use axum::{extract::State, Json};
use tracing::info;

use crate::dto::{CampaignResponse, SetActiveRequest};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Current campaign state, created with defaults on first access
pub async fn get_campaign(State(state): State<AppState>) -> ApiResult<Json<CampaignResponse>> {
    let campaign = state
        .pipeline
        .campaign()
        .await
        .map_err(|e| ApiError::internal("Error fetching campaign information", e))?;

    Ok(Json(CampaignResponse::from(&campaign)))
}

/// Open or close the campaign
pub async fn set_active(
    State(state): State<AppState>,
    Json(req): Json<SetActiveRequest>,
) -> ApiResult<Json<CampaignResponse>> {
    state.pipeline.campaign().await?;
    let campaign = state.campaigns.set_active(req.is_active).await?;

    info!(is_active = campaign.is_active, "Campaign active flag updated");
    Ok(Json(CampaignResponse::from(&campaign)))
}
