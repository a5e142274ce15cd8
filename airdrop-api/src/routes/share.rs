//! Share text endpoint

use airdrop_core::{is_valid_address, Rejection};
use axum::{
    extract::{Query, State},
    Json,
};

use crate::dto::{ShareQuery, ShareResponse};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Promotional post text for a wallet, with a pre-filled compose link
pub async fn share_text(
    State(state): State<AppState>,
    Query(query): Query<ShareQuery>,
) -> ApiResult<Json<ShareResponse>> {
    let wallet = query.wallet_address.as_deref().map(str::trim).unwrap_or_default();
    if wallet.is_empty() {
        return Err(ApiError::BadRequest("Wallet address is required".to_string()));
    }
    if !is_valid_address(wallet) {
        return Err(ApiError::Rejected(Rejection::InvalidWallet));
    }

    Ok(Json(ShareResponse::from(state.share.share_post(wallet))))
}
