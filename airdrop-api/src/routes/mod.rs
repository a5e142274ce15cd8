//! API route handlers

pub mod campaign;
pub mod health;
pub mod share;
pub mod users;
pub mod verify;

use axum::{routing::get, routing::post, Router};

use crate::state::AppState;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health
        .route("/health", get(health::health_check))
        // Submissions
        .route("/verify", post(verify::verify_post))
        .route("/share", get(share::share_text))
        // Campaign
        .route("/campaign", get(campaign::get_campaign))
        .route("/campaign/active", post(campaign::set_active))
        // Participants
        .route("/users", get(users::list_users))
        .route("/users/stats", get(users::user_stats))
        .route("/users/:id/status", post(users::update_status))
        .with_state(state)
}
