//! API Error types

use airdrop_core::{ContentFailure, CoreError, Rejection};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

const CONTENT_WARNING: &str =
    "If you believe this is a mistake, an administrator can review your post manually.";
const DUPLICATE_DETAILS: &str = "Only one participation is allowed per wallet, post or X user";
const GENERIC_ERROR: &str = "Internal server error";

/// API error types
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// A submission turned away by one of the pipeline gates
    #[error("Submission rejected: {}", .0.message())]
    Rejected(Rejection),

    /// Recorded but not paid
    #[error("Reward transfer failed for participant {participant_id}")]
    TransferFailed { participant_id: String },

    /// Message is client-facing; details were logged when it was built
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl ApiError {
    /// Log `source` server-side and hide it behind `public` for the client
    pub fn internal(public: &str, source: impl std::fmt::Display) -> Self {
        error!(error = %source, "{}", public);
        ApiError::InternalError(public.to_string())
    }
}

impl From<CoreError> for ApiError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::NotFound(msg) => ApiError::NotFound(msg),
            CoreError::InvalidTransition { .. } | CoreError::Conflict(_) => {
                ApiError::Conflict(e.to_string())
            }
            CoreError::CampaignClosed => ApiError::Conflict(Rejection::CampaignClosed.message()),
            CoreError::Validation(msg) => ApiError::BadRequest(msg),
            other => ApiError::internal(GENERIC_ERROR, other),
        }
    }
}

/// Error response body
///
/// Optional fields appear only for the rejection kinds that carry them.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conflict_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

fn rejection_body(rejection: &Rejection) -> ErrorResponse {
    let mut body = ErrorResponse {
        error: rejection.message(),
        code: rejection.code().to_string(),
        ..Default::default()
    };

    match rejection {
        Rejection::ContentRejected { failure, handle } => {
            body.details = Some(match failure {
                ContentFailure::Requirements(check) => {
                    format!("Missing: {}", check.missing().join(", "))
                }
                ContentFailure::FetchStatus(_) | ContentFailure::FetchTransport(_) => {
                    "The post could not be loaded; make sure it exists and is public".to_string()
                }
            });
            body.username = handle.clone();
            body.warning = Some(CONTENT_WARNING.to_string());
        }
        Rejection::Duplicate { conflict, handle } => {
            body.details = Some(DUPLICATE_DETAILS.to_string());
            body.conflict_type = Some(conflict.as_str().to_string());
            body.username = handle.clone();
        }
        _ => {}
    }

    body
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                ErrorResponse {
                    error: msg,
                    code: "NOT_FOUND".to_string(),
                    ..Default::default()
                },
            ),
            ApiError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    error: msg,
                    code: "BAD_REQUEST".to_string(),
                    ..Default::default()
                },
            ),
            ApiError::Conflict(msg) => (
                StatusCode::CONFLICT,
                ErrorResponse {
                    error: msg,
                    code: "CONFLICT".to_string(),
                    ..Default::default()
                },
            ),
            ApiError::Rejected(rejection) => (StatusCode::BAD_REQUEST, rejection_body(&rejection)),
            ApiError::TransferFailed { participant_id } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse {
                    error: "Post verified but the reward transfer failed. Please contact support."
                        .to_string(),
                    code: "TRANSFER_FAILED".to_string(),
                    user_id: Some(participant_id),
                    ..Default::default()
                },
            ),
            ApiError::InternalError(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse {
                    error: msg,
                    code: "INTERNAL_ERROR".to_string(),
                    ..Default::default()
                },
            ),
        };

        (status, Json(body)).into_response()
    }
}

/// API result type
pub type ApiResult<T> = Result<T, ApiError>;
