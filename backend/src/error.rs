//! Application error handling
//!
//! Unified error type for the API, converting domain and internal errors to
//! HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use fitness_progression_shared::types::{ErrorDetail, ErrorResponse};
use fitness_progression_shared::ProgressionError;
use thiserror::Error;
use tracing::error;

/// API error type that can be converted to HTTP responses
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error(transparent)]
    Progression(#[from] ProgressionError),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),

    #[error("Database error")]
    Database(#[from] sqlx::Error),
}

impl ApiError {
    pub fn validation_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::Validation {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    fn progression_status(err: &ProgressionError) -> StatusCode {
        match err {
            ProgressionError::AccountNotInitialized(_) => StatusCode::CONFLICT,
            ProgressionError::RewardNotFound(_) | ProgressionError::RedemptionNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            ProgressionError::InsufficientPoints { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ProgressionError::RedemptionLimitReached { .. }
            | ProgressionError::RedemptionAlreadyUsed(_) => StatusCode::CONFLICT,
            ProgressionError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let (field, message) = fitness_progression_shared::validation::first_error_message(&errors);
        ApiError::Validation {
            message,
            field: (!field.is_empty()).then_some(field),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, field) = match &self {
            ApiError::Validation { message, field } => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                message.clone(),
                field.clone(),
            ),
            ApiError::Unauthorized(msg) => {
                (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone(), None)
            }
            ApiError::Progression(err) => {
                (Self::progression_status(err), err.code(), err.to_string(), None)
            }
            ApiError::Internal(err) => {
                error!("Internal error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
            ApiError::Database(err) => {
                error!("Database error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                    None,
                )
            }
        };

        let body = Json(ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                field,
            },
        });

        (status, body).into_response()
    }
}
