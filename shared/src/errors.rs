//! Error types for the progression engine

use thiserror::Error;
use uuid::Uuid;

/// Business errors raised by progression operations
///
/// Every variant is recoverable: callers surface the message to the user
/// and decide whether to retry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProgressionError {
    #[error("No progress account exists for user {0}")]
    AccountNotInitialized(Uuid),

    #[error("Reward not found: {0}")]
    RewardNotFound(Uuid),

    #[error("Redemption not found: {0}")]
    RedemptionNotFound(Uuid),

    #[error("Insufficient points: {required} required, {available} available")]
    InsufficientPoints { required: i64, available: i64 },

    #[error("Redemption limit of {limit} per user reached for this reward")]
    RedemptionLimitReached { limit: i32 },

    #[error("Redemption {0} has already been used")]
    RedemptionAlreadyUsed(Uuid),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl ProgressionError {
    /// Stable machine-readable code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            ProgressionError::AccountNotInitialized(_) => "ACCOUNT_NOT_INITIALIZED",
            ProgressionError::RewardNotFound(_) => "REWARD_NOT_FOUND",
            ProgressionError::RedemptionNotFound(_) => "REDEMPTION_NOT_FOUND",
            ProgressionError::InsufficientPoints { .. } => "INSUFFICIENT_POINTS",
            ProgressionError::RedemptionLimitReached { .. } => "REDEMPTION_LIMIT_REACHED",
            ProgressionError::RedemptionAlreadyUsed(_) => "REDEMPTION_ALREADY_USED",
            ProgressionError::InvalidInput(_) => "VALIDATION_ERROR",
        }
    }
}
