//! Reward catalog and redemption API routes

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::services::RewardService;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use fitness_progression_shared::rewards::Redemption;
use fitness_progression_shared::types::{
    RedeemResponse, RedemptionView, RewardView, RewardsQuery,
};
use uuid::Uuid;

/// Create reward routes
pub fn reward_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_rewards))
        .route("/:reward_id/redeem", post(redeem_reward))
        .route("/redemptions", get(list_redemptions))
        .route("/redemptions/:redemption_id/use", post(use_redemption))
}

/// GET /api/v1/rewards - Rewards the user can redeem (`?all=true` for the full catalog)
async fn list_rewards(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<RewardsQuery>,
) -> Result<Json<Vec<RewardView>>, ApiError> {
    let rewards = RewardService::list_available(state.db(), auth.user_id, query).await?;
    Ok(Json(rewards))
}

/// POST /api/v1/rewards/:reward_id/redeem
async fn redeem_reward(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(reward_id): Path<Uuid>,
) -> Result<(StatusCode, Json<RedeemResponse>), ApiError> {
    let redeemed = RewardService::redeem(state.db(), auth.user_id, reward_id).await?;
    Ok((StatusCode::CREATED, Json(redeemed)))
}

/// GET /api/v1/rewards/redemptions
async fn list_redemptions(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<RedemptionView>>, ApiError> {
    let redemptions = RewardService::list_redemptions(state.db(), auth.user_id).await?;
    Ok(Json(redemptions))
}

/// POST /api/v1/rewards/redemptions/:redemption_id/use
async fn use_redemption(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(redemption_id): Path<Uuid>,
) -> Result<Json<Redemption>, ApiError> {
    let redemption = RewardService::mark_used(state.db(), auth.user_id, redemption_id).await?;
    Ok(Json(redemption))
}
