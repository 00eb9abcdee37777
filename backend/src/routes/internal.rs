//! Internal API routes
//!
//! Called by the activity modules (workouts, meals, check-ins) and by
//! operations tooling. Every handler requires the service token.

use crate::auth::ServiceCaller;
use crate::error::ApiError;
use crate::services::{LedgerService, RewardService};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use fitness_progression_shared::models::ResetPeriod;
use fitness_progression_shared::rewards::Reward;
use fitness_progression_shared::types::{
    AdvanceStreakRequest, AdvanceStreakResponse, AwardPointsRequest, AwardPointsResponse,
    CreateRewardRequest, InitializeAccountRequest, PeriodResetResponse, ProgressStatusResponse,
};
use fitness_progression_shared::ProgressionError;
use uuid::Uuid;

/// Create internal routes
pub fn internal_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/accounts/:user_id",
            post(initialize_account).get(get_account),
        )
        .route("/accounts/:user_id/points", post(award_points))
        .route("/accounts/:user_id/streak", post(advance_streak))
        .route("/periods/:period/reset", post(reset_period))
        .route("/rewards", post(create_reward))
}

/// POST /internal/accounts/:user_id - Create the account if absent
///
/// 201 when created, 200 when it already existed.
async fn initialize_account(
    State(state): State<AppState>,
    _caller: ServiceCaller,
    Path(user_id): Path<Uuid>,
    body: Option<Json<InitializeAccountRequest>>,
) -> Result<(StatusCode, Json<ProgressStatusResponse>), ApiError> {
    let request = body.map(|Json(req)| req).unwrap_or_default();
    let (created, status) = LedgerService::initialize(state.db(), user_id, request).await?;
    let code = if created { StatusCode::CREATED } else { StatusCode::OK };
    Ok((code, Json(status)))
}

/// GET /internal/accounts/:user_id
async fn get_account(
    State(state): State<AppState>,
    _caller: ServiceCaller,
    Path(user_id): Path<Uuid>,
) -> Result<Json<ProgressStatusResponse>, ApiError> {
    let status = LedgerService::status(state.db(), user_id)
        .await?
        .ok_or(ProgressionError::AccountNotInitialized(user_id))?;
    Ok(Json(status))
}

/// POST /internal/accounts/:user_id/points
async fn award_points(
    State(state): State<AppState>,
    _caller: ServiceCaller,
    Path(user_id): Path<Uuid>,
    Json(req): Json<AwardPointsRequest>,
) -> Result<Json<AwardPointsResponse>, ApiError> {
    let awarded = LedgerService::award(state.db(), user_id, req).await?;
    Ok(Json(awarded))
}

/// POST /internal/accounts/:user_id/streak
async fn advance_streak(
    State(state): State<AppState>,
    _caller: ServiceCaller,
    Path(user_id): Path<Uuid>,
    Json(req): Json<AdvanceStreakRequest>,
) -> Result<Json<AdvanceStreakResponse>, ApiError> {
    let advanced = LedgerService::advance_streak(state.db(), user_id, req).await?;
    Ok(Json(advanced))
}

/// POST /internal/periods/:period/reset - Zero weekly or monthly points now
async fn reset_period(
    State(state): State<AppState>,
    _caller: ServiceCaller,
    Path(period): Path<String>,
) -> Result<Json<PeriodResetResponse>, ApiError> {
    let period: ResetPeriod = period.parse()?;
    let reset = LedgerService::reset_period(state.db(), period).await?;
    Ok(Json(reset))
}

/// POST /internal/rewards - Add a reward to the catalog
async fn create_reward(
    State(state): State<AppState>,
    _caller: ServiceCaller,
    Json(req): Json<CreateRewardRequest>,
) -> Result<(StatusCode, Json<Reward>), ApiError> {
    let reward = RewardService::create_reward(state.db(), req).await?;
    Ok((StatusCode::CREATED, Json(reward)))
}
