//! Progress API routes for the signed-in user

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::services::LedgerService;
use crate::state::AppState;
use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use fitness_progression_shared::types::{
    AchievementsResponse, PaginatedResponse, Pagination, PointsTransactionView,
    ProgressStatusResponse,
};
use fitness_progression_shared::ProgressionError;

/// Create progress routes
pub fn progress_routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(get_my_progress))
        .route("/me/achievements", get(get_my_achievements))
        .route("/me/history", get(get_my_history))
}

/// GET /api/v1/progress/me - Points, level, streaks and position
async fn get_my_progress(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ProgressStatusResponse>, ApiError> {
    let status = LedgerService::status(state.db(), auth.user_id)
        .await?
        .ok_or(ProgressionError::AccountNotInitialized(auth.user_id))?;
    Ok(Json(status))
}

/// GET /api/v1/progress/me/achievements - Unlocked and locked achievements
async fn get_my_achievements(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<AchievementsResponse>, ApiError> {
    let achievements = LedgerService::achievements(state.db(), auth.user_id).await?;
    Ok(Json(achievements))
}

/// GET /api/v1/progress/me/history - Points history, newest first
async fn get_my_history(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(pagination): Query<Pagination>,
) -> Result<Json<PaginatedResponse<PointsTransactionView>>, ApiError> {
    let history = LedgerService::history(state.db(), auth.user_id, &pagination).await?;
    Ok(Json(history))
}
