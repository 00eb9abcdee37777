//! Leaderboard API routes

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::services::LeaderboardService;
use crate::state::AppState;
use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use fitness_progression_shared::types::{LeaderboardQuery, LeaderboardResponse};

/// Create leaderboard routes
pub fn leaderboard_routes() -> Router<AppState> {
    Router::new().route("/", get(get_leaderboard))
}

/// GET /api/v1/leaderboard?period=weekly&limit=10
async fn get_leaderboard(
    State(state): State<AppState>,
    _auth: AuthUser,
    Query(query): Query<LeaderboardQuery>,
) -> Result<Json<LeaderboardResponse>, ApiError> {
    let board =
        LeaderboardService::rank(state.db(), &state.config().progression, query).await?;
    Ok(Json(board))
}
