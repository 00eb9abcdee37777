//! Leaderboard service

use crate::config::ProgressionConfig;
use crate::error::ApiError;
use crate::repositories::AccountRepository;
use fitness_progression_shared::leaderboard::{rank, LeaderboardCandidate};
use fitness_progression_shared::models::LeaderboardPeriod;
use fitness_progression_shared::types::{LeaderboardQuery, LeaderboardResponse};
use fitness_progression_shared::validation::validate_leaderboard_limit;
use sqlx::PgPool;

pub struct LeaderboardService;

impl LeaderboardService {
    /// Top accounts for the requested period
    ///
    /// The database returns rows already ordered with ties broken by user id;
    /// ranking them again is stable, so that order survives.
    pub async fn rank(
        pool: &PgPool,
        config: &ProgressionConfig,
        query: LeaderboardQuery,
    ) -> Result<LeaderboardResponse, ApiError> {
        let (period, limit) = resolve_query(config, &query)?;

        let candidates: Vec<LeaderboardCandidate> =
            AccountRepository::leaderboard(pool, period, i64::from(limit))
                .await
                .map_err(ApiError::Internal)?
                .into_iter()
                .map(LeaderboardCandidate::from)
                .collect();

        Ok(LeaderboardResponse {
            period,
            entries: rank(candidates, period, limit as usize),
        })
    }
}

fn resolve_query(
    config: &ProgressionConfig,
    query: &LeaderboardQuery,
) -> Result<(LeaderboardPeriod, u32), ApiError> {
    let period = match query.period.as_deref() {
        Some(raw) => raw.parse::<LeaderboardPeriod>()?,
        None => LeaderboardPeriod::default(),
    };

    let limit = query.limit.unwrap_or(config.leaderboard_default_limit);
    validate_leaderboard_limit(limit, config.leaderboard_max_limit)
        .map_err(|m| ApiError::validation_field("limit", m))?;

    Ok((period, limit))
}
