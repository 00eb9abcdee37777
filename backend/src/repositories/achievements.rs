//! Unlocked achievements repository

use anyhow::Result;
use chrono::{DateTime, Utc};
use fitness_progression_shared::achievements::AchievementId;
use sqlx::PgExecutor;
use uuid::Uuid;

/// Unlocked achievement record from database
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AchievementRecord {
    pub achievement_id: String,
    pub unlocked_at: DateTime<Utc>,
}

/// Unlocked achievements repository
pub struct AchievementRepository;

impl AchievementRepository {
    /// All achievements held by a user, oldest unlock first
    pub async fn list<'e, E: PgExecutor<'e>>(
        executor: E,
        user_id: Uuid,
    ) -> Result<Vec<AchievementRecord>> {
        let records = sqlx::query_as::<_, AchievementRecord>(
            r#"
            SELECT achievement_id, unlocked_at
            FROM user_achievements
            WHERE user_id = $1
            ORDER BY unlocked_at, achievement_id
            "#,
        )
        .bind(user_id)
        .fetch_all(executor)
        .await?;

        Ok(records)
    }

    /// Record an unlock. Returns false if the user already held it.
    pub async fn insert<'e, E: PgExecutor<'e>>(
        executor: E,
        user_id: Uuid,
        id: AchievementId,
        unlocked_at: DateTime<Utc>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO user_achievements (user_id, achievement_id, unlocked_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, achievement_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(id.to_string())
        .bind(unlocked_at)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
