//! Category sub-streak repository

use crate::repositories::accounts::{to_count, to_db_count};
use anyhow::Result;
use chrono::NaiveDate;
use fitness_progression_shared::streak::{StreakCategory, StreakState};
use sqlx::PgExecutor;
use uuid::Uuid;

/// Category streak record from database
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CategoryStreakRecord {
    pub category: String,
    pub current_streak: i32,
    pub longest_streak: i32,
    pub last_active_date: Option<NaiveDate>,
}

impl CategoryStreakRecord {
    pub fn state(&self) -> StreakState {
        StreakState {
            current: to_count(self.current_streak),
            longest: to_count(self.longest_streak),
            last_active_date: self.last_active_date,
        }
    }
}

/// Category sub-streak repository
pub struct StreakRepository;

impl StreakRepository {
    pub async fn list<'e, E: PgExecutor<'e>>(
        executor: E,
        user_id: Uuid,
    ) -> Result<Vec<CategoryStreakRecord>> {
        let records = sqlx::query_as::<_, CategoryStreakRecord>(
            r#"
            SELECT category, current_streak, longest_streak, last_active_date
            FROM category_streaks
            WHERE user_id = $1
            ORDER BY category
            "#,
        )
        .bind(user_id)
        .fetch_all(executor)
        .await?;

        Ok(records)
    }

    /// Insert or overwrite one sub-streak
    pub async fn upsert<'e, E: PgExecutor<'e>>(
        executor: E,
        user_id: Uuid,
        category: StreakCategory,
        state: &StreakState,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO category_streaks (user_id, category, current_streak, longest_streak, last_active_date)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id, category) DO UPDATE
            SET current_streak = EXCLUDED.current_streak,
                longest_streak = EXCLUDED.longest_streak,
                last_active_date = EXCLUDED.last_active_date
            "#,
        )
        .bind(user_id)
        .bind(category.as_str())
        .bind(to_db_count(state.current))
        .bind(to_db_count(state.longest))
        .bind(state.last_active_date)
        .execute(executor)
        .await?;

        Ok(())
    }
}
