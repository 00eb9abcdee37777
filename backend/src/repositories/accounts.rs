//! Progress account repository for database operations
//!
//! Every function is generic over the executor so the same query runs
//! against the pool or inside an open transaction (`&mut *tx`).

use crate::repositories::achievements::AchievementRecord;
use crate::repositories::streaks::CategoryStreakRecord;
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use fitness_progression_shared::achievements::AchievementId;
use fitness_progression_shared::leaderboard::LeaderboardCandidate;
use fitness_progression_shared::ledger::{Account, ActivityCounts};
use fitness_progression_shared::models::{LeaderboardPeriod, ResetPeriod};
use fitness_progression_shared::streak::{CategoryStreaks, StreakCategory, StreakState};
use sqlx::PgExecutor;
use std::collections::BTreeMap;
use uuid::Uuid;

const ACCOUNT_COLUMNS: &str = r#"
    user_id, display_name, total_points, weekly_points, monthly_points, level,
    current_streak, longest_streak, last_active_date, last_workout_date,
    last_activity_at, workouts_completed, meals_logged, mental_health_checkins,
    created_at, updated_at
"#;

/// Account record from database
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AccountRecord {
    pub user_id: Uuid,
    pub display_name: Option<String>,
    pub total_points: i64,
    pub weekly_points: i64,
    pub monthly_points: i64,
    pub level: i16,
    pub current_streak: i32,
    pub longest_streak: i32,
    pub last_active_date: Option<NaiveDate>,
    pub last_workout_date: Option<NaiveDate>,
    pub last_activity_at: Option<DateTime<Utc>>,
    pub workouts_completed: i32,
    pub meals_logged: i32,
    pub mental_health_checkins: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AccountRecord {
    /// Build the domain account from this row plus its child rows
    ///
    /// Fails on achievement ids or streak categories the engine does not know.
    pub fn into_account(
        self,
        achievements: Vec<AchievementRecord>,
        streaks: Vec<CategoryStreakRecord>,
    ) -> Result<Account> {
        let mut held = BTreeMap::new();
        for record in achievements {
            let id = record
                .achievement_id
                .parse::<AchievementId>()
                .with_context(|| format!("Stored achievement for user {}", self.user_id))?;
            held.insert(id, record.unlocked_at);
        }

        let mut category_streaks = CategoryStreaks::default();
        for record in streaks {
            let category = StreakCategory::parse(&record.category).with_context(|| {
                format!("Unknown streak category '{}' for user {}", record.category, self.user_id)
            })?;
            *category_streaks.get_mut(category) = record.state();
        }

        Ok(Account {
            user_id: self.user_id,
            display_name: self.display_name,
            total_points: self.total_points,
            weekly_points: self.weekly_points,
            monthly_points: self.monthly_points,
            level: self.level.clamp(1, i16::from(u8::MAX)) as u8,
            streak: StreakState {
                current: to_count(self.current_streak),
                longest: to_count(self.longest_streak),
                last_active_date: self.last_active_date,
            },
            category_streaks,
            last_workout_date: self.last_workout_date,
            last_activity_at: self.last_activity_at,
            activity: ActivityCounts {
                workouts_completed: to_count(self.workouts_completed),
                meals_logged: to_count(self.meals_logged),
                mental_health_checkins: to_count(self.mental_health_checkins),
            },
            achievements: held,
        })
    }
}

pub(crate) fn to_count(value: i32) -> u32 {
    u32::try_from(value).unwrap_or(0)
}

pub(crate) fn to_db_count(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

/// Leaderboard row from database
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LeaderboardRow {
    pub user_id: Uuid,
    pub display_name: Option<String>,
    pub weekly_points: i64,
    pub monthly_points: i64,
    pub total_points: i64,
    pub level: i16,
    pub current_streak: i32,
    pub achievement_count: i64,
}

impl From<LeaderboardRow> for LeaderboardCandidate {
    fn from(row: LeaderboardRow) -> Self {
        LeaderboardCandidate {
            user_id: row.user_id,
            display_name: row.display_name,
            weekly_points: row.weekly_points,
            monthly_points: row.monthly_points,
            total_points: row.total_points,
            level: row.level.clamp(1, i16::from(u8::MAX)) as u8,
            current_streak: to_count(row.current_streak),
            achievement_count: u32::try_from(row.achievement_count).unwrap_or(u32::MAX),
        }
    }
}

/// Progress account repository
pub struct AccountRepository;

impl AccountRepository {
    /// Insert a zeroed account unless one exists. Returns true if created.
    pub async fn create_if_absent<'e, E: PgExecutor<'e>>(
        executor: E,
        user_id: Uuid,
        display_name: Option<&str>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO progress_accounts (user_id, display_name)
            VALUES ($1, $2)
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(display_name)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Get an account by user ID
    pub async fn find<'e, E: PgExecutor<'e>>(
        executor: E,
        user_id: Uuid,
    ) -> Result<Option<AccountRecord>> {
        let query = format!(
            "SELECT {} FROM progress_accounts WHERE user_id = $1",
            ACCOUNT_COLUMNS
        );
        let record = sqlx::query_as::<_, AccountRecord>(&query)
            .bind(user_id)
            .fetch_optional(executor)
            .await?;

        Ok(record)
    }

    /// Get an account and hold its row lock until the transaction ends
    pub async fn lock<'e, E: PgExecutor<'e>>(
        executor: E,
        user_id: Uuid,
    ) -> Result<Option<AccountRecord>> {
        let query = format!(
            "SELECT {} FROM progress_accounts WHERE user_id = $1 FOR UPDATE",
            ACCOUNT_COLUMNS
        );
        let record = sqlx::query_as::<_, AccountRecord>(&query)
            .bind(user_id)
            .fetch_optional(executor)
            .await?;

        Ok(record)
    }

    /// Write back every scalar field of `account`
    pub async fn save<'e, E: PgExecutor<'e>>(executor: E, account: &Account) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE progress_accounts
            SET total_points = $2,
                weekly_points = $3,
                monthly_points = $4,
                level = $5,
                current_streak = $6,
                longest_streak = $7,
                last_active_date = $8,
                last_workout_date = $9,
                last_activity_at = $10,
                workouts_completed = $11,
                meals_logged = $12,
                mental_health_checkins = $13,
                updated_at = NOW()
            WHERE user_id = $1
            "#,
        )
        .bind(account.user_id)
        .bind(account.total_points)
        .bind(account.weekly_points)
        .bind(account.monthly_points)
        .bind(i16::from(account.level))
        .bind(to_db_count(account.streak.current))
        .bind(to_db_count(account.streak.longest))
        .bind(account.streak.last_active_date)
        .bind(account.last_workout_date)
        .bind(account.last_activity_at)
        .bind(to_db_count(account.activity.workouts_completed))
        .bind(to_db_count(account.activity.meals_logged))
        .bind(to_db_count(account.activity.mental_health_checkins))
        .execute(executor)
        .await?;

        Ok(())
    }

    /// All account ids, oldest first
    pub async fn list_ids<'e, E: PgExecutor<'e>>(executor: E) -> Result<Vec<Uuid>> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            "SELECT user_id FROM progress_accounts ORDER BY created_at, user_id",
        )
        .fetch_all(executor)
        .await?;

        Ok(ids)
    }

    /// Zero one account's counter for `period`. Returns false if the account is gone.
    pub async fn reset_period<'e, E: PgExecutor<'e>>(
        executor: E,
        user_id: Uuid,
        period: ResetPeriod,
    ) -> Result<bool> {
        let sql = match period {
            ResetPeriod::Weekly => {
                "UPDATE progress_accounts SET weekly_points = 0, updated_at = NOW() WHERE user_id = $1"
            }
            ResetPeriod::Monthly => {
                "UPDATE progress_accounts SET monthly_points = 0, updated_at = NOW() WHERE user_id = $1"
            }
        };
        let result = sqlx::query(sql).bind(user_id).execute(executor).await?;

        Ok(result.rows_affected() == 1)
    }

    /// Top accounts for `period`, ties broken by user id
    pub async fn leaderboard<'e, E: PgExecutor<'e>>(
        executor: E,
        period: LeaderboardPeriod,
        limit: i64,
    ) -> Result<Vec<LeaderboardRow>> {
        let sort_column = match period {
            LeaderboardPeriod::Weekly => "weekly_points",
            LeaderboardPeriod::Monthly => "monthly_points",
            LeaderboardPeriod::AllTime => "total_points",
        };
        let query = format!(
            r#"
            SELECT a.user_id, a.display_name, a.weekly_points, a.monthly_points,
                   a.total_points, a.level, a.current_streak,
                   (SELECT COUNT(*) FROM user_achievements ua
                     WHERE ua.user_id = a.user_id) AS achievement_count
            FROM progress_accounts a
            ORDER BY a.{} DESC, a.user_id ASC
            LIMIT $1
            "#,
            sort_column
        );

        let rows = sqlx::query_as::<_, LeaderboardRow>(&query)
            .bind(limit)
            .fetch_all(executor)
            .await?;

        Ok(rows)
    }

    /// 1-based all-time rank using the leaderboard's ordering
    pub async fn all_time_position<'e, E: PgExecutor<'e>>(
        executor: E,
        user_id: Uuid,
        total_points: i64,
    ) -> Result<i64> {
        let ahead = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM progress_accounts
            WHERE total_points > $1 OR (total_points = $1 AND user_id < $2)
            "#,
        )
        .bind(total_points)
        .bind(user_id)
        .fetch_one(executor)
        .await?;

        Ok(ahead + 1)
    }
}
