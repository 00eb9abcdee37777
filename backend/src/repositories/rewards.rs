//! Reward catalog and redemption repositories

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use fitness_progression_shared::rewards::{Redemption, Reward, RewardCategory};
use sqlx::PgExecutor;
use uuid::Uuid;

// ============================================================================
// Rewards
// ============================================================================

const REWARD_COLUMNS: &str = r#"
    id, name, description, category, points_cost, availability, is_active,
    limit_per_user, validity_days, created_at, updated_at
"#;

/// Reward record from database
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RewardRecord {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub points_cost: i64,
    pub availability: Option<i32>,
    pub is_active: bool,
    pub limit_per_user: Option<i32>,
    pub validity_days: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RewardRecord {
    pub fn into_reward(self) -> Result<Reward> {
        let category = self
            .category
            .parse::<RewardCategory>()
            .with_context(|| format!("Stored category of reward {}", self.id))?;

        Ok(Reward {
            id: self.id,
            name: self.name,
            description: self.description,
            category,
            points_cost: self.points_cost,
            availability: self.availability,
            is_active: self.is_active,
            limit_per_user: self.limit_per_user,
            validity_days: self.validity_days,
        })
    }
}

/// Input for creating a reward
#[derive(Debug, Clone)]
pub struct CreateReward {
    pub name: String,
    pub description: Option<String>,
    pub category: RewardCategory,
    pub points_cost: i64,
    pub availability: Option<i32>,
    pub is_active: bool,
    pub limit_per_user: Option<i32>,
    pub validity_days: Option<i32>,
}

/// Reward catalog repository
pub struct RewardRepository;

impl RewardRepository {
    pub async fn create<'e, E: PgExecutor<'e>>(
        executor: E,
        input: CreateReward,
    ) -> Result<RewardRecord> {
        let query = format!(
            r#"
            INSERT INTO rewards (
                id, name, description, category, points_cost, availability,
                is_active, limit_per_user, validity_days
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {}
            "#,
            REWARD_COLUMNS
        );
        let record = sqlx::query_as::<_, RewardRecord>(&query)
            .bind(Uuid::new_v4())
            .bind(&input.name)
            .bind(&input.description)
            .bind(input.category.as_str())
            .bind(input.points_cost)
            .bind(input.availability)
            .bind(input.is_active)
            .bind(input.limit_per_user)
            .bind(input.validity_days)
            .fetch_one(executor)
            .await?;

        Ok(record)
    }

    /// Get a reward and hold its row lock until the transaction ends
    pub async fn lock<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
    ) -> Result<Option<RewardRecord>> {
        let query = format!("SELECT {} FROM rewards WHERE id = $1 FOR UPDATE", REWARD_COLUMNS);
        let record = sqlx::query_as::<_, RewardRecord>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await?;

        Ok(record)
    }

    /// Active rewards, cheapest first
    pub async fn list_active<'e, E: PgExecutor<'e>>(executor: E) -> Result<Vec<RewardRecord>> {
        let query = format!(
            "SELECT {} FROM rewards WHERE is_active ORDER BY points_cost, name",
            REWARD_COLUMNS
        );
        let records = sqlx::query_as::<_, RewardRecord>(&query)
            .fetch_all(executor)
            .await?;

        Ok(records)
    }

    /// Take one unit of stock; unlimited rewards are left alone
    pub async fn decrement_availability<'e, E: PgExecutor<'e>>(executor: E, id: Uuid) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE rewards
            SET availability = GREATEST(availability - 1, 0), updated_at = NOW()
            WHERE id = $1 AND availability IS NOT NULL
            "#,
        )
        .bind(id)
        .execute(executor)
        .await?;

        Ok(())
    }
}

// ============================================================================
// Redemptions
// ============================================================================

/// Redemption record from database
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RedemptionRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub reward_id: Uuid,
    pub code: String,
    pub points_spent: i64,
    pub redeemed_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub used: bool,
    pub used_at: Option<DateTime<Utc>>,
}

impl From<RedemptionRecord> for Redemption {
    fn from(record: RedemptionRecord) -> Self {
        Redemption {
            id: record.id,
            user_id: record.user_id,
            reward_id: record.reward_id,
            code: record.code,
            points_spent: record.points_spent,
            redeemed_at: record.redeemed_at,
            expires_at: record.expires_at,
            used: record.used,
            used_at: record.used_at,
        }
    }
}

/// Redemption joined with its reward's name
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RedemptionWithReward {
    #[sqlx(flatten)]
    pub redemption: RedemptionRecord,
    pub reward_name: String,
}

/// Per-reward redemption summary for one user
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RedemptionSummary {
    pub reward_id: Uuid,
    pub times_redeemed: i64,
    pub has_active_redemption: bool,
}

/// Redemption repository
pub struct RedemptionRepository;

impl RedemptionRepository {
    pub async fn create<'e, E: PgExecutor<'e>>(
        executor: E,
        redemption: &Redemption,
    ) -> Result<RedemptionRecord> {
        let record = sqlx::query_as::<_, RedemptionRecord>(
            r#"
            INSERT INTO reward_redemptions (
                id, user_id, reward_id, code, points_spent, redeemed_at, expires_at, used, used_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id, user_id, reward_id, code, points_spent, redeemed_at,
                      expires_at, used, used_at
            "#,
        )
        .bind(redemption.id)
        .bind(redemption.user_id)
        .bind(redemption.reward_id)
        .bind(&redemption.code)
        .bind(redemption.points_spent)
        .bind(redemption.redeemed_at)
        .bind(redemption.expires_at)
        .bind(redemption.used)
        .bind(redemption.used_at)
        .fetch_one(executor)
        .await?;

        Ok(record)
    }

    /// Prior redemptions of one reward by one user
    pub async fn count_for_user_reward<'e, E: PgExecutor<'e>>(
        executor: E,
        user_id: Uuid,
        reward_id: Uuid,
    ) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM reward_redemptions WHERE user_id = $1 AND reward_id = $2",
        )
        .bind(user_id)
        .bind(reward_id)
        .fetch_one(executor)
        .await?;

        Ok(count)
    }

    /// Redemption counts and outstanding flags per reward for one user
    pub async fn summaries_for_user<'e, E: PgExecutor<'e>>(
        executor: E,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<RedemptionSummary>> {
        let records = sqlx::query_as::<_, RedemptionSummary>(
            r#"
            SELECT reward_id,
                   COUNT(*) AS times_redeemed,
                   COALESCE(BOOL_OR(NOT used AND (expires_at IS NULL OR expires_at > $2)), FALSE)
                       AS has_active_redemption
            FROM reward_redemptions
            WHERE user_id = $1
            GROUP BY reward_id
            "#,
        )
        .bind(user_id)
        .bind(now)
        .fetch_all(executor)
        .await?;

        Ok(records)
    }

    /// A user's redemptions, newest first
    pub async fn list_for_user<'e, E: PgExecutor<'e>>(
        executor: E,
        user_id: Uuid,
    ) -> Result<Vec<RedemptionWithReward>> {
        let records = sqlx::query_as::<_, RedemptionWithReward>(
            r#"
            SELECT rr.id, rr.user_id, rr.reward_id, rr.code, rr.points_spent,
                   rr.redeemed_at, rr.expires_at, rr.used, rr.used_at,
                   r.name AS reward_name
            FROM reward_redemptions rr
            JOIN rewards r ON r.id = rr.reward_id
            WHERE rr.user_id = $1
            ORDER BY rr.redeemed_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(executor)
        .await?;

        Ok(records)
    }

    /// Get a user's redemption and lock it until the transaction ends
    pub async fn lock_for_user<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<RedemptionRecord>> {
        let record = sqlx::query_as::<_, RedemptionRecord>(
            r#"
            SELECT id, user_id, reward_id, code, points_spent, redeemed_at,
                   expires_at, used, used_at
            FROM reward_redemptions
            WHERE id = $1 AND user_id = $2
            FOR UPDATE
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(executor)
        .await?;

        Ok(record)
    }

    pub async fn mark_used<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
        used_at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query("UPDATE reward_redemptions SET used = TRUE, used_at = $2 WHERE id = $1")
            .bind(id)
            .bind(used_at)
            .execute(executor)
            .await?;

        Ok(())
    }
}
