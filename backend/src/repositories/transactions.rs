//! Points transaction history repository

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::PgExecutor;
use uuid::Uuid;

/// Points transaction record from database
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TransactionRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount: i64,
    pub reason: String,
    pub category: Option<String>,
    pub event_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Input for appending a transaction
#[derive(Debug, Clone)]
pub struct CreateTransaction {
    pub user_id: Uuid,
    pub amount: i64,
    pub reason: String,
    pub category: Option<String>,
    pub event_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Points transaction repository
pub struct TransactionRepository;

impl TransactionRepository {
    /// Append a transaction
    pub async fn insert<'e, E: PgExecutor<'e>>(
        executor: E,
        input: CreateTransaction,
    ) -> Result<TransactionRecord> {
        let record = sqlx::query_as::<_, TransactionRecord>(
            r#"
            INSERT INTO points_transactions (id, user_id, amount, reason, category, event_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, user_id, amount, reason, category, event_id, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(input.user_id)
        .bind(input.amount)
        .bind(&input.reason)
        .bind(&input.category)
        .bind(&input.event_id)
        .bind(input.created_at)
        .fetch_one(executor)
        .await?;

        Ok(record)
    }

    /// Whether an award with this idempotency key was already applied
    pub async fn event_exists<'e, E: PgExecutor<'e>>(
        executor: E,
        user_id: Uuid,
        event_id: &str,
    ) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM points_transactions WHERE user_id = $1 AND event_id = $2)",
        )
        .bind(user_id)
        .bind(event_id)
        .fetch_one(executor)
        .await?;

        Ok(exists)
    }

    /// Page of a user's history, newest first
    pub async fn list<'e, E: PgExecutor<'e>>(
        executor: E,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<TransactionRecord>> {
        let records = sqlx::query_as::<_, TransactionRecord>(
            r#"
            SELECT id, user_id, amount, reason, category, event_id, created_at
            FROM points_transactions
            WHERE user_id = $1
            ORDER BY created_at DESC, id
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(executor)
        .await?;

        Ok(records)
    }

    pub async fn count<'e, E: PgExecutor<'e>>(executor: E, user_id: Uuid) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM points_transactions WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(executor)
        .await?;

        Ok(count)
    }
}
