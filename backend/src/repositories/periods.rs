//! Period reset bookkeeping
//!
//! One row per period holds the start of the last window whose reset was
//! claimed. Claiming is a conditional upsert, so when several instances run
//! the scheduler only one of them performs a given reset.

use anyhow::Result;
use chrono::{DateTime, Utc};
use fitness_progression_shared::models::ResetPeriod;
use sqlx::PgExecutor;

pub struct PeriodRepository;

impl PeriodRepository {
    /// Window start of the last recorded reset, if any
    pub async fn last_window<'e, E: PgExecutor<'e>>(
        executor: E,
        period: ResetPeriod,
    ) -> Result<Option<DateTime<Utc>>> {
        let window = sqlx::query_scalar::<_, DateTime<Utc>>(
            "SELECT window_start FROM period_resets WHERE period = $1",
        )
        .bind(period.as_str())
        .fetch_optional(executor)
        .await?;

        Ok(window)
    }

    /// Record `window_start` as the baseline when nothing is recorded yet
    pub async fn record_baseline<'e, E: PgExecutor<'e>>(
        executor: E,
        period: ResetPeriod,
        window_start: DateTime<Utc>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO period_resets (period, window_start)
            VALUES ($1, $2)
            ON CONFLICT (period) DO NOTHING
            "#,
        )
        .bind(period.as_str())
        .bind(window_start)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Claim the reset of `window_start`
    ///
    /// Succeeds only if the recorded window is older (or absent). With
    /// `force` the claim always succeeds, for manual resets.
    pub async fn claim<'e, E: PgExecutor<'e>>(
        executor: E,
        period: ResetPeriod,
        window_start: DateTime<Utc>,
        force: bool,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO period_resets (period, window_start, reset_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (period) DO UPDATE
            SET window_start = EXCLUDED.window_start, reset_at = NOW()
            WHERE $3 OR period_resets.window_start < EXCLUDED.window_start
            "#,
        )
        .bind(period.as_str())
        .bind(window_start)
        .bind(force)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
