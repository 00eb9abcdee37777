//! Points ledger service
//!
//! Each mutating operation runs in one database transaction: the account row
//! is locked with `SELECT ... FOR UPDATE`, the domain account is rebuilt from
//! the locked rows, the pure mutation from the shared crate is applied, and
//! every resulting row is written before commit. Concurrent calls for the
//! same user therefore serialize on the row lock, while different users
//! never contend.

use crate::error::ApiError;
use crate::repositories::{
    AccountRepository, AchievementRepository, CreateTransaction, PeriodRepository,
    StreakRepository, TransactionRecord, TransactionRepository,
};
use anyhow::Context;
use chrono::{DateTime, Utc};
use fitness_progression_shared::achievements::{catalog, AchievementId};
use fitness_progression_shared::ledger::{Account, LedgerDelta};
use fitness_progression_shared::models::{PointCategory, ResetPeriod};
use fitness_progression_shared::streak::StreakTransition;
use fitness_progression_shared::types::{
    AchievementView, AchievementsResponse, AdvanceStreakRequest, AdvanceStreakResponse,
    AwardPointsRequest, AwardPointsResponse, CategoryStreakView, InitializeAccountRequest,
    PaginatedResponse, Pagination, PeriodResetResponse, PointsTransactionView,
    ProgressStatusResponse,
};
use fitness_progression_shared::validation::{
    normalize_display_name, validate_activity_date, validate_event_id,
};
use fitness_progression_shared::ProgressionError;
use sqlx::{PgConnection, PgPool};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};
use uuid::Uuid;
use validator::Validate;

/// Points ledger service
pub struct LedgerService;

impl LedgerService {
    /// Create the account if absent. Returns whether it was created, plus its status.
    pub async fn initialize(
        pool: &PgPool,
        user_id: Uuid,
        request: InitializeAccountRequest,
    ) -> Result<(bool, ProgressStatusResponse), ApiError> {
        request.validate()?;
        let display_name = normalize_display_name(request.display_name.as_deref());

        let created = AccountRepository::create_if_absent(pool, user_id, display_name.as_deref())
            .await
            .map_err(ApiError::Internal)?;

        if created {
            info!(user_id = %user_id, "Progress account created");
        } else {
            debug!(user_id = %user_id, "Progress account already exists");
        }

        let status = Self::status(pool, user_id)
            .await?
            .ok_or(ProgressionError::AccountNotInitialized(user_id))?;

        Ok((created, status))
    }

    /// Award points for one qualifying activity
    pub async fn award(
        pool: &PgPool,
        user_id: Uuid,
        request: AwardPointsRequest,
    ) -> Result<AwardPointsResponse, ApiError> {
        request.validate()?;
        let category: PointCategory = request.category.parse()?;
        if let Some(event_id) = &request.event_id {
            validate_event_id(event_id).map_err(|m| ApiError::validation_field("event_id", m))?;
        }

        let now = Utc::now();
        let mut tx = pool.begin().await?;
        let mut account = Self::load_locked(&mut tx, user_id).await?;

        if let Some(event_id) = &request.event_id {
            let seen = TransactionRepository::event_exists(&mut *tx, user_id, event_id)
                .await
                .map_err(ApiError::Internal)?;
            if seen {
                debug!(user_id = %user_id, event_id = %event_id, "Duplicate award ignored");
                return Ok(AwardPointsResponse {
                    points_awarded: 0,
                    level_up_bonus: 0,
                    achievement_bonus: 0,
                    previous_level: account.level,
                    new_level: account.level,
                    total_points: account.total_points,
                    achievements_unlocked: Vec::new(),
                    duplicate: true,
                });
            }
        }

        let outcome = account.award(request.amount, &request.reason, category, now)?;

        AccountRepository::save(&mut *tx, &account)
            .await
            .map_err(ApiError::Internal)?;
        Self::persist_delta(&mut tx, &account, &outcome.delta, request.event_id.as_deref(), now)
            .await?;
        tx.commit().await?;

        metrics::counter!("progression.points_awarded").increment(request.amount as u64);
        Self::record_unlock_metrics(&outcome.delta);

        if outcome.new_level > outcome.previous_level {
            info!(
                user_id = %user_id,
                from = outcome.previous_level,
                to = outcome.new_level,
                bonus = outcome.level_up_bonus,
                "Level up"
            );
        }
        debug!(
            user_id = %user_id,
            amount = request.amount,
            category = %category,
            total = outcome.total_points,
            "Points awarded"
        );

        Ok(AwardPointsResponse {
            points_awarded: outcome.points_awarded,
            level_up_bonus: outcome.level_up_bonus,
            achievement_bonus: outcome.delta.achievement_bonus,
            previous_level: outcome.previous_level,
            new_level: outcome.new_level,
            total_points: outcome.total_points,
            achievements_unlocked: outcome.delta.unlocked,
            duplicate: false,
        })
    }

    /// Count a day of qualifying activity towards the streaks
    pub async fn advance_streak(
        pool: &PgPool,
        user_id: Uuid,
        request: AdvanceStreakRequest,
    ) -> Result<AdvanceStreakResponse, ApiError> {
        let now = Utc::now();
        validate_activity_date(request.activity_date, now.date_naive())
            .map_err(|m| ApiError::validation_field("activity_date", m))?;
        let category = request
            .category
            .as_deref()
            .map(str::parse::<PointCategory>)
            .transpose()?;

        let mut tx = pool.begin().await?;
        let mut account = Self::load_locked(&mut tx, user_id).await?;

        let outcome = account.advance_streak(request.activity_date, category, now);

        AccountRepository::save(&mut *tx, &account)
            .await
            .map_err(ApiError::Internal)?;
        if let Some((sub, transition, state)) = &outcome.category {
            if *transition != StreakTransition::AlreadyCounted {
                StreakRepository::upsert(&mut *tx, user_id, *sub, state)
                    .await
                    .map_err(ApiError::Internal)?;
            }
        }
        Self::persist_delta(&mut tx, &account, &outcome.delta, None, now).await?;
        tx.commit().await?;

        Self::record_unlock_metrics(&outcome.delta);
        debug!(
            user_id = %user_id,
            date = %request.activity_date,
            transition = ?outcome.transition,
            current = outcome.current_streak,
            "Streak advanced"
        );

        Ok(AdvanceStreakResponse {
            transition: outcome.transition,
            current_streak: outcome.current_streak,
            longest_streak: outcome.longest_streak,
            category_streak: outcome.category.map(|(sub, _, state)| CategoryStreakView {
                category: sub,
                current_streak: state.current,
                longest_streak: state.longest,
                last_active_date: state.last_active_date,
            }),
            achievements_unlocked: outcome.delta.unlocked.clone(),
            bonus_points: outcome.delta.achievement_bonus + outcome.delta.level_up_bonus,
            total_points: account.total_points,
        })
    }

    /// Full status view, or `None` when the user has no account
    pub async fn status(
        pool: &PgPool,
        user_id: Uuid,
    ) -> Result<Option<ProgressStatusResponse>, ApiError> {
        let Some(account) = Self::load(pool, user_id).await? else {
            return Ok(None);
        };

        let position = AccountRepository::all_time_position(pool, user_id, account.total_points)
            .await
            .map_err(ApiError::Internal)?;

        Ok(Some(status_view(&account, position)))
    }

    /// Whole catalog split into unlocked and locked for this user
    pub async fn achievements(
        pool: &PgPool,
        user_id: Uuid,
    ) -> Result<AchievementsResponse, ApiError> {
        let records = AchievementRepository::list(pool, user_id)
            .await
            .map_err(ApiError::Internal)?;

        let mut held = BTreeMap::new();
        for record in records {
            let id = record
                .achievement_id
                .parse::<AchievementId>()
                .context("Stored achievement id")
                .map_err(ApiError::Internal)?;
            held.insert(id, record.unlocked_at);
        }

        Ok(achievement_views(&held))
    }

    /// Page of the user's points history, newest first
    pub async fn history(
        pool: &PgPool,
        user_id: Uuid,
        pagination: &Pagination,
    ) -> Result<PaginatedResponse<PointsTransactionView>, ApiError> {
        let (_, per_page) = pagination.normalized();

        let records =
            TransactionRepository::list(pool, user_id, i64::from(per_page), pagination.offset())
                .await
                .map_err(ApiError::Internal)?;
        let total = TransactionRepository::count(pool, user_id)
            .await
            .map_err(ApiError::Internal)?;

        let data = records
            .into_iter()
            .map(transaction_view)
            .collect::<anyhow::Result<Vec<_>>>()
            .map_err(ApiError::Internal)?;

        Ok(PaginatedResponse::new(data, total.max(0) as u64, pagination))
    }

    /// Reset `period` now, regardless of the schedule
    pub async fn reset_period(
        pool: &PgPool,
        period: ResetPeriod,
    ) -> Result<PeriodResetResponse, ApiError> {
        let now = Utc::now();
        let reset = Self::claim_and_reset(pool, period, period.window_start(now), true, now).await?;

        // A forced claim always succeeds
        Ok(reset.unwrap_or(PeriodResetResponse {
            period,
            accounts_reset: 0,
            failures: 0,
            reset_at: now,
        }))
    }

    /// Claim the reset of `window_start` and zero `period` on every account
    ///
    /// The claim commits together with the snapshot of account ids, so a
    /// failure before the snapshot leaves the window unclaimed for the next
    /// attempt. Returns `None` when the window was already claimed.
    pub async fn claim_and_reset(
        pool: &PgPool,
        period: ResetPeriod,
        window_start: DateTime<Utc>,
        force: bool,
        now: DateTime<Utc>,
    ) -> Result<Option<PeriodResetResponse>, ApiError> {
        let mut tx = pool.begin().await?;
        let Some(ids) = Self::claim_reset(&mut tx, period, window_start, force).await? else {
            debug!(period = %period, window_start = %window_start, "Period reset already claimed");
            return Ok(None);
        };
        tx.commit().await?;

        Ok(Some(Self::reset_accounts(pool, period, ids, now).await))
    }

    /// Claim `window_start` on `conn` and list the accounts to reset
    ///
    /// Nothing is durable until the caller commits.
    pub async fn claim_reset(
        conn: &mut PgConnection,
        period: ResetPeriod,
        window_start: DateTime<Utc>,
        force: bool,
    ) -> Result<Option<Vec<Uuid>>, ApiError> {
        let claimed = PeriodRepository::claim(&mut *conn, period, window_start, force)
            .await
            .map_err(ApiError::Internal)?;
        if !claimed {
            return Ok(None);
        }

        let ids = AccountRepository::list_ids(&mut *conn)
            .await
            .map_err(ApiError::Internal)?;
        Ok(Some(ids))
    }

    /// Zero the `period` counter of each account in `ids`, one at a time
    ///
    /// A failure on one account is logged and counted; the rest still reset.
    async fn reset_accounts(
        pool: &PgPool,
        period: ResetPeriod,
        ids: Vec<Uuid>,
        now: DateTime<Utc>,
    ) -> PeriodResetResponse {
        let mut accounts_reset = 0;
        let mut failures = 0;
        for user_id in ids {
            match AccountRepository::reset_period(pool, user_id, period).await {
                Ok(true) => accounts_reset += 1,
                Ok(false) => {}
                Err(e) => {
                    failures += 1;
                    warn!(user_id = %user_id, period = %period, error = %e, "Period reset failed for account");
                }
            }
        }

        metrics::counter!("progression.period_resets").increment(1);
        info!(period = %period, accounts_reset, failures, "Period reset completed");

        PeriodResetResponse {
            period,
            accounts_reset,
            failures,
            reset_at: now,
        }
    }

    // ------------------------------------------------------------------------
    // Loading and persistence
    // ------------------------------------------------------------------------

    pub(crate) async fn load(pool: &PgPool, user_id: Uuid) -> Result<Option<Account>, ApiError> {
        let Some(record) = AccountRepository::find(pool, user_id)
            .await
            .map_err(ApiError::Internal)?
        else {
            return Ok(None);
        };

        let achievements = AchievementRepository::list(pool, user_id)
            .await
            .map_err(ApiError::Internal)?;
        let streaks = StreakRepository::list(pool, user_id)
            .await
            .map_err(ApiError::Internal)?;

        record
            .into_account(achievements, streaks)
            .map(Some)
            .map_err(ApiError::Internal)
    }

    /// Lock the account row and rebuild the domain account from it
    pub(crate) async fn load_locked(
        conn: &mut PgConnection,
        user_id: Uuid,
    ) -> Result<Account, ApiError> {
        let record = AccountRepository::lock(&mut *conn, user_id)
            .await
            .map_err(ApiError::Internal)?
            .ok_or(ProgressionError::AccountNotInitialized(user_id))?;

        let achievements = AchievementRepository::list(&mut *conn, user_id)
            .await
            .map_err(ApiError::Internal)?;
        let streaks = StreakRepository::list(&mut *conn, user_id)
            .await
            .map_err(ApiError::Internal)?;

        record
            .into_account(achievements, streaks)
            .map_err(ApiError::Internal)
    }

    /// Write unlocks and history entries produced by one operation
    ///
    /// `event_id` is attached to the first entry, which is the award itself.
    async fn persist_delta(
        conn: &mut PgConnection,
        account: &Account,
        delta: &LedgerDelta,
        event_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<(), ApiError> {
        for id in &delta.unlocked {
            let unlocked_at = account.achievements.get(id).copied().unwrap_or(now);
            AchievementRepository::insert(&mut *conn, account.user_id, *id, unlocked_at)
                .await
                .map_err(ApiError::Internal)?;
        }

        for (index, entry) in delta.entries.iter().enumerate() {
            TransactionRepository::insert(
                &mut *conn,
                CreateTransaction {
                    user_id: account.user_id,
                    amount: entry.amount,
                    reason: entry.reason.clone(),
                    category: Some(entry.category.to_string()),
                    event_id: if index == 0 {
                        event_id.map(str::to_string)
                    } else {
                        None
                    },
                    created_at: now,
                },
            )
            .await
            .map_err(ApiError::Internal)?;
        }

        Ok(())
    }

    fn record_unlock_metrics(delta: &LedgerDelta) {
        let level_ups = delta
            .unlocked
            .iter()
            .filter(|id| matches!(id, AchievementId::Level(_)))
            .count();
        let badges = delta.unlocked.len() - level_ups;

        if level_ups > 0 {
            metrics::counter!("progression.level_ups").increment(level_ups as u64);
        }
        if badges > 0 {
            metrics::counter!("progression.achievements_unlocked").increment(badges as u64);
        }
    }
}

// ============================================================================
// View builders
// ============================================================================

pub(crate) fn status_view(account: &Account, position: i64) -> ProgressStatusResponse {
    ProgressStatusResponse {
        user_id: account.user_id,
        display_name: account.display_name.clone(),
        total_points: account.total_points,
        weekly_points: account.weekly_points,
        monthly_points: account.monthly_points,
        level: account.level,
        points_to_next_level: account.points_to_next_level(),
        level_progress: account.level_progress(),
        current_streak: account.streak.current,
        longest_streak: account.streak.longest,
        last_active_date: account.streak.last_active_date,
        last_workout_date: account.last_workout_date,
        last_activity_at: account.last_activity_at,
        category_streaks: account
            .category_streaks
            .iter()
            .map(|(category, state)| CategoryStreakView {
                category,
                current_streak: state.current,
                longest_streak: state.longest,
                last_active_date: state.last_active_date,
            })
            .collect(),
        achievement_count: account.achievement_count() as u32,
        leaderboard_position: u32::try_from(position.max(1)).unwrap_or(u32::MAX),
    }
}

pub(crate) fn achievement_views(held: &BTreeMap<AchievementId, DateTime<Utc>>) -> AchievementsResponse {
    let mut unlocked = Vec::new();
    let mut locked = Vec::new();

    for definition in catalog() {
        let tier = definition.tier();
        let unlocked_at = held.get(&definition.id).copied();
        let view = AchievementView {
            id: definition.id,
            name: definition.name,
            description: definition.description,
            category: definition.category,
            rarity: definition.rarity,
            tier,
            bonus_points: definition.bonus_points,
            unlocked_at,
        };
        if unlocked_at.is_some() {
            unlocked.push(view);
        } else {
            locked.push(view);
        }
    }

    unlocked.sort_by_key(|view| view.unlocked_at);
    AchievementsResponse { unlocked, locked }
}

fn transaction_view(record: TransactionRecord) -> anyhow::Result<PointsTransactionView> {
    let category = record
        .category
        .as_deref()
        .map(str::parse::<PointCategory>)
        .transpose()
        .with_context(|| format!("Stored category of transaction {}", record.id))?;

    Ok(PointsTransactionView {
        id: record.id,
        amount: record.amount,
        reason: record.reason,
        category,
        event_id: record.event_id,
        created_at: record.created_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 7, 10, 0, 0).unwrap()
    }

    #[test]
    fn test_status_view_derives_level_fields() {
        let mut account = Account::new(Uuid::new_v4(), Some("Kai".to_string()));
        account.award(600, "run", PointCategory::Workout, now()).unwrap();
        account.advance_streak(NaiveDate::from_ymd_opt(2024, 1, 7).unwrap(), Some(PointCategory::Workout), now());

        let view = status_view(&account, 3);
        assert_eq!(view.total_points, 700);
        assert_eq!(view.level, 2);
        assert_eq!(view.points_to_next_level, 800);
        assert!((view.level_progress - 20.0).abs() < 1e-9);
        assert_eq!(view.current_streak, 1);
        assert_eq!(view.category_streaks.len(), 3);
        assert_eq!(view.category_streaks[0].current_streak, 1);
        assert_eq!(view.achievement_count, 1);
        assert_eq!(view.leaderboard_position, 3);
    }

    #[test]
    fn test_achievement_views_split_and_order() {
        let mut held = BTreeMap::new();
        held.insert(AchievementId::WeekStreak, now());
        held.insert(AchievementId::Level(2), now() - Duration::days(3));

        let views = achievement_views(&held);
        let unlocked: Vec<_> = views.unlocked.iter().map(|v| v.id).collect();
        assert_eq!(unlocked, vec![AchievementId::Level(2), AchievementId::WeekStreak]);
        assert_eq!(views.locked.len(), catalog().len() - 2);
        assert!(views.locked.iter().all(|v| v.unlocked_at.is_none()));
    }

    #[test]
    fn test_transaction_view_category() {
        let record = TransactionRecord {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            amount: -500,
            reason: "Redeemed reward: Smoothie".to_string(),
            category: None,
            event_id: None,
            created_at: now(),
        };
        assert_eq!(transaction_view(record.clone()).unwrap().category, None);

        let award = TransactionRecord {
            category: Some("mental_health".to_string()),
            ..record.clone()
        };
        assert_eq!(
            transaction_view(award).unwrap().category,
            Some(PointCategory::MentalHealth)
        );

        let corrupt = TransactionRecord {
            category: Some("gardening".to_string()),
            ..record
        };
        assert!(transaction_view(corrupt).is_err());
    }
}
