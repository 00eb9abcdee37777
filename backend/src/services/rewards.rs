//! Reward catalog and redemption service

use crate::error::ApiError;
use crate::repositories::{
    AccountRepository, CreateReward, CreateTransaction, RedemptionRepository, RedemptionSummary,
    RedemptionWithReward, RewardRepository, TransactionRepository,
};
use crate::services::LedgerService;
use chrono::{DateTime, Utc};
use fitness_progression_shared::rewards::{
    generate_redemption_code, Redemption, Reward, RewardCategory,
};
use fitness_progression_shared::types::{
    CreateRewardRequest, RedeemResponse, RedemptionView, RewardView, RewardsQuery,
};
use fitness_progression_shared::ProgressionError;
use sqlx::PgPool;
use std::collections::HashMap;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

pub struct RewardService;

impl RewardService {
    /// Active rewards for a user, annotated with affordability and prior use
    ///
    /// Without `query.all` only rewards the user could redeem right now are
    /// listed. A user without an account is treated as having no points.
    pub async fn list_available(
        pool: &PgPool,
        user_id: Uuid,
        query: RewardsQuery,
    ) -> Result<Vec<RewardView>, ApiError> {
        let now = Utc::now();

        let balance = AccountRepository::find(pool, user_id)
            .await
            .map_err(ApiError::Internal)?
            .map_or(0, |record| record.total_points);

        let rewards = RewardRepository::list_active(pool)
            .await
            .map_err(ApiError::Internal)?
            .into_iter()
            .map(|record| record.into_reward())
            .collect::<anyhow::Result<Vec<Reward>>>()
            .map_err(ApiError::Internal)?;

        let summaries: HashMap<Uuid, RedemptionSummary> =
            RedemptionRepository::summaries_for_user(pool, user_id, now)
                .await
                .map_err(ApiError::Internal)?
                .into_iter()
                .map(|summary| (summary.reward_id, summary))
                .collect();

        Ok(reward_views(rewards, balance, &summaries, query.all))
    }

    /// Spend points on a reward
    ///
    /// The account row is locked before the reward row, and the debit, stock
    /// decrement, redemption record and history entry commit together.
    pub async fn redeem(
        pool: &PgPool,
        user_id: Uuid,
        reward_id: Uuid,
    ) -> Result<RedeemResponse, ApiError> {
        let now = Utc::now();
        let mut tx = pool.begin().await?;

        let mut account = LedgerService::load_locked(&mut tx, user_id).await?;

        let reward = RewardRepository::lock(&mut *tx, reward_id)
            .await
            .map_err(ApiError::Internal)?
            .ok_or(ProgressionError::RewardNotFound(reward_id))?
            .into_reward()
            .map_err(ApiError::Internal)?;

        let prior = RedemptionRepository::count_for_user_reward(&mut *tx, user_id, reward_id)
            .await
            .map_err(ApiError::Internal)?;
        reward.check_redeemable(account.total_points, prior)?;

        let remaining_points = account.debit(reward.points_cost)?;
        AccountRepository::save(&mut *tx, &account)
            .await
            .map_err(ApiError::Internal)?;
        RewardRepository::decrement_availability(&mut *tx, reward_id)
            .await
            .map_err(ApiError::Internal)?;

        let redemption = new_redemption(user_id, &reward, now);
        RedemptionRepository::create(&mut *tx, &redemption)
            .await
            .map_err(ApiError::Internal)?;

        TransactionRepository::insert(
            &mut *tx,
            CreateTransaction {
                user_id,
                amount: -reward.points_cost,
                reason: format!("Redeemed reward: {}", reward.name),
                category: None,
                event_id: None,
                created_at: now,
            },
        )
        .await
        .map_err(ApiError::Internal)?;

        tx.commit().await?;

        metrics::counter!("progression.redemptions").increment(1);
        metrics::counter!("progression.points_redeemed").increment(reward.points_cost as u64);
        info!(
            user_id = %user_id,
            reward_id = %reward_id,
            cost = reward.points_cost,
            remaining = remaining_points,
            "Reward redeemed"
        );

        Ok(RedeemResponse {
            redemption_id: redemption.id,
            reward_id,
            redemption_code: redemption.code,
            points_spent: redemption.points_spent,
            remaining_points,
            expires_at: redemption.expires_at,
        })
    }

    /// The user's redemptions, newest first
    pub async fn list_redemptions(
        pool: &PgPool,
        user_id: Uuid,
    ) -> Result<Vec<RedemptionView>, ApiError> {
        let now = Utc::now();
        let records = RedemptionRepository::list_for_user(pool, user_id)
            .await
            .map_err(ApiError::Internal)?;

        Ok(records
            .into_iter()
            .map(|record| redemption_view(record, now))
            .collect())
    }

    /// Mark one of the user's redemptions as used
    pub async fn mark_used(
        pool: &PgPool,
        user_id: Uuid,
        redemption_id: Uuid,
    ) -> Result<Redemption, ApiError> {
        let now = Utc::now();
        let mut tx = pool.begin().await?;

        let mut redemption: Redemption =
            RedemptionRepository::lock_for_user(&mut *tx, redemption_id, user_id)
                .await
                .map_err(ApiError::Internal)?
                .ok_or(ProgressionError::RedemptionNotFound(redemption_id))?
                .into();

        redemption.mark_used(now)?;
        RedemptionRepository::mark_used(&mut *tx, redemption_id, now)
            .await
            .map_err(ApiError::Internal)?;
        tx.commit().await?;

        info!(user_id = %user_id, redemption_id = %redemption_id, "Redemption used");
        Ok(redemption)
    }

    /// Add a reward to the catalog
    pub async fn create_reward(
        pool: &PgPool,
        request: CreateRewardRequest,
    ) -> Result<Reward, ApiError> {
        request.validate()?;
        let category: RewardCategory = request.category.parse()?;

        let reward = RewardRepository::create(
            pool,
            CreateReward {
                name: request.name.trim().to_string(),
                description: request.description,
                category,
                points_cost: request.points_cost,
                availability: request.availability,
                is_active: request.is_active,
                limit_per_user: request.limit_per_user,
                validity_days: request.validity_days,
            },
        )
        .await
        .map_err(ApiError::Internal)?
        .into_reward()
        .map_err(ApiError::Internal)?;

        info!(reward_id = %reward.id, cost = reward.points_cost, "Reward created");
        Ok(reward)
    }
}

fn new_redemption(user_id: Uuid, reward: &Reward, now: DateTime<Utc>) -> Redemption {
    Redemption {
        id: Uuid::new_v4(),
        user_id,
        reward_id: reward.id,
        code: generate_redemption_code(now, Uuid::new_v4()),
        points_spent: reward.points_cost,
        redeemed_at: now,
        expires_at: reward.expires_at(now),
        used: false,
        used_at: None,
    }
}

fn reward_views(
    rewards: Vec<Reward>,
    balance: i64,
    summaries: &HashMap<Uuid, RedemptionSummary>,
    include_unavailable: bool,
) -> Vec<RewardView> {
    rewards
        .into_iter()
        .filter_map(|reward| {
            let summary = summaries.get(&reward.id);
            let times_redeemed = summary.map_or(0, |s| s.times_redeemed);
            if !include_unavailable && !reward.is_available_to(balance, times_redeemed) {
                return None;
            }

            Some(RewardView {
                affordable: balance >= reward.points_cost,
                times_redeemed,
                has_active_redemption: summary.map_or(false, |s| s.has_active_redemption),
                id: reward.id,
                name: reward.name,
                description: reward.description,
                category: reward.category,
                points_cost: reward.points_cost,
                availability: reward.availability,
                limit_per_user: reward.limit_per_user,
                validity_days: reward.validity_days,
            })
        })
        .collect()
}

fn redemption_view(record: RedemptionWithReward, now: DateTime<Utc>) -> RedemptionView {
    let redemption = Redemption::from(record.redemption);
    RedemptionView {
        expired: redemption.is_expired(now),
        id: redemption.id,
        reward_id: redemption.reward_id,
        reward_name: record.reward_name,
        code: redemption.code,
        points_spent: redemption.points_spent,
        redeemed_at: redemption.redeemed_at,
        expires_at: redemption.expires_at,
        used: redemption.used,
        used_at: redemption.used_at,
    }
}
