//! Reward catalog rules and redemption bookkeeping

use crate::errors::ProgressionError;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Kind of reward offered in the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardCategory {
    Discount,
    Merchandise,
    PremiumFeature,
    Experience,
    Donation,
}

impl RewardCategory {
    pub const ALL: [RewardCategory; 5] = [
        RewardCategory::Discount,
        RewardCategory::Merchandise,
        RewardCategory::PremiumFeature,
        RewardCategory::Experience,
        RewardCategory::Donation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RewardCategory::Discount => "discount",
            RewardCategory::Merchandise => "merchandise",
            RewardCategory::PremiumFeature => "premium_feature",
            RewardCategory::Experience => "experience",
            RewardCategory::Donation => "donation",
        }
    }
}

impl fmt::Display for RewardCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RewardCategory {
    type Err = ProgressionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        RewardCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == normalized)
            .ok_or_else(|| ProgressionError::InvalidInput(format!("Unknown reward category '{}'", s)))
    }
}

/// Catalog entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reward {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub category: RewardCategory,
    pub points_cost: i64,
    /// Remaining stock; `None` means unlimited
    pub availability: Option<i32>,
    pub is_active: bool,
    pub limit_per_user: Option<i32>,
    pub validity_days: Option<i32>,
}

impl Reward {
    pub fn is_exhausted(&self) -> bool {
        matches!(self.availability, Some(remaining) if remaining <= 0)
    }

    /// Check whether a user with `balance` points and `prior_redemptions`
    /// of this reward may redeem it
    ///
    /// Inactive or exhausted rewards are reported as not found. The per-user
    /// limit is checked before affordability.
    pub fn check_redeemable(
        &self,
        balance: i64,
        prior_redemptions: i64,
    ) -> Result<(), ProgressionError> {
        if !self.is_active || self.is_exhausted() {
            return Err(ProgressionError::RewardNotFound(self.id));
        }

        if let Some(limit) = self.limit_per_user {
            if prior_redemptions >= i64::from(limit) {
                return Err(ProgressionError::RedemptionLimitReached { limit });
            }
        }

        if balance < self.points_cost {
            return Err(ProgressionError::InsufficientPoints {
                required: self.points_cost,
                available: balance,
            });
        }

        Ok(())
    }

    /// Whether the reward belongs in the user's available list
    pub fn is_available_to(&self, balance: i64, prior_redemptions: i64) -> bool {
        self.check_redeemable(balance, prior_redemptions).is_ok()
    }

    /// Expiry of a redemption made at `redeemed_at`
    pub fn expires_at(&self, redeemed_at: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.validity_days
            .map(|days| redeemed_at + Duration::days(i64::from(days)))
    }
}

/// Record of a successful redemption
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Redemption {
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

impl Redemption {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(false, |expires| expires <= now)
    }

    /// Unused and not expired
    pub fn is_outstanding(&self, now: DateTime<Utc>) -> bool {
        !self.used && !self.is_expired(now)
    }

    /// Flip `used` to true. The flag is never reset.
    pub fn mark_used(&mut self, now: DateTime<Utc>) -> Result<(), ProgressionError> {
        if self.used {
            return Err(ProgressionError::RedemptionAlreadyUsed(self.id));
        }
        self.used = true;
        self.used_at = Some(now);
        Ok(())
    }
}

/// Human-readable redemption code: base36 timestamp, a dash and six random characters
pub fn generate_redemption_code(now: DateTime<Utc>, random: Uuid) -> String {
    let random = random.simple().to_string();
    format!(
        "{}-{}",
        to_base36(now.timestamp_millis().max(0) as u64),
        &random[..6]
    )
    .to_uppercase()
}

fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}
