//! API request and response types

use crate::achievements::{AchievementId, AchievementTier, Rarity};
use crate::leaderboard::LeaderboardEntry;
use crate::models::{LeaderboardPeriod, PointCategory, ResetPeriod};
use crate::rewards::RewardCategory;
use crate::streak::{StreakCategory, StreakTransition};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Pagination parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 20,
        }
    }
}

impl Pagination {
    /// Page clamped to >= 1 and page size to 1..=100
    pub fn normalized(&self) -> (u32, u32) {
        (self.page.max(1), self.per_page.clamp(1, 100))
    }

    pub fn offset(&self) -> i64 {
        let (page, per_page) = self.normalized();
        i64::from(page - 1) * i64::from(per_page)
    }
}

/// Paginated response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub per_page: u32,
    pub total_pages: u32,
}

impl<T> PaginatedResponse<T> {
    pub fn new(data: Vec<T>, total: u64, pagination: &Pagination) -> Self {
        let (page, per_page) = pagination.normalized();
        let total_pages = total.div_ceil(u64::from(per_page)) as u32;
        Self {
            data,
            total,
            page,
            per_page,
            total_pages,
        }
    }
}

/// API error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

/// Error detail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

// ============================================================================
// Account and Points Types
// ============================================================================

/// Initialize account request (internal)
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct InitializeAccountRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = 64, message = "Display name must be 1-64 characters"))]
    pub display_name: Option<String>,
}

/// Award points request (internal)
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AwardPointsRequest {
    #[validate(range(min = 1, max = 100000, message = "Amount must be between 1 and 100000"))]
    pub amount: i64,
    #[validate(length(min = 1, max = 200, message = "Reason must be 1-200 characters"))]
    pub reason: String,
    /// One of workout, diet, mental_health, social, consistency, achievement
    pub category: String,
    /// Unique id of the activity that earned the points; repeats are ignored
    #[serde(default)]
    #[validate(length(min = 1, max = 128, message = "Event id must be 1-128 characters"))]
    pub event_id: Option<String>,
}

/// Award points response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AwardPointsResponse {
    pub points_awarded: i64,
    pub level_up_bonus: i64,
    pub achievement_bonus: i64,
    pub previous_level: u8,
    pub new_level: u8,
    pub total_points: i64,
    pub achievements_unlocked: Vec<AchievementId>,
    /// True when the event id was already applied and nothing changed
    pub duplicate: bool,
}

/// Advance streak request (internal)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvanceStreakRequest {
    pub activity_date: NaiveDate,
    #[serde(default)]
    pub category: Option<String>,
}

/// Category sub-streak
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryStreakView {
    pub category: StreakCategory,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub last_active_date: Option<NaiveDate>,
}

/// Advance streak response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvanceStreakResponse {
    pub transition: StreakTransition,
    pub current_streak: u32,
    pub longest_streak: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_streak: Option<CategoryStreakView>,
    pub achievements_unlocked: Vec<AchievementId>,
    pub bonus_points: i64,
    pub total_points: i64,
}

/// Full progression status for one user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressStatusResponse {
    pub user_id: Uuid,
    pub display_name: Option<String>,
    pub total_points: i64,
    pub weekly_points: i64,
    pub monthly_points: i64,
    pub level: u8,
    pub points_to_next_level: i64,
    pub level_progress: f64,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub last_active_date: Option<NaiveDate>,
    pub last_workout_date: Option<NaiveDate>,
    pub last_activity_at: Option<DateTime<Utc>>,
    pub category_streaks: Vec<CategoryStreakView>,
    pub achievement_count: u32,
    /// 1-based all-time rank
    pub leaderboard_position: u32,
}

/// Catalog entry annotated with the user's unlock time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AchievementView {
    pub id: AchievementId,
    pub name: String,
    pub description: String,
    pub category: PointCategory,
    pub rarity: Rarity,
    pub tier: AchievementTier,
    pub bonus_points: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unlocked_at: Option<DateTime<Utc>>,
}

/// Achievements response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AchievementsResponse {
    pub unlocked: Vec<AchievementView>,
    pub locked: Vec<AchievementView>,
}

/// Points history row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointsTransactionView {
    pub id: Uuid,
    pub amount: i64,
    pub reason: String,
    /// Absent for redemption debits
    pub category: Option<PointCategory>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Leaderboard Types
// ============================================================================

/// Leaderboard query parameters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LeaderboardQuery {
    #[serde(default)]
    pub period: Option<String>,
    #[serde(default)]
    pub limit: Option<u32>,
}

/// Leaderboard response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardResponse {
    pub period: LeaderboardPeriod,
    pub entries: Vec<LeaderboardEntry>,
}

// ============================================================================
// Reward Types
// ============================================================================

/// Reward listing query parameters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RewardsQuery {
    /// Include rewards the user cannot redeem right now
    #[serde(default)]
    pub all: bool,
}

/// Create reward request (internal)
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateRewardRequest {
    #[validate(length(min = 1, max = 120, message = "Name must be 1-120 characters"))]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 1000, message = "Description must be at most 1000 characters"))]
    pub description: Option<String>,
    pub category: String,
    #[validate(range(min = 1, message = "Points cost must be positive"))]
    pub points_cost: i64,
    #[serde(default)]
    #[validate(range(min = 0, message = "Availability cannot be negative"))]
    pub availability: Option<i32>,
    #[serde(default)]
    #[validate(range(min = 1, message = "Limit per user must be at least 1"))]
    pub limit_per_user: Option<i32>,
    #[serde(default)]
    #[validate(range(min = 1, max = 3650, message = "Validity must be 1-3650 days"))]
    pub validity_days: Option<i32>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

/// Reward as listed for a user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardView {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub category: RewardCategory,
    pub points_cost: i64,
    pub availability: Option<i32>,
    pub limit_per_user: Option<i32>,
    pub validity_days: Option<i32>,
    pub affordable: bool,
    pub times_redeemed: i64,
    /// An unused, unexpired redemption of this reward exists
    pub has_active_redemption: bool,
}

/// Redeem response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedeemResponse {
    pub redemption_id: Uuid,
    pub reward_id: Uuid,
    pub redemption_code: String,
    pub points_spent: i64,
    pub remaining_points: i64,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Redemption as listed for a user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedemptionView {
    pub id: Uuid,
    pub reward_id: Uuid,
    pub reward_name: String,
    pub code: String,
    pub points_spent: i64,
    pub redeemed_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub used: bool,
    pub used_at: Option<DateTime<Utc>>,
    pub expired: bool,
}

// ============================================================================
// Administrative Types
// ============================================================================

/// Outcome of zeroing a period counter across all accounts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeriodResetResponse {
    pub period: ResetPeriod,
    pub accounts_reset: u64,
    pub failures: u64,
    pub reset_at: DateTime<Utc>,
}
