//! Database repositories
//!
//! Provides data access layer for database operations.

pub mod accounts;
pub mod achievements;
pub mod periods;
pub mod rewards;
pub mod streaks;
pub mod transactions;

pub use accounts::{AccountRecord, AccountRepository, LeaderboardRow};
pub use achievements::{AchievementRecord, AchievementRepository};
pub use periods::PeriodRepository;
pub use rewards::{
    CreateReward, RedemptionRecord, RedemptionRepository, RedemptionSummary, RedemptionWithReward,
    RewardRecord, RewardRepository,
};
pub use streaks::{CategoryStreakRecord, StreakRepository};
pub use transactions::{CreateTransaction, TransactionRecord, TransactionRepository};
