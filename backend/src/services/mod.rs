//! Business logic services
//!
//! Services apply the pure progression rules from the shared crate and
//! coordinate the repositories inside database transactions.

pub mod leaderboard;
pub mod ledger;
pub mod rewards;

pub use leaderboard::LeaderboardService;
pub use ledger::LedgerService;
pub use rewards::RewardService;
