//! Fitness Progression Shared Library
//!
//! Pure progression rules (level curve, streaks, achievements, ledger
//! mutations, leaderboard ranking, reward checks) and the API types shared
//! by the backend and the WASM bindings. Nothing in this crate performs I/O.

pub mod achievements;
pub mod errors;
pub mod leaderboard;
pub mod ledger;
pub mod level;
pub mod models;
pub mod rewards;
pub mod streak;
pub mod types;
pub mod validation;

// Re-export commonly used items
pub use errors::*;
pub use models::{LeaderboardPeriod, PointCategory, ResetPeriod};
pub use types::*;
