//! Core enumerations shared by the progression engine and its callers

use crate::errors::ProgressionError;
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Point Categories
// ============================================================================

/// Source category of a points award
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointCategory {
    Workout,
    Diet,
    MentalHealth,
    Social,
    Consistency,
    /// Bonus credits granted by the engine itself (level-ups, unlocks)
    Achievement,
}

impl PointCategory {
    pub const ALL: [PointCategory; 6] = [
        PointCategory::Workout,
        PointCategory::Diet,
        PointCategory::MentalHealth,
        PointCategory::Social,
        PointCategory::Consistency,
        PointCategory::Achievement,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PointCategory::Workout => "workout",
            PointCategory::Diet => "diet",
            PointCategory::MentalHealth => "mental_health",
            PointCategory::Social => "social",
            PointCategory::Consistency => "consistency",
            PointCategory::Achievement => "achievement",
        }
    }
}

impl fmt::Display for PointCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PointCategory {
    type Err = ProgressionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        PointCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == normalized)
            .ok_or_else(|| {
                ProgressionError::InvalidInput(format!(
                    "Unknown category '{}'. Must be one of: workout, diet, mental_health, social, consistency, achievement",
                    s
                ))
            })
    }
}

// ============================================================================
// Leaderboard Periods
// ============================================================================

/// Window a leaderboard is ranked over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LeaderboardPeriod {
    #[default]
    Weekly,
    Monthly,
    AllTime,
}

impl LeaderboardPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeaderboardPeriod::Weekly => "weekly",
            LeaderboardPeriod::Monthly => "monthly",
            LeaderboardPeriod::AllTime => "all_time",
        }
    }
}

impl fmt::Display for LeaderboardPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LeaderboardPeriod {
    type Err = ProgressionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "weekly" => Ok(LeaderboardPeriod::Weekly),
            "monthly" => Ok(LeaderboardPeriod::Monthly),
            "all_time" | "alltime" | "all-time" => Ok(LeaderboardPeriod::AllTime),
            other => Err(ProgressionError::InvalidInput(format!(
                "Unknown leaderboard period '{}'. Must be one of: weekly, monthly, all_time",
                other
            ))),
        }
    }
}

// ============================================================================
// Reset Periods
// ============================================================================

/// Counter window that is zeroed on a schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResetPeriod {
    Weekly,
    Monthly,
}

impl ResetPeriod {
    pub const ALL: [ResetPeriod; 2] = [ResetPeriod::Weekly, ResetPeriod::Monthly];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResetPeriod::Weekly => "weekly",
            ResetPeriod::Monthly => "monthly",
        }
    }

    /// Start of the window containing `now`.
    ///
    /// Weeks start Monday 00:00 UTC, months on the 1st at 00:00 UTC.
    pub fn window_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let today = now.date_naive();
        let start: NaiveDate = match self {
            ResetPeriod::Weekly => {
                today - Duration::days(i64::from(today.weekday().num_days_from_monday()))
            }
            ResetPeriod::Monthly => {
                NaiveDate::from_ymd_opt(today.year(), today.month(), 1).unwrap_or(today)
            }
        };
        Utc.from_utc_datetime(&start.and_time(NaiveTime::default()))
    }
}

impl fmt::Display for ResetPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResetPeriod {
    type Err = ProgressionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "weekly" => Ok(ResetPeriod::Weekly),
            "monthly" => Ok(ResetPeriod::Monthly),
            other => Err(ProgressionError::InvalidInput(format!(
                "Unknown reset period '{}'. Must be weekly or monthly",
                other
            ))),
        }
    }
}
