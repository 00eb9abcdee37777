//! Achievement catalog and rule evaluation
//!
//! Achievement identifiers form a closed set. Their string form (for example
//! `week_streak` or `level_5`) is only produced and parsed here, so an
//! unknown identifier coming out of storage is a load-time error instead of
//! a silent fallback.

use crate::errors::ProgressionError;
use crate::ledger::{Account, LedgerDelta};
use crate::level::MAX_LEVEL;
use crate::models::PointCategory;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Bonus credited when a rule-based achievement unlocks
pub const ACHIEVEMENT_BONUS_POINTS: i64 = 50;

// ============================================================================
// Identifiers
// ============================================================================

/// Every achievement the engine can grant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum AchievementId {
    WorkoutWarrior,
    MealMaster,
    MindfulMonth,
    WeekStreak,
    MonthStreak,
    /// Reached the given level (2..=10)
    Level(u8),
}

impl AchievementId {
    /// Catalog entry for this achievement
    pub fn definition(self) -> AchievementDefinition {
        let (name, description, category, rarity, bonus_points) = match self {
            AchievementId::WorkoutWarrior => (
                "Workout Warrior".to_string(),
                "Completed 10 workouts.".to_string(),
                PointCategory::Workout,
                Rarity::Common,
                ACHIEVEMENT_BONUS_POINTS,
            ),
            AchievementId::MealMaster => (
                "Meal Master".to_string(),
                "Logged 50 meals.".to_string(),
                PointCategory::Diet,
                Rarity::Uncommon,
                ACHIEVEMENT_BONUS_POINTS,
            ),
            AchievementId::MindfulMonth => (
                "Mindful Month".to_string(),
                "Completed 30 mental-health check-ins.".to_string(),
                PointCategory::MentalHealth,
                Rarity::Uncommon,
                ACHIEVEMENT_BONUS_POINTS,
            ),
            AchievementId::WeekStreak => (
                "Week Streak".to_string(),
                "Stayed active 7 days in a row.".to_string(),
                PointCategory::Consistency,
                Rarity::Common,
                ACHIEVEMENT_BONUS_POINTS,
            ),
            AchievementId::MonthStreak => (
                "Month Streak".to_string(),
                "Stayed active 30 days in a row.".to_string(),
                PointCategory::Consistency,
                Rarity::Rare,
                ACHIEVEMENT_BONUS_POINTS,
            ),
            // Level-ups already pay their own bonus, so the badge itself is free
            AchievementId::Level(level) => (
                format!("Level {}", level),
                format!("Reached level {}.", level),
                PointCategory::Achievement,
                match level {
                    0..=4 => Rarity::Common,
                    5..=7 => Rarity::Uncommon,
                    _ => Rarity::Rare,
                },
                0,
            ),
        };

        AchievementDefinition {
            id: self,
            name,
            description,
            category,
            rarity,
            bonus_points,
        }
    }
}

impl fmt::Display for AchievementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AchievementId::WorkoutWarrior => f.write_str("workout_warrior"),
            AchievementId::MealMaster => f.write_str("meal_master"),
            AchievementId::MindfulMonth => f.write_str("mindful_month"),
            AchievementId::WeekStreak => f.write_str("week_streak"),
            AchievementId::MonthStreak => f.write_str("month_streak"),
            AchievementId::Level(level) => write!(f, "level_{}", level),
        }
    }
}

impl FromStr for AchievementId {
    type Err = ProgressionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "workout_warrior" => Ok(AchievementId::WorkoutWarrior),
            "meal_master" => Ok(AchievementId::MealMaster),
            "mindful_month" => Ok(AchievementId::MindfulMonth),
            "week_streak" => Ok(AchievementId::WeekStreak),
            "month_streak" => Ok(AchievementId::MonthStreak),
            other => other
                .strip_prefix("level_")
                .and_then(|n| n.parse::<u8>().ok())
                .filter(|level| (2..=MAX_LEVEL).contains(level))
                .map(AchievementId::Level)
                .ok_or_else(|| {
                    ProgressionError::InvalidInput(format!("Unknown achievement id '{}'", s))
                }),
        }
    }
}

impl TryFrom<String> for AchievementId {
    type Error = ProgressionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AchievementId> for String {
    fn from(id: AchievementId) -> Self {
        id.to_string()
    }
}

// ============================================================================
// Catalog
// ============================================================================

/// How hard an achievement is to earn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    Common,
    Uncommon,
    Rare,
}

/// Display tier, derived from rarity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AchievementTier {
    Bronze,
    Silver,
    Gold,
}

impl Rarity {
    pub fn tier(&self) -> AchievementTier {
        match self {
            Rarity::Common => AchievementTier::Bronze,
            Rarity::Uncommon => AchievementTier::Silver,
            Rarity::Rare => AchievementTier::Gold,
        }
    }
}

/// Immutable catalog entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AchievementDefinition {
    pub id: AchievementId,
    pub name: String,
    pub description: String,
    pub category: PointCategory,
    pub rarity: Rarity,
    pub bonus_points: i64,
}

impl AchievementDefinition {
    pub fn tier(&self) -> AchievementTier {
        self.rarity.tier()
    }
}

/// Full catalog: rule-based achievements followed by level badges
pub fn catalog() -> Vec<AchievementDefinition> {
    RULES
        .iter()
        .map(|rule| rule.id)
        .chain((2..=MAX_LEVEL).map(AchievementId::Level))
        .map(AchievementId::definition)
        .collect()
}

// ============================================================================
// Rules
// ============================================================================

/// Activity counter a rule can read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityCounter {
    WorkoutsCompleted,
    MealsLogged,
    MentalHealthCheckins,
}

/// Predicate over an account snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    AtLeast { counter: ActivityCounter, count: u32 },
    StreakOf { days: u32 },
}

impl Condition {
    pub fn is_met(&self, account: &Account) -> bool {
        match *self {
            Condition::AtLeast { counter, count } => account.activity.get(counter) >= count,
            Condition::StreakOf { days } => account.streak.current >= days,
        }
    }
}

/// Ties an achievement to the category whose activity re-evaluates it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AchievementRule {
    pub id: AchievementId,
    pub category: PointCategory,
    pub condition: Condition,
}

pub const RULES: &[AchievementRule] = &[
    AchievementRule {
        id: AchievementId::WorkoutWarrior,
        category: PointCategory::Workout,
        condition: Condition::AtLeast {
            counter: ActivityCounter::WorkoutsCompleted,
            count: 10,
        },
    },
    AchievementRule {
        id: AchievementId::MealMaster,
        category: PointCategory::Diet,
        condition: Condition::AtLeast {
            counter: ActivityCounter::MealsLogged,
            count: 50,
        },
    },
    AchievementRule {
        id: AchievementId::MindfulMonth,
        category: PointCategory::MentalHealth,
        condition: Condition::AtLeast {
            counter: ActivityCounter::MentalHealthCheckins,
            count: 30,
        },
    },
    AchievementRule {
        id: AchievementId::WeekStreak,
        category: PointCategory::Consistency,
        condition: Condition::StreakOf { days: 7 },
    },
    AchievementRule {
        id: AchievementId::MonthStreak,
        category: PointCategory::Consistency,
        condition: Condition::StreakOf { days: 30 },
    },
];

/// Evaluates rules against an account and grants what is newly earned
pub struct AchievementEngine;

impl AchievementEngine {
    /// Rules in `category` whose condition holds but which the account does not hold yet
    pub fn newly_satisfied(category: PointCategory, account: &Account) -> Vec<AchievementId> {
        RULES
            .iter()
            .filter(|rule| rule.category == category)
            .filter(|rule| !account.has_achievement(rule.id))
            .filter(|rule| rule.condition.is_met(account))
            .map(|rule| rule.id)
            .collect()
    }

    /// Grant every newly satisfied achievement in `category` together with its bonus
    ///
    /// Membership is checked again at grant time, so re-running the evaluation
    /// on the same snapshot is a no-op.
    pub fn evaluate_and_grant(
        account: &mut Account,
        category: PointCategory,
        now: DateTime<Utc>,
        delta: &mut LedgerDelta,
    ) {
        for id in Self::newly_satisfied(category, account) {
            if !account.grant(id, now) {
                continue;
            }
            let definition = id.definition();
            delta.unlocked.push(id);
            if definition.bonus_points > 0 {
                delta.achievement_bonus += definition.bonus_points;
                account.credit(
                    definition.bonus_points,
                    &format!("Achievement unlocked: {}", definition.name),
                    PointCategory::Achievement,
                    now,
                    delta,
                );
            }
        }
    }
}
