//! Points ledger state transitions
//!
//! [`Account`] is the in-memory form of a user's progression record. Every
//! mutation the engine performs (awarding, streak advancement, redemption
//! debits, period resets) is a method here operating on one snapshot, so a
//! caller holding that snapshot under a lock applies each operation as a
//! single unit. The backend loads the snapshot inside a database transaction
//! with the account row locked, applies one of these methods and writes the
//! result back before committing.

use crate::achievements::{AchievementEngine, AchievementId, ActivityCounter};
use crate::errors::ProgressionError;
use crate::level::{level_of, level_progress, points_to_next_level};
use crate::models::{PointCategory, ResetPeriod};
use crate::streak::{CategoryStreaks, StreakCategory, StreakState, StreakTransition};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Bonus paid per level gained
pub const LEVEL_UP_BONUS_PER_LEVEL: i64 = 100;

/// Counters of qualifying activities, read by achievement rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ActivityCounts {
    pub workouts_completed: u32,
    pub meals_logged: u32,
    pub mental_health_checkins: u32,
}

impl ActivityCounts {
    pub fn get(&self, counter: ActivityCounter) -> u32 {
        match counter {
            ActivityCounter::WorkoutsCompleted => self.workouts_completed,
            ActivityCounter::MealsLogged => self.meals_logged,
            ActivityCounter::MentalHealthCheckins => self.mental_health_checkins,
        }
    }

    /// Count one activity of `category` (categories without a counter are ignored)
    pub fn record(&mut self, category: PointCategory) {
        match category {
            PointCategory::Workout => self.workouts_completed += 1,
            PointCategory::Diet => self.meals_logged += 1,
            PointCategory::MentalHealth => self.mental_health_checkins += 1,
            _ => {}
        }
    }
}

/// One signed movement of points, kept as history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub amount: i64,
    pub reason: String,
    pub category: PointCategory,
}

/// Everything a single operation changed besides the account fields
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerDelta {
    pub level_up_bonus: i64,
    pub achievement_bonus: i64,
    /// Achievements granted, in grant order
    pub unlocked: Vec<AchievementId>,
    pub entries: Vec<LedgerEntry>,
}

/// Breakdown returned by [`Account::award`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AwardOutcome {
    pub points_awarded: i64,
    pub level_up_bonus: i64,
    pub previous_level: u8,
    pub new_level: u8,
    pub total_points: i64,
    pub delta: LedgerDelta,
}

/// Result of [`Account::advance_streak`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreakOutcome {
    pub transition: StreakTransition,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub category: Option<(StreakCategory, StreakTransition, StreakState)>,
    pub delta: LedgerDelta,
}

/// Per-user progression record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub user_id: Uuid,
    pub display_name: Option<String>,
    pub total_points: i64,
    pub weekly_points: i64,
    pub monthly_points: i64,
    pub level: u8,
    pub streak: StreakState,
    pub category_streaks: CategoryStreaks,
    pub last_workout_date: Option<NaiveDate>,
    pub last_activity_at: Option<DateTime<Utc>>,
    pub activity: ActivityCounts,
    /// Held achievements with their first-unlock time
    pub achievements: BTreeMap<AchievementId, DateTime<Utc>>,
}

impl Account {
    /// Fresh account with every counter at zero
    pub fn new(user_id: Uuid, display_name: Option<String>) -> Self {
        Self {
            user_id,
            display_name,
            total_points: 0,
            weekly_points: 0,
            monthly_points: 0,
            level: level_of(0),
            streak: StreakState::default(),
            category_streaks: CategoryStreaks::default(),
            last_workout_date: None,
            last_activity_at: None,
            activity: ActivityCounts::default(),
            achievements: BTreeMap::new(),
        }
    }

    pub fn has_achievement(&self, id: AchievementId) -> bool {
        self.achievements.contains_key(&id)
    }

    pub fn achievement_count(&self) -> usize {
        self.achievements.len()
    }

    pub fn points_to_next_level(&self) -> i64 {
        points_to_next_level(self.total_points)
    }

    pub fn level_progress(&self) -> f64 {
        level_progress(self.total_points, self.level)
    }

    /// Record `id` as held. Returns false if it was already held.
    pub fn grant(&mut self, id: AchievementId, now: DateTime<Utc>) -> bool {
        if self.has_achievement(id) {
            return false;
        }
        self.achievements.insert(id, now);
        true
    }

    /// Award points for a qualifying activity
    ///
    /// Applies the increment and any level-up bonus, counts the activity and
    /// then runs the achievement rules of `category` against the result.
    pub fn award(
        &mut self,
        amount: i64,
        reason: &str,
        category: PointCategory,
        now: DateTime<Utc>,
    ) -> Result<AwardOutcome, ProgressionError> {
        if amount <= 0 {
            return Err(ProgressionError::InvalidInput(
                "Award amount must be positive".to_string(),
            ));
        }

        let previous_level = self.level;
        let mut delta = LedgerDelta::default();

        self.credit(amount, reason, category, now, &mut delta);
        self.activity.record(category);
        self.last_activity_at = Some(now);
        AchievementEngine::evaluate_and_grant(self, category, now, &mut delta);

        Ok(AwardOutcome {
            points_awarded: amount,
            level_up_bonus: delta.level_up_bonus,
            previous_level,
            new_level: self.level,
            total_points: self.total_points,
            delta,
        })
    }

    /// Add `amount` to every points counter and settle any level-ups
    ///
    /// Every level gained pays [`LEVEL_UP_BONUS_PER_LEVEL`], including a level
    /// regained after a redemption dropped the total below its threshold.
    /// The `level_<N>` badge is only unlocked the first time.
    pub fn credit(
        &mut self,
        amount: i64,
        reason: &str,
        category: PointCategory,
        now: DateTime<Utc>,
        delta: &mut LedgerDelta,
    ) {
        self.add_points(amount);
        delta.entries.push(LedgerEntry {
            amount,
            reason: reason.to_string(),
            category,
        });

        // A bonus can push the total over the next threshold as well
        loop {
            let reached = level_of(self.total_points);
            if reached <= self.level {
                break;
            }

            for level in (self.level + 1)..=reached {
                if self.grant(AchievementId::Level(level), now) {
                    delta.unlocked.push(AchievementId::Level(level));
                }
            }
            let bonus = LEVEL_UP_BONUS_PER_LEVEL * i64::from(reached - self.level);
            self.level = reached;

            self.add_points(bonus);
            delta.level_up_bonus += bonus;
            delta.entries.push(LedgerEntry {
                amount: bonus,
                reason: format!("Level up bonus: reached level {}", reached),
                category: PointCategory::Achievement,
            });
        }
    }

    fn add_points(&mut self, amount: i64) {
        self.total_points += amount;
        self.weekly_points += amount;
        self.monthly_points += amount;
    }

    /// Count a day of qualifying activity
    ///
    /// Always drives the daily streak; when `category` has a sub-streak that
    /// one advances too. Streak achievements are evaluated afterwards.
    pub fn advance_streak(
        &mut self,
        activity_date: NaiveDate,
        category: Option<PointCategory>,
        now: DateTime<Utc>,
    ) -> StreakOutcome {
        let transition = self.streak.advance(activity_date);

        let category = category.and_then(StreakCategory::for_points).map(|sub| {
            let state = self.category_streaks.get_mut(sub);
            let sub_transition = state.advance(activity_date);
            (sub, sub_transition, *state)
        });

        if let Some((StreakCategory::Workout, _, _)) = category {
            if self.last_workout_date.map_or(true, |last| activity_date > last) {
                self.last_workout_date = Some(activity_date);
            }
        }

        let mut delta = LedgerDelta::default();
        if transition != StreakTransition::AlreadyCounted {
            AchievementEngine::evaluate_and_grant(self, PointCategory::Consistency, now, &mut delta);
        }

        StreakOutcome {
            transition,
            current_streak: self.streak.current,
            longest_streak: self.streak.longest,
            category,
            delta,
        }
    }

    /// Remove `cost` points from the total, e.g. to pay for a reward
    ///
    /// Weekly and monthly counters are untouched. Returns the remaining total.
    pub fn debit(&mut self, cost: i64) -> Result<i64, ProgressionError> {
        if cost <= 0 {
            return Err(ProgressionError::InvalidInput(
                "Debit amount must be positive".to_string(),
            ));
        }
        if self.total_points < cost {
            return Err(ProgressionError::InsufficientPoints {
                required: cost,
                available: self.total_points,
            });
        }

        self.total_points -= cost;
        self.level = level_of(self.total_points);
        Ok(self.total_points)
    }

    /// Zero the counter for `period`
    pub fn reset_period(&mut self, period: ResetPeriod) {
        match period {
            ResetPeriod::Weekly => self.weekly_points = 0,
            ResetPeriod::Monthly => self.monthly_points = 0,
        }
    }
}
