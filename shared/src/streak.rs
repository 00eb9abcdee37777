//! Daily streak tracking
//!
//! A streak counts consecutive calendar days with at least one qualifying
//! activity. Advancing a streak compares the activity date with the last
//! counted date and applies exactly one of three transitions.

use crate::models::PointCategory;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Outcome of advancing a streak with an activity date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreakTransition {
    /// The date was already counted (same day, or an older replay)
    AlreadyCounted,
    /// The activity lands the day after the last counted date
    Continued,
    /// First activity ever, or the chain was broken
    Restarted,
}

/// Streak counters for one activity stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StreakState {
    pub current: u32,
    pub longest: u32,
    pub last_active_date: Option<NaiveDate>,
}

impl StreakState {
    /// Decide which transition `activity_date` would cause, without applying it
    pub fn transition_for(&self, activity_date: NaiveDate) -> StreakTransition {
        match self.last_active_date {
            None => StreakTransition::Restarted,
            Some(last) => match (activity_date - last).num_days() {
                days if days <= 0 => StreakTransition::AlreadyCounted,
                1 => StreakTransition::Continued,
                _ => StreakTransition::Restarted,
            },
        }
    }

    /// Apply an activity on `activity_date`
    ///
    /// Replaying a date that is already counted leaves the state untouched.
    pub fn advance(&mut self, activity_date: NaiveDate) -> StreakTransition {
        let transition = self.transition_for(activity_date);
        match transition {
            StreakTransition::AlreadyCounted => return transition,
            StreakTransition::Continued => self.current += 1,
            StreakTransition::Restarted => self.current = 1,
        }
        self.longest = self.longest.max(self.current);
        self.last_active_date = Some(activity_date);
        transition
    }
}

// ============================================================================
// Category Sub-Streaks
// ============================================================================

/// Activity streams that keep their own sub-streak
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreakCategory {
    Workout,
    Diet,
    MentalHealth,
}

impl StreakCategory {
    pub const ALL: [StreakCategory; 3] = [
        StreakCategory::Workout,
        StreakCategory::Diet,
        StreakCategory::MentalHealth,
    ];

    /// Sub-streak fed by activities of `category`, if any
    pub fn for_points(category: PointCategory) -> Option<Self> {
        match category {
            PointCategory::Workout => Some(StreakCategory::Workout),
            PointCategory::Diet => Some(StreakCategory::Diet),
            PointCategory::MentalHealth => Some(StreakCategory::MentalHealth),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StreakCategory::Workout => "workout",
            StreakCategory::Diet => "diet",
            StreakCategory::MentalHealth => "mental_health",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        StreakCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == value)
    }
}

/// Per-category sub-streaks held alongside the daily streak
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CategoryStreaks {
    pub workout: StreakState,
    pub diet: StreakState,
    pub mental_health: StreakState,
}

impl CategoryStreaks {
    pub fn get(&self, category: StreakCategory) -> &StreakState {
        match category {
            StreakCategory::Workout => &self.workout,
            StreakCategory::Diet => &self.diet,
            StreakCategory::MentalHealth => &self.mental_health,
        }
    }

    pub fn get_mut(&mut self, category: StreakCategory) -> &mut StreakState {
        match category {
            StreakCategory::Workout => &mut self.workout,
            StreakCategory::Diet => &mut self.diet,
            StreakCategory::MentalHealth => &mut self.mental_health,
        }
    }

    /// Iterate over `(category, state)` pairs in a fixed order
    pub fn iter(&self) -> impl Iterator<Item = (StreakCategory, &StreakState)> {
        StreakCategory::ALL.into_iter().map(move |c| (c, self.get(c)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use proptest::prelude::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_first_activity_starts_streak() {
        let mut streak = StreakState::default();
        assert_eq!(streak.advance(date(2024, 1, 1)), StreakTransition::Restarted);
        assert_eq!(streak.current, 1);
        assert_eq!(streak.longest, 1);
        assert_eq!(streak.last_active_date, Some(date(2024, 1, 1)));
    }

    #[test]
    fn test_next_day_continues() {
        let mut streak = StreakState {
            current: 6,
            longest: 6,
            last_active_date: Some(date(2024, 1, 6)),
        };
        assert_eq!(streak.advance(date(2024, 1, 7)), StreakTransition::Continued);
        assert_eq!(streak.current, 7);
        assert_eq!(streak.longest, 7);
    }

    #[test]
    fn test_gap_restarts_but_keeps_longest() {
        let mut streak = StreakState {
            current: 12,
            longest: 12,
            last_active_date: Some(date(2024, 3, 1)),
        };
        assert_eq!(streak.advance(date(2024, 3, 4)), StreakTransition::Restarted);
        assert_eq!(streak.current, 1);
        assert_eq!(streak.longest, 12);
        assert_eq!(streak.last_active_date, Some(date(2024, 3, 4)));
    }

    #[test]
    fn test_older_date_is_ignored() {
        let mut streak = StreakState {
            current: 3,
            longest: 5,
            last_active_date: Some(date(2024, 3, 10)),
        };
        let before = streak;
        assert_eq!(streak.advance(date(2024, 3, 2)), StreakTransition::AlreadyCounted);
        assert_eq!(streak, before);
    }

    #[test]
    fn test_month_boundary_is_consecutive() {
        let mut streak = StreakState {
            current: 1,
            longest: 1,
            last_active_date: Some(date(2024, 1, 31)),
        };
        assert_eq!(streak.advance(date(2024, 2, 1)), StreakTransition::Continued);
        assert_eq!(streak.current, 2);
    }

    #[test]
    fn test_category_mapping() {
        assert_eq!(
            StreakCategory::for_points(PointCategory::Workout),
            Some(StreakCategory::Workout)
        );
        assert_eq!(StreakCategory::for_points(PointCategory::Social), None);
        assert_eq!(StreakCategory::parse("mental_health"), Some(StreakCategory::MentalHealth));
        assert_eq!(StreakCategory::parse("social"), None);
    }

    fn arb_streak() -> impl Strategy<Value = StreakState> {
        (0u32..100, 0u32..100, proptest::option::of(0i64..3650)).prop_map(
            |(current, extra, offset)| StreakState {
                current,
                longest: current + extra,
                last_active_date: offset.map(|o| date(2020, 1, 1) + Duration::days(o)),
            },
        )
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Property: advancing twice with the same date equals advancing once
        #[test]
        fn prop_same_day_is_idempotent(mut streak in arb_streak(), offset in 0i64..4000) {
            let day = date(2020, 1, 1) + Duration::days(offset);
            streak.advance(day);
            let once = streak;
            prop_assert_eq!(streak.advance(day), StreakTransition::AlreadyCounted);
            prop_assert_eq!(streak, once);
        }

        /// Property: the next calendar day adds exactly one
        #[test]
        fn prop_next_day_adds_one(mut streak in arb_streak(), offset in 4000i64..8000) {
            let day = date(2020, 1, 1) + Duration::days(offset);
            streak.advance(day);
            let before = streak.current;
            streak.advance(day + Duration::days(1));
            prop_assert_eq!(streak.current, before + 1);
        }

        /// Property: a gap of two or more days resets to one
        #[test]
        fn prop_gap_resets(mut streak in arb_streak(), offset in 4000i64..8000, gap in 2i64..60) {
            let day = date(2020, 1, 1) + Duration::days(offset);
            streak.advance(day);
            streak.advance(day + Duration::days(gap));
            prop_assert_eq!(streak.current, 1);
        }

        /// Property: longest is a high-water mark of current
        #[test]
        fn prop_longest_dominates_current(
            mut streak in arb_streak(),
            steps in prop::collection::vec(0i64..4, 1..40)
        ) {
            let mut day = date(2030, 1, 1);
            for step in steps {
                day += Duration::days(step);
                streak.advance(day);
                prop_assert!(streak.longest >= streak.current);
            }
        }
    }
}
