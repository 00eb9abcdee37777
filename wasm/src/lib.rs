//! Fitness Progression WASM Module
//!
//! Exposes the level curve, streak preview and achievement catalog to the
//! browser so the UI renders progress bars and badges with the exact rules
//! the backend applies.

use chrono::NaiveDate;
use fitness_progression_shared::achievements::AchievementId;
use fitness_progression_shared::level;
use fitness_progression_shared::streak::{StreakState, StreakTransition};
use wasm_bindgen::prelude::*;

/// Level reached with `total_points`
#[wasm_bindgen]
pub fn level_of(total_points: u32) -> u8 {
    level::level_of(i64::from(total_points))
}

/// Minimum cumulative points for `level`
#[wasm_bindgen]
pub fn points_for_level(level: u8) -> u32 {
    level::points_for_level(level) as u32
}

/// Progress towards the next level as a percentage in [0, 100]
#[wasm_bindgen]
pub fn level_progress(total_points: u32) -> f64 {
    let total = i64::from(total_points);
    level::level_progress(total, level::level_of(total))
}

/// Points still needed to reach the next level
#[wasm_bindgen]
pub fn points_to_next_level(total_points: u32) -> u32 {
    level::points_to_next_level(i64::from(total_points)) as u32
}

/// Preview what logging activity on `activity_date` would do to a streak
///
/// Dates are ISO `YYYY-MM-DD`. Returns `already_counted`, `continued`,
/// `restarted`, or `invalid_date` when a date cannot be parsed.
#[wasm_bindgen]
pub fn streak_transition(last_active_date: Option<String>, activity_date: &str) -> String {
    let parse = |s: &str| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok();

    let Some(activity) = parse(activity_date) else {
        return "invalid_date".to_string();
    };
    let last = match last_active_date.as_deref().map(parse) {
        Some(None) => return "invalid_date".to_string(),
        Some(date) => date,
        None => None,
    };

    let state = StreakState {
        last_active_date: last,
        ..StreakState::default()
    };
    match state.transition_for(activity) {
        StreakTransition::AlreadyCounted => "already_counted",
        StreakTransition::Continued => "continued",
        StreakTransition::Restarted => "restarted",
    }
    .to_string()
}

/// Display name of an achievement id, or `None` for ids outside the catalog
#[wasm_bindgen]
pub fn achievement_name(id: &str) -> Option<String> {
    id.parse::<AchievementId>()
        .ok()
        .map(|id| id.definition().name)
}

/// Tier (`bronze`, `silver`, `gold`) of an achievement id
#[wasm_bindgen]
pub fn achievement_tier(id: &str) -> Option<String> {
    let id = id.parse::<AchievementId>().ok()?;
    serde_json::to_value(id.definition().tier())
        .ok()
        .and_then(|value| value.as_str().map(str::to_string))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_bindings() {
        assert_eq!(level_of(700), 2);
        assert_eq!(points_for_level(3), 1500);
        assert_eq!(points_to_next_level(700), 800);
        assert!((level_progress(1000) - 50.0).abs() < 0.001);
        assert_eq!(level_progress(40_000), 100.0);
    }

    #[test]
    fn test_streak_preview() {
        assert_eq!(streak_transition(None, "2024-01-07"), "restarted");
        assert_eq!(
            streak_transition(Some("2024-01-06".to_string()), "2024-01-07"),
            "continued"
        );
        assert_eq!(
            streak_transition(Some("2024-01-07".to_string()), "2024-01-07"),
            "already_counted"
        );
        assert_eq!(streak_transition(Some("yesterday".to_string()), "2024-01-07"), "invalid_date");
    }

    #[test]
    fn test_achievement_lookup() {
        assert_eq!(achievement_name("week_streak").as_deref(), Some("Week Streak"));
        assert_eq!(achievement_tier("month_streak").as_deref(), Some("gold"));
        assert_eq!(achievement_name("unknown"), None);
    }
}
