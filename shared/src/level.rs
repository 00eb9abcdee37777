//! Level curve calculations
//!
//! Maps a cumulative point total onto a level between 1 and [`MAX_LEVEL`].
//! All functions are pure and total: they never fail and never panic.

/// Highest reachable level
pub const MAX_LEVEL: u8 = 10;

/// Minimum cumulative points for levels 1 through 10
pub const LEVEL_THRESHOLDS: [i64; MAX_LEVEL as usize] =
    [0, 500, 1500, 3000, 5000, 8000, 12000, 17000, 23000, 30000];

/// Level reached with `total_points` cumulative points
///
/// Negative totals are treated as zero.
pub fn level_of(total_points: i64) -> u8 {
    let reached = LEVEL_THRESHOLDS
        .iter()
        .take_while(|&&threshold| total_points >= threshold)
        .count();
    (reached.max(1) as u8).min(MAX_LEVEL)
}

/// Minimum cumulative points required for `level`
///
/// Levels outside 1..=10 are clamped into range.
pub fn points_for_level(level: u8) -> i64 {
    let index = level.clamp(1, MAX_LEVEL) as usize - 1;
    LEVEL_THRESHOLDS[index]
}

/// Percentage progress from `level` towards the next level, in [0, 100]
///
/// At the top level progress is always 100.
pub fn level_progress(total_points: i64, level: u8) -> f64 {
    if level >= MAX_LEVEL {
        return 100.0;
    }

    let floor = points_for_level(level);
    let ceiling = points_for_level(level + 1);
    let span = (ceiling - floor) as f64;

    let progress = (total_points - floor) as f64 / span * 100.0;
    progress.clamp(0.0, 100.0)
}

/// Points still needed to reach the next level (0 at the top level)
pub fn points_to_next_level(total_points: i64) -> i64 {
    let level = level_of(total_points);
    if level >= MAX_LEVEL {
        return 0;
    }
    (points_for_level(level + 1) - total_points).max(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, 1)]
    #[case(499, 1)]
    #[case(500, 2)]
    #[case(1499, 2)]
    #[case(1500, 3)]
    #[case(12000, 7)]
    #[case(29999, 9)]
    #[case(30000, 10)]
    #[case(1_000_000, 10)]
    #[case(-50, 1)]
    fn test_level_table(#[case] total: i64, #[case] expected: u8) {
        assert_eq!(level_of(total), expected);
    }

    #[test]
    fn test_points_for_level_clamps() {
        assert_eq!(points_for_level(0), 0);
        assert_eq!(points_for_level(1), 0);
        assert_eq!(points_for_level(10), 30000);
        assert_eq!(points_for_level(42), 30000);
    }

    #[test]
    fn test_level_progress_midway() {
        // Level 2 spans 500..1500
        assert!((level_progress(1000, 2) - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_level_progress_at_max_level() {
        assert_eq!(level_progress(45000, MAX_LEVEL), 100.0);
    }

    #[test]
    fn test_points_to_next_level() {
        assert_eq!(points_to_next_level(0), 500);
        assert_eq!(points_to_next_level(700), 800);
        assert_eq!(points_to_next_level(30000), 0);
    }

    #[test]
    fn test_threshold_maps_to_its_level() {
        for level in 1..=MAX_LEVEL {
            assert_eq!(level_of(points_for_level(level)), level);
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Property: level never decreases as points grow
        #[test]
        fn prop_level_monotonic(a in 0i64..50_000, b in 0i64..50_000) {
            let (low, high) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(level_of(low) <= level_of(high));
        }

        /// Property: level always stays within 1..=10
        #[test]
        fn prop_level_in_range(total in any::<i64>()) {
            let level = level_of(total);
            prop_assert!((1..=MAX_LEVEL).contains(&level));
        }

        /// Property: progress is clamped to [0, 100]
        #[test]
        fn prop_progress_clamped(total in -1_000i64..60_000, level in 0u8..12) {
            let progress = level_progress(total, level);
            prop_assert!((0.0..=100.0).contains(&progress));
        }

        /// Property: the total plus what remains lands on the next threshold
        #[test]
        fn prop_points_to_next_reaches_next_level(total in 0i64..29_999) {
            let remaining = points_to_next_level(total);
            prop_assert!(remaining > 0);
            prop_assert_eq!(level_of(total + remaining), level_of(total) + 1);
        }
    }
}
