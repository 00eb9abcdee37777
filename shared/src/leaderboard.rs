//! Leaderboard ranking
//!
//! The database already returns candidates ordered by the requested period,
//! but ranking is kept here as a pure function so the tie-breaking rules are
//! the same everywhere and testable without storage.

use crate::models::LeaderboardPeriod;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Account projection used to build a leaderboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardCandidate {
    pub user_id: Uuid,
    pub display_name: Option<String>,
    pub weekly_points: i64,
    pub monthly_points: i64,
    pub total_points: i64,
    pub level: u8,
    pub current_streak: u32,
    pub achievement_count: u32,
}

impl LeaderboardCandidate {
    /// Points counted for `period`
    pub fn points(&self, period: LeaderboardPeriod) -> i64 {
        match period {
            LeaderboardPeriod::Weekly => self.weekly_points,
            LeaderboardPeriod::Monthly => self.monthly_points,
            LeaderboardPeriod::AllTime => self.total_points,
        }
    }
}

/// One ranked row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub rank: u32,
    pub user_id: Uuid,
    pub display_name: String,
    pub points: i64,
    pub level: u8,
    pub current_streak: u32,
    pub achievement_count: u32,
}

/// Name shown for users who never set one
pub fn display_name_or_default(display_name: Option<&str>, user_id: Uuid) -> String {
    match display_name.map(str::trim).filter(|name| !name.is_empty()) {
        Some(name) => name.to_string(),
        None => {
            let id = user_id.simple().to_string();
            format!("User {}", &id[..8])
        }
    }
}

/// Rank `candidates` by their points for `period`, keeping at most `limit` rows
///
/// Ranks are dense positions starting at 1. Equal scores keep the order the
/// candidates arrived in.
pub fn rank(
    mut candidates: Vec<LeaderboardCandidate>,
    period: LeaderboardPeriod,
    limit: usize,
) -> Vec<LeaderboardEntry> {
    candidates.sort_by(|a, b| b.points(period).cmp(&a.points(period)));

    candidates
        .into_iter()
        .take(limit)
        .enumerate()
        .map(|(index, candidate)| LeaderboardEntry {
            rank: index as u32 + 1,
            display_name: display_name_or_default(
                candidate.display_name.as_deref(),
                candidate.user_id,
            ),
            points: candidate.points(period),
            user_id: candidate.user_id,
            level: candidate.level,
            current_streak: candidate.current_streak,
            achievement_count: candidate.achievement_count,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn candidate(weekly: i64, monthly: i64, total: i64) -> LeaderboardCandidate {
        LeaderboardCandidate {
            user_id: Uuid::new_v4(),
            display_name: None,
            weekly_points: weekly,
            monthly_points: monthly,
            total_points: total,
            level: 1,
            current_streak: 0,
            achievement_count: 0,
        }
    }

    #[test]
    fn test_weekly_ordering_and_limit() {
        let a = candidate(100, 0, 100);
        let b = candidate(300, 0, 300);
        let c = candidate(200, 0, 200);
        let entries = rank(vec![a.clone(), b.clone(), c.clone()], LeaderboardPeriod::Weekly, 2);

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].user_id, b.user_id);
        assert_eq!(entries[0].rank, 1);
        assert_eq!(entries[0].points, 300);
        assert_eq!(entries[1].user_id, c.user_id);
        assert_eq!(entries[1].rank, 2);
    }

    #[test]
    fn test_period_selects_counter() {
        let a = candidate(500, 10, 10);
        let b = candidate(10, 500, 20);

        let monthly = rank(vec![a.clone(), b.clone()], LeaderboardPeriod::Monthly, 10);
        assert_eq!(monthly[0].user_id, b.user_id);

        let all_time = rank(vec![a, b.clone()], LeaderboardPeriod::AllTime, 10);
        assert_eq!(all_time[0].user_id, b.user_id);
        assert_eq!(all_time[0].points, 20);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let first = candidate(50, 0, 0);
        let second = candidate(50, 0, 0);
        let entries = rank(vec![first.clone(), second.clone()], LeaderboardPeriod::Weekly, 10);
        assert_eq!(entries[0].user_id, first.user_id);
        assert_eq!(entries[1].user_id, second.user_id);
    }

    #[test]
    fn test_empty_board() {
        assert!(rank(Vec::new(), LeaderboardPeriod::AllTime, 10).is_empty());
    }

    #[test]
    fn test_display_name_fallback() {
        let user_id = Uuid::parse_str("3f2b8c1a-0000-4000-8000-000000000000").unwrap();
        assert_eq!(display_name_or_default(None, user_id), "User 3f2b8c1a");
        assert_eq!(display_name_or_default(Some("  "), user_id), "User 3f2b8c1a");
        assert_eq!(display_name_or_default(Some("Sam"), user_id), "Sam");
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Property: points are non-increasing and ranks are 1..=n
        #[test]
        fn prop_ranked_order(
            scores in prop::collection::vec(0i64..10_000, 0..40),
            limit in 0usize..50
        ) {
            let candidates = scores.iter().map(|&s| candidate(s, s, s)).collect();
            let entries = rank(candidates, LeaderboardPeriod::Weekly, limit);

            prop_assert_eq!(entries.len(), scores.len().min(limit));
            for (index, pair) in entries.windows(2).enumerate() {
                prop_assert!(pair[0].points >= pair[1].points);
                prop_assert_eq!(pair[0].rank as usize, index + 1);
            }
        }
    }
}
