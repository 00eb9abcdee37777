//! Integration tests for the progression API
//!
//! Drive the internal and user-facing endpoints against a real database.

mod common;

use axum::http::StatusCode;
use chrono::{Duration, NaiveDate, Utc};
use common::{Caller, TestApp};
use fitness_progression_backend::repositories::{PeriodRepository, RedemptionRepository};
use fitness_progression_backend::scheduler::{self, ResetAction};
use fitness_progression_backend::services::LedgerService;
use fitness_progression_shared::models::ResetPeriod;
use fitness_progression_shared::rewards::Redemption;
use serde_json::json;
use uuid::Uuid;

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_initialize_is_idempotent() {
    let app = TestApp::new().await;
    let user_id = app.create_account("Robin").await;

    let (status, body) = app
        .post_internal(&format!("/internal/accounts/{}", user_id), json!({}))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_points"], 0);
    assert_eq!(body["level"], 1);
    assert_eq!(body["display_name"], "Robin");
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_award_without_account_is_conflict() {
    let app = TestApp::new().await;

    let (status, body) = app.award(Uuid::new_v4(), 50, "workout").await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "ACCOUNT_NOT_INITIALIZED");
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_award_crossing_level_threshold_pays_bonus() {
    let app = TestApp::new().await;
    let user_id = app.create_account("Sam").await;

    let (status, body) = app.award(user_id, 600, "workout").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["points_awarded"], 600);
    assert_eq!(body["previous_level"], 1);
    assert_eq!(body["new_level"], 2);
    assert_eq!(body["level_up_bonus"], 100);
    assert_eq!(body["total_points"], 700);
    assert_eq!(body["achievements_unlocked"], json!(["level_2"]));

    let (status, me) = app.get_as(user_id, "/api/v1/progress/me").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["total_points"], 700);
    assert_eq!(me["monthly_points"], 700);
    assert_eq!(me["points_to_next_level"], 800);

    let (status, history) = app.get_as(user_id, "/api/v1/progress/me/history").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history["total"], 2);
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_award_rejects_unknown_category_and_bad_amount() {
    let app = TestApp::new().await;
    let user_id = app.create_account("Alex").await;

    let (status, _) = app.award(user_id, 10, "gardening").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.award(user_id, 0, "workout").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_duplicate_event_id_is_applied_once() {
    let app = TestApp::new().await;
    let user_id = app.create_account("Jo").await;
    let path = format!("/internal/accounts/{}/points", user_id);
    let body = json!({
        "amount": 40,
        "reason": "Workout completed",
        "category": "workout",
        "event_id": "workout-8812",
    });

    let (status, first) = app.post_internal(&path, body.clone()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["duplicate"], false);

    let (status, second) = app.post_internal(&path, body).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["duplicate"], true);
    assert_eq!(second["total_points"], 40);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "requires database"]
async fn test_concurrent_awards_are_not_lost() {
    let app = TestApp::new().await;
    let user_id = app.create_account("Parallel").await;

    let mut handles = Vec::new();
    for _ in 0..20 {
        let app = app.clone();
        handles.push(tokio::spawn(async move {
            app.award(user_id, 10, "diet").await.0
        }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap(), StatusCode::OK);
    }

    let (_, me) = app.get_as(user_id, "/api/v1/progress/me").await;
    assert_eq!(me["total_points"], 200);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "requires database"]
async fn test_concurrent_awards_unlock_achievement_once() {
    let app = TestApp::new().await;
    let user_id = app.create_account("Racer").await;

    for _ in 0..9 {
        app.award(user_id, 10, "workout").await;
    }

    // Every one of these sees at least ten workouts
    let mut handles = Vec::new();
    for _ in 0..8 {
        let app = app.clone();
        handles.push(tokio::spawn(async move {
            app.award(user_id, 10, "workout").await.0
        }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap(), StatusCode::OK);
    }

    let unlocked: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM user_achievements WHERE user_id = $1 AND achievement_id = 'workout_warrior'",
    )
    .bind(user_id)
    .fetch_one(&app.pool)
    .await
    .unwrap();
    assert_eq!(unlocked, 1);

    let bonuses: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM points_transactions WHERE user_id = $1 AND reason LIKE 'Achievement unlocked:%'",
    )
    .bind(user_id)
    .fetch_one(&app.pool)
    .await
    .unwrap();
    assert_eq!(bonuses, 1);

    let (_, me) = app.get_as(user_id, "/api/v1/progress/me").await;
    assert_eq!(me["total_points"], 17 * 10 + 50);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "requires database"]
async fn test_concurrent_streak_advances_unlock_once() {
    let app = TestApp::new().await;
    let user_id = app.create_account("Daily").await;

    for d in 1..=6 {
        app.advance_streak(user_id, day(d), None).await;
    }

    let mut handles = Vec::new();
    for _ in 0..8 {
        let app = app.clone();
        handles.push(tokio::spawn(async move {
            app.advance_streak(user_id, day(7), None).await.0
        }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap(), StatusCode::OK);
    }

    let unlocked: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM user_achievements WHERE user_id = $1 AND achievement_id = 'week_streak'",
    )
    .bind(user_id)
    .fetch_one(&app.pool)
    .await
    .unwrap();
    assert_eq!(unlocked, 1);

    let (_, me) = app.get_as(user_id, "/api/v1/progress/me").await;
    assert_eq!(me["current_streak"], 7);
    assert_eq!(me["total_points"], 50);
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_week_streak_unlocks_once() {
    let app = TestApp::new().await;
    let user_id = app.create_account("Streaker").await;

    for d in 1..=6 {
        let (status, body) = app.advance_streak(user_id, day(d), Some("workout")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["current_streak"], d);
    }

    let (_, body) = app.advance_streak(user_id, day(7), Some("workout")).await;
    assert_eq!(body["current_streak"], 7);
    assert_eq!(body["achievements_unlocked"], json!(["week_streak"]));
    assert_eq!(body["bonus_points"], 50);
    assert_eq!(body["category_streak"]["current_streak"], 7);

    let (_, again) = app.advance_streak(user_id, day(7), None).await;
    assert_eq!(again["transition"], "already_counted");
    assert_eq!(again["achievements_unlocked"], json!([]));
    assert_eq!(again["total_points"], 50);

    let (_, achievements) = app.get_as(user_id, "/api/v1/progress/me/achievements").await;
    let unlocked: Vec<_> = achievements["unlocked"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(unlocked, vec!["week_streak"]);
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_streak_gap_restarts() {
    let app = TestApp::new().await;
    let user_id = app.create_account("Gappy").await;

    app.advance_streak(user_id, day(10), None).await;
    let (_, next) = app.advance_streak(user_id, day(11), None).await;
    assert_eq!(next["current_streak"], 2);

    let (_, gap) = app.advance_streak(user_id, day(14), None).await;
    assert_eq!(gap["transition"], "restarted");
    assert_eq!(gap["current_streak"], 1);
    assert_eq!(gap["longest_streak"], 2);
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_future_activity_date_rejected() {
    let app = TestApp::new().await;
    let user_id = app.create_account("Timey").await;
    let far_future = chrono::Utc::now().date_naive() + Duration::days(5);

    let (status, body) = app.advance_streak(user_id, far_future, None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["field"], "activity_date");
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_redeem_until_limit() {
    let app = TestApp::new().await;
    let user_id = app.create_account("Spender").await;
    let reward_id = app
        .create_reward(json!({
            "name": "Smoothie voucher",
            "category": "discount",
            "points_cost": 500,
            "limit_per_user": 1,
            "validity_days": 30,
        }))
        .await;

    // Crossing 500 adds the level 2 bonus
    app.award(user_id, 400, "workout").await;
    app.award(user_id, 100, "social").await;
    let (_, me) = app.get_as(user_id, "/api/v1/progress/me").await;
    assert_eq!(me["total_points"], 600);

    let (_, rewards) = app.get_as(user_id, "/api/v1/rewards").await;
    assert!(rewards
        .as_array()
        .unwrap()
        .iter()
        .any(|r| r["id"] == reward_id.to_string()));

    let path = format!("/api/v1/rewards/{}/redeem", reward_id);
    let (status, redeemed) = app.post_as(user_id, &path).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(redeemed["remaining_points"], 100);
    assert!(redeemed["expires_at"].is_string());
    let code = redeemed["redemption_code"].as_str().unwrap();
    assert_eq!(code, code.to_uppercase());

    let (status, second) = app.post_as(user_id, &path).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(second["error"]["code"], "REDEMPTION_LIMIT_REACHED");

    let (_, me) = app.get_as(user_id, "/api/v1/progress/me").await;
    assert_eq!(me["total_points"], 100);
    assert_eq!(me["level"], 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "requires database"]
async fn test_concurrent_redeems_respect_limit() {
    let app = TestApp::new().await;
    let user_id = app.create_account("Rusher").await;
    let reward_id = app
        .create_reward(json!({
            "name": "Gym towel",
            "category": "merchandise",
            "points_cost": 100,
            "limit_per_user": 1,
        }))
        .await;
    app.award(user_id, 1000, "workout").await;
    let (_, before) = app.get_as(user_id, "/api/v1/progress/me").await;
    let before = before["total_points"].as_i64().unwrap();

    let path = format!("/api/v1/rewards/{}/redeem", reward_id);
    let mut handles = Vec::new();
    for _ in 0..10 {
        let app = app.clone();
        let path = path.clone();
        handles.push(tokio::spawn(async move { app.post_as(user_id, &path).await }));
    }

    let mut created = 0;
    for handle in handles {
        let (status, body) = handle.await.unwrap();
        if status == StatusCode::CREATED {
            created += 1;
        } else {
            assert_eq!(status, StatusCode::CONFLICT);
            assert_eq!(body["error"]["code"], "REDEMPTION_LIMIT_REACHED");
        }
    }
    assert_eq!(created, 1);

    let (_, me) = app.get_as(user_id, "/api/v1/progress/me").await;
    assert_eq!(me["total_points"], before - 100);

    let (_, listed) = app.get_as(user_id, "/api/v1/rewards/redemptions").await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_redemption_codes_may_repeat() {
    let app = TestApp::new().await;
    let user_id = app.create_account("Twin").await;
    let reward_id = app
        .create_reward(json!({
            "name": "Protein bar",
            "category": "discount",
            "points_cost": 10,
        }))
        .await;

    let redemption = |code: &str| Redemption {
        id: Uuid::new_v4(),
        user_id,
        reward_id,
        code: code.to_string(),
        points_spent: 10,
        redeemed_at: Utc::now(),
        expires_at: None,
        used: false,
        used_at: None,
    };

    RedemptionRepository::create(&app.pool, &redemption("LQ2K3X-ABC123"))
        .await
        .unwrap();
    RedemptionRepository::create(&app.pool, &redemption("LQ2K3X-ABC123"))
        .await
        .unwrap();
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_redeem_insufficient_points() {
    let app = TestApp::new().await;
    let user_id = app.create_account("Saver").await;
    let reward_id = app
        .create_reward(json!({
            "name": "Yoga retreat",
            "category": "experience",
            "points_cost": 50000,
        }))
        .await;
    app.award(user_id, 100, "mental_health").await;

    let (status, body) = app
        .post_as(user_id, &format!("/api/v1/rewards/{}/redeem", reward_id))
        .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "INSUFFICIENT_POINTS");

    let (_, all) = app.get_as(user_id, "/api/v1/rewards?all=true").await;
    let listed = all
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["id"] == reward_id.to_string())
        .cloned()
        .unwrap();
    assert_eq!(listed["affordable"], false);
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_redeem_unknown_reward_is_not_found() {
    let app = TestApp::new().await;
    let user_id = app.create_account("Lost").await;

    let (status, _) = app
        .post_as(user_id, &format!("/api/v1/rewards/{}/redeem", Uuid::new_v4()))
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_mark_redemption_used_once() {
    let app = TestApp::new().await;
    let user_id = app.create_account("Redeemer").await;
    let reward_id = app
        .create_reward(json!({
            "name": "Water bottle",
            "category": "merchandise",
            "points_cost": 100,
        }))
        .await;
    app.award(user_id, 150, "workout").await;

    let (_, redeemed) = app
        .post_as(user_id, &format!("/api/v1/rewards/{}/redeem", reward_id))
        .await;
    let redemption_id = redeemed["redemption_id"].as_str().unwrap().to_string();
    let use_path = format!("/api/v1/rewards/redemptions/{}/use", redemption_id);

    let (status, used) = app.post_as(user_id, &use_path).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(used["used"], true);

    let (status, _) = app.post_as(user_id, &use_path).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app.post_as(Uuid::new_v4(), &use_path).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, listed) = app.get_as(user_id, "/api/v1/rewards/redemptions").await;
    assert_eq!(listed[0]["reward_name"], "Water bottle");
    assert_eq!(listed[0]["used"], true);
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_leaderboard_orders_by_period_points() {
    let app = TestApp::new().await;
    let leader = app.create_account("Leader").await;
    let runner_up = app.create_account("Runner Up").await;

    app.award(runner_up, 99_000, "workout").await;
    app.award(leader, 100_000, "workout").await;

    let (status, board) = app
        .get_as(leader, "/api/v1/leaderboard?period=all_time&limit=100")
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(board["period"], "all_time");

    let entries = board["entries"].as_array().unwrap();
    for (index, entry) in entries.iter().enumerate() {
        assert_eq!(entry["rank"], index + 1);
    }
    let position = |id: Uuid| {
        entries
            .iter()
            .position(|e| e["user_id"] == id.to_string())
            .unwrap()
    };
    assert!(position(leader) < position(runner_up));
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_weekly_reset_keeps_total() {
    let app = TestApp::new().await;
    let user_id = app.create_account("Resetter").await;
    app.award(user_id, 300, "diet").await;

    let (status, reset) = app
        .post_internal("/internal/periods/weekly/reset", json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reset["period"], "weekly");

    let (_, me) = app.get_as(user_id, "/api/v1/progress/me").await;
    assert_eq!(me["weekly_points"], 0);
    assert_eq!(me["monthly_points"], 300);
    assert_eq!(me["total_points"], 300);
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_uncommitted_claim_is_retried() {
    let app = TestApp::new().await;
    let period = ResetPeriod::Weekly;

    let last = PeriodRepository::last_window(&app.pool, period).await.unwrap();
    let base = match last {
        Some(window) => window,
        None => {
            let window = period.window_start(Utc::now());
            PeriodRepository::record_baseline(&app.pool, period, window)
                .await
                .unwrap();
            window
        }
    };
    // A tick one boundary past whatever is recorded
    let now = base + Duration::weeks(1) + Duration::hours(1);
    let window = period.window_start(now);

    // Claim, then abandon the transaction as a failed account snapshot would
    let mut tx = app.pool.begin().await.unwrap();
    let ids = LedgerService::claim_reset(&mut tx, period, window, false)
        .await
        .unwrap();
    assert!(ids.is_some());
    tx.rollback().await.unwrap();

    assert_ne!(
        PeriodRepository::last_window(&app.pool, period).await.unwrap(),
        Some(window)
    );

    let action = scheduler::run_once(&app.pool, period, now).await.unwrap();
    assert_eq!(action, ResetAction::Reset);
    assert_eq!(
        PeriodRepository::last_window(&app.pool, period).await.unwrap(),
        Some(window)
    );
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_internal_routes_need_service_token() {
    let app = TestApp::new().await;

    let (status, _) = app
        .send(
            "POST",
            "/internal/periods/weekly/reset",
            Caller::User(Uuid::new_v4()),
            None,
        )
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
