//! Weekly and monthly points reset scheduler
//!
//! A background task wakes on a fixed interval and compares the start of the
//! current week/month window with the last window recorded in the database.
//! When a boundary has passed it claims the new window and zeroes the
//! matching counter on every account. The claim is a conditional upsert, so
//! with several instances running only the first one to claim resets. It
//! commits only once the accounts to reset are known, so a tick that fails
//! before that point is retried on the next one.
//!
//! On a fresh database the current window is recorded as the baseline
//! without resetting, so points earned before the first boundary survive.

use crate::config::ProgressionConfig;
use crate::repositories::PeriodRepository;
use crate::services::LedgerService;
use anyhow::Result;
use chrono::{DateTime, Utc};
use fitness_progression_shared::models::ResetPeriod;
use sqlx::PgPool;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info};

/// What to do for one period on a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetAction {
    /// Nothing recorded yet; remember the current window
    RecordBaseline,
    /// A boundary passed since the recorded window
    Reset,
    /// Still inside the recorded window
    Wait,
}

/// Decide the action from the last recorded window and the current one
pub fn reset_action(last: Option<DateTime<Utc>>, current: DateTime<Utc>) -> ResetAction {
    match last {
        None => ResetAction::RecordBaseline,
        Some(last) if last < current => ResetAction::Reset,
        Some(_) => ResetAction::Wait,
    }
}

/// Spawn the reset loop, or return `None` when the scheduler is disabled
pub fn spawn(pool: PgPool, config: &ProgressionConfig) -> Option<JoinHandle<()>> {
    if !config.scheduler_enabled {
        info!("Period reset scheduler disabled");
        return None;
    }

    let every = Duration::from_secs(config.reset_check_interval_secs.max(1));
    let handle = tokio::spawn(async move {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            for period in ResetPeriod::ALL {
                if let Err(e) = run_once(&pool, period, Utc::now()).await {
                    error!(period = %period, error = %e, "Period reset check failed");
                }
            }
        }
    });

    info!(interval_secs = every.as_secs(), "Period reset scheduler started");
    Some(handle)
}

/// One scheduler check for `period` at `now`
pub async fn run_once(pool: &PgPool, period: ResetPeriod, now: DateTime<Utc>) -> Result<ResetAction> {
    let current = period.window_start(now);
    let last = PeriodRepository::last_window(pool, period).await?;
    let action = reset_action(last, current);

    match action {
        ResetAction::RecordBaseline => {
            PeriodRepository::record_baseline(pool, period, current).await?;
            info!(period = %period, window_start = %current, "Recorded reset baseline");
        }
        ResetAction::Reset => {
            if LedgerService::claim_and_reset(pool, period, current, false, now)
                .await?
                .is_none()
            {
                debug!(period = %period, "Reset already claimed by another instance");
            }
        }
        ResetAction::Wait => {}
    }

    Ok(action)
}
