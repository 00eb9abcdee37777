//! Input validation functions
//!
//! Field-level rules live on the request types as `validator` derives.
//! The checks here need context the derive cannot express (today's date,
//! configured limits) or normalize free text.

use chrono::{Duration, NaiveDate};
use validator::ValidationErrors;

/// How far ahead of the server's date an activity may be stamped
///
/// Clients east of UTC legitimately report "tomorrow" for a few hours.
pub const MAX_ACTIVITY_DATE_SKEW_DAYS: i64 = 1;

/// Validate an activity date against the server's current date
pub fn validate_activity_date(date: NaiveDate, today: NaiveDate) -> Result<(), String> {
    if date > today + Duration::days(MAX_ACTIVITY_DATE_SKEW_DAYS) {
        return Err("Activity date cannot be in the future".to_string());
    }
    if date < NaiveDate::from_ymd_opt(2000, 1, 1).unwrap_or(NaiveDate::MIN) {
        return Err("Activity date is too far in the past".to_string());
    }
    Ok(())
}

/// Validate a requested leaderboard size
pub fn validate_leaderboard_limit(limit: u32, max: u32) -> Result<(), String> {
    if limit == 0 {
        return Err("Limit must be at least 1".to_string());
    }
    if limit > max {
        return Err(format!("Limit must be at most {}", max));
    }
    Ok(())
}

/// Trim a display name, treating blank input as absent
pub fn normalize_display_name(name: Option<&str>) -> Option<String> {
    name.map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
}

/// Validate an idempotency key: printable ASCII without whitespace
pub fn validate_event_id(event_id: &str) -> Result<(), String> {
    if event_id.is_empty() {
        return Err("Event id cannot be empty".to_string());
    }
    if !event_id.chars().all(|c| c.is_ascii_graphic()) {
        return Err("Event id must be printable ASCII without spaces".to_string());
    }
    Ok(())
}

/// First human-readable message out of a `validator` error set
pub fn first_error_message(errors: &ValidationErrors) -> (String, String) {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));

    for (field, field_errors) in fields {
        if let Some(error) = field_errors.first() {
            let message = error
                .message
                .as_ref()
                .map(|m| m.to_string())
                .unwrap_or_else(|| format!("Invalid value for {}", field));
            return (field.to_string(), message);
        }
    }

    (String::new(), "Invalid request".to_string())
}
