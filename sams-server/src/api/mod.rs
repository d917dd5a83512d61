//! HTTP API handlers for sams-server

pub mod attendance;
pub mod health;
pub mod meals;
pub mod settings;
pub mod students;

pub use attendance::attendance_routes;
pub use health::health_routes;
pub use meals::meal_routes;
pub use settings::settings_routes;
pub use students::student_routes;

use crate::ApiError;
use chrono::NaiveDate;

/// Parse an optional `YYYY-MM-DD` query parameter, defaulting to today (UTC)
pub(crate) fn date_or_today(date: Option<&str>) -> Result<NaiveDate, ApiError> {
    match date.map(str::trim).filter(|d| !d.is_empty()) {
        Some(d) => NaiveDate::parse_from_str(d, "%Y-%m-%d")
            .map_err(|_| ApiError::BadRequest(format!("date must be YYYY-MM-DD, got '{}'", d))),
        None => Ok(sams_common::time::today()),
    }
}

/// Require a non-empty ISO-8601 timestamp field
pub(crate) fn require_timestamp(timestamp: Option<String>) -> Result<String, ApiError> {
    let timestamp = timestamp
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::BadRequest("timestamp is required".to_string()))?;

    if !sams_common::time::is_valid_timestamp(&timestamp) {
        return Err(ApiError::BadRequest(format!(
            "timestamp must be ISO-8601, got '{}'",
            timestamp
        )));
    }

    Ok(timestamp)
}
