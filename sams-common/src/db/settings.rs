//! Runtime settings accessors
//!
//! Key-value `settings` table. Recognition settings are read fresh for every
//! matching or session-resolution operation, so an administrative update takes
//! effect on the next request without a restart.

use crate::db::models::{RecognitionSettings, SessionSlot, SlotBoundaries};
use crate::time::{format_hh_mm, parse_hh_mm};
use crate::{Error, Result};
use sqlx::SqlitePool;

pub const KEY_RECOGNITION_THRESHOLD: &str = "recognition_threshold";
pub const KEY_MORNING_START: &str = "morning_session_start";
pub const KEY_MORNING_END: &str = "morning_session_end";
pub const KEY_MEAL_START: &str = "meal_session_start";
pub const KEY_MEAL_END: &str = "meal_session_end";
pub const KEY_AFTERNOON_START: &str = "afternoon_session_start";
pub const KEY_AFTERNOON_END: &str = "afternoon_session_end";

/// Load threshold and slot boundaries
///
/// Missing keys fall back to built-in defaults; present but malformed values
/// are a configuration error.
pub async fn load_recognition_settings(db: &SqlitePool) -> Result<RecognitionSettings> {
    let defaults = RecognitionSettings::default();

    let threshold = get_setting::<f64>(db, KEY_RECOGNITION_THRESHOLD)
        .await?
        .unwrap_or(defaults.threshold);

    let slots = SlotBoundaries {
        morning: load_slot(db, KEY_MORNING_START, KEY_MORNING_END, defaults.slots.morning).await?,
        meal: load_slot(db, KEY_MEAL_START, KEY_MEAL_END, defaults.slots.meal).await?,
        afternoon: load_slot(
            db,
            KEY_AFTERNOON_START,
            KEY_AFTERNOON_END,
            defaults.slots.afternoon,
        )
        .await?,
    };

    Ok(RecognitionSettings { threshold, slots })
}

async fn load_slot(
    db: &SqlitePool,
    start_key: &str,
    end_key: &str,
    default: SessionSlot,
) -> Result<SessionSlot> {
    let start = match get_setting::<String>(db, start_key).await? {
        Some(value) => parse_slot_time(start_key, &value)?,
        None => default.start,
    };
    let end = match get_setting::<String>(db, end_key).await? {
        Some(value) => parse_slot_time(end_key, &value)?,
        None => default.end,
    };

    Ok(SessionSlot { start, end })
}

fn parse_slot_time(key: &str, value: &str) -> Result<chrono::NaiveTime> {
    parse_hh_mm(value)
        .ok_or_else(|| Error::Config(format!("Setting '{}' is not HH:MM: {}", key, value)))
}

/// Persist the full recognition settings in one transaction
pub async fn save_recognition_settings(
    db: &SqlitePool,
    settings: &RecognitionSettings,
) -> Result<()> {
    let slots = &settings.slots;
    let values = [
        (KEY_RECOGNITION_THRESHOLD, settings.threshold.to_string()),
        (KEY_MORNING_START, format_hh_mm(slots.morning.start)),
        (KEY_MORNING_END, format_hh_mm(slots.morning.end)),
        (KEY_MEAL_START, format_hh_mm(slots.meal.start)),
        (KEY_MEAL_END, format_hh_mm(slots.meal.end)),
        (KEY_AFTERNOON_START, format_hh_mm(slots.afternoon.start)),
        (KEY_AFTERNOON_END, format_hh_mm(slots.afternoon.end)),
    ];

    let mut tx = db.begin().await?;
    for (key, value) in values {
        sqlx::query(
            "INSERT INTO settings (key, value, updated_at) VALUES (?, ?, CURRENT_TIMESTAMP)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        )
        .bind(key)
        .bind(value)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;

    Ok(())
}

/// Generic setting getter
///
/// NULL values read as `None`.
pub async fn get_setting<T>(db: &SqlitePool, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let row: Option<(Option<String>,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(db)
        .await
        .map_err(Error::Database)?;

    match row.and_then(|(value,)| value) {
        Some(value) => {
            let parsed = value
                .trim()
                .parse::<T>()
                .map_err(|e| Error::Config(format!("Parse setting '{}' failed: {}", key, e)))?;
            Ok(Some(parsed))
        }
        None => Ok(None),
    }
}

/// Generic setting setter
pub async fn set_setting<T>(db: &SqlitePool, key: &str, value: T) -> Result<()>
where
    T: std::fmt::Display,
{
    sqlx::query(
        "INSERT INTO settings (key, value, updated_at) VALUES (?, ?, CURRENT_TIMESTAMP)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
    )
    .bind(key)
    .bind(value.to_string())
    .execute(db)
    .await
    .map_err(Error::Database)?;

    Ok(())
}
