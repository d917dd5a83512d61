//! Recognition settings and session lookup endpoints

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use chrono::{NaiveTime, Timelike};
use sams_common::db::settings::{load_recognition_settings, save_recognition_settings};
use sams_common::db::{RecognitionSettings, SessionSlot};
use sams_common::time::{format_hh_mm, parse_hh_mm};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::services::session_resolver::{resolve_session, ResolvedSession};
use crate::{ApiError, ApiResult, AppState};

/// Slot boundaries as `HH:MM` strings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SlotDto {
    pub start: String,
    pub end: String,
}

impl From<&SessionSlot> for SlotDto {
    fn from(slot: &SessionSlot) -> Self {
        Self {
            start: format_hh_mm(slot.start),
            end: format_hh_mm(slot.end),
        }
    }
}

/// Response for GET/PUT /api/settings
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsResponse {
    pub recognition_threshold: f64,
    pub morning_session: SlotDto,
    pub meal_session: SlotDto,
    pub afternoon_session: SlotDto,
}

impl From<&RecognitionSettings> for SettingsResponse {
    fn from(settings: &RecognitionSettings) -> Self {
        Self {
            recognition_threshold: settings.threshold,
            morning_session: SlotDto::from(&settings.slots.morning),
            meal_session: SlotDto::from(&settings.slots.meal),
            afternoon_session: SlotDto::from(&settings.slots.afternoon),
        }
    }
}

/// Partial slot update; omitted ends keep their current value
#[derive(Debug, Default, Deserialize)]
pub struct SlotUpdate {
    pub start: Option<String>,
    pub end: Option<String>,
}

/// Request body for PUT /api/settings
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSettingsRequest {
    pub recognition_threshold: Option<f64>,
    pub morning_session: Option<SlotUpdate>,
    pub meal_session: Option<SlotUpdate>,
    pub afternoon_session: Option<SlotUpdate>,
}

fn parse_time(field: &str, value: &str) -> ApiResult<NaiveTime> {
    parse_hh_mm(value)
        .ok_or_else(|| ApiError::BadRequest(format!("{} must be HH:MM, got '{}'", field, value)))
}

fn apply_slot(name: &str, slot: &mut SessionSlot, update: Option<&SlotUpdate>) -> ApiResult<()> {
    let Some(update) = update else {
        return Ok(());
    };

    if let Some(start) = &update.start {
        slot.start = parse_time(&format!("{}.start", name), start)?;
    }
    if let Some(end) = &update.end {
        slot.end = parse_time(&format!("{}.end", name), end)?;
    }

    if slot.start > slot.end {
        return Err(ApiError::BadRequest(format!(
            "{} start {} is after end {}",
            name,
            format_hh_mm(slot.start),
            format_hh_mm(slot.end)
        )));
    }

    Ok(())
}

/// Merge a partial update into the current settings
pub fn apply_update(
    current: &RecognitionSettings,
    update: &UpdateSettingsRequest,
) -> ApiResult<RecognitionSettings> {
    let mut next = *current;

    if let Some(threshold) = update.recognition_threshold {
        if !threshold.is_finite() || threshold <= 0.0 {
            return Err(ApiError::BadRequest(format!(
                "recognitionThreshold must be a positive number, got {}",
                threshold
            )));
        }
        next.threshold = threshold;
    }

    apply_slot(
        "morningSession",
        &mut next.slots.morning,
        update.morning_session.as_ref(),
    )?;
    apply_slot("mealSession", &mut next.slots.meal, update.meal_session.as_ref())?;
    apply_slot(
        "afternoonSession",
        &mut next.slots.afternoon,
        update.afternoon_session.as_ref(),
    )?;

    Ok(next)
}

/// GET /api/settings
pub async fn get_settings(State(state): State<AppState>) -> ApiResult<Json<SettingsResponse>> {
    let settings = load_recognition_settings(&state.db).await?;
    Ok(Json(SettingsResponse::from(&settings)))
}

/// PUT /api/settings
///
/// **Errors:**
/// - 400 Bad Request: non-positive threshold, malformed time, start after end
pub async fn update_settings(
    State(state): State<AppState>,
    Json(payload): Json<UpdateSettingsRequest>,
) -> ApiResult<Json<SettingsResponse>> {
    let current = load_recognition_settings(&state.db).await?;
    let next = apply_update(&current, &payload)?;

    save_recognition_settings(&state.db, &next).await?;
    info!(threshold = next.threshold, "Recognition settings updated");

    Ok(Json(SettingsResponse::from(&next)))
}

/// Query parameters for GET /api/session/current
#[derive(Debug, Deserialize)]
pub struct CurrentSessionQuery {
    /// Wall-clock `HH:MM` to resolve instead of the server's local time
    pub time: Option<String>,
}

/// GET /api/session/current[?time=HH:MM]
pub async fn current_session(
    State(state): State<AppState>,
    Query(query): Query<CurrentSessionQuery>,
) -> ApiResult<Json<ResolvedSession>> {
    let now = match query.time.as_deref() {
        Some(value) => parse_time("time", value)?,
        None => {
            let local = chrono::Local::now().time();
            NaiveTime::from_hms_opt(local.hour(), local.minute(), 0).unwrap_or(local)
        }
    };

    let settings = load_recognition_settings(&state.db).await?;
    Ok(Json(resolve_session(now, &settings.slots)))
}

/// Build settings routes
pub fn settings_routes() -> Router<AppState> {
    Router::new()
        .route("/api/settings", get(get_settings).put(update_settings))
        .route("/api/session/current", get(current_session))
}
