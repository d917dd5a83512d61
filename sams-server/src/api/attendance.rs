//! Attendance endpoints
//!
//! POST /api/attendance/mark validates the descriptor shape before anything
//! else runs; a probe that matches nobody is a normal 200 with
//! `recognized: false`.

use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use sams_common::db::AttendanceRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

use super::{date_or_today, require_timestamp};
use crate::services::descriptor::descriptor_from_json;
use crate::services::recording::{record_attendance, AttendanceMark, AttendanceResult};
use crate::{db, ApiError, ApiResult, AppState};

/// Request body for POST /api/attendance/mark
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkAttendanceRequest {
    pub face_descriptor: Option<serde_json::Value>,
    pub timestamp: Option<String>,
    pub session: Option<String>,
    pub session_type: Option<String>,
}

/// Response body for POST /api/attendance/mark
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkAttendanceResponse {
    pub recognized: bool,
    pub already_marked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_type: Option<String>,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attendance_record: Option<AttendanceRecord>,
    pub message: String,
}

/// POST /api/attendance/mark
///
/// **Request:** `{"faceDescriptor": [128 numbers], "timestamp": "...", "session"?: "...", "sessionType"?: "..."}`
///
/// **Errors:**
/// - 400 Bad Request: descriptor not exactly 128 numbers, missing/invalid timestamp,
///   no session given and none active at the event time
/// - 500 Internal Server Error: storage failure
pub async fn mark_attendance(
    State(state): State<AppState>,
    Json(payload): Json<MarkAttendanceRequest>,
) -> ApiResult<Json<MarkAttendanceResponse>> {
    let descriptor = payload
        .face_descriptor
        .as_ref()
        .ok_or_else(|| ApiError::BadRequest("faceDescriptor is required".to_string()))
        .and_then(|value| {
            descriptor_from_json(value).map_err(|msg| {
                warn!("Rejected attendance probe: {}", msg);
                ApiError::BadRequest(msg)
            })
        })?;
    let timestamp = require_timestamp(payload.timestamp)?;

    let request = AttendanceMark {
        descriptor,
        timestamp: timestamp.clone(),
        session: payload.session,
        session_type: payload.session_type,
    };

    let response = match record_attendance(&state.db, &request).await? {
        AttendanceResult::NotRecognized => MarkAttendanceResponse {
            recognized: false,
            already_marked: false,
            student_name: None,
            student_id: None,
            session: None,
            session_type: None,
            timestamp,
            confidence: None,
            attendance_record: None,
            message: "Face not recognized".to_string(),
        },
        AttendanceResult::Recognized {
            student, outcome, ..
        } => {
            let already_marked = outcome.already_exists();
            let record = outcome.into_record();
            let message = if already_marked {
                format!("{} already marked for {}", student.name, record.session)
            } else {
                format!("Attendance marked for {}", student.name)
            };

            MarkAttendanceResponse {
                recognized: true,
                already_marked,
                student_name: Some(student.name),
                student_id: Some(student.student_id),
                session: Some(record.session.clone()),
                session_type: Some(record.session_type.clone()),
                timestamp: record.timestamp.clone(),
                confidence: Some(record.confidence),
                attendance_record: Some(record),
                message,
            }
        }
    };

    Ok(Json(response))
}

/// Query parameters for GET /api/attendance
#[derive(Debug, Deserialize)]
pub struct AttendanceQuery {
    pub date: Option<String>,
    pub session: Option<String>,
}

/// Response for GET /api/attendance
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceListResponse {
    pub date: NaiveDate,
    pub count: usize,
    pub records: Vec<AttendanceRecord>,
}

/// GET /api/attendance?date=YYYY-MM-DD&session=...
pub async fn list_attendance(
    State(state): State<AppState>,
    Query(query): Query<AttendanceQuery>,
) -> ApiResult<Json<AttendanceListResponse>> {
    let date = date_or_today(query.date.as_deref())?;
    let session = query.session.as_deref().filter(|s| !s.is_empty());

    let records = db::attendance::list_by_date(&state.db, date, session).await?;

    Ok(Json(AttendanceListResponse {
        date,
        count: records.len(),
        records,
    }))
}

/// Query parameters for date-scoped statistics
#[derive(Debug, Deserialize)]
pub struct DateQuery {
    pub date: Option<String>,
}

/// Response for GET /api/attendance/stats
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceStatsResponse {
    pub date: NaiveDate,
    pub total_students: i64,
    pub students_present: i64,
    pub attendance_rate: i64,
    pub by_session: BTreeMap<String, i64>,
}

/// GET /api/attendance/stats?date=YYYY-MM-DD
pub async fn attendance_stats(
    State(state): State<AppState>,
    Query(query): Query<DateQuery>,
) -> ApiResult<Json<AttendanceStatsResponse>> {
    let date = date_or_today(query.date.as_deref())?;

    let total_students = db::students::count_active(&state.db).await?;
    let counts = db::attendance::counts_by_date(&state.db, date).await?;

    Ok(Json(AttendanceStatsResponse {
        date,
        total_students,
        students_present: counts.students_present,
        attendance_rate: percentage(counts.students_present, total_students),
        by_session: counts.by_session,
    }))
}

/// `round(part / total * 100)`, 0 when total is 0
pub(crate) fn percentage(part: i64, total: i64) -> i64 {
    if total <= 0 {
        return 0;
    }
    (part as f64 / total as f64 * 100.0).round() as i64
}

/// Build attendance routes
pub fn attendance_routes() -> Router<AppState> {
    Router::new()
        .route("/api/attendance/mark", post(mark_attendance))
        .route("/api/attendance", get(list_attendance))
        .route("/api/attendance/stats", get(attendance_stats))
}
