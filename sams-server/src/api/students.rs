//! Student registry endpoints
//!
//! `:id` accepts either the internal guid or the school-assigned student ID.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use sams_common::db::{Descriptor, Student, StudentStatus};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::services::descriptor::descriptor_from_json;
use crate::{db, ApiError, ApiResult, AppState};

/// Request body for POST /api/students
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollStudentRequest {
    pub student_id: Option<String>,
    pub name: Option<String>,
    #[serde(default)]
    pub class_name: String,
    #[serde(default)]
    pub guardian_name: String,
    #[serde(default)]
    pub face_descriptors: Vec<serde_json::Value>,
}

/// Student as returned by the API
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentResponse {
    #[serde(flatten)]
    pub student: Student,
    pub descriptor_count: usize,
}

impl From<Student> for StudentResponse {
    fn from(student: Student) -> Self {
        Self {
            descriptor_count: student.descriptors.len(),
            student,
        }
    }
}

fn required(value: Option<String>, field: &str) -> ApiResult<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::BadRequest(format!("{} is required", field)))
}

fn parse_descriptor(value: &serde_json::Value) -> ApiResult<Descriptor> {
    descriptor_from_json(value).map_err(ApiError::BadRequest)
}

/// POST /api/students
///
/// **Errors:**
/// - 400 Bad Request: missing studentId/name, no descriptors, malformed descriptor
/// - 409 Conflict: an active student already holds the ID
pub async fn enroll_student(
    State(state): State<AppState>,
    Json(payload): Json<EnrollStudentRequest>,
) -> ApiResult<(StatusCode, Json<StudentResponse>)> {
    let student_id = required(payload.student_id, "studentId")?;
    let name = required(payload.name, "name")?;

    if payload.face_descriptors.is_empty() {
        return Err(ApiError::BadRequest(
            "faceDescriptors must contain at least one descriptor".to_string(),
        ));
    }
    let descriptors = payload
        .face_descriptors
        .iter()
        .map(parse_descriptor)
        .collect::<ApiResult<Vec<_>>>()?;

    let now = sams_common::time::now();
    let student = Student {
        guid: sams_common::uuid_utils::generate(),
        student_id,
        name,
        class_name: payload.class_name.trim().to_string(),
        guardian_name: payload.guardian_name.trim().to_string(),
        status: StudentStatus::Active,
        descriptors,
        created_at: now,
        updated_at: now,
    };

    if !db::students::insert_student(&state.db, &student).await? {
        return Err(ApiError::Conflict(format!(
            "Student ID {} is already enrolled",
            student.student_id
        )));
    }

    info!(
        student_id = %student.student_id,
        descriptors = student.descriptors.len(),
        "Student enrolled"
    );

    Ok((StatusCode::CREATED, Json(StudentResponse::from(student))))
}

/// Query parameters for GET /api/students
#[derive(Debug, Deserialize)]
pub struct ListStudentsQuery {
    pub active: Option<bool>,
}

/// GET /api/students?active=true|false
///
/// Defaults to active students only.
pub async fn list_students(
    State(state): State<AppState>,
    Query(query): Query<ListStudentsQuery>,
) -> ApiResult<Json<Vec<StudentResponse>>> {
    let students = db::students::list_students(&state.db, query.active.unwrap_or(true)).await?;
    Ok(Json(students.into_iter().map(StudentResponse::from).collect()))
}

async fn resolve_student(state: &AppState, id: &str) -> ApiResult<Student> {
    let found = match sams_common::uuid_utils::parse(id) {
        Ok(guid) => db::students::find_by_guid(&state.db, guid).await?,
        Err(_) => db::students::find_by_student_id(&state.db, id).await?,
    };

    found.ok_or_else(|| ApiError::NotFound(format!("Student {}", id)))
}

/// GET /api/students/:id
pub async fn get_student(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<StudentResponse>> {
    let student = resolve_student(&state, &id).await?;
    Ok(Json(StudentResponse::from(student)))
}

/// Request body for POST /api/students/:id/descriptors
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddDescriptorRequest {
    pub face_descriptor: Option<serde_json::Value>,
}

/// POST /api/students/:id/descriptors
///
/// Appends one reference descriptor. Inactive students are rejected.
pub async fn add_descriptor(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<AddDescriptorRequest>,
) -> ApiResult<Json<StudentResponse>> {
    let value = payload
        .face_descriptor
        .ok_or_else(|| ApiError::BadRequest("faceDescriptor is required".to_string()))?;
    let descriptor = parse_descriptor(&value)?;

    let student = resolve_student(&state, &id).await?;
    if !student.is_active() {
        return Err(ApiError::NotFound(format!("Student {} is inactive", id)));
    }

    let updated = db::students::add_descriptor(&state.db, student.guid, descriptor).await?;
    info!(
        student_id = %updated.student_id,
        descriptors = updated.descriptors.len(),
        "Descriptor added"
    );

    Ok(Json(StudentResponse::from(updated)))
}

/// DELETE /api/students/:id
///
/// Deactivates the student. History stays; the student stops matching.
pub async fn deactivate_student(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let student = resolve_student(&state, &id).await?;

    if !db::students::deactivate(&state.db, student.guid).await? {
        return Err(ApiError::NotFound(format!("Student {} is not active", id)));
    }

    info!(student_id = %student.student_id, "Student deactivated");
    Ok(StatusCode::NO_CONTENT)
}

/// Build student registry routes
pub fn student_routes() -> Router<AppState> {
    Router::new()
        .route("/api/students", post(enroll_student).get(list_students))
        .route(
            "/api/students/:id",
            get(get_student).delete(deactivate_student),
        )
        .route("/api/students/:id/descriptors", post(add_descriptor))
}
