//! Integration tests for sams-server API endpoints
//!
//! Each test runs against a fresh SQLite file in a temp directory.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use sams_server::{build_router, AppState};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::util::ServiceExt; // for `oneshot` method

const DAY: &str = "2024-03-05";

/// Test helper: Create app over a fresh database
async fn setup_app() -> (TempDir, Router) {
    let dir = tempfile::tempdir().expect("Should create temp dir");
    let pool = sams_common::db::init_database(&dir.path().join("sams.db"))
        .await
        .expect("Should initialize database");
    (dir, build_router(AppState::new(pool)))
}

/// Test helper: Send a request with an optional JSON body
async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    (status, extract_json(response.into_body()).await)
}

/// Test helper: Extract JSON body from response (Null for empty bodies)
async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

fn descriptor(fill: f64) -> Value {
    json!(vec![fill; 128])
}

async fn enroll(app: &Router, student_id: &str, name: &str, fill: f64) -> Value {
    let (status, body) = send(
        app,
        "POST",
        "/api/students",
        Some(json!({
            "studentId": student_id,
            "name": name,
            "className": "5A",
            "guardianName": "Guardian",
            "faceDescriptors": [descriptor(fill)],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let (_dir, app) = setup_app().await;

    let (status, body) = send(&app, "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "sams-server");
    assert!(body["version"].is_string());
}

// =============================================================================
// Student registry
// =============================================================================

#[tokio::test]
async fn test_enroll_and_fetch_student() {
    let (_dir, app) = setup_app().await;

    let created = enroll(&app, "S001", "Amina Yusuf", 0.2).await;
    assert_eq!(created["studentId"], "S001");
    assert_eq!(created["status"], "active");
    assert_eq!(created["descriptorCount"], 1);
    assert!(created.get("descriptors").is_none());

    let (status, by_id) = send(&app, "GET", "/api/students/s001", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(by_id["guid"], created["guid"]);

    let guid = created["guid"].as_str().unwrap();
    let (status, by_guid) = send(&app, "GET", &format!("/api/students/{}", guid), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(by_guid["name"], "Amina Yusuf");

    let (status, _) = send(&app, "GET", "/api/students/S404", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_enroll_validation() {
    let (_dir, app) = setup_app().await;
    enroll(&app, "S001", "Amina Yusuf", 0.2).await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/students",
        Some(json!({"studentId": "s001", "name": "Dup", "faceDescriptors": [descriptor(0.3)]})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");

    let (status, _) = send(
        &app,
        "POST",
        "/api/students",
        Some(json!({"studentId": "S002", "name": "No Face", "faceDescriptors": []})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "POST",
        "/api/students",
        Some(json!({"studentId": "S003", "name": "Short", "faceDescriptors": [[0.1, 0.2]]})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_add_descriptor_and_deactivate() {
    let (_dir, app) = setup_app().await;
    enroll(&app, "S001", "Amina Yusuf", 0.2).await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/students/S001/descriptors",
        Some(json!({"faceDescriptor": descriptor(0.25)})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["descriptorCount"], 2);

    let (status, _) = send(&app, "DELETE", "/api/students/S001", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, list) = send(&app, "GET", "/api/students", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 0);

    let (_, all) = send(&app, "GET", "/api/students?active=false", None).await;
    assert_eq!(all.as_array().unwrap().len(), 1);
    assert_eq!(all[0]["status"], "inactive");

    let (status, _) = send(&app, "DELETE", "/api/students/S001", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// =============================================================================
// Attendance
// =============================================================================

#[tokio::test]
async fn test_mark_attendance_is_idempotent() {
    let (_dir, app) = setup_app().await;
    enroll(&app, "S001", "Amina Yusuf", 0.2).await;
    enroll(&app, "S002", "Brian Otieno", 0.9).await;

    let mark = json!({
        "faceDescriptor": descriptor(0.21),
        "timestamp": "2024-03-05T08:15:00Z",
    });

    let (status, first) = send(&app, "POST", "/api/attendance/mark", Some(mark)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["recognized"], true);
    assert_eq!(first["alreadyMarked"], false);
    assert_eq!(first["studentId"], "S001");
    assert_eq!(first["session"], "Morning Session");
    assert_eq!(first["sessionType"], "morning");
    assert!(first["confidence"].as_u64().unwrap() > 80);

    let later = json!({
        "faceDescriptor": descriptor(0.2),
        "timestamp": "2024-03-05T10:00:00Z",
    });
    let (status, second) = send(&app, "POST", "/api/attendance/mark", Some(later)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["alreadyMarked"], true);
    assert_eq!(second["timestamp"], "2024-03-05T08:15:00Z");

    let (_, listed) = send(&app, "GET", &format!("/api/attendance?date={}", DAY), None).await;
    assert_eq!(listed["count"], 1);

    let (_, stats) = send(&app, "GET", &format!("/api/attendance/stats?date={}", DAY), None).await;
    assert_eq!(stats["totalStudents"], 2);
    assert_eq!(stats["studentsPresent"], 1);
    assert_eq!(stats["bySession"]["Morning Session"], 1);
}

#[tokio::test]
async fn test_mark_attendance_not_recognized() {
    let (_dir, app) = setup_app().await;
    enroll(&app, "S001", "Amina Yusuf", 0.2).await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/attendance/mark",
        Some(json!({
            "faceDescriptor": descriptor(0.8),
            "timestamp": "2024-03-05T08:15:00Z",
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["recognized"], false);
    assert!(body["message"].is_string());
    assert!(body.get("studentId").is_none());

    // No session given and none active: still a plain no-match, not a 400
    let (status, evening) = send(
        &app,
        "POST",
        "/api/attendance/mark",
        Some(json!({
            "faceDescriptor": descriptor(0.8),
            "timestamp": "2024-03-05T19:00:00Z",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(evening["recognized"], false);
}

#[tokio::test]
async fn test_mark_attendance_rejects_bad_input() {
    let (_dir, app) = setup_app().await;
    enroll(&app, "S001", "Amina Yusuf", 0.2).await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/attendance/mark",
        Some(json!({
            "faceDescriptor": vec![0.2; 127],
            "timestamp": "2024-03-05T08:15:00Z",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");

    let (status, _) = send(
        &app,
        "POST",
        "/api/attendance/mark",
        Some(json!({"faceDescriptor": descriptor(0.2)})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Known face outside every configured slot with no explicit session
    let (status, _) = send(
        &app,
        "POST",
        "/api/attendance/mark",
        Some(json!({
            "faceDescriptor": descriptor(0.2),
            "timestamp": "2024-03-05T19:00:00Z",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, listed) = send(&app, "GET", &format!("/api/attendance?date={}", DAY), None).await;
    assert_eq!(listed["count"], 0);
}

#[tokio::test]
async fn test_explicit_session_is_separate_key() {
    let (_dir, app) = setup_app().await;
    enroll(&app, "S001", "Amina Yusuf", 0.2).await;

    for session in ["Morning Session", "Science Club"] {
        let (status, body) = send(
            &app,
            "POST",
            "/api/attendance/mark",
            Some(json!({
                "faceDescriptor": descriptor(0.2),
                "timestamp": "2024-03-05T08:15:00Z",
                "session": session,
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["alreadyMarked"], false);
    }

    let (_, club) = send(
        &app,
        "GET",
        &format!("/api/attendance?date={}&session=Science%20Club", DAY),
        None,
    )
    .await;
    assert_eq!(club["count"], 1);
    assert_eq!(club["records"][0]["sessionType"], "custom");
}

// =============================================================================
// Meals
// =============================================================================

#[tokio::test]
async fn test_mark_meal_once_per_day() {
    let (_dir, app) = setup_app().await;
    enroll(&app, "S001", "Amina Yusuf", 0.2).await;
    enroll(&app, "S002", "Brian Otieno", 0.9).await;

    let (status, first) = send(
        &app,
        "POST",
        "/api/meals/mark",
        Some(json!({"studentId": "S001", "timestamp": "2024-03-05T12:10:00Z"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["alreadyMarked"], false);
    assert_eq!(first["student"]["name"], "Amina Yusuf");
    assert_eq!(first["mealRecord"]["status"], "served");

    let (status, second) = send(
        &app,
        "POST",
        "/api/meals/mark",
        Some(json!({"studentId": "s001", "timestamp": "2024-03-05T12:40:00Z"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["alreadyMarked"], true);
    assert_eq!(second["mealRecord"]["guid"], first["mealRecord"]["guid"]);

    let (status, stats) = send(&app, "GET", &format!("/api/meals/stats?date={}", DAY), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["totalStudents"], 2);
    assert_eq!(stats["mealsServedToday"], 1);
    assert_eq!(stats["mealsRemaining"], 1);
    assert_eq!(stats["mealRate"], 50);
    assert_eq!(stats["totalMealsServedAllTime"], 1);

    let (_, listed) = send(&app, "GET", &format!("/api/meals?date={}", DAY), None).await;
    assert_eq!(listed["count"], 1);
}

#[tokio::test]
async fn test_mark_meal_unknown_or_inactive_student() {
    let (_dir, app) = setup_app().await;
    enroll(&app, "S001", "Amina Yusuf", 0.2).await;
    send(&app, "DELETE", "/api/students/S001", None).await;

    for id in ["S001", "S404"] {
        let (status, body) = send(
            &app,
            "POST",
            "/api/meals/mark",
            Some(json!({"studentId": id, "timestamp": "2024-03-05T12:10:00Z"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    let (_, stats) = send(&app, "GET", &format!("/api/meals/stats?date={}", DAY), None).await;
    assert_eq!(stats["totalStudents"], 0);
    assert_eq!(stats["mealRate"], 0);
}

// =============================================================================
// Settings
// =============================================================================

#[tokio::test]
async fn test_settings_roundtrip_affects_matching() {
    let (_dir, app) = setup_app().await;
    enroll(&app, "S001", "Amina Yusuf", 0.2).await;

    let (status, defaults) = send(&app, "GET", "/api/settings", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(defaults["recognitionThreshold"], 0.6);
    assert_eq!(defaults["mealSession"]["start"], "12:00");

    // Distance between fills 0.2 and 0.25 is 0.05 * sqrt(128) ~ 0.566
    let probe = json!({
        "faceDescriptor": descriptor(0.25),
        "timestamp": "2024-03-05T08:15:00Z",
    });
    let (_, before) = send(&app, "POST", "/api/attendance/mark", Some(probe)).await;
    assert_eq!(before["recognized"], true);

    let (status, updated) = send(
        &app,
        "PUT",
        "/api/settings",
        Some(json!({
            "recognitionThreshold": 0.5,
            "afternoonSession": {"end": "18:00"},
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["recognitionThreshold"], 0.5);
    assert_eq!(updated["afternoonSession"]["start"], "13:00");
    assert_eq!(updated["afternoonSession"]["end"], "18:00");

    let next_day = json!({
        "faceDescriptor": descriptor(0.25),
        "timestamp": "2024-03-06T08:15:00Z",
    });
    let (_, after) = send(&app, "POST", "/api/attendance/mark", Some(next_day)).await;
    assert_eq!(after["recognized"], false);

    let (status, _) = send(
        &app,
        "PUT",
        "/api/settings",
        Some(json!({"recognitionThreshold": 0})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_current_session_lookup() {
    let (_dir, app) = setup_app().await;

    let (status, body) = send(&app, "GET", "/api/session/current?time=12:30", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["type"], "meal");
    assert_eq!(body["name"], "Meal Session");
    assert_eq!(body["active"], true);

    let (_, boundary) = send(&app, "GET", "/api/session/current?time=12:00", None).await;
    assert_eq!(boundary["type"], "morning");

    let (_, idle) = send(&app, "GET", "/api/session/current?time=06:00", None).await;
    assert_eq!(idle["type"], "none");
    assert_eq!(idle["active"], false);

    let (status, _) = send(&app, "GET", "/api/session/current?time=noon", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
