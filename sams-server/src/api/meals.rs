//! Meal endpoints

use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use sams_common::db::{MealRecord, Student};
use serde::{Deserialize, Serialize};

use super::attendance::{percentage, DateQuery};
use super::{date_or_today, require_timestamp};
use crate::services::recording::{record_meal, MealResult};
use crate::{db, ApiError, ApiResult, AppState};

/// Request body for POST /api/meals/mark
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkMealRequest {
    pub student_id: Option<String>,
    pub timestamp: Option<String>,
}

/// Student summary included in meal responses
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentSummary {
    pub student_id: String,
    pub name: String,
    pub class_name: String,
}

impl From<&Student> for StudentSummary {
    fn from(student: &Student) -> Self {
        Self {
            student_id: student.student_id.clone(),
            name: student.name.clone(),
            class_name: student.class_name.clone(),
        }
    }
}

/// Response body for POST /api/meals/mark
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkMealResponse {
    pub already_marked: bool,
    pub meal_record: MealRecord,
    pub student: StudentSummary,
    pub message: String,
}

/// POST /api/meals/mark
///
/// **Errors:**
/// - 400 Bad Request: missing studentId or invalid timestamp
/// - 404 Not Found: student unknown or inactive
pub async fn mark_meal(
    State(state): State<AppState>,
    Json(payload): Json<MarkMealRequest>,
) -> ApiResult<Json<MarkMealResponse>> {
    let student_id = payload
        .student_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::BadRequest("studentId is required".to_string()))?;
    let timestamp = require_timestamp(payload.timestamp)?;

    match record_meal(&state.db, &student_id, &timestamp).await? {
        MealResult::StudentUnavailable => Err(ApiError::NotFound(format!(
            "Student {} not found or inactive",
            student_id
        ))),
        MealResult::Served { student, outcome } => {
            let already_marked = outcome.already_exists();
            let message = if already_marked {
                format!("{} has already received a meal today", student.name)
            } else {
                format!("Meal served to {}", student.name)
            };

            Ok(Json(MarkMealResponse {
                already_marked,
                meal_record: outcome.into_record(),
                student: StudentSummary::from(&student),
                message,
            }))
        }
    }
}

/// Response for GET /api/meals
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MealListResponse {
    pub date: NaiveDate,
    pub count: usize,
    pub records: Vec<MealRecord>,
}

/// GET /api/meals?date=YYYY-MM-DD
pub async fn list_meals(
    State(state): State<AppState>,
    Query(query): Query<DateQuery>,
) -> ApiResult<Json<MealListResponse>> {
    let date = date_or_today(query.date.as_deref())?;
    let records = db::meals::list_by_date(&state.db, date).await?;

    Ok(Json(MealListResponse {
        date,
        count: records.len(),
        records,
    }))
}

/// Response for GET /api/meals/stats
#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MealStatsResponse {
    pub date: NaiveDate,
    pub total_students: i64,
    pub meals_served_today: i64,
    pub meals_remaining: i64,
    pub meal_rate: i64,
    pub total_meals_served_all_time: i64,
}

impl MealStatsResponse {
    pub fn compute(
        date: NaiveDate,
        total_students: i64,
        meals_served_today: i64,
        total_meals_served_all_time: i64,
    ) -> Self {
        Self {
            date,
            total_students,
            meals_served_today,
            meals_remaining: (total_students - meals_served_today).max(0),
            meal_rate: percentage(meals_served_today, total_students),
            total_meals_served_all_time,
        }
    }
}

/// GET /api/meals/stats?date=YYYY-MM-DD
pub async fn meal_stats(
    State(state): State<AppState>,
    Query(query): Query<DateQuery>,
) -> ApiResult<Json<MealStatsResponse>> {
    let date = date_or_today(query.date.as_deref())?;

    let total_students = db::students::count_active(&state.db).await?;
    let served = db::meals::count_by_date(&state.db, date).await?;
    let all_time = db::meals::count_all(&state.db).await?;

    Ok(Json(MealStatsResponse::compute(
        date,
        total_students,
        served,
        all_time,
    )))
}

/// Build meal routes
pub fn meal_routes() -> Router<AppState> {
    Router::new()
        .route("/api/meals/mark", post(mark_meal))
        .route("/api/meals", get(list_meals))
        .route("/api/meals/stats", get(meal_stats))
}
