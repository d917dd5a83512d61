//! Meal record persistence

use super::{parse_date, parse_guid, parse_timestamp};
use chrono::NaiveDate;
use sams_common::db::{MealRecord, MealStatus};
use sams_common::Result;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use uuid::Uuid;

const MEAL_COLUMNS: &str =
    "guid, student_guid, student_id, student_name, date, timestamp, created_at";

fn record_from_row(row: &SqliteRow) -> Result<MealRecord> {
    let guid: String = row.get("guid");
    let student_guid: String = row.get("student_guid");
    let date: String = row.get("date");
    let created_at: String = row.get("created_at");

    Ok(MealRecord {
        guid: parse_guid(&guid)?,
        student_guid: parse_guid(&student_guid)?,
        student_id: row.get("student_id"),
        student_name: row.get("student_name"),
        date: parse_date(&date)?,
        timestamp: row.get("timestamp"),
        status: MealStatus::Served,
        created_at: parse_timestamp(&created_at)?,
    })
}

/// Append a record unless one exists for its (student, date)
///
/// Returns `false` when another request recorded the meal first.
pub async fn insert_if_absent(pool: &SqlitePool, record: &MealRecord) -> Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO meals (
            guid, student_guid, student_id, student_name, date, timestamp, status, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT (student_guid, date) DO NOTHING
        "#,
    )
    .bind(record.guid.to_string())
    .bind(record.student_guid.to_string())
    .bind(&record.student_id)
    .bind(&record.student_name)
    .bind(record.date.to_string())
    .bind(&record.timestamp)
    .bind(record.status.as_str())
    .bind(record.created_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// The meal record for a (student, date) key
pub async fn find(
    pool: &SqlitePool,
    student_guid: Uuid,
    date: NaiveDate,
) -> Result<Option<MealRecord>> {
    let sql = format!(
        "SELECT {} FROM meals WHERE student_guid = ? AND date = ?",
        MEAL_COLUMNS
    );

    let row = sqlx::query(&sql)
        .bind(student_guid.to_string())
        .bind(date.to_string())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(record_from_row).transpose()
}

/// Records on a date, in serving order
pub async fn list_by_date(pool: &SqlitePool, date: NaiveDate) -> Result<Vec<MealRecord>> {
    let sql = format!(
        "SELECT {} FROM meals WHERE date = ? ORDER BY timestamp, created_at",
        MEAL_COLUMNS
    );

    let rows = sqlx::query(&sql)
        .bind(date.to_string())
        .fetch_all(pool)
        .await?;

    rows.iter().map(record_from_row).collect()
}

pub async fn count_by_date(pool: &SqlitePool, date: NaiveDate) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM meals WHERE date = ?")
        .bind(date.to_string())
        .fetch_one(pool)
        .await?;
    Ok(count)
}

pub async fn count_all(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM meals")
        .fetch_one(pool)
        .await?;
    Ok(count)
}
