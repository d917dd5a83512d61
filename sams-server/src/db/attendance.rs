//! Attendance record persistence

use super::{parse_date, parse_guid, parse_timestamp};
use chrono::NaiveDate;
use sams_common::db::{AttendanceRecord, AttendanceStatus};
use sams_common::Result;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use std::collections::BTreeMap;
use uuid::Uuid;

const ATTENDANCE_COLUMNS: &str = "guid, student_guid, student_id, student_name, date, session, \
                                  session_type, confidence, timestamp, created_at";

fn record_from_row(row: &SqliteRow) -> Result<AttendanceRecord> {
    let guid: String = row.get("guid");
    let student_guid: String = row.get("student_guid");
    let date: String = row.get("date");
    let confidence: i64 = row.get("confidence");
    let created_at: String = row.get("created_at");

    Ok(AttendanceRecord {
        guid: parse_guid(&guid)?,
        student_guid: parse_guid(&student_guid)?,
        student_id: row.get("student_id"),
        student_name: row.get("student_name"),
        date: parse_date(&date)?,
        session: row.get("session"),
        session_type: row.get("session_type"),
        status: AttendanceStatus::Present,
        confidence: confidence.clamp(0, 100) as u32,
        timestamp: row.get("timestamp"),
        created_at: parse_timestamp(&created_at)?,
    })
}

/// Append a record unless one exists for its (student, date, session)
///
/// Returns `false` when the unique key was already taken, i.e. another
/// request recorded it first.
pub async fn insert_if_absent(pool: &SqlitePool, record: &AttendanceRecord) -> Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO attendance (
            guid, student_guid, student_id, student_name, date, session,
            session_type, status, confidence, timestamp, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT (student_guid, date, session) DO NOTHING
        "#,
    )
    .bind(record.guid.to_string())
    .bind(record.student_guid.to_string())
    .bind(&record.student_id)
    .bind(&record.student_name)
    .bind(record.date.to_string())
    .bind(&record.session)
    .bind(&record.session_type)
    .bind(record.status.as_str())
    .bind(record.confidence as i64)
    .bind(&record.timestamp)
    .bind(record.created_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Records for one student on one date (all sessions)
pub async fn list_for_student_date(
    pool: &SqlitePool,
    student_guid: Uuid,
    date: NaiveDate,
) -> Result<Vec<AttendanceRecord>> {
    let sql = format!(
        "SELECT {} FROM attendance WHERE student_guid = ? AND date = ? ORDER BY created_at",
        ATTENDANCE_COLUMNS
    );

    let rows = sqlx::query(&sql)
        .bind(student_guid.to_string())
        .bind(date.to_string())
        .fetch_all(pool)
        .await?;

    rows.iter().map(record_from_row).collect()
}

/// Look up the record for an exact (student, date, session) key
pub async fn find(
    pool: &SqlitePool,
    student_guid: Uuid,
    date: NaiveDate,
    session: &str,
) -> Result<Option<AttendanceRecord>> {
    let sql = format!(
        "SELECT {} FROM attendance WHERE student_guid = ? AND date = ? AND session = ?",
        ATTENDANCE_COLUMNS
    );

    let row = sqlx::query(&sql)
        .bind(student_guid.to_string())
        .bind(date.to_string())
        .bind(session)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(record_from_row).transpose()
}

/// Records for a date, optionally one session only
pub async fn list_by_date(
    pool: &SqlitePool,
    date: NaiveDate,
    session: Option<&str>,
) -> Result<Vec<AttendanceRecord>> {
    let rows = match session {
        Some(session) => {
            let sql = format!(
                "SELECT {} FROM attendance WHERE date = ? AND session = ? ORDER BY timestamp, created_at",
                ATTENDANCE_COLUMNS
            );
            sqlx::query(&sql)
                .bind(date.to_string())
                .bind(session)
                .fetch_all(pool)
                .await?
        }
        None => {
            let sql = format!(
                "SELECT {} FROM attendance WHERE date = ? ORDER BY timestamp, created_at",
                ATTENDANCE_COLUMNS
            );
            sqlx::query(&sql)
                .bind(date.to_string())
                .fetch_all(pool)
                .await?
        }
    };

    rows.iter().map(record_from_row).collect()
}

/// Attendance counts for a date
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttendanceCounts {
    /// Distinct students with at least one record
    pub students_present: i64,
    /// Records per session label
    pub by_session: BTreeMap<String, i64>,
}

pub async fn counts_by_date(pool: &SqlitePool, date: NaiveDate) -> Result<AttendanceCounts> {
    let students_present: i64 =
        sqlx::query_scalar("SELECT COUNT(DISTINCT student_guid) FROM attendance WHERE date = ?")
            .bind(date.to_string())
            .fetch_one(pool)
            .await?;

    let rows: Vec<(String, i64)> = sqlx::query_as(
        "SELECT session, COUNT(*) FROM attendance WHERE date = ? GROUP BY session",
    )
    .bind(date.to_string())
    .fetch_all(pool)
    .await?;

    Ok(AttendanceCounts {
        students_present,
        by_session: rows.into_iter().collect(),
    })
}
