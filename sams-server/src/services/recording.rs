//! Attendance and meal recording workflows
//!
//! Each workflow reads what it needs, lets the pure matcher/ledger decide, and
//! appends through the repositories. The append is conflict-safe: if a
//! concurrent request claimed the same key between our read and our insert,
//! the insert is a no-op and the stored record is returned as `AlreadyExists`.

use super::attendance_ledger::{mark_attendance, SessionLabel};
use super::ledger::{LedgerError, LedgerOutcome};
use super::matcher::find_best_match;
use super::meal_ledger::{mark_meal, MealOutcome};
use super::session_resolver::resolve_session;
use crate::db;
use sams_common::db::settings::load_recognition_settings;
use sams_common::db::{AttendanceRecord, MealRecord, SlotBoundaries, Student};
use sams_common::time;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{info, warn};

/// Workflow errors that are not normal negative outcomes
#[derive(Debug, Error)]
pub enum RecordingError {
    /// No session given and none active at the event time
    #[error("No active session at {0}")]
    NoActiveSession(String),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Storage(#[from] sams_common::Error),
}

/// Attendance mark request after boundary validation
#[derive(Debug, Clone)]
pub struct AttendanceMark {
    pub descriptor: Vec<f64>,
    pub timestamp: String,
    pub session: Option<String>,
    pub session_type: Option<String>,
}

/// Outcome of an attendance mark
#[derive(Debug, Clone)]
pub enum AttendanceResult {
    /// No active student under the threshold
    NotRecognized,
    Recognized {
        student: Student,
        distance: f64,
        outcome: LedgerOutcome<AttendanceRecord>,
    },
}

/// Pick the session label for an attendance event
///
/// An explicit session wins; otherwise resolve from the event's time of day.
fn session_for(
    request: &AttendanceMark,
    slots: &SlotBoundaries,
) -> Result<SessionLabel, RecordingError> {
    // Labels are keys and compare exactly; only a blank label counts as absent
    let explicit = request
        .session
        .as_deref()
        .filter(|s| !s.trim().is_empty());

    if let Some(name) = explicit {
        let session_type = request
            .session_type
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or("custom");
        return Ok(SessionLabel {
            name: name.to_string(),
            session_type: session_type.to_string(),
        });
    }

    let now = time::time_of_day(&request.timestamp)
        .ok_or_else(|| LedgerError::InvalidTimestamp(request.timestamp.clone()))?;
    let resolved = resolve_session(now, slots);
    if !resolved.active {
        return Err(RecordingError::NoActiveSession(time::format_hh_mm(now)));
    }

    Ok(SessionLabel {
        name: resolved.name,
        session_type: resolved.session_type.as_str().to_string(),
    })
}

/// Match a captured descriptor and record attendance for the matched student
///
/// An unmatched face is `NotRecognized` whatever the time of day; the session
/// is only resolved once there is a student to record.
pub async fn record_attendance(
    pool: &SqlitePool,
    request: &AttendanceMark,
) -> Result<AttendanceResult, RecordingError> {
    let settings = load_recognition_settings(pool).await?;

    let roster = db::students::list_students(pool, true).await?;
    let Some(matched) = find_best_match(&request.descriptor, &roster, settings.threshold) else {
        info!(
            roster = roster.len(),
            threshold = settings.threshold,
            "Attendance face not recognized"
        );
        return Ok(AttendanceResult::NotRecognized);
    };

    let session = session_for(request, &settings.slots)?;

    let student = matched.student.clone();
    let date = time::calendar_date(&request.timestamp)
        .ok_or_else(|| LedgerError::InvalidTimestamp(request.timestamp.clone()))?;
    let existing = db::attendance::list_for_student_date(pool, student.guid, date).await?;

    let outcome = mark_attendance(
        &student,
        &request.timestamp,
        &session,
        &existing,
        matched.confidence,
    )?;

    let outcome = match outcome {
        LedgerOutcome::Created(record) => {
            if db::attendance::insert_if_absent(pool, &record).await? {
                info!(
                    student_id = %student.student_id,
                    session = %record.session,
                    date = %record.date,
                    confidence = record.confidence,
                    "Attendance recorded"
                );
                LedgerOutcome::Created(record)
            } else {
                warn!(
                    student_id = %student.student_id,
                    session = %record.session,
                    "Concurrent attendance mark detected, returning stored record"
                );
                let stored = db::attendance::find(pool, student.guid, record.date, &record.session)
                    .await?
                    .ok_or_else(|| {
                        sams_common::Error::Internal(
                            "Attendance insert conflicted but no record found".to_string(),
                        )
                    })?;
                LedgerOutcome::AlreadyExists(stored)
            }
        }
        already @ LedgerOutcome::AlreadyExists(_) => {
            info!(
                student_id = %student.student_id,
                session = %session.name,
                "Attendance already marked"
            );
            already
        }
    };

    Ok(AttendanceResult::Recognized {
        distance: matched.distance,
        student,
        outcome,
    })
}

/// Outcome of a meal mark
#[derive(Debug, Clone)]
pub enum MealResult {
    /// Unknown or inactive student
    StudentUnavailable,
    Served {
        student: Student,
        outcome: LedgerOutcome<MealRecord>,
    },
}

/// Record a meal for a student by school ID
pub async fn record_meal(
    pool: &SqlitePool,
    student_id: &str,
    timestamp: &str,
) -> Result<MealResult, RecordingError> {
    let student = db::students::find_by_student_id(pool, student_id).await?;

    let existing: Vec<MealRecord> = match (&student, time::calendar_date(timestamp)) {
        (Some(s), Some(date)) => db::meals::find(pool, s.guid, date)
            .await?
            .into_iter()
            .collect(),
        _ => Vec::new(),
    };

    let outcome = match mark_meal(student.as_ref(), timestamp, &existing)? {
        MealOutcome::StudentUnavailable => {
            warn!(student_id, "Meal requested for unknown or inactive student");
            return Ok(MealResult::StudentUnavailable);
        }
        MealOutcome::Accepted(outcome) => outcome,
    };

    // mark_meal only accepts a present, active student
    let Some(student) = student else {
        return Ok(MealResult::StudentUnavailable);
    };

    let outcome = match outcome {
        LedgerOutcome::Created(record) => {
            if db::meals::insert_if_absent(pool, &record).await? {
                info!(
                    student_id = %student.student_id,
                    date = %record.date,
                    "Meal recorded"
                );
                LedgerOutcome::Created(record)
            } else {
                warn!(
                    student_id = %student.student_id,
                    "Concurrent meal mark detected, returning stored record"
                );
                let stored = db::meals::find(pool, student.guid, record.date)
                    .await?
                    .ok_or_else(|| {
                        sams_common::Error::Internal(
                            "Meal insert conflicted but no record found".to_string(),
                        )
                    })?;
                LedgerOutcome::AlreadyExists(stored)
            }
        }
        already @ LedgerOutcome::AlreadyExists(_) => {
            info!(student_id = %student.student_id, "Meal already served today");
            already
        }
    };

    Ok(MealResult::Served { student, outcome })
}
