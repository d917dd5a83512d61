//! Attendance ledger
//!
//! Keyed by (student, date, session). Session labels compare exactly,
//! case-sensitive.

use super::ledger::{LedgerError, LedgerOutcome};
use sams_common::db::{AttendanceRecord, AttendanceStatus, Student};
use sams_common::{time, uuid_utils};

/// Session label and type tag to record attendance under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionLabel {
    pub name: String,
    pub session_type: String,
}

/// Decide whether to append an attendance record
///
/// Returns the existing record if `existing` already holds one for this
/// student, date and session. Otherwise builds a fresh `present` record with the
/// matcher's confidence; the caller appends it.
pub fn mark_attendance(
    student: &Student,
    timestamp: &str,
    session: &SessionLabel,
    existing: &[AttendanceRecord],
    confidence: u32,
) -> Result<LedgerOutcome<AttendanceRecord>, LedgerError> {
    let date = time::calendar_date(timestamp)
        .ok_or_else(|| LedgerError::InvalidTimestamp(timestamp.to_string()))?;

    if let Some(record) = existing.iter().find(|r| {
        r.student_guid == student.guid && r.date == date && r.session == session.name
    }) {
        return Ok(LedgerOutcome::AlreadyExists(record.clone()));
    }

    Ok(LedgerOutcome::Created(AttendanceRecord {
        guid: uuid_utils::generate(),
        student_guid: student.guid,
        student_id: student.student_id.clone(),
        student_name: student.name.clone(),
        date,
        session: session.name.clone(),
        session_type: session.session_type.clone(),
        status: AttendanceStatus::Present,
        confidence,
        timestamp: timestamp.to_string(),
        created_at: time::now(),
    }))
}
