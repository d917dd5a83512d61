//! Meal ledger
//!
//! Keyed by (student, date) only: at most one meal per student per calendar
//! day, whatever the time of day.

use super::ledger::{LedgerError, LedgerOutcome};
use sams_common::db::{MealRecord, MealStatus, Student};
use sams_common::{time, uuid_utils};

/// Outcome of a meal mark
#[derive(Debug, Clone, PartialEq)]
pub enum MealOutcome {
    /// Student known and active; ledger decision attached
    Accepted(LedgerOutcome<MealRecord>),
    /// Student not found or inactive; nothing recorded
    StudentUnavailable,
}

/// Decide whether to append a meal record
///
/// The student must exist and be active; that is checked before duplicates.
pub fn mark_meal(
    student: Option<&Student>,
    timestamp: &str,
    existing: &[MealRecord],
) -> Result<MealOutcome, LedgerError> {
    let student = match student {
        Some(s) if s.is_active() => s,
        _ => return Ok(MealOutcome::StudentUnavailable),
    };

    let date = time::calendar_date(timestamp)
        .ok_or_else(|| LedgerError::InvalidTimestamp(timestamp.to_string()))?;

    if let Some(record) = existing
        .iter()
        .find(|r| r.student_guid == student.guid && r.date == date)
    {
        return Ok(MealOutcome::Accepted(LedgerOutcome::AlreadyExists(
            record.clone(),
        )));
    }

    Ok(MealOutcome::Accepted(LedgerOutcome::Created(MealRecord {
        guid: uuid_utils::generate(),
        student_guid: student.guid,
        student_id: student.student_id.clone(),
        student_name: student.name.clone(),
        date,
        timestamp: timestamp.to_string(),
        status: MealStatus::Served,
        created_at: time::now(),
    })))
}
