//! Database access layer for sams-server
//!
//! Read/append repositories over the shared SQLite pool. Ledger appends are
//! `INSERT … ON CONFLICT DO NOTHING` against per-key unique constraints, so
//! concurrent duplicate submissions collapse to one row.

use chrono::{DateTime, NaiveDate, Utc};
use sams_common::{Error, Result};
use uuid::Uuid;

pub mod attendance;
pub mod meals;
pub mod students;

pub(crate) fn parse_guid(value: &str) -> Result<Uuid> {
    sams_common::uuid_utils::parse(value)
        .map_err(|e| Error::Internal(format!("Invalid stored guid '{}': {}", value, e)))
}

pub(crate) fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| Error::Internal(format!("Invalid stored date '{}': {}", value, e)))
}

pub(crate) fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("Invalid stored timestamp '{}': {}", value, e)))
}
