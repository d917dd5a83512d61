//! Database models

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Number of components in a face descriptor
pub const DESCRIPTOR_LEN: usize = 128;

/// Face descriptor produced by the client-side extraction pipeline
pub type Descriptor = Vec<f64>;

/// Student lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StudentStatus {
    Active,
    Inactive,
}

impl StudentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StudentStatus::Active => "active",
            StudentStatus::Inactive => "inactive",
        }
    }
}

impl fmt::Display for StudentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StudentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(StudentStatus::Active),
            "inactive" => Ok(StudentStatus::Inactive),
            other => Err(format!("Unknown student status: {}", other)),
        }
    }
}

/// Enrolled student with reference descriptors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub guid: Uuid,
    /// School-assigned identifier, unique (case-insensitive) among active students
    pub student_id: String,
    pub name: String,
    pub class_name: String,
    pub guardian_name: String,
    pub status: StudentStatus,
    /// Reference descriptors in enrollment order
    #[serde(skip_serializing)]
    pub descriptors: Vec<Descriptor>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Student {
    pub fn is_active(&self) -> bool {
        self.status == StudentStatus::Active
    }
}

/// Attendance record status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "present",
        }
    }
}

/// One attendance event per (student, date, session)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub guid: Uuid,
    pub student_guid: Uuid,
    pub student_id: String,
    pub student_name: String,
    pub date: NaiveDate,
    pub session: String,
    pub session_type: String,
    pub status: AttendanceStatus,
    /// Match confidence 0-100
    pub confidence: u32,
    /// Event timestamp as submitted (ISO-8601)
    pub timestamp: String,
    pub created_at: DateTime<Utc>,
}

/// Meal record status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealStatus {
    Served,
}

impl MealStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MealStatus::Served => "served",
        }
    }
}

/// One meal per (student, date)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealRecord {
    pub guid: Uuid,
    pub student_guid: Uuid,
    pub student_id: String,
    pub student_name: String,
    pub date: NaiveDate,
    pub timestamp: String,
    pub status: MealStatus,
    pub created_at: DateTime<Utc>,
}

/// Inclusive wall-clock window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSlot {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl SessionSlot {
    /// Build a slot from hour/minute pairs (out-of-range values fall back to midnight)
    pub fn from_hm(start: (u32, u32), end: (u32, u32)) -> Self {
        Self {
            start: NaiveTime::from_hms_opt(start.0, start.1, 0).unwrap_or_default(),
            end: NaiveTime::from_hms_opt(end.0, end.1, 0).unwrap_or_default(),
        }
    }

    /// Both ends count as inside
    pub fn contains(&self, time: NaiveTime) -> bool {
        self.start <= time && time <= self.end
    }
}

/// Configured session slots, in declaration order morning, meal, afternoon
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotBoundaries {
    pub morning: SessionSlot,
    pub meal: SessionSlot,
    pub afternoon: SessionSlot,
}

impl Default for SlotBoundaries {
    fn default() -> Self {
        Self {
            morning: SessionSlot::from_hm((8, 0), (12, 0)),
            meal: SessionSlot::from_hm((12, 0), (13, 0)),
            afternoon: SessionSlot::from_hm((13, 0), (17, 0)),
        }
    }
}

/// Default recognition distance threshold
pub const DEFAULT_RECOGNITION_THRESHOLD: f64 = 0.6;

/// Runtime recognition settings, loaded from the `settings` table per operation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecognitionSettings {
    pub threshold: f64,
    pub slots: SlotBoundaries,
}

impl Default for RecognitionSettings {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_RECOGNITION_THRESHOLD,
            slots: SlotBoundaries::default(),
        }
    }
}
