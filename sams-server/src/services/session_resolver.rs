//! Session resolution
//!
//! Maps a wall-clock time to the first configured slot containing it, in
//! declaration order morning, meal, afternoon. Intervals are inclusive on both
//! ends; on overlapping boundaries the first declared slot wins.

use chrono::{NaiveTime, Timelike};
use sams_common::db::SlotBoundaries;
use serde::Serialize;

/// Session slot kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionType {
    Morning,
    Meal,
    Afternoon,
    None,
}

impl SessionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionType::Morning => "morning",
            SessionType::Meal => "meal",
            SessionType::Afternoon => "afternoon",
            SessionType::None => "none",
        }
    }

    /// Label stored on attendance records
    pub fn display_name(&self) -> &'static str {
        match self {
            SessionType::Morning => "Morning Session",
            SessionType::Meal => "Meal Session",
            SessionType::Afternoon => "Afternoon Session",
            SessionType::None => "No Active Session",
        }
    }
}

/// Result of resolving a time against the slot configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedSession {
    #[serde(rename = "type")]
    pub session_type: SessionType,
    pub name: String,
    pub active: bool,
}

impl ResolvedSession {
    fn of(session_type: SessionType) -> Self {
        Self {
            session_type,
            name: session_type.display_name().to_string(),
            active: session_type != SessionType::None,
        }
    }
}

/// Resolve the session active at `now`
///
/// Slot boundaries are `HH:MM`, so `now` is compared at minute precision.
pub fn resolve_session(now: NaiveTime, slots: &SlotBoundaries) -> ResolvedSession {
    let now = NaiveTime::from_hms_opt(now.hour(), now.minute(), 0).unwrap_or(now);

    let declared = [
        (SessionType::Morning, slots.morning),
        (SessionType::Meal, slots.meal),
        (SessionType::Afternoon, slots.afternoon),
    ];

    declared
        .iter()
        .find(|(_, slot)| slot.contains(now))
        .map(|(session_type, _)| ResolvedSession::of(*session_type))
        .unwrap_or_else(|| ResolvedSession::of(SessionType::None))
}
