//! Recognition and ledger services
//!
//! Everything except `recording` is synchronous and pure: values in,
//! decisions out. `recording` wires them to the repositories.

pub mod attendance_ledger;
pub mod descriptor;
pub mod ledger;
pub mod matcher;
pub mod meal_ledger;
pub mod recording;
pub mod session_resolver;

pub use ledger::{LedgerError, LedgerOutcome};
pub use recording::{AttendanceMark, AttendanceResult, MealResult, RecordingError};
