//! Shared ledger types
//!
//! Both ledgers follow the same per-key state machine: `no-record → recorded`
//! fires once, and `recorded` is terminal. A repeat submission is a normal
//! outcome, not an error.

use thiserror::Error;

/// Outcome of an idempotent ledger append
#[derive(Debug, Clone, PartialEq)]
pub enum LedgerOutcome<R> {
    /// No record existed for the key; this one should be appended
    Created(R),
    /// A record already exists for the key; returned unchanged
    AlreadyExists(R),
}

impl<R> LedgerOutcome<R> {
    pub fn record(&self) -> &R {
        match self {
            LedgerOutcome::Created(r) | LedgerOutcome::AlreadyExists(r) => r,
        }
    }

    pub fn into_record(self) -> R {
        match self {
            LedgerOutcome::Created(r) | LedgerOutcome::AlreadyExists(r) => r,
        }
    }

    pub fn already_exists(&self) -> bool {
        matches!(self, LedgerOutcome::AlreadyExists(_))
    }
}

/// Ledger input errors
#[derive(Debug, Error, PartialEq)]
pub enum LedgerError {
    #[error("Timestamp has no YYYY-MM-DD calendar date: {0}")]
    InvalidTimestamp(String),
}
