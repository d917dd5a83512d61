//! Guid helpers for students and ledger records

use uuid::Uuid;

/// Fresh random guid for a new student or record
pub fn generate() -> Uuid {
    Uuid::new_v4()
}

/// Parse a guid, e.g. from a stored column or a path segment
pub fn parse(s: &str) -> Result<Uuid, uuid::Error> {
    Uuid::parse_str(s)
}
