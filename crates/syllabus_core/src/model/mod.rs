//! Domain model for courses, syllabi, submissions and generated documents.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Own field-level validation (course codes, terms, years).
//!
//! # Invariants
//! - Every record is identified by a stable `RecordId` (SQLite rowid);
//!   insertion order on the id doubles as the deterministic tie-break.
//! - Deletion is represented by soft-delete flags, not hard delete.
//! - Timestamps are epoch milliseconds.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::{SystemTime, UNIX_EPOCH};

pub mod combined;
pub mod course;
pub mod submission;
pub mod syllabus;

/// Current wall-clock time as epoch milliseconds.
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis() as i64)
        .unwrap_or(0)
}

/// Field-level validation error shared by all record types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Course code does not match the expected catalog shape.
    InvalidCourseCode(String),
    /// Term is outside the academic range 1..=8.
    InvalidTerm(i64),
    /// Year string is not a four-digit admission year.
    InvalidYear(String),
    /// A required title field is empty.
    EmptyTitle,
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidCourseCode(code) => write!(f, "invalid course code: `{code}`"),
            Self::InvalidTerm(term) => write!(f, "term {term} is outside 1..=8"),
            Self::InvalidYear(year) => write!(f, "invalid admission year: `{year}`"),
            Self::EmptyTitle => write!(f, "title cannot be empty"),
        }
    }
}

impl Error for ValidationError {}

/// Validates a term number against the academic range.
pub fn validate_term(term: i64) -> Result<u8, ValidationError> {
    if (1..=8).contains(&term) {
        Ok(term as u8)
    } else {
        Err(ValidationError::InvalidTerm(term))
    }
}

/// Validates an admission year string (four digits, e.g. "2025").
pub fn validate_year(year: &str) -> Result<(), ValidationError> {
    let trimmed = year.trim();
    if trimmed.len() == 4 && trimmed.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(ValidationError::InvalidYear(year.to_string()))
    }
}
