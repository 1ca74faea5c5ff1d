//! Course records for the two authoring sources.
//!
//! # Responsibility
//! - Define the central-office catalog course (`Course`).
//! - Define department-authored scheme rows (`UnitCourse`).
//!
//! # Invariants
//! - A `Course` with `unit_id = None` applies to all organizational units.
//! - `UnitCourse` rows are always bound to one (unit, year, term) key.
//! - A purged record never resurfaces; purge is terminal.

use super::{validate_term, ValidationError};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Stable row identifier for every persisted record.
pub type RecordId = i64;

static COURSE_CODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9A-Z]{3,16}$").expect("valid course code regex"));

/// Broad catalog category a course is filed under (BSC, ESC, PCC, ...).
///
/// Kept as free text in storage; this alias marks semantic intent.
pub type CourseCategory = String;

/// Weekly teaching hour split (lecture / tutorial / practical).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeachingHours {
    pub lecture: u32,
    pub tutorial: u32,
    pub practical: u32,
}

impl TeachingHours {
    pub fn total(&self) -> u32 {
        self.lecture + self.tutorial + self.practical
    }
}

/// Central-office catalog course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub id: RecordId,
    /// Catalog code, unique within its scope (e.g. `23IS306A`, `CS301`).
    pub code: String,
    pub title: String,
    pub category: CourseCategory,
    /// `None` means the course applies to all units.
    pub unit_id: Option<RecordId>,
    /// Academic term 1..=8; optional for cross-term catalog entries.
    pub term: Option<u8>,
    pub hours: TeachingHours,
    /// Continuous-assessment marks the course is evaluated out of.
    pub internal_marks: i64,
    /// End-of-term examination marks.
    pub exam_marks: i64,
    pub credits: f64,
    pub created_by: String,
    pub created_at: i64,
    pub is_deleted: bool,
    pub deleted_at: Option<i64>,
}

impl Course {
    /// Checks code shape, title presence and term range.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_course_code(&self.code)?;
        if self.title.trim().is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        if let Some(term) = self.term {
            validate_term(i64::from(term))?;
        }
        Ok(())
    }

    /// Returns whether this course should be considered visible/active.
    pub fn is_active(&self) -> bool {
        !self.is_deleted
    }
}

/// Department-authored scheme row for one (unit, year, term) key.
///
/// This is the second authorship source feeding document assembly; it keeps
/// its own lifecycle flag (`deleted`, no timestamp) for historical reasons.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitCourse {
    pub id: RecordId,
    pub unit_id: RecordId,
    pub year: String,
    pub term: u8,
    pub code: String,
    pub title: String,
    pub category: CourseCategory,
    pub is_elective: bool,
    pub hours: TeachingHours,
    pub credits: f64,
    pub created_at: i64,
    pub updated_at: i64,
    pub deleted: bool,
}

impl UnitCourse {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_course_code(&self.code)?;
        validate_term(i64::from(self.term))?;
        super::validate_year(&self.year)?;
        Ok(())
    }
}

/// Validates a catalog course code (uppercase alphanumeric, 3..=16 chars).
pub fn validate_course_code(code: &str) -> Result<(), ValidationError> {
    if COURSE_CODE_RE.is_match(code) {
        Ok(())
    } else {
        Err(ValidationError::InvalidCourseCode(code.to_string()))
    }
}
