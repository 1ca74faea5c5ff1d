//! Structured syllabus content attached to a course.
//!
//! # Responsibility
//! - Define the section data a syllabus document is rendered from.
//! - Keep JSON-backed sub-structures (modules, books, matrix) strongly typed.
//!
//! # Invariants
//! - A course has at most one current (non-deleted) syllabus record.
//! - Saving a syllabus is a full replace, never a partial patch.
//! - The syllabus lifecycle flag is independent of its course's flag.

use super::course::RecordId;
use serde::{Deserialize, Serialize};

/// Mapping from one course outcome to the objectives/programme outcomes it
/// addresses, by 1-based index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeMapping {
    pub outcome: u32,
    pub objectives: Vec<u32>,
}

/// One teaching module with its topic list and allotted hours.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleUnit {
    pub title: String,
    pub topics: Vec<String>,
    pub hours: u32,
}

/// One row of the continuous-assessment plan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessmentRow {
    pub tool: String,
    pub remarks: String,
    pub marks: u32,
}

/// Book list entry with per-entry metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookEntry {
    pub title: String,
    pub authors: String,
    pub edition: String,
    pub publisher: String,
    pub year: String,
}

/// Structured syllabus content for one course.
///
/// Every section is optional in the sense that an empty collection means
/// "section absent"; the renderer omits absent sections entirely.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyllabusContent {
    pub id: RecordId,
    pub course_id: RecordId,
    pub objectives: Vec<String>,
    pub outcomes: Vec<String>,
    pub outcome_mapping: Vec<OutcomeMapping>,
    pub modules: Vec<ModuleUnit>,
    pub assessment: Vec<AssessmentRow>,
    pub textbooks: Vec<BookEntry>,
    pub reference_books: Vec<BookEntry>,
    /// Articulation matrix cells, one row per outcome; each row must span the
    /// fixed programme-outcome columns. `None` cells render blank.
    pub articulation_matrix: Vec<Vec<Option<u8>>>,
    pub created_at: i64,
    pub updated_at: i64,
    pub is_deleted: bool,
    pub deleted_at: Option<i64>,
}

impl SyllabusContent {
    /// Creates empty content for a course; all sections start absent.
    pub fn empty(course_id: RecordId) -> Self {
        Self {
            course_id,
            ..Self::default()
        }
    }

    /// Sum of marks across structured assessment rows.
    pub fn assessment_total(&self) -> u32 {
        self.assessment.iter().map(|row| row.marks).sum()
    }

    /// Outcome count used to size the articulation matrix.
    ///
    /// Defaults to 4 when no outcomes are recorded, keeping matrix layout
    /// stable for content still being authored.
    pub fn effective_outcome_count(&self) -> usize {
        if self.outcomes.is_empty() {
            4
        } else {
            self.outcomes.len()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{AssessmentRow, SyllabusContent};

    #[test]
    fn assessment_total_sums_rows() {
        let mut content = SyllabusContent::empty(1);
        content.assessment = vec![
            AssessmentRow {
                tool: "Internals".to_string(),
                remarks: "three tests".to_string(),
                marks: 30,
            },
            AssessmentRow {
                tool: "AAT".to_string(),
                remarks: "lab evaluation".to_string(),
                marks: 20,
            },
        ];
        assert_eq!(content.assessment_total(), 50);
    }

    #[test]
    fn outcome_count_defaults_to_four() {
        let mut content = SyllabusContent::empty(1);
        assert_eq!(content.effective_outcome_count(), 4);
        content.outcomes = vec!["analyze".to_string(), "design".to_string()];
        assert_eq!(content.effective_outcome_count(), 2);
    }
}
