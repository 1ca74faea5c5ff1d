//! Syllabus content repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist structured syllabus sections as JSON columns.
//! - Enforce the one-current-record-per-course rule on save.
//!
//! # Invariants
//! - `save_full` is a full replace of all sections, never a patch.
//! - Read paths reject malformed persisted JSON instead of masking it.
//! - The syllabus soft-delete flag is independent of its course's flag.

use crate::model::course::RecordId;
use crate::model::now_millis;
use crate::model::syllabus::{
    AssessmentRow, BookEntry, ModuleUnit, OutcomeMapping, SyllabusContent,
};
use crate::repo::{int_to_bool, RepoResult};
use rusqlite::{params, Connection, Row};

const SYLLABUS_SELECT_SQL: &str = "SELECT
    id,
    course_id,
    objectives,
    outcomes,
    outcome_mapping,
    modules,
    assessment_rows,
    textbooks,
    reference_books,
    articulation_matrix,
    created_at,
    updated_at,
    is_deleted,
    deleted_at
FROM syllabi";

/// Repository interface for structured syllabus content.
pub trait SyllabusRepository {
    /// Saves content for a course: replaces the current record when one
    /// exists, creates it otherwise. Returns the record id.
    fn save_full(&self, content: &SyllabusContent) -> RepoResult<RecordId>;
    /// Current (non-deleted) content for one course, newest first on ties.
    fn current_for_course(&self, course_id: RecordId) -> RepoResult<Option<SyllabusContent>>;
}

/// SQLite-backed syllabus repository.
pub struct SqliteSyllabusRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteSyllabusRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl SyllabusRepository for SqliteSyllabusRepository<'_> {
    fn save_full(&self, content: &SyllabusContent) -> RepoResult<RecordId> {
        let now = now_millis();
        let objectives = serde_json::to_string(&content.objectives)?;
        let outcomes = serde_json::to_string(&content.outcomes)?;
        let outcome_mapping = serde_json::to_string(&content.outcome_mapping)?;
        let modules = serde_json::to_string(&content.modules)?;
        let assessment = serde_json::to_string(&content.assessment)?;
        let textbooks = serde_json::to_string(&content.textbooks)?;
        let reference_books = serde_json::to_string(&content.reference_books)?;
        let matrix = serde_json::to_string(&content.articulation_matrix)?;

        let existing: Option<RecordId> = self
            .conn
            .query_row(
                "SELECT id FROM syllabi
                 WHERE course_id = ?1 AND is_deleted = 0
                 ORDER BY created_at DESC, id DESC
                 LIMIT 1;",
                [content.course_id],
                |row| row.get(0),
            )
            .map(Some)
            .or_else(|err| match err {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(other),
            })?;

        if let Some(id) = existing {
            self.conn.execute(
                "UPDATE syllabi
                 SET
                    objectives = ?1,
                    outcomes = ?2,
                    outcome_mapping = ?3,
                    modules = ?4,
                    assessment_rows = ?5,
                    textbooks = ?6,
                    reference_books = ?7,
                    articulation_matrix = ?8,
                    updated_at = ?9
                 WHERE id = ?10;",
                params![
                    objectives,
                    outcomes,
                    outcome_mapping,
                    modules,
                    assessment,
                    textbooks,
                    reference_books,
                    matrix,
                    now,
                    id,
                ],
            )?;
            return Ok(id);
        }

        self.conn.execute(
            "INSERT INTO syllabi (
                course_id,
                objectives,
                outcomes,
                outcome_mapping,
                modules,
                assessment_rows,
                textbooks,
                reference_books,
                articulation_matrix,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10);",
            params![
                content.course_id,
                objectives,
                outcomes,
                outcome_mapping,
                modules,
                assessment,
                textbooks,
                reference_books,
                matrix,
                now,
            ],
        )?;

        Ok(self.conn.last_insert_rowid())
    }

    fn current_for_course(&self, course_id: RecordId) -> RepoResult<Option<SyllabusContent>> {
        let mut stmt = self.conn.prepare(&format!(
            "{SYLLABUS_SELECT_SQL}
             WHERE course_id = ?1 AND is_deleted = 0
             ORDER BY created_at DESC, id DESC
             LIMIT 1;"
        ))?;

        let mut rows = stmt.query([course_id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_syllabus_row(row)?));
        }

        Ok(None)
    }
}

fn parse_syllabus_row(row: &Row<'_>) -> RepoResult<SyllabusContent> {
    let objectives: Vec<String> = serde_json::from_str(&row.get::<_, String>("objectives")?)?;
    let outcomes: Vec<String> = serde_json::from_str(&row.get::<_, String>("outcomes")?)?;
    let outcome_mapping: Vec<OutcomeMapping> =
        serde_json::from_str(&row.get::<_, String>("outcome_mapping")?)?;
    let modules: Vec<ModuleUnit> = serde_json::from_str(&row.get::<_, String>("modules")?)?;
    let assessment: Vec<AssessmentRow> =
        serde_json::from_str(&row.get::<_, String>("assessment_rows")?)?;
    let textbooks: Vec<BookEntry> = serde_json::from_str(&row.get::<_, String>("textbooks")?)?;
    let reference_books: Vec<BookEntry> =
        serde_json::from_str(&row.get::<_, String>("reference_books")?)?;
    let articulation_matrix: Vec<Vec<Option<u8>>> =
        serde_json::from_str(&row.get::<_, String>("articulation_matrix")?)?;
    let is_deleted = int_to_bool(row.get("is_deleted")?, "syllabi.is_deleted")?;

    Ok(SyllabusContent {
        id: row.get("id")?,
        course_id: row.get("course_id")?,
        objectives,
        outcomes,
        outcome_mapping,
        modules,
        assessment,
        textbooks,
        reference_books,
        articulation_matrix,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
        is_deleted,
        deleted_at: row.get("deleted_at")?,
    })
}
