//! Combined-document artifact repository.
//!
//! # Responsibility
//! - Persist generated artifact metadata for history and the recycle bin.
//!
//! # Invariants
//! - One (unit, year, term) key may accumulate many historical artifacts.
//! - Artifact rows carry the canonical soft-delete pair.

use crate::model::combined::CombinedDocument;
use crate::model::course::RecordId;
use crate::repo::course_repo::parse_term;
use crate::repo::{bool_to_int, int_to_bool, RepoResult};
use rusqlite::{params, Connection, Row};

const COMBINED_SELECT_SQL: &str = "SELECT
    id,
    unit_id,
    year,
    term,
    title,
    created_by,
    file_locator,
    created_at,
    is_deleted,
    deleted_at
FROM combined_documents";

/// Repository interface for combined artifacts.
pub trait CombinedDocumentRepository {
    fn insert_document(&self, document: &CombinedDocument) -> RepoResult<RecordId>;
    fn get_document(&self, id: RecordId, include_deleted: bool)
        -> RepoResult<Option<CombinedDocument>>;
    /// History for one key, newest first.
    fn list_for_key(
        &self,
        unit_id: Option<RecordId>,
        year: &str,
        term: u8,
    ) -> RepoResult<Vec<CombinedDocument>>;
}

/// SQLite-backed combined artifact repository.
pub struct SqliteCombinedDocumentRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCombinedDocumentRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl CombinedDocumentRepository for SqliteCombinedDocumentRepository<'_> {
    fn insert_document(&self, document: &CombinedDocument) -> RepoResult<RecordId> {
        crate::model::validate_year(&document.year)?;
        crate::model::validate_term(i64::from(document.term))?;

        self.conn.execute(
            "INSERT INTO combined_documents (
                unit_id,
                year,
                term,
                title,
                created_by,
                file_locator,
                created_at,
                is_deleted,
                deleted_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
            params![
                document.unit_id,
                document.year.as_str(),
                i64::from(document.term),
                document.title.as_str(),
                document.created_by.as_str(),
                document.file_locator.as_deref(),
                document.created_at,
                bool_to_int(document.is_deleted),
                document.deleted_at,
            ],
        )?;

        Ok(self.conn.last_insert_rowid())
    }

    fn get_document(
        &self,
        id: RecordId,
        include_deleted: bool,
    ) -> RepoResult<Option<CombinedDocument>> {
        let mut stmt = self.conn.prepare(&format!(
            "{COMBINED_SELECT_SQL}
             WHERE id = ?1
               AND (?2 = 1 OR is_deleted = 0);"
        ))?;

        let mut rows = stmt.query(params![id, bool_to_int(include_deleted)])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_combined_row(row)?));
        }

        Ok(None)
    }

    fn list_for_key(
        &self,
        unit_id: Option<RecordId>,
        year: &str,
        term: u8,
    ) -> RepoResult<Vec<CombinedDocument>> {
        let mut stmt = self.conn.prepare(&format!(
            "{COMBINED_SELECT_SQL}
             WHERE unit_id IS ?1
               AND year = ?2
               AND term = ?3
               AND is_deleted = 0
             ORDER BY created_at DESC, id DESC;"
        ))?;

        let mut rows = stmt.query(params![unit_id, year, i64::from(term)])?;
        let mut documents = Vec::new();
        while let Some(row) = rows.next()? {
            documents.push(parse_combined_row(row)?);
        }

        Ok(documents)
    }
}

fn parse_combined_row(row: &Row<'_>) -> RepoResult<CombinedDocument> {
    let is_deleted = int_to_bool(row.get("is_deleted")?, "combined_documents.is_deleted")?;

    Ok(CombinedDocument {
        id: row.get("id")?,
        unit_id: row.get("unit_id")?,
        year: row.get("year")?,
        term: parse_term(row.get("term")?, "combined_documents.term")?,
        title: row.get("title")?,
        created_by: row.get("created_by")?,
        file_locator: row.get("file_locator")?,
        created_at: row.get("created_at")?,
        is_deleted,
        deleted_at: row.get("deleted_at")?,
    })
}
