//! Combined-document use-case entry points.
//!
//! # Responsibility
//! - Run the assembly pipeline for one scope.
//! - List the generation history for one scope.

use crate::assemble::{
    AssembleResult, AssemblyOutput, AssemblyPipeline, AssemblyScope, CancelToken, Selection,
};
use crate::files::FileStore;
use crate::model::combined::CombinedDocument;
use crate::model::course::RecordId;
use crate::repo::combined_repo::{CombinedDocumentRepository, SqliteCombinedDocumentRepository};
use crate::repo::RepoResult;
use rusqlite::Connection;

/// Assembles one combined document for the scope and persists it when a file
/// store is provided.
pub fn generate_combined(
    conn: &mut Connection,
    files: Option<&FileStore>,
    scope: &AssemblyScope,
    selection: &Selection,
    cancel: &CancelToken,
) -> AssembleResult<AssemblyOutput> {
    AssemblyPipeline::new(conn, files).run(scope, selection, cancel)
}

/// Generation history for one scope, newest first.
pub fn document_history(
    conn: &Connection,
    unit_id: Option<RecordId>,
    year: &str,
    term: u8,
) -> RepoResult<Vec<CombinedDocument>> {
    SqliteCombinedDocumentRepository::new(conn).list_for_key(unit_id, year, term)
}
