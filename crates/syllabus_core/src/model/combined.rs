//! Combined document artifacts produced by the assembly pipeline.

use super::course::RecordId;
use serde::{Deserialize, Serialize};

/// Merged output artifact for one (unit, year, term) key.
///
/// Multiple historical artifacts may exist for the same key; each one is
/// independently recyclable and purgeable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombinedDocument {
    pub id: RecordId,
    pub unit_id: Option<RecordId>,
    pub year: String,
    pub term: u8,
    pub title: String,
    pub created_by: String,
    /// Locator of the merged bytes in the binary-file store.
    pub file_locator: Option<String>,
    pub created_at: i64,
    pub is_deleted: bool,
    pub deleted_at: Option<i64>,
}
