//! Generic soft-delete/recycle-bin ledger.
//!
//! # Responsibility
//! - Provide uniform recycle/restore/purge operations over heterogeneous
//!   record types whose deleted representation differs per type.
//! - Probe each type's schema for its deletion flag and timestamp columns.
//!
//! # Invariants
//! - Column probing never fails; absence is a typed "not found" the caller
//!   branches on.
//! - `soft_delete`/`restore` are idempotent.
//! - Purge is terminal: a hard-deleted record cannot be mutated further.
//! - File cleanup during purge is best-effort and never blocks record
//!   deletion.

use crate::db::DbError;
use crate::files::FileStore;
use crate::model::course::RecordId;
use crate::model::now_millis;
use log::{info, warn};
use rusqlite::{params, Connection};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Deletion flag column names, canonical first, then legacy alternates.
const FLAG_COLUMNS: &[&str] = &["is_deleted", "deleted", "is_removed", "removed"];

/// Deletion timestamp column names, probed in priority order.
const TIMESTAMP_COLUMNS: &[&str] = &["deleted_at", "deleted_on", "removed_at", "deleted_date"];

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

pub type RecycleResult<T> = Result<T, RecycleError>;

/// Ledger error; save failures are reported distinctly from probe misses.
#[derive(Debug)]
pub enum RecycleError {
    /// The external type name does not match any registered record type.
    UnknownType(String),
    /// The record type has no detectable deletion flag column; callers must
    /// skip the type rather than fail a whole sweep.
    NoDeletionField(&'static str),
    NotFound {
        record_type: &'static str,
        id: RecordId,
    },
    Db(DbError),
}

impl Display for RecycleError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownType(name) => write!(f, "unknown record type `{name}`"),
            Self::NoDeletionField(record_type) => {
                write!(f, "record type `{record_type}` has no deletion flag column")
            }
            Self::NotFound { record_type, id } => {
                write!(f, "{record_type} record not found: {id}")
            }
            Self::Db(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RecycleError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for RecycleError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Descriptor for one recyclable record type.
///
/// Types declare their table and attached-file columns explicitly; the
/// deletion flag/timestamp columns are probed against the live schema so the
/// ledger keeps working across legacy column spellings.
#[derive(Debug, Clone, Copy)]
pub struct RecordType {
    /// External name used by callers (`recycle`, `restore`, `purge` APIs).
    pub name: &'static str,
    pub table: &'static str,
    /// Column shown as the record label in recycle-bin listings.
    pub label_column: &'static str,
    /// Columns holding binary-file locators to clean up on purge.
    pub file_columns: &'static [&'static str],
}

/// All record types the recycle bin operates on.
pub const RECORD_TYPES: &[RecordType] = &[
    RecordType {
        name: "course",
        table: "courses",
        label_column: "course_code",
        file_columns: &[],
    },
    RecordType {
        name: "syllabus",
        table: "syllabi",
        label_column: "id",
        file_columns: &[],
    },
    RecordType {
        name: "unit_course",
        table: "unit_courses",
        label_column: "course_code",
        file_columns: &[],
    },
    RecordType {
        name: "combined_document",
        table: "combined_documents",
        label_column: "title",
        file_columns: &["file_locator"],
    },
];

/// Looks up a record type by its external name.
pub fn record_type(name: &str) -> RecycleResult<&'static RecordType> {
    RECORD_TYPES
        .iter()
        .find(|rt| rt.name == name)
        .ok_or_else(|| RecycleError::UnknownType(name.to_string()))
}

/// One recycle-bin listing entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecycledRecord {
    pub id: RecordId,
    pub label: String,
    pub deleted_at: Option<i64>,
}

/// Outcome report of one purge run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurgeReport {
    pub record_type: &'static str,
    pub dry_run: bool,
    /// `None` when the type has no timestamp column; such types are purged
    /// regardless of age once flagged deleted (documented policy).
    pub cutoff: Option<i64>,
    /// Ids a real run would delete / a real run did delete.
    pub candidates: Vec<RecordId>,
    pub purged: usize,
    /// Best-effort file cleanup failures; never abort the record purge.
    pub file_errors: Vec<String>,
    /// Per-record delete failures; the sweep continues past them.
    pub errors: Vec<String>,
}

/// Uniform soft-delete operations over registered record types.
pub struct SoftDeleteLedger<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SoftDeleteLedger<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Returns the deletion flag column for a type, or `None` when the type
    /// has no soft-delete capability.
    pub fn probe_deletion_field(&self, rt: &RecordType) -> RecycleResult<Option<String>> {
        self.probe_first_column(rt.table, FLAG_COLUMNS)
    }

    /// Returns the deletion timestamp column for a type. Absence is legal
    /// and means no time-bounded purge is possible for the type.
    pub fn probe_timestamp_field(&self, rt: &RecordType) -> RecycleResult<Option<String>> {
        self.probe_first_column(rt.table, TIMESTAMP_COLUMNS)
    }

    /// Flags a record deleted and stamps the deletion time when the type has
    /// a timestamp column. Re-deleting an already-deleted record is a no-op.
    pub fn soft_delete(&self, rt: &RecordType, id: RecordId) -> RecycleResult<()> {
        let flag = self
            .probe_deletion_field(rt)?
            .ok_or(RecycleError::NoDeletionField(rt.name))?;
        let timestamp = self.probe_timestamp_field(rt)?;

        let changed = match &timestamp {
            Some(ts) => self.conn.execute(
                &format!(
                    "UPDATE {table} SET {flag} = 1, {ts} = ?1 WHERE id = ?2 AND {flag} = 0;",
                    table = rt.table
                ),
                params![now_millis(), id],
            )?,
            None => self.conn.execute(
                &format!(
                    "UPDATE {table} SET {flag} = 1 WHERE id = ?1 AND {flag} = 0;",
                    table = rt.table
                ),
                params![id],
            )?,
        };

        if changed == 0 && !self.record_exists(rt, id)? {
            return Err(RecycleError::NotFound {
                record_type: rt.name,
                id,
            });
        }

        info!(
            "event=recycle module=recycle status=ok type={} id={} changed={}",
            rt.name, id, changed
        );
        Ok(())
    }

    /// Clears the deletion flag and timestamp. Restoring an active record is
    /// a no-op.
    pub fn restore(&self, rt: &RecordType, id: RecordId) -> RecycleResult<()> {
        let flag = self
            .probe_deletion_field(rt)?
            .ok_or(RecycleError::NoDeletionField(rt.name))?;
        let timestamp = self.probe_timestamp_field(rt)?;

        let sql = match &timestamp {
            Some(ts) => format!(
                "UPDATE {table} SET {flag} = 0, {ts} = NULL WHERE id = ?1 AND {flag} = 1;",
                table = rt.table
            ),
            None => format!(
                "UPDATE {table} SET {flag} = 0 WHERE id = ?1 AND {flag} = 1;",
                table = rt.table
            ),
        };
        let changed = self.conn.execute(&sql, params![id])?;

        if changed == 0 && !self.record_exists(rt, id)? {
            return Err(RecycleError::NotFound {
                record_type: rt.name,
                id,
            });
        }

        info!(
            "event=restore module=recycle status=ok type={} id={} changed={}",
            rt.name, id, changed
        );
        Ok(())
    }

    /// Lists currently recycled records of one type for display.
    pub fn list_recycled(&self, rt: &RecordType) -> RecycleResult<Vec<RecycledRecord>> {
        let flag = self
            .probe_deletion_field(rt)?
            .ok_or(RecycleError::NoDeletionField(rt.name))?;
        let timestamp = self.probe_timestamp_field(rt)?;

        let ts_expr = timestamp.as_deref().unwrap_or("NULL");
        let sql = format!(
            "SELECT id, {label}, {ts_expr} FROM {table} WHERE {flag} = 1 ORDER BY id ASC;",
            label = rt.label_column,
            table = rt.table
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([])?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(RecycledRecord {
                id: row.get(0)?,
                label: row.get::<_, rusqlite::types::Value>(1).map(label_text)?,
                deleted_at: row.get(2)?,
            });
        }
        Ok(records)
    }

    /// Hard-deletes recycled records older than the cutoff, including
    /// best-effort removal of attached files. Types without a timestamp
    /// column are purged regardless of age once flagged deleted.
    ///
    /// In dry-run mode nothing is mutated; the report lists what a real run
    /// would delete.
    pub fn purge(
        &self,
        rt: &RecordType,
        file_store: Option<&FileStore>,
        older_than_days: i64,
        dry_run: bool,
    ) -> RecycleResult<PurgeReport> {
        let flag = self
            .probe_deletion_field(rt)?
            .ok_or(RecycleError::NoDeletionField(rt.name))?;
        let timestamp = self.probe_timestamp_field(rt)?;
        let cutoff = timestamp
            .as_ref()
            .map(|_| now_millis() - older_than_days * MILLIS_PER_DAY);

        let candidates = self.purge_candidates(rt, &flag, timestamp.as_deref(), cutoff)?;
        let mut report = PurgeReport {
            record_type: rt.name,
            dry_run,
            cutoff,
            candidates: candidates.clone(),
            purged: 0,
            file_errors: Vec::new(),
            errors: Vec::new(),
        };

        if dry_run {
            info!(
                "event=purge module=recycle status=dry_run type={} candidates={}",
                rt.name,
                report.candidates.len()
            );
            return Ok(report);
        }

        for id in candidates {
            self.cleanup_record_files(rt, id, file_store, &mut report.file_errors)?;

            let delete_sql = format!("DELETE FROM {} WHERE id = ?1;", rt.table);
            match self.conn.execute(&delete_sql, params![id]) {
                Ok(_) => report.purged += 1,
                Err(err) => {
                    warn!(
                        "event=purge module=recycle status=error type={} id={} error={}",
                        rt.name, id, err
                    );
                    report.errors.push(format!("{}#{id}: {err}", rt.name));
                }
            }
        }

        info!(
            "event=purge module=recycle status=ok type={} purged={} file_errors={}",
            rt.name,
            report.purged,
            report.file_errors.len()
        );
        Ok(report)
    }

    fn purge_candidates(
        &self,
        rt: &RecordType,
        flag: &str,
        timestamp: Option<&str>,
        cutoff: Option<i64>,
    ) -> RecycleResult<Vec<RecordId>> {
        let sql = match (timestamp, cutoff) {
            (Some(ts), Some(_)) => format!(
                "SELECT id FROM {table}
                 WHERE {flag} = 1 AND {ts} IS NOT NULL AND {ts} <= ?1
                 ORDER BY id ASC;",
                table = rt.table
            ),
            _ => format!(
                "SELECT id FROM {table} WHERE {flag} = 1 ORDER BY id ASC;",
                table = rt.table
            ),
        };

        let mut stmt = self.conn.prepare(&sql)?;
        let mut ids = Vec::new();
        if let Some(cutoff) = cutoff {
            let mut rows = stmt.query(params![cutoff])?;
            while let Some(row) = rows.next()? {
                ids.push(row.get(0)?);
            }
        } else {
            let mut rows = stmt.query([])?;
            while let Some(row) = rows.next()? {
                ids.push(row.get(0)?);
            }
        }
        Ok(ids)
    }

    fn cleanup_record_files(
        &self,
        rt: &RecordType,
        id: RecordId,
        file_store: Option<&FileStore>,
        file_errors: &mut Vec<String>,
    ) -> RecycleResult<()> {
        let Some(store) = file_store else {
            return Ok(());
        };

        for column in rt.file_columns {
            let sql = format!(
                "SELECT {column} FROM {table} WHERE id = ?1;",
                table = rt.table
            );
            let locator: Option<String> =
                self.conn
                    .query_row(&sql, params![id], |row| row.get(0))
                    .or_else(|err| match err {
                        rusqlite::Error::QueryReturnedNoRows => Ok(None),
                        other => Err(other),
                    })?;

            if let Some(locator) = locator {
                if let Err(err) = store.delete(&locator) {
                    warn!(
                        "event=purge_file module=recycle status=error type={} id={} locator={} error={}",
                        rt.name, id, locator, err
                    );
                    file_errors.push(format!("{}#{id} {locator}: {err}", rt.name));
                }
            }
        }
        Ok(())
    }

    fn record_exists(&self, rt: &RecordType, id: RecordId) -> RecycleResult<bool> {
        let sql = format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE id = ?1);",
            rt.table
        );
        let exists: i64 = self.conn.query_row(&sql, params![id], |row| row.get(0))?;
        Ok(exists == 1)
    }

    fn probe_first_column(
        &self,
        table: &str,
        names: &[&str],
    ) -> RecycleResult<Option<String>> {
        for name in names {
            if self.table_has_column(table, name)? {
                return Ok(Some((*name).to_string()));
            }
        }
        Ok(None)
    }

    fn table_has_column(&self, table: &str, column: &str) -> RecycleResult<bool> {
        let mut stmt = self.conn.prepare(&format!("PRAGMA table_info({table});"))?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let current: String = row.get(1)?;
            if current == column {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

fn label_text(value: rusqlite::types::Value) -> String {
    match value {
        rusqlite::types::Value::Text(text) => text,
        rusqlite::types::Value::Integer(id) => id.to_string(),
        other => format!("{other:?}"),
    }
}
