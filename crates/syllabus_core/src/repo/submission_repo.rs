//! Submission repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist faculty submissions and their decision state.
//! - Serialize decisions per-record so two concurrent department-head
//!   decisions cannot interleave.
//!
//! # Invariants
//! - `decide` runs as one immediate (write-locking) transaction.
//! - Decisions on superseded submissions are rejected with
//!   `InvalidTransition`.
//! - Queue queries return at most one submission per course.

use crate::model::course::RecordId;
use crate::model::submission::{DecisionOutcome, Submission, SubmissionStatus};
use crate::repo::course_repo::parse_term;
use crate::repo::{RepoError, RepoResult};
use crate::select::select_latest;
use rusqlite::{params, Connection, Row, TransactionBehavior};

const SUBMISSION_SELECT_SQL: &str = "SELECT
    s.id,
    s.course_id,
    s.unit_id,
    s.year,
    s.term,
    s.author,
    s.title,
    s.file_locator,
    s.status,
    s.approved_by,
    s.approved_at,
    s.rejected_by,
    s.rejected_at,
    s.created_at,
    s.updated_at
FROM submissions s";

/// One decision-queue entry: the current submission for a course.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingEntry {
    pub course_code: String,
    pub submission: Submission,
}

/// Repository interface for faculty submissions.
pub trait SubmissionRepository {
    /// Inserts a submission; new submissions always start `Pending`.
    fn create_submission(&mut self, submission: &Submission) -> RepoResult<RecordId>;
    fn get_submission(&mut self, id: RecordId) -> RepoResult<Option<Submission>>;
    /// All submissions for one (unit, year, term) key in insertion order.
    fn list_for_key(
        &mut self,
        unit_id: Option<RecordId>,
        year: &str,
        term: u8,
    ) -> RepoResult<Vec<Submission>>;
    /// Applies a department-head decision atomically and returns the updated
    /// record.
    fn decide(
        &mut self,
        id: RecordId,
        outcome: DecisionOutcome,
        actor: &str,
        now: i64,
    ) -> RepoResult<Submission>;
    /// The current (latest, non-superseded) submission for one course key.
    fn current_for(
        &mut self,
        course_id: RecordId,
        unit_id: Option<RecordId>,
        year: &str,
        term: u8,
    ) -> RepoResult<Option<Submission>>;
    /// Per course, the current submission still awaiting a decision; courses
    /// whose current submission is approved are excluded.
    fn pending_queue(
        &mut self,
        unit_id: Option<RecordId>,
        year: &str,
        term: u8,
    ) -> RepoResult<Vec<PendingEntry>>;
}

/// SQLite-backed submission repository.
///
/// Holds a mutable connection because `decide` needs transaction ownership.
pub struct SqliteSubmissionRepository<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteSubmissionRepository<'conn> {
    pub fn new(conn: &'conn mut Connection) -> Self {
        Self { conn }
    }
}

impl SubmissionRepository for SqliteSubmissionRepository<'_> {
    fn create_submission(&mut self, submission: &Submission) -> RepoResult<RecordId> {
        crate::model::validate_year(&submission.year)?;
        crate::model::validate_term(i64::from(submission.term))?;

        self.conn.execute(
            "INSERT INTO submissions (
                course_id,
                unit_id,
                year,
                term,
                author,
                title,
                file_locator,
                status,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 'pending', ?8, ?8);",
            params![
                submission.course_id,
                submission.unit_id,
                submission.year.as_str(),
                i64::from(submission.term),
                submission.author.as_str(),
                submission.title.as_str(),
                submission.file_locator.as_deref(),
                submission.created_at,
            ],
        )?;

        Ok(self.conn.last_insert_rowid())
    }

    fn get_submission(&mut self, id: RecordId) -> RepoResult<Option<Submission>> {
        get_submission_impl(self.conn, id)
    }

    fn list_for_key(
        &mut self,
        unit_id: Option<RecordId>,
        year: &str,
        term: u8,
    ) -> RepoResult<Vec<Submission>> {
        let mut stmt = self.conn.prepare(&format!(
            "{SUBMISSION_SELECT_SQL}
             WHERE s.unit_id IS ?1
               AND s.year = ?2
               AND s.term = ?3
             ORDER BY s.id ASC;"
        ))?;

        let mut rows = stmt.query(params![unit_id, year, i64::from(term)])?;
        let mut submissions = Vec::new();
        while let Some(row) = rows.next()? {
            submissions.push(parse_submission_row(row)?);
        }

        Ok(submissions)
    }

    fn decide(
        &mut self,
        id: RecordId,
        outcome: DecisionOutcome,
        actor: &str,
        now: i64,
    ) -> RepoResult<Submission> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let mut submission = {
            let mut stmt = tx.prepare(&format!("{SUBMISSION_SELECT_SQL} WHERE s.id = ?1;"))?;
            let mut rows = stmt.query([id])?;
            match rows.next()? {
                Some(row) => parse_submission_row(row)?,
                None => {
                    return Err(RepoError::NotFound {
                        entity: "submission",
                        id,
                    })
                }
            }
        };

        // Superseded submissions are frozen: deciding them now would produce
        // confusing back-dated decisions.
        let superseded: i64 = tx.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM submissions
                WHERE course_id = ?1
                  AND unit_id IS ?2
                  AND year = ?3
                  AND term = ?4
                  AND (created_at > ?5 OR (created_at = ?5 AND id > ?6))
            );",
            params![
                submission.course_id,
                submission.unit_id,
                submission.year.as_str(),
                i64::from(submission.term),
                submission.created_at,
                submission.id,
            ],
            |row| row.get(0),
        )?;
        if superseded == 1 {
            return Err(RepoError::InvalidTransition {
                submission: id,
                reason: "superseded by a newer submission for the same course".to_string(),
            });
        }

        submission.apply_decision(outcome, actor, now);

        tx.execute(
            "UPDATE submissions
             SET
                status = ?1,
                approved_by = ?2,
                approved_at = ?3,
                rejected_by = ?4,
                rejected_at = ?5,
                updated_at = ?6
             WHERE id = ?7;",
            params![
                submission.status.as_db(),
                submission.approved_by.as_deref(),
                submission.approved_at,
                submission.rejected_by.as_deref(),
                submission.rejected_at,
                submission.updated_at,
                id,
            ],
        )?;
        tx.commit()?;

        Ok(submission)
    }

    fn current_for(
        &mut self,
        course_id: RecordId,
        unit_id: Option<RecordId>,
        year: &str,
        term: u8,
    ) -> RepoResult<Option<Submission>> {
        let all = self.list_for_key(unit_id, year, term)?;
        let mut latest = select_latest(
            all.into_iter().filter(|s| s.course_id == course_id),
            |s| s.course_id,
            |s| s.created_at,
        );
        Ok(latest.remove(&course_id))
    }

    fn pending_queue(
        &mut self,
        unit_id: Option<RecordId>,
        year: &str,
        term: u8,
    ) -> RepoResult<Vec<PendingEntry>> {
        let sql = SUBMISSION_SELECT_SQL.replacen(
            "FROM submissions s",
            ", c.course_code FROM submissions s",
            1,
        );
        let mut stmt = self.conn.prepare(&format!(
            "{sql}
             INNER JOIN courses c ON c.id = s.course_id
             WHERE s.unit_id IS ?1
               AND s.year = ?2
               AND s.term = ?3
             ORDER BY s.id ASC;"
        ))?;

        let mut rows = stmt.query(params![unit_id, year, i64::from(term)])?;
        let mut candidates: Vec<(String, Submission)> = Vec::new();
        while let Some(row) = rows.next()? {
            let submission = parse_submission_row(row)?;
            let code: String = row.get("course_code")?;
            candidates.push((code, submission));
        }

        let latest = select_latest(candidates, |(_, s)| s.course_id, |(_, s)| s.created_at);
        let mut queue: Vec<PendingEntry> = latest
            .into_values()
            .filter(|(_, submission)| submission.awaits_decision())
            .map(|(course_code, submission)| PendingEntry {
                course_code,
                submission,
            })
            .collect();
        queue.sort_by(|a, b| a.course_code.cmp(&b.course_code));

        Ok(queue)
    }
}

fn get_submission_impl(conn: &Connection, id: RecordId) -> RepoResult<Option<Submission>> {
    let mut stmt = conn.prepare(&format!("{SUBMISSION_SELECT_SQL} WHERE s.id = ?1;"))?;
    let mut rows = stmt.query([id])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_submission_row(row)?));
    }
    Ok(None)
}

fn parse_submission_row(row: &Row<'_>) -> RepoResult<Submission> {
    let status_text: String = row.get("status")?;
    let status = SubmissionStatus::parse(&status_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid status `{status_text}` in submissions.status"
        ))
    })?;

    Ok(Submission {
        id: row.get("id")?,
        course_id: row.get("course_id")?,
        unit_id: row.get("unit_id")?,
        year: row.get("year")?,
        term: parse_term(row.get("term")?, "submissions.term")?,
        author: row.get("author")?,
        title: row.get("title")?,
        file_locator: row.get("file_locator")?,
        status,
        approved_by: row.get("approved_by")?,
        approved_at: row.get("approved_at")?,
        rejected_by: row.get("rejected_by")?,
        rejected_at: row.get("rejected_at")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
