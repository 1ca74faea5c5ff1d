//! Submission workflow use-case service.
//!
//! # Responsibility
//! - Accept faculty submissions, storing the rendered document bytes.
//! - Apply department-head decisions.
//! - Produce the decision queue and per-course status display rows.
//!
//! # Invariants
//! - New submissions always enter the workflow as `Pending`.
//! - A stored document is written before its submission row; a failed write
//!   leaves no row behind.
//! - Display rows cover every course in scope; courses without any
//!   submission appear with the not-submitted placeholder.

use crate::files::{FileStore, FileStoreError};
use crate::model::course::{Course, RecordId};
use crate::model::now_millis;
use crate::model::submission::{DecisionOutcome, Submission, SubmissionStatus};
use crate::repo::submission_repo::{PendingEntry, SubmissionRepository};
use crate::repo::{RepoError, RepoResult};
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Status label shown for a course with no submission on file.
pub const NOT_SUBMITTED_LABEL: &str = "not submitted";

/// Service error for submission use-cases.
#[derive(Debug)]
pub enum SubmissionServiceError {
    SubmissionNotFound(RecordId),
    Repo(RepoError),
    File(FileStoreError),
    /// Internal consistency mismatch between write and read-back.
    InconsistentState(&'static str),
}

impl Display for SubmissionServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SubmissionNotFound(id) => write!(f, "submission not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::File(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => {
                write!(f, "inconsistent submission state: {details}")
            }
        }
    }
}

impl Error for SubmissionServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::File(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for SubmissionServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound {
                entity: "submission",
                id,
            } => Self::SubmissionNotFound(id),
            other => Self::Repo(other),
        }
    }
}

impl From<FileStoreError> for SubmissionServiceError {
    fn from(value: FileStoreError) -> Self {
        Self::File(value)
    }
}

/// Input for one new submission.
#[derive(Debug, Clone)]
pub struct NewSubmission {
    pub course_id: RecordId,
    pub unit_id: Option<RecordId>,
    pub year: String,
    pub term: u8,
    pub author: String,
    pub title: String,
    /// Serialized document bytes to store alongside the row.
    pub document: Option<Vec<u8>>,
}

/// One per-course row of the submission status display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusRow {
    pub course_code: String,
    pub status_label: String,
    /// The current submission, absent for not-submitted courses.
    pub submission: Option<Submission>,
}

/// Submission service facade over the repository and document store.
pub struct SubmissionService<R: SubmissionRepository> {
    repo: R,
    files: Option<FileStore>,
}

impl<R: SubmissionRepository> SubmissionService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo, files: None }
    }

    /// Creates a service that also stores submitted document bytes.
    pub fn with_files(repo: R, files: FileStore) -> Self {
        Self {
            repo,
            files: Some(files),
        }
    }

    /// Records one submission. A newer submission for the same course key
    /// supersedes older ones without mutating them.
    pub fn submit(&mut self, new: NewSubmission) -> Result<Submission, SubmissionServiceError> {
        let locator = match (&new.document, &self.files) {
            (Some(bytes), Some(files)) => Some(files.store(bytes)?),
            _ => None,
        };

        let now = now_millis();
        let submission = Submission {
            id: 0,
            course_id: new.course_id,
            unit_id: new.unit_id,
            year: new.year,
            term: new.term,
            author: new.author,
            title: new.title,
            file_locator: locator,
            status: SubmissionStatus::Pending,
            approved_by: None,
            approved_at: None,
            rejected_by: None,
            rejected_at: None,
            created_at: now,
            updated_at: now,
        };

        let id = self.repo.create_submission(&submission)?;
        let created = self
            .repo
            .get_submission(id)?
            .ok_or(SubmissionServiceError::InconsistentState(
                "created submission not found in read-back",
            ))?;
        info!(
            "event=submit module=service status=ok submission={} course_id={}",
            created.id, created.course_id
        );
        Ok(created)
    }

    /// Applies one department-head decision and returns the updated record.
    pub fn decide(
        &mut self,
        id: RecordId,
        outcome: DecisionOutcome,
        actor: &str,
    ) -> Result<Submission, SubmissionServiceError> {
        let decided = self.repo.decide(id, outcome, actor, now_millis())?;
        info!(
            "event=decide module=service status=ok submission={} outcome={:?} actor={}",
            decided.id, outcome, actor
        );
        Ok(decided)
    }

    /// The decision queue: per course, the current submission still awaiting
    /// a decision.
    pub fn pending_queue(
        &mut self,
        unit_id: Option<RecordId>,
        year: &str,
        term: u8,
    ) -> RepoResult<Vec<PendingEntry>> {
        self.repo.pending_queue(unit_id, year, term)
    }

    pub fn current_for(
        &mut self,
        course_id: RecordId,
        unit_id: Option<RecordId>,
        year: &str,
        term: u8,
    ) -> RepoResult<Option<Submission>> {
        self.repo.current_for(course_id, unit_id, year, term)
    }

    /// Builds the status display for every course in scope. Courses without
    /// a submission get a synthesized placeholder row.
    pub fn status_rows(
        &mut self,
        courses: &[Course],
        unit_id: Option<RecordId>,
        year: &str,
        term: u8,
    ) -> RepoResult<Vec<StatusRow>> {
        let mut rows = Vec::with_capacity(courses.len());
        for course in courses {
            let current = self.repo.current_for(course.id, unit_id, year, term)?;
            let status_label = match &current {
                Some(submission) => submission.status.as_db().to_string(),
                None => NOT_SUBMITTED_LABEL.to_string(),
            };
            rows.push(StatusRow {
                course_code: course.code.clone(),
                status_label,
                submission: current,
            });
        }
        Ok(rows)
    }
}
