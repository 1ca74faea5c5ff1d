//! Combined-document assembly pipeline.
//!
//! # Responsibility
//! - Gather the courses for one (unit, year, term) key, resolve the
//!   authoritative document per course, and concatenate the results into a
//!   single combined artifact.
//! - Persist the artifact bytes and its history row.
//!
//! # Invariants
//! - One section per course code; explicit selections keep caller order,
//!   automatic runs are ordered by course code.
//! - A per-course failure skips that course and never aborts the run.
//! - Cancellation is checked between courses; a cancelled run persists
//!   nothing.
//! - Persist failures are reported in the output, not raised; the assembled
//!   bytes are still returned.

use crate::files::{FileStore, FileStoreError};
use crate::model::combined::CombinedDocument;
use crate::model::course::{Course, RecordId, UnitCourse};
use crate::model::now_millis;
use crate::model::submission::Submission;
use crate::render::{CourseRenderer, Document, RenderError, SectionRenderer};
use crate::repo::combined_repo::{CombinedDocumentRepository, SqliteCombinedDocumentRepository};
use crate::repo::course_repo::{
    CourseRepository, SqliteCourseRepository, SqliteUnitCourseRepository, UnitCourseRepository,
};
use crate::repo::submission_repo::{SqliteSubmissionRepository, SubmissionRepository};
use crate::repo::syllabus_repo::{SqliteSyllabusRepository, SyllabusRepository};
use crate::repo::RepoError;
use crate::select::select_latest;
use log::{info, warn};
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub type AssembleResult<T> = Result<T, AssembleError>;

/// Assembly pipeline error.
#[derive(Debug)]
pub enum AssembleError {
    /// No course produced a document; there is nothing to combine.
    NoInputDocuments,
    /// The run was cancelled before completion; nothing was persisted.
    Cancelled,
    Repo(RepoError),
    Render(RenderError),
    File(FileStoreError),
}

impl Display for AssembleError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoInputDocuments => write!(f, "no input documents for this scope"),
            Self::Cancelled => write!(f, "assembly cancelled"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::Render(err) => write!(f, "{err}"),
            Self::File(err) => write!(f, "{err}"),
        }
    }
}

impl Error for AssembleError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::Render(err) => Some(err),
            Self::File(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for AssembleError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<RenderError> for AssembleError {
    fn from(value: RenderError) -> Self {
        Self::Render(value)
    }
}

impl From<FileStoreError> for AssembleError {
    fn from(value: FileStoreError) -> Self {
        Self::File(value)
    }
}

/// What to assemble. Both lists empty means a fully automatic run over every
/// course in scope.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    /// Courses to include, in caller order.
    pub course_ids: Vec<RecordId>,
    /// Specific submissions to include, in caller order, after the courses.
    pub submission_ids: Vec<RecordId>,
}

impl Selection {
    pub fn automatic() -> Self {
        Self::default()
    }

    pub fn is_automatic(&self) -> bool {
        self.course_ids.is_empty() && self.submission_ids.is_empty()
    }
}

/// Cooperative cancellation handle shared between the pipeline and its
/// caller. Cancellation is observed between courses, never mid-render.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// One course left out of the combined artifact and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedCourse {
    pub course_code: String,
    pub reason: String,
}

/// Result of one assembly run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblyOutput {
    /// Serialized combined document.
    pub bytes: Vec<u8>,
    pub page_count: usize,
    /// History row id, when persistence succeeded.
    pub artifact_id: Option<RecordId>,
    /// File-store locator, when persistence succeeded.
    pub locator: Option<String>,
    pub skipped: Vec<SkippedCourse>,
    /// Persist failures do not fail the run; the reason lands here.
    pub persist_error: Option<String>,
}

/// The (unit, year, term) key one run assembles for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblyScope {
    pub unit_id: Option<RecordId>,
    pub year: String,
    pub term: u8,
    pub title: String,
    pub created_by: String,
}

struct CourseTask {
    course: Course,
    /// Submission explicitly selected by id; overrides version resolution.
    pinned: Option<Submission>,
    /// The course exists only as a department scheme row; it has no catalog
    /// record, so no submissions or syllabus content can be attached to it.
    scheme_only: bool,
}

/// Orchestrates gather, version resolution, rendering, concatenation and
/// persistence for one combined document.
pub struct AssemblyPipeline<'a, R: CourseRenderer = SectionRenderer> {
    conn: &'a mut Connection,
    files: Option<&'a FileStore>,
    renderer: R,
}

impl<'a> AssemblyPipeline<'a, SectionRenderer> {
    pub fn new(conn: &'a mut Connection, files: Option<&'a FileStore>) -> Self {
        Self {
            conn,
            files,
            renderer: SectionRenderer,
        }
    }
}

impl<'a, R: CourseRenderer> AssemblyPipeline<'a, R> {
    pub fn with_renderer(
        conn: &'a mut Connection,
        files: Option<&'a FileStore>,
        renderer: R,
    ) -> Self {
        Self {
            conn,
            files,
            renderer,
        }
    }

    /// Runs the full pipeline for one scope.
    pub fn run(
        &mut self,
        scope: &AssemblyScope,
        selection: &Selection,
        cancel: &CancelToken,
    ) -> AssembleResult<AssemblyOutput> {
        crate::model::validate_year(&scope.year).map_err(RepoError::from)?;
        crate::model::validate_term(i64::from(scope.term)).map_err(RepoError::from)?;

        let tasks = self.gather(scope, selection)?;
        info!(
            "event=assemble_gather module=assemble status=ok courses={} automatic={}",
            tasks.len(),
            selection.is_automatic()
        );

        let mut documents: Vec<Document> = Vec::new();
        let mut skipped: Vec<SkippedCourse> = Vec::new();
        for task in tasks {
            if cancel.is_cancelled() {
                info!("event=assemble module=assemble status=cancelled");
                return Err(AssembleError::Cancelled);
            }
            match self.document_for(scope, &task) {
                Ok(Some(document)) => documents.push(document),
                Ok(None) => skipped.push(SkippedCourse {
                    course_code: task.course.code.clone(),
                    reason: "no renderable document".to_string(),
                }),
                Err(err) => {
                    warn!(
                        "event=assemble_render module=assemble status=error course={} error={}",
                        task.course.code, err
                    );
                    skipped.push(SkippedCourse {
                        course_code: task.course.code.clone(),
                        reason: err.to_string(),
                    });
                }
            }
        }

        if documents.is_empty() {
            return Err(AssembleError::NoInputDocuments);
        }
        if cancel.is_cancelled() {
            return Err(AssembleError::Cancelled);
        }

        let combined = Document::concat(documents);
        let page_count = combined.page_count();
        let bytes = combined.to_bytes();

        let mut output = AssemblyOutput {
            bytes,
            page_count,
            artifact_id: None,
            locator: None,
            skipped,
            persist_error: None,
        };
        self.persist(scope, &mut output);

        info!(
            "event=assemble module=assemble status=ok pages={} skipped={} persisted={}",
            output.page_count,
            output.skipped.len(),
            output.artifact_id.is_some()
        );
        Ok(output)
    }

    /// Builds the ordered, per-code-deduplicated course work list.
    fn gather(
        &mut self,
        scope: &AssemblyScope,
        selection: &Selection,
    ) -> AssembleResult<Vec<CourseTask>> {
        let mut tasks: Vec<CourseTask> = Vec::new();
        let mut seen_codes: Vec<String> = Vec::new();

        if selection.is_automatic() {
            for (course, scheme_only) in self.automatic_courses(scope)? {
                push_task(&mut tasks, &mut seen_codes, course, None, scheme_only);
            }
            return Ok(tasks);
        }

        for &course_id in &selection.course_ids {
            let course = {
                let repo = SqliteCourseRepository::new(self.conn);
                repo.get_course(course_id, false)?
            };
            let course = course.ok_or(RepoError::NotFound {
                entity: "course",
                id: course_id,
            })?;
            push_task(&mut tasks, &mut seen_codes, course, None, false);
        }

        for &submission_id in &selection.submission_ids {
            let submission = {
                let mut repo = SqliteSubmissionRepository::new(self.conn);
                repo.get_submission(submission_id)?
            };
            let submission = submission.ok_or(RepoError::NotFound {
                entity: "submission",
                id: submission_id,
            })?;
            let course = {
                let repo = SqliteCourseRepository::new(self.conn);
                repo.get_course(submission.course_id, false)?
            };
            let course = course.ok_or(RepoError::NotFound {
                entity: "course",
                id: submission.course_id,
            })?;
            push_task(&mut tasks, &mut seen_codes, course, Some(submission), false);
        }

        Ok(tasks)
    }

    /// Automatic scope: the union of central courses for the term and the
    /// department's own course rows, latest record per code, ordered by
    /// course code. Scheme rows with no catalog counterpart stay in the set
    /// as scheme-only courses.
    fn automatic_courses(
        &mut self,
        scope: &AssemblyScope,
    ) -> AssembleResult<Vec<(Course, bool)>> {
        let mut candidates = {
            let repo = SqliteCourseRepository::new(self.conn);
            repo.list_for_scope(scope.unit_id, scope.term)?
        };
        let mut scheme_only: Vec<Course> = Vec::new();

        if let Some(unit_id) = scope.unit_id {
            let unit_rows = {
                let repo = SqliteUnitCourseRepository::new(self.conn);
                repo.list_unit_rows(unit_id, &scope.year, scope.term)?
            };
            let repo = SqliteCourseRepository::new(self.conn);
            for row in unit_rows {
                let matches = repo.find_by_code(&row.code)?;
                if matches.is_empty() {
                    scheme_only.push(scheme_course(&row));
                } else {
                    candidates.extend(matches);
                }
            }
        }

        let latest = select_latest(candidates, |c| c.code.clone(), |c| c.created_at);
        let mut courses: Vec<(Course, bool)> =
            latest.into_values().map(|course| (course, false)).collect();
        courses.extend(scheme_only.into_iter().map(|course| (course, true)));
        courses.sort_by(|a, b| a.0.code.cmp(&b.0.code));
        Ok(courses)
    }

    /// Resolves and produces the document for one course, or `None` when the
    /// course has nothing renderable.
    fn document_for(
        &mut self,
        scope: &AssemblyScope,
        task: &CourseTask,
    ) -> AssembleResult<Option<Document>> {
        let submission = match &task.pinned {
            Some(pinned) => Some(pinned.clone()),
            None => {
                let mut repo = SqliteSubmissionRepository::new(self.conn);
                repo.current_for(task.course.id, scope.unit_id, &scope.year, scope.term)?
            }
        };

        // Stored submission bytes win; unreadable bytes fall back to a fresh
        // render rather than failing the course outright.
        if let (Some(submission), Some(files)) = (&submission, self.files) {
            if let Some(locator) = &submission.file_locator {
                match files
                    .open_bytes(locator)
                    .map_err(AssembleError::from)
                    .and_then(|bytes| Document::from_bytes(&bytes).map_err(AssembleError::from))
                {
                    Ok(document) => return Ok(Some(document)),
                    Err(err) => warn!(
                        "event=assemble_open module=assemble status=error course={} locator={} error={}",
                        task.course.code, locator, err
                    ),
                }
            }
        }

        let content = {
            let repo = SqliteSyllabusRepository::new(self.conn);
            repo.current_for_course(task.course.id)?
        };
        let Some(content) = content else {
            // Scheme-only courses carry no content by construction; their
            // identity block still earns them a section.
            if task.scheme_only {
                return Ok(Some(self.renderer.render(&task.course, None)?));
            }
            // A catalog course with nothing stored and nothing to render
            // from is left out of the combined document.
            return Ok(None);
        };
        let document = self.renderer.render(&task.course, Some(&content))?;
        Ok(Some(document))
    }

    /// Stores the combined bytes and records the history row. Failures are
    /// downgraded to `persist_error` so the caller still gets the bytes.
    fn persist(&mut self, scope: &AssemblyScope, output: &mut AssemblyOutput) {
        let Some(files) = self.files else {
            return;
        };

        let locator = match files.store(&output.bytes) {
            Ok(locator) => locator,
            Err(err) => {
                warn!(
                    "event=assemble_persist module=assemble status=error stage=store error={}",
                    err
                );
                output.persist_error = Some(err.to_string());
                return;
            }
        };

        let document = CombinedDocument {
            id: 0,
            unit_id: scope.unit_id,
            year: scope.year.clone(),
            term: scope.term,
            title: scope.title.clone(),
            created_by: scope.created_by.clone(),
            file_locator: Some(locator.clone()),
            created_at: now_millis(),
            is_deleted: false,
            deleted_at: None,
        };
        let repo = SqliteCombinedDocumentRepository::new(self.conn);
        match repo.insert_document(&document) {
            Ok(id) => {
                output.artifact_id = Some(id);
                output.locator = Some(locator);
            }
            Err(err) => {
                warn!(
                    "event=assemble_persist module=assemble status=error stage=record error={}",
                    err
                );
                output.persist_error = Some(err.to_string());
            }
        }
    }
}

fn push_task(
    tasks: &mut Vec<CourseTask>,
    seen_codes: &mut Vec<String>,
    course: Course,
    pinned: Option<Submission>,
    scheme_only: bool,
) {
    // One section per course code; the first occurrence wins.
    if seen_codes.iter().any(|code| code == &course.code) {
        return;
    }
    seen_codes.push(course.code.clone());
    tasks.push(CourseTask {
        course,
        pinned,
        scheme_only,
    });
}

/// Lifts a department scheme row into a course record so it can be rendered
/// alongside catalog courses. Marks fall back to the catalog defaults.
fn scheme_course(row: &UnitCourse) -> Course {
    Course {
        id: 0,
        code: row.code.clone(),
        title: row.title.clone(),
        category: row.category.clone(),
        unit_id: Some(row.unit_id),
        term: Some(row.term),
        hours: row.hours,
        internal_marks: 50,
        exam_marks: 50,
        credits: row.credits,
        created_by: String::new(),
        created_at: row.created_at,
        is_deleted: false,
        deleted_at: None,
    }
}

#[cfg(test)]
mod tests {
    use super::{CancelToken, Selection};

    #[test]
    fn default_selection_is_automatic() {
        assert!(Selection::automatic().is_automatic());
        let explicit = Selection {
            course_ids: vec![1],
            submission_ids: vec![],
        };
        assert!(!explicit.is_automatic());
    }

    #[test]
    fn cancel_token_is_shared_across_clones() {
        let token = CancelToken::new();
        let observer = token.clone();
        assert!(!observer.is_cancelled());
        token.cancel();
        assert!(observer.is_cancelled());
    }
}
