//! Course and syllabus use-case service.
//!
//! # Responsibility
//! - Provide course create/update/get/list APIs over the central catalog.
//! - Run the course-created hook that mirrors subject rows into every
//!   active unit.
//! - Save and fetch structured syllabus content.
//!
//! # Invariants
//! - Course creation and the subject mirror run for every active unit; a
//!   unit-bound course mirrors only into its own unit.
//! - `save_syllabus` uses full content replacement semantics.

use crate::model::course::{Course, RecordId};
use crate::model::syllabus::SyllabusContent;
use crate::repo::course_repo::CourseRepository;
use crate::repo::syllabus_repo::SyllabusRepository;
use crate::repo::{RepoError, RepoResult};
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Service error for course use-cases.
#[derive(Debug)]
pub enum CourseServiceError {
    CourseNotFound(RecordId),
    Repo(RepoError),
    /// Internal consistency mismatch between write and read-back.
    InconsistentState(&'static str),
}

impl Display for CourseServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CourseNotFound(id) => write!(f, "course not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => write!(f, "inconsistent course state: {details}"),
        }
    }
}

impl Error for CourseServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for CourseServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound { entity: "course", id } => Self::CourseNotFound(id),
            other => Self::Repo(other),
        }
    }
}

/// Course service facade over the catalog and syllabus repositories.
pub struct CourseService<C: CourseRepository, S: SyllabusRepository> {
    courses: C,
    syllabi: S,
}

impl<C: CourseRepository, S: SyllabusRepository> CourseService<C, S> {
    pub fn new(courses: C, syllabi: S) -> Self {
        Self { courses, syllabi }
    }

    /// Creates one catalog course and runs the course-created hook.
    pub fn create_course(&self, course: &Course) -> Result<Course, CourseServiceError> {
        let id = self.courses.create_course(course)?;
        let created = self
            .courses
            .get_course(id, false)?
            .ok_or(CourseServiceError::InconsistentState(
                "created course not found in read-back",
            ))?;

        let mirrored = self.on_course_created(&created)?;
        info!(
            "event=course_create module=service status=ok course={} mirrored_units={}",
            created.code, mirrored
        );
        Ok(created)
    }

    /// Post-create hook: mirrors the new course as a subject row into each
    /// unit that should see it. Unit-bound courses mirror only into their
    /// own unit; shared courses mirror into every active unit.
    pub fn on_course_created(&self, course: &Course) -> RepoResult<usize> {
        let unit_ids = match course.unit_id {
            Some(unit_id) => vec![unit_id],
            None => self.courses.list_active_unit_ids()?,
        };
        for &unit_id in &unit_ids {
            self.courses.mirror_subject(course, unit_id)?;
        }
        Ok(unit_ids.len())
    }

    /// Replaces all mutable course columns and refreshes the subject mirror.
    pub fn update_course(&self, course: &Course) -> Result<Course, CourseServiceError> {
        self.courses.update_course(course)?;
        let updated = self
            .courses
            .get_course(course.id, false)?
            .ok_or(CourseServiceError::InconsistentState(
                "updated course not found in read-back",
            ))?;
        self.on_course_created(&updated)?;
        Ok(updated)
    }

    pub fn get_course(&self, id: RecordId) -> RepoResult<Option<Course>> {
        self.courses.get_course(id, false)
    }

    pub fn list_for_scope(
        &self,
        unit_id: Option<RecordId>,
        term: u8,
    ) -> RepoResult<Vec<Course>> {
        self.courses.list_for_scope(unit_id, term)
    }

    /// Saves syllabus content for a course, full replace, and returns the
    /// stored record.
    pub fn save_syllabus(
        &self,
        content: &SyllabusContent,
    ) -> Result<SyllabusContent, CourseServiceError> {
        self.courses
            .get_course(content.course_id, false)?
            .ok_or(CourseServiceError::CourseNotFound(content.course_id))?;

        self.syllabi.save_full(content)?;
        let stored = self
            .syllabi
            .current_for_course(content.course_id)?
            .ok_or(CourseServiceError::InconsistentState(
                "saved syllabus not found in read-back",
            ))?;
        info!(
            "event=syllabus_save module=service status=ok course_id={} syllabus_id={}",
            content.course_id, stored.id
        );
        Ok(stored)
    }

    pub fn current_syllabus(&self, course_id: RecordId) -> RepoResult<Option<SyllabusContent>> {
        self.syllabi.current_for_course(course_id)
    }
}
