//! Core domain logic for the syllabus workflow engine.
//! This crate is the single source of truth for document lifecycle invariants.

pub mod assemble;
pub mod db;
pub mod files;
pub mod logging;
pub mod model;
pub mod recycle;
pub mod render;
pub mod repo;
pub mod select;
pub mod service;

pub use assemble::{
    AssembleError, AssemblyOutput, AssemblyPipeline, AssemblyScope, CancelToken, Selection,
    SkippedCourse,
};
pub use files::{FileStore, FileStoreError};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::course::{Course, CourseCategory, RecordId, TeachingHours, UnitCourse};
pub use model::submission::{DecisionOutcome, Submission, SubmissionStatus};
pub use model::syllabus::{AssessmentRow, BookEntry, ModuleUnit, SyllabusContent};
pub use recycle::{PurgeReport, RecordType, RecycleError, SoftDeleteLedger};
pub use render::{render_course_document, CourseRenderer, Document, RenderError, SectionRenderer};
pub use repo::{RepoError, RepoResult};
pub use select::select_latest;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
