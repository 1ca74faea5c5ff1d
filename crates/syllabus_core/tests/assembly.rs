use syllabus_core::assemble::{
    AssembleError, AssemblyPipeline, AssemblyScope, CancelToken, Selection,
};
use syllabus_core::db::open_db_in_memory;
use syllabus_core::model::course::{Course, RecordId, TeachingHours, UnitCourse};
use syllabus_core::model::now_millis;
use syllabus_core::render::Document;
use syllabus_core::repo::course_repo::{
    CourseRepository, SqliteCourseRepository, SqliteUnitCourseRepository, UnitCourseRepository,
};
use syllabus_core::model::syllabus::SyllabusContent;
use syllabus_core::repo::submission_repo::{SqliteSubmissionRepository, SubmissionRepository};
use syllabus_core::repo::syllabus_repo::{SqliteSyllabusRepository, SyllabusRepository};
use syllabus_core::repo::RepoError;
use syllabus_core::service::assembly_service;
use syllabus_core::service::submission_service::{NewSubmission, SubmissionService};
use syllabus_core::FileStore;

fn course(code: &str, unit_id: Option<RecordId>, term: u8) -> Course {
    Course {
        id: 0,
        code: code.to_string(),
        title: format!("{code} title"),
        category: "PC".to_string(),
        unit_id,
        term: Some(term),
        hours: TeachingHours {
            lecture: 3,
            tutorial: 1,
            practical: 0,
        },
        internal_marks: 50,
        exam_marks: 50,
        credits: 4.0,
        created_by: "admin".to_string(),
        created_at: now_millis(),
        is_deleted: false,
        deleted_at: None,
    }
}

fn scope(unit_id: Option<RecordId>, term: u8) -> AssemblyScope {
    AssemblyScope {
        unit_id,
        year: "2025".to_string(),
        term,
        title: "combined syllabus".to_string(),
        created_by: "head".to_string(),
    }
}

fn output_text(bytes: &[u8]) -> String {
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn add_content(conn: &rusqlite::Connection, course_id: RecordId) {
    let mut content = SyllabusContent::empty(course_id);
    content.objectives = vec!["understand the subject".to_string()];
    SqliteSyllabusRepository::new(conn).save_full(&content).unwrap();
}

#[test]
fn automatic_scope_includes_shared_and_unit_courses() {
    let mut conn = open_db_in_memory().unwrap();
    let unit_id = SqliteCourseRepository::new(&conn)
        .create_unit("CSE", "Computer Science")
        .unwrap();
    {
        let repo = SqliteCourseRepository::new(&conn);
        let hs = repo.create_course(&course("HS101", None, 3)).unwrap();
        let cs3 = repo.create_course(&course("CS301", Some(unit_id), 3)).unwrap();
        let cs4 = repo.create_course(&course("CS401", Some(unit_id), 4)).unwrap();
        for id in [hs, cs3, cs4] {
            add_content(&conn, id);
        }
    }

    let output = AssemblyPipeline::new(&mut conn, None)
        .run(&scope(Some(unit_id), 3), &Selection::automatic(), &CancelToken::new())
        .unwrap();

    let text = output_text(&output.bytes);
    assert!(text.contains("HS101 ::"));
    assert!(text.contains("CS301 ::"));
    assert!(!text.contains("CS401 ::"), "wrong-term course must be excluded");
    assert!(output.skipped.is_empty());
}

#[test]
fn department_scheme_rows_pull_matching_catalog_courses() {
    let mut conn = open_db_in_memory().unwrap();
    let unit_id = SqliteCourseRepository::new(&conn)
        .create_unit("CSE", "Computer Science")
        .unwrap();
    // Catalog course bound to no unit and a term outside the scope; only the
    // department's own scheme row brings it in.
    let ee = SqliteCourseRepository::new(&conn)
        .create_course(&course("EE209", None, 5))
        .unwrap();
    add_content(&conn, ee);
    {
        let mut repo = SqliteUnitCourseRepository::new(&mut conn);
        let row = UnitCourse {
            id: 0,
            unit_id,
            year: "2025".to_string(),
            term: 3,
            code: "EE209".to_string(),
            title: "Circuits".to_string(),
            category: "ES".to_string(),
            is_elective: false,
            hours: TeachingHours {
                lecture: 3,
                tutorial: 0,
                practical: 0,
            },
            credits: 3.0,
            created_at: now_millis(),
            updated_at: now_millis(),
            deleted: false,
        };
        repo.replace_unit_rows(unit_id, "2025", 3, &[row]).unwrap();
    }

    let output = AssemblyPipeline::new(&mut conn, None)
        .run(&scope(Some(unit_id), 3), &Selection::automatic(), &CancelToken::new())
        .unwrap();
    assert!(output_text(&output.bytes).contains("EE209 ::"));
}

#[test]
fn department_only_scheme_rows_render_from_their_own_data() {
    let mut conn = open_db_in_memory().unwrap();
    let unit_id = SqliteCourseRepository::new(&conn)
        .create_unit("CSE", "Computer Science")
        .unwrap();
    let cs = SqliteCourseRepository::new(&conn)
        .create_course(&course("CS301", Some(unit_id), 3))
        .unwrap();
    add_content(&conn, cs);
    // ME999 exists only in the department's own scheme, not in the catalog.
    {
        let mut repo = SqliteUnitCourseRepository::new(&mut conn);
        let row = UnitCourse {
            id: 0,
            unit_id,
            year: "2025".to_string(),
            term: 3,
            code: "ME999".to_string(),
            title: "Workshop Practice".to_string(),
            category: "ES".to_string(),
            is_elective: false,
            hours: TeachingHours {
                lecture: 0,
                tutorial: 0,
                practical: 3,
            },
            credits: 1.5,
            created_at: now_millis(),
            updated_at: now_millis(),
            deleted: false,
        };
        repo.replace_unit_rows(unit_id, "2025", 3, &[row]).unwrap();
    }

    let output = AssemblyPipeline::new(&mut conn, None)
        .run(&scope(Some(unit_id), 3), &Selection::automatic(), &CancelToken::new())
        .unwrap();

    let text = output_text(&output.bytes);
    assert!(text.contains("CS301 ::"));
    assert!(
        text.contains("ME999 :: Workshop Practice"),
        "scheme-only course must get its own section"
    );
    assert!(output.skipped.is_empty());
}

#[test]
fn empty_scope_reports_no_input_documents() {
    let mut conn = open_db_in_memory().unwrap();
    let err = AssemblyPipeline::new(&mut conn, None)
        .run(&scope(None, 3), &Selection::automatic(), &CancelToken::new())
        .unwrap_err();
    assert!(matches!(err, AssembleError::NoInputDocuments));
}

#[test]
fn explicit_selection_keeps_caller_order_and_dedupes_codes() {
    let mut conn = open_db_in_memory().unwrap();
    let (zz, aa) = {
        let repo = SqliteCourseRepository::new(&conn);
        (
            repo.create_course(&course("ZZ901", None, 3)).unwrap(),
            repo.create_course(&course("AA101", None, 3)).unwrap(),
        )
    };
    add_content(&conn, zz);
    add_content(&conn, aa);

    let selection = Selection {
        course_ids: vec![zz, aa, zz],
        submission_ids: vec![],
    };
    let output = AssemblyPipeline::new(&mut conn, None)
        .run(&scope(None, 3), &selection, &CancelToken::new())
        .unwrap();

    let text = output_text(&output.bytes);
    let zz_at = text.find("ZZ901 ::").unwrap();
    let aa_at = text.find("AA101 ::").unwrap();
    assert!(zz_at < aa_at, "caller order must be preserved");
    assert_eq!(text.matches("ZZ901 ::").count(), 1, "one section per code");
}

#[test]
fn explicit_missing_course_is_an_error() {
    let mut conn = open_db_in_memory().unwrap();
    let selection = Selection {
        course_ids: vec![777],
        submission_ids: vec![],
    };
    let err = AssemblyPipeline::new(&mut conn, None)
        .run(&scope(None, 3), &selection, &CancelToken::new())
        .unwrap_err();
    assert!(matches!(
        err,
        AssembleError::Repo(RepoError::NotFound {
            entity: "course",
            id: 777
        })
    ));
}

#[test]
fn assembly_output_is_deterministic() {
    let mut conn = open_db_in_memory().unwrap();
    {
        let repo = SqliteCourseRepository::new(&conn);
        let cs = repo.create_course(&course("CS301", None, 3)).unwrap();
        let hs = repo.create_course(&course("HS101", None, 3)).unwrap();
        add_content(&conn, cs);
        add_content(&conn, hs);
    }

    let first = AssemblyPipeline::new(&mut conn, None)
        .run(&scope(None, 3), &Selection::automatic(), &CancelToken::new())
        .unwrap();
    let second = AssemblyPipeline::new(&mut conn, None)
        .run(&scope(None, 3), &Selection::automatic(), &CancelToken::new())
        .unwrap();
    assert_eq!(first.bytes, second.bytes);
    assert_eq!(first.page_count, second.page_count);
}

#[test]
fn cancelled_run_persists_nothing() {
    let mut conn = open_db_in_memory().unwrap();
    SqliteCourseRepository::new(&conn)
        .create_course(&course("CS301", None, 3))
        .unwrap();
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::open(dir.path()).unwrap();

    let cancel = CancelToken::new();
    cancel.cancel();
    let err = AssemblyPipeline::new(&mut conn, Some(&store))
        .run(&scope(None, 3), &Selection::automatic(), &cancel)
        .unwrap_err();
    assert!(matches!(err, AssembleError::Cancelled));

    let history = assembly_service::document_history(&conn, None, "2025", 3).unwrap();
    assert!(history.is_empty());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn courses_with_nothing_renderable_are_silently_omitted() {
    let mut conn = open_db_in_memory().unwrap();
    {
        let repo = SqliteCourseRepository::new(&conn);
        let cs = repo.create_course(&course("CS301", None, 3)).unwrap();
        repo.create_course(&course("HS101", None, 3)).unwrap();
        add_content(&conn, cs);
    }

    // HS101 has no submission and no structured content: left out without
    // failing the run.
    let output = AssemblyPipeline::new(&mut conn, None)
        .run(&scope(None, 3), &Selection::automatic(), &CancelToken::new())
        .unwrap();
    let text = output_text(&output.bytes);
    assert!(text.contains("CS301 ::"));
    assert!(!text.contains("HS101 ::"));
    assert_eq!(output.skipped.len(), 1);
    assert_eq!(output.skipped[0].course_code, "HS101");
}

#[test]
fn persisted_artifact_round_trips_through_the_store() {
    let mut conn = open_db_in_memory().unwrap();
    let cs = SqliteCourseRepository::new(&conn)
        .create_course(&course("CS301", None, 3))
        .unwrap();
    add_content(&conn, cs);
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::open(dir.path()).unwrap();

    let output = assembly_service::generate_combined(
        &mut conn,
        Some(&store),
        &scope(None, 3),
        &Selection::automatic(),
        &CancelToken::new(),
    )
    .unwrap();

    assert!(output.persist_error.is_none());
    let artifact_id = output.artifact_id.expect("artifact row must exist");
    let locator = output.locator.expect("artifact bytes must be stored");
    assert_eq!(store.open_bytes(&locator).unwrap(), output.bytes);

    let history = assembly_service::document_history(&conn, None, "2025", 3).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].id, artifact_id);
    assert_eq!(history[0].file_locator.as_deref(), Some(locator.as_str()));

    let parsed = Document::from_bytes(&output.bytes).unwrap();
    assert_eq!(parsed.page_count(), output.page_count);
}

#[test]
fn stored_submission_bytes_take_precedence_over_rendering() {
    let mut conn = open_db_in_memory().unwrap();
    let course_id = SqliteCourseRepository::new(&conn)
        .create_course(&course("CS301", None, 3))
        .unwrap();
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::open(dir.path()).unwrap();

    let custom = Document::from_pages(vec!["CUSTOM FACULTY PAGE".to_string()]);
    {
        let mut service = SubmissionService::with_files(
            SqliteSubmissionRepository::new(&mut conn),
            FileStore::open(dir.path()).unwrap(),
        );
        service
            .submit(NewSubmission {
                course_id,
                unit_id: None,
                year: "2025".to_string(),
                term: 3,
                author: "prof".to_string(),
                title: "v1".to_string(),
                document: Some(custom.to_bytes()),
            })
            .unwrap();
    }

    let output = AssemblyPipeline::new(&mut conn, Some(&store))
        .run(&scope(None, 3), &Selection::automatic(), &CancelToken::new())
        .unwrap();
    let text = output_text(&output.bytes);
    assert!(text.contains("CUSTOM FACULTY PAGE"));
    assert!(!text.contains("CS301 ::"), "stored bytes replace the fresh render");
}

#[test]
fn unreadable_submission_bytes_fall_back_to_rendering() {
    let mut conn = open_db_in_memory().unwrap();
    let course_id = SqliteCourseRepository::new(&conn)
        .create_course(&course("CS301", None, 3))
        .unwrap();
    add_content(&conn, course_id);
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::open(dir.path()).unwrap();
    let locator = store.store(b"not a document").unwrap();

    {
        let mut repo = SqliteSubmissionRepository::new(&mut conn);
        let submission = syllabus_core::model::submission::Submission {
            id: 0,
            course_id,
            unit_id: None,
            year: "2025".to_string(),
            term: 3,
            author: "prof".to_string(),
            title: "v1".to_string(),
            file_locator: Some(locator),
            status: syllabus_core::model::submission::SubmissionStatus::Pending,
            approved_by: None,
            approved_at: None,
            rejected_by: None,
            rejected_at: None,
            created_at: 1000,
            updated_at: 1000,
        };
        repo.create_submission(&submission).unwrap();
    }

    let output = AssemblyPipeline::new(&mut conn, Some(&store))
        .run(&scope(None, 3), &Selection::automatic(), &CancelToken::new())
        .unwrap();
    let text = output_text(&output.bytes);
    assert!(text.contains("CS301 ::"), "fallback render must appear");
    assert!(output.skipped.is_empty());
}
