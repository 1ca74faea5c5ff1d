use syllabus_core::db::open_db_in_memory;
use syllabus_core::model::course::{Course, RecordId, TeachingHours};
use syllabus_core::model::now_millis;
use syllabus_core::model::syllabus::{AssessmentRow, SyllabusContent};
use syllabus_core::repo::course_repo::{CourseRepository, SqliteCourseRepository};
use syllabus_core::repo::syllabus_repo::SqliteSyllabusRepository;
use syllabus_core::service::course_service::{CourseService, CourseServiceError};

fn course(code: &str, unit_id: Option<RecordId>) -> Course {
    Course {
        id: 0,
        code: code.to_string(),
        title: format!("{code} title"),
        category: "PC".to_string(),
        unit_id,
        term: Some(3),
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

fn service(conn: &rusqlite::Connection) -> CourseService<SqliteCourseRepository<'_>, SqliteSyllabusRepository<'_>> {
    CourseService::new(
        SqliteCourseRepository::new(conn),
        SqliteSyllabusRepository::new(conn),
    )
}

fn subject_units(conn: &rusqlite::Connection, code: &str) -> Vec<i64> {
    let mut stmt = conn
        .prepare("SELECT unit_id FROM subjects WHERE code = ?1 ORDER BY unit_id;")
        .unwrap();
    let units = stmt
        .query_map([code], |row| row.get(0))
        .unwrap()
        .collect::<Result<Vec<i64>, _>>()
        .unwrap();
    units
}

#[test]
fn shared_course_mirrors_into_every_active_unit() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteCourseRepository::new(&conn);
    let cse = repo.create_unit("CSE", "Computer Science").unwrap();
    let ece = repo.create_unit("ECE", "Electronics").unwrap();

    let created = service(&conn).create_course(&course("HS101", None)).unwrap();
    assert!(created.id > 0);
    assert_eq!(subject_units(&conn, "HS101"), vec![cse, ece]);
}

#[test]
fn unit_bound_course_mirrors_only_into_its_unit() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteCourseRepository::new(&conn);
    let cse = repo.create_unit("CSE", "Computer Science").unwrap();
    repo.create_unit("ECE", "Electronics").unwrap();

    service(&conn).create_course(&course("CS301", Some(cse))).unwrap();
    assert_eq!(subject_units(&conn, "CS301"), vec![cse]);
}

#[test]
fn update_refreshes_the_subject_mirror() {
    let conn = open_db_in_memory().unwrap();
    let cse = SqliteCourseRepository::new(&conn)
        .create_unit("CSE", "Computer Science")
        .unwrap();
    let svc = service(&conn);
    let mut created = svc.create_course(&course("CS301", Some(cse))).unwrap();

    created.title = "Advanced Operating Systems".to_string();
    created.credits = 5.0;
    svc.update_course(&created).unwrap();

    let (title, credits): (String, f64) = conn
        .query_row(
            "SELECT title, credits FROM subjects WHERE code = 'CS301';",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap();
    assert_eq!(title, "Advanced Operating Systems");
    assert_eq!(credits, 5.0);
}

#[test]
fn updating_a_missing_course_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let mut missing = course("CS301", None);
    missing.id = 404;
    let err = service(&conn).update_course(&missing).unwrap_err();
    assert!(matches!(err, CourseServiceError::CourseNotFound(404)));
}

#[test]
fn save_syllabus_is_a_full_replace() {
    let conn = open_db_in_memory().unwrap();
    let svc = service(&conn);
    let created = svc.create_course(&course("CS301", None)).unwrap();

    let mut content = SyllabusContent::empty(created.id);
    content.objectives = vec!["understand scheduling".to_string()];
    content.assessment = vec![AssessmentRow {
        tool: "Internals".to_string(),
        remarks: "three tests".to_string(),
        marks: 30,
    }];
    let first = svc.save_syllabus(&content).unwrap();

    // Replace: the second save clears sections omitted from the new content.
    let mut replacement = SyllabusContent::empty(created.id);
    replacement.outcomes = vec!["apply paging".to_string()];
    let second = svc.save_syllabus(&replacement).unwrap();

    assert_eq!(second.id, first.id, "same record is replaced, not duplicated");
    assert!(second.objectives.is_empty());
    assert!(second.assessment.is_empty());
    assert_eq!(second.outcomes, vec!["apply paging".to_string()]);
}

#[test]
fn save_syllabus_for_missing_course_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let err = service(&conn)
        .save_syllabus(&SyllabusContent::empty(999))
        .unwrap_err();
    assert!(matches!(err, CourseServiceError::CourseNotFound(999)));
}
