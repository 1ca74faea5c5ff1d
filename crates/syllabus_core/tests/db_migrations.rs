use syllabus_core::db::migrations::{apply_migrations, latest_version};
use syllabus_core::db::open_db_in_memory;

fn user_version(conn: &rusqlite::Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

#[test]
fn fresh_database_is_at_latest_version() {
    let conn = open_db_in_memory().unwrap();
    assert_eq!(user_version(&conn), latest_version());
}

#[test]
fn migrations_are_idempotent() {
    let mut conn = open_db_in_memory().unwrap();
    apply_migrations(&mut conn).unwrap();
    assert_eq!(user_version(&conn), latest_version());
}

#[test]
fn all_workflow_tables_exist() {
    let conn = open_db_in_memory().unwrap();
    for table in [
        "units",
        "courses",
        "syllabi",
        "unit_courses",
        "submissions",
        "combined_documents",
        "subjects",
    ] {
        let found: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1;",
                [table],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(found, 1, "missing table {table}");
    }
}

#[test]
fn foreign_keys_are_enforced() {
    let conn = open_db_in_memory().unwrap();
    let err = conn.execute(
        "INSERT INTO syllabi (course_id, created_at, updated_at) VALUES (999, 0, 0);",
        [],
    );
    assert!(err.is_err(), "orphan syllabus row must be rejected");
}

#[test]
fn course_marks_default_to_fifty() {
    let conn = open_db_in_memory().unwrap();
    conn.execute(
        "INSERT INTO courses (course_code, course_title, category, created_by, created_at)
         VALUES ('CS301', 'Operating Systems', 'PC', 'admin', 0);",
        [],
    )
    .unwrap();

    let (internal, exam): (i64, i64) = conn
        .query_row(
            "SELECT internal_marks, exam_marks FROM courses WHERE course_code = 'CS301';",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap();
    assert_eq!(internal, 50);
    assert_eq!(exam, 50);
}

#[test]
fn submission_status_is_constrained() {
    let conn = open_db_in_memory().unwrap();
    conn.execute(
        "INSERT INTO courses (course_code, course_title, category, created_by, created_at)
         VALUES ('CS301', 'Operating Systems', 'PC', 'admin', 0);",
        [],
    )
    .unwrap();

    let err = conn.execute(
        "INSERT INTO submissions
            (course_id, year, term, author, title, status, created_at, updated_at)
         VALUES (1, '2025', 3, 'prof', 'v1', 'draft', 0, 0);",
        [],
    );
    assert!(err.is_err(), "unknown status value must be rejected");
}
