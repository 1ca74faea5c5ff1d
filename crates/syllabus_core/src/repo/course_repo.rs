//! Course repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD APIs over the central catalog (`courses`) and the
//!   department-authored scheme rows (`unit_courses`).
//! - Maintain the per-unit mirrored `subjects` rows used by unit views.
//!
//! # Invariants
//! - Write paths validate records before SQL mutations.
//! - Assembly queries exclude soft-deleted rows on both sources.
//! - `replace_unit_rows` swaps a (unit, year, term) grid in one transaction.

use crate::model::course::{Course, RecordId, TeachingHours, UnitCourse};
use crate::model::now_millis;
use crate::repo::{bool_to_int, int_to_bool, RepoError, RepoResult};
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};

const COURSE_SELECT_SQL: &str = "SELECT
    id,
    course_code,
    course_title,
    category,
    unit_id,
    term,
    lecture_hours,
    tutorial_hours,
    practical_hours,
    internal_marks,
    exam_marks,
    credits,
    created_by,
    created_at,
    is_deleted,
    deleted_at
FROM courses";

const UNIT_COURSE_SELECT_SQL: &str = "SELECT
    id,
    unit_id,
    year,
    term,
    course_code,
    course_title,
    category,
    is_elective,
    lecture_hours,
    tutorial_hours,
    practical_hours,
    credits,
    created_at,
    updated_at,
    deleted
FROM unit_courses";

/// Repository interface for central catalog courses.
pub trait CourseRepository {
    fn create_course(&self, course: &Course) -> RepoResult<RecordId>;
    /// Full replace of all mutable columns.
    fn update_course(&self, course: &Course) -> RepoResult<()>;
    fn get_course(&self, id: RecordId, include_deleted: bool) -> RepoResult<Option<Course>>;
    /// Active courses visible to one (unit, term) assembly scope: unit-bound
    /// rows for the unit plus unit-independent rows. A `None` unit sees only
    /// the unit-independent rows.
    fn list_for_scope(&self, unit_id: Option<RecordId>, term: u8) -> RepoResult<Vec<Course>>;
    /// Active courses carrying one course code, oldest first.
    fn find_by_code(&self, code: &str) -> RepoResult<Vec<Course>>;
    fn create_unit(&self, code: &str, name: &str) -> RepoResult<RecordId>;
    fn list_active_unit_ids(&self) -> RepoResult<Vec<RecordId>>;
    /// Upserts the mirrored subject row for one (unit, course) pair.
    fn mirror_subject(&self, course: &Course, unit_id: RecordId) -> RepoResult<()>;
}

/// Repository interface for department scheme rows.
pub trait UnitCourseRepository {
    /// Replaces the whole grid for one (unit, year, term) key atomically.
    fn replace_unit_rows(
        &mut self,
        unit_id: RecordId,
        year: &str,
        term: u8,
        rows: &[UnitCourse],
    ) -> RepoResult<()>;
    fn list_unit_rows(&self, unit_id: RecordId, year: &str, term: u8)
        -> RepoResult<Vec<UnitCourse>>;
}

/// SQLite-backed course repository.
pub struct SqliteCourseRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCourseRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl CourseRepository for SqliteCourseRepository<'_> {
    fn create_course(&self, course: &Course) -> RepoResult<RecordId> {
        course.validate()?;

        self.conn.execute(
            "INSERT INTO courses (
                course_code,
                course_title,
                category,
                unit_id,
                term,
                lecture_hours,
                tutorial_hours,
                practical_hours,
                internal_marks,
                exam_marks,
                credits,
                created_by,
                created_at,
                is_deleted,
                deleted_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15);",
            params![
                course.code.as_str(),
                course.title.as_str(),
                course.category.as_str(),
                course.unit_id,
                course.term.map(i64::from),
                i64::from(course.hours.lecture),
                i64::from(course.hours.tutorial),
                i64::from(course.hours.practical),
                course.internal_marks,
                course.exam_marks,
                course.credits,
                course.created_by.as_str(),
                course.created_at,
                bool_to_int(course.is_deleted),
                course.deleted_at,
            ],
        )?;

        Ok(self.conn.last_insert_rowid())
    }

    fn update_course(&self, course: &Course) -> RepoResult<()> {
        course.validate()?;

        let changed = self.conn.execute(
            "UPDATE courses
             SET
                course_code = ?1,
                course_title = ?2,
                category = ?3,
                unit_id = ?4,
                term = ?5,
                lecture_hours = ?6,
                tutorial_hours = ?7,
                practical_hours = ?8,
                internal_marks = ?9,
                exam_marks = ?10,
                credits = ?11
             WHERE id = ?12;",
            params![
                course.code.as_str(),
                course.title.as_str(),
                course.category.as_str(),
                course.unit_id,
                course.term.map(i64::from),
                i64::from(course.hours.lecture),
                i64::from(course.hours.tutorial),
                i64::from(course.hours.practical),
                course.internal_marks,
                course.exam_marks,
                course.credits,
                course.id,
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "course",
                id: course.id,
            });
        }

        Ok(())
    }

    fn get_course(&self, id: RecordId, include_deleted: bool) -> RepoResult<Option<Course>> {
        let mut stmt = self.conn.prepare(&format!(
            "{COURSE_SELECT_SQL}
             WHERE id = ?1
               AND (?2 = 1 OR is_deleted = 0);"
        ))?;

        let mut rows = stmt.query(params![id, bool_to_int(include_deleted)])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_course_row(row)?));
        }

        Ok(None)
    }

    fn list_for_scope(&self, unit_id: Option<RecordId>, term: u8) -> RepoResult<Vec<Course>> {
        let mut stmt = self.conn.prepare(&format!(
            "{COURSE_SELECT_SQL}
             WHERE (unit_id IS NULL OR unit_id = ?1)
               AND term = ?2
               AND is_deleted = 0
             ORDER BY course_code ASC, id ASC;"
        ))?;

        let mut rows = stmt.query(params![unit_id, i64::from(term)])?;
        let mut courses = Vec::new();
        while let Some(row) = rows.next()? {
            courses.push(parse_course_row(row)?);
        }

        Ok(courses)
    }

    fn find_by_code(&self, code: &str) -> RepoResult<Vec<Course>> {
        let mut stmt = self.conn.prepare(&format!(
            "{COURSE_SELECT_SQL}
             WHERE course_code = ?1
               AND is_deleted = 0
             ORDER BY id ASC;"
        ))?;

        let mut rows = stmt.query(params![code])?;
        let mut courses = Vec::new();
        while let Some(row) = rows.next()? {
            courses.push(parse_course_row(row)?);
        }

        Ok(courses)
    }

    fn create_unit(&self, code: &str, name: &str) -> RepoResult<RecordId> {
        self.conn.execute(
            "INSERT INTO units (code, name, active) VALUES (?1, ?2, 1);",
            params![code, name],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn list_active_unit_ids(&self) -> RepoResult<Vec<RecordId>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id FROM units WHERE active = 1 ORDER BY id ASC;")?;
        let mut rows = stmt.query([])?;
        let mut ids = Vec::new();
        while let Some(row) = rows.next()? {
            ids.push(row.get(0)?);
        }
        Ok(ids)
    }

    fn mirror_subject(&self, course: &Course, unit_id: RecordId) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO subjects (course_id, unit_id, code, title, credits, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT (unit_id, code) DO UPDATE SET
                course_id = excluded.course_id,
                title = excluded.title,
                credits = excluded.credits;",
            params![
                course.id,
                unit_id,
                course.code.as_str(),
                course.title.as_str(),
                course.credits,
                now_millis(),
            ],
        )?;
        Ok(())
    }
}

/// SQLite-backed department scheme-row repository.
pub struct SqliteUnitCourseRepository<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteUnitCourseRepository<'conn> {
    pub fn new(conn: &'conn mut Connection) -> Self {
        Self { conn }
    }
}

impl UnitCourseRepository for SqliteUnitCourseRepository<'_> {
    fn replace_unit_rows(
        &mut self,
        unit_id: RecordId,
        year: &str,
        term: u8,
        rows: &[UnitCourse],
    ) -> RepoResult<()> {
        for row in rows {
            row.validate()?;
        }

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute(
            "DELETE FROM unit_courses
             WHERE unit_id = ?1 AND year = ?2 AND term = ?3;",
            params![unit_id, year, i64::from(term)],
        )?;
        for row in rows {
            insert_unit_row_in_tx(&tx, unit_id, year, term, row)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn list_unit_rows(
        &self,
        unit_id: RecordId,
        year: &str,
        term: u8,
    ) -> RepoResult<Vec<UnitCourse>> {
        let mut stmt = self.conn.prepare(&format!(
            "{UNIT_COURSE_SELECT_SQL}
             WHERE unit_id = ?1
               AND year = ?2
               AND term = ?3
               AND deleted = 0
             ORDER BY is_elective ASC, course_code ASC, id ASC;"
        ))?;

        let mut rows = stmt.query(params![unit_id, year, i64::from(term)])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(parse_unit_course_row(row)?);
        }

        Ok(out)
    }
}

fn insert_unit_row_in_tx(
    tx: &Transaction<'_>,
    unit_id: RecordId,
    year: &str,
    term: u8,
    row: &UnitCourse,
) -> RepoResult<()> {
    tx.execute(
        "INSERT INTO unit_courses (
            unit_id,
            year,
            term,
            course_code,
            course_title,
            category,
            is_elective,
            lecture_hours,
            tutorial_hours,
            practical_hours,
            credits,
            created_at,
            updated_at,
            deleted
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, 0);",
        params![
            unit_id,
            year,
            i64::from(term),
            row.code.as_str(),
            row.title.as_str(),
            row.category.as_str(),
            bool_to_int(row.is_elective),
            i64::from(row.hours.lecture),
            i64::from(row.hours.tutorial),
            i64::from(row.hours.practical),
            row.credits,
            row.created_at,
            row.updated_at,
        ],
    )?;
    Ok(())
}

fn parse_course_row(row: &Row<'_>) -> RepoResult<Course> {
    let term: Option<i64> = row.get("term")?;
    let term = match term {
        Some(value) => Some(parse_term(value, "courses.term")?),
        None => None,
    };
    let is_deleted = int_to_bool(row.get("is_deleted")?, "courses.is_deleted")?;

    Ok(Course {
        id: row.get("id")?,
        code: row.get("course_code")?,
        title: row.get("course_title")?,
        category: row.get("category")?,
        unit_id: row.get("unit_id")?,
        term,
        hours: TeachingHours {
            lecture: row.get::<_, i64>("lecture_hours")? as u32,
            tutorial: row.get::<_, i64>("tutorial_hours")? as u32,
            practical: row.get::<_, i64>("practical_hours")? as u32,
        },
        internal_marks: row.get("internal_marks")?,
        exam_marks: row.get("exam_marks")?,
        credits: row.get("credits")?,
        created_by: row.get("created_by")?,
        created_at: row.get("created_at")?,
        is_deleted,
        deleted_at: row.get("deleted_at")?,
    })
}

fn parse_unit_course_row(row: &Row<'_>) -> RepoResult<UnitCourse> {
    let deleted = int_to_bool(row.get("deleted")?, "unit_courses.deleted")?;

    Ok(UnitCourse {
        id: row.get("id")?,
        unit_id: row.get("unit_id")?,
        year: row.get("year")?,
        term: parse_term(row.get("term")?, "unit_courses.term")?,
        code: row.get("course_code")?,
        title: row.get("course_title")?,
        category: row.get("category")?,
        is_elective: int_to_bool(row.get("is_elective")?, "unit_courses.is_elective")?,
        hours: TeachingHours {
            lecture: row.get::<_, i64>("lecture_hours")? as u32,
            tutorial: row.get::<_, i64>("tutorial_hours")? as u32,
            practical: row.get::<_, i64>("practical_hours")? as u32,
        },
        credits: row.get("credits")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
        deleted,
    })
}

pub(crate) fn parse_term(value: i64, column: &str) -> RepoResult<u8> {
    if (1..=8).contains(&value) {
        Ok(value as u8)
    } else {
        Err(RepoError::InvalidData(format!(
            "invalid term value `{value}` in {column}"
        )))
    }
}
