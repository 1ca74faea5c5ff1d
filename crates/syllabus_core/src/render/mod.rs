//! Course document rendering.
//!
//! # Responsibility
//! - Render one course plus its syllabus content into a paginated document.
//! - Parse and re-serialize documents so assembly can concatenate them
//!   without touching page boundaries.
//!
//! # Invariants
//! - Rendering is deterministic: identical inputs yield identical bytes.
//! - Pages are the atomic unit; concatenation never splits or reflows a page.
//! - Absent sections (empty collections) are omitted entirely, not rendered
//!   as empty headings.

use crate::model::course::Course;
use crate::model::syllabus::SyllabusContent;
use std::error::Error;
use std::fmt::{Display, Formatter, Write as _};

/// First line of every serialized document.
pub const DOCUMENT_MAGIC: &str = "%SYLDOC 1";

/// Lines per page before a break is forced.
pub const PAGE_LINES: usize = 48;

/// Page separator in the serialized byte form.
const PAGE_SEPARATOR: char = '\u{000C}';

/// Articulation matrix column headings, fixed programme-wide.
pub const MATRIX_COLUMNS: &[&str] = &[
    "PO1", "PO2", "PO3", "PO4", "PO5", "PO6", "PO7", "PO8", "PO9", "PO10", "PO11", "PO12",
    "PSO1", "PSO2",
];

/// Total marks the default assessment plan carries.
pub const DEFAULT_ASSESSMENT_TOTAL: u32 = 50;

pub type RenderResult<T> = Result<T, RenderError>;

/// Rendering and document-parsing errors.
#[derive(Debug)]
pub enum RenderError {
    /// An articulation matrix row does not span the fixed column set.
    MatrixShape {
        row: usize,
        expected: usize,
        found: usize,
    },
    /// Bytes do not parse as a serialized document.
    MalformedDocument(String),
}

impl Display for RenderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MatrixShape {
                row,
                expected,
                found,
            } => write!(
                f,
                "articulation matrix row {row} has {found} cells, expected {expected}"
            ),
            Self::MalformedDocument(reason) => write!(f, "malformed document: {reason}"),
        }
    }
}

impl Error for RenderError {}

/// A paginated document: an ordered sequence of fixed-height text pages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    pages: Vec<String>,
}

impl Document {
    pub fn from_pages(pages: Vec<String>) -> Self {
        Self { pages }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn pages(&self) -> &[String] {
        &self.pages
    }

    /// Serializes the document. The page sequence round-trips exactly
    /// through `from_bytes`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = String::new();
        out.push_str(DOCUMENT_MAGIC);
        out.push('\n');
        for (index, page) in self.pages.iter().enumerate() {
            if index > 0 {
                out.push(PAGE_SEPARATOR);
            }
            out.push_str(page);
        }
        out.into_bytes()
    }

    /// Parses serialized bytes back into a page sequence.
    pub fn from_bytes(bytes: &[u8]) -> RenderResult<Self> {
        let text = std::str::from_utf8(bytes)
            .map_err(|_| RenderError::MalformedDocument("not valid UTF-8".to_string()))?;
        let body = text.strip_prefix(DOCUMENT_MAGIC).ok_or_else(|| {
            RenderError::MalformedDocument(format!("missing `{DOCUMENT_MAGIC}` header"))
        })?;
        let body = body.strip_prefix('\n').ok_or_else(|| {
            RenderError::MalformedDocument("header not terminated by newline".to_string())
        })?;

        if body.is_empty() {
            return Ok(Self { pages: Vec::new() });
        }
        Ok(Self {
            pages: body.split(PAGE_SEPARATOR).map(str::to_string).collect(),
        })
    }

    /// Concatenates documents by appending whole pages in order. Source page
    /// boundaries are preserved byte-for-byte.
    pub fn concat(documents: impl IntoIterator<Item = Document>) -> Document {
        let mut pages = Vec::new();
        for document in documents {
            pages.extend(document.pages);
        }
        Document { pages }
    }
}

/// Renders one course into a paginated document.
pub trait CourseRenderer {
    fn render(&self, course: &Course, content: Option<&SyllabusContent>)
        -> RenderResult<Document>;
}

/// Section-by-section text renderer, the default `CourseRenderer`.
///
/// Output layout is intentionally plain: a heading per present section,
/// fixed-width matrix and assessment tables, page breaks every `PAGE_LINES`
/// lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct SectionRenderer;

impl CourseRenderer for SectionRenderer {
    fn render(
        &self,
        course: &Course,
        content: Option<&SyllabusContent>,
    ) -> RenderResult<Document> {
        let mut lines = Vec::new();
        render_identity(course, &mut lines);

        if let Some(content) = content {
            render_list_section(&mut lines, "COURSE OBJECTIVES", &content.objectives);
            render_list_section(&mut lines, "COURSE OUTCOMES", &content.outcomes);
            render_modules(&mut lines, content);
            render_assessment(&mut lines, content);
            render_books(&mut lines, "TEXTBOOKS", &content.textbooks);
            render_books(&mut lines, "REFERENCE BOOKS", &content.reference_books);
            render_matrix(&mut lines, content)?;
        } else {
            render_assessment_rows(&mut lines, default_assessment_rows());
        }

        Ok(Document::from_pages(paginate(&lines)))
    }
}

/// Convenience entry point: renders a course with the default renderer and
/// serializes the result.
pub fn render_course_document(
    course: &Course,
    content: Option<&SyllabusContent>,
) -> RenderResult<Vec<u8>> {
    SectionRenderer.render(course, content).map(|d| d.to_bytes())
}

fn render_identity(course: &Course, lines: &mut Vec<String>) {
    lines.push(format!("{} :: {}", course.code, course.title));
    lines.push(format!("Category: {}", course.category));
    if let Some(term) = course.term {
        lines.push(format!("Term: {term}"));
    }
    lines.push(format!(
        "Hours (L-T-P): {}-{}-{}",
        course.hours.lecture, course.hours.tutorial, course.hours.practical
    ));
    lines.push(format!(
        "Marks: internal {} / exam {}    Credits: {}",
        course.internal_marks, course.exam_marks, course.credits
    ));
    lines.push(String::new());
}

fn render_list_section(lines: &mut Vec<String>, heading: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    lines.push(heading.to_string());
    for (index, item) in items.iter().enumerate() {
        lines.push(format!("  {}. {item}", index + 1));
    }
    lines.push(String::new());
}

fn render_modules(lines: &mut Vec<String>, content: &SyllabusContent) {
    if content.modules.is_empty() {
        return;
    }
    lines.push("MODULES".to_string());
    for (index, module) in content.modules.iter().enumerate() {
        lines.push(format!(
            "  Module {}: {} [{} hours]",
            index + 1,
            module.title,
            module.hours
        ));
        for topic in &module.topics {
            lines.push(format!("    - {topic}"));
        }
    }
    lines.push(String::new());
}

fn render_assessment(lines: &mut Vec<String>, content: &SyllabusContent) {
    if content.assessment.is_empty() {
        render_assessment_rows(lines, default_assessment_rows());
    } else {
        let rows: Vec<(String, String, u32)> = content
            .assessment
            .iter()
            .map(|row| (row.tool.clone(), row.remarks.clone(), row.marks))
            .collect();
        render_assessment_rows(lines, rows);
    }
}

fn render_assessment_rows(lines: &mut Vec<String>, rows: Vec<(String, String, u32)>) {
    lines.push("CONTINUOUS ASSESSMENT".to_string());
    // Row marks are caller-supplied; sum in u64 so a pathological plan
    // cannot overflow.
    let mut total = 0u64;
    for (tool, remarks, marks) in &rows {
        lines.push(format!("  {tool:<28} {remarks:<32} {marks:>4}"));
        total += u64::from(*marks);
    }
    lines.push(format!("  {:<28} {:<32} {total:>4}", "TOTAL", ""));
    lines.push(String::new());
}

fn default_assessment_rows() -> Vec<(String, String, u32)> {
    vec![
        (
            "Internals".to_string(),
            "three internal tests, best two".to_string(),
            30,
        ),
        ("AAT".to_string(), "lab evaluation".to_string(), 20),
    ]
}

fn render_books(lines: &mut Vec<String>, heading: &str, books: &[crate::model::syllabus::BookEntry]) {
    if books.is_empty() {
        return;
    }
    lines.push(heading.to_string());
    for (index, book) in books.iter().enumerate() {
        lines.push(format!(
            "  {}. {}, {}, {} ed., {}, {}",
            index + 1,
            book.authors,
            book.title,
            book.edition,
            book.publisher,
            book.year
        ));
    }
    lines.push(String::new());
}

fn render_matrix(lines: &mut Vec<String>, content: &SyllabusContent) -> RenderResult<()> {
    if content.articulation_matrix.is_empty() {
        return Ok(());
    }

    for (index, row) in content.articulation_matrix.iter().enumerate() {
        if row.len() != MATRIX_COLUMNS.len() {
            return Err(RenderError::MatrixShape {
                row: index + 1,
                expected: MATRIX_COLUMNS.len(),
                found: row.len(),
            });
        }
    }

    lines.push("CO-PO ARTICULATION MATRIX".to_string());
    let mut header = String::from("  CO   ");
    for column in MATRIX_COLUMNS {
        let _ = write!(header, "{column:>5}");
    }
    lines.push(header);

    // The matrix is sized by outcome count; missing trailing rows render
    // blank so the table shape stays stable while content is authored.
    let row_count = content
        .effective_outcome_count()
        .max(content.articulation_matrix.len());
    for index in 0..row_count {
        let mut line = format!("  CO{:<4}", index + 1);
        match content.articulation_matrix.get(index) {
            Some(row) => {
                for cell in row {
                    match cell {
                        Some(level) => {
                            let _ = write!(line, "{level:>5}");
                        }
                        None => line.push_str("    -"),
                    }
                }
            }
            None => {
                for _ in MATRIX_COLUMNS {
                    line.push_str("    -");
                }
            }
        }
        lines.push(line);
    }
    lines.push(String::new());
    Ok(())
}

/// Splits flat lines into fixed-height pages.
fn paginate(lines: &[String]) -> Vec<String> {
    if lines.is_empty() {
        return vec![String::new()];
    }
    lines
        .chunks(PAGE_LINES)
        .map(|chunk| chunk.join("\n"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{
        render_course_document, CourseRenderer, Document, RenderError, SectionRenderer,
        MATRIX_COLUMNS, PAGE_LINES,
    };
    use crate::model::course::{Course, TeachingHours};
    use crate::model::syllabus::{ModuleUnit, SyllabusContent};

    fn course() -> Course {
        Course {
            id: 1,
            code: "CS301".to_string(),
            title: "Operating Systems".to_string(),
            category: "PC".to_string(),
            unit_id: None,
            term: Some(5),
            hours: TeachingHours {
                lecture: 3,
                tutorial: 0,
                practical: 2,
            },
            internal_marks: 50,
            exam_marks: 50,
            credits: 4.0,
            created_by: "admin".to_string(),
            created_at: 0,
            is_deleted: false,
            deleted_at: None,
        }
    }

    fn content_with_modules(module_count: usize) -> SyllabusContent {
        let mut content = SyllabusContent::empty(1);
        content.modules = (0..module_count)
            .map(|i| ModuleUnit {
                title: format!("Module {i}"),
                topics: (0..10).map(|t| format!("topic {t}")).collect(),
                hours: 8,
            })
            .collect();
        content
    }

    #[test]
    fn rendering_is_deterministic() {
        let course = course();
        let content = content_with_modules(3);
        let first = render_course_document(&course, Some(&content)).unwrap();
        let second = render_course_document(&course, Some(&content)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn document_bytes_round_trip() {
        let document = SectionRenderer
            .render(&course(), Some(&content_with_modules(6)))
            .unwrap();
        assert!(document.page_count() > 1, "expected multi-page output");
        let parsed = Document::from_bytes(&document.to_bytes()).unwrap();
        assert_eq!(parsed, document);
    }

    #[test]
    fn concat_preserves_page_boundaries() {
        let a = SectionRenderer
            .render(&course(), Some(&content_with_modules(6)))
            .unwrap();
        let b = SectionRenderer.render(&course(), None).unwrap();
        let expected = a.page_count() + b.page_count();
        let combined = Document::concat(vec![a.clone(), b]);
        assert_eq!(combined.page_count(), expected);
        assert_eq!(&combined.pages()[..a.page_count()], a.pages());
    }

    #[test]
    fn pages_never_exceed_line_budget() {
        let document = SectionRenderer
            .render(&course(), Some(&content_with_modules(8)))
            .unwrap();
        for page in document.pages() {
            assert!(page.lines().count() <= PAGE_LINES);
        }
    }

    #[test]
    fn empty_sections_are_omitted() {
        let document = SectionRenderer
            .render(&course(), Some(&SyllabusContent::empty(1)))
            .unwrap();
        let text = String::from_utf8(document.to_bytes()).unwrap();
        assert!(!text.contains("COURSE OBJECTIVES"));
        assert!(!text.contains("TEXTBOOKS"));
        // Assessment always renders, falling back to the default plan.
        assert!(text.contains("CONTINUOUS ASSESSMENT"));
        assert!(text.contains("Internals"));
    }

    #[test]
    fn oversized_assessment_marks_do_not_overflow_the_total() {
        let mut content = SyllabusContent::empty(1);
        content.assessment = vec![
            crate::model::syllabus::AssessmentRow {
                tool: "A".to_string(),
                remarks: String::new(),
                marks: u32::MAX,
            },
            crate::model::syllabus::AssessmentRow {
                tool: "B".to_string(),
                remarks: String::new(),
                marks: u32::MAX,
            },
        ];
        let document = SectionRenderer.render(&course(), Some(&content)).unwrap();
        let text = String::from_utf8(document.to_bytes()).unwrap();
        let expected = u64::from(u32::MAX) * 2;
        assert!(text.contains(&expected.to_string()));
    }

    #[test]
    fn misshapen_matrix_row_is_rejected() {
        let mut content = SyllabusContent::empty(1);
        content.articulation_matrix = vec![vec![Some(3); MATRIX_COLUMNS.len() - 1]];
        let err = SectionRenderer
            .render(&course(), Some(&content))
            .unwrap_err();
        assert!(matches!(err, RenderError::MatrixShape { row: 1, .. }));
    }

    #[test]
    fn malformed_bytes_are_rejected() {
        let err = Document::from_bytes(b"plain text").unwrap_err();
        assert!(matches!(err, RenderError::MalformedDocument(_)));
    }
}
