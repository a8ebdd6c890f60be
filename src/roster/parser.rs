use tracing::debug;

use super::aggregate::{OpenSection, close_section};
use super::diagnostics::DiagnosticsCollector;
use super::fold::FoldedLine;
use super::grammar::{HeaderKind, HeaderMatch, RosterGrammar, RowShape, SchoolField};
use super::variant::DocumentVariant;
use crate::model::{ClassSection, Diagnostics, PageTrace, SchoolInfo, SchoolType, Teacher};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineClass {
    SchoolIdentity,
    ClassHeader(HeaderKind),
    Teacher,
    Student(RowShape),
    Noise,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinePosition {
    pub page_index: usize,
    pub line_index: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchoolDraft {
    pub province: Option<String>,
    pub district: Option<String>,
    pub school_name: Option<String>,
    pub school_type: Option<SchoolType>,
}

impl SchoolDraft {
    fn apply(&mut self, field: SchoolField) {
        match field {
            SchoolField::Province(province) => {
                self.province.get_or_insert(province);
            }
            SchoolField::DistrictAndSchool {
                district,
                school_name,
                school_type,
            } => {
                if self.school_name.is_none() {
                    self.district = Some(district);
                    self.school_name = Some(school_name);
                    self.school_type = Some(school_type);
                }
            }
        }
    }

    pub fn build(&self) -> Option<SchoolInfo> {
        if self.province.is_none() && self.school_name.is_none() {
            return None;
        }
        Some(SchoolInfo {
            province: self.province.clone().unwrap_or_default(),
            district: self.district.clone().unwrap_or_default(),
            school_name: self.school_name.clone().unwrap_or_default(),
            school_type: self.school_type.unwrap_or(SchoolType::State),
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct PageCounters {
    found_class_header: bool,
    students_added: usize,
}

#[derive(Debug, Clone)]
pub struct ParserState {
    pub variant: DocumentVariant,
    pub school: SchoolDraft,
    pub open: Option<OpenSection>,
    pub classes: Vec<ClassSection>,
    pub diagnostics: DiagnosticsCollector,
    page: PageCounters,
}

impl ParserState {
    pub fn new(diagnostic_sample_cap: usize) -> Self {
        Self {
            variant: DocumentVariant::Generic,
            school: SchoolDraft::default(),
            open: None,
            classes: Vec::new(),
            diagnostics: DiagnosticsCollector::new(diagnostic_sample_cap),
            page: PageCounters::default(),
        }
    }

    pub fn begin_page(&mut self) {
        self.page = PageCounters::default();
    }

    pub fn end_page(&mut self, page: usize, line_count: usize, ocr_attempted: bool, ocr_used: bool) {
        let counters = std::mem::take(&mut self.page);
        self.diagnostics.record_page(PageTrace {
            page,
            line_count,
            ocr_attempted,
            ocr_used,
            found_class_header: counters.found_class_header,
            students_added: counters.students_added,
        });
    }

    fn open_section(&mut self, header: HeaderMatch) {
        if let Some(open) = self.open.as_mut() {
            if open.info.same_section(&header.info) {
                if header.kind != HeaderKind::KeywordFallback {
                    open.provisional = false;
                }
                debug!(
                    grade = %header.info.grade,
                    section = %header.info.section,
                    "repeated class header, continuing open section"
                );
                return;
            }
        }

        let previous = match self.open.take() {
            Some(open) if open.is_replaceable() => {
                debug!(
                    grade = %open.info.grade,
                    section = %open.info.section,
                    "replacing empty keyword section with class header"
                );
                None
            }
            previous => previous,
        };
        close_section(
            previous,
            &mut self.classes,
            self.variant.dedupes_students_by_id(),
        );
        debug!(
            kind = ?header.kind,
            grade = %header.info.grade,
            section = %header.info.section,
            "opened class section"
        );
        self.open = Some(match header.kind {
            HeaderKind::KeywordFallback => OpenSection::provisional(header.info),
            _ => OpenSection::new(header.info),
        });
    }

    fn attach_teacher(&mut self, teacher: Teacher) {
        match self.open.as_mut() {
            Some(open) => {
                open.add_teacher(teacher);
            }
            None => debug!(teacher = %teacher.name, "teacher line before any class header"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ParseOutcome {
    pub school_info: Option<SchoolInfo>,
    pub classes: Vec<ClassSection>,
    pub diagnostics: Diagnostics,
}

pub struct StructuralParser<'g> {
    grammar: &'g RosterGrammar,
    school_header_lines: usize,
}

impl<'g> StructuralParser<'g> {
    pub fn new(grammar: &'g RosterGrammar, school_header_lines: usize) -> Self {
        Self {
            grammar,
            school_header_lines,
        }
    }

    pub fn step(
        &self,
        mut state: ParserState,
        line: &str,
        position: LinePosition,
    ) -> (ParserState, LineClass) {
        let line = line.trim();
        let folded = FoldedLine::new(line);

        if position.page_index == 0 && position.line_index < self.school_header_lines {
            if let Some(field) = self.grammar.match_school_field(&folded) {
                state.school.apply(field);
                return (state, LineClass::SchoolIdentity);
            }
        }

        let header_candidate = self.grammar.is_header_candidate(&folded);
        if header_candidate {
            state.diagnostics.record_header_candidate(line);
        }
        let teacher = if self.grammar.is_teacher_candidate(&folded) {
            state.diagnostics.record_teacher_candidate(line);
            self.grammar.match_teacher(&folded)
        } else {
            None
        };

        if let Some(header) = self.grammar.match_header(&folded) {
            let kind = header.kind;
            state.open_section(header);
            state.page.found_class_header = true;
            if let Some(Some(teacher)) = teacher {
                state.attach_teacher(teacher);
            }
            return (state, LineClass::ClassHeader(kind));
        }

        if let Some(teacher) = teacher {
            if let Some(teacher) = teacher {
                state.attach_teacher(teacher);
            }
            return (state, LineClass::Teacher);
        }

        if let Some((shape, student)) = self.grammar.match_student(line) {
            state.diagnostics.record_student_hit();
            match state.open.as_mut() {
                Some(open) => {
                    open.students.push(student);
                    state.page.students_added += 1;
                }
                None => debug!(
                    student_id = %student.student_id,
                    "student row before any class header, dropped"
                ),
            }
            return (state, LineClass::Student(shape));
        }

        if header_candidate && state.open.is_none() {
            if let Some(header) = self.grammar.fallback_header(&folded) {
                state.open_section(header);
                state.page.found_class_header = true;
                return (state, LineClass::ClassHeader(HeaderKind::KeywordFallback));
            }
        }

        if self.grammar.looks_like_student_row(line) {
            state.diagnostics.record_student_miss(line);
        }
        (state, LineClass::Noise)
    }

    pub fn step_page(&self, mut state: ParserState, page_index: usize, lines: &[&str]) -> ParserState {
        for (line_index, line) in lines.iter().enumerate() {
            let (next, class) = self.step(
                state,
                line,
                LinePosition {
                    page_index,
                    line_index,
                },
            );
            if class != LineClass::Noise {
                debug!(page = page_index + 1, line = line_index + 1, class = ?class, "classified line");
            }
            state = next;
        }
        state
    }

    pub fn finish(&self, mut state: ParserState) -> ParseOutcome {
        let open = state.open.take();
        close_section(open, &mut state.classes, state.variant.dedupes_students_by_id());
        self.abandon(state)
    }

    pub fn abandon(&self, state: ParserState) -> ParseOutcome {
        ParseOutcome {
            school_info: state.school.build(),
            classes: state.classes,
            diagnostics: state.diagnostics.finish(),
        }
    }
}
