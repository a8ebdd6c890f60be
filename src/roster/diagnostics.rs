use crate::model::{Diagnostics, PageTrace};

use super::config::DEFAULT_DIAGNOSTIC_SAMPLE_CAP;
use super::variant::DocumentVariant;

#[derive(Debug, Clone)]
pub struct DiagnosticsCollector {
    cap: usize,
    diagnostics: Diagnostics,
}

impl Default for DiagnosticsCollector {
    fn default() -> Self {
        Self::new(DEFAULT_DIAGNOSTIC_SAMPLE_CAP)
    }
}

impl DiagnosticsCollector {
    pub fn new(cap: usize) -> Self {
        Self {
            cap,
            diagnostics: Diagnostics::default(),
        }
    }

    pub fn record_header_candidate(&mut self, line: &str) {
        push_capped(&mut self.diagnostics.class_header_candidates, line, self.cap);
    }

    pub fn record_teacher_candidate(&mut self, line: &str) {
        push_capped(&mut self.diagnostics.teacher_line_candidates, line, self.cap);
    }

    pub fn record_student_hit(&mut self) {
        self.diagnostics.student_regex_hits += 1;
    }

    pub fn record_student_miss(&mut self, line: &str) {
        self.diagnostics.student_regex_misses += 1;
        push_capped(&mut self.diagnostics.student_regex_miss_samples, line, self.cap);
    }

    pub fn record_page(&mut self, trace: PageTrace) {
        self.diagnostics.per_page.push(trace);
    }

    pub fn finish(self) -> Diagnostics {
        self.diagnostics
    }
}

fn push_capped(samples: &mut Vec<String>, line: &str, cap: usize) {
    if samples.len() < cap {
        samples.push(line.to_string());
    }
}

pub fn explain_missing_school(school_header_lines: usize) -> String {
    format!(
        "no school information found: no province or institution line in the first {school_header_lines} lines of page 1"
    )
}

pub fn explain_missing_classes(diagnostics: &Diagnostics, variant: DocumentVariant) -> String {
    let pages = diagnostics.per_page.len();
    let total_lines = diagnostics
        .per_page
        .iter()
        .map(|page| page.line_count)
        .sum::<usize>();
    let ocr_pages = diagnostics
        .per_page
        .iter()
        .filter(|page| page.ocr_attempted)
        .count();

    let mut reason = if total_lines == 0 {
        if ocr_pages > 0 {
            format!(
                "no class sections found: OCR was attempted on {ocr_pages} of {pages} pages but produced no usable text"
            )
        } else {
            format!("no class sections found: no text could be extracted from any of {pages} pages")
        }
    } else if diagnostics.class_header_candidates.is_empty() {
        format!(
            "no class sections found: no class header candidates in {total_lines} lines across {pages} pages"
        )
    } else {
        format!(
            "no class sections found: {} class header candidates did not match the header grammar (first: '{}')",
            diagnostics.class_header_candidates.len(),
            diagnostics.class_header_candidates[0]
        )
    };

    if diagnostics.student_regex_hits == 0 && diagnostics.student_regex_misses > 0 {
        reason.push_str(&format!(
            "; {} row-like lines were present but none matched the student row grammar",
            diagnostics.student_regex_misses
        ));
    } else if diagnostics.student_regex_hits > 0 {
        reason.push_str(&format!(
            "; {} student rows matched but had no class header to attach to",
            diagnostics.student_regex_hits
        ));
    }

    if variant == DocumentVariant::Institution {
        format!("unsupported layout for the recognized institution, insufficient data: {reason}")
    } else {
        reason
    }
}

pub fn explain_empty_rosters(diagnostics: &Diagnostics) -> Option<String> {
    if diagnostics.student_regex_hits > 0 {
        return None;
    }
    Some(if diagnostics.student_regex_misses > 0 {
        format!(
            "class headers found but {} row-like lines did not match the student row grammar",
            diagnostics.student_regex_misses
        )
    } else {
        "class headers found but no student rows were present".to_string()
    })
}
