use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use anyhow::{Context, Result};
use tempfile::NamedTempFile;

use super::*;
use super::backends::TextBackend;
use super::chain::TextExtractionChain;
use crate::model::{ApiResponse, ErrorKind, ProcessingResult};

const ROSTER_PAGE: &str = "T.C.
ANKARA VALİLİĞİ
ÇANKAYA / Atatürk Ortaokulu Müdürlüğü
7. Sınıf / A Şubesi
Sınıf Öğretmeni: AYŞE YILMAZ
1 1001 ALİ YILMAZ Erkek
2 1002 ZEYNEP KAYA Kız";

const CONTINUATION_PAGE: &str = "7. Sınıf / A Şubesi
3 1003 CAN DEMİR Erkek
4 1004 ELİF ŞAHİN Kız";

const NO_HEADER_PAGE: &str = "ANKARA VALİLİĞİ
ÇANKAYA / Atatürk Ortaokulu Müdürlüğü
1 1001 ALİ YILMAZ Erkek";

struct ScriptedBackend {
    name: &'static str,
    pages: Vec<&'static str>,
    calls: Arc<AtomicUsize>,
    panic_on_page: Option<usize>,
    cancel_on_call: Option<Arc<AtomicBool>>,
}

impl ScriptedBackend {
    fn new(name: &'static str, pages: &[&'static str]) -> Self {
        Self {
            name,
            pages: pages.to_vec(),
            calls: Arc::new(AtomicUsize::new(0)),
            panic_on_page: None,
            cancel_on_call: None,
        }
    }

    fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

impl TextBackend for ScriptedBackend {
    fn name(&self) -> &'static str {
        self.name
    }

    fn is_available(&self) -> bool {
        true
    }

    fn extract(&self, _document: &Path, page_number: usize) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.panic_on_page == Some(page_number) {
            panic!("scripted failure on page {page_number}");
        }
        if let Some(cancel) = &self.cancel_on_call {
            cancel.store(true, Ordering::SeqCst);
        }
        self.pages
            .get(page_number - 1)
            .map(|text| text.to_string())
            .context("scripted page out of range")
    }
}

fn pipeline_with(text: ScriptedBackend, ocr: Option<ScriptedBackend>) -> Pipeline {
    let config = ExtractionConfig::default();
    let ocr = ocr.map(|backend| Box::new(backend) as Box<dyn TextBackend>);
    let chain = TextExtractionChain::with_backends(vec![Box::new(text)], ocr, &config);
    Pipeline::with_chain(config, chain).expect("pipeline")
}

fn document() -> NamedTempFile {
    NamedTempFile::new().expect("temp document")
}

fn run(pipeline: &Pipeline, document: &NamedTempFile, pages: usize) -> ProcessingResult {
    pipeline.run_pages(document.path(), pages, None, &AtomicBool::new(false))
}

#[test]
fn clean_text_layer_never_invokes_ocr() {
    let ocr = ScriptedBackend::new("ocr", &[ROSTER_PAGE]);
    let ocr_calls = ocr.calls();
    let pipeline = pipeline_with(ScriptedBackend::new("text", &[ROSTER_PAGE]), Some(ocr));
    let document = document();

    let result = run(&pipeline, &document, 1);

    assert!(result.success, "{}", result.message);
    assert_eq!(ocr_calls.load(Ordering::SeqCst), 0);
    assert_eq!(result.message, "roster extracted: 1 class, 2 students");

    let data = result.data.expect("result data");
    assert_eq!(data.total_pages, 1);
    let school = data.school_info.expect("school info");
    assert_eq!(school.province, "ANKARA");
    assert_eq!(data.classes[0].class_info.teachers[0].name, "AYŞE YILMAZ");
    assert!(!result.diagnostics.per_page[0].ocr_attempted);
}

#[test]
fn garbled_text_layer_falls_back_to_ocr() {
    let ocr = ScriptedBackend::new("ocr", &[ROSTER_PAGE]);
    let ocr_calls = ocr.calls();
    let pipeline = pipeline_with(
        ScriptedBackend::new("text", &["(cid:3)(cid:4)(cid:5)"]),
        Some(ocr),
    );
    let document = document();

    let result = run(&pipeline, &document, 1);

    assert!(result.success, "{}", result.message);
    assert_eq!(ocr_calls.load(Ordering::SeqCst), 1);
    let trace = &result.diagnostics.per_page[0];
    assert!(trace.ocr_attempted);
    assert!(trace.ocr_used);
    assert_eq!(trace.students_added, 2);
}

#[test]
fn fragmented_text_layer_is_rechecked_with_ocr() {
    let ocr = ScriptedBackend::new("ocr", &[ROSTER_PAGE]);
    let ocr_calls = ocr.calls();
    let pipeline = pipeline_with(ScriptedBackend::new("text", &["A\nL\nİ\n7. Sınıf"]), Some(ocr));
    let document = document();

    let result = run(&pipeline, &document, 1);

    assert!(result.success, "{}", result.message);
    assert_eq!(ocr_calls.load(Ordering::SeqCst), 1);
    assert!(result.diagnostics.per_page[0].ocr_used);
    assert_eq!(result.student_count(), 2);
}

#[test]
fn empty_pages_report_ocr_attempt_without_students() {
    let pipeline = pipeline_with(
        ScriptedBackend::new("text", &[""]),
        Some(ScriptedBackend::new("ocr", &[""])),
    );
    let document = document();

    let result = run(&pipeline, &document, 1);

    assert!(!result.success);
    let trace = &result.diagnostics.per_page[0];
    assert!(trace.ocr_attempted);
    assert!(!trace.ocr_used);
    assert_eq!(trace.line_count, 0);
    assert_eq!(result.student_count(), 0);
    assert!(result.message.contains("OCR was attempted on 1 of 1 pages"));
    assert!(result.message.contains("no school information found"));
}

#[test]
fn missing_headers_fail_with_explanation() {
    let pipeline = pipeline_with(ScriptedBackend::new("text", &[NO_HEADER_PAGE]), None);
    let document = document();

    let result = run(&pipeline, &document, 1);

    assert!(!result.success);
    assert!(result.message.contains("no class header candidates"));
    assert!(result.message.contains("no class header to attach to"));
    let data = result.data.expect("result data");
    assert!(data.classes.is_empty());
    assert!(data.school_info.is_some());
    assert!(result.errors.is_empty());
}

#[test]
fn repeated_runs_produce_identical_results() {
    let pipeline = pipeline_with(
        ScriptedBackend::new("text", &[ROSTER_PAGE, CONTINUATION_PAGE]),
        None,
    );
    let document = document();

    let mut first = run(&pipeline, &document, 2);
    let mut second = run(&pipeline, &document, 2);
    for result in [&mut first, &mut second] {
        if let Some(data) = result.data.as_mut() {
            data.processed_at.clear();
        }
    }

    assert_eq!(first, second);
}

#[test]
fn section_continues_across_pages() {
    let pipeline = pipeline_with(
        ScriptedBackend::new("text", &[ROSTER_PAGE, CONTINUATION_PAGE]),
        None,
    );
    let document = document();

    let result = run(&pipeline, &document, 2);

    assert!(result.success, "{}", result.message);
    assert_eq!(result.class_count(), 1);
    assert_eq!(result.student_count(), 4);
    let data = result.data.expect("result data");
    let statistics = &data.classes[0].statistics;
    assert_eq!(statistics.gender_distribution.female, 2);
    assert_eq!(statistics.gender_distribution.male, 2);
    assert_eq!(result.diagnostics.per_page.len(), 2);
    assert_eq!(result.diagnostics.per_page[1].students_added, 2);
}

#[test]
fn summary_message_counts_classes_and_students_in_the_right_number() {
    let second_class = "8. Sınıf / B Şubesi
1 2001 CAN DEMİR Erkek";
    let pipeline = pipeline_with(
        ScriptedBackend::new("text", &[ROSTER_PAGE, second_class]),
        None,
    );
    let document = document();

    let result = run(&pipeline, &document, 2);
    assert_eq!(result.message, "roster extracted: 2 classes, 3 students");

    let single = "ANKARA VALİLİĞİ
ÇANKAYA / Atatürk Ortaokulu Müdürlüğü
7. Sınıf / A Şubesi
1 1001 ALİ YILMAZ Erkek";
    let pipeline = pipeline_with(ScriptedBackend::new("text", &[single]), None);

    let result = run(&pipeline, &document, 1);
    assert_eq!(result.message, "roster extracted: 1 class, 1 student");
}

#[test]
fn page_panic_is_recorded_and_other_pages_survive() {
    let mut text = ScriptedBackend::new("text", &[ROSTER_PAGE, CONTINUATION_PAGE]);
    text.panic_on_page = Some(2);
    let pipeline = pipeline_with(text, None);
    let document = document();

    let result = run(&pipeline, &document, 2);

    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].page, 2);
    assert_eq!(result.errors[0].kind, ErrorKind::PageProcessError);
    assert!(result.errors[0].message.contains("scripted failure on page 2"));
    assert_eq!(result.student_count(), 2);
    assert_eq!(result.diagnostics.per_page.len(), 2);
    assert_eq!(result.diagnostics.per_page[1].line_count, 0);
}

#[test]
fn cancellation_stops_before_next_page_and_drops_open_section() {
    let cancel = Arc::new(AtomicBool::new(false));
    let mut text = ScriptedBackend::new("text", &[ROSTER_PAGE, CONTINUATION_PAGE]);
    text.cancel_on_call = Some(Arc::clone(&cancel));
    let calls = text.calls();
    let pipeline = pipeline_with(text, None);
    let document = document();

    let result = pipeline.run_pages(document.path(), 2, None, &cancel);

    assert!(!result.success);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(result.message.contains("processing cancelled after 1 of 2 pages"));
    assert_eq!(result.class_count(), 0);
    assert_eq!(result.diagnostics.per_page.len(), 1);
}

#[test]
fn missing_or_empty_document_is_a_file_failure() {
    let pipeline = pipeline_with(ScriptedBackend::new("text", &[ROSTER_PAGE]), None);

    let missing = pipeline.process(Path::new("/nonexistent/roster.pdf"), None);
    assert!(!missing.success);
    assert!(missing.data.is_none());
    assert_eq!(missing.errors.len(), 1);
    assert_eq!(missing.errors[0].page, 0);
    assert_eq!(missing.errors[0].kind, ErrorKind::FileProcessError);

    let empty = document();
    let result = pipeline.process(empty.path(), None);
    assert!(result.data.is_none());
    assert!(result.message.contains("document is empty"));

    let bytes = pipeline.process_bytes(&[], Some("liste.pdf"));
    assert!(!bytes.success);
    assert_eq!(bytes.errors[0].kind, ErrorKind::FileProcessError);
}

#[test]
fn unparseable_bytes_are_a_file_failure() {
    let pipeline = pipeline_with(ScriptedBackend::new("text", &[ROSTER_PAGE]), None);

    let result = pipeline.process_bytes(b"not a pdf document", None);

    assert!(!result.success);
    assert!(result.data.is_none());
    assert_eq!(result.errors[0].kind, ErrorKind::FileProcessError);
}

#[test]
fn api_response_carries_data_only_on_success() {
    let pipeline = pipeline_with(ScriptedBackend::new("text", &[ROSTER_PAGE]), None);
    let document = document();

    let success = run(&pipeline, &document, 1);
    let response = ApiResponse::from(&success);
    assert!(response.status);
    assert!(response.data.is_some());

    let failure = ProcessingResult::file_failure("document is empty");
    let response = ApiResponse::from(&failure);
    assert!(!response.status);
    assert!(response.data.is_none());
    assert_eq!(response.message, "failed to process document: document is empty");

    let json = serde_json::to_value(&success).expect("serialize result");
    assert!(json["data"]["schoolInfo"]["schoolName"].is_string());
    assert_eq!(json["data"]["classes"][0]["classInfo"]["type"], "Yabancı Dil Ağırlıklı");
    assert_eq!(json["data"]["classes"][0]["students"][1]["gender"], "female");
    assert_eq!(json["diagnostics"]["perPage"][0]["studentsAdded"], 2);
}

#[test]
fn institution_hint_without_classes_reports_unsupported_layout() {
    let pipeline = pipeline_with(ScriptedBackend::new("text", &[NO_HEADER_PAGE]), None);
    let document = document();

    let result = pipeline.run_pages(
        document.path(),
        1,
        Some("UMRANIYE_ANAOKULU.pdf"),
        &AtomicBool::new(false),
    );

    assert!(!result.success);
    assert!(
        result
            .message
            .contains("unsupported layout for the recognized institution")
    );
}
