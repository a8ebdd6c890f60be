use std::any::Any;
use std::io::Write;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use tracing::{debug, error, info, warn};

use super::backends::count_pages;
use super::chain::{PageText, TextExtractionChain};
use super::config::ExtractionConfig;
use super::diagnostics::{explain_empty_rosters, explain_missing_classes, explain_missing_school};
use super::grammar::RosterGrammar;
use super::parser::{ParseOutcome, ParserState, StructuralParser};
use super::quality::Usability;
use super::variant::{DocumentVariant, classify};
use crate::model::{ErrorEntry, ErrorKind, PageTrace, ProcessingResult, ResultData};
use crate::util::now_utc_string;

pub struct Pipeline {
    config: ExtractionConfig,
    chain: TextExtractionChain,
    grammar: RosterGrammar,
}

impl Pipeline {
    pub fn new(config: ExtractionConfig) -> Result<Self> {
        let chain = TextExtractionChain::new(&config);
        Self::with_chain(config, chain)
    }

    pub fn with_chain(config: ExtractionConfig, chain: TextExtractionChain) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            chain,
            grammar: RosterGrammar::new()?,
        })
    }

    pub fn process(&self, document: &Path, source_hint: Option<&str>) -> ProcessingResult {
        self.process_cancellable(document, source_hint, &AtomicBool::new(false))
    }

    pub fn process_cancellable(
        &self,
        document: &Path,
        source_hint: Option<&str>,
        cancel: &AtomicBool,
    ) -> ProcessingResult {
        let total_pages = match count_pages(document) {
            Ok(0) => {
                error!(document = %document.display(), "document has no pages");
                return ProcessingResult::file_failure(format!(
                    "document has no pages: {}",
                    document.display()
                ));
            }
            Ok(count) => count,
            Err(err) => {
                error!(document = %document.display(), error = %err, "failed to open document");
                return ProcessingResult::file_failure(format!("{err:#}"));
            }
        };

        self.run_pages(document, total_pages, source_hint, cancel)
    }

    pub fn process_bytes(&self, bytes: &[u8], source_hint: Option<&str>) -> ProcessingResult {
        if bytes.is_empty() {
            return ProcessingResult::file_failure("document is empty");
        }

        let staged = match stage_bytes(bytes) {
            Ok(file) => file,
            Err(err) => return ProcessingResult::file_failure(format!("{err:#}")),
        };
        self.process(staged.path(), source_hint)
    }

    pub(crate) fn run_pages(
        &self,
        document: &Path,
        total_pages: usize,
        source_hint: Option<&str>,
        cancel: &AtomicBool,
    ) -> ProcessingResult {
        info!(
            document = %document.display(),
            total_pages,
            "processing roster document"
        );

        let parser = StructuralParser::new(&self.grammar, self.config.school_header_lines);
        let mut state = ParserState::new(self.config.diagnostic_sample_cap);
        let mut errors = Vec::<ErrorEntry>::new();
        let mut processed_pages = 0usize;

        for page_index in 0..total_pages {
            if cancel.load(Ordering::Relaxed) {
                warn!(page = page_index + 1, "processing cancelled");
                break;
            }

            let snapshot = state.clone();
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                self.process_page(&parser, state, document, page_index, source_hint)
            }));
            state = match outcome {
                Ok(next) => next,
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    error!(page = page_index + 1, error = %message, "page processing failed");
                    errors.push(ErrorEntry {
                        page: page_index + 1,
                        kind: ErrorKind::PageProcessError,
                        message,
                    });
                    let mut restored = snapshot;
                    restored.diagnostics.record_page(PageTrace {
                        page: page_index + 1,
                        ..PageTrace::default()
                    });
                    restored
                }
            };
            processed_pages += 1;
        }

        let variant = state.variant;
        if processed_pages < total_pages {
            let outcome = parser.abandon(state);
            return assemble(
                outcome,
                total_pages,
                errors,
                variant,
                Some(format!(
                    "processing cancelled after {processed_pages} of {total_pages} pages"
                )),
                self.config.school_header_lines,
            );
        }

        let outcome = parser.finish(state);
        assemble(
            outcome,
            total_pages,
            errors,
            variant,
            None,
            self.config.school_header_lines,
        )
    }

    fn process_page(
        &self,
        parser: &StructuralParser<'_>,
        mut state: ParserState,
        document: &Path,
        page_index: usize,
        source_hint: Option<&str>,
    ) -> ParserState {
        let page_number = page_index + 1;
        let page_text = self.extract_with_recheck(document, page_index);

        if page_index == 0 {
            state.variant = classify(source_hint, &page_text.text, &self.config);
            info!(variant = state.variant.as_str(), "selected roster layout");
        }

        let lines = page_text.lines();
        debug!(
            page = page_number,
            backend = page_text.backend.unwrap_or("none"),
            lines = lines.len(),
            "extracted page text"
        );

        state.begin_page();
        let mut state = parser.step_page(state, page_index, &lines);
        state.end_page(
            page_number,
            lines.len(),
            page_text.ocr_attempted,
            page_text.ocr_used,
        );
        state
    }

    fn extract_with_recheck(&self, document: &Path, page_index: usize) -> PageText {
        let page = self.chain.extract_page(document, page_index, false);
        let usability = self.chain.assess(&page.text);
        if usability == Usability::Usable || page.ocr_attempted {
            return page;
        }

        debug!(
            page = page_index + 1,
            usability = ?usability,
            "page text unusable, retrying with OCR"
        );
        let ocr = self.chain.extract_page(document, page_index, true);
        if self.chain.assess(&ocr.text) < usability {
            return ocr;
        }

        PageText {
            ocr_attempted: ocr.ocr_attempted,
            ..page
        }
    }
}

fn assemble(
    outcome: ParseOutcome,
    total_pages: usize,
    errors: Vec<ErrorEntry>,
    variant: DocumentVariant,
    interruption: Option<String>,
    school_header_lines: usize,
) -> ProcessingResult {
    let ParseOutcome {
        school_info,
        classes,
        diagnostics,
    } = outcome;

    let mut reasons = Vec::<String>::new();
    if let Some(interruption) = interruption {
        reasons.push(interruption);
    }
    if school_info.is_none() {
        reasons.push(explain_missing_school(school_header_lines));
    }
    if classes.is_empty() {
        reasons.push(explain_missing_classes(&diagnostics, variant));
    }

    let success = reasons.is_empty();
    let message = if success {
        let students = classes
            .iter()
            .map(|class| class.statistics.total_students)
            .sum::<usize>();
        let mut message = format!(
            "roster extracted: {}, {}",
            counted(classes.len(), "class", "classes"),
            counted(students, "student", "students")
        );
        if students == 0 {
            if let Some(note) = explain_empty_rosters(&diagnostics) {
                message.push_str(&format!(" ({note})"));
            }
        }
        info!(classes = classes.len(), students, "roster extraction completed");
        message
    } else {
        let message = reasons.join("; ");
        warn!(reason = %message, "roster extraction failed");
        message
    };

    ProcessingResult {
        success,
        message,
        data: Some(ResultData {
            total_pages,
            processed_at: now_utc_string(),
            school_info,
            classes,
        }),
        errors,
        diagnostics,
    }
}

fn counted(count: usize, singular: &str, plural: &str) -> String {
    match count {
        1 => format!("1 {singular}"),
        _ => format!("{count} {plural}"),
    }
}

fn stage_bytes(bytes: &[u8]) -> Result<tempfile::NamedTempFile> {
    let mut file = tempfile::Builder::new()
        .prefix("roster_upload_")
        .suffix(".pdf")
        .tempfile()
        .context("failed to create temporary document")?;
    file.write_all(bytes)
        .context("failed to write temporary document")?;
    file.flush().context("failed to flush temporary document")?;
    Ok(file)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "page processing panicked".to_string()
    }
}
