use std::path::Path;

use tracing::{debug, warn};

use super::backends::{
    LopdfBackend, PdftohtmlBackend, PdftotextBackend, TesseractOcrBackend, TextBackend,
};
use super::config::ExtractionConfig;
use super::quality::{Usability, assess, is_garbled, out_of_alphabet_ratio};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageText {
    pub text: String,
    pub backend: Option<&'static str>,
    pub ocr_attempted: bool,
    pub ocr_used: bool,
}

impl PageText {
    pub fn lines(&self) -> Vec<&str> {
        self.text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect()
    }
}

pub struct TextExtractionChain {
    text_backends: Vec<Box<dyn TextBackend>>,
    ocr: Option<Box<dyn TextBackend>>,
    garbled_ratio: f64,
    fragmented_ratio: f64,
}

impl TextExtractionChain {
    pub fn new(config: &ExtractionConfig) -> Self {
        let text_backends: Vec<Box<dyn TextBackend>> = vec![
            Box::new(PdftotextBackend::default()),
            Box::new(LopdfBackend),
            Box::new(PdftohtmlBackend::default()),
        ];
        Self::with_backends(
            text_backends,
            Some(Box::new(TesseractOcrBackend::new(config))),
            config,
        )
    }

    pub fn with_backends(
        text_backends: Vec<Box<dyn TextBackend>>,
        ocr: Option<Box<dyn TextBackend>>,
        config: &ExtractionConfig,
    ) -> Self {
        Self {
            text_backends,
            ocr,
            garbled_ratio: config.garbled_ratio,
            fragmented_ratio: config.fragmented_ratio,
        }
    }

    pub fn assess(&self, text: &str) -> Usability {
        assess(text, self.garbled_ratio, self.fragmented_ratio)
    }

    pub fn extract_page(&self, document: &Path, page_index: usize, force_ocr: bool) -> PageText {
        if force_ocr {
            return self.ocr_page(document, page_index);
        }

        let page_number = page_index + 1;
        let mut best: Option<PageText> = None;

        for backend in &self.text_backends {
            if !backend.is_available() {
                debug!(backend = backend.name(), page = page_number, "backend unavailable");
                continue;
            }

            let Some(text) = run_backend(backend.as_ref(), document, page_number) else {
                continue;
            };

            let candidate = PageText {
                text,
                backend: Some(backend.name()),
                ..PageText::default()
            };
            if !is_garbled(&candidate.text, self.garbled_ratio) {
                debug!(backend = backend.name(), page = page_number, "accepted backend output");
                return candidate;
            }

            debug!(
                backend = backend.name(),
                page = page_number,
                foreign_ratio = out_of_alphabet_ratio(&candidate.text),
                "backend output garbled"
            );
            keep_best(&mut best, candidate);
        }

        let ocr = self.ocr_page(document, page_index);
        if ocr.ocr_attempted && !is_garbled(&ocr.text, self.garbled_ratio) {
            return ocr;
        }

        let ocr_attempted = ocr.ocr_attempted;
        keep_best(&mut best, ocr);

        match best {
            Some(mut page) => {
                warn!(
                    page = page_number,
                    backend = page.backend.unwrap_or("none"),
                    "no backend produced clean text, keeping best available"
                );
                page.ocr_attempted = ocr_attempted;
                page
            }
            None => PageText {
                ocr_attempted,
                ..PageText::default()
            },
        }
    }

    fn ocr_page(&self, document: &Path, page_index: usize) -> PageText {
        let page_number = page_index + 1;
        let Some(ocr) = self.ocr.as_ref() else {
            return PageText::default();
        };
        if !ocr.is_available() {
            debug!(backend = ocr.name(), page = page_number, "OCR backend unavailable");
            return PageText::default();
        }
        if !document.exists() {
            warn!(document = %document.display(), "document path missing, skipping OCR");
            return PageText::default();
        }

        let text = run_backend(ocr.as_ref(), document, page_number).unwrap_or_default();
        let ocr_used = !text.trim().is_empty();
        PageText {
            text,
            backend: ocr_used.then(|| ocr.name()),
            ocr_attempted: true,
            ocr_used,
        }
    }
}

fn run_backend(backend: &dyn TextBackend, document: &Path, page_number: usize) -> Option<String> {
    match backend.extract(document, page_number) {
        Ok(text) => Some(text.replace('\u{0000}', "")),
        Err(error) => {
            debug!(
                backend = backend.name(),
                page = page_number,
                error = %error,
                "backend produced no output"
            );
            None
        }
    }
}

fn keep_best(best: &mut Option<PageText>, candidate: PageText) {
    if candidate.text.trim().is_empty() {
        return;
    }

    let replace = match best {
        Some(current) => {
            out_of_alphabet_ratio(&candidate.text) < out_of_alphabet_ratio(&current.text)
        }
        None => true,
    };
    if replace {
        *best = Some(candidate);
    }
}
