use std::panic;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::OnceLock;

use anyhow::{Context, Result, bail};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use tracing::debug;

use super::config::ExtractionConfig;
use crate::util::safe_file_stem;

const PDFTOHTML_ROW_TOLERANCE: i64 = 4;

pub trait TextBackend: Send + Sync {
    fn name(&self) -> &'static str;

    fn is_available(&self) -> bool;

    /// Extracts the text of one page; `page_number` is 1-based.
    fn extract(&self, document: &Path, page_number: usize) -> Result<String>;
}

pub fn command_available(program: &str) -> bool {
    Command::new(program).arg("--version").output().is_ok()
}

pub fn command_version_optional(program: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(program).args(args).output().ok()?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let source = if stdout.trim().is_empty() {
        stderr.trim()
    } else {
        stdout.trim()
    };

    source
        .lines()
        .next()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| line.to_string())
}

pub fn tesseract_languages() -> Vec<String> {
    let Ok(output) = Command::new("tesseract").arg("--list-langs").output() else {
        return Vec::new();
    };

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    stdout
        .lines()
        .chain(stderr.lines())
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.contains(' '))
        .map(|line| line.to_string())
        .collect()
}

pub fn count_pages(document: &Path) -> Result<usize> {
    if !document.exists() {
        bail!("document not found: {}", document.display());
    }
    let metadata = std::fs::metadata(document)
        .with_context(|| format!("failed to inspect {}", document.display()))?;
    if metadata.len() == 0 {
        bail!("document is empty: {}", document.display());
    }

    match count_pages_with_lopdf(document) {
        Ok(count) => Ok(count),
        Err(error) => {
            debug!(error = %error, "lopdf page count failed, trying pdfinfo");
            count_pages_with_pdfinfo(document).with_context(|| {
                format!("failed to open document {}: {}", document.display(), error)
            })
        }
    }
}

fn count_pages_with_lopdf(document: &Path) -> Result<usize> {
    let path = document.to_path_buf();
    let outcome = panic::catch_unwind(move || -> Result<usize> {
        let pdf = lopdf::Document::load(&path)
            .with_context(|| format!("lopdf failed to load {}", path.display()))?;
        Ok(pdf.get_pages().len())
    });

    match outcome {
        Ok(result) => result,
        Err(_) => bail!("lopdf panicked while loading {}", document.display()),
    }
}

fn count_pages_with_pdfinfo(document: &Path) -> Result<usize> {
    let output = Command::new("pdfinfo")
        .arg(document)
        .output()
        .with_context(|| format!("failed to execute pdfinfo for {}", document.display()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!(
            "pdfinfo returned non-zero exit status for {}: {}",
            document.display(),
            stderr.trim()
        );
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    stdout
        .lines()
        .find_map(|line| line.strip_prefix("Pages:"))
        .map(str::trim)
        .context("pdfinfo output has no page count")?
        .parse::<usize>()
        .context("pdfinfo page count is not a number")
}

#[derive(Debug, Default)]
pub struct PdftotextBackend {
    available: OnceLock<bool>,
}

impl TextBackend for PdftotextBackend {
    fn name(&self) -> &'static str {
        "pdftotext"
    }

    fn is_available(&self) -> bool {
        *self.available.get_or_init(|| command_available("pdftotext"))
    }

    fn extract(&self, document: &Path, page_number: usize) -> Result<String> {
        let output = Command::new("pdftotext")
            .arg("-enc")
            .arg("UTF-8")
            .arg("-layout")
            .arg("-f")
            .arg(page_number.to_string())
            .arg("-l")
            .arg(page_number.to_string())
            .arg(document)
            .arg("-")
            .output()
            .with_context(|| format!("failed to execute pdftotext for {}", document.display()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "pdftotext returned non-zero exit status for {} page {}: {}",
                document.display(),
                page_number,
                stderr.trim()
            );
        }

        Ok(String::from_utf8_lossy(&output.stdout)
            .replace(['\u{0000}', '\u{000C}'], ""))
    }
}

#[derive(Debug, Default)]
pub struct LopdfBackend;

impl TextBackend for LopdfBackend {
    fn name(&self) -> &'static str {
        "lopdf"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn extract(&self, document: &Path, page_number: usize) -> Result<String> {
        let page = u32::try_from(page_number)
            .with_context(|| format!("page number out of range: {page_number}"))?;
        let path = document.to_path_buf();
        let outcome = panic::catch_unwind(move || -> Result<String> {
            let pdf = lopdf::Document::load(&path)
                .with_context(|| format!("lopdf failed to load {}", path.display()))?;
            pdf.extract_text(&[page])
                .with_context(|| format!("lopdf failed to read page {} of {}", page, path.display()))
        });

        match outcome {
            Ok(result) => result,
            Err(_) => bail!(
                "lopdf panicked while reading page {} of {}",
                page_number,
                document.display()
            ),
        }
    }
}

#[derive(Debug, Default)]
pub struct PdftohtmlBackend {
    available: OnceLock<bool>,
}

impl TextBackend for PdftohtmlBackend {
    fn name(&self) -> &'static str {
        "pdftohtml"
    }

    fn is_available(&self) -> bool {
        *self.available.get_or_init(|| command_available("pdftohtml"))
    }

    fn extract(&self, document: &Path, page_number: usize) -> Result<String> {
        let output = Command::new("pdftohtml")
            .arg("-xml")
            .arg("-i")
            .arg("-q")
            .arg("-stdout")
            .arg("-f")
            .arg(page_number.to_string())
            .arg("-l")
            .arg(page_number.to_string())
            .arg(document)
            .output()
            .with_context(|| format!("failed to execute pdftohtml for {}", document.display()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "pdftohtml returned non-zero exit status for {} page {}: {}",
                document.display(),
                page_number,
                stderr.trim()
            );
        }

        let xml = String::from_utf8_lossy(&output.stdout);
        Ok(rows_from_pdftohtml_xml(&xml))
    }
}

/// Rebuilds visual rows from `<text top=.. left=..>` elements, joining cells
/// whose tops fall within a small tolerance of the row's first cell.
pub fn rows_from_pdftohtml_xml(xml: &str) -> String {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut cells = Vec::<(i64, i64, String)>::new();
    let mut open_cell: Option<(i64, i64, Vec<String>)> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(element)) if element.name().as_ref() == b"text" => {
                open_cell = match (
                    position_attribute(&element, "top"),
                    position_attribute(&element, "left"),
                ) {
                    (Some(top), Some(left)) => Some((top, left, Vec::new())),
                    _ => None,
                };
            }
            Ok(Event::Text(text)) => {
                if let Some((_, _, parts)) = open_cell.as_mut() {
                    let value = text
                        .unescape()
                        .map(|value| value.into_owned())
                        .unwrap_or_else(|_| String::from_utf8_lossy(&text).into_owned());
                    parts.push(value);
                }
            }
            Ok(Event::End(element)) if element.name().as_ref() == b"text" => {
                if let Some((top, left, parts)) = open_cell.take() {
                    let text = parts.join(" ").split_whitespace().collect::<Vec<_>>().join(" ");
                    if !text.is_empty() {
                        cells.push((top, left, text));
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(error) => {
                debug!(
                    position = reader.buffer_position(),
                    error = %error,
                    "pdftohtml xml parsing stopped"
                );
                break;
            }
            _ => {}
        }
    }
    cells.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));

    let mut rows = Vec::<(i64, Vec<(i64, String)>)>::new();
    for (top, left, text) in cells {
        let joins_previous = rows
            .last()
            .is_some_and(|(row_top, _)| top - *row_top <= PDFTOHTML_ROW_TOLERANCE);
        if joins_previous {
            if let Some((_, row_cells)) = rows.last_mut() {
                row_cells.push((left, text));
            }
        } else {
            rows.push((top, vec![(left, text)]));
        }
    }

    rows.into_iter()
        .map(|(_, mut row_cells)| {
            row_cells.sort_by_key(|(left, _)| *left);
            row_cells
                .into_iter()
                .map(|(_, text)| text)
                .collect::<Vec<String>>()
                .join("  ")
        })
        .collect::<Vec<String>>()
        .join("\n")
}

fn position_attribute(element: &BytesStart<'_>, name: &str) -> Option<i64> {
    element
        .try_get_attribute(name)
        .ok()??
        .unescape_value()
        .ok()?
        .trim()
        .parse::<i64>()
        .ok()
}

#[derive(Debug)]
pub struct TesseractOcrBackend {
    dpi: u32,
    lang: String,
    fallback_lang: String,
    psm: u32,
    available: OnceLock<bool>,
    resolved_lang: OnceLock<String>,
}

impl TesseractOcrBackend {
    pub fn new(config: &ExtractionConfig) -> Self {
        Self {
            dpi: config.ocr_dpi,
            lang: config.ocr_lang.clone(),
            fallback_lang: config.ocr_fallback_lang.clone(),
            psm: config.ocr_psm,
            available: OnceLock::new(),
            resolved_lang: OnceLock::new(),
        }
    }

    pub fn language(&self) -> &str {
        self.resolved_lang.get_or_init(|| {
            let installed = tesseract_languages();
            let wanted = self.lang.split('+').all(|lang| installed.iter().any(|value| value == lang));
            if wanted {
                self.lang.clone()
            } else {
                debug!(
                    requested = %self.lang,
                    fallback = %self.fallback_lang,
                    "OCR language pack missing, using fallback"
                );
                self.fallback_lang.clone()
            }
        })
    }

    fn rasterize(&self, document: &Path, page_number: usize, output_root: &Path) -> Result<PathBuf> {
        let output = Command::new("pdftoppm")
            .arg("-r")
            .arg(self.dpi.to_string())
            .arg("-f")
            .arg(page_number.to_string())
            .arg("-l")
            .arg(page_number.to_string())
            .arg("-singlefile")
            .arg("-png")
            .arg(document)
            .arg(output_root)
            .output()
            .with_context(|| format!("failed to execute pdftoppm for {}", document.display()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "pdftoppm returned non-zero exit status for {} page {}: {}",
                document.display(),
                page_number,
                stderr.trim()
            );
        }

        let png_path = PathBuf::from(format!("{}.png", output_root.display()));
        if !png_path.exists() {
            bail!(
                "pdftoppm did not produce expected image for {} page {}",
                document.display(),
                page_number
            );
        }
        Ok(png_path)
    }
}

impl TextBackend for TesseractOcrBackend {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    fn is_available(&self) -> bool {
        *self
            .available
            .get_or_init(|| command_available("pdftoppm") && command_available("tesseract"))
    }

    fn extract(&self, document: &Path, page_number: usize) -> Result<String> {
        if !document.exists() {
            bail!("document not found for OCR: {}", document.display());
        }

        let scratch = tempfile::Builder::new()
            .prefix("roster_ocr_")
            .tempdir()
            .context("failed to create OCR scratch directory")?;
        let output_root = scratch
            .path()
            .join(format!("{}_p{}", safe_file_stem(document), page_number));
        let png_path = self.rasterize(document, page_number, &output_root)?;

        let output = Command::new("tesseract")
            .arg(&png_path)
            .arg("stdout")
            .arg("-l")
            .arg(self.language())
            .arg("--psm")
            .arg(self.psm.to_string())
            .arg("-c")
            .arg("preserve_interword_spaces=1")
            .output()
            .with_context(|| format!("failed to execute tesseract for {}", png_path.display()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "tesseract returned non-zero exit status for {} page {}: {}",
                document.display(),
                page_number,
                stderr.trim()
            );
        }

        Ok(String::from_utf8_lossy(&output.stdout)
            .replace('\u{0000}', "")
            .trim()
            .to_string())
    }
}
