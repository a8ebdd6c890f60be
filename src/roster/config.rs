use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

pub const DEFAULT_GARBLED_RATIO: f64 = 0.15;
pub const DEFAULT_FRAGMENTED_RATIO: f64 = 0.35;
pub const FRAGMENT_LINE_MAX_CHARS: usize = 2;
pub const DEFAULT_SCHOOL_HEADER_LINES: usize = 10;
pub const DEFAULT_OCR_DPI: u32 = 300;
pub const DEFAULT_OCR_LANG: &str = "tur";
pub const DEFAULT_OCR_FALLBACK_LANG: &str = "eng";
pub const DEFAULT_OCR_PSM: u32 = 6;
pub const DEFAULT_DIAGNOSTIC_SAMPLE_CAP: usize = 20;

const DEFAULT_INSTITUTION_HINT_KEYWORDS: &[&str] =
    &["UMRANIYE_ANAOKULU", "UMRANIYE-ANAOKULU", "UMRANIYEANAOKULU"];
const DEFAULT_INSTITUTION_TEXT_MARKERS: &[&str] = &["UMRANIYE ANAOKULU"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    pub garbled_ratio: f64,
    pub fragmented_ratio: f64,
    pub school_header_lines: usize,
    pub ocr_dpi: u32,
    pub ocr_lang: String,
    pub ocr_fallback_lang: String,
    pub ocr_psm: u32,
    pub diagnostic_sample_cap: usize,
    pub institution_hint_keywords: Vec<String>,
    pub institution_text_markers: Vec<String>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            garbled_ratio: DEFAULT_GARBLED_RATIO,
            fragmented_ratio: DEFAULT_FRAGMENTED_RATIO,
            school_header_lines: DEFAULT_SCHOOL_HEADER_LINES,
            ocr_dpi: DEFAULT_OCR_DPI,
            ocr_lang: DEFAULT_OCR_LANG.to_string(),
            ocr_fallback_lang: DEFAULT_OCR_FALLBACK_LANG.to_string(),
            ocr_psm: DEFAULT_OCR_PSM,
            diagnostic_sample_cap: DEFAULT_DIAGNOSTIC_SAMPLE_CAP,
            institution_hint_keywords: DEFAULT_INSTITUTION_HINT_KEYWORDS
                .iter()
                .map(|value| value.to_string())
                .collect(),
            institution_text_markers: DEFAULT_INSTITUTION_TEXT_MARKERS
                .iter()
                .map(|value| value.to_string())
                .collect(),
        }
    }
}

impl ExtractionConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
        let config: ExtractionConfig = serde_json::from_slice(&raw)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.garbled_ratio) {
            bail!("garbled_ratio must be within 0..=1, got {}", self.garbled_ratio);
        }
        if !(0.0..=1.0).contains(&self.fragmented_ratio) {
            bail!(
                "fragmented_ratio must be within 0..=1, got {}",
                self.fragmented_ratio
            );
        }
        if self.ocr_dpi == 0 {
            bail!("ocr_dpi must be positive");
        }
        if self.ocr_lang.trim().is_empty() || self.ocr_fallback_lang.trim().is_empty() {
            bail!("ocr languages must not be empty");
        }
        Ok(())
    }
}
