pub mod batch;
pub mod extract;
pub mod tools;

use anyhow::Result;
use tracing::info;

use crate::cli::ExtractionOverrides;
use crate::roster::ExtractionConfig;

pub fn resolve_config(overrides: &ExtractionOverrides) -> Result<ExtractionConfig> {
    let mut config = match &overrides.config {
        Some(path) => {
            info!(path = %path.display(), "loading extraction config");
            ExtractionConfig::load(path)?
        }
        None => ExtractionConfig::default(),
    };

    if let Some(value) = overrides.garbled_ratio {
        config.garbled_ratio = value;
    }
    if let Some(value) = overrides.fragmented_ratio {
        config.fragmented_ratio = value;
    }
    if let Some(value) = overrides.school_header_lines {
        config.school_header_lines = value;
    }
    if let Some(value) = overrides.ocr_dpi {
        config.ocr_dpi = value;
    }
    if let Some(value) = &overrides.ocr_lang {
        config.ocr_lang = value.clone();
    }
    if let Some(value) = overrides.ocr_psm {
        config.ocr_psm = value;
    }
    if let Some(value) = overrides.diagnostic_sample_cap {
        config.diagnostic_sample_cap = value;
    }

    config.validate()?;
    Ok(config)
}
