use tracing::info;

use super::config::ExtractionConfig;
use super::fold::fold;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DocumentVariant {
    #[default]
    Generic,
    Institution,
}

impl DocumentVariant {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Generic => "generic",
            Self::Institution => "institution",
        }
    }

    pub fn dedupes_students_by_id(self) -> bool {
        matches!(self, Self::Institution)
    }
}

pub fn classify_by_hint(source_hint: Option<&str>, config: &ExtractionConfig) -> Option<DocumentVariant> {
    let hint = fold(source_hint?.trim());
    if hint.is_empty() {
        return None;
    }

    let keyword = config
        .institution_hint_keywords
        .iter()
        .find(|keyword| hint.contains(&fold(keyword)))?;
    info!(keyword = %keyword, "source hint selects institution layout");
    Some(DocumentVariant::Institution)
}

pub fn classify_by_text(first_page_text: &str, config: &ExtractionConfig) -> DocumentVariant {
    let folded = fold(first_page_text)
        .split_whitespace()
        .collect::<Vec<&str>>()
        .join(" ");

    match config
        .institution_text_markers
        .iter()
        .find(|marker| folded.contains(&fold(marker)))
    {
        Some(marker) => {
            info!(marker = %marker, "first page text selects institution layout");
            DocumentVariant::Institution
        }
        None => DocumentVariant::Generic,
    }
}

pub fn classify(
    source_hint: Option<&str>,
    first_page_text: &str,
    config: &ExtractionConfig,
) -> DocumentVariant {
    classify_by_hint(source_hint, config)
        .unwrap_or_else(|| classify_by_text(first_page_text, config))
}
