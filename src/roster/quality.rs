use super::config::FRAGMENT_LINE_MAX_CHARS;

const EXTENDED_LATIN_LETTERS: &str = "çÇğĞıİöÖşŞüÜâÂîÎûÛ";
const COMMON_PUNCTUATION: &str = ".,;:!?'\"()[]{}/\\-_–—+*&%#@=<>|`~^$’‘“”…";
const PLACEHOLDER_MARKERS: &[&str] = &["(cid:", "\u{FFFD}", "[?]", "\u{25A1}"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Usability {
    Usable,
    Fragmented,
    Garbled,
    Empty,
}

pub fn is_allowed_char(character: char) -> bool {
    character.is_ascii_alphanumeric()
        || character.is_whitespace()
        || EXTENDED_LATIN_LETTERS.contains(character)
        || COMMON_PUNCTUATION.contains(character)
}

pub fn out_of_alphabet_ratio(text: &str) -> f64 {
    let mut total = 0usize;
    let mut foreign = 0usize;
    for character in text.chars() {
        total += 1;
        if !is_allowed_char(character) {
            foreign += 1;
        }
    }

    if total == 0 {
        return 1.0;
    }
    foreign as f64 / total as f64
}

pub fn has_placeholder_glyphs(text: &str) -> bool {
    PLACEHOLDER_MARKERS.iter().any(|marker| text.contains(marker))
}

pub fn is_garbled(text: &str, max_foreign_ratio: f64) -> bool {
    if text.trim().is_empty() {
        return true;
    }
    if has_placeholder_glyphs(text) {
        return true;
    }
    out_of_alphabet_ratio(text) > max_foreign_ratio
}

pub fn is_fragmented(text: &str, max_short_line_ratio: f64) -> bool {
    let lines = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<&str>>();
    if lines.is_empty() {
        return true;
    }

    let short_lines = lines
        .iter()
        .filter(|line| line.chars().count() <= FRAGMENT_LINE_MAX_CHARS)
        .count();
    short_lines as f64 / lines.len() as f64 > max_short_line_ratio
}

pub fn assess(text: &str, max_foreign_ratio: f64, max_short_line_ratio: f64) -> Usability {
    if text.trim().is_empty() {
        Usability::Empty
    } else if is_garbled(text, max_foreign_ratio) {
        Usability::Garbled
    } else if is_fragmented(text, max_short_line_ratio) {
        Usability::Fragmented
    } else {
        Usability::Usable
    }
}
