use regex::Match;

pub fn fold_char(character: char) -> char {
    match character {
        'ç' | 'Ç' => 'C',
        'ğ' | 'Ğ' => 'G',
        'ı' | 'i' | 'İ' | 'î' | 'Î' => 'I',
        'ö' | 'Ö' => 'O',
        'ş' | 'Ş' => 'S',
        'ü' | 'Ü' | 'û' | 'Û' => 'U',
        'â' | 'Â' => 'A',
        other => {
            let mut upper = other.to_uppercase();
            match (upper.next(), upper.next()) {
                (Some(single), None) => single,
                _ => other,
            }
        }
    }
}

pub fn fold(text: &str) -> String {
    text.chars().map(fold_char).collect()
}

/// Upper-cased, diacritic-folded view of a line that keeps a char-for-char
/// mapping back to the original text, so captures made on the folded form can
/// be returned with their original spelling.
#[derive(Debug, Clone)]
pub struct FoldedLine<'a> {
    original: &'a str,
    folded: String,
    folded_offsets: Vec<usize>,
    original_offsets: Vec<usize>,
}

impl<'a> FoldedLine<'a> {
    pub fn new(original: &'a str) -> Self {
        let mut folded = String::with_capacity(original.len());
        let mut folded_offsets = Vec::with_capacity(original.len() + 1);
        let mut original_offsets = Vec::with_capacity(original.len() + 1);

        for (offset, character) in original.char_indices() {
            folded_offsets.push(folded.len());
            original_offsets.push(offset);
            folded.push(fold_char(character));
        }
        folded_offsets.push(folded.len());
        original_offsets.push(original.len());

        Self {
            original,
            folded,
            folded_offsets,
            original_offsets,
        }
    }

    pub fn original(&self) -> &'a str {
        self.original
    }

    pub fn folded(&self) -> &str {
        &self.folded
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.folded.contains(needle)
    }

    pub fn original_range(&self, start: usize, end: usize) -> &'a str {
        let start = self.map_offset(start);
        let end = self.map_offset(end).max(start);
        &self.original[start..end]
    }

    pub fn original_of(&self, matched: Match<'_>) -> &'a str {
        self.original_range(matched.start(), matched.end())
    }

    pub fn without_marker(&self, marker: &str) -> Option<String> {
        let start = self.folded.find(marker)?;
        let end = start + marker.len();
        let head = self.original_range(0, start);
        let tail = self.original_range(end, self.folded.len());
        Some(format!("{head} {tail}").split_whitespace().collect::<Vec<_>>().join(" "))
    }

    fn map_offset(&self, folded_offset: usize) -> usize {
        match self.folded_offsets.binary_search(&folded_offset) {
            Ok(index) => self.original_offsets[index],
            Err(index) => {
                let clamped = index.min(self.original_offsets.len().saturating_sub(1));
                self.original_offsets[clamped]
            }
        }
    }
}
