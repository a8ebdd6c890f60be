use anyhow::{Context, Result};
use regex::{Captures, Regex};

use super::fold::FoldedLine;
use crate::model::{ClassInfo, Gender, SchoolType, Student, Teacher};

pub const PROVINCE_MARKER: &str = "VALILIGI";
pub const INSTITUTION_MARKER: &str = "MUDURLUGU";
pub const PRIVATE_SCHOOL_MARKER: &str = "OZEL";
pub const KINDERGARTEN_SCHOOL_MARKER: &str = "ANAOKULU";
pub const TEACHER_ROLE: &str = "Sınıf Öğretmeni";

const NAME_CHARS: &str = "A-ZÇĞİÖŞÜÂÎÛ";
const GENDER_WORDS: &str = "(?i:k[ıiİI]z|erkek)";
const PREP_GRADE: &str = "Hazırlık";
const FTL_DEFAULT_TRACK: &str = "FEN BİLİMLERİ";
const AL_DEFAULT_TRACK: &str = "ANADOLU LİSESİ";
const PRIMARY_TRACK: &str = "İlkokul";
const LANGUAGE_TRACK: &str = "Yabancı Dil Ağırlıklı";
const KINDERGARTEN_LEVEL: &str = "Anaokulu";
const PRESCHOOL_LEVEL: &str = "Anasınıfı";
const KINDERGARTEN_KEYWORDS: &[&str] = &["ANAOKULU", "ANASINIFI", "ANA SINIFI"];
const ROSTER_KEYWORDS: &[&str] = &["LISTE", "SUBE", "SINIF"];
const HEADER_CANDIDATE_KEYWORDS: &[&str] = &["SUBESI", "HAZIRLIK", "ANAOKULU", "ANASINIFI"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderKind {
    PrepTrackFtl,
    PrepTrackAl,
    GradeTrackFtl,
    GradeTrackAl,
    Prep,
    Grade,
    KindergartenAge,
    Preschool,
    KindergartenLoose,
    KeywordFallback,
}

#[derive(Debug, Clone, Copy)]
enum GradeRule {
    Fixed(&'static str),
    Capture(usize),
    KindergartenAge(usize),
    KeywordLevel(usize),
}

#[derive(Debug, Clone, Copy)]
enum TypeRule {
    Fixed(&'static str),
    CaptureOr(usize, &'static str),
    CaptureOrSchoolLevel(usize),
    KeywordLevel(usize),
}

#[derive(Debug, Clone, Copy)]
struct HeaderFields {
    grade: GradeRule,
    section: usize,
    class_type: TypeRule,
}

const HEADER_TABLE: &[(HeaderKind, &str, HeaderFields)] = &[
    (
        HeaderKind::PrepTrackFtl,
        r"\bFTL\s*-\s*HAZIRLIK\s*SINIFI\s*/\s*([A-Z])\s*SUBESI\s*\(([^)]*)\)",
        HeaderFields {
            grade: GradeRule::Fixed(PREP_GRADE),
            section: 1,
            class_type: TypeRule::CaptureOr(2, FTL_DEFAULT_TRACK),
        },
    ),
    (
        HeaderKind::PrepTrackAl,
        r"\bAL\s*-\s*HAZIRLIK\s*SINIFI\s*/\s*([A-Z])\s*SUBESI\s*\(([^)]*)\)",
        HeaderFields {
            grade: GradeRule::Fixed(PREP_GRADE),
            section: 1,
            class_type: TypeRule::CaptureOr(2, AL_DEFAULT_TRACK),
        },
    ),
    (
        HeaderKind::GradeTrackFtl,
        r"\bFTL\s*-\s*(\d+)\.\s*SINIF\s*/\s*([A-Z])\s*SUBESI\s*\(([^)]*)\)",
        HeaderFields {
            grade: GradeRule::Capture(1),
            section: 2,
            class_type: TypeRule::CaptureOr(3, FTL_DEFAULT_TRACK),
        },
    ),
    (
        HeaderKind::GradeTrackAl,
        r"\bAL\s*-\s*(\d+)\.\s*SINIF\s*/\s*([A-Z])\s*SUBESI\s*\(([^)]*)\)",
        HeaderFields {
            grade: GradeRule::Capture(1),
            section: 2,
            class_type: TypeRule::CaptureOr(3, AL_DEFAULT_TRACK),
        },
    ),
    (
        HeaderKind::Prep,
        r"HAZIRLIK\s*SINIFI\s*/\s*([A-Z])\s*SUBESI",
        HeaderFields {
            grade: GradeRule::Fixed(PREP_GRADE),
            section: 1,
            class_type: TypeRule::Fixed(PREP_GRADE),
        },
    ),
    (
        HeaderKind::Grade,
        r"(\d+)\.\s*SINIF\s*(?:\(([^)]*)\))?\s*/\s*([A-Z])\s*SUBESI",
        HeaderFields {
            grade: GradeRule::Capture(1),
            section: 3,
            class_type: TypeRule::CaptureOrSchoolLevel(2),
        },
    ),
    (
        HeaderKind::KindergartenAge,
        r"ANAOKULU\s*(\d+)\s*YAS\s*/\s*([A-Z])\s*SUBESI",
        HeaderFields {
            grade: GradeRule::KindergartenAge(1),
            section: 2,
            class_type: TypeRule::Fixed(KINDERGARTEN_LEVEL),
        },
    ),
    (
        HeaderKind::Preschool,
        r"ANASINIFI\s*/\s*([A-Z])\s*SUBESI",
        HeaderFields {
            grade: GradeRule::Fixed(PRESCHOOL_LEVEL),
            section: 1,
            class_type: TypeRule::Fixed(PRESCHOOL_LEVEL),
        },
    ),
    (
        HeaderKind::KindergartenLoose,
        r"\b(ANAOKULU|ANASINIFI|ANA SINIFI)\b.*\b([A-Z])\b",
        HeaderFields {
            grade: GradeRule::KeywordLevel(1),
            section: 2,
            class_type: TypeRule::KeywordLevel(1),
        },
    ),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderMatch {
    pub kind: HeaderKind,
    pub info: ClassInfo,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchoolField {
    Province(String),
    DistrictAndSchool {
        district: String,
        school_name: String,
        school_type: SchoolType,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowShape {
    OrderIdNameSurnameGender,
    IdNameGenderSurnameOrder,
}

#[derive(Debug)]
struct HeaderVariant {
    kind: HeaderKind,
    regex: Regex,
    fields: HeaderFields,
}

#[derive(Debug)]
pub struct RosterGrammar {
    headers: Vec<HeaderVariant>,
    teacher_regex: Regex,
    student_shapes: Vec<(RowShape, Regex)>,
    row_like_regex: Regex,
}

impl RosterGrammar {
    pub fn new() -> Result<Self> {
        let headers = HEADER_TABLE
            .iter()
            .map(|(kind, pattern, fields)| -> Result<HeaderVariant> {
                Ok(HeaderVariant {
                    kind: *kind,
                    regex: Regex::new(pattern)
                        .with_context(|| format!("failed to compile {kind:?} header regex"))?,
                    fields: *fields,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let single_name = format!(r"[{NAME_CHARS}]+(?:['’-][{NAME_CHARS}]+)*");
        let names = format!(r"{single_name}(?:\s+{single_name})*");
        let order_first = Regex::new(&format!(
            r"^\s*(?P<order>\d+)\s+(?P<id>\d+)\s+(?P<name>{names})\s+(?P<surname>{single_name})\s+(?P<gender>{GENDER_WORDS})\b"
        ))
        .context("failed to compile order-first student regex")?;
        let id_first = Regex::new(&format!(
            r"^\s*(?P<id>\d+)\s+(?P<name>{names})\s+(?P<gender>{GENDER_WORDS})\s+(?P<surname>{names})\s+(?P<order>\d+)\b"
        ))
        .context("failed to compile id-first student regex")?;

        Ok(Self {
            headers,
            teacher_regex: Regex::new(r"SINIF\s+OGRETMENI\s*:\s*(.*)$")
                .context("failed to compile teacher regex")?,
            student_shapes: vec![
                (RowShape::OrderIdNameSurnameGender, order_first),
                (RowShape::IdNameGenderSurnameOrder, id_first),
            ],
            row_like_regex: Regex::new(r"^\s*\d{1,6}\s+\S")
                .context("failed to compile row-like regex")?,
        })
    }

    pub fn match_school_field(&self, line: &FoldedLine<'_>) -> Option<SchoolField> {
        if line.contains(PROVINCE_MARKER) {
            let province = line.without_marker(PROVINCE_MARKER)?;
            return (!province.is_empty()).then_some(SchoolField::Province(province));
        }

        if !line.contains(INSTITUTION_MARKER) {
            return None;
        }
        let (district, raw_school) = line.original().split_once('/')?;
        let district = district.trim().to_string();
        let raw_school = FoldedLine::new(raw_school.trim());
        let school_name = raw_school
            .without_marker(INSTITUTION_MARKER)
            .unwrap_or_else(|| raw_school.original().to_string());
        if district.is_empty() || school_name.is_empty() {
            return None;
        }

        let folded_name = FoldedLine::new(&school_name);
        let school_type = if folded_name.folded().starts_with(PRIVATE_SCHOOL_MARKER) {
            SchoolType::Private
        } else if folded_name.contains(KINDERGARTEN_SCHOOL_MARKER) {
            SchoolType::Kindergarten
        } else {
            SchoolType::State
        };

        Some(SchoolField::DistrictAndSchool {
            district,
            school_name,
            school_type,
        })
    }

    pub fn is_header_candidate(&self, line: &FoldedLine<'_>) -> bool {
        HEADER_CANDIDATE_KEYWORDS
            .iter()
            .any(|keyword| line.contains(keyword))
            || (line.contains("SINIF") && line.contains("LISTE"))
    }

    pub fn match_header(&self, line: &FoldedLine<'_>) -> Option<HeaderMatch> {
        self.headers.iter().find_map(|variant| variant.apply(line))
    }

    #[cfg(test)]
    pub fn match_header_as(&self, kind: HeaderKind, line: &FoldedLine<'_>) -> Option<HeaderMatch> {
        self.headers
            .iter()
            .filter(|variant| variant.kind == kind)
            .find_map(|variant| variant.apply(line))
    }

    pub fn fallback_header(&self, line: &FoldedLine<'_>) -> Option<HeaderMatch> {
        let level = kindergarten_level(line)?;
        let mentions_roster = ROSTER_KEYWORDS.iter().any(|keyword| {
            line.folded()
                .split(|character: char| !character.is_alphanumeric())
                .any(|word| word.starts_with(keyword))
        });
        if !mentions_roster {
            return None;
        }

        Some(HeaderMatch {
            kind: HeaderKind::KeywordFallback,
            info: ClassInfo {
                grade: level.to_string(),
                section: "A".to_string(),
                class_type: level.to_string(),
                teachers: Vec::new(),
            },
        })
    }

    pub fn is_teacher_candidate(&self, line: &FoldedLine<'_>) -> bool {
        line.contains("OGRETMEN")
    }

    /// Returns `Some(None)` for a teacher line whose name is not an all-caps run.
    pub fn match_teacher(&self, line: &FoldedLine<'_>) -> Option<Option<Teacher>> {
        let captures = self.teacher_regex.captures(line.folded())?;
        let raw = line.original_of(captures.get(1)?);
        let name = raw
            .split_whitespace()
            .take_while(|word| is_all_caps_word(word))
            .collect::<Vec<&str>>()
            .join(" ");

        if name.is_empty() {
            return Some(None);
        }
        Some(Some(Teacher {
            name,
            role: TEACHER_ROLE.to_string(),
        }))
    }

    pub fn match_student(&self, line: &str) -> Option<(RowShape, Student)> {
        let cleaned = line.replace('|', " ");
        self.student_shapes.iter().find_map(|(shape, regex)| {
            let captures = regex.captures(&cleaned)?;
            let order_no = captures.name("order")?.as_str().parse::<u32>().ok()?;
            if order_no == 0 {
                return None;
            }
            Some((
                *shape,
                Student {
                    order_no,
                    student_id: captures.name("id")?.as_str().to_string(),
                    name: join_words(captures.name("name")?.as_str()),
                    surname: join_words(captures.name("surname")?.as_str()),
                    gender: gender_from_word(captures.name("gender")?.as_str()),
                },
            ))
        })
    }

    pub fn looks_like_student_row(&self, line: &str) -> bool {
        self.row_like_regex.is_match(line)
    }
}

impl HeaderVariant {
    fn apply(&self, line: &FoldedLine<'_>) -> Option<HeaderMatch> {
        let captures = self.regex.captures(line.folded())?;
        let info = self.fields.resolve(line, &captures)?;
        Some(HeaderMatch {
            kind: self.kind,
            info,
        })
    }
}

impl HeaderFields {
    fn resolve(&self, line: &FoldedLine<'_>, captures: &Captures<'_>) -> Option<ClassInfo> {
        let capture = |index: usize| -> Option<String> {
            let matched = captures.get(index)?;
            let value = line.original_of(matched).trim().to_string();
            (!value.is_empty()).then_some(value)
        };
        let keyword_level = |index: usize| -> Option<&'static str> {
            Some(level_for_keyword(captures.get(index)?.as_str()))
        };

        let grade = match self.grade {
            GradeRule::Fixed(value) => value.to_string(),
            GradeRule::Capture(index) => capture(index)?,
            GradeRule::KindergartenAge(index) => {
                format!("{KINDERGARTEN_LEVEL} {} Yaş", capture(index)?)
            }
            GradeRule::KeywordLevel(index) => keyword_level(index)?.to_string(),
        };
        let section = capture(self.section)?.to_uppercase();
        let class_type = match self.class_type {
            TypeRule::Fixed(value) => value.to_string(),
            TypeRule::CaptureOr(index, default) => {
                capture(index).unwrap_or_else(|| default.to_string())
            }
            TypeRule::CaptureOrSchoolLevel(index) => capture(index).unwrap_or_else(|| {
                if line.contains("ILKOKULU") {
                    PRIMARY_TRACK.to_string()
                } else {
                    LANGUAGE_TRACK.to_string()
                }
            }),
            TypeRule::KeywordLevel(index) => keyword_level(index)?.to_string(),
        };

        Some(ClassInfo {
            grade,
            section,
            class_type,
            teachers: Vec::new(),
        })
    }
}

fn level_for_keyword(folded_keyword: &str) -> &'static str {
    if folded_keyword == "ANAOKULU" {
        KINDERGARTEN_LEVEL
    } else {
        PRESCHOOL_LEVEL
    }
}

fn kindergarten_level(line: &FoldedLine<'_>) -> Option<&'static str> {
    KINDERGARTEN_KEYWORDS
        .iter()
        .find(|keyword| line.contains(keyword))
        .map(|keyword| level_for_keyword(keyword))
}

/// Hyphenated and apostrophised names count when every part is capitalised.
fn is_all_caps_word(word: &str) -> bool {
    word.split(['-', '\'', '’']).all(|part| {
        !part.is_empty()
            && part
                .chars()
                .all(|character| character.is_alphabetic() && !character.is_lowercase())
    })
}

fn join_words(value: &str) -> String {
    value.split_whitespace().collect::<Vec<&str>>().join(" ")
}

pub fn gender_from_word(word: &str) -> Gender {
    if word.starts_with(['K', 'k']) {
        Gender::Female
    } else {
        Gender::Male
    }
}
