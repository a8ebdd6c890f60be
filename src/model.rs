use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchoolType {
    State,
    Private,
    Kindergarten,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchoolInfo {
    pub province: String,
    pub district: String,
    pub school_name: String,
    #[serde(rename = "type")]
    pub school_type: SchoolType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Teacher {
    pub name: String,
    pub role: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassInfo {
    pub grade: String,
    pub section: String,
    #[serde(rename = "type")]
    pub class_type: String,
    pub teachers: Vec<Teacher>,
}

impl ClassInfo {
    pub fn same_section(&self, other: &ClassInfo) -> bool {
        self.grade == other.grade
            && self.section == other.section
            && self.class_type == other.class_type
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Female,
    Male,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub order_no: u32,
    pub student_id: String,
    pub name: String,
    pub surname: String,
    pub gender: Gender,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenderDistribution {
    pub female: usize,
    pub male: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub total_students: usize,
    pub gender_distribution: GenderDistribution,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassSection {
    pub class_info: ClassInfo,
    pub students: Vec<Student>,
    pub statistics: Statistics,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultData {
    pub total_pages: usize,
    pub processed_at: String,
    pub school_info: Option<SchoolInfo>,
    pub classes: Vec<ClassSection>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    FileProcessError,
    PageProcessError,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEntry {
    pub page: usize,
    pub kind: ErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageTrace {
    pub page: usize,
    pub line_count: usize,
    pub ocr_attempted: bool,
    pub ocr_used: bool,
    pub found_class_header: bool,
    pub students_added: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostics {
    pub class_header_candidates: Vec<String>,
    pub teacher_line_candidates: Vec<String>,
    pub student_regex_hits: usize,
    pub student_regex_misses: usize,
    pub student_regex_miss_samples: Vec<String>,
    pub per_page: Vec<PageTrace>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingResult {
    pub success: bool,
    pub message: String,
    pub data: Option<ResultData>,
    pub errors: Vec<ErrorEntry>,
    pub diagnostics: Diagnostics,
}

impl ProcessingResult {
    pub fn file_failure(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            success: false,
            message: format!("failed to process document: {message}"),
            data: None,
            errors: vec![ErrorEntry {
                page: 0,
                kind: ErrorKind::FileProcessError,
                message,
            }],
            diagnostics: Diagnostics::default(),
        }
    }

    pub fn class_count(&self) -> usize {
        self.data.as_ref().map(|data| data.classes.len()).unwrap_or(0)
    }

    pub fn student_count(&self) -> usize {
        self.data
            .as_ref()
            .map(|data| {
                data.classes
                    .iter()
                    .map(|class| class.statistics.total_students)
                    .sum()
            })
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse {
    pub status: bool,
    pub message: String,
    pub data: Option<ResultData>,
}

impl From<&ProcessingResult> for ApiResponse {
    fn from(result: &ProcessingResult) -> Self {
        Self {
            status: result.success,
            message: result.message.clone(),
            data: if result.success {
                result.data.clone()
            } else {
                None
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchEntry {
    pub filename: String,
    pub sha256: String,
    pub success: bool,
    pub message: String,
    pub class_count: usize,
    pub student_count: usize,
    pub result_path: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchManifest {
    pub manifest_version: u32,
    pub generated_at: String,
    pub source_directory: String,
    pub pdf_count: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub entries: Vec<BatchEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolVersions {
    pub pdftotext: Option<String>,
    pub pdftohtml: Option<String>,
    pub pdftoppm: Option<String>,
    pub tesseract: Option<String>,
    pub tesseract_languages: Vec<String>,
}
