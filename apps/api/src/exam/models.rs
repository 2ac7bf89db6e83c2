use serde::{Deserialize, Serialize};

/// Question type as sent by the assessment service. A passage arrives with
/// `type: null`, so it has no variant here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestionType {
    Mcq,
    Subjective,
    Code,
}

/// Local classification of a question, passage included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    Passage,
    Mcq,
    Subjective,
    Code,
}

impl From<Option<QuestionType>> for QuestionKind {
    fn from(question_type: Option<QuestionType>) -> Self {
        match question_type {
            None => QuestionKind::Passage,
            Some(QuestionType::Mcq) => QuestionKind::Mcq,
            Some(QuestionType::Subjective) => QuestionKind::Subjective,
            Some(QuestionType::Code) => QuestionKind::Code,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderQuestion {
    pub id: String,
    pub question_text: String,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(rename = "type", default)]
    pub question_type: Option<QuestionType>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Library {
    pub library_id: String,
    #[serde(default)]
    pub questions: Vec<ProviderQuestion>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryInfo {
    pub library_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub question_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    InProgress,
    Completed,
}

/// Read-only progress of a session, owned by the assessment service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionProgress {
    pub session_token: String,
    pub status: SessionStatus,
    pub current_library_index: usize,
    pub total_library: usize,
    #[serde(default, rename = "librariesinfo", alias = "librariesInfo")]
    pub libraries_info: Vec<LibraryInfo>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodeLanguage {
    #[default]
    Javascript,
    Python,
    Java,
    Cpp,
    C,
    Go,
    Rust,
}

impl CodeLanguage {
    pub const ALL: [CodeLanguage; 7] = [
        CodeLanguage::Javascript,
        CodeLanguage::Python,
        CodeLanguage::Java,
        CodeLanguage::Cpp,
        CodeLanguage::C,
        CodeLanguage::Go,
        CodeLanguage::Rust,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CodeLanguage::Javascript => "javascript",
            CodeLanguage::Python => "python",
            CodeLanguage::Java => "java",
            CodeLanguage::Cpp => "cpp",
            CodeLanguage::C => "c",
            CodeLanguage::Go => "go",
            CodeLanguage::Rust => "rust",
        }
    }
}

/// Candidate feedback collected after the test ends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feedback {
    pub rating: u8,
    #[serde(default)]
    pub comments: Option<String>,
}

/// Maps a zero-based option index to its identifier: `A`..`Z`, then `AA`, `AB`, ...
pub fn option_identifier(index: usize) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        n -= 1;
        letters.push(b'A' + (n % 26) as u8);
        n /= 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// Inverse of [`option_identifier`]. Accepts lowercase input.
pub fn option_index(identifier: &str) -> Option<usize> {
    let identifier = identifier.trim();
    if identifier.is_empty() {
        return None;
    }
    let mut acc: usize = 0;
    for c in identifier.chars() {
        let c = c.to_ascii_uppercase();
        if !c.is_ascii_uppercase() {
            return None;
        }
        let digit = (c as u8 - b'A') as usize + 1;
        acc = acc.checked_mul(26)?.checked_add(digit)?;
    }
    Some(acc - 1)
}
