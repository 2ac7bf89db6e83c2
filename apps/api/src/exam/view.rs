//! Serializable views of the exam flow, one per question kind.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::Instant;

use crate::exam::flow::{PassageSync, Phase};
use crate::exam::models::{option_identifier, CodeLanguage, QuestionKind};
use crate::exam::notice::{Notice, NoticeKind};
use crate::exam::question_state::LocalQuestion;

#[derive(Debug, Clone, Serialize)]
pub struct FlowView {
    pub phase: Phase,
    /// 1-based position of the current library.
    pub library_number: usize,
    pub total_library: usize,
    pub library_id: Option<String>,
    /// Display name from the session's library summary, when provided.
    pub library_name: Option<String>,
    /// 1-based position of the active question.
    pub question_number: Option<usize>,
    pub question_count: usize,
    pub answered_count: usize,
    pub question: Option<QuestionView>,
    pub notice: Option<NoticeView>,
    pub passage_sync: PassageSync,
    pub completed_at: Option<DateTime<Utc>>,
    pub feedback_submitted: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct OptionView {
    pub id: String,
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuestionView {
    pub id: String,
    pub kind: QuestionKind,
    pub question_text: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<OptionView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_answer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subjective_answer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_answer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_language: Option<CodeLanguage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub available_languages: Vec<CodeLanguage>,
    pub is_answered: bool,
}

impl QuestionView {
    pub fn from_local(question: &LocalQuestion) -> Self {
        let options = question
            .options
            .iter()
            .enumerate()
            .map(|(i, text)| OptionView {
                id: option_identifier(i),
                text: text.clone(),
            })
            .collect();

        let is_code = question.kind == QuestionKind::Code;

        Self {
            id: question.id.clone(),
            kind: question.kind,
            question_text: question.question_text.clone(),
            options,
            selected_answer: question.selected_answer.clone(),
            subjective_answer: (question.kind == QuestionKind::Subjective)
                .then(|| question.subjective_answer.clone()),
            code_answer: is_code.then(|| question.code_answer.clone()),
            code_language: is_code.then_some(question.code_language),
            available_languages: if is_code {
                CodeLanguage::ALL.to_vec()
            } else {
                Vec::new()
            },
            is_answered: question.is_answered,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NoticeView {
    pub kind: NoticeKind,
    pub message: String,
    pub raised_at: DateTime<Utc>,
    pub expires_in_ms: u64,
}

impl NoticeView {
    pub fn new(notice: &Notice, now: Instant) -> Self {
        Self {
            kind: notice.kind,
            message: notice.message.clone(),
            raised_at: notice.raised_at_utc,
            expires_in_ms: notice.remaining(now).as_millis() as u64,
        }
    }
}
