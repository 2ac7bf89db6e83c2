//! Local question state — a mutable, per-library copy of the provider's questions.
//!
//! Rebuilt wholesale whenever the session moves to a new library. Answers are
//! pushed to the assessment service eagerly, so nothing here is persisted.

use serde::Serialize;
use thiserror::Error;

use crate::exam::models::{option_identifier, option_index, CodeLanguage, Library, QuestionKind};

/// Answer text recorded for a passage, which has nothing to answer.
pub const PASSAGE_PLACEHOLDER: &str = "PASSAGE_READ";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QuestionStateError {
    #[error("Question {0} is not part of the current library")]
    UnknownQuestion(String),

    #[error("Question {id} is not a {expected} question")]
    WrongKind { id: String, expected: &'static str },

    #[error("Option '{option}' does not exist for question {id}")]
    UnknownOption { id: String, option: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct LocalQuestion {
    pub id: String,
    pub question_text: String,
    pub options: Vec<String>,
    pub kind: QuestionKind,
    pub selected_answer: Option<String>,
    pub subjective_answer: String,
    pub code_answer: String,
    pub code_language: CodeLanguage,
    pub is_answered: bool,
}

impl LocalQuestion {
    /// The text sent to the provider when the candidate moves past this question.
    /// Only the code itself is sent for code questions.
    pub fn submission_text(&self) -> &str {
        match self.kind {
            QuestionKind::Code => &self.code_answer,
            QuestionKind::Mcq => self.selected_answer.as_deref().unwrap_or_default(),
            QuestionKind::Subjective | QuestionKind::Passage => &self.subjective_answer,
        }
    }

    fn expect_kind(&self, kind: QuestionKind, expected: &'static str) -> Result<(), QuestionStateError> {
        if self.kind == kind {
            Ok(())
        } else {
            Err(QuestionStateError::WrongKind {
                id: self.id.clone(),
                expected,
            })
        }
    }
}

#[derive(Debug, Clone)]
pub struct LibraryState {
    library_id: String,
    questions: Vec<LocalQuestion>,
}

impl LibraryState {
    pub fn from_library(library: &Library) -> Self {
        let questions = library
            .questions
            .iter()
            .map(|q| {
                let kind = QuestionKind::from(q.question_type);
                let is_passage = kind == QuestionKind::Passage;
                LocalQuestion {
                    id: q.id.clone(),
                    question_text: q.question_text.clone(),
                    options: q.options.clone(),
                    kind,
                    selected_answer: None,
                    subjective_answer: if is_passage {
                        PASSAGE_PLACEHOLDER.to_string()
                    } else {
                        String::new()
                    },
                    code_answer: String::new(),
                    code_language: CodeLanguage::default(),
                    is_answered: is_passage,
                }
            })
            .collect();

        Self {
            library_id: library.library_id.clone(),
            questions,
        }
    }

    pub fn library_id(&self) -> &str {
        &self.library_id
    }

    pub fn questions(&self) -> &[LocalQuestion] {
        &self.questions
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn get(&self, index: usize) -> Option<&LocalQuestion> {
        self.questions.get(index)
    }

    /// The leading passage, if this library opens with one.
    pub fn passage(&self) -> Option<&LocalQuestion> {
        self.questions
            .first()
            .filter(|q| q.kind == QuestionKind::Passage)
    }

    pub fn has_passage(&self) -> bool {
        self.passage().is_some()
    }

    pub fn answered_count(&self) -> usize {
        self.questions.iter().filter(|q| q.is_answered).count()
    }

    pub fn unanswered_count(&self) -> usize {
        self.questions.len() - self.answered_count()
    }

    /// Selects an option by identifier and returns the previous selection.
    pub fn select_option(
        &mut self,
        id: &str,
        option: &str,
    ) -> Result<Option<String>, QuestionStateError> {
        let question = self.find_mut(id)?;
        question.expect_kind(QuestionKind::Mcq, "multiple-choice")?;

        let index = option_index(option)
            .filter(|&i| i < question.options.len())
            .ok_or_else(|| QuestionStateError::UnknownOption {
                id: id.to_string(),
                option: option.to_string(),
            })?;

        let previous = question.selected_answer.replace(option_identifier(index));
        question.is_answered = true;
        Ok(previous)
    }

    /// Puts back a selection after the provider rejected a newer one.
    pub fn restore_selection(&mut self, id: &str, previous: Option<String>) {
        if let Ok(question) = self.find_mut(id) {
            question.is_answered = previous.is_some();
            question.selected_answer = previous;
        }
    }

    pub fn edit_subjective(&mut self, id: &str, text: String) -> Result<(), QuestionStateError> {
        let question = self.find_mut(id)?;
        question.expect_kind(QuestionKind::Subjective, "subjective")?;
        question.is_answered = !text.trim().is_empty();
        question.subjective_answer = text;
        Ok(())
    }

    pub fn edit_code(&mut self, id: &str, code: String) -> Result<(), QuestionStateError> {
        let question = self.find_mut(id)?;
        question.expect_kind(QuestionKind::Code, "code")?;
        question.is_answered = !code.trim().is_empty();
        question.code_answer = code;
        Ok(())
    }

    pub fn change_code_language(
        &mut self,
        id: &str,
        language: CodeLanguage,
    ) -> Result<(), QuestionStateError> {
        let question = self.find_mut(id)?;
        question.expect_kind(QuestionKind::Code, "code")?;
        question.code_language = language;
        Ok(())
    }

    fn find_mut(&mut self, id: &str) -> Result<&mut LocalQuestion, QuestionStateError> {
        self.questions
            .iter_mut()
            .find(|q| q.id == id)
            .ok_or_else(|| QuestionStateError::UnknownQuestion(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exam::models::{ProviderQuestion, QuestionType};

    fn question(id: &str, question_type: Option<QuestionType>, options: &[&str]) -> ProviderQuestion {
        ProviderQuestion {
            id: id.to_string(),
            question_text: format!("Question {id}"),
            options: options.iter().map(|o| o.to_string()).collect(),
            question_type,
        }
    }

    fn library(questions: Vec<ProviderQuestion>) -> Library {
        Library {
            library_id: "lib-1".to_string(),
            questions,
        }
    }

    #[test]
    fn test_leading_passage_is_answered_on_load() {
        let state = LibraryState::from_library(&library(vec![
            question("p", None, &[]),
            question("q1", Some(QuestionType::Mcq), &["a", "b"]),
        ]));

        let passage = state.passage().expect("passage present");
        assert!(passage.is_answered);
        assert_eq!(passage.subjective_answer, PASSAGE_PLACEHOLDER);
        assert_eq!(state.unanswered_count(), 1);
    }

    #[test]
    fn test_library_without_passage() {
        let state = LibraryState::from_library(&library(vec![question(
            "q1",
            Some(QuestionType::Subjective),
            &[],
        )]));
        assert!(!state.has_passage());
        assert_eq!(state.answered_count(), 0);
    }

    #[test]
    fn test_select_option_marks_answered_and_returns_previous() {
        let mut state = LibraryState::from_library(&library(vec![question(
            "q1",
            Some(QuestionType::Mcq),
            &["a", "b", "c"],
        )]));

        assert_eq!(state.select_option("q1", "B").unwrap(), None);
        assert!(state.get(0).unwrap().is_answered);

        let previous = state.select_option("q1", "c").unwrap();
        assert_eq!(previous.as_deref(), Some("B"));
        assert_eq!(state.get(0).unwrap().selected_answer.as_deref(), Some("C"));
    }

    #[test]
    fn test_select_option_beyond_option_count_is_rejected() {
        let mut state = LibraryState::from_library(&library(vec![question(
            "q1",
            Some(QuestionType::Mcq),
            &["a", "b"],
        )]));

        let err = state.select_option("q1", "C").unwrap_err();
        assert!(matches!(err, QuestionStateError::UnknownOption { .. }));
        assert!(!state.get(0).unwrap().is_answered);
    }

    #[test]
    fn test_select_option_supports_more_than_four_options() {
        let mut state = LibraryState::from_library(&library(vec![question(
            "q1",
            Some(QuestionType::Mcq),
            &["a", "b", "c", "d", "e", "f"],
        )]));
        state.select_option("q1", "F").unwrap();
        assert_eq!(state.get(0).unwrap().selected_answer.as_deref(), Some("F"));
    }

    #[test]
    fn test_restore_selection_reverts_to_unanswered() {
        let mut state = LibraryState::from_library(&library(vec![question(
            "q1",
            Some(QuestionType::Mcq),
            &["a", "b"],
        )]));
        let previous = state.select_option("q1", "A").unwrap();
        state.restore_selection("q1", previous);

        let q = state.get(0).unwrap();
        assert!(q.selected_answer.is_none());
        assert!(!q.is_answered);
    }

    #[test]
    fn test_subjective_whitespace_is_not_an_answer() {
        let mut state = LibraryState::from_library(&library(vec![question(
            "q1",
            Some(QuestionType::Subjective),
            &[],
        )]));

        state.edit_subjective("q1", "   \n".to_string()).unwrap();
        assert!(!state.get(0).unwrap().is_answered);

        state.edit_subjective("q1", "An answer".to_string()).unwrap();
        assert!(state.get(0).unwrap().is_answered);

        // overwriting with empty text is the only way to un-answer
        state.edit_subjective("q1", String::new()).unwrap();
        assert!(!state.get(0).unwrap().is_answered);
    }

    #[test]
    fn test_language_change_does_not_affect_answered() {
        let mut state = LibraryState::from_library(&library(vec![question(
            "q1",
            Some(QuestionType::Code),
            &[],
        )]));

        state.change_code_language("q1", CodeLanguage::Go).unwrap();
        let q = state.get(0).unwrap();
        assert_eq!(q.code_language, CodeLanguage::Go);
        assert!(!q.is_answered);

        state.edit_code("q1", "fn main() {}".to_string()).unwrap();
        assert!(state.get(0).unwrap().is_answered);
        assert_eq!(state.get(0).unwrap().submission_text(), "fn main() {}");
    }

    #[test]
    fn test_wrong_kind_and_unknown_question() {
        let mut state = LibraryState::from_library(&library(vec![
            question("p", None, &[]),
            question("q1", Some(QuestionType::Mcq), &["a"]),
        ]));

        assert!(matches!(
            state.edit_subjective("q1", "text".to_string()),
            Err(QuestionStateError::WrongKind { .. })
        ));
        assert!(matches!(
            state.edit_code("p", "x".to_string()),
            Err(QuestionStateError::WrongKind { .. })
        ));
        assert_eq!(
            state.select_option("missing", "A"),
            Err(QuestionStateError::UnknownQuestion("missing".to_string()))
        );
    }
}
