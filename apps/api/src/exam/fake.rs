//! In-memory `SessionService` used by the exam tests.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::assessment_client::ProviderError;
use crate::exam::models::{
    Feedback, Library, ProviderQuestion, QuestionType, SessionProgress, SessionStatus,
};
use crate::exam::session::SessionService;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Answer {
        question_id: String,
        library_id: String,
        answer: String,
    },
    LoadNext,
    EndTest,
    Feedback(u8),
}

#[derive(Default)]
struct FakeState {
    index: usize,
    calls: Vec<Call>,
    fail_answers: bool,
    fail_load: bool,
    fail_end: bool,
    ended: bool,
    load_delay: Option<Duration>,
}

pub struct FakeSession {
    libraries: Vec<Library>,
    state: Mutex<FakeState>,
}

impl FakeSession {
    pub fn new(libraries: Vec<Library>) -> Arc<Self> {
        Arc::new(Self {
            libraries,
            state: Mutex::new(FakeState::default()),
        })
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn answers(&self) -> Vec<(String, String, String)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Answer {
                    question_id,
                    library_id,
                    answer,
                } => Some((question_id, library_id, answer)),
                _ => None,
            })
            .collect()
    }

    pub fn fail_answers(&self, fail: bool) {
        self.state.lock().unwrap().fail_answers = fail;
    }

    pub fn fail_load(&self, fail: bool) {
        self.state.lock().unwrap().fail_load = fail;
    }

    /// Makes `load_next_library` take `delay` before answering.
    pub fn delay_load(&self, delay: Duration) {
        self.state.lock().unwrap().load_delay = Some(delay);
    }

    pub fn fail_end(&self, fail: bool) {
        self.state.lock().unwrap().fail_end = fail;
    }
}

fn unavailable() -> ProviderError {
    ProviderError::Api {
        status: 503,
        message: "service unavailable".to_string(),
    }
}

#[async_trait]
impl SessionService for FakeSession {
    async fn answer_question(
        &self,
        question_id: &str,
        library_id: &str,
        answer: &str,
    ) -> Result<(), ProviderError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Answer {
            question_id: question_id.to_string(),
            library_id: library_id.to_string(),
            answer: answer.to_string(),
        });
        if state.fail_answers {
            return Err(unavailable());
        }
        Ok(())
    }

    async fn load_next_library(&self) -> Result<bool, ProviderError> {
        let delay = {
            let mut state = self.state.lock().unwrap();
            state.calls.push(Call::LoadNext);
            state.load_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock().unwrap();
        if state.fail_load {
            return Err(unavailable());
        }
        if state.index + 1 < self.libraries.len() {
            state.index += 1;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn end_test(&self) -> Result<(), ProviderError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::EndTest);
        if state.fail_end {
            return Err(unavailable());
        }
        state.ended = true;
        Ok(())
    }

    async fn submit_feedback(&self, feedback: &Feedback) -> Result<(), ProviderError> {
        self.state
            .lock()
            .unwrap()
            .calls
            .push(Call::Feedback(feedback.rating));
        Ok(())
    }

    fn current_library(&self) -> Option<Library> {
        let state = self.state.lock().unwrap();
        if state.ended {
            return None;
        }
        self.libraries.get(state.index).cloned()
    }

    fn progress(&self) -> SessionProgress {
        let state = self.state.lock().unwrap();
        SessionProgress {
            session_token: "fake-token".to_string(),
            status: if state.ended {
                SessionStatus::Completed
            } else {
                SessionStatus::InProgress
            },
            current_library_index: state.index,
            total_library: self.libraries.len(),
            libraries_info: vec![],
        }
    }
}

pub fn passage(id: &str) -> ProviderQuestion {
    ProviderQuestion {
        id: id.to_string(),
        question_text: "Read the following passage.".to_string(),
        options: vec![],
        question_type: None,
    }
}

pub fn mcq(id: &str, options: &[&str]) -> ProviderQuestion {
    ProviderQuestion {
        id: id.to_string(),
        question_text: format!("Choose for {id}"),
        options: options.iter().map(|o| o.to_string()).collect(),
        question_type: Some(QuestionType::Mcq),
    }
}

pub fn subjective(id: &str) -> ProviderQuestion {
    ProviderQuestion {
        id: id.to_string(),
        question_text: format!("Explain {id}"),
        options: vec![],
        question_type: Some(QuestionType::Subjective),
    }
}

pub fn code(id: &str) -> ProviderQuestion {
    ProviderQuestion {
        id: id.to_string(),
        question_text: format!("Implement {id}"),
        options: vec![],
        question_type: Some(QuestionType::Code),
    }
}

pub fn library(id: &str, questions: Vec<ProviderQuestion>) -> Library {
    Library {
        library_id: id.to_string(),
        questions,
    }
}
