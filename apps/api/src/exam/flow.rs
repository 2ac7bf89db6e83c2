//! Exam flow — walks a candidate through the session's libraries one question at a time.
//!
//! Navigation is forward only. Within a library the cursor moves on `advance`;
//! past the last question every local record must be answered before the next
//! library is requested from the session service. When no library remains the
//! test is ended and the client is sent to the feedback step.
//!
//! Failures from the session service never move the flow: they raise a
//! transient notice and the candidate retries by advancing again.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::assessment_client::ProviderError;
use crate::exam::models::{CodeLanguage, Feedback, Library, QuestionKind, SessionStatus};
use crate::exam::notice::{Notice, NoticeKind};
use crate::exam::question_state::{LibraryState, QuestionStateError, PASSAGE_PLACEHOLDER};
use crate::exam::session::SessionService;
use crate::exam::view::{FlowView, NoticeView, QuestionView};

pub const EMPTY_ANSWER_MESSAGE: &str = "Please provide an answer before proceeding.";

#[derive(Debug, Error)]
pub enum FlowError {
    #[error(transparent)]
    Question(#[from] QuestionStateError),

    #[error("Question {0} is not the active question")]
    NotActive(String),

    #[error("No library is available for this session")]
    NoLibrary,

    #[error("The next library is still loading")]
    Busy,

    #[error("The test has already been completed")]
    TestComplete,

    #[error("The test is still in progress")]
    NotComplete,

    #[error("Feedback has already been submitted")]
    FeedbackAlreadySubmitted,

    #[error("Rating must be between 1 and 5, got {0}")]
    InvalidRating(u8),

    #[error("Assessment service error: {0}")]
    Provider(#[from] ProviderError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    OnPassage,
    OnQuestion,
    LoadingNextLibrary,
    TestComplete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvanceOutcome {
    /// The cursor moved to the next question of the same library.
    Moved,
    /// Local validation stopped the candidate; nothing was sent.
    Blocked,
    /// The session service rejected a call; the flow stayed in place.
    Failed,
    /// A new library was installed and the cursor reset.
    LibraryLoaded,
    /// Every library is done and the test has been ended.
    TestComplete,
}

/// Outcome of recording the leading passage of a library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PassageSync {
    NotApplicable,
    Synced,
    Failed { message: String },
}

/// Result of moving the session past its current library. Computed on a
/// spawned task so a dropped request cannot leave the flow half-way.
#[derive(Debug)]
enum NextStep {
    Loaded,
    Ended,
    LoadFailed(ProviderError),
    EndFailed(ProviderError),
}

async fn next_step(service: Arc<dyn SessionService>) -> NextStep {
    match service.load_next_library().await {
        Ok(true) => NextStep::Loaded,
        Ok(false) => match service.end_test().await {
            Ok(()) => NextStep::Ended,
            Err(e) => NextStep::EndFailed(e),
        },
        Err(e) => NextStep::LoadFailed(e),
    }
}

pub struct ExamFlow {
    service: Arc<dyn SessionService>,
    library: Option<LibraryState>,
    /// In-flight library transition. Survives a cancelled `advance` and is
    /// picked up again by the next one instead of asking the service twice.
    pending: Option<JoinHandle<NextStep>>,
    cursor: usize,
    phase: Phase,
    notice: Option<Notice>,
    notice_ttl: Duration,
    passage_sync: PassageSync,
    completed_at: Option<DateTime<Utc>>,
    feedback_submitted: bool,
}

impl ExamFlow {
    /// Builds the flow from the session's current library.
    /// A session that has already completed opens directly in `TestComplete`.
    pub async fn start(
        service: Arc<dyn SessionService>,
        notice_ttl: Duration,
    ) -> Result<Self, FlowError> {
        let mut flow = Self {
            service,
            library: None,
            pending: None,
            cursor: 0,
            phase: Phase::OnQuestion,
            notice: None,
            notice_ttl,
            passage_sync: PassageSync::NotApplicable,
            completed_at: None,
            feedback_submitted: false,
        };

        match flow.service.current_library() {
            Some(library) => flow.install_library(library).await,
            None if flow.service.progress().status == SessionStatus::Completed => {
                flow.phase = Phase::TestComplete;
                flow.completed_at = Some(Utc::now());
            }
            None => return Err(FlowError::NoLibrary),
        }

        Ok(flow)
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn library(&self) -> Option<&LibraryState> {
        self.library.as_ref()
    }

    pub fn passage_sync(&self) -> &PassageSync {
        &self.passage_sync
    }

    /// The notice still on screen, if it has not yet dismissed itself.
    pub fn active_notice(&self) -> Option<&Notice> {
        let now = Instant::now();
        self.notice.as_ref().filter(|n| n.is_visible(now))
    }

    /// Handles the candidate's "Next" action.
    pub async fn advance(&mut self) -> Result<AdvanceOutcome, FlowError> {
        if self.pending.is_some() {
            return self.await_next_step().await;
        }
        self.ensure_in_progress()?;

        let library = self.library.as_ref().ok_or(FlowError::NoLibrary)?;
        let len = library.len();
        let library_id = library.library_id().to_string();
        let unanswered = library.unanswered_count();
        let active = library.get(self.cursor).cloned();

        if self.phase == Phase::OnPassage && len > 1 {
            // already recorded when the library was installed
            self.cursor = 1;
            self.phase = Phase::OnQuestion;
            debug!("Leaving passage of library {library_id}");
            return Ok(AdvanceOutcome::Moved);
        }

        if let Some(question) = active.as_ref() {
            if matches!(question.kind, QuestionKind::Subjective | QuestionKind::Code) {
                let answer = question.submission_text();
                if answer.trim().is_empty() {
                    self.raise(NoticeKind::Validation, EMPTY_ANSWER_MESSAGE);
                    return Ok(AdvanceOutcome::Blocked);
                }

                if question.kind == QuestionKind::Code {
                    // the language stays local; only the code is submitted
                    info!(
                        question_id = %question.id,
                        language = question.code_language.as_str(),
                        "Submitting code answer"
                    );
                }

                if let Err(e) = self
                    .service
                    .answer_question(&question.id, &library_id, answer)
                    .await
                {
                    warn!("Failed to submit answer for question {}: {e}", question.id);
                    self.raise(NoticeKind::Error, format!("Failed to submit answer: {e}"));
                    return Ok(AdvanceOutcome::Failed);
                }
            }
        }

        if self.cursor + 1 < len {
            self.cursor += 1;
            self.phase = Phase::OnQuestion;
            return Ok(AdvanceOutcome::Moved);
        }

        if unanswered > 0 {
            self.raise(
                NoticeKind::Validation,
                format!(
                    "Please answer all questions before proceeding. {unanswered} question(s) unanswered."
                ),
            );
            return Ok(AdvanceOutcome::Blocked);
        }

        self.phase = Phase::LoadingNextLibrary;
        self.pending = Some(tokio::spawn(next_step(self.service.clone())));
        self.await_next_step().await
    }

    /// Selects an option and records it with the session service right away.
    /// The local selection is rolled back if the service rejects it.
    pub async fn select_option(&mut self, question_id: &str, option: &str) -> Result<(), FlowError> {
        self.ensure_in_progress()?;
        self.ensure_active(question_id)?;

        let library = self.library.as_mut().ok_or(FlowError::NoLibrary)?;
        let previous = library.select_option(question_id, option)?;
        let library_id = library.library_id().to_string();
        let selected = library
            .questions()
            .iter()
            .find(|q| q.id == question_id)
            .and_then(|q| q.selected_answer.clone())
            .unwrap_or_default();

        if let Err(e) = self
            .service
            .answer_question(question_id, &library_id, &selected)
            .await
        {
            warn!("Failed to record option {selected} for question {question_id}: {e}");
            if let Some(library) = self.library.as_mut() {
                library.restore_selection(question_id, previous);
            }
            self.raise(NoticeKind::Error, format!("Failed to save your answer: {e}"));
            return Err(FlowError::Provider(e));
        }

        Ok(())
    }

    pub fn edit_subjective(&mut self, question_id: &str, text: String) -> Result<(), FlowError> {
        self.ensure_in_progress()?;
        self.ensure_active(question_id)?;
        let library = self.library.as_mut().ok_or(FlowError::NoLibrary)?;
        Ok(library.edit_subjective(question_id, text)?)
    }

    pub fn edit_code(&mut self, question_id: &str, code: String) -> Result<(), FlowError> {
        self.ensure_in_progress()?;
        self.ensure_active(question_id)?;
        let library = self.library.as_mut().ok_or(FlowError::NoLibrary)?;
        Ok(library.edit_code(question_id, code)?)
    }

    pub fn change_code_language(
        &mut self,
        question_id: &str,
        language: CodeLanguage,
    ) -> Result<(), FlowError> {
        self.ensure_in_progress()?;
        self.ensure_active(question_id)?;
        let library = self.library.as_mut().ok_or(FlowError::NoLibrary)?;
        Ok(library.change_code_language(question_id, language)?)
    }

    /// Forwards the candidate's feedback once the test has ended. Accepted once.
    pub async fn submit_feedback(&mut self, feedback: Feedback) -> Result<(), FlowError> {
        if self.phase != Phase::TestComplete {
            return Err(FlowError::NotComplete);
        }
        if self.feedback_submitted {
            return Err(FlowError::FeedbackAlreadySubmitted);
        }
        if !(1..=5).contains(&feedback.rating) {
            return Err(FlowError::InvalidRating(feedback.rating));
        }

        self.service.submit_feedback(&feedback).await?;
        self.feedback_submitted = true;
        info!("Feedback recorded (rating {})", feedback.rating);
        Ok(())
    }

    pub fn view(&self) -> FlowView {
        let now = Instant::now();
        let progress = self.service.progress();
        let library = self.library.as_ref().filter(|_| self.phase != Phase::TestComplete);

        FlowView {
            phase: self.phase,
            library_number: (progress.current_library_index + 1).min(progress.total_library),
            total_library: progress.total_library,
            library_id: library.map(|l| l.library_id().to_string()),
            library_name: library.and_then(|l| {
                progress
                    .libraries_info
                    .iter()
                    .find(|info| info.library_id == l.library_id())
                    .map(|info| info.name.clone())
            }),
            question_number: library.map(|_| self.cursor + 1),
            question_count: library.map(|l| l.len()).unwrap_or(0),
            answered_count: library.map(|l| l.answered_count()).unwrap_or(0),
            question: library
                .and_then(|l| l.get(self.cursor))
                .map(QuestionView::from_local),
            notice: self.active_notice().map(|n| NoticeView::new(n, now)),
            passage_sync: self.passage_sync.clone(),
            completed_at: self.completed_at,
            feedback_submitted: self.feedback_submitted,
        }
    }

    /// Replaces all local question state with `library` and records its
    /// passage, if it opens with one.
    async fn install_library(&mut self, library: Library) {
        let state = LibraryState::from_library(&library);
        self.cursor = 0;
        self.phase = if state.has_passage() {
            Phase::OnPassage
        } else {
            Phase::OnQuestion
        };
        self.passage_sync = PassageSync::NotApplicable;

        let passage_id = state.passage().map(|p| p.id.clone());
        let library_id = state.library_id().to_string();
        info!(
            "Installed library {library_id} with {} question(s)",
            state.len()
        );
        self.library = Some(state);

        if let Some(passage_id) = passage_id {
            self.passage_sync = match self
                .service
                .answer_question(&passage_id, &library_id, PASSAGE_PLACEHOLDER)
                .await
            {
                Ok(()) => PassageSync::Synced,
                Err(e) => {
                    warn!("Failed to record passage {passage_id} of library {library_id}: {e}");
                    PassageSync::Failed {
                        message: e.to_string(),
                    }
                }
            };
        }
    }

    /// Waits for the pending library transition and applies its result.
    /// The handle is only cleared once the task has finished, so this is
    /// safe to cancel and call again.
    async fn await_next_step(&mut self) -> Result<AdvanceOutcome, FlowError> {
        let Some(handle) = self.pending.as_mut() else {
            return Err(FlowError::NoLibrary);
        };
        let joined = handle.await;
        self.pending = None;

        let library_id = self
            .library
            .as_ref()
            .map(|l| l.library_id().to_string())
            .unwrap_or_default();

        match joined {
            Ok(NextStep::Loaded) => match self.service.current_library() {
                Some(next) => {
                    self.install_library(next).await;
                    Ok(AdvanceOutcome::LibraryLoaded)
                }
                None => {
                    self.restore_phase();
                    self.raise(NoticeKind::Error, "The next section could not be loaded.");
                    Ok(AdvanceOutcome::Failed)
                }
            },
            Ok(NextStep::Ended) => {
                self.phase = Phase::TestComplete;
                self.completed_at = Some(Utc::now());
                self.notice = None;
                info!("Test completed");
                Ok(AdvanceOutcome::TestComplete)
            }
            Ok(NextStep::LoadFailed(e)) => {
                warn!("Failed to load next library after {library_id}: {e}");
                self.restore_phase();
                self.raise(
                    NoticeKind::Error,
                    format!("Failed to load the next section: {e}"),
                );
                Ok(AdvanceOutcome::Failed)
            }
            Ok(NextStep::EndFailed(e)) => {
                warn!("Failed to end test: {e}");
                self.restore_phase();
                self.raise(NoticeKind::Error, format!("Failed to finish the test: {e}"));
                Ok(AdvanceOutcome::Failed)
            }
            Err(e) => {
                warn!("Library transition after {library_id} did not complete: {e}");
                self.restore_phase();
                self.raise(NoticeKind::Error, "The next section could not be loaded.");
                Ok(AdvanceOutcome::Failed)
            }
        }
    }

    fn ensure_in_progress(&self) -> Result<(), FlowError> {
        match self.phase {
            Phase::TestComplete => Err(FlowError::TestComplete),
            Phase::LoadingNextLibrary => Err(FlowError::Busy),
            Phase::OnPassage | Phase::OnQuestion => Ok(()),
        }
    }

    fn ensure_active(&self, question_id: &str) -> Result<(), FlowError> {
        let library = self.library.as_ref().ok_or(FlowError::NoLibrary)?;
        if !library.questions().iter().any(|q| q.id == question_id) {
            return Err(QuestionStateError::UnknownQuestion(question_id.to_string()).into());
        }
        match library.get(self.cursor) {
            Some(active) if active.id == question_id => Ok(()),
            _ => Err(FlowError::NotActive(question_id.to_string())),
        }
    }

    fn restore_phase(&mut self) {
        let on_passage = self.cursor == 0
            && self
                .library
                .as_ref()
                .map(|l| l.has_passage())
                .unwrap_or(false);
        self.phase = if on_passage {
            Phase::OnPassage
        } else {
            Phase::OnQuestion
        };
    }

    fn raise(&mut self, kind: NoticeKind, message: impl Into<String>) {
        self.notice = Some(Notice::new(kind, message, self.notice_ttl));
    }
}
