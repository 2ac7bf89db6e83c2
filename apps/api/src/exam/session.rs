//! Session service — the exam flow's view of the assessment backend.
//!
//! `ExamFlow` holds an `Arc<dyn SessionService>` handed to it at construction,
//! so the flow can be driven against a fake in tests.

use std::sync::RwLock;

use async_trait::async_trait;
use tracing::info;

use crate::assessment_client::{AssessmentClient, ProviderError};
use crate::exam::models::{Feedback, Library, SessionProgress, SessionStatus};

#[async_trait]
pub trait SessionService: Send + Sync {
    async fn answer_question(
        &self,
        question_id: &str,
        library_id: &str,
        answer: &str,
    ) -> Result<(), ProviderError>;

    /// Moves to the next library. Returns `false` once every library is exhausted.
    async fn load_next_library(&self) -> Result<bool, ProviderError>;

    async fn end_test(&self) -> Result<(), ProviderError>;

    async fn submit_feedback(&self, feedback: &Feedback) -> Result<(), ProviderError>;

    /// The library the candidate is currently working through.
    fn current_library(&self) -> Option<Library>;

    fn progress(&self) -> SessionProgress;
}

struct SessionCache {
    progress: SessionProgress,
    library: Option<Library>,
}

/// `SessionService` backed by the assessment REST service.
/// Caches the session's progress and current library between calls.
pub struct HttpSessionService {
    client: AssessmentClient,
    token: String,
    cache: RwLock<SessionCache>,
}

impl HttpSessionService {
    /// Fetches the session and, while it is in progress, its current library.
    pub async fn open(client: AssessmentClient, token: String) -> Result<Self, ProviderError> {
        let progress = client.fetch_session(&token).await?;

        let library = if progress.status == SessionStatus::InProgress
            && progress.current_library_index < progress.total_library
        {
            Some(
                client
                    .fetch_library(&token, progress.current_library_index)
                    .await?,
            )
        } else {
            None
        };

        info!(
            "Opened assessment session at library {}/{}",
            progress.current_library_index + 1,
            progress.total_library
        );

        Ok(Self {
            client,
            token,
            cache: RwLock::new(SessionCache { progress, library }),
        })
    }

    fn write_cache(&self, update: impl FnOnce(&mut SessionCache)) {
        let mut cache = self.cache.write().unwrap_or_else(|e| e.into_inner());
        update(&mut cache);
    }
}

#[async_trait]
impl SessionService for HttpSessionService {
    async fn answer_question(
        &self,
        question_id: &str,
        library_id: &str,
        answer: &str,
    ) -> Result<(), ProviderError> {
        self.client
            .submit_answer(&self.token, question_id, library_id, answer)
            .await
    }

    async fn load_next_library(&self) -> Result<bool, ProviderError> {
        let response = self.client.advance(&self.token).await?;
        let loaded = response.library.is_some();

        self.write_cache(|cache| {
            cache.progress.current_library_index = response.current_library_index;
            cache.library = response.library;
        });

        Ok(loaded)
    }

    async fn end_test(&self) -> Result<(), ProviderError> {
        self.client.end_session(&self.token).await?;
        self.write_cache(|cache| {
            cache.progress.status = SessionStatus::Completed;
            cache.library = None;
        });
        Ok(())
    }

    async fn submit_feedback(&self, feedback: &Feedback) -> Result<(), ProviderError> {
        self.client.submit_feedback(&self.token, feedback).await
    }

    fn current_library(&self) -> Option<Library> {
        let cache = self.cache.read().unwrap_or_else(|e| e.into_inner());
        cache.library.clone()
    }

    fn progress(&self) -> SessionProgress {
        let cache = self.cache.read().unwrap_or_else(|e| e.into_inner());
        cache.progress.clone()
    }
}
