/// Assessment Client — the single point of entry for calls to the assessment service.
///
/// Every exam session read and write goes through this module; the exam flow
/// only sees it through `exam::session::SessionService`.
use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, Url};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::exam::models::{Feedback, Library, SessionProgress};

const SESSION_TOKEN_HEADER: &str = "x-session-token";
const MAX_RETRIES: u32 = 3;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid assessment service URL: {0}")]
    InvalidUrl(String),
}

/// Whether a request may be sent again after a transient failure.
/// Advancing and ending a session change server state, so they are sent once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Retry {
    Transient,
    Never,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AnswerRequest<'a> {
    question_id: &'a str,
    library_id: &'a str,
    answer: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvanceResponse {
    pub current_library_index: usize,
    #[serde(default)]
    pub library: Option<Library>,
}

#[derive(Debug, Deserialize)]
struct ServiceError {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// HTTP client for the assessment service.
/// Retries idempotent calls on 429, 5xx and transport errors with exponential
/// backoff (1s, 2s, 4s).
#[derive(Clone)]
pub struct AssessmentClient {
    client: Client,
    base_url: Url,
    retry_base: Duration,
}

impl AssessmentClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ProviderError> {
        let base_url = Url::parse(base_url).map_err(|e| ProviderError::InvalidUrl(e.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(ProviderError::InvalidUrl(base_url.to_string()));
        }
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            base_url,
            retry_base: Duration::from_secs(1),
        })
    }

    pub async fn fetch_session(&self, token: &str) -> Result<SessionProgress, ProviderError> {
        let url = self.session_url(token, &[])?;
        let response = self
            .send(Retry::Transient, || self.client.get(url.clone()), token)
            .await?;
        read_json(response).await
    }

    pub async fn fetch_library(&self, token: &str, index: usize) -> Result<Library, ProviderError> {
        let index = index.to_string();
        let url = self.session_url(token, &["libraries", index.as_str()])?;
        let response = self
            .send(Retry::Transient, || self.client.get(url.clone()), token)
            .await?;
        read_json(response).await
    }

    /// Records an answer. The service overwrites earlier answers for the same
    /// question, so retrying is safe.
    pub async fn submit_answer(
        &self,
        token: &str,
        question_id: &str,
        library_id: &str,
        answer: &str,
    ) -> Result<(), ProviderError> {
        let url = self.session_url(token, &["answers"])?;
        let body = AnswerRequest {
            question_id,
            library_id,
            answer,
        };
        self.send(Retry::Transient, || self.client.post(url.clone()).json(&body), token)
            .await?;
        debug!(question_id, library_id, "Answer recorded");
        Ok(())
    }

    pub async fn advance(&self, token: &str) -> Result<AdvanceResponse, ProviderError> {
        let url = self.session_url(token, &["advance"])?;
        let response = self
            .send(Retry::Never, || self.client.post(url.clone()), token)
            .await?;
        read_json(response).await
    }

    pub async fn end_session(&self, token: &str) -> Result<(), ProviderError> {
        let url = self.session_url(token, &["end"])?;
        self.send(Retry::Never, || self.client.post(url.clone()), token)
            .await?;
        Ok(())
    }

    pub async fn submit_feedback(
        &self,
        token: &str,
        feedback: &Feedback,
    ) -> Result<(), ProviderError> {
        let url = self.session_url(token, &["feedback"])?;
        self.send(Retry::Never, || self.client.post(url.clone()).json(feedback), token)
            .await?;
        Ok(())
    }

    /// `{base}/sessions/{token}/{suffix...}`. Each part is encoded as one path
    /// segment, so a token cannot reach outside its session.
    fn session_url(&self, token: &str, suffix: &[&str]) -> Result<Url, ProviderError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ProviderError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(["sessions", token])
            .extend(suffix);
        Ok(url)
    }

    /// Sends the request built by `build`. Transient failures (429, 5xx,
    /// transport) are retried up to `MAX_RETRIES` times when `retry` allows it.
    async fn send<F>(&self, retry: Retry, build: F, token: &str) -> Result<Response, ProviderError>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut retries = 0;

        loop {
            let error = match build().header(SESSION_TOKEN_HEADER, token).send().await {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) => {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    let error = ProviderError::Api {
                        status: status.as_u16(),
                        message: extract_error_message(&body),
                    };
                    if status.as_u16() != 429 && !status.is_server_error() {
                        return Err(error);
                    }
                    warn!("Assessment service returned {}: {}", status, body);
                    error
                }
                // request URLs carry the session token
                Err(e) => ProviderError::Http(e.without_url()),
            };

            if retry == Retry::Never || retries >= MAX_RETRIES {
                return Err(error);
            }

            retries += 1;
            let delay = backoff_delay(self.retry_base, retries);
            warn!(
                "Assessment call failed ({error}), retry {}/{} in {}ms...",
                retries,
                MAX_RETRIES,
                delay.as_millis()
            );
            tokio::time::sleep(delay).await;
        }
    }
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ProviderError> {
    let body = response
        .text()
        .await
        .map_err(|e| ProviderError::Http(e.without_url()))?;
    Ok(serde_json::from_str(&body)?)
}

/// Exponential backoff: base, 2×base, 4×base, ...
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base * (1u32 << attempt.saturating_sub(1).min(16))
}

/// Pulls a human-readable message out of an error body, falling back to the raw text.
fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<ServiceError>(body)
        .ok()
        .and_then(|e| e.message.or(e.error))
        .unwrap_or_else(|| body.trim().to_string())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use axum::{
        http::StatusCode,
        response::IntoResponse,
        routing::{get, post},
        Json, Router,
    };
    use serde_json::json;

    use super::*;

    #[test]
    fn test_backoff_doubles_each_attempt() {
        let base = Duration::from_secs(1);
        assert_eq!(backoff_delay(base, 1), Duration::from_secs(1));
        assert_eq!(backoff_delay(base, 2), Duration::from_secs(2));
        assert_eq!(backoff_delay(base, 3), Duration::from_secs(4));
    }

    #[test]
    fn test_extract_error_message_prefers_message_field() {
        let body = r#"{"message": "Session expired", "error": "GONE"}"#;
        assert_eq!(extract_error_message(body), "Session expired");
    }

    #[test]
    fn test_extract_error_message_falls_back_to_error_field() {
        let body = r#"{"error": "Invalid token"}"#;
        assert_eq!(extract_error_message(body), "Invalid token");
    }

    #[test]
    fn test_extract_error_message_uses_raw_body_when_not_json() {
        assert_eq!(extract_error_message("  upstream timeout \n"), "upstream timeout");
    }

    #[test]
    fn test_session_url_layout() {
        let client =
            AssessmentClient::new("http://assess.local/", Duration::from_secs(5)).unwrap();
        assert_eq!(
            client.session_url("tok-1", &["answers"]).unwrap().as_str(),
            "http://assess.local/sessions/tok-1/answers"
        );
        assert_eq!(
            client.session_url("tok-1", &[]).unwrap().as_str(),
            "http://assess.local/sessions/tok-1"
        );
    }

    #[test]
    fn test_token_stays_inside_its_session_segment() {
        let client =
            AssessmentClient::new("http://assess.local/v1", Duration::from_secs(5)).unwrap();
        let url = client
            .session_url("../../admin?drop=1#x", &["answers"])
            .unwrap();
        assert!(url.path().starts_with("/v1/sessions/"));
        assert!(url.path().ends_with("/answers"));
        assert_eq!(url.path_segments().unwrap().count(), 4);
        assert!(url.query().is_none());
        assert!(url.fragment().is_none());
    }

    /// Serves `/sessions/:token` from a local listener, answering with
    /// `statuses` in order and 200 with a progress body afterwards.
    async fn scripted_service(statuses: Vec<StatusCode>) -> (AssessmentClient, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let advance_counter = hits.clone();
        let router = Router::new()
            .route(
                "/sessions/:token",
                get(move || {
                    let counter = counter.clone();
                    let statuses = statuses.clone();
                    async move {
                        let n = counter.fetch_add(1, Ordering::SeqCst);
                        match statuses.get(n) {
                            Some(status) => (*status, "try again").into_response(),
                            None => Json(json!({
                                "sessionToken": "tok-1",
                                "status": "IN_PROGRESS",
                                "currentLibraryIndex": 0,
                                "totalLibrary": 2
                            }))
                            .into_response(),
                        }
                    }
                }),
            )
            .route(
                "/sessions/:token/advance",
                post(move || {
                    let counter = advance_counter.clone();
                    async move {
                        counter.fetch_add(1, Ordering::SeqCst);
                        (StatusCode::SERVICE_UNAVAILABLE, "down").into_response()
                    }
                }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        let mut client =
            AssessmentClient::new(&format!("http://{addr}"), Duration::from_secs(5)).unwrap();
        client.retry_base = Duration::from_millis(1);
        (client, hits)
    }

    #[tokio::test]
    async fn test_rate_limited_read_is_retried() {
        let (client, hits) = scripted_service(vec![StatusCode::TOO_MANY_REQUESTS]).await;
        let progress = client.fetch_session("tok-1").await.unwrap();
        assert_eq!(progress.total_library, 2);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_retries_stop_after_three() {
        let (client, hits) = scripted_service(vec![StatusCode::BAD_GATEWAY; 10]).await;
        let err = client.fetch_session("tok-1").await.unwrap_err();
        assert!(matches!(err, ProviderError::Api { status: 502, .. }));
        assert_eq!(hits.load(Ordering::SeqCst), 1 + MAX_RETRIES as usize);
    }

    #[tokio::test]
    async fn test_client_errors_are_not_retried() {
        let (client, hits) = scripted_service(vec![StatusCode::NOT_FOUND]).await;
        let err = client.fetch_session("tok-1").await.unwrap_err();
        assert!(matches!(err, ProviderError::Api { status: 404, .. }));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_advance_is_sent_once_even_when_unavailable() {
        let (client, hits) = scripted_service(vec![]).await;
        let err = client.advance("tok-1").await.unwrap_err();
        assert!(matches!(err, ProviderError::Api { status: 503, .. }));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_advance_response_accepts_null_library() {
        let parsed: AdvanceResponse =
            serde_json::from_str(r#"{"currentLibraryIndex": 2, "library": null}"#).unwrap();
        assert_eq!(parsed.current_library_index, 2);
        assert!(parsed.library.is_none());
    }
}
