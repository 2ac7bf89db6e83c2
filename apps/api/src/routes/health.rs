use axum::{extract::State, Json};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    /// Exam flows currently held in memory.
    pub active_exams: usize,
}

/// GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        active_exams: state.exams.len(),
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::exam::fake::{library, mcq, FakeSession};
    use crate::exam::flow::ExamFlow;

    #[tokio::test]
    async fn test_health_reports_live_flow_count() {
        let state = AppState::for_tests();
        let Json(health) = health_handler(State(state.clone())).await;
        assert_eq!(health.status, "ok");
        assert_eq!(health.active_exams, 0);

        let session = FakeSession::new(vec![library("lib-1", vec![mcq("q1", &["a"])])]);
        let flow = ExamFlow::start(session, Duration::from_secs(5)).await.unwrap();
        state.exams.insert(flow);

        let Json(health) = health_handler(State(state)).await;
        assert_eq!(health.active_exams, 1);
    }
}
