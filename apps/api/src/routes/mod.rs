pub mod health;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::exam::handlers as exam;
use crate::listing::handlers as listing;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Exam flow
        .route("/api/v1/exams", post(exam::handle_start))
        .route("/api/v1/exams/:flow_id", get(exam::handle_get_view))
        .route(
            "/api/v1/exams/:flow_id/questions/:question_id/option",
            post(exam::handle_select_option),
        )
        .route(
            "/api/v1/exams/:flow_id/questions/:question_id/subjective",
            put(exam::handle_edit_subjective),
        )
        .route(
            "/api/v1/exams/:flow_id/questions/:question_id/code",
            put(exam::handle_edit_code),
        )
        .route(
            "/api/v1/exams/:flow_id/questions/:question_id/language",
            put(exam::handle_change_language),
        )
        .route("/api/v1/exams/:flow_id/advance", post(exam::handle_advance))
        .route("/api/v1/exams/:flow_id/feedback", post(exam::handle_feedback))
        // Tenant lists
        .route(
            "/api/v1/tenants/:tenant_id/:resource",
            get(listing::handle_list),
        )
        .with_state(state)
}
