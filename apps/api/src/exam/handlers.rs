use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tokio::sync::OwnedMutexGuard;
use tracing::info;
use uuid::Uuid;

use crate::errors::{require_segment, AppError};
use crate::exam::flow::{AdvanceOutcome, ExamFlow};
use crate::exam::models::{CodeLanguage, Feedback};
use crate::exam::session::HttpSessionService;
use crate::exam::view::FlowView;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct StartExamRequest {
    pub session_token: String,
}

#[derive(Serialize)]
pub struct StartExamResponse {
    pub flow_id: Uuid,
    pub view: FlowView,
}

#[derive(Deserialize)]
pub struct OptionRequest {
    pub option: String,
}

#[derive(Deserialize)]
pub struct SubjectiveRequest {
    pub text: String,
}

#[derive(Deserialize)]
pub struct CodeRequest {
    pub code: String,
}

#[derive(Deserialize)]
pub struct LanguageRequest {
    pub language: CodeLanguage,
}

#[derive(Serialize)]
pub struct AdvanceResponse {
    pub outcome: AdvanceOutcome,
    pub view: FlowView,
    /// Where the client goes once the test is over.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
}

/// Takes the flow's lock without waiting. A flow that is already serving a
/// request answers 409 so double submissions cannot interleave.
fn lock_flow(state: &AppState, flow_id: &Uuid) -> Result<OwnedMutexGuard<ExamFlow>, AppError> {
    let flow = state
        .exams
        .get(flow_id)
        .ok_or_else(|| AppError::NotFound(format!("Exam {flow_id} not found")))?;
    flow.try_lock_owned()
        .map_err(|_| AppError::Conflict("A request for this exam is already in progress".to_string()))
}

/// POST /api/v1/exams
pub async fn handle_start(
    State(state): State<AppState>,
    Json(req): Json<StartExamRequest>,
) -> Result<(StatusCode, Json<StartExamResponse>), AppError> {
    require_segment("session_token", &req.session_token)?;
    let token = req.session_token.trim().to_string();

    let service = HttpSessionService::open(state.assessment.clone(), token).await?;
    let flow = ExamFlow::start(Arc::new(service), state.config.notice_ttl).await?;
    let view = flow.view();
    let flow_id = state.exams.insert(flow);

    info!("Exam flow {flow_id} started ({} active)", state.exams.len());
    Ok((StatusCode::CREATED, Json(StartExamResponse { flow_id, view })))
}

/// GET /api/v1/exams/:flow_id
pub async fn handle_get_view(
    State(state): State<AppState>,
    Path(flow_id): Path<Uuid>,
) -> Result<Json<FlowView>, AppError> {
    let flow = state
        .exams
        .get(&flow_id)
        .ok_or_else(|| AppError::NotFound(format!("Exam {flow_id} not found")))?;
    let flow = flow.lock().await;
    Ok(Json(flow.view()))
}

/// POST /api/v1/exams/:flow_id/questions/:question_id/option
pub async fn handle_select_option(
    State(state): State<AppState>,
    Path((flow_id, question_id)): Path<(Uuid, String)>,
    Json(req): Json<OptionRequest>,
) -> Result<Json<FlowView>, AppError> {
    let mut flow = lock_flow(&state, &flow_id)?;
    flow.select_option(&question_id, &req.option).await?;
    Ok(Json(flow.view()))
}

/// PUT /api/v1/exams/:flow_id/questions/:question_id/subjective
pub async fn handle_edit_subjective(
    State(state): State<AppState>,
    Path((flow_id, question_id)): Path<(Uuid, String)>,
    Json(req): Json<SubjectiveRequest>,
) -> Result<Json<FlowView>, AppError> {
    let mut flow = lock_flow(&state, &flow_id)?;
    flow.edit_subjective(&question_id, req.text)?;
    Ok(Json(flow.view()))
}

/// PUT /api/v1/exams/:flow_id/questions/:question_id/code
pub async fn handle_edit_code(
    State(state): State<AppState>,
    Path((flow_id, question_id)): Path<(Uuid, String)>,
    Json(req): Json<CodeRequest>,
) -> Result<Json<FlowView>, AppError> {
    let mut flow = lock_flow(&state, &flow_id)?;
    flow.edit_code(&question_id, req.code)?;
    Ok(Json(flow.view()))
}

/// PUT /api/v1/exams/:flow_id/questions/:question_id/language
pub async fn handle_change_language(
    State(state): State<AppState>,
    Path((flow_id, question_id)): Path<(Uuid, String)>,
    Json(req): Json<LanguageRequest>,
) -> Result<Json<FlowView>, AppError> {
    let mut flow = lock_flow(&state, &flow_id)?;
    flow.change_code_language(&question_id, req.language)?;
    Ok(Json(flow.view()))
}

/// POST /api/v1/exams/:flow_id/advance
///
/// Blocked and failed advances are not errors: the notice in the view says why.
pub async fn handle_advance(
    State(state): State<AppState>,
    Path(flow_id): Path<Uuid>,
) -> Result<Json<AdvanceResponse>, AppError> {
    let mut flow = lock_flow(&state, &flow_id)?;
    let outcome = flow.advance().await?;
    let redirect = (outcome == AdvanceOutcome::TestComplete).then(|| state.config.feedback_path.clone());

    Ok(Json(AdvanceResponse {
        outcome,
        view: flow.view(),
        redirect,
    }))
}

/// POST /api/v1/exams/:flow_id/feedback
///
/// The flow is discarded once feedback has been accepted.
pub async fn handle_feedback(
    State(state): State<AppState>,
    Path(flow_id): Path<Uuid>,
    Json(feedback): Json<Feedback>,
) -> Result<StatusCode, AppError> {
    let mut flow = lock_flow(&state, &flow_id)?;
    flow.submit_feedback(feedback).await?;
    drop(flow);

    state.exams.remove(&flow_id);
    info!("Exam flow {flow_id} closed after feedback");
    Ok(StatusCode::NO_CONTENT)
}
