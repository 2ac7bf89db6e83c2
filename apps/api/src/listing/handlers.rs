//! Axum route handlers for the tenant list endpoints.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::Value;
use tokio::time::Instant;

use crate::errors::{require_segment, AppError};
use crate::listing::view_model::{ListViewModel, PageWindow};
use crate::listing::Resource;
use crate::state::AppState;

const MAX_PAGE_SIZE: usize = 100;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// Comma-separated filter chips, all of which must match.
    pub chips: Option<String>,
    pub q: Option<String>,
    pub page: Option<usize>,
    pub page_size: Option<usize>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ListPath {
    pub resource: Resource,
}

/// GET /api/v1/tenants/:tenant_id/:resource
///
/// Fetches the tenant's records and returns one filtered page.
pub async fn handle_list(
    State(state): State<AppState>,
    Path((tenant_id, resource)): Path<(String, Resource)>,
    Query(query): Query<ListQuery>,
) -> Result<Json<PageWindow<Value>>, AppError> {
    require_segment("tenant_id", &tenant_id)?;

    let records = state
        .directory
        .fetch_records(&tenant_id, resource)
        .await?;

    let page_size = query
        .page_size
        .unwrap_or(state.config.default_page_size)
        .clamp(1, MAX_PAGE_SIZE);

    Ok(Json(build_page(records, &query, page_size)))
}

/// Applies a one-shot query to the view-model. The search text has no typing
/// to wait out here, so it is settled straight away.
fn build_page(records: Vec<Value>, query: &ListQuery, page_size: usize) -> PageWindow<Value> {
    let mut view_model = ListViewModel::new(records, page_size, std::time::Duration::ZERO);

    if let Some(chips) = query.chips.as_deref() {
        for chip in chips.split(',') {
            view_model.add_chip(chip);
        }
    }
    if let Some(q) = query.q.as_deref() {
        view_model.set_search_text(q, Instant::now());
    }
    view_model.set_page(query.page.unwrap_or(1));

    view_model.page(Instant::now())
}
