use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde_json::json;
use std::sync::Arc;

use crate::{
    error::ApiError,
    extractors::ValidatedJson,
    models::submission::{RecentResultsQuery, SubmitExamRequest},
    services::{submission_service::SubmissionService, AppState},
};

/// POST /submit - Store an exam attempt
pub async fn submit_exam(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<SubmitExamRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let service = SubmissionService::new(state.results.clone(), state.students.clone());
    let submission = service.submit(req).await?;
    Ok(Json(json!({
        "message": format!("Result saved for {}", submission.username)
    })))
}

/// GET /results - Most recent submissions
pub async fn recent_results(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RecentResultsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let service = SubmissionService::new(state.results.clone(), state.students.clone());
    let results = service.recent(query.limit, query.offset).await?;
    Ok(Json(json!({
        "total": results.len(),
        "limit": query.limit.unwrap_or(100),
        "offset": query.offset.unwrap_or(0),
        "results": results,
    })))
}

/// GET /results/{username} - Submissions of one student, newest first
pub async fn results_by_username(
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let service = SubmissionService::new(state.results.clone(), state.students.clone());
    let results = service.by_username(&username).await?;
    Ok(Json(json!({
        "username": username,
        "total": results.len(),
        "results": results,
    })))
}
