use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

use crate::{
    error::ApiError,
    models::submission::ResultsByDateQuery,
    services::{submission_service::SubmissionService, AppState},
};

/// GET /admin/results - Results of one test type taken on a given day
pub async fn results_by_date(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ResultsByDateQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let service = SubmissionService::new(state.results.clone(), state.students.clone());
    let results = service
        .by_type_and_date(&query.test_type, &query.date)
        .await?;
    Ok(Json(results))
}

/// GET /admin/results/{regno} - Results of one student by registration number
pub async fn results_by_regno(
    State(state): State<Arc<AppState>>,
    Path(regno): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let service = SubmissionService::new(state.results.clone(), state.students.clone());
    Ok(Json(service.by_regno(&regno).await?))
}
