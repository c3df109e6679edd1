use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use std::sync::Arc;

use super::read_upload_form;
use crate::{
    error::ApiError,
    extractors::ValidatedJson,
    metrics,
    models::{
        ingestion::UploadSummary,
        question_set::{CreateTestRequest, TestMetadata},
    },
    services::{test_assembly_service::TestAssemblyService, AppState},
};

/// POST /admin/tests - Store a test sent as JSON
pub async fn create_test(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<CreateTestRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let service = TestAssemblyService::new(state.questions.clone());
    let question_set = service.create_test(req).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Test saved successfully", "id": question_set.name })),
    ))
}

/// GET /admin/tests - All stored tests
pub async fn list_tests(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let service = TestAssemblyService::new(state.questions.clone());
    Ok(Json(service.list_tests().await?))
}

/// GET /admin/tests/{name}
pub async fn get_test(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let service = TestAssemblyService::new(state.questions.clone());
    Ok(Json(service.get_test(&name).await?))
}

/// POST /admin/tests/upload - Build a test from a question sheet
pub async fn upload_test(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let form = read_upload_form(multipart).await?;
    let service = TestAssemblyService::new(state.questions.clone());

    let result = match TestMetadata::from_form(&form.fields) {
        Ok(metadata) => {
            service
                .upload_test(metadata, &form.file_name, &form.bytes)
                .await
        }
        Err(e) => Err(e),
    };

    match result {
        Ok((_, outcome)) => {
            metrics::record_upload("test", "success");
            Ok(Json(UploadSummary::new(
                "Questions uploaded and saved to database successfully.",
                outcome,
            )))
        }
        Err(e) => {
            metrics::record_upload("test", e.classification());
            Err(e.into())
        }
    }
}
