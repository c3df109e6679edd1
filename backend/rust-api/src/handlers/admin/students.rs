use axum::{
    extract::{Multipart, Path, Query, State},
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
        student::{CreateStudentRequest, ListStudentsQuery, UpdateStudentRequest},
    },
    services::{student_directory_service::StudentDirectoryService, AppState},
};

/// POST /admin/students - Add one student
pub async fn create_student(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<CreateStudentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let service = StudentDirectoryService::new(state.students.clone());
    let student = service.create_student(req).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Student added", "username": student.username })),
    ))
}

/// GET /admin/students - First page of students, or those matching a roll number prefix
pub async fn list_students(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListStudentsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let service = StudentDirectoryService::new(state.students.clone());
    let page = service.list_students(query.rollno.as_deref()).await?;
    Ok(Json(page))
}

/// GET /admin/students/all - Every student
pub async fn list_all_students(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let service = StudentDirectoryService::new(state.students.clone());
    Ok(Json(service.list_all().await?))
}

/// GET /admin/students/{username}
pub async fn get_student(
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let service = StudentDirectoryService::new(state.students.clone());
    Ok(Json(service.get_student(&username).await?))
}

/// PUT /admin/students/{username} - Merge the provided fields
pub async fn update_student(
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
    ValidatedJson(req): ValidatedJson<UpdateStudentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let service = StudentDirectoryService::new(state.students.clone());
    service.update_student(&username, req).await?;
    Ok(Json(json!({ "message": "Student updated successfully" })))
}

/// POST /admin/students/upload - Bulk import from CSV or spreadsheet
pub async fn upload_students(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let form = read_upload_form(multipart).await?;
    let service = StudentDirectoryService::new(state.students.clone());

    match service.upload_students(&form.file_name, &form.bytes).await {
        Ok((outcome, stored)) => {
            metrics::record_upload("student", "success");
            let mut message = format!("{} students added successfully", stored);
            let overwritten = outcome.accepted_count.saturating_sub(stored);
            if overwritten > 0 {
                message.push_str(&format!(
                    " ({} duplicate username rows replaced earlier rows)",
                    overwritten
                ));
            }
            Ok(Json(UploadSummary::new(message, outcome)))
        }
        Err(e) => {
            metrics::record_upload("student", e.classification());
            Err(e.into())
        }
    }
}
