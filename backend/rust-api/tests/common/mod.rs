#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use examdesk_api::{
    config::{Config, StorageBackend},
    create_router,
    services::AppState,
    store::MemoryStore,
};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

pub const BOUNDARY: &str = "examdesk-test-boundary";

/// Router over in-memory stores, with handles to inspect or sabotage them
pub struct TestApp {
    pub router: Router,
    pub students: Arc<MemoryStore>,
    pub questions: Arc<MemoryStore>,
    pub results: Arc<MemoryStore>,
}

pub fn create_test_app() -> TestApp {
    create_test_app_with(Config {
        storage_backend: StorageBackend::Memory,
        ..Config::default()
    })
}

pub fn create_test_app_with(config: Config) -> TestApp {
    // Initialize tracing for tests
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();

    let students = Arc::new(MemoryStore::new("students"));
    let questions = Arc::new(MemoryStore::new("questions"));
    let results = Arc::new(MemoryStore::new("results"));

    let app_state = Arc::new(AppState::with_stores(
        config,
        students.clone(),
        questions.clone(),
        results.clone(),
    ));

    TestApp {
        router: create_router(app_state),
        students,
        questions,
        results,
    }
}

/// Sends a request and returns the status with the JSON body (Null if none)
pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Multipart upload with a `file` part and extra text fields
pub fn upload_request(
    uri: &str,
    file_name: &str,
    bytes: &[u8],
    fields: &[(&str, &str)],
) -> Request<Body> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(
        format!(
            "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
            BOUNDARY, file_name
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

pub const STUDENT_HEADER: &str =
    "name,rollno,username,password,email,mobile,Class,Section,department,regno,Year,dob";

pub fn student_csv(rows: &[&str]) -> Vec<u8> {
    let mut text = String::from(STUDENT_HEADER);
    text.push('\n');
    for row in rows {
        text.push_str(row);
        text.push('\n');
    }
    text.into_bytes()
}
