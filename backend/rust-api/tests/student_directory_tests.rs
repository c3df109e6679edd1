use axum::http::StatusCode;
use examdesk_api::store::DocumentStore;
use serde_json::json;

mod common;

use common::{create_test_app, get, json_request, send, student_csv, upload_request};

#[tokio::test]
async fn test_upload_students_reports_accepted_and_rejected_rows() {
    let app = create_test_app();
    let bytes = student_csv(&[
        "Asha,21CS001,asha,2004-02-01,asha@x.in,9876543210,CSE,A,CS,2113,3,2004-02-01",
        "Ravi,21CS002,ravi,pw,,,CSE,A,CS,not-a-number,3,",
        "Meena,21CS003,meena,pw,,,CSE,B,CS,2115,3,",
        "Kiran,21CS004,,pw,,,CSE,B,CS,2116,3,",
    ]);

    let (status, body) = send(
        &app.router,
        upload_request("/admin/students/upload", "students.csv", &bytes, &[]),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["acceptedCount"], 2);
    assert_eq!(body["message"], "2 students added successfully");

    let rejected = body["rejected"].as_array().unwrap();
    assert_eq!(rejected.len(), 2);
    assert_eq!(rejected[0]["rowIndex"], 1);
    assert_eq!(rejected[0]["errorType"], "invalid format");
    assert_eq!(rejected[0]["excerpt"], "ravi");
    assert_eq!(rejected[1]["rowIndex"], 3);
    assert_eq!(rejected[1]["errorType"], "empty field");
    assert_eq!(rejected[1]["excerpt"], "N/A");

    assert_eq!(app.students.len().await, 2);
    let asha = app.students.get("asha").await.unwrap().unwrap();
    assert_eq!(asha.get_str("dob").unwrap(), "01-02-2004");
    assert_eq!(asha.get_str("password").unwrap(), "01-02-2004");
}

#[tokio::test]
async fn test_upload_with_duplicate_usernames_reports_replaced_rows() {
    let app = create_test_app();
    let bytes = student_csv(&[
        "Asha,21CS001,asha,pw,,,CSE,A,CS,2113,3,01-02-04",
        "Asha K,21CS001,asha,pw,,,CSE,B,CS,2113,3,01-02-04",
        "Meena,21CS003,meena,pw,,,CSE,B,CS,2115,3,",
    ]);

    let (status, body) = send(
        &app.router,
        upload_request("/admin/students/upload", "students.csv", &bytes, &[]),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["acceptedCount"], 3);
    assert_eq!(
        body["message"],
        "2 students added successfully (1 duplicate username rows replaced earlier rows)"
    );
    assert_eq!(app.students.len().await, 2);

    let asha = app.students.get("asha").await.unwrap().unwrap();
    assert_eq!(asha.get_str("name").unwrap(), "Asha K");
    assert_eq!(asha.get_str("dob").unwrap(), "01-02-2004");
}

#[tokio::test]
async fn test_upload_with_missing_column_writes_nothing() {
    let app = create_test_app();
    let csv = "name,rollno,username,password\nAsha,21CS001,asha,pw\n";

    let (status, body) = send(
        &app.router,
        upload_request("/admin/students/upload", "students.csv", csv.as_bytes(), &[]),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "missing columns");
    let message = body["message"].as_str().unwrap();
    assert!(message.contains("Class"));
    assert!(message.contains("regno"));
    assert!(app.students.is_empty().await);
}

#[tokio::test]
async fn test_upload_text_file_is_rejected_before_parsing() {
    let app = create_test_app();
    let bytes = student_csv(&["Asha,21CS001,asha,pw,,,CSE,A,CS,2113,3,"]);

    let (status, body) = send(
        &app.router,
        upload_request("/admin/students/upload", "students.txt", &bytes, &[]),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "unsupported format");
    assert!(app.students.is_empty().await);
}

#[tokio::test]
async fn test_upload_without_valid_rows_returns_diagnostics() {
    let app = create_test_app();
    let bytes = student_csv(&[",21CS001,asha,pw,,,CSE,A,CS,2113,3,"]);

    let (status, body) = send(
        &app.router,
        upload_request("/admin/students/upload", "students.csv", &bytes, &[]),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "no valid rows");
    assert_eq!(body["rejected"][0]["errorType"], "empty field");
    assert!(app.students.is_empty().await);
}

#[tokio::test]
async fn test_refused_batch_commits_nothing() {
    let app = create_test_app();
    app.students.fail_writes(true);
    let bytes = student_csv(&[
        "Asha,21CS001,asha,pw,,,CSE,A,CS,2113,3,",
        "Ravi,21CS002,ravi,pw,,,CSE,A,CS,2114,3,",
    ]);

    let (status, body) = send(
        &app.router,
        upload_request("/admin/students/upload", "students.csv", &bytes, &[]),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "persistence failure");
    assert!(app.students.is_empty().await);
}

#[tokio::test]
async fn test_reupload_is_idempotent_and_resets_progress() {
    let app = create_test_app();
    let bytes = student_csv(&["Asha,21CS001,asha,pw,,,CSE,A,CS,2113,3,"]);
    let upload = || upload_request("/admin/students/upload", "students.csv", &bytes, &[]);

    let (_, first) = send(&app.router, upload()).await;

    let (status, _) = send(
        &app.router,
        json_request(
            "PUT",
            "/admin/students/asha",
            &json!({ "completed": ["Quiz 1"] }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, second) = send(&app.router, upload()).await;
    assert_eq!(first, second);
    assert_eq!(app.students.len().await, 1);

    let (_, asha) = send(&app.router, get("/admin/students/asha")).await;
    assert_eq!(asha["completed"], json!([]));
}

#[tokio::test]
async fn test_create_list_and_update_students() {
    let app = create_test_app();

    for (name, rollno, username) in [
        ("Asha", "21CS001", "asha"),
        ("Ravi", "21CS002", "ravi"),
        ("Meena", "21EC001", "meena"),
    ] {
        let (status, body) = send(
            &app.router,
            json_request(
                "POST",
                "/admin/students",
                &json!({
                    "name": name,
                    "rollno": rollno,
                    "username": username,
                    "password": "pw",
                    "Class": "II",
                    "Section": "A",
                    "department": "CS",
                    "regno": "100",
                    "Year": 2,
                    "dob": "15/08/2003",
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["message"], "Student added");
    }

    let (status, page) = send(&app.router, get("/admin/students?rollno=21CS")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 2);
    assert_eq!(page["students"].as_array().unwrap().len(), 2);

    let (_, all) = send(&app.router, get("/admin/students/all")).await;
    assert_eq!(all.as_array().unwrap().len(), 3);
    assert!(all[0]["id"].is_string());

    let (status, _) = send(
        &app.router,
        json_request("PUT", "/admin/students/ravi", &json!({ "Section": "C" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, ravi) = send(&app.router, get("/admin/students/ravi")).await;
    assert_eq!(ravi["Section"], "C");
    assert_eq!(ravi["dob"], "15-08-2003");

    let (status, _) = send(
        &app.router,
        json_request("PUT", "/admin/students/ravi", &json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app.router,
        json_request("PUT", "/admin/students/ghost", &json!({ "Section": "C" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], 404);
}

#[tokio::test]
async fn test_create_student_validates_body() {
    let app = create_test_app();

    let (status, body) = send(
        &app.router,
        json_request(
            "POST",
            "/admin/students",
            &json!({
                "name": "",
                "rollno": "21CS001",
                "username": "asha",
                "password": "pw",
                "regno": 1,
                "Year": 1,
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad request");
    assert!(app.students.is_empty().await);
}
