use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Exam attempt stored in the "results" collection, keyed by
/// `username + testname`. A later attempt at the same test replaces it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub username: String,
    #[serde(default)]
    pub testname: String,
    #[serde(default)]
    pub test_type: String,
    #[serde(default)]
    pub total_marks: Option<serde_json::Value>,
    #[serde(default)]
    pub percentage: Option<serde_json::Value>,
    #[serde(default)]
    pub malpractice: Option<serde_json::Value>,
    /// Per-question results as sent by the exam client
    #[serde(default)]
    pub details: serde_json::Value,
    #[serde(default)]
    pub screenshot_url: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub year: Option<serde_json::Value>,
    #[serde(default)]
    pub section: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub regno: Option<String>,
    /// Test start time as an ISO string, e.g. `2025-09-23T16:15`
    #[serde(default)]
    pub testdate: Option<String>,
    /// RFC 3339 timestamp; sorts chronologically as text
    pub submitted_at: String,
}

impl Submission {
    pub fn key(&self) -> String {
        format!("{}{}", self.username, self.testname)
    }
}

/// Stored submission with its document key
#[derive(Debug, Serialize, Deserialize)]
pub struct SubmissionEntry {
    pub id: String,
    #[serde(flatten)]
    pub submission: Submission,
}

/// Request body of `POST /submit`
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SubmitExamRequest {
    #[validate(length(min = 1, message = "username is required"))]
    pub username: String,
    #[serde(default)]
    pub testname: String,
    #[serde(default)]
    pub test_type: String,
    #[serde(default)]
    pub results: serde_json::Value,
    #[serde(rename = "totalMarks", default)]
    pub total_marks: Option<serde_json::Value>,
    #[serde(default)]
    pub percentage: Option<serde_json::Value>,
    #[serde(default)]
    pub malpractice: Option<serde_json::Value>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub year: Option<serde_json::Value>,
    #[serde(default)]
    pub section: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "text_or_number")]
    pub regno: Option<String>,
    /// Completed-tests list that replaces the student's stored one
    #[serde(default)]
    pub completed: Vec<String>,
    #[serde(rename = "StartTime", default)]
    pub start_time: Option<String>,
}

impl SubmitExamRequest {
    pub fn into_submission(self, submitted_at: DateTime<Utc>) -> (Submission, Vec<String>) {
        let submission = Submission {
            username: self.username.trim().to_string(),
            testname: self.testname,
            test_type: self.test_type,
            total_marks: self.total_marks,
            percentage: self.percentage,
            malpractice: self.malpractice,
            details: self.results,
            screenshot_url: None,
            department: self.department,
            year: self.year,
            section: self.section,
            name: self.name,
            regno: self.regno,
            testdate: self.start_time,
            submitted_at: submitted_at.to_rfc3339(),
        };
        (submission, self.completed)
    }
}

fn text_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(text)) => Some(text),
        Some(other) => Some(other.to_string()),
    })
}

/// Query params for `GET /results`
#[derive(Debug, Deserialize)]
pub struct RecentResultsQuery {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// Query params for `GET /admin/results`
#[derive(Debug, Deserialize)]
pub struct ResultsByDateQuery {
    /// `YYYY-MM-DD`
    pub date: String,
    #[serde(rename = "testType")]
    pub test_type: String,
}
