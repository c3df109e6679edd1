use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of a per-row validation failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RowErrorKind {
    #[serde(rename = "empty field")]
    EmptyField,
    #[serde(rename = "invalid format")]
    InvalidFormat,
    #[serde(rename = "out of range")]
    OutOfRange,
}

impl RowErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RowErrorKind::EmptyField => "empty field",
            RowErrorKind::InvalidFormat => "invalid format",
            RowErrorKind::OutOfRange => "out of range",
        }
    }
}

impl fmt::Display for RowErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why the validator refused a single row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowRejection {
    pub kind: RowErrorKind,
    pub message: String,
}

impl RowRejection {
    pub fn new(kind: RowErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Diagnostic entry for a rejected row, as returned to the uploader
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectedRow {
    /// Zero-based data row position in the uploaded file
    pub row_index: usize,
    /// Identifying text of the row, at most 100 characters
    pub excerpt: String,
    pub error_type: RowErrorKind,
    pub error_message: String,
}

/// Accepted/rejected partition of one upload
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestionOutcome {
    pub accepted_count: usize,
    pub rejected: Vec<RejectedRow>,
}

/// Response body of a successful upload
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSummary {
    pub message: String,
    pub accepted_count: usize,
    pub rejected: Vec<RejectedRow>,
}

impl UploadSummary {
    pub fn new(message: impl Into<String>, outcome: IngestionOutcome) -> Self {
        Self {
            message: message.into(),
            accepted_count: outcome.accepted_count,
            rejected: outcome.rejected,
        }
    }
}
