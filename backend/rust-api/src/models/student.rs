use serde::{Deserialize, Serialize};
use validator::Validate;

use super::lenient_int;

/// Student document stored in the "students" collection, keyed by `username`.
///
/// Field names keep the layout the admin frontend already reads
/// (`rollno`, `Class`, `Section`, `regno`, `Year`, `dob`, `completed`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub name: String,
    pub rollno: String,
    pub username: String,
    /// Plain credential used by the student login; often the date of birth.
    pub password: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub mobile: String,
    #[serde(rename = "Class", default)]
    pub class: String,
    #[serde(rename = "Section", default)]
    pub section: String,
    #[serde(default)]
    pub department: String,
    #[serde(deserialize_with = "lenient_int::deserialize")]
    pub regno: i64,
    #[serde(rename = "Year", deserialize_with = "lenient_int::deserialize")]
    pub year: i64,
    /// Date of birth, normalised to `DD-MM-YYYY` when it could be parsed.
    #[serde(default)]
    pub dob: String,
    /// Identifiers of tests the student has completed, in completion order.
    #[serde(default)]
    pub completed: Vec<String>,
}

/// Student returned by listing endpoints, with the document key attached
#[derive(Debug, Serialize, Deserialize)]
pub struct StudentEntry {
    pub id: String,
    #[serde(flatten)]
    pub student: Student,
}

/// Page of students plus the number of documents matching the filter
#[derive(Debug, Serialize, Deserialize)]
pub struct StudentPage {
    pub total: u64,
    pub students: Vec<StudentEntry>,
}

/// Request to create a single student (admin)
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateStudentRequest {
    #[validate(length(min = 1, max = 200, message = "Name must be between 1 and 200 characters"))]
    pub name: String,

    #[validate(length(min = 1, max = 50, message = "Roll number must not be empty"))]
    pub rollno: String,

    #[validate(length(min = 1, max = 100, message = "Username must not be empty"))]
    pub username: String,

    #[validate(length(min = 1, message = "Password must not be empty"))]
    pub password: String,

    #[serde(default)]
    pub email: String,

    #[serde(default)]
    pub mobile: String,

    #[serde(rename = "Class", default)]
    pub class: String,

    #[serde(rename = "Section", default)]
    pub section: String,

    #[serde(default)]
    pub department: String,

    #[serde(deserialize_with = "lenient_int::deserialize")]
    pub regno: i64,

    #[serde(rename = "Year", deserialize_with = "lenient_int::deserialize")]
    pub year: i64,

    #[serde(default)]
    pub dob: String,
}

impl From<CreateStudentRequest> for Student {
    fn from(req: CreateStudentRequest) -> Self {
        Student {
            name: req.name.trim().to_string(),
            rollno: req.rollno.trim().to_string(),
            username: req.username.trim().to_string(),
            password: req.password.trim().to_string(),
            email: req.email.trim().to_string(),
            mobile: req.mobile.trim().to_string(),
            class: req.class.trim().to_string(),
            section: req.section.trim().to_string(),
            department: req.department.trim().to_string(),
            regno: req.regno,
            year: req.year,
            dob: req.dob.trim().to_string(),
            completed: Vec::new(),
        }
    }
}

/// Request to update a student (admin). Only provided fields are merged.
#[derive(Debug, Default, Serialize, Deserialize, Validate)]
pub struct UpdateStudentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rollno: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mobile: Option<String>,
    #[serde(rename = "Class", skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    #[serde(rename = "Section", skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_int_option::deserialize"
    )]
    pub regno: Option<i64>,
    #[serde(
        rename = "Year",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_int_option::deserialize"
    )]
    pub year: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dob: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<Vec<String>>,
}

impl UpdateStudentRequest {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.rollno.is_none()
            && self.password.is_none()
            && self.email.is_none()
            && self.mobile.is_none()
            && self.class.is_none()
            && self.section.is_none()
            && self.department.is_none()
            && self.regno.is_none()
            && self.year.is_none()
            && self.dob.is_none()
            && self.completed.is_none()
    }
}

mod lenient_int_option {
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    struct Wrapped(#[serde(deserialize_with = "super::lenient_int::deserialize")] i64);

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<Wrapped>::deserialize(deserializer)?.map(|Wrapped(value)| value))
    }
}

/// Query params for listing students
#[derive(Debug, Deserialize)]
pub struct ListStudentsQuery {
    /// Roll number prefix filter
    pub rollno: Option<String>,
}
