//! Row-level schema checks and coercions.
//!
//! Everything here is pure: a row and a schema always produce the same
//! record or the same rejection.

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use std::collections::HashSet;

use super::table::{CellValue, RawRow};
use crate::error::IngestError;
use crate::models::ingestion::{RowErrorKind, RowRejection};
use crate::models::question_set::{CodingItem, McqItem, TestType};
use crate::models::student::Student;

const STUDENT_COLUMNS: &[&str] = &[
    "name",
    "rollno",
    "username",
    "password",
    "email",
    "mobile",
    "Class",
    "Section",
    "department",
    "regno",
    "Year",
    "dob",
];

/// Student columns that must also be non-blank on every row
const STUDENT_REQUIRED_FIELDS: &[&str] =
    &["name", "rollno", "username", "password", "regno", "Year"];

const MCQ_COLUMNS: &[&str] = &[
    "Question",
    "Option1",
    "Option2",
    "Option3",
    "Option4",
    "CorrectAnswer",
];

const CODING_COLUMNS: &[&str] = &["Question", "Function Name", "TestCases"];

const EXCERPT_LIMIT: usize = 100;

/// Date layouts accepted in free-text date cells, tried in order.
/// Slash and dot separated dates are read day-first.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d-%m-%Y", "%d/%m/%Y", "%Y/%m/%d", "%d.%m.%Y"];
/// Day-first layouts with a two-digit year
const SHORT_YEAR_DATE_FORMATS: &[&str] = &["%d-%m-%y", "%d/%m/%y", "%d.%m.%y"];
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%d-%m-%Y %H:%M:%S",
];

/// Stored layout of normalised dates
const STORED_DATE_FORMAT: &str = "%d-%m-%Y";

/// Target shape of an upload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Schema {
    Student,
    Mcq,
    Coding,
}

impl Schema {
    pub fn for_test_type(test_type: TestType) -> Self {
        match test_type {
            TestType::Mcq => Schema::Mcq,
            TestType::Coding => Schema::Coding,
        }
    }

    /// Short name used in logs and metric labels
    pub fn label(&self) -> &'static str {
        match self {
            Schema::Student => "student",
            Schema::Mcq => "mcq",
            Schema::Coding => "coding",
        }
    }

    pub fn required_columns(&self) -> &'static [&'static str] {
        match self {
            Schema::Student => STUDENT_COLUMNS,
            Schema::Mcq => MCQ_COLUMNS,
            Schema::Coding => CODING_COLUMNS,
        }
    }

    fn required_fields(&self) -> &'static [&'static str] {
        match self {
            Schema::Student => STUDENT_REQUIRED_FIELDS,
            Schema::Mcq => MCQ_COLUMNS,
            Schema::Coding => CODING_COLUMNS,
        }
    }

    /// Batch-level header check. Runs once, before any row is looked at.
    pub fn check_columns(&self, columns: &[String]) -> Result<(), IngestError> {
        let present: HashSet<&str> = columns.iter().map(String::as_str).collect();
        let mut missing: Vec<String> = self
            .required_columns()
            .iter()
            .filter(|column| !present.contains(*column))
            .map(|column| column.to_string())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            missing.sort();
            Err(IngestError::MissingColumns(missing))
        }
    }

    /// Identifying text of a row for diagnostics
    pub fn excerpt(&self, row: &RawRow) -> String {
        let column = match self {
            Schema::Student => "username",
            Schema::Mcq | Schema::Coding => "Question",
        };
        let text = row.get(column).to_text();
        if text.is_empty() {
            "N/A".to_string()
        } else {
            text.chars().take(EXCERPT_LIMIT).collect()
        }
    }
}

/// Normalised output of the validator
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Student(Student),
    Mcq(McqItem),
    Coding(CodingItem),
}

impl Record {
    pub fn into_student(self) -> Option<Student> {
        match self {
            Record::Student(student) => Some(student),
            _ => None,
        }
    }

    pub fn into_mcq(self) -> Option<McqItem> {
        match self {
            Record::Mcq(item) => Some(item),
            _ => None,
        }
    }

    pub fn into_coding(self) -> Option<CodingItem> {
        match self {
            Record::Coding(item) => Some(item),
            _ => None,
        }
    }
}

/// Validates and coerces one row into the record shape of `schema`
pub fn validate_row(schema: Schema, row: &RawRow) -> Result<Record, RowRejection> {
    check_required_fields(schema, row)?;

    match schema {
        Schema::Student => student_from_row(row).map(Record::Student),
        Schema::Mcq => mcq_from_row(row).map(Record::Mcq),
        Schema::Coding => Ok(Record::Coding(coding_from_row(row))),
    }
}

fn check_required_fields(schema: Schema, row: &RawRow) -> Result<(), RowRejection> {
    let empty: Vec<&str> = schema
        .required_fields()
        .iter()
        .copied()
        .filter(|column| row.get(column).is_blank())
        .collect();

    if empty.is_empty() {
        Ok(())
    } else {
        Err(RowRejection::new(
            RowErrorKind::EmptyField,
            format!("One or more required fields are empty: {}", empty.join(", ")),
        ))
    }
}

fn student_from_row(row: &RawRow) -> Result<Student, RowRejection> {
    let text = |column: &str| row.get(column).to_text();

    Ok(Student {
        name: text("name"),
        rollno: text("rollno"),
        username: text("username"),
        password: normalize_date(row.get("password")),
        email: text("email"),
        mobile: text("mobile"),
        class: text("Class"),
        section: text("Section"),
        department: text("department"),
        regno: coerce_integer("regno", row.get("regno"))?,
        year: coerce_integer("Year", row.get("Year"))?,
        dob: normalize_date(row.get("dob")),
        completed: Vec::new(),
    })
}

fn mcq_from_row(row: &RawRow) -> Result<McqItem, RowRejection> {
    let answer = coerce_integer("CorrectAnswer", row.get("CorrectAnswer"))?;
    if !(0..=3).contains(&answer) {
        return Err(RowRejection::new(
            RowErrorKind::OutOfRange,
            format!("CorrectAnswer must be between 0-3, got: {}", answer),
        ));
    }

    Ok(McqItem {
        question: row.get("Question").to_text(),
        options: [
            row.get("Option1").to_text(),
            row.get("Option2").to_text(),
            row.get("Option3").to_text(),
            row.get("Option4").to_text(),
        ],
        correct_answer: answer as u8,
    })
}

fn coding_from_row(row: &RawRow) -> CodingItem {
    CodingItem {
        question: row.get("Question").to_text(),
        function_name: row.get("Function Name").to_text(),
        test_cases: test_cases_payload(row.get("TestCases")),
    }
}

/// Reads the cell as a number and truncates it toward zero
fn coerce_integer(column: &str, cell: &CellValue) -> Result<i64, RowRejection> {
    cell.as_number()
        .map(|value| value.trunc() as i64)
        .ok_or_else(|| {
            RowRejection::new(
                RowErrorKind::InvalidFormat,
                format!("Invalid {} format: {}", column, cell.to_text()),
            )
        })
}

/// Test cases are opaque: JSON text is kept structured, anything else is
/// stored as the trimmed cell text.
fn test_cases_payload(cell: &CellValue) -> serde_json::Value {
    let text = cell.to_text();
    serde_json::from_str(&text).unwrap_or(serde_json::Value::String(text))
}

/// Normalises a date-like cell to `DD-MM-YYYY`. Unparseable values pass
/// through as their trimmed text; a bad date never rejects a row.
pub fn normalize_date(cell: &CellValue) -> String {
    match cell {
        CellValue::Date(value) => value.format(STORED_DATE_FORMAT).to_string(),
        CellValue::Text(text) => normalize_date_text(text),
        other => other.to_text(),
    }
}

pub fn normalize_date_text(text: &str) -> String {
    let text = text.trim();
    parse_date(text)
        .map(|date| date.format(STORED_DATE_FORMAT).to_string())
        .unwrap_or_else(|| text.to_string())
}

fn parse_date(text: &str) -> Option<NaiveDate> {
    // `%Y` also matches one or two digit years; those belong to the short layouts
    let full_year = |date: &NaiveDate| date.year() >= 1000;

    DATE_FORMATS
        .iter()
        .filter_map(|format| NaiveDate::parse_from_str(text, format).ok())
        .find(full_year)
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .filter_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
                .map(|value| value.date())
                .find(full_year)
        })
        .or_else(|| {
            SHORT_YEAR_DATE_FORMATS
                .iter()
                .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
        })
}
