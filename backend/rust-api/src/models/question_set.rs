use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use validator::{Validate, ValidationError};

use super::lenient_int;
use crate::error::IngestError;

/// Kind of test; decides which question list a test carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TestType {
    #[serde(rename = "MCQ")]
    Mcq,
    Coding,
}

impl TestType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestType::Mcq => "MCQ",
            TestType::Coding => "Coding",
        }
    }
}

impl fmt::Display for TestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TestType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "MCQ" | "mcq" => Ok(TestType::Mcq),
            "Coding" | "coding" => Ok(TestType::Coding),
            other => Err(format!("Unknown test type {:?}, expected MCQ or Coding", other)),
        }
    }
}

/// Multiple-choice question with exactly four options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct McqItem {
    #[validate(length(min = 1, message = "Question must not be empty"))]
    pub question: String,
    #[validate(custom(function = validate_options))]
    pub options: [String; 4],
    /// Zero-based index into `options`
    #[serde(rename = "correctAnswer")]
    #[validate(range(max = 3, message = "CorrectAnswer must be between 0-3"))]
    pub correct_answer: u8,
}

fn validate_options(options: &[String; 4]) -> Result<(), ValidationError> {
    if options.iter().any(|option| option.trim().is_empty()) {
        return Err(ValidationError::new("options_cannot_be_empty"));
    }
    Ok(())
}

/// Coding question; `test_cases` is carried through as-is
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct CodingItem {
    #[validate(length(min = 1, message = "Question must not be empty"))]
    pub question: String,
    #[serde(rename = "functionName")]
    #[validate(length(min = 1, message = "Function name must not be empty"))]
    pub function_name: String,
    #[serde(rename = "testCases")]
    pub test_cases: serde_json::Value,
}

/// Question list of a test. A test holds exactly one kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Questions {
    Mcq(Vec<McqItem>),
    Coding(Vec<CodingItem>),
}

impl Questions {
    pub fn test_type(&self) -> TestType {
        match self {
            Questions::Mcq(_) => TestType::Mcq,
            Questions::Coding(_) => TestType::Coding,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Questions::Mcq(items) => items.len(),
            Questions::Coding(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Test document stored in the "questions" collection, keyed by `TestName`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionSet {
    #[serde(rename = "TestName")]
    pub name: String,
    #[serde(rename = "TestType")]
    pub test_type: TestType,
    /// Duration in minutes
    #[serde(rename = "Time", deserialize_with = "lenient_int::deserialize")]
    pub duration_minutes: u32,
    /// Declared question count; informational only
    #[serde(rename = "TotalQuestions", deserialize_with = "lenient_int::deserialize")]
    pub total_questions: u32,
    #[serde(rename = "StartTime")]
    pub start_time: String,
    #[serde(default)]
    pub category: String,
    #[serde(rename = "MCQ", default, skip_serializing_if = "Option::is_none")]
    pub mcq: Option<Vec<McqItem>>,
    #[serde(rename = "Coding", default, skip_serializing_if = "Option::is_none")]
    pub coding: Option<Vec<CodingItem>>,
}

impl QuestionSet {
    /// Builds a test from its metadata and question list. The stored type is
    /// always taken from the questions so only one list is ever populated.
    pub fn assemble(metadata: TestMetadata, questions: Questions) -> Self {
        let test_type = questions.test_type();
        let (mcq, coding) = match questions {
            Questions::Mcq(items) => (Some(items), None),
            Questions::Coding(items) => (None, Some(items)),
        };
        QuestionSet {
            name: metadata.name,
            test_type,
            duration_minutes: metadata.duration_minutes,
            total_questions: metadata.total_questions,
            start_time: metadata.start_time,
            category: metadata.category,
            mcq,
            coding,
        }
    }

    pub fn question_count(&self) -> usize {
        match self.test_type {
            TestType::Mcq => self.mcq.as_ref().map_or(0, Vec::len),
            TestType::Coding => self.coding.as_ref().map_or(0, Vec::len),
        }
    }
}

/// Stored test with its document key
#[derive(Debug, Serialize)]
pub struct QuestionSetEntry {
    pub id: String,
    #[serde(flatten)]
    pub question_set: QuestionSet,
}

/// Test-level metadata sent alongside an uploaded question file
#[derive(Debug, Clone, PartialEq)]
pub struct TestMetadata {
    pub name: String,
    pub test_type: TestType,
    pub duration_minutes: u32,
    pub total_questions: u32,
    pub start_time: String,
    pub category: String,
}

impl TestMetadata {
    /// Reads metadata from multipart text fields. Accepts both the current
    /// camelCase names and the legacy form names.
    pub fn from_form(fields: &HashMap<String, String>) -> Result<Self, IngestError> {
        let lookup = |names: &[&str]| -> Option<String> {
            names
                .iter()
                .find_map(|name| fields.get(*name))
                .map(|value| value.trim().to_string())
        };
        let required = |names: &[&str]| -> Result<String, IngestError> {
            lookup(names)
                .filter(|value| !value.is_empty())
                .ok_or_else(|| IngestError::InvalidMetadata(format!("{} is required", names[0])))
        };
        let number = |names: &[&str]| -> Result<u32, IngestError> {
            let raw = required(names)?;
            raw.parse::<u32>().map_err(|_| {
                IngestError::InvalidMetadata(format!(
                    "{} must be a non-negative integer, got {:?}",
                    names[0], raw
                ))
            })
        };

        let test_type = required(&["testType", "TestType"])?
            .parse::<TestType>()
            .map_err(IngestError::InvalidMetadata)?;

        Ok(TestMetadata {
            name: required(&["testName", "TestName"])?,
            test_type,
            duration_minutes: number(&["duration", "Time"])?,
            total_questions: number(&["totalQuestions", "TotalQuestions"])?,
            start_time: required(&["startTime", "StartTime"])?,
            category: required(&["category", "Category"])?,
        })
    }
}

/// Request to create a test from JSON (admin)
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateTestRequest {
    #[serde(rename = "TestName")]
    #[validate(length(min = 1, max = 200, message = "TestName must be between 1 and 200 characters"))]
    pub name: String,
    #[serde(rename = "TestType")]
    pub test_type: TestType,
    #[serde(rename = "Time", deserialize_with = "lenient_int::deserialize")]
    pub duration_minutes: u32,
    #[serde(rename = "TotalQuestions", deserialize_with = "lenient_int::deserialize")]
    pub total_questions: u32,
    #[serde(rename = "StartTime", default)]
    pub start_time: String,
    #[serde(default)]
    pub category: String,
    #[serde(rename = "MCQ", default)]
    #[validate(nested)]
    pub mcq: Vec<McqItem>,
    #[serde(rename = "Coding", default)]
    #[validate(nested)]
    pub coding: Vec<CodingItem>,
}

impl CreateTestRequest {
    /// Splits the request into metadata and the question list matching its
    /// type. Items of the other kind are an error rather than silently dropped.
    pub fn into_parts(self) -> Result<(TestMetadata, Questions), String> {
        let questions = match self.test_type {
            TestType::Mcq if self.coding.is_empty() => Questions::Mcq(self.mcq),
            TestType::Coding if self.mcq.is_empty() => Questions::Coding(self.coding),
            other => {
                return Err(format!(
                    "A {} test must not carry questions of the other kind",
                    other
                ))
            }
        };
        let metadata = TestMetadata {
            name: self.name.trim().to_string(),
            test_type: self.test_type,
            duration_minutes: self.duration_minutes,
            total_questions: self.total_questions,
            start_time: self.start_time,
            category: self.category,
        };
        Ok((metadata, questions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn mcq(question: &str) -> McqItem {
        McqItem {
            question: question.into(),
            options: ["a".into(), "b".into(), "c".into(), "d".into()],
            correct_answer: 1,
        }
    }

    #[test]
    fn metadata_accepts_current_and_legacy_field_names() {
        let current = TestMetadata::from_form(&form(&[
            ("testName", "Quiz 1"),
            ("testType", "MCQ"),
            ("duration", "30"),
            ("totalQuestions", "10"),
            ("startTime", "2025-09-23T16:15"),
            ("category", "Aptitude"),
        ]))
        .unwrap();
        let legacy = TestMetadata::from_form(&form(&[
            ("TestName", "Quiz 1"),
            ("TestType", "MCQ"),
            ("Time", "30"),
            ("TotalQuestions", "10"),
            ("StartTime", "2025-09-23T16:15"),
            ("category", "Aptitude"),
        ]))
        .unwrap();
        assert_eq!(current, legacy);
        assert_eq!(current.test_type, TestType::Mcq);
    }

    #[test]
    fn metadata_rejects_unknown_type_and_bad_numbers() {
        let bad_type = TestMetadata::from_form(&form(&[
            ("testName", "Quiz"),
            ("testType", "Essay"),
            ("duration", "30"),
            ("totalQuestions", "10"),
            ("startTime", "now"),
        ]));
        assert!(matches!(bad_type, Err(IngestError::InvalidMetadata(_))));

        let bad_duration = TestMetadata::from_form(&form(&[
            ("testName", "Quiz"),
            ("testType", "Coding"),
            ("duration", "half an hour"),
            ("totalQuestions", "10"),
            ("startTime", "now"),
        ]));
        assert!(matches!(bad_duration, Err(IngestError::InvalidMetadata(_))));
    }

    #[test]
    fn metadata_requires_category() {
        let fields = [
            ("testName", "Quiz"),
            ("testType", "MCQ"),
            ("duration", "30"),
            ("totalQuestions", "10"),
            ("startTime", "2025-09-23T16:15"),
        ];
        let missing = TestMetadata::from_form(&form(&fields)).unwrap_err();
        assert_eq!(missing.to_string(), "Invalid upload metadata: category is required");

        let mut with_blank = fields.to_vec();
        with_blank.push(("category", "   "));
        assert!(matches!(
            TestMetadata::from_form(&form(&with_blank)),
            Err(IngestError::InvalidMetadata(_))
        ));
    }

    #[test]
    fn assemble_populates_only_the_matching_list() {
        let metadata = TestMetadata {
            name: "Quiz".into(),
            test_type: TestType::Mcq,
            duration_minutes: 20,
            total_questions: 50,
            start_time: "2025-09-23T16:15".into(),
            category: "General".into(),
        };
        let set = QuestionSet::assemble(metadata, Questions::Mcq(vec![mcq("1+1?")]));
        assert_eq!(set.test_type, TestType::Mcq);
        assert!(set.coding.is_none());
        assert_eq!(set.question_count(), 1);
        // declared total is kept even though it disagrees with the list
        assert_eq!(set.total_questions, 50);

        let value = serde_json::to_value(&set).unwrap();
        assert_eq!(value["TestType"], "MCQ");
        assert!(value.get("Coding").is_none());
        assert_eq!(value["MCQ"][0]["correctAnswer"], 1);
    }

    #[test]
    fn create_request_rejects_mixed_question_kinds() {
        let raw = serde_json::json!({
            "TestName": "Mixed",
            "TestType": "MCQ",
            "Time": "15",
            "TotalQuestions": 2,
            "MCQ": [{"question": "q", "options": ["a", "b", "c", "d"], "correctAnswer": 0}],
            "Coding": [{"question": "q", "functionName": "f", "testCases": []}],
        });
        let req: CreateTestRequest = serde_json::from_value(raw).unwrap();
        assert!(req.validate().is_ok());
        assert!(req.into_parts().is_err());
    }

    #[test]
    fn mcq_item_requires_exactly_four_options() {
        let three = serde_json::json!({"question": "q", "options": ["a", "b", "c"], "correctAnswer": 0});
        assert!(serde_json::from_value::<McqItem>(three).is_err());

        let out_of_range = McqItem {
            correct_answer: 4,
            ..mcq("q")
        };
        assert!(out_of_range.validate().is_err());
    }
}
