use chrono::Utc;
use std::sync::Arc;

use crate::error::{ServiceError, StoreError};
use crate::metrics::SUBMISSIONS_TOTAL;
use crate::models::submission::{Submission, SubmissionEntry, SubmitExamRequest};
use crate::services::student_directory_service::StudentDirectoryService;
use crate::store::{to_document, DocumentStore, Filter, SortOrder, StoreQuery, StoredDocument};

const DEFAULT_RESULTS_LIMIT: u64 = 100;

pub struct SubmissionService {
    results: Arc<dyn DocumentStore>,
    students: Arc<dyn DocumentStore>,
}

impl SubmissionService {
    pub fn new(results: Arc<dyn DocumentStore>, students: Arc<dyn DocumentStore>) -> Self {
        Self { results, students }
    }

    /// Stores an exam attempt, replacing an earlier attempt at the same test,
    /// then replaces the student's completed-tests list.
    pub async fn submit(&self, req: SubmitExamRequest) -> Result<Submission, ServiceError> {
        let (submission, completed) = req.into_submission(Utc::now());
        if submission.username.is_empty() {
            return Err(ServiceError::BadRequest("username is required".to_string()));
        }

        self.results
            .set(&submission.key(), to_document(&submission)?)
            .await?;

        SUBMISSIONS_TOTAL
            .with_label_values(&[submission.test_type.as_str()])
            .inc();

        let directory = StudentDirectoryService::new(self.students.clone());
        if !directory.set_completed(&submission.username, completed).await? {
            tracing::warn!(
                username = %submission.username,
                "Student not found, completed tests not updated"
            );
        }

        tracing::info!(
            username = %submission.username,
            testname = %submission.testname,
            "Submission stored"
        );
        Ok(submission)
    }

    /// Newest submissions first
    pub async fn recent(
        &self,
        limit: Option<u32>,
        offset: Option<u32>,
    ) -> Result<Vec<SubmissionEntry>, ServiceError> {
        let query = StoreQuery::new()
            .order_by("submitted_at", SortOrder::Descending)
            .skip(offset.map(u64::from).unwrap_or(0))
            .limit(limit.map(u64::from).unwrap_or(DEFAULT_RESULTS_LIMIT));

        Ok(decode_entries(self.results.find(&query).await?)?)
    }

    pub async fn by_username(&self, username: &str) -> Result<Vec<SubmissionEntry>, ServiceError> {
        let query = StoreQuery::new()
            .filter(Filter::eq("username", username))
            .order_by("submitted_at", SortOrder::Descending);

        Ok(decode_entries(self.results.find(&query).await?)?)
    }

    /// Submissions of one test type whose test started on `date` (`YYYY-MM-DD`)
    pub async fn by_type_and_date(
        &self,
        test_type: &str,
        date: &str,
    ) -> Result<Vec<SubmissionEntry>, ServiceError> {
        let query = StoreQuery::new().filter(Filter::eq("test_type", test_type));
        let entries = decode_entries(self.results.find(&query).await?)?;

        Ok(entries
            .into_iter()
            .filter(|entry| {
                entry
                    .submission
                    .testdate
                    .as_deref()
                    .and_then(|testdate| testdate.get(..10))
                    == Some(date)
            })
            .collect())
    }

    pub async fn by_regno(&self, regno: &str) -> Result<Vec<SubmissionEntry>, ServiceError> {
        let query = StoreQuery::new().filter(Filter::eq("regno", regno));
        let entries = decode_entries(self.results.find(&query).await?)?;

        if entries.is_empty() {
            return Err(ServiceError::NotFound(
                "No results found for this roll number".to_string(),
            ));
        }
        Ok(entries)
    }
}

fn decode_entries(found: Vec<StoredDocument>) -> Result<Vec<SubmissionEntry>, StoreError> {
    found
        .into_iter()
        .map(|stored| {
            let (id, submission) = stored.decode::<Submission>()?;
            Ok(SubmissionEntry { id, submission })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use mongodb::bson::doc;

    fn request(username: &str, testname: &str, start: &str, completed: &[&str]) -> SubmitExamRequest {
        serde_json::from_value(serde_json::json!({
            "username": username,
            "testname": testname,
            "test_type": "MCQ",
            "results": [{"question": 0, "correct": true}],
            "totalMarks": 1,
            "percentage": 100,
            "regno": 2113,
            "completed": completed,
            "StartTime": start,
        }))
        .unwrap()
    }

    fn service() -> (Arc<MemoryStore>, Arc<MemoryStore>, SubmissionService) {
        let results = Arc::new(MemoryStore::new("results"));
        let students = Arc::new(MemoryStore::new("students"));
        let service = SubmissionService::new(results.clone(), students.clone());
        (results, students, service)
    }

    #[tokio::test]
    async fn resubmission_overwrites_and_updates_completed() {
        let (results, students, service) = service();
        students
            .set("asha", doc! { "username": "asha", "completed": [] })
            .await
            .unwrap();

        service
            .submit(request("asha", "Quiz 1", "2025-09-23T16:15", &["Quiz 1"]))
            .await
            .unwrap();
        service
            .submit(request("asha", "Quiz 1", "2025-09-23T16:15", &["Quiz 1"]))
            .await
            .unwrap();

        assert_eq!(results.len().await, 1);
        let student = students.get("asha").await.unwrap().unwrap();
        assert_eq!(student.get_array("completed").unwrap().len(), 1);
    }

    #[tokio::test]
    async fn blank_username_is_refused() {
        let (results, _, service) = service();
        let err = service
            .submit(request("   ", "Quiz 1", "2025-09-23T16:15", &[]))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::BadRequest(_)));
        assert!(results.is_empty().await);
    }

    #[tokio::test]
    async fn unknown_student_still_stores_the_result() {
        let (results, students, service) = service();
        service
            .submit(request("ghost", "Quiz 1", "2025-09-23T16:15", &["Quiz 1"]))
            .await
            .unwrap();
        assert_eq!(results.len().await, 1);
        assert!(students.is_empty().await);
    }

    #[tokio::test]
    async fn queries_by_user_date_and_regno() {
        let (_, _, service) = service();
        service
            .submit(request("asha", "Quiz 1", "2025-09-23T16:15", &[]))
            .await
            .unwrap();
        service
            .submit(request("asha", "Quiz 2", "2025-09-24T09:00", &[]))
            .await
            .unwrap();
        service
            .submit(request("ravi", "Quiz 1", "2025-09-23T16:15", &[]))
            .await
            .unwrap();

        let asha = service.by_username("asha").await.unwrap();
        assert_eq!(asha.len(), 2);
        assert!(asha[0].submission.submitted_at >= asha[1].submission.submitted_at);

        let on_day = service.by_type_and_date("MCQ", "2025-09-23").await.unwrap();
        assert_eq!(on_day.len(), 2);
        assert!(service
            .by_type_and_date("Coding", "2025-09-23")
            .await
            .unwrap()
            .is_empty());

        assert_eq!(service.by_regno("2113").await.unwrap().len(), 3);
        assert!(matches!(
            service.by_regno("9999").await,
            Err(ServiceError::NotFound(_))
        ));

        let page = service.recent(Some(2), None).await.unwrap();
        assert_eq!(page.len(), 2);
    }
}
