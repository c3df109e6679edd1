use mongodb::bson::Document;
use std::collections::HashSet;
use std::sync::Arc;

use crate::error::{IngestError, ServiceError, StoreError};
use crate::ingest::{ingest_upload, validator::normalize_date_text, Record, Schema};
use crate::models::ingestion::IngestionOutcome;
use crate::models::student::{
    CreateStudentRequest, Student, StudentEntry, StudentPage, UpdateStudentRequest,
};
use crate::store::{from_document, to_document, DocumentStore, Filter, StoreQuery, StoredDocument};

/// Students listed when no roll number filter is given
const DEFAULT_PAGE_SIZE: u64 = 50;

pub struct StudentDirectoryService {
    store: Arc<dyn DocumentStore>,
}

impl StudentDirectoryService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Ingests a student sheet and writes every accepted row in one batch.
    /// Nothing is written when the file fails as a whole or no row passes.
    pub async fn upload_students(
        &self,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<(IngestionOutcome, usize), IngestError> {
        let ingested = ingest_upload(file_name, bytes, Schema::Student)?;
        let students: Vec<Student> = ingested
            .records
            .into_iter()
            .filter_map(Record::into_student)
            .collect();

        let stored = self.upsert_batch(students).await?;

        tracing::info!(
            file_name,
            accepted = ingested.outcome.accepted_count,
            stored,
            rejected = ingested.outcome.rejected.len(),
            "Student upload stored"
        );
        Ok((ingested.outcome, stored))
    }

    /// Overwrites each student by username with an empty `completed` list.
    /// Re-uploading a student therefore discards their recorded progress.
    /// Returns the number of distinct usernames written; a later row with
    /// the same username replaces an earlier one.
    pub async fn upsert_batch(&self, students: Vec<Student>) -> Result<usize, StoreError> {
        let distinct = students
            .iter()
            .map(|student| student.username.as_str())
            .collect::<HashSet<_>>()
            .len();
        let entries = students
            .into_iter()
            .map(|mut student| {
                student.completed.clear();
                let document = to_document(&student)?;
                Ok((student.username, document))
            })
            .collect::<Result<Vec<_>, StoreError>>()?;

        self.store.set_all(entries).await?;
        Ok(distinct)
    }

    /// Creates (or replaces) one student
    pub async fn create_student(&self, req: CreateStudentRequest) -> Result<Student, ServiceError> {
        let mut student = Student::from(req);
        if student.username.is_empty() {
            return Err(ServiceError::BadRequest("Username must not be empty".to_string()));
        }
        student.dob = normalize_date_text(&student.dob);

        self.store
            .set(&student.username, to_document(&student)?)
            .await?;

        tracing::info!(username = %student.username, "Student created");
        Ok(student)
    }

    pub async fn get_student(&self, username: &str) -> Result<Student, ServiceError> {
        let document = self
            .store
            .get(username)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Student {} not found", username)))?;

        Ok(from_document(document)?)
    }

    /// Without a prefix: the first page of students and the size of the
    /// whole directory. With a prefix: every student whose roll number
    /// starts with it, and how many there are.
    pub async fn list_students(&self, rollno_prefix: Option<&str>) -> Result<StudentPage, ServiceError> {
        let (query, filters) = match rollno_prefix.map(str::trim).filter(|p| !p.is_empty()) {
            Some(prefix) => {
                let filters = vec![Filter::prefix("rollno", prefix)];
                let query = StoreQuery {
                    filters: filters.clone(),
                    ..StoreQuery::default()
                };
                (query, filters)
            }
            None => (StoreQuery::new().limit(DEFAULT_PAGE_SIZE), Vec::new()),
        };

        let students = self.decode_entries(self.store.find(&query).await?)?;
        let total = self.store.count(&filters).await?;

        Ok(StudentPage { total, students })
    }

    pub async fn list_all(&self) -> Result<Vec<StudentEntry>, ServiceError> {
        let found = self.store.find(&StoreQuery::new()).await?;
        self.decode_entries(found)
    }

    /// Merges the provided fields into an existing student
    pub async fn update_student(
        &self,
        username: &str,
        req: UpdateStudentRequest,
    ) -> Result<(), ServiceError> {
        if req.is_empty() {
            return Err(ServiceError::BadRequest("No data provided".to_string()));
        }

        let mut fields = to_document(&req)?;
        if let Ok(dob) = fields.get_str("dob").map(normalize_date_text) {
            fields.insert("dob", dob);
        }

        if !self.store.update(username, fields).await? {
            return Err(ServiceError::NotFound(format!("Student {} not found", username)));
        }

        tracing::info!(username, "Student updated");
        Ok(())
    }

    /// Replaces the completed-tests list. Returns false for unknown students.
    pub async fn set_completed(&self, username: &str, completed: Vec<String>) -> Result<bool, StoreError> {
        let mut fields = Document::new();
        fields.insert("completed", completed);
        self.store.update(username, fields).await
    }

    fn decode_entries(
        &self,
        found: Vec<StoredDocument>,
    ) -> Result<Vec<StudentEntry>, ServiceError> {
        let mut students = Vec::with_capacity(found.len());
        for stored in found {
            let (id, student) = stored.decode::<Student>()?;
            students.push(StudentEntry { id, student });
        }
        Ok(students)
    }
}
