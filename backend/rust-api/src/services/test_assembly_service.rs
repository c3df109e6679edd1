use std::sync::Arc;

use crate::error::{IngestError, ServiceError, StoreError};
use crate::ingest::{ingest_upload, Record, Schema};
use crate::models::ingestion::IngestionOutcome;
use crate::models::question_set::{
    CreateTestRequest, QuestionSet, QuestionSetEntry, Questions, TestMetadata, TestType,
};
use crate::store::{from_document, to_document, DocumentStore, StoreQuery};

pub struct TestAssemblyService {
    store: Arc<dyn DocumentStore>,
}

impl TestAssemblyService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Builds a test from an uploaded question sheet and stores it under its
    /// name, replacing any earlier test of the same name. The question list
    /// is exactly the accepted rows of this upload.
    pub async fn upload_test(
        &self,
        metadata: TestMetadata,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<(QuestionSet, IngestionOutcome), IngestError> {
        let schema = Schema::for_test_type(metadata.test_type);
        let ingested = ingest_upload(file_name, bytes, schema)?;

        let records = ingested.records.into_iter();
        let questions = match metadata.test_type {
            TestType::Mcq => Questions::Mcq(records.filter_map(Record::into_mcq).collect()),
            TestType::Coding => Questions::Coding(records.filter_map(Record::into_coding).collect()),
        };

        let question_set = QuestionSet::assemble(metadata, questions);
        self.save(&question_set).await?;

        tracing::info!(
            test_name = %question_set.name,
            test_type = %question_set.test_type,
            questions = question_set.question_count(),
            declared = question_set.total_questions,
            rejected = ingested.outcome.rejected.len(),
            "Test upload stored"
        );
        Ok((question_set, ingested.outcome))
    }

    pub async fn save(&self, question_set: &QuestionSet) -> Result<(), StoreError> {
        self.store
            .set(&question_set.name, to_document(question_set)?)
            .await
    }

    /// Stores a test sent as JSON, under the same naming rule as uploads
    pub async fn create_test(&self, req: CreateTestRequest) -> Result<QuestionSet, ServiceError> {
        let (metadata, questions) = req.into_parts().map_err(ServiceError::BadRequest)?;
        if metadata.name.is_empty() {
            return Err(ServiceError::BadRequest("TestName must not be empty".to_string()));
        }

        let question_set = QuestionSet::assemble(metadata, questions);
        self.save(&question_set).await?;

        tracing::info!(test_name = %question_set.name, "Test created");
        Ok(question_set)
    }

    /// Lists every stored test. Documents that no longer decode are skipped.
    pub async fn list_tests(&self) -> Result<Vec<QuestionSetEntry>, ServiceError> {
        let found = self.store.find(&StoreQuery::new()).await?;

        let mut tests = Vec::with_capacity(found.len());
        for stored in found {
            match stored.decode::<QuestionSet>() {
                Ok((id, question_set)) => tests.push(QuestionSetEntry { id, question_set }),
                Err(e) => tracing::warn!("Skipping undecodable test document: {}", e),
            }
        }
        Ok(tests)
    }

    pub async fn get_test(&self, name: &str) -> Result<QuestionSet, ServiceError> {
        let document = self
            .store
            .get(name)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Test {} not found", name)))?;

        Ok(from_document(document)?)
    }
}
