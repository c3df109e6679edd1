use std::sync::Arc;

use crate::config::Config;
use crate::store::{DocumentStore, MemoryStore, MongoStore};
use mongodb::Client as MongoClient;

pub const STUDENTS_COLLECTION: &str = "students";
pub const QUESTIONS_COLLECTION: &str = "questions";
pub const RESULTS_COLLECTION: &str = "results";

pub struct AppState {
    pub config: Config,
    pub students: Arc<dyn DocumentStore>,
    pub questions: Arc<dyn DocumentStore>,
    pub results: Arc<dyn DocumentStore>,
}

impl AppState {
    pub async fn new(config: Config, mongo_client: MongoClient) -> anyhow::Result<Self> {
        let database = config.mongo_database.clone();

        tracing::info!("Pinging MongoDB database {}...", database);
        let students: Arc<dyn DocumentStore> = Arc::new(MongoStore::new(
            mongo_client.clone(),
            &database,
            STUDENTS_COLLECTION,
        ));

        tokio::time::timeout(std::time::Duration::from_secs(5), students.ping())
            .await
            .map_err(|_| anyhow::anyhow!("MongoDB ping timeout after 5s"))??;

        tracing::info!("MongoDB connection established successfully");

        Ok(Self::with_stores(
            config,
            students,
            Arc::new(MongoStore::new(
                mongo_client.clone(),
                &database,
                QUESTIONS_COLLECTION,
            )),
            Arc::new(MongoStore::new(mongo_client, &database, RESULTS_COLLECTION)),
        ))
    }

    /// State backed by process-local stores; nothing survives a restart
    pub fn in_memory(config: Config) -> Self {
        Self::with_stores(
            config,
            Arc::new(MemoryStore::new(STUDENTS_COLLECTION)),
            Arc::new(MemoryStore::new(QUESTIONS_COLLECTION)),
            Arc::new(MemoryStore::new(RESULTS_COLLECTION)),
        )
    }

    pub fn with_stores(
        config: Config,
        students: Arc<dyn DocumentStore>,
        questions: Arc<dyn DocumentStore>,
        results: Arc<dyn DocumentStore>,
    ) -> Self {
        Self {
            config,
            students,
            questions,
            results,
        }
    }
}

pub mod student_directory_service;
pub mod submission_service;
pub mod test_assembly_service;
