//! Keyed document storage shared by the student directory, the question
//! sets and the submissions.

use async_trait::async_trait;
use mongodb::bson::{self, Bson, Document};
use serde::{de::DeserializeOwned, Serialize};

use crate::error::StoreError;

pub mod memory;
pub mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

/// Field predicate understood by every backend
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Field equals the value
    Eq(String, Bson),
    /// String field starts with the prefix
    Prefix(String, String),
}

impl Filter {
    pub fn eq(field: &str, value: impl Into<Bson>) -> Self {
        Filter::Eq(field.to_string(), value.into())
    }

    pub fn prefix(field: &str, prefix: &str) -> Self {
        Filter::Prefix(field.to_string(), prefix.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// Filtered, ordered and windowed read over one collection
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreQuery {
    pub filters: Vec<Filter>,
    pub order_by: Option<(String, SortOrder)>,
    pub skip: u64,
    pub limit: Option<u64>,
}

impl StoreQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn order_by(mut self, field: &str, order: SortOrder) -> Self {
        self.order_by = Some((field.to_string(), order));
        self
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = skip;
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Document read back from a store together with its key
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub key: String,
    pub document: Document,
}

impl StoredDocument {
    pub fn decode<T: DeserializeOwned>(self) -> Result<(String, T), StoreError> {
        Ok((self.key, from_document(self.document)?))
    }
}

/// One named collection of documents addressed by string keys.
///
/// Writes are full overwrites except for [`DocumentStore::update`], which
/// merges top-level fields into an existing document.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Collection name, used in logs and metric labels
    fn collection(&self) -> &str;

    async fn get(&self, key: &str) -> Result<Option<Document>, StoreError>;

    /// Creates or fully replaces the document under `key`
    async fn set(&self, key: &str, document: Document) -> Result<(), StoreError>;

    /// Writes every entry as one unit: either all of them land or none do
    async fn set_all(&self, entries: Vec<(String, Document)>) -> Result<(), StoreError>;

    /// Merges `fields` into the document under `key`. Returns false when no
    /// such document exists; nothing is created in that case.
    async fn update(&self, key: &str, fields: Document) -> Result<bool, StoreError>;

    async fn find(&self, query: &StoreQuery) -> Result<Vec<StoredDocument>, StoreError>;

    async fn count(&self, filters: &[Filter]) -> Result<u64, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}

pub fn to_document<T: Serialize>(value: &T) -> Result<Document, StoreError> {
    Ok(bson::to_document(value)?)
}

pub fn from_document<T: DeserializeOwned>(document: Document) -> Result<T, StoreError> {
    Ok(bson::from_document(document)?)
}
