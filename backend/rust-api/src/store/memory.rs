use async_trait::async_trait;
use mongodb::bson::{Bson, Document};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use tokio::sync::RwLock;

use super::{DocumentStore, Filter, SortOrder, StoreQuery, StoredDocument};
use crate::error::StoreError;
use crate::metrics::track_db_operation;

/// Process-local store used for development and tests.
///
/// Documents are kept in key order. Writes can be switched off to simulate a
/// store that refuses a batch.
pub struct MemoryStore {
    name: String,
    documents: RwLock<BTreeMap<String, Document>>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            documents: RwLock::new(BTreeMap::new()),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Makes every following write fail with [`StoreError::Unavailable`]
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, AtomicOrdering::SeqCst);
    }

    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(AtomicOrdering::SeqCst) {
            return Err(StoreError::Unavailable(format!(
                "writes to {} are disabled",
                self.name
            )));
        }
        Ok(())
    }
}

fn matches(document: &Document, filters: &[Filter]) -> bool {
    filters.iter().all(|filter| match filter {
        Filter::Eq(field, value) => document.get(field) == Some(value),
        Filter::Prefix(field, prefix) => document
            .get(field)
            .and_then(Bson::as_str)
            .is_some_and(|text| text.starts_with(prefix.as_str())),
    })
}

fn as_f64(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(v) => Some(*v as f64),
        Bson::Int64(v) => Some(*v as f64),
        Bson::Double(v) => Some(*v),
        _ => None,
    }
}

/// Missing and null sort first, then numbers, then strings
fn compare_values(a: Option<&Bson>, b: Option<&Bson>) -> Ordering {
    let a = a.filter(|value| !matches!(value, Bson::Null));
    let b = b.filter(|value| !matches!(value, Bson::Null));
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => match (as_f64(a), as_f64(b)) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => match (a.as_str(), b.as_str()) {
                (Some(x), Some(y)) => x.cmp(y),
                _ => Ordering::Equal,
            },
        },
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn collection(&self) -> &str {
        &self.name
    }

    async fn get(&self, key: &str) -> Result<Option<Document>, StoreError> {
        track_db_operation("get", &self.name, async {
            Ok::<_, StoreError>(self.documents.read().await.get(key).cloned())
        })
        .await
    }

    async fn set(&self, key: &str, document: Document) -> Result<(), StoreError> {
        track_db_operation("set", &self.name, async {
            self.check_writable()?;
            self.documents
                .write()
                .await
                .insert(key.to_string(), document);
            Ok::<_, StoreError>(())
        })
        .await
    }

    async fn set_all(&self, entries: Vec<(String, Document)>) -> Result<(), StoreError> {
        track_db_operation("set_all", &self.name, async {
            self.check_writable()?;
            let mut documents = self.documents.write().await;
            for (key, document) in entries {
                documents.insert(key, document);
            }
            Ok::<_, StoreError>(())
        })
        .await
    }

    async fn update(&self, key: &str, fields: Document) -> Result<bool, StoreError> {
        track_db_operation("update", &self.name, async {
            self.check_writable()?;
            let mut documents = self.documents.write().await;
            match documents.get_mut(key) {
                Some(document) => {
                    for (field, value) in fields {
                        document.insert(field, value);
                    }
                    Ok::<_, StoreError>(true)
                }
                None => Ok(false),
            }
        })
        .await
    }

    async fn find(&self, query: &StoreQuery) -> Result<Vec<StoredDocument>, StoreError> {
        track_db_operation("find", &self.name, async {
            let documents = self.documents.read().await;
            let mut found: Vec<StoredDocument> = documents
                .iter()
                .filter(|(_, document)| matches(document, &query.filters))
                .map(|(key, document)| StoredDocument {
                    key: key.clone(),
                    document: document.clone(),
                })
                .collect();

            if let Some((field, order)) = &query.order_by {
                // stable sort keeps key order among equal values
                found.sort_by(|a, b| {
                    let ordering = compare_values(a.document.get(field), b.document.get(field));
                    match order {
                        SortOrder::Ascending => ordering,
                        SortOrder::Descending => ordering.reverse(),
                    }
                });
            }

            let skip = usize::try_from(query.skip).unwrap_or(usize::MAX);
            let limit = query
                .limit
                .map(|limit| usize::try_from(limit).unwrap_or(usize::MAX))
                .unwrap_or(usize::MAX);
            Ok::<_, StoreError>(found.into_iter().skip(skip).take(limit).collect())
        })
        .await
    }

    async fn count(&self, filters: &[Filter]) -> Result<u64, StoreError> {
        track_db_operation("count", &self.name, async {
            let documents = self.documents.read().await;
            Ok::<_, StoreError>(
                documents
                    .values()
                    .filter(|document| matches(document, filters))
                    .count() as u64,
            )
        })
        .await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
