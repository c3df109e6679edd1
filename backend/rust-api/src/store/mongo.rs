use async_trait::async_trait;
use mongodb::bson::{doc, Bson, Document, Regex};
use mongodb::{Client, Collection};

use super::{DocumentStore, Filter, SortOrder, StoreQuery, StoredDocument};
use crate::error::StoreError;
use crate::metrics::track_db_operation;

/// MongoDB collection addressed by `_id`
pub struct MongoStore {
    client: Client,
    collection: Collection<Document>,
}

impl MongoStore {
    pub fn new(client: Client, database: &str, collection: &str) -> Self {
        let collection = client.database(database).collection::<Document>(collection);
        Self { client, collection }
    }

    async fn write_all(&self, entries: Vec<(String, Document)>) -> Result<(), StoreError> {
        let mut session = self.client.start_session().await?;
        session.start_transaction().await?;

        for (key, document) in entries {
            let result = self
                .collection
                .replace_one(doc! { "_id": key.as_str() }, with_key(&key, document))
                .upsert(true)
                .session(&mut session)
                .await;

            if let Err(e) = result {
                tracing::error!(
                    collection = self.collection.name(),
                    key = %key,
                    "Batch write failed, aborting transaction: {}",
                    e
                );
                if let Err(abort_err) = session.abort_transaction().await {
                    tracing::warn!("Failed to abort transaction: {}", abort_err);
                }
                return Err(e.into());
            }
        }

        session.commit_transaction().await?;
        Ok(())
    }
}

fn with_key(key: &str, mut document: Document) -> Document {
    document.insert("_id", key);
    document
}

fn split_key(mut document: Document) -> StoredDocument {
    let key = match document.remove("_id") {
        Some(Bson::String(key)) => key,
        Some(other) => other.to_string(),
        None => String::new(),
    };
    StoredDocument { key, document }
}

/// Escapes regex metacharacters so a prefix matches literally
fn escape_regex(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if "\\^$.|?*+()[]{}".contains(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn filter_document(filters: &[Filter]) -> Document {
    let mut filter = doc! {};
    for clause in filters {
        match clause {
            Filter::Eq(field, value) => {
                filter.insert(field.as_str(), value.clone());
            }
            Filter::Prefix(field, prefix) => {
                let regex = Regex {
                    pattern: format!("^{}", escape_regex(prefix)),
                    options: String::new(),
                };
                filter.insert(field.as_str(), regex);
            }
        }
    }
    filter
}

#[async_trait]
impl DocumentStore for MongoStore {
    fn collection(&self) -> &str {
        self.collection.name()
    }

    async fn get(&self, key: &str) -> Result<Option<Document>, StoreError> {
        let found = track_db_operation("get", self.collection.name(), async {
            self.collection
                .find_one(doc! { "_id": key })
                .await
                .map_err(StoreError::from)
        })
        .await?;

        Ok(found.map(|document| split_key(document).document))
    }

    async fn set(&self, key: &str, document: Document) -> Result<(), StoreError> {
        track_db_operation("set", self.collection.name(), async {
            self.collection
                .replace_one(doc! { "_id": key }, with_key(key, document))
                .upsert(true)
                .await
                .map_err(StoreError::from)
        })
        .await?;
        Ok(())
    }

    async fn set_all(&self, entries: Vec<(String, Document)>) -> Result<(), StoreError> {
        if entries.is_empty() {
            return Ok(());
        }
        track_db_operation("set_all", self.collection.name(), self.write_all(entries)).await
    }

    async fn update(&self, key: &str, fields: Document) -> Result<bool, StoreError> {
        let result = track_db_operation("update", self.collection.name(), async {
            self.collection
                .update_one(doc! { "_id": key }, doc! { "$set": fields })
                .await
                .map_err(StoreError::from)
        })
        .await?;
        Ok(result.matched_count > 0)
    }

    async fn find(&self, query: &StoreQuery) -> Result<Vec<StoredDocument>, StoreError> {
        track_db_operation("find", self.collection.name(), async {
            let mut find = self
                .collection
                .find(filter_document(&query.filters))
                .skip(query.skip);

            if let Some((field, order)) = &query.order_by {
                let direction = match order {
                    SortOrder::Ascending => 1,
                    SortOrder::Descending => -1,
                };
                let mut sort = Document::new();
                sort.insert(field.as_str(), direction);
                find = find.sort(sort);
            }
            if let Some(limit) = query.limit {
                find = find.limit(i64::try_from(limit).unwrap_or(i64::MAX));
            }

            let mut cursor = find.await?;
            let mut documents = Vec::new();
            while cursor.advance().await? {
                let document = cursor.deserialize_current()?;
                documents.push(split_key(document));
            }
            Ok::<_, StoreError>(documents)
        })
        .await
    }

    async fn count(&self, filters: &[Filter]) -> Result<u64, StoreError> {
        track_db_operation("count", self.collection.name(), async {
            self.collection
                .count_documents(filter_document(filters))
                .await
                .map_err(StoreError::from)
        })
        .await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await?;
        Ok(())
    }
}
