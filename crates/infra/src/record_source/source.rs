use std::sync::Arc;

use serde_json::{Map, Value as JsonValue};
use thiserror::Error;

use charops_records::{decode, Record, RecordDecodeError};

use crate::site::CollectionPath;

use super::filter::Filter;

/// A stored document: its id plus its field map.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Map<String, JsonValue>,
}

impl Document {
    pub fn new(id: impl Into<String>, fields: Map<String, JsonValue>) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    pub fn decode<T: Record>(&self) -> Result<T, RecordDecodeError> {
        decode(&self.id, &self.fields)
    }
}

/// Record store operation error.
///
/// These are **infrastructure errors**. Absent optional fields are not errors;
/// they decode to defaults.
#[derive(Debug, Error)]
pub enum RecordSourceError {
    /// The store could not be reached or rejected the call.
    #[error("record store unavailable: {0}")]
    Unavailable(String),

    #[error("document '{id}' not found in {collection}")]
    NotFound { collection: String, id: String },

    #[error(transparent)]
    Decode(#[from] RecordDecodeError),

    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),
}

/// Per-collection queryable document store.
///
/// ## Query Semantics
///
/// `query()` returns the documents matching **all** predicates of the filter.
/// A predicate on a field the document does not carry never matches. Filters
/// on fields nested inside a document (e.g. a customer name embedded in an
/// order) are not supported; callers fetch broadly and filter in memory.
///
/// ## Update Semantics
///
/// `update()` merge-writes the given fields into an existing document and
/// fails with `NotFound` if the document does not exist. A dotted key
/// (`transportKgCO2PerKm.Lorry`) writes a nested field and keeps its
/// siblings. Concurrent updates to the same document are last-writer-wins.
#[async_trait::async_trait]
pub trait RecordSource: Send + Sync {
    /// Ids of every document in a collection.
    async fn list_ids(&self, collection: &CollectionPath) -> Result<Vec<String>, RecordSourceError>;

    async fn query(
        &self,
        collection: &CollectionPath,
        filter: &Filter,
    ) -> Result<Vec<Document>, RecordSourceError>;

    async fn get(
        &self,
        collection: &CollectionPath,
        id: &str,
    ) -> Result<Option<Document>, RecordSourceError>;

    async fn update(
        &self,
        collection: &CollectionPath,
        id: &str,
        fields: Map<String, JsonValue>,
    ) -> Result<(), RecordSourceError>;
}

#[async_trait::async_trait]
impl<S> RecordSource for Arc<S>
where
    S: RecordSource + ?Sized,
{
    async fn list_ids(
        &self,
        collection: &CollectionPath,
    ) -> Result<Vec<String>, RecordSourceError> {
        (**self).list_ids(collection).await
    }

    async fn query(
        &self,
        collection: &CollectionPath,
        filter: &Filter,
    ) -> Result<Vec<Document>, RecordSourceError> {
        (**self).query(collection, filter).await
    }

    async fn get(
        &self,
        collection: &CollectionPath,
        id: &str,
    ) -> Result<Option<Document>, RecordSourceError> {
        (**self).get(collection, id).await
    }

    async fn update(
        &self,
        collection: &CollectionPath,
        id: &str,
        fields: Map<String, JsonValue>,
    ) -> Result<(), RecordSourceError> {
        (**self).update(collection, id, fields).await
    }
}
