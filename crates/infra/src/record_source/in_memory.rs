use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde_json::{Map, Value as JsonValue};

use crate::site::CollectionPath;

use super::filter::Filter;
use super::source::{Document, RecordSource, RecordSourceError};

type Collection = BTreeMap<String, Map<String, JsonValue>>;
type Collections = BTreeMap<String, Collection>;

/// In-memory document store.
///
/// Intended for tests/dev and for runs against an exported snapshot. Documents
/// are kept ordered by id so query results are deterministic.
///
/// ## Snapshot format
///
/// A JSON object keyed by collection path, each holding an object keyed by
/// document id:
///
/// ```json
/// { "sites/kisumu/orders": { "o-1": { "status": "Received" } } }
/// ```
#[derive(Debug, Default)]
pub struct InMemoryRecordSource {
    collections: RwLock<BTreeMap<String, Collection>>,
}

impl InMemoryRecordSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: JsonValue) -> Result<Self, RecordSourceError> {
        let JsonValue::Object(collections) = snapshot else {
            return Err(RecordSourceError::InvalidSnapshot(
                "top level must be an object keyed by collection path".to_string(),
            ));
        };

        let source = Self::new();
        for (path, docs) in collections {
            let JsonValue::Object(docs) = docs else {
                return Err(RecordSourceError::InvalidSnapshot(format!(
                    "collection '{path}' must be an object keyed by document id"
                )));
            };
            for (id, fields) in docs {
                source.insert(&CollectionPath::new(path.clone()), id, fields)?;
            }
        }
        Ok(source)
    }

    /// Export every collection in snapshot format.
    pub fn to_snapshot(&self) -> Result<JsonValue, RecordSourceError> {
        let collections = self.read()?;
        let out = collections
            .iter()
            .map(|(path, docs)| {
                let docs = docs
                    .iter()
                    .map(|(id, fields)| (id.clone(), JsonValue::Object(fields.clone())))
                    .collect::<Map<_, _>>();
                (path.clone(), JsonValue::Object(docs))
            })
            .collect::<Map<_, _>>();
        Ok(JsonValue::Object(out))
    }

    /// Insert or replace a document.
    pub fn insert(
        &self,
        collection: &CollectionPath,
        id: impl Into<String>,
        fields: JsonValue,
    ) -> Result<(), RecordSourceError> {
        let id = id.into();
        let JsonValue::Object(fields) = fields else {
            return Err(RecordSourceError::InvalidSnapshot(format!(
                "document '{id}' in {collection} must be an object"
            )));
        };
        let mut collections = self.write()?;
        collections
            .entry(collection.as_str().to_string())
            .or_default()
            .insert(id, fields);
        Ok(())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Collections>, RecordSourceError> {
        self.collections
            .read()
            .map_err(|_| RecordSourceError::Unavailable("lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Collections>, RecordSourceError> {
        self.collections
            .write()
            .map_err(|_| RecordSourceError::Unavailable("lock poisoned".to_string()))
    }
}

#[async_trait::async_trait]
impl RecordSource for InMemoryRecordSource {
    async fn list_ids(
        &self,
        collection: &CollectionPath,
    ) -> Result<Vec<String>, RecordSourceError> {
        let collections = self.read()?;
        Ok(collections
            .get(collection.as_str())
            .map(|docs| docs.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn query(
        &self,
        collection: &CollectionPath,
        filter: &Filter,
    ) -> Result<Vec<Document>, RecordSourceError> {
        let collections = self.read()?;
        Ok(collections
            .get(collection.as_str())
            .into_iter()
            .flatten()
            .filter(|(_, fields)| filter.matches(fields))
            .map(|(id, fields)| Document::new(id.clone(), fields.clone()))
            .collect())
    }

    async fn get(
        &self,
        collection: &CollectionPath,
        id: &str,
    ) -> Result<Option<Document>, RecordSourceError> {
        let collections = self.read()?;
        Ok(collections
            .get(collection.as_str())
            .and_then(|docs| docs.get(id))
            .map(|fields| Document::new(id, fields.clone())))
    }

    async fn update(
        &self,
        collection: &CollectionPath,
        id: &str,
        fields: Map<String, JsonValue>,
    ) -> Result<(), RecordSourceError> {
        let mut collections = self.write()?;
        let doc = collections
            .get_mut(collection.as_str())
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| RecordSourceError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            })?;
        for (path, value) in fields {
            set_path(doc, &path, value);
        }
        Ok(())
    }
}

/// Write `value` at a dotted field path, creating intermediate objects.
fn set_path(fields: &mut Map<String, JsonValue>, path: &str, value: JsonValue) {
    match path.split_once('.') {
        None => {
            fields.insert(path.to_string(), value);
        }
        Some((head, rest)) => {
            let entry = fields
                .entry(head.to_string())
                .or_insert_with(|| JsonValue::Object(Map::new()));
            if !entry.is_object() {
                *entry = JsonValue::Object(Map::new());
            }
            if let JsonValue::Object(inner) = entry {
                set_path(inner, rest, value);
            }
        }
    }
}
