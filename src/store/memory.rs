use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use super::path::apply_updates;
use super::{Document, DocumentStore, FieldPath, Filter, new_document_id};
use crate::errors::StoreError;

type Collection = BTreeMap<String, (u64, Value)>;

/// In-process store. Nothing survives the process; used by tests and
/// `serve --ephemeral`.
#[derive(Default)]
pub struct MemoryStore {
    collections: Mutex<HashMap<String, Collection>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with<R>(&self, f: impl FnOnce(&mut HashMap<String, Collection>) -> R) -> Result<R, StoreError> {
        let mut guard = self
            .collections
            .lock()
            .map_err(|_| StoreError::LockPoisoned)?;
        Ok(f(&mut *guard))
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        self.with(|cols| {
            cols.get(collection)
                .and_then(|docs| docs.get(id))
                .map(|(version, data)| Document {
                    id: id.to_string(),
                    version: *version,
                    data: data.clone(),
                })
        })
    }

    async fn set(&self, collection: &str, id: &str, data: Value) -> Result<u64, StoreError> {
        self.with(|cols| {
            let docs = cols.entry(collection.to_string()).or_default();
            let version = docs.get(id).map_or(0, |(v, _)| *v) + 1;
            docs.insert(id.to_string(), (version, data));
            version
        })
    }

    async fn set_if_version(
        &self,
        collection: &str,
        id: &str,
        data: Value,
        expected: u64,
    ) -> Result<u64, StoreError> {
        self.with(|cols| {
            let docs = cols.entry(collection.to_string()).or_default();
            let actual = docs.get(id).map_or(0, |(v, _)| *v);
            if actual != expected {
                return Err(StoreError::VersionConflict { expected, actual });
            }
            docs.insert(id.to_string(), (actual + 1, data));
            Ok(actual + 1)
        })?
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        updates: Vec<(FieldPath, Value)>,
    ) -> Result<u64, StoreError> {
        self.with(|cols| {
            let Some((version, data)) = cols.get_mut(collection).and_then(|docs| docs.get_mut(id))
            else {
                return Err(StoreError::NotFound {
                    collection: collection.to_string(),
                    id: id.to_string(),
                });
            };
            apply_updates(data, &updates)?;
            *version += 1;
            Ok(*version)
        })?
    }

    async fn add(&self, collection: &str, data: Value) -> Result<String, StoreError> {
        let id = new_document_id();
        self.with(|cols| {
            cols.entry(collection.to_string())
                .or_default()
                .insert(id.clone(), (1, data));
        })?;
        Ok(id)
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError> {
        self.with(|cols| {
            cols.get_mut(collection)
                .is_some_and(|docs| docs.remove(id).is_some())
        })
    }

    async fn query(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>, StoreError> {
        self.with(|cols| {
            cols.get(collection)
                .map(|docs| {
                    docs.iter()
                        .filter(|(_, (_, data))| filter.matches(data))
                        .map(|(id, (version, data))| Document {
                            id: id.clone(),
                            version: *version,
                            data: data.clone(),
                        })
                        .collect()
                })
                .unwrap_or_default()
        })
    }
}
