//! Document store contract and its local implementations.
//!
//! Every module in the dashboard talks to persistent state through
//! [`DocumentStore`]: documents are schemaless JSON values addressed by
//! collection name and document id. Each document carries a store-managed
//! version stamp, bumped on every write, which structural edits use for
//! conditional writes.
//!
//! | Module   | Responsibility                                          |
//! |----------|---------------------------------------------------------|
//! | `path`   | `FieldPath` parsing and dot-path application            |
//! | `memory` | `MemoryStore`: mutex-guarded maps (tests, ephemeral)    |
//! | `sqlite` | `SqliteStore`: one JSON document per row (`rusqlite`)   |

pub mod memory;
pub mod path;
pub mod sqlite;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::errors::StoreError;

pub use memory::MemoryStore;
pub use path::FieldPath;
pub use sqlite::SqliteStore;

/// Shared handle to whichever backend the process was started with.
pub type StoreHandle = Arc<dyn DocumentStore>;

/// A document as read from the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    pub id: String,
    pub version: u64,
    pub data: Value,
}

/// Collection query filter.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    All,
    Eq(String, Value),
    In(String, Vec<Value>),
}

impl Filter {
    pub fn matches(&self, data: &Value) -> bool {
        match self {
            Filter::All => true,
            Filter::Eq(field, expected) => lookup(data, field) == Some(expected),
            Filter::In(field, allowed) => {
                lookup(data, field).is_some_and(|value| allowed.contains(value))
            }
        }
    }
}

fn lookup<'a>(data: &'a Value, field: &str) -> Option<&'a Value> {
    FieldPath::parse(field).ok()?.get(data)
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read a whole document.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    /// Overwrite (or create) a document. Returns the new version.
    async fn set(&self, collection: &str, id: &str, data: Value) -> Result<u64, StoreError>;

    /// Overwrite a document only if its current version equals `expected`.
    /// `expected == 0` means the document must not exist yet.
    async fn set_if_version(
        &self,
        collection: &str,
        id: &str,
        data: Value,
        expected: u64,
    ) -> Result<u64, StoreError>;

    /// Apply partial writes to an existing document.
    async fn update(
        &self,
        collection: &str,
        id: &str,
        updates: Vec<(FieldPath, Value)>,
    ) -> Result<u64, StoreError>;

    /// Insert a document under a generated id.
    async fn add(&self, collection: &str, data: Value) -> Result<String, StoreError>;

    async fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError>;

    /// Documents of a collection matching `filter`, ordered by id.
    async fn query(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>, StoreError>;
}

/// Generate a document id for `add`.
pub fn new_document_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}
