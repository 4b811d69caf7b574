use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension, params};
use serde_json::Value;

use super::path::apply_updates;
use super::{Document, DocumentStore, FieldPath, Filter, new_document_id};
use crate::errors::StoreError;

/// SQLite-backed document store: one row per document, the body kept as
/// JSON text next to its version stamp.
///
/// Wraps the connection behind `Arc<Mutex>` and runs all access on tokio's
/// blocking thread pool via `spawn_blocking`, so synchronous SQLite I/O never
/// ties up async worker threads.
#[derive(Clone)]
pub struct SqliteStore {
    inner: Arc<Mutex<DocumentDb>>,
}

impl SqliteStore {
    /// Open (or create) the database file and run migrations.
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self::from_db(DocumentDb::new(path)?))
    }

    /// In-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::from_db(DocumentDb::new_in_memory()?))
    }

    fn from_db(db: DocumentDb) -> Self {
        Self {
            inner: Arc::new(Mutex::new(db)),
        }
    }

    /// Run a closure with access to the database on a blocking thread.
    /// All data passed into `f` must be owned (`'static`).
    async fn call<F, R>(&self, f: F) -> Result<R, StoreError>
    where
        F: FnOnce(&DocumentDb) -> Result<R, StoreError> + Send + 'static,
        R: Send + 'static,
    {
        let db = self.inner.clone();
        tokio::task::spawn_blocking(move || {
            let guard = db.lock().map_err(|_| StoreError::LockPoisoned)?;
            f(&guard)
        })
        .await
        .map_err(|e| StoreError::backend(anyhow::anyhow!("store task panicked: {}", e)))?
    }
}

pub struct DocumentDb {
    conn: Connection,
}

impl DocumentDb {
    pub fn new(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).context("Failed to open SQLite database")?;
        let db = Self { conn };
        db.run_migrations().context("Failed to run migrations")?;
        Ok(db)
    }

    pub fn new_in_memory() -> Result<Self> {
        let conn =
            Connection::open_in_memory().context("Failed to open in-memory SQLite database")?;
        let db = Self { conn };
        db.run_migrations().context("Failed to run migrations")?;
        Ok(db)
    }

    fn run_migrations(&self) -> Result<()> {
        self.conn
            .execute_batch(
                "
                CREATE TABLE IF NOT EXISTS documents (
                    collection TEXT NOT NULL,
                    id TEXT NOT NULL,
                    version INTEGER NOT NULL DEFAULT 1,
                    body TEXT NOT NULL,
                    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
                    PRIMARY KEY (collection, id)
                );
                ",
            )
            .context("Failed to create documents table")?;
        Ok(())
    }

    fn version_of(&self, collection: &str, id: &str) -> Result<Option<u64>, StoreError> {
        self.conn
            .query_row(
                "SELECT version FROM documents WHERE collection = ?1 AND id = ?2",
                params![collection, id],
                |row| row.get::<_, i64>(0),
            )
            .optional()
            .map(|v| v.map(|v| v as u64))
            .map_err(StoreError::backend)
    }

    pub fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let row = self
            .conn
            .query_row(
                "SELECT version, body FROM documents WHERE collection = ?1 AND id = ?2",
                params![collection, id],
                |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()
            .map_err(StoreError::backend)?;
        match row {
            Some((version, body)) => Ok(Some(Document {
                id: id.to_string(),
                version: version as u64,
                data: serde_json::from_str(&body)?,
            })),
            None => Ok(None),
        }
    }

    fn write(&self, collection: &str, id: &str, data: &Value, version: u64) -> Result<(), StoreError> {
        let body = serde_json::to_string(data)?;
        self.conn
            .execute(
                "INSERT INTO documents (collection, id, version, body) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(collection, id) DO UPDATE SET
                    version = excluded.version,
                    body = excluded.body,
                    updated_at = datetime('now')",
                params![collection, id, version as i64, body],
            )
            .map_err(StoreError::backend)?;
        Ok(())
    }

    pub fn set(&self, collection: &str, id: &str, data: &Value) -> Result<u64, StoreError> {
        let version = self.version_of(collection, id)?.unwrap_or(0) + 1;
        self.write(collection, id, data, version)?;
        Ok(version)
    }

    pub fn set_if_version(
        &self,
        collection: &str,
        id: &str,
        data: &Value,
        expected: u64,
    ) -> Result<u64, StoreError> {
        let actual = self.version_of(collection, id)?.unwrap_or(0);
        if actual != expected {
            return Err(StoreError::VersionConflict { expected, actual });
        }
        self.write(collection, id, data, actual + 1)?;
        Ok(actual + 1)
    }

    pub fn update(
        &self,
        collection: &str,
        id: &str,
        updates: &[(FieldPath, Value)],
    ) -> Result<u64, StoreError> {
        let Some(mut doc) = self.get(collection, id)? else {
            return Err(StoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        };
        apply_updates(&mut doc.data, updates)?;
        self.write(collection, id, &doc.data, doc.version + 1)?;
        Ok(doc.version + 1)
    }

    pub fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError> {
        let count = self
            .conn
            .execute(
                "DELETE FROM documents WHERE collection = ?1 AND id = ?2",
                params![collection, id],
            )
            .map_err(StoreError::backend)?;
        Ok(count > 0)
    }

    pub fn query(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, version, body FROM documents WHERE collection = ?1 ORDER BY id")
            .map_err(StoreError::backend)?;
        let rows = stmt
            .query_map(params![collection], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })
            .map_err(StoreError::backend)?;

        let mut docs = Vec::new();
        for row in rows {
            let (id, version, body) = row.map_err(StoreError::backend)?;
            let data: Value = serde_json::from_str(&body)?;
            if filter.matches(&data) {
                docs.push(Document {
                    id,
                    version: version as u64,
                    data,
                });
            }
        }
        Ok(docs)
    }
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let (collection, id) = (collection.to_string(), id.to_string());
        self.call(move |db| db.get(&collection, &id)).await
    }

    async fn set(&self, collection: &str, id: &str, data: Value) -> Result<u64, StoreError> {
        let (collection, id) = (collection.to_string(), id.to_string());
        self.call(move |db| db.set(&collection, &id, &data)).await
    }

    async fn set_if_version(
        &self,
        collection: &str,
        id: &str,
        data: Value,
        expected: u64,
    ) -> Result<u64, StoreError> {
        let (collection, id) = (collection.to_string(), id.to_string());
        self.call(move |db| db.set_if_version(&collection, &id, &data, expected))
            .await
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        updates: Vec<(FieldPath, Value)>,
    ) -> Result<u64, StoreError> {
        let (collection, id) = (collection.to_string(), id.to_string());
        self.call(move |db| db.update(&collection, &id, &updates)).await
    }

    async fn add(&self, collection: &str, data: Value) -> Result<String, StoreError> {
        let collection = collection.to_string();
        let id = new_document_id();
        let doc_id = id.clone();
        self.call(move |db| db.set(&collection, &doc_id, &data)).await?;
        Ok(id)
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError> {
        let (collection, id) = (collection.to_string(), id.to_string());
        self.call(move |db| db.delete(&collection, &id)).await
    }

    async fn query(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>, StoreError> {
        let collection = collection.to_string();
        let filter = filter.clone();
        self.call(move |db| db.query(&collection, &filter)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_create_database_and_run_migrations() -> Result<()> {
        let db = DocumentDb::new_in_memory()?;
        let count: i64 = db.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'documents'",
            [],
            |row| row.get(0),
        )?;
        assert_eq!(count, 1);
        Ok(())
    }

    #[test]
    fn test_reopen_file_database_keeps_documents() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("handover.db");
        {
            let db = DocumentDb::new(&path)?;
            db.set("transitionPlans", "main", &json!({"title": "Plan"}))?;
        }
        let db = DocumentDb::new(&path)?;
        let doc = db.get("transitionPlans", "main")?.expect("document persisted");
        assert_eq!(doc.data["title"], "Plan");
        assert_eq!(doc.version, 1);
        Ok(())
    }

    #[test]
    fn test_update_applies_field_path() -> Result<()> {
        let db = DocumentDb::new_in_memory()?;
        db.set(
            "team",
            "m1",
            &json!({"name": "Jacob", "goals": [{"title": "IICRC", "status": "Not Started"}]}),
        )?;
        let version = db.update(
            "team",
            "m1",
            &[(FieldPath::parse("goals.0.title")?, json!("WRT Certification"))],
        )?;
        assert_eq!(version, 2);
        let doc = db.get("team", "m1")?.expect("member exists");
        assert_eq!(doc.data["goals"][0]["title"], "WRT Certification");
        assert_eq!(doc.data["goals"][0]["status"], "Not Started");
        Ok(())
    }

    #[test]
    fn test_set_if_version_conflict_leaves_body() -> Result<()> {
        let db = DocumentDb::new_in_memory()?;
        db.set("plans", "p", &json!({"n": 1}))?;
        db.set("plans", "p", &json!({"n": 2}))?;
        let err = db.set_if_version("plans", "p", &json!({"n": 3}), 1).unwrap_err();
        assert!(matches!(err, StoreError::VersionConflict { expected: 1, actual: 2 }));
        assert_eq!(db.get("plans", "p")?.expect("exists").data["n"], 2);
        Ok(())
    }

    #[test]
    fn test_query_filters_and_orders_by_id() -> Result<()> {
        let db = DocumentDb::new_in_memory()?;
        db.set("actions", "b", &json!({"status": "completed"}))?;
        db.set("actions", "a", &json!({"status": "not-started"}))?;
        db.set("actions", "c", &json!({"status": "in-progress"}))?;

        let all = db.query("actions", &Filter::All)?;
        let ids: Vec<&str> = all.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);

        let pending = db.query(
            "actions",
            &Filter::In(
                "status".into(),
                vec![json!("not-started"), json!("in-progress")],
            ),
        )?;
        assert_eq!(pending.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_async_store_round_trip() {
        let store = SqliteStore::open_in_memory().unwrap();
        let id = store.add("jobs", json!({"name": "Smith basement"})).await.unwrap();
        let doc = store.get("jobs", &id).await.unwrap().unwrap();
        assert_eq!(doc.data["name"], "Smith basement");
        assert!(store.delete("jobs", &id).await.unwrap());
        assert!(store.get("jobs", &id).await.unwrap().is_none());
    }
}
