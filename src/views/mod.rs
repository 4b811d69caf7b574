//! Record views: one collection each, rendered as a table.
//!
//! | Module     | Collection | Filter                                    |
//! |------------|------------|-------------------------------------------|
//! | `jobs`     | `jobs`     | active/pending/on-hold vs completed        |
//! | `actions`  | `actions`  | not-started/in-progress/on-hold vs done    |
//! | `team`     | `team`     | none                                      |
//! | `training` | `training` | `status == active` vs `completed`         |
//!
//! Each view is a thin service over [`StoreHandle`] plus pure render
//! functions taking the records and an explicit [`ViewState`].

pub mod actions;
pub mod jobs;
pub mod state;
pub mod team;
pub mod training;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::warn;

use serde_json::Value;

use crate::errors::{RecordError, StoreError};
use crate::store::{Document, DocumentStore, FieldPath, Filter};

pub use actions::ActionsView;
pub use jobs::JobsView;
pub use state::{ListFilter, Tab, ViewState};
pub use team::TeamView;
pub use training::TrainingView;

/// A stored record with its document id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record<T> {
    pub id: String,
    #[serde(flatten)]
    pub data: T,
}

pub(crate) fn decode<T: DeserializeOwned>(doc: Document) -> Result<Record<T>, RecordError> {
    let data = serde_json::from_value(doc.data).map_err(StoreError::from)?;
    Ok(Record { id: doc.id, data })
}

/// Fetch one record or fail with `NotFound`.
pub(crate) async fn fetch<T: DeserializeOwned>(
    store: &dyn DocumentStore,
    collection: &str,
    id: &str,
) -> Result<Record<T>, RecordError> {
    let doc = store
        .get(collection, id)
        .await?
        .ok_or_else(|| RecordError::NotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        })?;
    decode(doc)
}

/// Query a collection, skipping documents that no longer decode.
pub(crate) async fn query<T: DeserializeOwned>(
    store: &dyn DocumentStore,
    collection: &str,
    filter: &Filter,
) -> Result<Vec<Record<T>>, RecordError> {
    let docs = store.query(collection, filter).await?;
    let mut records = Vec::with_capacity(docs.len());
    for doc in docs {
        let id = doc.id.clone();
        match decode(doc) {
            Ok(record) => records.push(record),
            Err(e) => warn!(collection, id = %id, error = %e, "Skipping undecodable record"),
        }
    }
    Ok(records)
}

/// Partial write to one record, mapping a missing document to `NotFound`.
pub(crate) async fn update_record(
    store: &dyn DocumentStore,
    collection: &str,
    id: &str,
    updates: Vec<(FieldPath, Value)>,
) -> Result<(), RecordError> {
    match store.update(collection, id, updates).await {
        Ok(_) => Ok(()),
        Err(StoreError::NotFound { collection, id }) => Err(RecordError::NotFound { collection, id }),
        Err(e) => Err(e.into()),
    }
}

/// Single top-level field path.
pub(crate) fn field(name: &str) -> FieldPath {
    FieldPath::from_segments([name])
}

pub(crate) fn date_string(date: chrono::NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Delete after explicit confirmation. A declined confirmation touches
/// nothing.
pub(crate) async fn delete_confirmed(
    store: &dyn DocumentStore,
    collection: &str,
    id: &str,
    confirmed: bool,
) -> Result<(), RecordError> {
    if !confirmed {
        return Err(RecordError::ConfirmationRequired);
    }
    if !store.delete(collection, id).await? {
        return Err(RecordError::NotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        });
    }
    Ok(())
}

pub(crate) fn require(field: &str, value: &str) -> Result<String, RecordError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(RecordError::MissingField {
            field: field.to_string(),
        });
    }
    Ok(value.to_string())
}

/// Parse a closed-set value such as a priority or status.
pub(crate) fn parse_choice<T>(field: &str, value: &str) -> Result<T, RecordError>
where
    T: DeserializeOwned,
{
    serde_json::from_value(serde_json::Value::String(value.trim().to_lowercase())).map_err(|_| {
        RecordError::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
        }
    })
}

/// Shared three-level priority used by jobs and actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    pub const ALL: [&'static str; 3] = ["high", "medium", "low"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }
}
