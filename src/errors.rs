//! Typed error hierarchy for the dashboard.
//!
//! Three top-level enums cover the three layers:
//! - `StoreError`: document store reads, writes and field-path addressing
//! - `PlanError`: transition plan synchronization (mutator, drag engine)
//! - `RecordError`: the record views (jobs, actions, team, training)

use thiserror::Error;

/// Errors from the document store layer.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Document {collection}/{id} not found")]
    NotFound { collection: String, id: String },

    #[error("Version conflict: expected {expected}, found {actual}")]
    VersionConflict { expected: u64, actual: u64 },

    #[error("Invalid field path '{path}': {message}")]
    InvalidPath { path: String, message: String },

    #[error("Field path '{path}' does not resolve at segment '{segment}'")]
    PathNotFound { path: String, segment: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store lock poisoned")]
    LockPoisoned,

    #[error("Store backend error: {0}")]
    Backend(#[source] anyhow::Error),
}

/// Errors from the transition plan synchronization model.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("Unknown week '{week}'")]
    UnknownWeek { week: String },

    #[error("Item {index} out of range for {week} ({len} items)")]
    ItemOutOfRange {
        week: String,
        index: usize,
        len: usize,
    },

    #[error("Item {id} no longer exists in {week}")]
    StaleReference { week: String, id: String },

    #[error("Deleting an item requires confirmation")]
    ConfirmationRequired,

    #[error("Invalid drag transition: {0}")]
    InvalidDrag(String),

    #[error("Plan document is malformed: {0}")]
    Malformed(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors from the record views.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("{collection} record {id} not found")]
    NotFound { collection: String, id: String },

    #[error("Field '{field}' is not editable")]
    InvalidField { field: String },

    #[error("Invalid {field} value '{value}'")]
    InvalidValue { field: String, value: String },

    #[error("Training week {index} out of range ({len} weeks)")]
    WeekOutOfRange { index: usize, len: usize },

    #[error("Deleting a record requires confirmation")]
    ConfirmationRequired,

    #[error("Field '{field}' is required")]
    MissingField { field: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl StoreError {
    pub fn backend(err: impl Into<anyhow::Error>) -> Self {
        Self::Backend(err.into())
    }
}
