use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::loader::{LoadedPlan, load_plan};
use super::models::{ActionItem, NEW_ITEM_TEXT, PlanLocation, TransitionPlan, WeekPlan};
use crate::errors::{PlanError, StoreError};
use crate::store::{FieldPath, StoreHandle};

/// Attempts for structural writes whose intent survives a re-read.
const MAX_ATTEMPTS: usize = 3;

/// Which scalar of an action item a write targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ItemField {
    Completed,
    Text,
    TargetDate,
}

impl ItemField {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemField::Completed => "completed",
            ItemField::Text => "text",
            ItemField::TargetDate => "targetDate",
        }
    }
}

/// Client reference to one action item: the position it was rendered at,
/// plus its id when the page knows it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRef {
    pub week: String,
    pub index: usize,
    #[serde(default)]
    pub id: Option<String>,
}

impl ItemRef {
    pub fn new(week: impl Into<String>, index: usize) -> Self {
        Self {
            week: week.into(),
            index,
            id: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// Outcome of a single scalar write.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldWrite {
    pub path: String,
    pub value: Value,
    pub version: u64,
}

/// What the client should put back into the element after a failed scalar
/// write.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Revert {
    pub path: String,
    pub value: Value,
}

pub fn item_field_path(week: &str, index: usize, field: ItemField) -> FieldPath {
    FieldPath::from_segments([
        "weeks".to_string(),
        week.to_string(),
        "actionItems".to_string(),
        index.to_string(),
        field.as_str().to_string(),
    ])
}

pub fn learning_path(week: &str, index: usize) -> FieldPath {
    FieldPath::from_segments([
        "weeks".to_string(),
        week.to_string(),
        "learningFocus".to_string(),
        index.to_string(),
    ])
}

/// Translate item edits into store writes against the plan document.
#[derive(Clone)]
pub struct PlanMutator {
    store: StoreHandle,
    location: PlanLocation,
}

impl PlanMutator {
    pub fn new(store: StoreHandle, location: PlanLocation) -> Self {
        Self { store, location }
    }

    pub fn location(&self) -> &PlanLocation {
        &self.location
    }

    pub async fn load(&self) -> Result<LoadedPlan, PlanError> {
        load_plan(self.store.as_ref(), &self.location).await
    }

    pub async fn toggle_completed(
        &self,
        item: &ItemRef,
        completed: bool,
    ) -> Result<FieldWrite, PlanError> {
        self.write_item_field(item, ItemField::Completed, Value::Bool(completed))
            .await
    }

    pub async fn edit_text(&self, item: &ItemRef, text: String) -> Result<FieldWrite, PlanError> {
        self.write_item_field(item, ItemField::Text, Value::String(text))
            .await
    }

    pub async fn edit_date(&self, item: &ItemRef, date: String) -> Result<FieldWrite, PlanError> {
        self.write_item_field(item, ItemField::TargetDate, Value::String(date))
            .await
    }

    pub async fn edit_learning(
        &self,
        week: &str,
        index: usize,
        text: String,
    ) -> Result<FieldWrite, PlanError> {
        let path = learning_path(week, index);
        self.write(path, Value::String(text)).await
    }

    /// Append a blank item to `week` and return the reloaded plan.
    pub async fn add_item(&self, week: &str) -> Result<LoadedPlan, PlanError> {
        let week_key = week.to_string();
        self.modify_weeks(true, |weeks| {
            let week = weeks
                .get_mut(&week_key)
                .ok_or_else(|| PlanError::UnknownWeek {
                    week: week_key.clone(),
                })?;
            week.action_items.push(ActionItem::new(NEW_ITEM_TEXT));
            Ok(())
        })
        .await?;
        info!(week, "Added action item");
        self.load().await
    }

    /// Remove one item. Without `confirmed` nothing is read or written.
    pub async fn delete_item(
        &self,
        item: &ItemRef,
        confirmed: bool,
    ) -> Result<LoadedPlan, PlanError> {
        if !confirmed {
            return Err(PlanError::ConfirmationRequired);
        }
        // Only an id keeps the target meaningful across a re-read.
        let retry = item.id.is_some();
        self.modify_weeks(retry, |weeks| {
            let week = weeks
                .get_mut(&item.week)
                .ok_or_else(|| PlanError::UnknownWeek {
                    week: item.week.clone(),
                })?;
            let index = resolve_index(&item.week, week, item)?;
            week.action_items.remove(index);
            Ok(())
        })
        .await?;
        info!(week = %item.week, index = item.index, "Deleted action item");
        self.load().await
    }

    /// Replace the whole `weeks` map of `base`, conditional on
    /// `expected_version`. `base` is the plan the caller already loaded at that
    /// version. Used by drops, whose page snapshot cannot be re-applied to
    /// newer data.
    pub async fn replace_weeks(
        &self,
        base: TransitionPlan,
        weeks: BTreeMap<String, WeekPlan>,
        expected_version: u64,
    ) -> Result<u64, PlanError> {
        let mut plan = base;
        plan.weeks = weeks;
        let version = self.write_plan(&plan, expected_version).await?;
        debug!(version, "Replaced weeks map");
        Ok(version)
    }

    /// Last-known-good value at `path`, read back from the store. Falls back
    /// to the value the client had before its edit when the read fails.
    pub async fn last_known_good(&self, path: &str, fallback: Value) -> Revert {
        let stored = match (FieldPath::parse(path), self.current_document().await) {
            (Ok(field), Ok(doc)) => field.get(&doc.data).cloned(),
            (_, Err(e)) => {
                warn!(error = %e, path, "Could not re-read plan for revert");
                None
            }
            (Err(_), _) => None,
        };
        Revert {
            path: path.to_string(),
            value: stored.unwrap_or(fallback),
        }
    }

    /// Revert payload for a failed scalar write to `item`. The item is
    /// located the same way the write located it, so a reference resolved by
    /// id reads back its own slot. When the item can no longer be found the
    /// client's pre-edit value is returned unchanged.
    pub async fn revert_item_field(&self, item: &ItemRef, field: ItemField, fallback: Value) -> Revert {
        let client_path = item_field_path(&item.week, item.index, field).to_string();
        let doc = match self.current_document().await {
            Ok(doc) => doc,
            Err(e) => {
                warn!(error = %e, path = %client_path, "Could not re-read plan for revert");
                return Revert {
                    path: client_path,
                    value: fallback,
                };
            }
        };
        let resolved = serde_json::from_value::<TransitionPlan>(doc.data.clone())
            .ok()
            .and_then(|plan| {
                let week = plan.week(&item.week)?;
                resolve_index(&item.week, week, item).ok()
            });
        match resolved {
            Some(index) => {
                let path = item_field_path(&item.week, index, field);
                let value = path.get(&doc.data).cloned().unwrap_or(fallback);
                Revert {
                    path: path.to_string(),
                    value,
                }
            }
            None => Revert {
                path: client_path,
                value: fallback,
            },
        }
    }

    async fn write_item_field(
        &self,
        item: &ItemRef,
        field: ItemField,
        value: Value,
    ) -> Result<FieldWrite, PlanError> {
        let index = match &item.id {
            Some(_) => {
                let loaded = self.load().await?;
                let week = loaded
                    .plan
                    .week(&item.week)
                    .ok_or_else(|| PlanError::UnknownWeek {
                        week: item.week.clone(),
                    })?;
                resolve_index(&item.week, week, item)?
            }
            None => item.index,
        };
        self.write(item_field_path(&item.week, index, field), value)
            .await
    }

    async fn write(&self, path: FieldPath, value: Value) -> Result<FieldWrite, PlanError> {
        let version = self
            .store
            .update(
                &self.location.collection,
                &self.location.document_id,
                vec![(path.clone(), value.clone())],
            )
            .await?;
        debug!(path = %path, version, "Plan field written");
        Ok(FieldWrite {
            path: path.to_string(),
            value,
            version,
        })
    }

    async fn current_document(&self) -> Result<crate::store::Document, PlanError> {
        self.store
            .get(&self.location.collection, &self.location.document_id)
            .await?
            .ok_or_else(|| {
                PlanError::Store(StoreError::NotFound {
                    collection: self.location.collection.clone(),
                    id: self.location.document_id.clone(),
                })
            })
    }

    /// Read-modify-write of the `weeks` map, guarded by the version read.
    async fn modify_weeks<F>(&self, retry: bool, mut edit: F) -> Result<u64, PlanError>
    where
        F: FnMut(&mut BTreeMap<String, WeekPlan>) -> Result<(), PlanError>,
    {
        let attempts = if retry { MAX_ATTEMPTS } else { 1 };
        let mut attempt = 1;
        loop {
            let loaded = self.load().await?;
            let mut plan = loaded.plan;
            edit(&mut plan.weeks)?;
            match self.write_plan(&plan, loaded.version).await {
                Err(PlanError::Store(StoreError::VersionConflict { .. })) if attempt < attempts => {
                    debug!(attempt, "Structural write lost a race, retrying");
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    async fn write_plan(&self, plan: &TransitionPlan, expected: u64) -> Result<u64, PlanError> {
        let data = serde_json::to_value(plan).map_err(StoreError::from)?;
        Ok(self
            .store
            .set_if_version(
                &self.location.collection,
                &self.location.document_id,
                data,
                expected,
            )
            .await?)
    }
}

/// Find the current position of `item` in `week`. With an id, the id wins
/// over a stale index; without one the index must be in range.
pub fn resolve_index(week_key: &str, week: &WeekPlan, item: &ItemRef) -> Result<usize, PlanError> {
    match &item.id {
        Some(id) => {
            let at_index = week
                .action_items
                .get(item.index)
                .and_then(|i| i.id.as_deref());
            if at_index == Some(id.as_str()) {
                return Ok(item.index);
            }
            week.position_of(id).ok_or_else(|| PlanError::StaleReference {
                week: week_key.to_string(),
                id: id.clone(),
            })
        }
        None if item.index < week.action_items.len() => Ok(item.index),
        None => Err(PlanError::ItemOutOfRange {
            week: week_key.to_string(),
            index: item.index,
            len: week.action_items.len(),
        }),
    }
}

/// Convenience for callers that only hold a plan.
pub fn find_item<'a>(plan: &'a TransitionPlan, item: &ItemRef) -> Result<&'a ActionItem, PlanError> {
    let week = plan.week(&item.week).ok_or_else(|| PlanError::UnknownWeek {
        week: item.week.clone(),
    })?;
    let index = resolve_index(&item.week, week, item)?;
    Ok(&week.action_items[index])
}
