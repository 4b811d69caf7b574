use serde_json::Value;
use tracing::{debug, warn};

use super::models::{PlanLocation, REQUIRED_WEEKS, TransitionPlan};
use super::template::default_plan;
use crate::errors::{PlanError, StoreError};
use crate::store::{Document, DocumentStore};

/// Result of a structural inspection of the raw plan document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanHealth {
    Healthy,
    Missing,
    Corrupt(String),
}

/// A plan as read from the store, with the version it was read at.
#[derive(Debug, Clone)]
pub struct LoadedPlan {
    pub plan: TransitionPlan,
    pub version: u64,
    /// Whether this load overwrote the document with the default template.
    pub repaired: bool,
}

/// Check the raw document shape. A plan is corrupt when `weeks` is absent or
/// not a map, when any of `week1`..`week6` is absent, or when any week's
/// `actionItems` is absent or not an array.
pub fn inspect(data: &Value) -> PlanHealth {
    let Some(weeks) = data.get("weeks") else {
        return PlanHealth::Corrupt("weeks is missing".into());
    };
    let Some(weeks) = weeks.as_object() else {
        return PlanHealth::Corrupt("weeks is not a map".into());
    };
    for key in REQUIRED_WEEKS {
        if !weeks.contains_key(key) {
            return PlanHealth::Corrupt(format!("weeks.{key} is missing"));
        }
    }
    for (key, week) in weeks {
        if !week.is_object() {
            return PlanHealth::Corrupt(format!("weeks.{key} is not a map"));
        }
        match week.get("actionItems") {
            Some(Value::Array(_)) => {}
            None => return PlanHealth::Corrupt(format!("weeks.{key}.actionItems is missing")),
            Some(_) => {
                return PlanHealth::Corrupt(format!("weeks.{key}.actionItems is not an array"));
            }
        }
    }
    PlanHealth::Healthy
}

/// Load the plan, repairing it from the default template when it is absent
/// or structurally invalid, and back-filling item ids on legacy documents.
pub async fn load_plan(
    store: &dyn DocumentStore,
    location: &PlanLocation,
) -> Result<LoadedPlan, PlanError> {
    let doc = store.get(&location.collection, &location.document_id).await?;
    let health = doc.as_ref().map_or(PlanHealth::Missing, |d| inspect(&d.data));

    let (doc, repaired) = match health {
        PlanHealth::Healthy => match doc {
            Some(doc) => (doc, false),
            None => (repair(store, location, "document vanished").await?, true),
        },
        PlanHealth::Missing => (repair(store, location, "plan document is missing").await?, true),
        PlanHealth::Corrupt(reason) => (repair(store, location, &reason).await?, true),
    };

    let plan = match serde_json::from_value::<TransitionPlan>(doc.data.clone()) {
        Ok(plan) => plan,
        Err(e) if !repaired => {
            let reason = format!("plan does not deserialize: {e}");
            let doc = repair(store, location, &reason).await?;
            return finish(store, location, doc, true).await;
        }
        Err(e) => return Err(PlanError::Malformed(e.to_string())),
    };

    backfill(store, location, plan, doc.version, repaired).await
}

async fn finish(
    store: &dyn DocumentStore,
    location: &PlanLocation,
    doc: Document,
    repaired: bool,
) -> Result<LoadedPlan, PlanError> {
    let plan: TransitionPlan = serde_json::from_value(doc.data)
        .map_err(|e| PlanError::Malformed(e.to_string()))?;
    backfill(store, location, plan, doc.version, repaired).await
}

/// Overwrite the plan with the default template, then re-read the
/// authoritative copy.
async fn repair(
    store: &dyn DocumentStore,
    location: &PlanLocation,
    reason: &str,
) -> Result<Document, PlanError> {
    warn!(
        collection = %location.collection,
        id = %location.document_id,
        reason,
        "Transition plan is missing or corrupt, rewriting from default template"
    );
    write_default(store, location).await?;
    store
        .get(&location.collection, &location.document_id)
        .await?
        .ok_or_else(|| {
            PlanError::Store(StoreError::NotFound {
                collection: location.collection.clone(),
                id: location.document_id.clone(),
            })
        })
}

/// Unconditionally overwrite the plan document with a fresh default.
pub async fn write_default(
    store: &dyn DocumentStore,
    location: &PlanLocation,
) -> Result<u64, PlanError> {
    let data = serde_json::to_value(default_plan()).map_err(StoreError::from)?;
    Ok(store
        .set(&location.collection, &location.document_id, data)
        .await?)
}

async fn backfill(
    store: &dyn DocumentStore,
    location: &PlanLocation,
    mut plan: TransitionPlan,
    version: u64,
    repaired: bool,
) -> Result<LoadedPlan, PlanError> {
    let assigned = plan.backfill_ids();
    if assigned == 0 {
        return Ok(LoadedPlan {
            plan,
            version,
            repaired,
        });
    }

    let data = serde_json::to_value(&plan).map_err(StoreError::from)?;
    match store
        .set_if_version(&location.collection, &location.document_id, data, version)
        .await
    {
        Ok(version) => {
            debug!(assigned, version, "Back-filled action item ids");
            Ok(LoadedPlan {
                plan,
                version,
                repaired,
            })
        }
        Err(StoreError::VersionConflict { .. }) => {
            // Someone else wrote in between; take their copy as-is.
            let doc = store
                .get(&location.collection, &location.document_id)
                .await?
                .ok_or_else(|| PlanError::Malformed("plan disappeared during load".into()))?;
            let plan = serde_json::from_value(doc.data)
                .map_err(|e| PlanError::Malformed(e.to_string()))?;
            Ok(LoadedPlan {
                plan,
                version: doc.version,
                repaired,
            })
        }
        Err(e) => Err(e.into()),
    }
}
