use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use super::{Record, field, query, require, update_record};
use crate::errors::{RecordError, StoreError};
use crate::store::{FieldPath, Filter, StoreHandle};
use crate::ui::html::{self, escape};
use crate::ui::{EditForm, FieldKind, FormField};
use crate::util::{lenient_timestamp, now_iso};

pub const COLLECTION: &str = "team";

/// The only inline-editable team field: the active goal's title.
pub const GOAL_TITLE_FIELD: &str = "goals.0.title";

const NO_GOAL: &str = "No active goal";
const NOT_STARTED: &str = "Not Started";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamMember {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub role: String,
    /// `goals[0]` is the active goal.
    #[serde(default)]
    pub goals: Vec<Goal>,
    #[serde(default, with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "lenient_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl TeamMember {
    pub fn active_goal(&self) -> Option<&Goal> {
        self.goals.first()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TeamInput {
    pub name: String,
    pub role: String,
    pub goal: String,
}

#[derive(Clone)]
pub struct TeamView {
    store: StoreHandle,
}

impl TeamView {
    pub fn new(store: StoreHandle) -> Self {
        Self { store }
    }

    pub async fn list(&self) -> Result<Vec<Record<TeamMember>>, RecordError> {
        query(self.store.as_ref(), COLLECTION, &Filter::All).await
    }

    /// Every member starts with one goal; a blank goal becomes the
    /// "No active goal" placeholder.
    pub async fn create(&self, input: TeamInput) -> Result<String, RecordError> {
        let goal = match input.goal.trim() {
            "" => NO_GOAL.to_string(),
            title => title.to_string(),
        };
        let now = Utc::now();
        let member = TeamMember {
            name: require("name", &input.name)?,
            role: require("role", &input.role)?,
            goals: vec![Goal {
                title: goal,
                status: NOT_STARTED.to_string(),
            }],
            created_at: Some(now),
            updated_at: Some(now),
        };
        let data = serde_json::to_value(&member).map_err(StoreError::from)?;
        let id = self.store.add(COLLECTION, data).await?;
        info!(id = %id, name = %member.name, "Added team member");
        Ok(id)
    }

    /// Inline save from the table. Only the active goal title is editable.
    pub async fn save_field(&self, id: &str, name: &str, value: &str) -> Result<(), RecordError> {
        if name != GOAL_TITLE_FIELD {
            return Err(RecordError::InvalidField {
                field: name.to_string(),
            });
        }
        let path = FieldPath::parse(GOAL_TITLE_FIELD)?;
        update_record(
            self.store.as_ref(),
            COLLECTION,
            id,
            vec![
                (path, json!(value.trim())),
                (field("updatedAt"), json!(now_iso())),
            ],
        )
        .await
    }
}

// ── Rendering ─────────────────────────────────────────────────────────

const COLUMNS: usize = 4;

pub fn render(members: &[Record<TeamMember>]) -> String {
    let rows = if members.is_empty() {
        html::message_row(COLUMNS, "No team members found. Add one using the button above.")
    } else {
        members.iter().map(render_row).collect()
    };
    format!(
        r#"<div class="tab-header"><h2 class="section-title">Team Development &amp; Goals</h2><button class="btn btn-primary" data-form="team/new">+ Add Team Member</button></div>
<div class="table-container"><table class="data-table"><thead><tr><th>Name</th><th>Role</th><th>Active Goal</th><th>Goal Status</th></tr></thead><tbody id="teamTable">{rows}</tbody></table></div>"#
    )
}

pub fn render_error() -> String {
    format!(
        r#"<div class="table-container"><table class="data-table"><tbody>{}</tbody></table></div>"#,
        html::error_row(COLUMNS, "Error loading team data.")
    )
}

fn render_row(record: &Record<TeamMember>) -> String {
    let member = &record.data;
    let (goal, status) = match member.active_goal() {
        Some(g) => (g.title.as_str(), g.status.as_str()),
        None => (NO_GOAL, ""),
    };
    let status_label = if status.is_empty() { "None" } else { status };
    format!(
        r#"<tr data-id="{id}" data-collection="team" data-save-command="team.saveField"><td data-label="Name"><strong>{name}</strong></td><td data-label="Role">{role}</td><td data-label="Active Goal" class="editable-cell" data-field="{GOAL_TITLE_FIELD}" contenteditable="true">{goal}</td><td data-label="Goal Status"><span class="status-badge status-{slug}">{status_label}</span></td></tr>"#,
        id = escape(&record.id),
        name = escape(&member.name),
        role = escape(&member.role),
        goal = escape(goal),
        slug = escape(&status_slug(status_label)),
        status_label = escape(status_label),
    )
}

/// `Not Started` → `not-started`.
fn status_slug(status: &str) -> String {
    status
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .to_lowercase()
}

pub fn new_form() -> EditForm {
    EditForm::new("Add New Team Member", "team.create", "Add Member")
        .field(FormField::new("name", "Name", FieldKind::Text).required())
        .field(FormField::new("role", "Role", FieldKind::Text).required())
        .field(
            FormField::new("goal", "Active Goal", FieldKind::Text)
                .placeholder("e.g., IICRC Certification"),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{DocumentStore, MemoryStore};
    use std::sync::Arc;

    fn view() -> (Arc<MemoryStore>, TeamView) {
        let store = Arc::new(MemoryStore::new());
        (store.clone(), TeamView::new(store))
    }

    fn input(name: &str, goal: &str) -> TeamInput {
        TeamInput {
            name: name.into(),
            role: "Technician".into(),
            goal: goal.into(),
        }
    }

    #[tokio::test]
    async fn test_create_defaults_goal() {
        let (store, team) = view();
        let id = team.create(input("Nate", "  ")).await.unwrap();
        let doc = store.get(COLLECTION, &id).await.unwrap().unwrap();
        assert_eq!(doc.data["goals"][0]["title"], "No active goal");
        assert_eq!(doc.data["goals"][0]["status"], "Not Started");
        assert!(doc.data["createdAt"].is_string());
    }

    #[tokio::test]
    async fn test_save_field_writes_goal_path() {
        let (store, team) = view();
        let id = team.create(input("Josh", "WRT")).await.unwrap();
        team.save_field(&id, "goals.0.title", " IICRC Certification ").await.unwrap();

        let doc = store.get(COLLECTION, &id).await.unwrap().unwrap();
        assert_eq!(doc.data["goals"][0]["title"], "IICRC Certification");
        assert_eq!(doc.data["goals"][0]["status"], "Not Started");
    }

    #[tokio::test]
    async fn test_save_field_rejects_other_fields() {
        let (store, team) = view();
        let id = team.create(input("Hardy", "Lead")).await.unwrap();
        let err = team.save_field(&id, "role", "Manager").await.unwrap_err();
        assert!(matches!(err, RecordError::InvalidField { .. }));
        let doc = store.get(COLLECTION, &id).await.unwrap().unwrap();
        assert_eq!(doc.data["role"], "Technician");
    }

    #[tokio::test]
    async fn test_save_field_missing_member() {
        let (_, team) = view();
        let err = team.save_field("ghost", GOAL_TITLE_FIELD, "x").await.unwrap_err();
        assert!(matches!(err, RecordError::NotFound { .. }));
    }

    #[test]
    fn test_render_member_without_goals() {
        let record = Record {
            id: "m1".into(),
            data: TeamMember {
                name: "Chandler".into(),
                role: "Mid-Lead".into(),
                ..TeamMember::default()
            },
        };
        let html = render(&[record]);
        assert!(html.contains("No active goal"));
        assert!(html.contains(r#"status-badge status-none">None"#));
        assert!(html.contains(r#"data-field="goals.0.title""#));
        assert!(render(&[]).contains("No team members found."));
    }
}
