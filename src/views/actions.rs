use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::info;

use super::jobs::render_subnav;
use super::{
    ListFilter, Priority, Record, ViewState, date_string, delete_confirmed, fetch, field,
    parse_choice, query, require, update_record,
};
use crate::errors::{RecordError, StoreError};
use crate::store::{FieldPath, Filter, StoreHandle};
use crate::ui::html::{self, escape};
use crate::ui::icons::{COMPLETE_SVG, DELETE_SVG, EDIT_SVG};
use crate::ui::{ConfirmDialog, EditForm, FieldKind, FormField};
use crate::util::{lenient_date, lenient_timestamp, now_iso, parse_date};

pub const COLLECTION: &str = "actions";

pub const STANDARD_CATEGORIES: [&str; 5] = [
    "Morning Responsibilities",
    "Major Projects",
    "Team Development",
    "Training",
    "Process Improvement",
];

/// Select value that switches the category to free text.
const CUSTOM: &str = "custom";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionStatus {
    #[default]
    NotStarted,
    InProgress,
    OnHold,
    Completed,
}

impl ActionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionStatus::NotStarted => "not-started",
            ActionStatus::InProgress => "in-progress",
            ActionStatus::OnHold => "on-hold",
            ActionStatus::Completed => "completed",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ActionStatus::NotStarted => "Not Started",
            ActionStatus::InProgress => "In Progress",
            ActionStatus::OnHold => "On Hold",
            ActionStatus::Completed => "Completed",
        }
    }

    pub fn is_open(&self) -> bool {
        !matches!(self, ActionStatus::Completed)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub category: String,
    #[serde(default, with = "lenient_date")]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: ActionStatus,
    #[serde(default, with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "lenient_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Add/edit dialog values. `categorySelect == "custom"` takes the category
/// from `customCategory`; JSON clients may send `category` directly.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ActionInput {
    pub title: String,
    pub priority: String,
    pub category: String,
    pub category_select: String,
    pub custom_category: String,
    pub due_date: String,
    pub description: String,
    pub status: String,
}

impl ActionInput {
    pub fn resolved_category(&self) -> Result<String, RecordError> {
        let chosen = match self.category_select.trim() {
            CUSTOM => self.custom_category.as_str(),
            "" => self.category.as_str(),
            standard => standard,
        };
        require("category", chosen)
    }

    fn validate(&self) -> Result<Action, RecordError> {
        let priority = if self.priority.trim().is_empty() {
            Priority::default()
        } else {
            parse_choice("priority", &self.priority)?
        };
        let status = if self.status.trim().is_empty() {
            ActionStatus::NotStarted
        } else {
            parse_choice("status", &self.status)?
        };
        let due_date = parse_date(&self.due_date).ok_or_else(|| RecordError::InvalidValue {
            field: "dueDate".into(),
            value: self.due_date.clone(),
        })?;
        Ok(Action {
            title: require("title", &self.title)?,
            priority,
            category: self.resolved_category()?,
            due_date: Some(due_date),
            description: self.description.clone(),
            status,
            created_at: None,
            updated_at: None,
        })
    }
}

#[derive(Clone)]
pub struct ActionsView {
    store: StoreHandle,
}

impl ActionsView {
    pub fn new(store: StoreHandle) -> Self {
        Self { store }
    }

    /// Actions matching `filter`, soonest due first; undated last.
    pub async fn list(&self, filter: ListFilter) -> Result<Vec<Record<Action>>, RecordError> {
        let mut actions: Vec<Record<Action>> = query(self.store.as_ref(), COLLECTION, &Filter::All)
            .await?
            .into_iter()
            .filter(|a: &Record<Action>| match filter {
                ListFilter::Open => a.data.status.is_open(),
                ListFilter::Completed => !a.data.status.is_open(),
            })
            .collect();
        actions.sort_by_key(|a| (a.data.due_date.is_none(), a.data.due_date));
        Ok(actions)
    }

    pub async fn get(&self, id: &str) -> Result<Record<Action>, RecordError> {
        fetch(self.store.as_ref(), COLLECTION, id).await
    }

    /// New actions always start not-started.
    pub async fn create(&self, input: ActionInput) -> Result<String, RecordError> {
        let now = Utc::now();
        let action = Action {
            status: ActionStatus::NotStarted,
            created_at: Some(now),
            updated_at: Some(now),
            ..input.validate()?
        };
        let data = serde_json::to_value(&action).map_err(StoreError::from)?;
        let id = self.store.add(COLLECTION, data).await?;
        info!(id = %id, title = %action.title, "Created action item");
        Ok(id)
    }

    pub async fn edit(&self, id: &str, input: ActionInput) -> Result<(), RecordError> {
        let action = input.validate()?;
        let updates = vec![
            (field("title"), json!(action.title)),
            (field("priority"), json!(action.priority.as_str())),
            (field("category"), json!(action.category)),
            (field("dueDate"), json!(action.due_date.map(date_string))),
            (field("status"), json!(action.status.as_str())),
            (field("description"), json!(action.description)),
            (field("updatedAt"), json!(now_iso())),
        ];
        self.write(id, updates).await
    }

    pub async fn complete(&self, id: &str) -> Result<(), RecordError> {
        self.write(
            id,
            vec![
                (field("status"), json!("completed")),
                (field("updatedAt"), json!(now_iso())),
            ],
        )
        .await
    }

    pub async fn delete(&self, id: &str, confirmed: bool) -> Result<(), RecordError> {
        delete_confirmed(self.store.as_ref(), COLLECTION, id, confirmed).await
    }

    async fn write(&self, id: &str, updates: Vec<(FieldPath, Value)>) -> Result<(), RecordError> {
        update_record(self.store.as_ref(), COLLECTION, id, updates).await
    }
}

// ── Rendering ─────────────────────────────────────────────────────────

const COLUMNS: usize = 6;

pub fn render(actions: &[Record<Action>], state: &ViewState) -> String {
    let rows = if actions.is_empty() {
        html::message_row(COLUMNS, &format!("No {} action items.", state.filter_label()))
    } else {
        actions.iter().map(|a| render_row(a, state)).collect()
    };
    format!(
        r#"<div class="tab-header"><h2 class="section-title">Action Item Tracker</h2><button class="btn btn-primary" data-form="actions/new">+ Add Action Item</button></div>
{subnav}
<div class="table-container"><table class="data-table"><thead><tr><th>Task</th><th>Priority</th><th>Category</th><th>Status</th><th>Due Date</th><th>Actions</th></tr></thead><tbody id="actionsTable">{rows}</tbody></table></div>"#,
        subnav = render_subnav(state),
    )
}

pub fn render_error() -> String {
    format!(
        r#"<div class="table-container"><table class="data-table"><tbody>{}</tbody></table></div>"#,
        html::error_row(COLUMNS, "Error loading action items.")
    )
}

fn render_row(record: &Record<Action>, state: &ViewState) -> String {
    let action = &record.data;
    let args = json!({"id": record.id});
    let delete = ConfirmDialog::new(
        "Delete Action",
        "Are you sure you want to delete this action item?",
        "actions.delete",
        args.clone(),
    )
    .button("icon-btn delete-btn", DELETE_SVG);
    let complete = if state.filter == ListFilter::Open {
        format!(
            r#"<button class="icon-btn complete-btn" title="Complete" data-command="actions.complete" data-args="{}">{COMPLETE_SVG}</button>"#,
            escape(&args.to_string())
        )
    } else {
        String::new()
    };
    format!(
        r#"<tr data-id="{id}"><td data-label="Task"><strong>{title}</strong></td><td data-label="Priority"><span class="priority-badge priority-{priority}">{priority}</span></td><td data-label="Category">{category}</td><td data-label="Status"><span class="status-badge status-{status}">{status_label}</span></td><td data-label="Due Date">{due}</td><td data-label="Actions" class="action-buttons"><button class="icon-btn edit-btn" title="Edit" data-form="actions/edit?id={id}">{EDIT_SVG}</button>{delete}{complete}</td></tr>"#,
        id = escape(&record.id),
        title = escape(&action.title),
        priority = action.priority.as_str(),
        category = escape(&action.category),
        status = action.status.as_str(),
        status_label = action.status.label(),
        due = html::display_optional_date(action.due_date),
    )
}

fn category_choices() -> Vec<(String, String)> {
    STANDARD_CATEGORIES
        .iter()
        .map(|c| (c.to_string(), c.to_string()))
        .chain(std::iter::once((CUSTOM.to_string(), "-- Add Custom --".to_string())))
        .collect()
}

fn priority_choices() -> Vec<(String, String)> {
    Priority::ALL
        .iter()
        .map(|p| (p.to_string(), html::capitalize(p)))
        .collect()
}

pub fn new_form() -> EditForm {
    EditForm::new("Add New Action Item", "actions.create", "Add Action")
        .field(FormField::new("title", "Title", FieldKind::Text).required())
        .field(
            FormField::new("priority", "Priority", FieldKind::Select(priority_choices()))
                .value("high")
                .required(),
        )
        .field(
            FormField::new("categorySelect", "Category", FieldKind::Select(category_choices()))
                .value(STANDARD_CATEGORIES[0])
                .required(),
        )
        .field(
            FormField::new("customCategory", "Custom Category", FieldKind::Text)
                .placeholder("Enter custom category"),
        )
        .field(FormField::new("dueDate", "Due Date", FieldKind::Date).required())
        .field(FormField::new("description", "Description", FieldKind::TextArea))
}

pub fn edit_form(record: &Record<Action>) -> EditForm {
    let action = &record.data;
    let is_custom = !STANDARD_CATEGORIES.contains(&action.category.as_str());
    let statuses = [
        ActionStatus::NotStarted,
        ActionStatus::InProgress,
        ActionStatus::Completed,
        ActionStatus::OnHold,
    ]
    .iter()
    .map(|s| (s.as_str().to_string(), s.label().to_string()))
    .collect();

    EditForm::new("Edit Action Item", "actions.edit", "Save Changes")
        .field(FormField::hidden("id", &record.id))
        .field(FormField::new("title", "Task Title", FieldKind::Text).value(&action.title).required())
        .field(
            FormField::new("priority", "Priority", FieldKind::Select(priority_choices()))
                .value(action.priority.as_str())
                .required(),
        )
        .field(
            FormField::new("categorySelect", "Category", FieldKind::Select(category_choices()))
                .value(if is_custom { CUSTOM } else { action.category.as_str() }),
        )
        .field(
            FormField::new("customCategory", "Custom Category", FieldKind::Text)
                .value(if is_custom { action.category.as_str() } else { "" })
                .placeholder("Enter custom category"),
        )
        .field(
            FormField::new("dueDate", "Due Date", FieldKind::Date)
                .value(action.due_date.map(date_string).unwrap_or_default())
                .required(),
        )
        .field(
            FormField::new("status", "Status", FieldKind::Select(statuses))
                .value(action.status.as_str())
                .required(),
        )
        .field(FormField::new("description", "Description", FieldKind::TextArea).value(&action.description))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::views::Tab;
    use std::sync::Arc;

    fn view() -> ActionsView {
        ActionsView::new(Arc::new(MemoryStore::new()))
    }

    fn input(title: &str, due: &str) -> ActionInput {
        ActionInput {
            title: title.into(),
            priority: "medium".into(),
            category_select: "Training".into(),
            due_date: due.into(),
            ..ActionInput::default()
        }
    }

    #[test]
    fn test_resolved_category() {
        let mut custom = input("x", "2025-01-01");
        custom.category_select = "custom".into();
        custom.custom_category = "Fleet".into();
        assert_eq!(custom.resolved_category().unwrap(), "Fleet");

        custom.custom_category = "  ".into();
        assert!(matches!(
            custom.resolved_category(),
            Err(RecordError::MissingField { .. })
        ));

        let direct = ActionInput {
            category: "Major Projects".into(),
            ..ActionInput::default()
        };
        assert_eq!(direct.resolved_category().unwrap(), "Major Projects");
    }

    #[tokio::test]
    async fn test_list_sorted_by_due_date() {
        let actions = view();
        actions.create(input("late", "2025-09-01")).await.unwrap();
        actions.create(input("soon", "2025-02-01")).await.unwrap();
        actions.create(input("middle", "2025-05-01")).await.unwrap();

        let titles: Vec<String> = actions
            .list(ListFilter::Open)
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.data.title)
            .collect();
        assert_eq!(titles, vec!["soon", "middle", "late"]);
    }

    #[tokio::test]
    async fn test_new_action_starts_not_started_and_completes() {
        let actions = view();
        let mut with_status = input("Audit trucks", "2025-03-03");
        with_status.status = "completed".into();
        let id = actions.create(with_status).await.unwrap();
        assert_eq!(actions.get(&id).await.unwrap().data.status, ActionStatus::NotStarted);

        actions.complete(&id).await.unwrap();
        assert!(actions.list(ListFilter::Open).await.unwrap().is_empty());
        assert_eq!(actions.list(ListFilter::Completed).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_edit_switches_to_custom_category() {
        let actions = view();
        let id = actions.create(input("Routing", "2025-03-03")).await.unwrap();
        let mut edit = input("Routing calls", "2025-03-10");
        edit.category_select = "custom".into();
        edit.custom_category = "Dispatch".into();
        edit.status = "in-progress".into();
        actions.edit(&id, edit).await.unwrap();

        let action = actions.get(&id).await.unwrap().data;
        assert_eq!(action.category, "Dispatch");
        assert_eq!(action.status, ActionStatus::InProgress);
        assert_eq!(action.due_date, NaiveDate::from_ymd_opt(2025, 3, 10));
    }

    #[test]
    fn test_render_status_badge_and_empty_message() {
        let state = ViewState::new(Tab::Actions, ListFilter::Open);
        assert!(render(&[], &state).contains("No pending action items."));
        let record = Record {
            id: "a1".into(),
            data: Action {
                title: "Huddle".into(),
                status: ActionStatus::InProgress,
                ..Action::default()
            },
        };
        let html = render(&[record], &state);
        assert!(html.contains(r#"status-badge status-in-progress">In Progress"#));
    }

    #[test]
    fn test_edit_form_marks_custom_category() {
        let record = Record {
            id: "a2".into(),
            data: Action {
                category: "Fleet".into(),
                ..Action::default()
            },
        };
        let html = edit_form(&record).to_html();
        assert!(html.contains(r#"<option value="custom" selected>"#));
        assert!(html.contains(r#"name="customCategory" value="Fleet""#));
    }
}
