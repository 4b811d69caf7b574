use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::info;

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

pub const COLLECTION: &str = "jobs";

pub const ASSIGNEES: [&str; 5] = ["jacob", "hardy", "chandler", "nate", "josh"];

/// Fields editable in place from the table.
pub const INLINE_FIELDS: [&str; 6] = [
    "name",
    "slackChannel",
    "priority",
    "status",
    "assignee",
    "targetDate",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobStatus {
    #[default]
    Active,
    Pending,
    OnHold,
    Completed,
}

impl JobStatus {
    pub const ALL: [&'static str; 4] = ["active", "pending", "on-hold", "completed"];
    pub const OPEN: [&'static str; 3] = ["active", "pending", "on-hold"];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Active => "active",
            JobStatus::Pending => "pending",
            JobStatus::OnHold => "on-hold",
            JobStatus::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slack_channel: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub status: JobStatus,
    #[serde(default, with = "lenient_date")]
    pub target_date: Option<NaiveDate>,
    #[serde(default)]
    pub assignee: String,
    #[serde(default)]
    pub issue: String,
    #[serde(default)]
    pub next_action: String,
    #[serde(default, with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "lenient_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Job form values as submitted by the add and edit dialogs.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JobInput {
    pub name: String,
    pub slack_channel: String,
    pub priority: String,
    pub status: String,
    pub target_date: String,
    pub assignee: String,
    pub issue: String,
    pub next_action: String,
}

/// One row of the batch-add dialog.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BatchJobRow {
    pub name: String,
    pub slack_channel: String,
    pub priority: String,
    pub assignee: String,
    pub target_date: String,
}

impl JobInput {
    fn validate(&self) -> Result<Job, RecordError> {
        let priority = if self.priority.trim().is_empty() {
            Priority::default()
        } else {
            parse_choice("priority", &self.priority)?
        };
        let status = if self.status.trim().is_empty() {
            JobStatus::Active
        } else {
            parse_choice("status", &self.status)?
        };
        Ok(Job {
            name: require("name", &self.name)?,
            slack_channel: self.slack_channel.trim().to_string(),
            priority,
            status,
            target_date: Some(parse_target_date(&self.target_date)?),
            assignee: validate_assignee(&self.assignee)?,
            issue: self.issue.clone(),
            next_action: self.next_action.clone(),
            created_at: None,
            updated_at: None,
        })
    }
}

fn parse_target_date(raw: &str) -> Result<NaiveDate, RecordError> {
    parse_date(raw).ok_or_else(|| RecordError::InvalidValue {
        field: "targetDate".into(),
        value: raw.to_string(),
    })
}

fn validate_assignee(raw: &str) -> Result<String, RecordError> {
    let value = raw.trim().to_lowercase();
    if ASSIGNEES.contains(&value.as_str()) {
        Ok(value)
    } else {
        Err(RecordError::InvalidValue {
            field: "assignee".into(),
            value: raw.to_string(),
        })
    }
}

#[derive(Clone)]
pub struct JobsView {
    store: StoreHandle,
}

impl JobsView {
    pub fn new(store: StoreHandle) -> Self {
        Self { store }
    }

    pub async fn list(&self, filter: ListFilter) -> Result<Vec<Record<Job>>, RecordError> {
        let filter = match filter {
            ListFilter::Open => Filter::In(
                "status".into(),
                JobStatus::OPEN.iter().map(|s| json!(s)).collect(),
            ),
            ListFilter::Completed => Filter::Eq("status".into(), json!("completed")),
        };
        query(self.store.as_ref(), COLLECTION, &filter).await
    }

    pub async fn get(&self, id: &str) -> Result<Record<Job>, RecordError> {
        fetch(self.store.as_ref(), COLLECTION, id).await
    }

    pub async fn create(&self, input: JobInput) -> Result<String, RecordError> {
        let now = Utc::now();
        let job = Job {
            created_at: Some(now),
            updated_at: Some(now),
            ..input.validate()?
        };
        let data = serde_json::to_value(&job).map_err(StoreError::from)?;
        let id = self.store.add(COLLECTION, data).await?;
        info!(id = %id, name = %job.name, "Created job");
        Ok(id)
    }

    /// Add every row that has a name and a target date; other rows are
    /// skipped. New jobs start active with an empty issue and next action.
    pub async fn create_batch(&self, rows: Vec<BatchJobRow>) -> Result<Vec<String>, RecordError> {
        let inputs: Vec<JobInput> = rows
            .into_iter()
            .filter(|row| !row.name.trim().is_empty() && !row.target_date.trim().is_empty())
            .map(|row| JobInput {
                name: row.name,
                slack_channel: row.slack_channel,
                priority: row.priority,
                status: "active".into(),
                target_date: row.target_date,
                assignee: row.assignee,
                ..JobInput::default()
            })
            .collect();
        // Validate everything before the first write.
        for input in &inputs {
            input.validate()?;
        }
        let mut ids = Vec::with_capacity(inputs.len());
        for input in inputs {
            ids.push(self.create(input).await?);
        }
        Ok(ids)
    }

    /// Replace the editable fields from the edit dialog.
    pub async fn edit(&self, id: &str, input: JobInput) -> Result<(), RecordError> {
        let job = input.validate()?;
        let updates = vec![
            (field("name"), json!(job.name)),
            (field("slackChannel"), json!(job.slack_channel)),
            (field("priority"), json!(job.priority.as_str())),
            (field("status"), json!(job.status.as_str())),
            (field("targetDate"), json!(job.target_date.map(date_string))),
            (field("assignee"), json!(job.assignee)),
            (field("issue"), json!(job.issue)),
            (field("nextAction"), json!(job.next_action)),
            (field("updatedAt"), json!(now_iso())),
        ];
        self.write(id, updates).await
    }

    /// In-place edit of one table cell.
    pub async fn update_field(&self, id: &str, name: &str, value: &str) -> Result<(), RecordError> {
        if !INLINE_FIELDS.contains(&name) {
            return Err(RecordError::InvalidField {
                field: name.to_string(),
            });
        }
        let value: Value = match name {
            "name" => json!(require("name", value)?),
            "priority" => json!(parse_choice::<Priority>("priority", value)?.as_str()),
            "status" => json!(parse_choice::<JobStatus>("status", value)?.as_str()),
            "assignee" => json!(validate_assignee(value)?),
            "targetDate" => json!(date_string(parse_target_date(value)?)),
            _ => json!(value.trim()),
        };
        self.write(id, vec![(field(name), value), (field("updatedAt"), json!(now_iso()))])
            .await
    }

    pub async fn complete(&self, id: &str) -> Result<(), RecordError> {
        self.write(
            id,
            vec![
                (field("status"), json!("completed")),
                (field("updatedAt"), json!(now_iso())),
            ],
        )
        .await?;
        info!(id, "Completed job");
        Ok(())
    }

    pub async fn delete(&self, id: &str, confirmed: bool) -> Result<(), RecordError> {
        delete_confirmed(self.store.as_ref(), COLLECTION, id, confirmed).await
    }

    async fn write(&self, id: &str, updates: Vec<(FieldPath, Value)>) -> Result<(), RecordError> {
        update_record(self.store.as_ref(), COLLECTION, id, updates).await
    }
}

// ── Rendering ─────────────────────────────────────────────────────────

const COLUMNS: usize = 7;

pub fn render(jobs: &[Record<Job>], state: &ViewState) -> String {
    let rows = if jobs.is_empty() {
        html::message_row(COLUMNS, &format!("No {} jobs found.", state.filter_label()))
    } else {
        jobs.iter().map(|job| render_row(job, state)).collect()
    };
    format!(
        r#"<div class="tab-header"><h2 class="section-title">Job Management</h2><div><button class="btn btn-secondary" data-form="jobs/batch">Batch Add Jobs</button> <button class="btn btn-primary" data-form="jobs/new">+ Add Job</button></div></div>
{subnav}
<div class="table-container"><table class="data-table"><thead><tr><th>Job Name</th><th>Slack</th><th>Priority</th><th>Status</th><th>Assigned To</th><th>Target Date</th><th>Actions</th></tr></thead><tbody id="jobsTable">{rows}</tbody></table></div>"#,
        subnav = render_subnav(state),
    )
}

pub fn render_error() -> String {
    table_shell(&html::error_row(COLUMNS, "Error loading jobs."))
}

fn table_shell(body: &str) -> String {
    format!(r#"<div class="table-container"><table class="data-table"><tbody>{body}</tbody></table></div>"#)
}

pub(crate) fn render_subnav(state: &ViewState) -> String {
    let open = state.tab.open_label();
    let (open_cls, done_cls) = match state.filter {
        ListFilter::Open => (" active", ""),
        ListFilter::Completed => ("", " active"),
    };
    format!(
        r#"<div class="sub-nav" data-tab="{tab}"><button class="sub-tab{open_cls}" data-filter="{open}">{label}</button><button class="sub-tab{done_cls}" data-filter="completed">Completed</button></div>"#,
        tab = state.tab.as_str(),
        label = html::capitalize(open),
    )
}

fn render_row(record: &Record<Job>, state: &ViewState) -> String {
    let job = &record.data;
    let id = escape(&record.id);
    let args = json!({"id": record.id});
    let delete = ConfirmDialog::new(
        "Delete Job",
        "Are you sure you want to permanently delete this job?",
        "jobs.delete",
        args.clone(),
    )
    .button("icon-btn delete-btn", DELETE_SVG);
    let complete = match state.filter {
        ListFilter::Open => format!(
            r#"<button class="icon-btn complete-btn" title="Complete Job" data-command="jobs.complete" data-args="{}">{COMPLETE_SVG}</button>"#,
            escape(&args.to_string())
        ),
        ListFilter::Completed => String::new(),
    };
    let date_value = job
        .target_date
        .map(date_string)
        .unwrap_or_default();

    format!(
        r#"<tr data-id="{id}" data-collection="jobs">
<td data-label="Job Name" class="editable-cell" data-field="name" contenteditable="true">{name}</td>
<td data-label="Slack" class="editable-cell" data-field="slackChannel" contenteditable="true">{slack}</td>
<td data-label="Priority" class="editable-cell select-edit" data-field="priority" data-options="{priorities}">{priority}</td>
<td data-label="Status" class="editable-cell select-edit" data-field="status" data-options="{statuses}">{status}</td>
<td data-label="Assigned To" class="editable-cell select-edit" data-field="assignee" data-options="{assignees}">{assignee}</td>
<td data-label="Target Date" class="editable-cell date-edit" data-field="targetDate" data-value="{date_value}">{date}</td>
<td data-label="Actions" class="action-buttons"><button class="icon-btn edit-btn" title="Edit Job (Advanced)" data-form="jobs/edit?id={id}">{EDIT_SVG}</button>{delete}{complete}</td>
</tr>"#,
        name = escape(&job.name),
        slack = escape(&job.slack_channel),
        priorities = Priority::ALL.join(","),
        priority = job.priority.as_str(),
        statuses = JobStatus::ALL.join(","),
        status = job.status.as_str(),
        assignees = ASSIGNEES.join(","),
        assignee = escape(&job.assignee),
        date = html::display_optional_date(job.target_date),
    )
}

fn choices(values: &[&str]) -> Vec<(String, String)> {
    values
        .iter()
        .map(|v| (v.to_string(), html::capitalize(v)))
        .collect()
}

fn status_choices() -> Vec<(String, String)> {
    vec![
        ("active".into(), "Active".into()),
        ("pending".into(), "Pending".into()),
        ("completed".into(), "Completed".into()),
        ("on-hold".into(), "On Hold".into()),
    ]
}

fn job_fields(form: EditForm, job: &Job) -> EditForm {
    form.field(FormField::new("name", "Job Name", FieldKind::Text).value(&job.name).required())
        .field(
            FormField::new("slackChannel", "Slack Channel Link", FieldKind::Url)
                .value(&job.slack_channel)
                .placeholder("https://slack.com/channels/..."),
        )
        .field(
            FormField::new("priority", "Priority", FieldKind::Select(choices(&Priority::ALL)))
                .value(job.priority.as_str())
                .required(),
        )
        .field(
            FormField::new("status", "Status", FieldKind::Select(status_choices()))
                .value(job.status.as_str())
                .required(),
        )
        .field(
            FormField::new("targetDate", "Target Date", FieldKind::Date)
                .value(job.target_date.map(date_string).unwrap_or_default())
                .required(),
        )
        .field(
            FormField::new("assignee", "Assigned To", FieldKind::Select(choices(&ASSIGNEES)))
                .value(&job.assignee)
                .required(),
        )
        .field(FormField::new("issue", "Issue Description", FieldKind::TextArea).value(&job.issue))
        .field(FormField::new("nextAction", "Next Action", FieldKind::TextArea).value(&job.next_action))
}

pub fn new_form() -> EditForm {
    let blank = Job {
        assignee: ASSIGNEES[0].to_string(),
        ..Job::default()
    };
    job_fields(EditForm::new("Add New Job", "jobs.create", "Add Job"), &blank)
}

pub fn edit_form(record: &Record<Job>) -> EditForm {
    job_fields(
        EditForm::new("Edit Job", "jobs.edit", "Save Changes").field(FormField::hidden("id", &record.id)),
        &record.data,
    )
}

/// Batch dialog: a table of rows, with a hidden template row the client
/// clones for "+ Add Row".
pub fn batch_form() -> String {
    let row = format!(
        r#"<tr class="batch-row"><td data-label="Job Name"><input type="text" class="form-input" name="name"></td><td data-label="Slack Channel"><input type="url" class="form-input" name="slackChannel" placeholder="https://slack.com/..."></td><td data-label="Priority"><select class="form-select" name="priority">{priorities}</select></td><td data-label="Assigned To"><select class="form-select" name="assignee">{assignees}</select></td><td data-label="Target Date"><input type="date" class="form-input" name="targetDate"></td><td class="action-buttons"><button type="button" class="icon-btn delete-btn remove-row-btn" title="Remove Row">{DELETE_SVG}</button></td></tr>"#,
        priorities = html::options(&Priority::ALL, "medium"),
        assignees = html::options(&ASSIGNEES, "jacob"),
    );
    format!(
        r#"<form class="modal-form batch-form" data-command="jobs.batchCreate" data-title="Batch Add Jobs"><div class="table-container"><table class="data-table"><thead><tr><th>Job Name</th><th>Slack Channel</th><th>Priority</th><th>Assigned To</th><th>Target Date</th><th></th></tr></thead><tbody>{row}</tbody></table></div><template class="batch-row-template">{row}</template><div class="action-buttons"><button type="button" class="btn btn-secondary add-row-btn">+ Add Row</button><button type="submit" class="btn btn-primary">Submit All Jobs</button></div></form>"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{DocumentStore, MemoryStore};
    use crate::views::Tab;
    use std::sync::Arc;

    fn view() -> (Arc<MemoryStore>, JobsView) {
        let store = Arc::new(MemoryStore::new());
        (store.clone(), JobsView::new(store))
    }

    fn input(name: &str, status: &str) -> JobInput {
        JobInput {
            name: name.into(),
            priority: "high".into(),
            status: status.into(),
            target_date: "2025-04-15".into(),
            assignee: "hardy".into(),
            ..JobInput::default()
        }
    }

    #[tokio::test]
    async fn test_create_writes_wire_shape() {
        let (store, jobs) = view();
        let id = jobs.create(input("Smith basement", "")).await.unwrap();
        let doc = store.get(COLLECTION, &id).await.unwrap().unwrap();
        assert_eq!(doc.data["name"], "Smith basement");
        assert_eq!(doc.data["status"], "active");
        assert_eq!(doc.data["priority"], "high");
        assert_eq!(doc.data["targetDate"], "2025-04-15");
        assert_eq!(doc.data["slackChannel"], "");
        assert!(doc.data["createdAt"].as_str().unwrap().ends_with('Z'));
    }

    #[tokio::test]
    async fn test_status_filter_splits_open_and_completed() {
        let (_store, jobs) = view();
        for (name, status) in [
            ("a", "active"),
            ("b", "pending"),
            ("c", "on-hold"),
            ("d", "completed"),
        ] {
            jobs.create(input(name, status)).await.unwrap();
        }
        let open = jobs.list(ListFilter::Open).await.unwrap();
        assert_eq!(open.len(), 3);
        assert!(open.iter().all(|j| j.data.status != JobStatus::Completed));
        let done = jobs.list(ListFilter::Completed).await.unwrap();
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].data.name, "d");
    }

    #[tokio::test]
    async fn test_batch_skips_incomplete_rows() {
        let (_store, jobs) = view();
        let rows = vec![
            BatchJobRow {
                name: "One".into(),
                priority: "low".into(),
                assignee: "nate".into(),
                target_date: "2025-05-01".into(),
                ..BatchJobRow::default()
            },
            BatchJobRow {
                name: "No date".into(),
                assignee: "nate".into(),
                ..BatchJobRow::default()
            },
            BatchJobRow {
                target_date: "2025-05-02".into(),
                ..BatchJobRow::default()
            },
        ];
        let ids = jobs.create_batch(rows).await.unwrap();
        assert_eq!(ids.len(), 1);
        let job = jobs.get(&ids[0]).await.unwrap();
        assert_eq!(job.data.status, JobStatus::Active);
        assert_eq!(job.data.issue, "");
    }

    #[tokio::test]
    async fn test_update_field_validates() {
        let (_store, jobs) = view();
        let id = jobs.create(input("Roof", "active")).await.unwrap();
        jobs.update_field(&id, "status", "on-hold").await.unwrap();
        jobs.update_field(&id, "assignee", "Josh").await.unwrap();
        let job = jobs.get(&id).await.unwrap().data;
        assert_eq!(job.status, JobStatus::OnHold);
        assert_eq!(job.assignee, "josh");

        assert!(matches!(
            jobs.update_field(&id, "status", "archived").await,
            Err(RecordError::InvalidValue { .. })
        ));
        assert!(matches!(
            jobs.update_field(&id, "createdAt", "x").await,
            Err(RecordError::InvalidField { .. })
        ));
    }

    #[tokio::test]
    async fn test_complete_and_missing_record() {
        let (_store, jobs) = view();
        let id = jobs.create(input("Fence", "pending")).await.unwrap();
        jobs.complete(&id).await.unwrap();
        assert_eq!(jobs.get(&id).await.unwrap().data.status, JobStatus::Completed);
        assert!(matches!(
            jobs.complete("nope").await,
            Err(RecordError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_edit_keeps_created_at() {
        let (_store, jobs) = view();
        let id = jobs.create(input("Deck", "active")).await.unwrap();
        let created = jobs.get(&id).await.unwrap().data.created_at;
        let mut changed = input("Deck rebuild", "pending");
        changed.issue = "Waiting on adjuster".into();
        jobs.edit(&id, changed).await.unwrap();
        let job = jobs.get(&id).await.unwrap().data;
        assert_eq!(job.name, "Deck rebuild");
        assert_eq!(job.issue, "Waiting on adjuster");
        assert_eq!(job.created_at, created);
    }

    #[test]
    fn test_render_empty_and_rows() {
        let state = ViewState::new(Tab::Jobs, ListFilter::Open);
        assert!(render(&[], &state).contains("No active jobs found."));

        let record = Record {
            id: "j1".into(),
            data: Job {
                name: "<Smith>".into(),
                target_date: NaiveDate::from_ymd_opt(2025, 4, 15),
                ..Job::default()
            },
        };
        let html = render(&[record.clone()], &state);
        assert!(html.contains("&lt;Smith&gt;"));
        assert!(html.contains("4/15/2025"));
        assert!(html.contains(r#"data-command="jobs.complete""#));

        let done = render(&[record], &ViewState::new(Tab::Jobs, ListFilter::Completed));
        assert!(!done.contains(r#"data-command="jobs.complete""#));
    }

    #[test]
    fn test_edit_form_prefills() {
        let record = Record {
            id: "j9".into(),
            data: Job {
                name: "Garage".into(),
                assignee: "chandler".into(),
                ..Job::default()
            },
        };
        let html = edit_form(&record).to_html();
        assert!(html.contains(r#"name="id" value="j9""#));
        assert!(html.contains(r#"<option value="chandler" selected>Chandler</option>"#));
    }
}
