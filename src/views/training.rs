use std::collections::BTreeMap;

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::info;

use super::jobs::render_subnav;
use super::{
    ListFilter, Record, ViewState, date_string, delete_confirmed, fetch, field, query, require,
    update_record,
};
use crate::errors::{RecordError, StoreError};
use crate::store::{FieldPath, Filter, StoreHandle};
use crate::ui::html::{self, checked, escape};
use crate::ui::icons::COMPLETE_SVG;
use crate::ui::{EditForm, FieldKind, FormField};
use crate::util::{iso, lenient_timestamp, parse_date};

pub const COLLECTION: &str = "training";

pub const MID_LEADS: [&str; 3] = ["Jacob", "Hardy", "Chandler"];

/// Checklist every new plan starts with.
pub const INITIAL_WEEKS: [&str; 6] = ["Orientation", "Week 1", "Week 2", "Week 3", "Week 4", "Week 5"];

/// Default length of a new plan.
pub const DEFAULT_PLAN_DAYS: u64 = 90;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrainingStatus {
    #[default]
    Active,
    Completed,
}

impl TrainingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrainingStatus::Active => "active",
            TrainingStatus::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingWeek {
    pub week: String,
    #[serde(default)]
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingPlan {
    #[serde(default)]
    pub trainee: String,
    #[serde(default)]
    pub mid_lead: String,
    #[serde(default, with = "lenient_timestamp")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default, with = "lenient_timestamp")]
    pub target_end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: TrainingStatus,
    #[serde(default)]
    pub plan: Vec<TrainingWeek>,
    #[serde(default)]
    pub notes: String,
}

impl TrainingPlan {
    /// Completed share of the checklist, rounded to a whole percent.
    pub fn progress_percent(&self) -> u32 {
        if self.plan.is_empty() {
            return 0;
        }
        let done = self.plan.iter().filter(|w| w.completed).count();
        (done as f64 / self.plan.len() as f64 * 100.0).round() as u32
    }
}

pub fn initial_plan() -> Vec<TrainingWeek> {
    INITIAL_WEEKS
        .iter()
        .map(|week| TrainingWeek {
            week: week.to_string(),
            completed: false,
        })
        .collect()
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrainingInput {
    pub trainee: String,
    pub mid_lead: String,
    pub target_end_date: String,
}

/// "Update plan" dialog values. Checklist boxes arrive as `week_<n>` keys
/// with value `on` (or `true`); an unchecked box is simply absent.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrainingEdit {
    pub trainee: String,
    pub target_end_date: String,
    pub notes: String,
    #[serde(flatten)]
    pub checks: BTreeMap<String, Value>,
}

impl TrainingEdit {
    pub fn week_checked(&self, index: usize) -> bool {
        match self.checks.get(&format!("week_{index}")) {
            Some(Value::String(s)) => s == "on",
            Some(Value::Bool(b)) => *b,
            _ => false,
        }
    }
}

fn parse_end_date(raw: &str) -> Result<DateTime<Utc>, RecordError> {
    parse_date(raw)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| RecordError::InvalidValue {
            field: "targetEndDate".into(),
            value: raw.to_string(),
        })
}

#[derive(Clone)]
pub struct TrainingView {
    store: StoreHandle,
}

impl TrainingView {
    pub fn new(store: StoreHandle) -> Self {
        Self { store }
    }

    pub async fn list(&self, filter: ListFilter) -> Result<Vec<Record<TrainingPlan>>, RecordError> {
        let status = match filter {
            ListFilter::Open => TrainingStatus::Active,
            ListFilter::Completed => TrainingStatus::Completed,
        };
        query(
            self.store.as_ref(),
            COLLECTION,
            &Filter::Eq("status".into(), json!(status.as_str())),
        )
        .await
    }

    pub async fn get(&self, id: &str) -> Result<Record<TrainingPlan>, RecordError> {
        fetch(self.store.as_ref(), COLLECTION, id).await
    }

    pub async fn create(&self, input: TrainingInput) -> Result<String, RecordError> {
        let mid_lead = require("midLead", &input.mid_lead)?;
        if !MID_LEADS.contains(&mid_lead.as_str()) {
            return Err(RecordError::InvalidValue {
                field: "midLead".into(),
                value: mid_lead,
            });
        }
        let plan = TrainingPlan {
            trainee: require("trainee", &input.trainee)?,
            mid_lead,
            start_date: Some(Utc::now()),
            target_end_date: Some(parse_end_date(&input.target_end_date)?),
            status: TrainingStatus::Active,
            plan: initial_plan(),
            notes: String::new(),
        };
        let data = serde_json::to_value(&plan).map_err(StoreError::from)?;
        let id = self.store.add(COLLECTION, data).await?;
        info!(id = %id, trainee = %plan.trainee, "Created training plan");
        Ok(id)
    }

    /// Flip one checklist week and return the new progress percentage.
    pub async fn toggle_week(&self, id: &str, index: usize) -> Result<u32, RecordError> {
        let mut record = self.get(id).await?;
        let len = record.data.plan.len();
        let week = record
            .data
            .plan
            .get_mut(index)
            .ok_or(RecordError::WeekOutOfRange { index, len })?;
        week.completed = !week.completed;
        let completed = week.completed;

        let path = FieldPath::from_segments(["plan".to_string(), index.to_string(), "completed".to_string()]);
        self.write(id, vec![(path, json!(completed))]).await?;
        Ok(record.data.progress_percent())
    }

    pub async fn edit(&self, id: &str, edit: TrainingEdit) -> Result<(), RecordError> {
        let current = self.get(id).await?.data;
        let target_end = parse_end_date(&edit.target_end_date)?;
        let plan: Vec<TrainingWeek> = current
            .plan
            .into_iter()
            .enumerate()
            .map(|(i, week)| TrainingWeek {
                completed: edit.week_checked(i),
                ..week
            })
            .collect();
        let plan = serde_json::to_value(&plan).map_err(StoreError::from)?;
        self.write(
            id,
            vec![
                (field("trainee"), json!(require("trainee", &edit.trainee)?)),
                (field("targetEndDate"), json!(iso(target_end))),
                (field("notes"), json!(edit.notes)),
                (field("plan"), plan),
            ],
        )
        .await
    }

    pub async fn complete(&self, id: &str) -> Result<(), RecordError> {
        self.write(id, vec![(field("status"), json!("completed"))]).await
    }

    pub async fn delete(&self, id: &str, confirmed: bool) -> Result<(), RecordError> {
        delete_confirmed(self.store.as_ref(), COLLECTION, id, confirmed).await
    }

    async fn write(&self, id: &str, updates: Vec<(FieldPath, Value)>) -> Result<(), RecordError> {
        update_record(self.store.as_ref(), COLLECTION, id, updates).await
    }
}

// ── Rendering ─────────────────────────────────────────────────────────

const COLUMNS: usize = 11;

pub fn render(plans: &[Record<TrainingPlan>], state: &ViewState) -> String {
    let rows = if plans.is_empty() {
        html::message_row(COLUMNS, &format!("No {} training plans.", state.filter_label()))
    } else {
        plans.iter().map(render_row).collect()
    };
    format!(
        r#"<div class="tab-header"><h2 class="section-title">Technician Training Plans</h2><button class="btn btn-primary" data-form="training/new">+ New Training Plan</button></div>
{subnav}
<div class="table-container"><table class="data-table" id="trainingTable"><thead><tr><th>Trainee</th><th>Lead</th><th class="progress-col">Progress</th><th>Target End Date</th><th class="text-center">Orientation</th><th class="text-center">Wk 1</th><th class="text-center">Wk 2</th><th class="text-center">Wk 3</th><th class="text-center">Wk 4</th><th class="text-center">Wk 5</th><th class="text-center">Actions</th></tr></thead><tbody>{rows}</tbody></table></div>"#,
        subnav = render_subnav(state),
    )
}

pub fn render_error() -> String {
    format!(
        r#"<div class="table-container"><table class="data-table"><tbody>{}</tbody></table></div>"#,
        html::error_row(COLUMNS, "Error loading plans.")
    )
}

fn render_row(record: &Record<TrainingPlan>) -> String {
    let plan = &record.data;
    let progress = plan.progress_percent();
    let checkboxes: String = plan
        .plan
        .iter()
        .enumerate()
        .map(|(index, week)| {
            format!(
                r#"<td class="text-center" data-label="{label}"><input type="checkbox" class="form-check-input" data-command="training.toggleWeek" data-args="{args}"{checked}></td>"#,
                label = escape(&week.week),
                args = escape(&json!({"id": record.id, "index": index}).to_string()),
                checked = checked(week.completed),
            )
        })
        .collect();
    let complete = if plan.status == TrainingStatus::Active {
        format!(
            r#"<button class="icon-btn complete-btn" title="Mark Complete" data-command="training.complete" data-args="{}">{COMPLETE_SVG}</button>"#,
            escape(&json!({"id": record.id}).to_string())
        )
    } else {
        String::new()
    };
    format!(
        r#"<tr id="plan-{id}" data-id="{id}"><td data-label="Trainee"><strong>{trainee}</strong></td><td data-label="Lead">{lead}</td><td data-label="Progress"><div class="progress-bar-container"><div class="progress-bar" style="width: {progress}%;">{progress}%</div></div></td><td data-label="Target End">{end}</td>{checkboxes}<td data-label="Actions" class="action-buttons"><button class="btn btn-secondary btn-small" data-form="training/edit?id={id}">Update</button>{complete}</td></tr>"#,
        id = escape(&record.id),
        trainee = escape(&plan.trainee),
        lead = escape(&plan.mid_lead),
        end = html::display_timestamp(plan.target_end_date),
    )
}

pub fn new_form(today: NaiveDate) -> EditForm {
    let default_end = today
        .checked_add_days(Days::new(DEFAULT_PLAN_DAYS))
        .unwrap_or(today);
    let leads = MID_LEADS
        .iter()
        .map(|l| (l.to_string(), l.to_string()))
        .collect();
    EditForm::new("Create New Training Plan", "training.create", "Create Plan")
        .field(FormField::new("trainee", "Trainee Name", FieldKind::Text).required())
        .field(
            FormField::new("midLead", "Mid-Lead", FieldKind::Select(leads))
                .value(MID_LEADS[0])
                .required(),
        )
        .field(
            FormField::new("targetEndDate", "Target End Date", FieldKind::Date)
                .value(date_string(default_end))
                .required(),
        )
}

pub fn edit_form(record: &Record<TrainingPlan>) -> EditForm {
    let plan = &record.data;
    let end = plan
        .target_end_date
        .map(|t| date_string(t.date_naive()))
        .unwrap_or_default();
    let form = EditForm::new(
        format!("Update Plan for {}", plan.trainee),
        "training.edit",
        "Save Changes",
    )
    .field(FormField::hidden("id", &record.id))
    .field(FormField::new("trainee", "Trainee", FieldKind::Text).value(&plan.trainee))
    .field(
        FormField::new("targetEndDate", "Target End Date", FieldKind::Date)
            .value(end)
            .required(),
    );
    plan.plan
        .iter()
        .enumerate()
        .fold(form, |form, (i, week)| {
            form.field(
                FormField::new(&format!("week_{i}"), &week.week, FieldKind::Checkbox)
                    .checked(week.completed),
            )
        })
        .field(FormField::new("notes", "Notes", FieldKind::TextArea).value(&plan.notes))
        .danger("Delete Plan", "training.delete")
}
