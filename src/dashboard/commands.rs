//! Named UI commands.
//!
//! Every interactive control on the page carries a `data-command` name and
//! JSON `data-args`; forms post their field values as the arguments. The
//! client sends `{command, args}` to `POST /api/commands` and the registry
//! routes it to a handler. Handlers call the same plan and view services as
//! the REST routes.
//!
//! | Prefix      | Commands                                                        |
//! |-------------|-----------------------------------------------------------------|
//! | `plan.`     | `toggle` `editText` `editDate` `editLearning` `addItem` `deleteItem` |
//! | `jobs.`     | `create` `batchCreate` `edit` `updateField` `complete` `delete`  |
//! | `actions.`  | `create` `edit` `complete` `delete`                              |
//! | `team.`     | `create` `saveField`                                             |
//! | `training.` | `create` `edit` `toggleWeek` `complete` `delete`                 |

use std::collections::BTreeMap;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

use super::api::{
    ApiError, ItemPatch, LearningPatch, SharedState, add_item, decode_args, delete_item,
    write_item_field, write_learning,
};
use crate::plan::{ItemField, ItemRef};
use crate::views::actions::{self, ActionInput};
use crate::views::jobs::{self, BatchJobRow, JobInput};
use crate::views::team::{self, TeamInput};
use crate::views::training::{self, TrainingEdit, TrainingInput};

/// What the client does after a command: `reload` re-fetches the active
/// tab; `data` is the handler's result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandOutcome {
    pub ok: bool,
    pub reload: bool,
    pub data: Value,
}

impl CommandOutcome {
    /// In-place edit; the page already shows the new value.
    pub fn applied(data: Value) -> Self {
        Self {
            ok: true,
            reload: false,
            data,
        }
    }

    pub fn reload(data: Value) -> Self {
        Self {
            ok: true,
            reload: true,
            data,
        }
    }
}

pub type CommandFuture = BoxFuture<'static, Result<CommandOutcome, ApiError>>;
pub type CommandHandler = fn(SharedState, Value) -> CommandFuture;

#[derive(Default)]
pub struct CommandRegistry {
    handlers: BTreeMap<&'static str, CommandHandler>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: &'static str, handler: CommandHandler) -> &mut Self {
        self.handlers.insert(name, handler);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.handlers.keys().copied()
    }

    pub async fn dispatch(
        &self,
        state: SharedState,
        name: &str,
        args: Value,
    ) -> Result<CommandOutcome, ApiError> {
        let handler = self
            .handlers
            .get(name)
            .ok_or_else(|| ApiError::NotFound(format!("Unknown command '{name}'")))?;
        debug!(command = name, "Dispatching command");
        handler(state, args).await
    }

    /// Registry with every dashboard command.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry
            .register("plan.toggle", |s, a| plan_toggle(s, a).boxed())
            .register("plan.editText", |s, a| plan_edit_text(s, a).boxed())
            .register("plan.editDate", |s, a| plan_edit_date(s, a).boxed())
            .register("plan.editLearning", |s, a| plan_edit_learning(s, a).boxed())
            .register("plan.addItem", |s, a| plan_add_item(s, a).boxed())
            .register("plan.deleteItem", |s, a| plan_delete_item(s, a).boxed())
            .register("jobs.create", |s, a| jobs_create(s, a).boxed())
            .register("jobs.batchCreate", |s, a| jobs_batch_create(s, a).boxed())
            .register("jobs.edit", |s, a| jobs_edit(s, a).boxed())
            .register("jobs.updateField", |s, a| jobs_update_field(s, a).boxed())
            .register("jobs.complete", |s, a| jobs_complete(s, a).boxed())
            .register("jobs.delete", |s, a| jobs_delete(s, a).boxed())
            .register("actions.create", |s, a| actions_create(s, a).boxed())
            .register("actions.edit", |s, a| actions_edit(s, a).boxed())
            .register("actions.complete", |s, a| actions_complete(s, a).boxed())
            .register("actions.delete", |s, a| actions_delete(s, a).boxed())
            .register("team.create", |s, a| team_create(s, a).boxed())
            .register("team.saveField", |s, a| team_save_field(s, a).boxed())
            .register("training.create", |s, a| training_create(s, a).boxed())
            .register("training.edit", |s, a| training_edit(s, a).boxed())
            .register("training.toggleWeek", |s, a| training_toggle_week(s, a).boxed())
            .register("training.complete", |s, a| training_complete(s, a).boxed())
            .register("training.delete", |s, a| training_delete(s, a).boxed());
        registry
    }
}

// ── Argument shapes ───────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ItemArgs<T> {
    #[serde(flatten)]
    item: ItemRef,
    #[serde(flatten)]
    rest: T,
}

#[derive(Debug, Deserialize)]
struct ToggleArgs {
    completed: bool,
    #[serde(default)]
    previous: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct TextArgs {
    text: String,
    #[serde(default)]
    previous: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct DateArgs {
    date: String,
    #[serde(default)]
    previous: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct WeekArgs {
    week: String,
}

#[derive(Debug, Deserialize)]
struct DeleteItemArgs {
    #[serde(flatten)]
    item: ItemRef,
    #[serde(default)]
    confirm: bool,
}

#[derive(Debug, Deserialize)]
struct IdArgs {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ConfirmArgs {
    id: String,
    #[serde(default)]
    confirm: bool,
}

/// Dialog submission for an existing record: the hidden `id` plus the form.
#[derive(Debug, Deserialize)]
struct EditArgs<T> {
    id: String,
    #[serde(flatten)]
    input: T,
}

#[derive(Debug, Deserialize)]
struct FieldArgs {
    id: String,
    field: String,
    value: String,
}

#[derive(Debug, Deserialize)]
struct BatchArgs {
    rows: Vec<BatchJobRow>,
}

#[derive(Debug, Deserialize)]
struct WeekToggleArgs {
    id: String,
    index: usize,
}

fn to_data<T: Serialize>(value: T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

// ── Plan ──────────────────────────────────────────────────────────────

async fn plan_toggle(state: SharedState, args: Value) -> Result<CommandOutcome, ApiError> {
    let ItemArgs { item, rest } = decode_args::<ItemArgs<ToggleArgs>>(args)?;
    let patch = ItemPatch {
        item,
        field: ItemField::Completed,
        value: Value::Bool(rest.completed),
        previous: rest.previous,
    };
    Ok(CommandOutcome::applied(to_data(write_item_field(&state, patch).await?)))
}

async fn plan_edit_text(state: SharedState, args: Value) -> Result<CommandOutcome, ApiError> {
    let ItemArgs { item, rest } = decode_args::<ItemArgs<TextArgs>>(args)?;
    let patch = ItemPatch {
        item,
        field: ItemField::Text,
        value: Value::String(rest.text),
        previous: rest.previous,
    };
    Ok(CommandOutcome::applied(to_data(write_item_field(&state, patch).await?)))
}

async fn plan_edit_date(state: SharedState, args: Value) -> Result<CommandOutcome, ApiError> {
    let ItemArgs { item, rest } = decode_args::<ItemArgs<DateArgs>>(args)?;
    let patch = ItemPatch {
        item,
        field: ItemField::TargetDate,
        value: Value::String(rest.date),
        previous: rest.previous,
    };
    Ok(CommandOutcome::applied(to_data(write_item_field(&state, patch).await?)))
}

async fn plan_edit_learning(state: SharedState, args: Value) -> Result<CommandOutcome, ApiError> {
    let patch: LearningPatch = decode_args(args)?;
    Ok(CommandOutcome::applied(to_data(write_learning(&state, patch).await?)))
}

async fn plan_add_item(state: SharedState, args: Value) -> Result<CommandOutcome, ApiError> {
    let WeekArgs { week } = decode_args(args)?;
    let plan = add_item(&state, &week).await?;
    Ok(CommandOutcome::reload(json!({ "version": plan.version })))
}

async fn plan_delete_item(state: SharedState, args: Value) -> Result<CommandOutcome, ApiError> {
    let DeleteItemArgs { item, confirm } = decode_args(args)?;
    let plan = delete_item(&state, item, confirm).await?;
    Ok(CommandOutcome::reload(json!({ "version": plan.version })))
}

// ── Jobs ──────────────────────────────────────────────────────────────

async fn jobs_create(state: SharedState, args: Value) -> Result<CommandOutcome, ApiError> {
    let input: JobInput = decode_args(args)?;
    let id = state.jobs.create(input).await?;
    state.notify_records(jobs::COLLECTION);
    Ok(CommandOutcome::reload(json!({ "id": id })))
}

async fn jobs_batch_create(state: SharedState, args: Value) -> Result<CommandOutcome, ApiError> {
    let BatchArgs { rows } = decode_args(args)?;
    let ids = state.jobs.create_batch(rows).await?;
    state.notify_records(jobs::COLLECTION);
    Ok(CommandOutcome::reload(json!({ "ids": ids })))
}

async fn jobs_edit(state: SharedState, args: Value) -> Result<CommandOutcome, ApiError> {
    let EditArgs { id, input } = decode_args::<EditArgs<JobInput>>(args)?;
    state.jobs.edit(&id, input).await?;
    state.notify_records(jobs::COLLECTION);
    Ok(CommandOutcome::reload(Value::Null))
}

async fn jobs_update_field(state: SharedState, args: Value) -> Result<CommandOutcome, ApiError> {
    let FieldArgs { id, field, value } = decode_args(args)?;
    state.jobs.update_field(&id, &field, &value).await?;
    state.notify_records(jobs::COLLECTION);
    Ok(CommandOutcome::reload(Value::Null))
}

async fn jobs_complete(state: SharedState, args: Value) -> Result<CommandOutcome, ApiError> {
    let IdArgs { id } = decode_args(args)?;
    state.jobs.complete(&id).await?;
    state.notify_records(jobs::COLLECTION);
    Ok(CommandOutcome::reload(Value::Null))
}

async fn jobs_delete(state: SharedState, args: Value) -> Result<CommandOutcome, ApiError> {
    let ConfirmArgs { id, confirm } = decode_args(args)?;
    state.jobs.delete(&id, confirm).await?;
    state.notify_records(jobs::COLLECTION);
    Ok(CommandOutcome::reload(Value::Null))
}

// ── Actions ───────────────────────────────────────────────────────────

async fn actions_create(state: SharedState, args: Value) -> Result<CommandOutcome, ApiError> {
    let input: ActionInput = decode_args(args)?;
    let id = state.actions.create(input).await?;
    state.notify_records(actions::COLLECTION);
    Ok(CommandOutcome::reload(json!({ "id": id })))
}

async fn actions_edit(state: SharedState, args: Value) -> Result<CommandOutcome, ApiError> {
    let EditArgs { id, input } = decode_args::<EditArgs<ActionInput>>(args)?;
    state.actions.edit(&id, input).await?;
    state.notify_records(actions::COLLECTION);
    Ok(CommandOutcome::reload(Value::Null))
}

async fn actions_complete(state: SharedState, args: Value) -> Result<CommandOutcome, ApiError> {
    let IdArgs { id } = decode_args(args)?;
    state.actions.complete(&id).await?;
    state.notify_records(actions::COLLECTION);
    Ok(CommandOutcome::reload(Value::Null))
}

async fn actions_delete(state: SharedState, args: Value) -> Result<CommandOutcome, ApiError> {
    let ConfirmArgs { id, confirm } = decode_args(args)?;
    state.actions.delete(&id, confirm).await?;
    state.notify_records(actions::COLLECTION);
    Ok(CommandOutcome::reload(Value::Null))
}

// ── Team ──────────────────────────────────────────────────────────────

async fn team_create(state: SharedState, args: Value) -> Result<CommandOutcome, ApiError> {
    let input: TeamInput = decode_args(args)?;
    let id = state.team.create(input).await?;
    state.notify_records(team::COLLECTION);
    Ok(CommandOutcome::reload(json!({ "id": id })))
}

/// Inline save: the cell already shows the value, so no reload.
async fn team_save_field(state: SharedState, args: Value) -> Result<CommandOutcome, ApiError> {
    let FieldArgs { id, field, value } = decode_args(args)?;
    state.team.save_field(&id, &field, &value).await?;
    state.notify_records(team::COLLECTION);
    Ok(CommandOutcome::applied(Value::Null))
}

// ── Training ──────────────────────────────────────────────────────────

async fn training_create(state: SharedState, args: Value) -> Result<CommandOutcome, ApiError> {
    let input: TrainingInput = decode_args(args)?;
    let id = state.training.create(input).await?;
    state.notify_records(training::COLLECTION);
    Ok(CommandOutcome::reload(json!({ "id": id })))
}

async fn training_edit(state: SharedState, args: Value) -> Result<CommandOutcome, ApiError> {
    let EditArgs { id, input } = decode_args::<EditArgs<TrainingEdit>>(args)?;
    state.training.edit(&id, input).await?;
    state.notify_records(training::COLLECTION);
    Ok(CommandOutcome::reload(Value::Null))
}

/// The progress bar is updated in place from the returned percentage.
async fn training_toggle_week(state: SharedState, args: Value) -> Result<CommandOutcome, ApiError> {
    let WeekToggleArgs { id, index } = decode_args(args)?;
    let progress = state.training.toggle_week(&id, index).await?;
    state.notify_records(training::COLLECTION);
    Ok(CommandOutcome::applied(json!({ "progress": progress })))
}

async fn training_complete(state: SharedState, args: Value) -> Result<CommandOutcome, ApiError> {
    let IdArgs { id } = decode_args(args)?;
    state.training.complete(&id).await?;
    state.notify_records(training::COLLECTION);
    Ok(CommandOutcome::reload(Value::Null))
}

async fn training_delete(state: SharedState, args: Value) -> Result<CommandOutcome, ApiError> {
    let ConfirmArgs { id, confirm } = decode_args(args)?;
    state.training.delete(&id, confirm).await?;
    state.notify_records(training::COLLECTION);
    Ok(CommandOutcome::reload(Value::Null))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::api::AppState;
    use crate::plan::PlanLocation;
    use crate::store::MemoryStore;
    use std::sync::Arc;

    fn state() -> SharedState {
        Arc::new(AppState::new(
            Arc::new(MemoryStore::new()),
            PlanLocation::default(),
        ))
    }

    async fn run(state: &SharedState, name: &str, args: Value) -> Result<CommandOutcome, ApiError> {
        state.commands.dispatch(state.clone(), name, args).await
    }

    #[test]
    fn test_standard_registry_covers_every_tab() {
        let registry = CommandRegistry::standard();
        for prefix in ["plan.", "jobs.", "actions.", "team.", "training."] {
            assert!(registry.names().any(|n| n.starts_with(prefix)), "{prefix}");
        }
        assert!(registry.contains("plan.deleteItem"));
        assert!(!registry.contains("plan.reorder"));
    }

    #[tokio::test]
    async fn test_unknown_command_is_not_found() {
        let state = state();
        let err = run(&state, "plan.explode", json!({})).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_bad_arguments_are_rejected() {
        let state = state();
        let err = run(&state, "plan.toggle", json!({"week": "week1"})).await.unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_plan_commands() {
        let state = state();
        state.plan.load().await.unwrap();

        let outcome = run(
            &state,
            "plan.toggle",
            json!({"week": "week1", "index": 0, "completed": true}),
        )
        .await
        .unwrap();
        assert!(!outcome.reload);
        assert_eq!(outcome.data["value"], true);

        let outcome = run(&state, "plan.addItem", json!({"week": "week4"})).await.unwrap();
        assert!(outcome.reload);
        assert_eq!(state.plan.load().await.unwrap().plan.weeks["week4"].action_items.len(), 5);

        let declined = run(&state, "plan.deleteItem", json!({"week": "week4", "index": 4})).await;
        assert!(matches!(declined, Err(ApiError::BadRequest(_))));
        run(
            &state,
            "plan.deleteItem",
            json!({"week": "week4", "index": 4, "confirm": true}),
        )
        .await
        .unwrap();
        assert_eq!(state.plan.load().await.unwrap().plan.weeks["week4"].action_items.len(), 4);
    }

    #[tokio::test]
    async fn test_form_commands_accept_string_values() {
        let state = state();
        let created = run(
            &state,
            "actions.create",
            json!({
                "title": "Weekly huddle", "priority": "high",
                "categorySelect": "Team Development", "dueDate": "2025-03-14",
                "description": ""
            }),
        )
        .await
        .unwrap();
        let id = created.data["id"].as_str().unwrap().to_string();

        run(
            &state,
            "actions.edit",
            json!({
                "id": id, "title": "Weekly huddle", "priority": "low",
                "categorySelect": "custom", "customCategory": "Culture",
                "dueDate": "2025-03-21", "status": "in-progress", "description": "Mondays"
            }),
        )
        .await
        .unwrap();
        let action = state.actions.get(&id).await.unwrap().data;
        assert_eq!(action.category, "Culture");

        let training = run(
            &state,
            "training.create",
            json!({"trainee": "Sam", "midLead": "Chandler", "targetEndDate": "2025-05-01"}),
        )
        .await
        .unwrap();
        let tid = training.data["id"].as_str().unwrap().to_string();
        run(
            &state,
            "training.edit",
            json!({
                "id": tid, "trainee": "Sam", "targetEndDate": "2025-05-01",
                "notes": "", "week_1": "on"
            }),
        )
        .await
        .unwrap();
        let plan = state.training.get(&tid).await.unwrap().data;
        assert!(plan.plan[1].completed);
        assert_eq!(plan.progress_percent(), 17);
    }
}
