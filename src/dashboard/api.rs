use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch, post},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use super::commands::{CommandOutcome, CommandRegistry};
use super::ws::{WsMessage, broadcast_message};
use crate::errors::{PlanError, RecordError, StoreError};
use crate::plan::mutator::learning_path;
use crate::plan::reorder::ItemPos;
use crate::plan::{
    BoardSnapshot, DragReorder, FieldWrite, ItemField, ItemRef, LoadedPlan, PlanLocation,
    PlanMutator, Revert, TransitionPlan, loader,
};
use crate::store::StoreHandle;
use crate::views::actions::{self, ActionInput};
use crate::views::jobs::{self, BatchJobRow, JobInput};
use crate::views::team::{self, GOAL_TITLE_FIELD, TeamInput};
use crate::views::training::{self, TrainingEdit, TrainingInput};
use crate::views::{ActionsView, JobsView, ListFilter, TeamView, TrainingView};

// ── Shared application state ──────────────────────────────────────────

pub struct AppState {
    pub store: StoreHandle,
    pub plan: PlanMutator,
    pub jobs: JobsView,
    pub actions: ActionsView,
    pub team: TeamView,
    pub training: TrainingView,
    pub commands: CommandRegistry,
    pub ws_tx: broadcast::Sender<String>,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(store: StoreHandle, location: PlanLocation) -> Self {
        let (ws_tx, _rx) = broadcast::channel::<String>(256);
        Self {
            plan: PlanMutator::new(store.clone(), location),
            jobs: JobsView::new(store.clone()),
            actions: ActionsView::new(store.clone()),
            team: TeamView::new(store.clone()),
            training: TrainingView::new(store.clone()),
            commands: CommandRegistry::standard(),
            ws_tx,
            store,
        }
    }

    pub fn notify_plan(&self, version: u64) {
        broadcast_message(&self.ws_tx, &WsMessage::PlanChanged { version });
    }

    pub fn notify_records(&self, collection: &str) {
        broadcast_message(
            &self.ws_tx,
            &WsMessage::RecordsChanged {
                collection: collection.to_string(),
            },
        );
    }
}

// ── Request payload types ─────────────────────────────────────────────

/// One scalar edit of an action item. `previous` is what the element showed
/// before the edit; it is the revert value when the store cannot be re-read.
#[derive(Debug, Deserialize)]
pub struct ItemPatch {
    #[serde(flatten)]
    pub item: ItemRef,
    pub field: ItemField,
    pub value: Value,
    #[serde(default)]
    pub previous: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct LearningPatch {
    pub week: String,
    pub index: usize,
    pub text: String,
    #[serde(default)]
    pub previous: Option<Value>,
}

/// A finished drag as seen by the page: the board snapshot taken at drag
/// start, the dragged item and where the pointer was released.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DropRequest {
    pub version: u64,
    pub source: ItemPos,
    pub target_week: String,
    pub pointer_y: f64,
    pub board: BoardSnapshot,
}

#[derive(Debug, Deserialize, Default)]
pub struct ListQuery {
    pub filter: Option<String>,
}

impl ListQuery {
    pub fn list_filter(&self) -> Result<ListFilter, ApiError> {
        match &self.filter {
            Some(raw) => raw.parse().map_err(ApiError::BadRequest),
            None => Ok(ListFilter::Open),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct DeleteQuery {
    #[serde(default)]
    pub confirm: bool,
    pub id: Option<String>,
}

/// Inline single-field edit or full dialog edit of a job.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum JobPatch {
    Field { field: String, value: String },
    Full(JobInput),
}

#[derive(Debug, Deserialize)]
pub struct GoalPatch {
    pub title: String,
}

#[derive(Debug, Deserialize)]
pub struct CommandRequest {
    #[serde(alias = "name")]
    pub command: String,
    #[serde(default)]
    pub args: Value,
}

// ── Response payload types ────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct PlanResponse {
    pub version: u64,
    pub repaired: bool,
    pub plan: TransitionPlan,
}

impl From<LoadedPlan> for PlanResponse {
    fn from(loaded: LoadedPlan) -> Self {
        Self {
            version: loaded.version,
            repaired: loaded.repaired,
            plan: loaded.plan,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DropResult {
    pub placed: ItemPos,
    pub version: u64,
}

// ── Error handling ────────────────────────────────────────────────────

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Conflict(String),
    Internal(String),
    /// A failed scalar plan write, carrying the value the client should
    /// put back into the edited element.
    Reverted {
        status: StatusCode,
        message: String,
        revert: Revert,
    },
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Reverted { status, .. } => *status,
        }
    }

    pub fn with_revert(self, revert: Revert) -> Self {
        let status = self.status();
        let message = match self {
            ApiError::NotFound(m)
            | ApiError::BadRequest(m)
            | ApiError::Conflict(m)
            | ApiError::Internal(m) => m,
            ApiError::Reverted { message, .. } => message,
        };
        ApiError::Reverted {
            status,
            message,
            revert,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ApiError::Reverted {
                message, revert, ..
            } => json!({"error": message, "revert": revert}),
            ApiError::Internal(message) => {
                error!(error = %message, "Request failed");
                json!({"error": message})
            }
            ApiError::NotFound(message)
            | ApiError::BadRequest(message)
            | ApiError::Conflict(message) => json!({"error": message}),
        };
        (status, Json(body)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        let message = err.to_string();
        match err {
            StoreError::NotFound { .. } => ApiError::NotFound(message),
            StoreError::VersionConflict { .. } => ApiError::Conflict(message),
            StoreError::InvalidPath { .. } | StoreError::PathNotFound { .. } => {
                ApiError::BadRequest(message)
            }
            StoreError::Serialization(_) | StoreError::LockPoisoned | StoreError::Backend(_) => {
                ApiError::Internal(message)
            }
        }
    }
}

impl From<PlanError> for ApiError {
    fn from(err: PlanError) -> Self {
        let message = err.to_string();
        match err {
            PlanError::UnknownWeek { .. } => ApiError::NotFound(message),
            PlanError::StaleReference { .. } => ApiError::Conflict(message),
            PlanError::ItemOutOfRange { .. }
            | PlanError::ConfirmationRequired
            | PlanError::InvalidDrag(_) => ApiError::BadRequest(message),
            PlanError::Malformed(_) => ApiError::Internal(message),
            PlanError::Store(e) => e.into(),
        }
    }
}

impl From<RecordError> for ApiError {
    fn from(err: RecordError) -> Self {
        let message = err.to_string();
        match err {
            RecordError::NotFound { .. } => ApiError::NotFound(message),
            RecordError::Store(e) => e.into(),
            RecordError::InvalidField { .. }
            | RecordError::InvalidValue { .. }
            | RecordError::WeekOutOfRange { .. }
            | RecordError::ConfirmationRequired
            | RecordError::MissingField { .. } => ApiError::BadRequest(message),
        }
    }
}

/// Decode command or form arguments into a typed payload.
pub(crate) fn decode_args<T: serde::de::DeserializeOwned>(args: Value) -> Result<T, ApiError> {
    serde_json::from_value(args).map_err(|e| ApiError::BadRequest(format!("Invalid arguments: {e}")))
}

// ── Router ────────────────────────────────────────────────────────────

pub fn api_router() -> Router<SharedState> {
    Router::new()
        .route("/api/plan", get(get_plan))
        .route("/api/plan/repair", post(repair_plan))
        .route("/api/plan/items", patch(patch_item))
        .route("/api/plan/learning", patch(patch_learning))
        .route("/api/plan/weeks/{week}/items", post(add_plan_item))
        .route("/api/plan/weeks/{week}/items/{index}", axum::routing::delete(delete_plan_item))
        .route("/api/plan/drop", post(drop_plan_item))
        .route("/api/commands", post(run_command))
        .route("/api/jobs", get(list_jobs).post(create_job))
        .route("/api/jobs/batch", post(create_job_batch))
        .route("/api/jobs/{id}", get(get_job).patch(patch_job).delete(delete_job))
        .route("/api/jobs/{id}/complete", post(complete_job))
        .route("/api/actions", get(list_actions).post(create_action))
        .route(
            "/api/actions/{id}",
            get(get_action).patch(edit_action).delete(delete_action),
        )
        .route("/api/actions/{id}/complete", post(complete_action))
        .route("/api/team", get(list_team).post(create_team_member))
        .route("/api/team/{id}/goal", patch(patch_goal))
        .route("/api/training", get(list_training).post(create_training))
        .route(
            "/api/training/{id}",
            get(get_training).patch(edit_training).delete(delete_training),
        )
        .route("/api/training/{id}/weeks/{index}/toggle", post(toggle_training_week))
        .route("/api/training/{id}/complete", post(complete_training))
        .route("/health", get(health_check))
}

// ── Plan operations (shared with commands) ────────────────────────────

pub(crate) async fn write_item_field(
    state: &AppState,
    patch: ItemPatch,
) -> Result<FieldWrite, ApiError> {
    let ItemPatch {
        item,
        field,
        value,
        previous,
    } = patch;
    let result = match (field, value) {
        (ItemField::Completed, Value::Bool(done)) => state.plan.toggle_completed(&item, done).await,
        (ItemField::Text, Value::String(text)) => state.plan.edit_text(&item, text).await,
        (ItemField::TargetDate, Value::String(date)) => state.plan.edit_date(&item, date).await,
        (field, other) => {
            return Err(ApiError::BadRequest(format!(
                "Invalid value {other} for {}",
                field.as_str()
            )));
        }
    };
    match result {
        Ok(write) => Ok(write),
        Err(e) => {
            warn!(error = %e, week = %item.week, index = item.index, field = field.as_str(), "Plan item write failed");
            let revert = state
                .plan
                .revert_item_field(&item, field, previous.unwrap_or(Value::Null))
                .await;
            Err(ApiError::from(e).with_revert(revert))
        }
    }
}

pub(crate) async fn write_learning(
    state: &AppState,
    patch: LearningPatch,
) -> Result<FieldWrite, ApiError> {
    match state.plan.edit_learning(&patch.week, patch.index, patch.text).await {
        Ok(write) => Ok(write),
        Err(e) => {
            let path = learning_path(&patch.week, patch.index).to_string();
            warn!(error = %e, path = %path, "Learning focus write failed");
            let revert = state
                .plan
                .last_known_good(&path, patch.previous.unwrap_or(Value::Null))
                .await;
            Err(ApiError::from(e).with_revert(revert))
        }
    }
}

pub(crate) async fn add_item(state: &AppState, week: &str) -> Result<PlanResponse, ApiError> {
    let loaded = state.plan.add_item(week).await?;
    state.notify_plan(loaded.version);
    Ok(loaded.into())
}

pub(crate) async fn delete_item(
    state: &AppState,
    item: ItemRef,
    confirmed: bool,
) -> Result<PlanResponse, ApiError> {
    let loaded = state.plan.delete_item(&item, confirmed).await?;
    state.notify_plan(loaded.version);
    Ok(loaded.into())
}

/// Replay the drag on the server's copy of the page snapshot and write the
/// result, provided the plan has not changed since the page was rendered.
pub(crate) async fn apply_drop(state: &AppState, req: DropRequest) -> Result<DropResult, ApiError> {
    let mut drag = DragReorder::new(req.board);
    drag.drag_start(&req.source.week, req.source.index)?;
    let placed = drag.drop_on(&req.target_week, req.pointer_y)?;

    let current = state.plan.load().await?;
    if current.version != req.version {
        return Err(ApiError::Conflict(format!(
            "Plan changed since the page was rendered (version {} is now {})",
            req.version, current.version
        )));
    }
    let weeks = drag.finish(&current.plan)?;
    let version = state
        .plan
        .replace_weeks(current.plan, weeks, req.version)
        .await?;
    info!(week = %placed.week, index = placed.index, version, "Reordered action items");
    state.notify_plan(version);
    Ok(DropResult { placed, version })
}

// ── Handlers ──────────────────────────────────────────────────────────

async fn health_check() -> &'static str {
    "ok"
}

async fn get_plan(State(state): State<SharedState>) -> Result<Json<PlanResponse>, ApiError> {
    let loaded = state.plan.load().await?;
    if loaded.repaired {
        state.notify_plan(loaded.version);
    }
    Ok(Json(loaded.into()))
}

async fn repair_plan(State(state): State<SharedState>) -> Result<Json<PlanResponse>, ApiError> {
    loader::write_default(state.store.as_ref(), state.plan.location()).await?;
    let mut loaded = state.plan.load().await?;
    loaded.repaired = true;
    info!(version = loaded.version, "Plan reset to the default template");
    state.notify_plan(loaded.version);
    Ok(Json(loaded.into()))
}

async fn patch_item(
    State(state): State<SharedState>,
    Json(patch): Json<ItemPatch>,
) -> Result<Json<FieldWrite>, ApiError> {
    Ok(Json(write_item_field(&state, patch).await?))
}

async fn patch_learning(
    State(state): State<SharedState>,
    Json(patch): Json<LearningPatch>,
) -> Result<Json<FieldWrite>, ApiError> {
    Ok(Json(write_learning(&state, patch).await?))
}

async fn add_plan_item(
    State(state): State<SharedState>,
    Path(week): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let plan = add_item(&state, &week).await?;
    Ok((StatusCode::CREATED, Json(plan)))
}

async fn delete_plan_item(
    State(state): State<SharedState>,
    Path((week, index)): Path<(String, usize)>,
    Query(query): Query<DeleteQuery>,
) -> Result<Json<PlanResponse>, ApiError> {
    let item = ItemRef {
        week,
        index,
        id: query.id,
    };
    Ok(Json(delete_item(&state, item, query.confirm).await?))
}

async fn drop_plan_item(
    State(state): State<SharedState>,
    Json(req): Json<DropRequest>,
) -> Result<Json<DropResult>, ApiError> {
    Ok(Json(apply_drop(&state, req).await?))
}

async fn run_command(
    State(state): State<SharedState>,
    Json(req): Json<CommandRequest>,
) -> Result<Json<CommandOutcome>, ApiError> {
    let outcome = state
        .commands
        .dispatch(state.clone(), &req.command, req.args)
        .await?;
    Ok(Json(outcome))
}

fn created(id: String) -> (StatusCode, Json<Value>) {
    (StatusCode::CREATED, Json(json!({ "id": id })))
}

// Jobs

async fn list_jobs(
    State(state): State<SharedState>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.jobs.list(query.list_filter()?).await?))
}

async fn create_job(
    State(state): State<SharedState>,
    Json(input): Json<JobInput>,
) -> Result<impl IntoResponse, ApiError> {
    let id = state.jobs.create(input).await?;
    state.notify_records(jobs::COLLECTION);
    Ok(created(id))
}

async fn create_job_batch(
    State(state): State<SharedState>,
    Json(rows): Json<Vec<BatchJobRow>>,
) -> Result<impl IntoResponse, ApiError> {
    let ids = state.jobs.create_batch(rows).await?;
    state.notify_records(jobs::COLLECTION);
    Ok((StatusCode::CREATED, Json(json!({ "ids": ids }))))
}

async fn get_job(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.jobs.get(&id).await?))
}

async fn patch_job(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(patch): Json<JobPatch>,
) -> Result<impl IntoResponse, ApiError> {
    match patch {
        JobPatch::Field { field, value } => state.jobs.update_field(&id, &field, &value).await?,
        JobPatch::Full(input) => state.jobs.edit(&id, input).await?,
    }
    state.notify_records(jobs::COLLECTION);
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_job(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Query(query): Query<DeleteQuery>,
) -> Result<impl IntoResponse, ApiError> {
    state.jobs.delete(&id, query.confirm).await?;
    state.notify_records(jobs::COLLECTION);
    Ok(StatusCode::NO_CONTENT)
}

async fn complete_job(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.jobs.complete(&id).await?;
    state.notify_records(jobs::COLLECTION);
    Ok(StatusCode::NO_CONTENT)
}

// Actions

async fn list_actions(
    State(state): State<SharedState>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.actions.list(query.list_filter()?).await?))
}

async fn create_action(
    State(state): State<SharedState>,
    Json(input): Json<ActionInput>,
) -> Result<impl IntoResponse, ApiError> {
    let id = state.actions.create(input).await?;
    state.notify_records(actions::COLLECTION);
    Ok(created(id))
}

async fn get_action(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.actions.get(&id).await?))
}

async fn edit_action(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(input): Json<ActionInput>,
) -> Result<impl IntoResponse, ApiError> {
    state.actions.edit(&id, input).await?;
    state.notify_records(actions::COLLECTION);
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_action(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Query(query): Query<DeleteQuery>,
) -> Result<impl IntoResponse, ApiError> {
    state.actions.delete(&id, query.confirm).await?;
    state.notify_records(actions::COLLECTION);
    Ok(StatusCode::NO_CONTENT)
}

async fn complete_action(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.actions.complete(&id).await?;
    state.notify_records(actions::COLLECTION);
    Ok(StatusCode::NO_CONTENT)
}

// Team

async fn list_team(State(state): State<SharedState>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.team.list().await?))
}

async fn create_team_member(
    State(state): State<SharedState>,
    Json(input): Json<TeamInput>,
) -> Result<impl IntoResponse, ApiError> {
    let id = state.team.create(input).await?;
    state.notify_records(team::COLLECTION);
    Ok(created(id))
}

async fn patch_goal(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(patch): Json<GoalPatch>,
) -> Result<impl IntoResponse, ApiError> {
    state.team.save_field(&id, GOAL_TITLE_FIELD, &patch.title).await?;
    state.notify_records(team::COLLECTION);
    Ok(StatusCode::NO_CONTENT)
}

// Training

async fn list_training(
    State(state): State<SharedState>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.training.list(query.list_filter()?).await?))
}

async fn create_training(
    State(state): State<SharedState>,
    Json(input): Json<TrainingInput>,
) -> Result<impl IntoResponse, ApiError> {
    let id = state.training.create(input).await?;
    state.notify_records(training::COLLECTION);
    Ok(created(id))
}

async fn get_training(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.training.get(&id).await?))
}

async fn edit_training(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(edit): Json<TrainingEdit>,
) -> Result<impl IntoResponse, ApiError> {
    state.training.edit(&id, edit).await?;
    state.notify_records(training::COLLECTION);
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_training(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Query(query): Query<DeleteQuery>,
) -> Result<impl IntoResponse, ApiError> {
    state.training.delete(&id, query.confirm).await?;
    state.notify_records(training::COLLECTION);
    Ok(StatusCode::NO_CONTENT)
}

async fn toggle_training_week(
    State(state): State<SharedState>,
    Path((id, index)): Path<(String, usize)>,
) -> Result<impl IntoResponse, ApiError> {
    let progress = state.training.toggle_week(&id, index).await?;
    state.notify_records(training::COLLECTION);
    Ok(Json(json!({ "progress": progress })))
}

async fn complete_training(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.training.complete(&id).await?;
    state.notify_records(training::COLLECTION);
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::reorder::{ItemNode, ListSnapshot};
    use crate::store::{DocumentStore, MemoryStore};
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn test_state() -> SharedState {
        Arc::new(AppState::new(
            Arc::new(MemoryStore::new()),
            PlanLocation::default(),
        ))
    }

    fn test_app(state: &SharedState) -> Router {
        api_router().with_state(state.clone())
    }

    async fn send(app: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    fn board_from(plan: &TransitionPlan) -> BoardSnapshot {
        BoardSnapshot {
            lists: plan
                .sorted_weeks()
                .into_iter()
                .map(|(key, week)| ListSnapshot {
                    week: key.clone(),
                    items: week
                        .action_items
                        .iter()
                        .enumerate()
                        .map(|(i, item)| ItemNode {
                            id: item.id.clone(),
                            text: item.text.clone(),
                            completed: item.completed,
                            target_date: item.target_date.clone(),
                            midpoint_y: 10.0 + 20.0 * i as f64,
                        })
                        .collect(),
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_health_check() {
        let state = test_state();
        let response = test_app(&state)
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"ok");
    }

    #[tokio::test]
    async fn test_get_plan_repairs_empty_store() {
        let state = test_state();
        let (status, body) = send(test_app(&state), "GET", "/api/plan", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["repaired"], true);
        assert_eq!(body["plan"]["weeks"].as_object().unwrap().len(), 6);

        let (_, again) = send(test_app(&state), "GET", "/api/plan", None).await;
        assert_eq!(again["repaired"], false);
    }

    #[tokio::test]
    async fn test_patch_item_toggles_completed() {
        let state = test_state();
        send(test_app(&state), "GET", "/api/plan", None).await;
        let (status, body) = send(
            test_app(&state),
            "PATCH",
            "/api/plan/items",
            Some(json!({"week": "week2", "index": 1, "field": "completed", "value": true})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["path"], "weeks.week2.actionItems.1.completed");

        let loaded = state.plan.load().await.unwrap();
        assert!(loaded.plan.weeks["week2"].action_items[1].completed);
    }

    #[tokio::test]
    async fn test_patch_item_out_of_range_carries_revert() {
        let state = test_state();
        send(test_app(&state), "GET", "/api/plan", None).await;
        let (status, body) = send(
            test_app(&state),
            "PATCH",
            "/api/plan/items",
            Some(json!({
                "week": "week1", "index": 40, "field": "text",
                "value": "Edited", "previous": "Original"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["revert"]["path"], "weeks.week1.actionItems.40.text");
        assert_eq!(body["revert"]["value"], "Original");
    }

    #[tokio::test]
    async fn test_patch_deleted_item_reverts_to_client_value() {
        let state = test_state();
        let loaded = state.plan.load().await.unwrap();
        let first = loaded.plan.weeks["week1"].action_items[0].clone();
        let second_text = loaded.plan.weeks["week1"].action_items[1].text.clone();
        state
            .plan
            .delete_item(&ItemRef::new("week1", 0), true)
            .await
            .unwrap();

        let (status, body) = send(
            test_app(&state),
            "PATCH",
            "/api/plan/items",
            Some(json!({
                "week": "week1", "index": 0, "id": first.id,
                "field": "text", "value": "Edited", "previous": first.text
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["revert"]["value"], json!(first.text));
        assert_ne!(body["revert"]["value"], json!(second_text));

        let after = state.plan.load().await.unwrap().plan;
        assert_eq!(after.weeks["week1"].action_items[0].text, second_text);
    }

    #[tokio::test]
    async fn test_patch_item_rejects_wrong_value_type() {
        let state = test_state();
        let (status, _) = send(
            test_app(&state),
            "PATCH",
            "/api/plan/items",
            Some(json!({"week": "week1", "index": 0, "field": "completed", "value": "yes"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_add_and_delete_item() {
        let state = test_state();
        send(test_app(&state), "GET", "/api/plan", None).await;

        let (status, body) =
            send(test_app(&state), "POST", "/api/plan/weeks/week6/items", None).await;
        assert_eq!(status, StatusCode::CREATED);
        let items = body["plan"]["weeks"]["week6"]["actionItems"].as_array().unwrap();
        assert_eq!(items.len(), 4);
        assert_eq!(items[3]["text"], "New Action Item");

        let (status, _) =
            send(test_app(&state), "DELETE", "/api/plan/weeks/week6/items/3", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(state.plan.load().await.unwrap().plan.weeks["week6"].action_items.len(), 4);

        let (status, body) = send(
            test_app(&state),
            "DELETE",
            "/api/plan/weeks/week6/items/3?confirm=true",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["plan"]["weeks"]["week6"]["actionItems"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_unknown_week_is_not_found() {
        let state = test_state();
        let (status, body) =
            send(test_app(&state), "POST", "/api/plan/weeks/week9/items", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("week9"));
    }

    #[tokio::test]
    async fn test_drop_moves_item_across_weeks() {
        let state = test_state();
        let loaded = state.plan.load().await.unwrap();
        let moved = loaded.plan.weeks["week1"].action_items[0].text.clone();
        let request = json!({
            "version": loaded.version,
            "source": {"week": "week1", "index": 0},
            "targetWeek": "week2",
            "pointerY": 0.0,
            "board": board_from(&loaded.plan),
        });

        let (status, body) = send(test_app(&state), "POST", "/api/plan/drop", Some(request)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["placed"]["week"], "week2");
        assert_eq!(body["placed"]["index"], 0);

        let after = state.plan.load().await.unwrap().plan;
        assert_eq!(after.weeks["week1"].action_items.len(), 3);
        assert_eq!(after.weeks["week2"].action_items[0].text, moved);
    }

    #[tokio::test]
    async fn test_drop_to_end_of_same_week_keeps_item_fields() {
        let state = test_state();
        let first = ItemRef::new("week6", 0);
        state.plan.toggle_completed(&first, true).await.unwrap();
        state
            .plan
            .edit_date(&first, "2025-03-14".to_string())
            .await
            .unwrap();
        let loaded = state.plan.load().await.unwrap();
        let moved = loaded.plan.weeks["week6"].action_items[0].clone();
        let request = json!({
            "version": loaded.version,
            "source": {"week": "week6", "index": 0},
            "targetWeek": "week6",
            "pointerY": 500.0,
            "board": board_from(&loaded.plan),
        });

        let (status, body) = send(test_app(&state), "POST", "/api/plan/drop", Some(request)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["placed"]["index"], 2);

        let items = &state.plan.load().await.unwrap().plan.weeks["week6"].action_items;
        assert_eq!(items.len(), 3);
        assert_eq!(items[2].text, moved.text);
        assert!(items[2].completed);
        assert_eq!(items[2].target_date, "2025-03-14");
        assert_eq!(items[2].id, moved.id);
    }

    #[tokio::test]
    async fn test_drop_with_stale_version_conflicts() {
        let state = test_state();
        let loaded = state.plan.load().await.unwrap();
        state.plan.add_item("week3").await.unwrap();
        let request = json!({
            "version": loaded.version,
            "source": {"week": "week1", "index": 0},
            "targetWeek": "week1",
            "pointerY": 100.0,
            "board": board_from(&loaded.plan),
        });
        let (status, _) = send(test_app(&state), "POST", "/api/plan/drop", Some(request)).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_job_crud_and_not_found() {
        let state = test_state();
        let (status, body) = send(
            test_app(&state),
            "POST",
            "/api/jobs",
            Some(json!({
                "name": "Smith residence", "priority": "high", "status": "active",
                "targetDate": "2025-04-01", "assignee": "hardy"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = body["id"].as_str().unwrap().to_string();

        let (status, _) = send(
            test_app(&state),
            "PATCH",
            &format!("/api/jobs/{id}"),
            Some(json!({"field": "status", "value": "on-hold"})),
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (_, listed) = send(test_app(&state), "GET", "/api/jobs?filter=active", None).await;
        assert_eq!(listed.as_array().unwrap().len(), 1);
        assert_eq!(listed[0]["status"], "on-hold");

        let (status, _) = send(test_app(&state), "GET", "/api/jobs/missing", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(test_app(&state), "GET", "/api/jobs?filter=bogus", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_training_toggle_reports_progress() {
        let state = test_state();
        let id = state
            .training
            .create(TrainingInput {
                trainee: "Sam".into(),
                mid_lead: "Jacob".into(),
                target_end_date: "2025-06-01".into(),
            })
            .await
            .unwrap();
        let (status, body) = send(
            test_app(&state),
            "POST",
            &format!("/api/training/{id}/weeks/2/toggle"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["progress"], 17);

        let (status, _) = send(
            test_app(&state),
            "POST",
            &format!("/api/training/{id}/weeks/9/toggle"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_team_goal_patch() {
        let state = test_state();
        let id = state
            .team
            .create(TeamInput {
                name: "Nate".into(),
                role: "Tech".into(),
                goal: String::new(),
            })
            .await
            .unwrap();
        let (status, _) = send(
            test_app(&state),
            "PATCH",
            &format!("/api/team/{id}/goal"),
            Some(json!({"title": "WRT certification"})),
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let doc = state.store.get(team::COLLECTION, &id).await.unwrap().unwrap();
        assert_eq!(doc.data["goals"][0]["title"], "WRT certification");
    }

    #[tokio::test]
    async fn test_writes_broadcast_notifications() {
        let state = test_state();
        let mut rx = state.ws_tx.subscribe();
        send(
            test_app(&state),
            "POST",
            "/api/team",
            Some(json!({"name": "Josh", "role": "Tech"})),
        )
        .await;
        let msg = rx.recv().await.unwrap();
        assert!(msg.contains("RecordsChanged"));
        assert!(msg.contains("team"));
    }

    #[test]
    fn test_error_status_mapping() {
        let conflict: ApiError = PlanError::Store(StoreError::VersionConflict {
            expected: 1,
            actual: 2,
        })
        .into();
        assert_eq!(conflict.status(), StatusCode::CONFLICT);

        let missing: ApiError = RecordError::NotFound {
            collection: "jobs".into(),
            id: "x".into(),
        }
        .into();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let reverted = ApiError::BadRequest("bad".into()).with_revert(Revert {
            path: "weeks.week1.actionItems.0.text".into(),
            value: json!("old"),
        });
        assert_eq!(reverted.status(), StatusCode::BAD_REQUEST);
    }
}
