//! Page shell and server-rendered fragments.
//!
//! `GET /` returns the shell: header, date banner, tab navigation, the two
//! shared dialogs and one empty container per tab. The client fills a tab
//! container from `GET /views/{tab}?filter=` and a dialog body from
//! `GET /views/{tab}/forms/{form}?id=`.

use axum::{
    Router,
    extract::{Path, Query, State},
    response::Html,
    routing::get,
};
use chrono::{Local, NaiveDate};
use serde::Deserialize;
use tracing::error;

use super::api::{ApiError, ListQuery, SharedState};
use crate::plan::render::{render_load_error, render_plan};
use crate::ui::modal::dialog_containers;
use crate::ui::{current_date_banner, escape};
use crate::views::{Tab, ViewState, actions, jobs, team, training};

pub const APP_TITLE: &str = "Management Transition Dashboard";

pub fn shell_router() -> Router<SharedState> {
    Router::new()
        .route("/", get(index_page))
        .route("/views/{tab}", get(view_fragment))
        .route("/views/{tab}/forms/{form}", get(form_fragment))
}

#[derive(Debug, Deserialize, Default)]
pub struct FormQuery {
    pub id: Option<String>,
}

async fn index_page() -> Html<String> {
    Html(render_shell(Local::now().date_naive()))
}

async fn view_fragment(
    State(state): State<SharedState>,
    Path(tab): Path<String>,
    Query(query): Query<ListQuery>,
) -> Result<Html<String>, ApiError> {
    let tab: Tab = tab.parse().map_err(ApiError::NotFound)?;
    let view = ViewState::new(tab, query.list_filter()?);
    Ok(Html(render_tab(&state, view).await))
}

async fn form_fragment(
    State(state): State<SharedState>,
    Path((tab, form)): Path<(String, String)>,
    Query(query): Query<FormQuery>,
) -> Result<Html<String>, ApiError> {
    let tab: Tab = tab.parse().map_err(ApiError::NotFound)?;
    let html = render_form(&state, tab, &form, query.id.as_deref()).await?;
    Ok(Html(html))
}

pub fn render_shell(today: NaiveDate) -> String {
    let nav: String = Tab::ALL
        .iter()
        .map(|tab| {
            let active = if *tab == Tab::default() { " active" } else { "" };
            format!(
                r#"<button class="nav-tab{active}" data-tab="{}">{}</button>"#,
                tab.as_str(),
                tab.label()
            )
        })
        .collect();
    let sections: String = Tab::ALL
        .iter()
        .map(|tab| {
            let active = if *tab == Tab::default() { " active" } else { "" };
            format!(
                r#"<section id="{0}" class="tab-content{active}" data-tab="{0}"></section>"#,
                tab.as_str()
            )
        })
        .collect();
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>{title}</title>
<link rel="stylesheet" href="/assets/style.css">
</head>
<body>
<div class="container">
<header class="header"><h1>{title}</h1><div class="current-date" id="currentDate">{date}</div></header>
<nav class="nav-tabs">{nav}</nav>
<main>{sections}</main>
</div>
{dialogs}
<script src="/assets/app.js"></script>
</body>
</html>"#,
        title = escape(APP_TITLE),
        date = escape(&current_date_banner(today)),
        dialogs = dialog_containers(),
    )
}

/// Tab body for `view`. Read failures become a static inline error so the
/// rest of the page keeps working.
pub async fn render_tab(state: &SharedState, view: ViewState) -> String {
    match view.tab {
        Tab::Transition => match state.plan.load().await {
            Ok(loaded) => render_plan(&loaded.plan, loaded.version).to_html(),
            Err(e) => {
                error!(error = %e, "Failed to load transition plan");
                render_load_error()
            }
        },
        Tab::Jobs => match state.jobs.list(view.filter).await {
            Ok(records) => jobs::render(&records, &view),
            Err(e) => {
                error!(error = %e, "Failed to load jobs");
                jobs::render_error()
            }
        },
        Tab::Actions => match state.actions.list(view.filter).await {
            Ok(records) => actions::render(&records, &view),
            Err(e) => {
                error!(error = %e, "Failed to load action items");
                actions::render_error()
            }
        },
        Tab::Team => match state.team.list().await {
            Ok(records) => team::render(&records),
            Err(e) => {
                error!(error = %e, "Failed to load team");
                team::render_error()
            }
        },
        Tab::Training => match state.training.list(view.filter).await {
            Ok(records) => training::render(&records, &view),
            Err(e) => {
                error!(error = %e, "Failed to load training plans");
                training::render_error()
            }
        },
    }
}

/// Dialog body for `{tab}/{form}`. Edit forms need the record id.
pub async fn render_form(
    state: &SharedState,
    tab: Tab,
    form: &str,
    id: Option<&str>,
) -> Result<String, ApiError> {
    let require_id = || id.ok_or_else(|| ApiError::BadRequest("Missing record id".into()));
    let html = match (tab, form) {
        (Tab::Jobs, "new") => jobs::new_form().to_html(),
        (Tab::Jobs, "batch") => jobs::batch_form(),
        (Tab::Jobs, "edit") => jobs::edit_form(&state.jobs.get(require_id()?).await?).to_html(),
        (Tab::Actions, "new") => actions::new_form().to_html(),
        (Tab::Actions, "edit") => {
            actions::edit_form(&state.actions.get(require_id()?).await?).to_html()
        }
        (Tab::Team, "new") => team::new_form().to_html(),
        (Tab::Training, "new") => training::new_form(Local::now().date_naive()).to_html(),
        (Tab::Training, "edit") => {
            training::edit_form(&state.training.get(require_id()?).await?).to_html()
        }
        (tab, form) => {
            return Err(ApiError::NotFound(format!("No form '{form}' on the {tab} tab")));
        }
    };
    Ok(html)
}
