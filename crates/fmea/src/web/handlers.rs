//! Request handlers.
//!
//! Each handler that touches the database opens its own connection on the
//! blocking pool and drops it before returning.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::{Form, Json};
use serde::Deserialize;
use tera::Context;
use tracing::debug;

use super::form::FormState;
use super::AppState;
use crate::error::Result;
use crate::stats::{summarize, Overview};
use crate::storage::{Database, RecordStore, Storage};
use crate::validate::FormInput;

/// Where a successful submission lands.
pub const SUBMITTED_LOCATION: &str = "/form?submitted=1";

/// Run `work` against a fresh connection on the blocking thread pool.
async fn with_storage<T, F>(db: &Database, work: F) -> Result<T>
where
    F: FnOnce(&Storage) -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    let db = db.clone();
    tokio::task::spawn_blocking(move || {
        let storage = db.connect()?;
        work(&storage)
    })
    .await?
}

/// `GET /`
pub async fn index() -> Redirect {
    Redirect::to("/home")
}

/// `GET /home`
pub async fn home(State(state): State<AppState>) -> Result<Html<String>> {
    let mut context = Context::new();
    context.insert("top_n", &state.top_n);
    Ok(Html(state.templates.render("home.html", &context)?))
}

/// Query string of `GET /form`.
#[derive(Debug, Default, Deserialize)]
pub struct FormQuery {
    /// Present after a successful submission; the value is ignored.
    #[serde(default)]
    pub submitted: Option<String>,
}

/// `GET /form`
pub async fn form_page(
    State(state): State<AppState>,
    Query(query): Query<FormQuery>,
) -> Result<Response> {
    render_form(&state, &FormState::blank(), query.submitted.is_some())
}

/// `POST /form`
pub async fn submit_form(
    State(state): State<AppState>,
    Form(input): Form<FormInput>,
) -> Result<Response> {
    let submitted = input.clone();
    let outcome = with_storage(&state.db, move |storage| storage.submit(&submitted)).await;

    let form = FormState::from_submission(outcome, input)?;
    if let FormState::AwaitingInput {
        error: Some(message),
        ..
    } = &form
    {
        debug!("Rejected submission: {message}");
    }
    render_form(&state, &form, false)
}

fn render_form(state: &AppState, form: &FormState, submitted: bool) -> Result<Response> {
    let Some(view) = form.view(submitted) else {
        return Ok(Redirect::to(SUBMITTED_LOCATION).into_response());
    };

    let status = if view.error.is_some() {
        StatusCode::UNPROCESSABLE_ENTITY
    } else {
        StatusCode::OK
    };
    let html = state
        .templates
        .render("form.html", &Context::from_serialize(&view)?)?;
    Ok((status, Html(html)).into_response())
}

/// `GET /dashboard`
pub async fn dashboard(State(state): State<AppState>) -> Result<Html<String>> {
    let top_n = state.top_n;
    let overview = with_storage(&state.db, move |storage| {
        Ok(Overview::from_records(storage.list_all()?, top_n))
    })
    .await?;

    let mut context = Context::from_serialize(&overview)?;
    context.insert("total", &overview.records.len());
    context.insert("buckets", &overview.histogram.buckets());
    context.insert("top_n", &top_n);
    Ok(Html(state.templates.render("dashboard.html", &context)?))
}

/// `GET /reports`
pub async fn reports(State(state): State<AppState>) -> Result<Html<String>> {
    let records = with_storage(&state.db, |storage| storage.list_all()).await?;

    let mut context = Context::new();
    context.insert("summary", &summarize(&records));
    context.insert("total", &records.len());
    context.insert("records", &records);
    Ok(Html(state.templates.render("reports.html", &context)?))
}

/// `GET /healthz`
pub async fn healthz(State(state): State<AppState>) -> Result<Json<serde_json::Value>> {
    let records = with_storage(&state.db, Storage::count).await?;
    Ok(Json(serde_json::json!({
        "status": "ok",
        "records": records,
    })))
}
