use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::response::{Html, Response};
use axum::Json;
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;
use tera::Context;

use crate::error::{AppError, AppResult};
use crate::settings::WindowStatus;
use crate::state::AppState;
use crate::templates;

pub async fn landing(State(state): State<Arc<AppState>>) -> AppResult<Html<String>> {
    let settings = state.landing.public_settings().await?;
    let window = state.settings.submission_window().await?.status(Utc::now());

    let mut ctx = Context::from_value(Value::Object((*settings).clone()))?;
    ctx.insert("conference_name", &state.config.conference_name);
    ctx.insert("submission", &window);

    Ok(Html(templates::render("landing.html", &ctx)?))
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn landing_settings(State(state): State<Arc<AppState>>) -> AppResult<Json<Value>> {
    let settings = state.landing.public_settings().await?;
    Ok(Json(Value::Object((*settings).clone())))
}

pub async fn submission_status(State(state): State<Arc<AppState>>) -> AppResult<Json<WindowStatus>> {
    let window = state.settings.submission_window().await?;
    Ok(Json(window.status(Utc::now())))
}

pub async fn download_resource(
    State(state): State<Arc<AppState>>,
    Path(index): Path<usize>,
) -> AppResult<Response> {
    let download = state.landing.resource_download(index).await?;
    let content = tokio::fs::read(&download.path).await?;

    Response::builder()
        .header(CONTENT_TYPE, download.content_type)
        .header(
            CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", download.download_name),
        )
        .body(Body::from(content))
        .map_err(|err| AppError::Internal(err.to_string()))
}
