use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;

use super::MultipartForm;
use crate::auth::AdminUser;
use crate::error::{AppError, AppResult, ValidationErrors};
use crate::settings::{HeroText, NewLandingSetting, ResourceMeta, TimelineEntry};
use crate::state::AppState;
use crate::storage::Upload;

#[derive(Debug, Deserialize)]
pub struct ValueForm {
    #[serde(default)]
    value: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct TimelineForm {
    #[serde(default)]
    timeline: Vec<TimelineEntry>,
}

#[derive(Debug, Deserialize)]
pub struct ResourcesForm {
    #[serde(default)]
    resources: Vec<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
pub struct HeroTextForm {
    #[serde(default)]
    hero_text: HeroText,
}

#[derive(Debug, Deserialize)]
pub struct LogoIndexForm {
    #[serde(default)]
    index: Option<usize>,
}

fn required_file(form: &mut MultipartForm, field: &str) -> AppResult<Upload> {
    form.take_file(field).ok_or_else(|| {
        AppError::Validation(ValidationErrors::single(
            field,
            format!("The {} field is required.", field.replace('_', " ")),
        ))
    })
}

fn required_index(form: &MultipartForm) -> AppResult<usize> {
    form.parse::<usize>("index").ok_or_else(|| {
        AppError::Validation(ValidationErrors::single(
            "index",
            "The index must be a non-negative integer.",
        ))
    })
}

/// Strings are stored as sent; any other JSON value is stored encoded.
fn stored_value(value: Option<Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(text) => Some(text),
        other => Some(other.to_string()),
    }
}

pub async fn index(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
) -> AppResult<impl IntoResponse> {
    Ok(Json(state.landing.grouped().await?))
}

pub async fn store(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Json(form): Json<NewLandingSetting>,
) -> AppResult<impl IntoResponse> {
    let setting = state.landing.create(form).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Setting created successfully", "setting": setting })),
    ))
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(key): Path<String>,
    Json(form): Json<ValueForm>,
) -> AppResult<impl IntoResponse> {
    let setting = state
        .landing
        .update_or_create(&key, stored_value(form.value))
        .await?;
    Ok(Json(json!({ "message": "Setting updated successfully", "setting": setting })))
}

pub async fn destroy(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    state.landing.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn upload_speaker_photo(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    let mut form = MultipartForm::read(multipart).await?;
    let index = required_index(&form)?;
    let photo = required_file(&mut form, "photo")?;
    let url = state.landing.upload_speaker_photo(index, &photo).await?;
    Ok(Json(json!({ "success": true, "url": url })))
}

pub async fn upload_sponsor_logo(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    let mut form = MultipartForm::read(multipart).await?;
    let index = required_index(&form)?;
    let logo = required_file(&mut form, "logo")?;
    let url = state.landing.upload_sponsor_logo(index, &logo).await?;
    Ok(Json(json!({ "success": true, "url": url })))
}

pub async fn upload_resource_file(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    let mut form = MultipartForm::read(multipart).await?;
    let file = required_file(&mut form, "file")?;
    let meta = ResourceMeta {
        title: form.text("title"),
        description: form.optional("description"),
        index: form.parse("resource_index"),
    };
    let resource = state.landing.upload_resource_file(meta, &file).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Resource uploaded successfully",
        "resource": resource,
    })))
}

pub async fn upload_hero_background(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    let mut form = MultipartForm::read(multipart).await?;
    let background = required_file(&mut form, "hero_background")?;
    let hero = state.landing.upload_hero_background(&background).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Hero background uploaded successfully",
        "data": hero,
    })))
}

pub async fn upload_hero_logo(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    let mut form = MultipartForm::read(multipart).await?;
    let logo = required_file(&mut form, "hero_logo")?;
    let hero_logo = state.landing.upload_hero_logo(&logo).await?;
    Ok(Json(json!({
        "success": true,
        "hero_logo": hero_logo,
        "message": "Hero logo uploaded successfully",
    })))
}

pub async fn upload_hero_logo_secondary(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    let mut form = MultipartForm::read(multipart).await?;
    let logo = required_file(&mut form, "hero_logo_secondary")?;
    let logos = state.landing.add_secondary_hero_logo(&logo).await?;
    Ok(Json(json!({
        "success": true,
        "hero_logos_secondary": logos,
        "message": "Secondary logo added successfully",
    })))
}

pub async fn delete_hero_logo_secondary(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Json(form): Json<LogoIndexForm>,
) -> AppResult<impl IntoResponse> {
    let index = form.index.ok_or_else(|| {
        AppError::Validation(ValidationErrors::single(
            "index",
            "The index must be a non-negative integer.",
        ))
    })?;
    let logos = state.landing.delete_secondary_hero_logo(index).await?;
    Ok(Json(json!({
        "success": true,
        "hero_logos_secondary": logos,
        "message": "Secondary logo deleted successfully",
    })))
}

pub async fn save_timeline(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Json(form): Json<TimelineForm>,
) -> AppResult<impl IntoResponse> {
    let timeline = state.landing.save_timeline(form.timeline).await?;
    Ok(Json(json!({ "success": true, "timeline": timeline })))
}

pub async fn save_resources(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Json(form): Json<ResourcesForm>,
) -> AppResult<impl IntoResponse> {
    let resources = state.landing.save_resources(form.resources).await?;
    Ok(Json(json!({ "success": true, "resources": resources })))
}

pub async fn save_hero_text(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Json(form): Json<HeroTextForm>,
) -> AppResult<impl IntoResponse> {
    let hero_text = state.landing.save_hero_text(form.hero_text).await?;
    Ok(Json(json!({ "success": true, "hero_text": hero_text })))
}
