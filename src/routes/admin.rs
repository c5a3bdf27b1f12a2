use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::admin::{self, EmailSettingsForm};
use crate::auth::account::{self, NewAccount};
use crate::auth::{AdminUser, Role};
use crate::db::users;
use crate::error::{AppError, AppResult, ValidationErrors};
use crate::payments;
use crate::state::AppState;
use crate::submissions::{workflow, SubmissionStatus};

#[derive(Debug, Deserialize)]
pub struct StatusForm {
    #[serde(default)]
    status: String,
}

#[derive(Debug, Deserialize)]
pub struct BulkStatusForm {
    #[serde(default)]
    submission_ids: Vec<i64>,
    #[serde(default)]
    status: String,
}

#[derive(Debug, Deserialize)]
pub struct ReviewerAssignment {
    #[serde(default)]
    reviewer_ids: Vec<i64>,
}

#[derive(Debug, Deserialize)]
pub struct RoleForm {
    #[serde(default)]
    role: String,
}

#[derive(Debug, Deserialize)]
pub struct PasswordForm {
    #[serde(default)]
    password: String,
}

#[derive(Debug, Deserialize)]
pub struct VerificationForm {
    #[serde(default)]
    verify: bool,
}

#[derive(Debug, Deserialize)]
pub struct SubmissionSettingsForm {
    #[serde(default)]
    submission_enabled: bool,
    #[serde(default)]
    submission_deadline_start: Option<String>,
    #[serde(default)]
    submission_deadline_end: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TestEmailForm {
    #[serde(default)]
    test_email: String,
}

fn parse_status(value: &str) -> AppResult<SubmissionStatus> {
    value.parse().map_err(|_| {
        AppError::Validation(ValidationErrors::single(
            "status",
            "The selected status is invalid.",
        ))
    })
}

pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
) -> AppResult<impl IntoResponse> {
    Ok(Json(admin::dashboard(&state).await?))
}

pub async fn submissions(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
) -> AppResult<impl IntoResponse> {
    let submissions = workflow::list_for_admin(&state).await?;
    let reviewers = users::list_by_role(&state.pool, Role::Reviewer).await?;
    Ok(Json(json!({
        "submissions": submissions,
        "reviewers": reviewers,
    })))
}

pub async fn update_status(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(id): Path<i64>,
    Json(form): Json<StatusForm>,
) -> AppResult<impl IntoResponse> {
    let status = parse_status(&form.status)?;
    let change = workflow::change_status(&state, id, status).await?;
    tracing::info!(admin_id = admin.id, submission_id = id, status = %status, "status updated by admin");
    Ok(Json(json!({
        "message": "Submission status updated successfully!",
        "change": change,
    })))
}

pub async fn bulk_update_status(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Json(form): Json<BulkStatusForm>,
) -> AppResult<impl IntoResponse> {
    let status = parse_status(&form.status)?;
    let changes = workflow::bulk_change_status(&state, &form.submission_ids, status).await?;
    Ok(Json(json!({
        "message": format!("{} submissions updated successfully!", changes.len()),
        "changes": changes,
    })))
}

pub async fn assign_reviewers(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(id): Path<i64>,
    Json(form): Json<ReviewerAssignment>,
) -> AppResult<impl IntoResponse> {
    let assigned = workflow::assign_reviewers(&state, id, &form.reviewer_ids).await?;
    Ok(Json(json!({
        "message": "Reviewers assigned successfully!",
        "assigned": assigned,
    })))
}

pub async fn remove_reviewer(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path((id, reviewer_id)): Path<(i64, i64)>,
) -> AppResult<impl IntoResponse> {
    workflow::remove_reviewer(&state, id, reviewer_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_submission(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    workflow::delete(&state, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn export_submissions(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
) -> AppResult<Response> {
    let (filename, bytes) = workflow::export_csv(&state).await?;
    Response::builder()
        .header(CONTENT_TYPE, "text/csv; charset=UTF-8")
        .header(
            CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        )
        .body(Body::from(bytes))
        .map_err(|err| AppError::Internal(err.to_string()))
}

pub async fn payments(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
) -> AppResult<impl IntoResponse> {
    Ok(Json(payments::list_all(&state).await?))
}

pub async fn verify_payment(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    let payment = payments::set_verified(&state, id, true).await?;
    Ok(Json(json!({ "message": "Payment verified successfully!", "payment": payment })))
}

pub async fn reject_payment(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    let payment = payments::set_verified(&state, id, false).await?;
    Ok(Json(json!({ "message": "Payment rejected.", "payment": payment })))
}

pub async fn users(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
) -> AppResult<impl IntoResponse> {
    Ok(Json(users::list_users(&state.pool).await?))
}

pub async fn create_user(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Json(form): Json<NewAccount>,
) -> AppResult<impl IntoResponse> {
    let user = account::create_account(&state.pool, form).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "User created successfully", "user": user })),
    ))
}

pub async fn update_role(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(id): Path<i64>,
    Json(form): Json<RoleForm>,
) -> AppResult<impl IntoResponse> {
    let user = account::change_role(&state.pool, id, &form.role).await?;
    Ok(Json(json!({ "message": "User role updated successfully!", "user": user })))
}

pub async fn update_password(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(id): Path<i64>,
    Json(form): Json<PasswordForm>,
) -> AppResult<impl IntoResponse> {
    account::reset_password(&state.pool, id, &form.password).await?;
    Ok(Json(json!({ "message": "Password updated successfully" })))
}

pub async fn toggle_verification(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(id): Path<i64>,
    Json(form): Json<VerificationForm>,
) -> AppResult<impl IntoResponse> {
    let user = admin::set_user_verification(&state, id, form.verify).await?;
    Ok(Json(json!({
        "message": "User verification status updated successfully",
        "user": user,
    })))
}

pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    admin::delete_user(&state, &admin, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn submission_settings(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
) -> AppResult<impl IntoResponse> {
    Ok(Json(state.settings.submission_settings().await?))
}

pub async fn update_submission_settings(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Json(form): Json<SubmissionSettingsForm>,
) -> AppResult<impl IntoResponse> {
    state
        .settings
        .update_submission_window(
            form.submission_enabled,
            form.submission_deadline_start.as_deref(),
            form.submission_deadline_end.as_deref(),
        )
        .await?;
    Ok(Json(json!({
        "message": "Submission settings updated successfully.",
        "settings": state.settings.submission_settings().await?,
    })))
}

pub async fn email_settings(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
) -> AppResult<impl IntoResponse> {
    Ok(Json(admin::email_settings(&state).await?))
}

pub async fn save_email_settings(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Json(form): Json<EmailSettingsForm>,
) -> AppResult<impl IntoResponse> {
    let saved = admin::save_email_settings(&state, form).await?;
    Ok(Json(json!({
        "message": "Email settings saved successfully!",
        "settings": saved,
    })))
}

pub async fn test_email(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Json(form): Json<TestEmailForm>,
) -> AppResult<impl IntoResponse> {
    admin::send_test_email(&state, &form.test_email).await?;
    Ok(Json(json!({
        "success": true,
        "message": format!("Test email sent successfully to {}", form.test_email.trim()),
    })))
}
