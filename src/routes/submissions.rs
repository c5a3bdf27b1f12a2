use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use super::MultipartForm;
use crate::auth::CurrentUser;
use crate::db::submissions as store;
use crate::db::CoAuthor;
use crate::error::{AppError, AppResult};
use crate::state::AppState;
use crate::submissions::service::{self, MAX_CO_AUTHORS};
use crate::submissions::{SubmissionForm, SubmissionUploads};

#[derive(Debug, Default, Deserialize)]
pub struct DeletionRequest {
    #[serde(default)]
    reason: Option<String>,
}

/// Reads the submission form fields and files out of a multipart body.
fn submission_form(form: &mut MultipartForm) -> (SubmissionForm, SubmissionUploads) {
    let co_authors = (1..=MAX_CO_AUTHORS)
        .filter_map(|i| {
            let name = form.optional(&format!("co_author_{}", i))?;
            Some(CoAuthor {
                name,
                institute: form.optional(&format!("co_author_{}_institute", i)),
            })
        })
        .collect();

    let fields = SubmissionForm {
        title: form.text("title"),
        author_full_name: form.text("author_full_name"),
        co_authors,
        mobile_number: form.text("mobile_number"),
        corresponding_author_email: form.text("corresponding_author_email"),
        institute_organization: form.text("institute_organization"),
        paper_theme: form.optional("paper_theme"),
        paper_sub_theme: form.text("paper_sub_theme"),
        category_submission: form.text("category_submission"),
        participant_category: form.text("participant_category"),
        abstract_text: form.text("abstract"),
        keywords: form.text("keywords"),
        publication_option: form.optional("publication_option"),
        consent_agreed: form.flag("consent_agreed"),
    };
    let uploads = SubmissionUploads {
        abstract_file: form.take_file("abstract_file"),
        full_paper_file: form.take_file("full_paper_file"),
        layouting_file: form.take_file("layouting_file"),
        editor_feedback_file: form.take_file("editor_feedback_file"),
    };
    (fields, uploads)
}

pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
) -> AppResult<impl IntoResponse> {
    let submissions = service::overview_for_user(&state, current.user.id).await?;
    let window = state.settings.submission_window().await?.status(Utc::now());
    Ok(Json(json!({
        "user": current.user,
        "submissions": submissions,
        "submission_status": window,
    })))
}

pub async fn index(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
) -> AppResult<impl IntoResponse> {
    current.require_verified()?;
    let submissions = store::list_for_user(&state.pool, current.user.id).await?;
    Ok(Json(submissions))
}

pub async fn show(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    current.require_verified()?;
    let submission = store::get_owned_submission(&state.pool, id, current.user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("submission".to_string()))?;
    Ok(Json(submission))
}

pub async fn store(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    current.require_verified()?;
    let mut form = MultipartForm::read(multipart).await?;
    let (fields, uploads) = submission_form(&mut form);
    let submission = service::create(&state, &current.user, fields, uploads).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": format!(
                "Submission created successfully. Your submission code is {}.",
                submission.submission_code
            ),
            "submission": submission,
        })),
    ))
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    current.require_verified()?;
    let mut form = MultipartForm::read(multipart).await?;
    let (fields, uploads) = submission_form(&mut form);
    let submission = service::update_own(&state, &current.user, id, fields, uploads).await?;
    Ok(Json(json!({
        "message": "Submission updated successfully.",
        "submission": submission,
    })))
}

pub async fn request_deletion(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(id): Path<i64>,
    Json(body): Json<DeletionRequest>,
) -> AppResult<impl IntoResponse> {
    let submission =
        service::request_deletion(&state, &current.user, id, body.reason.as_deref()).await?;
    Ok(Json(json!({
        "message": "Deletion request sent to the committee.",
        "submission": submission,
    })))
}
