use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use std::sync::Arc;

use crate::auth::ReviewerUser;
use crate::error::AppResult;
use crate::reviews::{self, ReviewForm};
use crate::state::AppState;

pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    ReviewerUser(reviewer): ReviewerUser,
) -> AppResult<impl IntoResponse> {
    let stats = reviews::stats(&state, &reviewer).await?;
    Ok(Json(json!({ "stats": stats, "user": reviewer })))
}

pub async fn reviews(
    State(state): State<Arc<AppState>>,
    ReviewerUser(reviewer): ReviewerUser,
) -> AppResult<impl IntoResponse> {
    Ok(Json(reviews::assigned(&state, &reviewer).await?))
}

pub async fn show_submission(
    State(state): State<Arc<AppState>>,
    ReviewerUser(reviewer): ReviewerUser,
    Path(id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    Ok(Json(reviews::view_submission(&state, &reviewer, id).await?))
}

pub async fn submit_review(
    State(state): State<Arc<AppState>>,
    ReviewerUser(reviewer): ReviewerUser,
    Path(id): Path<i64>,
    Json(form): Json<ReviewForm>,
) -> AppResult<impl IntoResponse> {
    let review = reviews::submit(&state, &reviewer, id, form).await?;
    Ok(Json(json!({
        "message": "Review submitted successfully!",
        "review": review,
    })))
}
