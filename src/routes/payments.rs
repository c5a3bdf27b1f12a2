use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use std::sync::Arc;

use super::MultipartForm;
use crate::auth::CurrentUser;
use crate::error::AppResult;
use crate::payments;
use crate::state::AppState;

pub async fn index(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
) -> AppResult<impl IntoResponse> {
    Ok(Json(payments::list_own(&state, &current.user).await?))
}

pub async fn store(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    let mut form = MultipartForm::read(multipart).await?;
    let submission_id = form.parse::<i64>("submission_id").unwrap_or_default();
    let amount = form.parse::<f64>("amount");
    let proof = form.take_file("payment_proof");

    let payment = payments::upload_proof(&state, &current.user, submission_id, amount, proof).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Payment proof uploaded successfully.",
            "payment": payment,
        })),
    ))
}

pub async fn destroy(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    payments::delete_own(&state, &current.user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
