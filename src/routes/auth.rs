use axum::extract::State;
use axum::http::header::SET_COOKIE;
use axum::http::StatusCode;
use axum::response::{AppendHeaders, IntoResponse};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::auth::account::{self, Registration};
use crate::auth::{CurrentUser, SESSION_COOKIE};
use crate::db::sessions;
use crate::error::AppResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

fn session_cookie(token: &str, max_age_secs: i64) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE, token, max_age_secs
    )
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(form): Json<Registration>,
) -> AppResult<impl IntoResponse> {
    let user = account::register(&state.pool, form).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Registration successful. Your account is waiting for verification.",
            "user": user,
        })),
    ))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(form): Json<LoginForm>,
) -> AppResult<impl IntoResponse> {
    let ttl = state.config.session_ttl_hours;
    let (user, token) = account::login(&state.pool, &form.email, &form.password, ttl).await?;
    let cookie = session_cookie(&token, ttl * 3600);

    Ok((
        AppendHeaders([(SET_COOKIE, cookie)]),
        Json(json!({
            "token": token,
            "dashboard_path": user.role.dashboard_path(),
            "user": user,
        })),
    ))
}

pub async fn logout(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
) -> AppResult<impl IntoResponse> {
    sessions::delete_session(&state.pool, &current.token).await?;
    tracing::info!(user_id = current.user.id, "user logged out");
    Ok((
        AppendHeaders([(SET_COOKIE, session_cookie("", 0))]),
        StatusCode::NO_CONTENT,
    ))
}

pub async fn me(current: CurrentUser) -> impl IntoResponse {
    Json(json!({
        "user": current.user,
        "dashboard_path": current.user.role.dashboard_path(),
    }))
}
