use axum::extract::FromRequestParts;
use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::request::Parts;
use axum::http::HeaderMap;
use chrono::Utc;
use std::sync::Arc;

use super::Role;
use crate::db::{sessions, User};
use crate::error::AppError;
use crate::state::AppState;

pub const SESSION_COOKIE: &str = "confdesk_session";

/// The authenticated user behind a request, resolved from a Bearer token or
/// the session cookie.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: User,
    pub token: String,
}

impl CurrentUser {
    pub fn require_role(&self, role: Role) -> Result<(), AppError> {
        if self.user.role == role {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!(
                "This action requires the {} role.",
                role
            )))
        }
    }

    /// Participants need admin verification before working with submissions.
    pub fn require_verified(&self) -> Result<(), AppError> {
        if self.user.role != Role::Participant || self.user.is_verified() {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "Your account is waiting for verification by the committee.".to_string(),
            ))
        }
    }
}

pub fn session_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty());
    if bearer.is_some() {
        return bearer;
    }

    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, token)| token.to_string())
        .filter(|token| !token.is_empty())
}

#[axum::async_trait]
impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = session_token(&parts.headers).ok_or(AppError::Unauthorized)?;
        let user = sessions::user_for_token(&state.pool, &token, Utc::now())
            .await?
            .ok_or(AppError::Unauthorized)?;
        Ok(CurrentUser { user, token })
    }
}

/// Extractor that only admits admins.
#[derive(Debug, Clone)]
pub struct AdminUser(pub User);

#[axum::async_trait]
impl FromRequestParts<Arc<AppState>> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let current = CurrentUser::from_request_parts(parts, state).await?;
        current.require_role(Role::Admin)?;
        Ok(AdminUser(current.user))
    }
}

/// Extractor that only admits reviewers.
#[derive(Debug, Clone)]
pub struct ReviewerUser(pub User);

#[axum::async_trait]
impl FromRequestParts<Arc<AppState>> for ReviewerUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let current = CurrentUser::from_request_parts(parts, state).await?;
        current.require_role(Role::Reviewer)?;
        Ok(ReviewerUser(current.user))
    }
}
