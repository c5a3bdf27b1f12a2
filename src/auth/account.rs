use chrono::{Duration, Utc};
use serde::Deserialize;

use super::{new_session_token, password, Role};
use crate::db::users::{self, NewUser};
use crate::db::{sessions, DbPool, User};
use crate::error::{AppError, AppResult, ValidationErrors};
use crate::validation;

pub const MIN_PASSWORD_LEN: usize = 8;
const CATEGORIES: &[&str] = &["Student", "Professional", "International Delegate"];

#[derive(Debug, Clone, Deserialize)]
pub struct Registration {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub password_confirmation: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub affiliation: String,
    #[serde(default)]
    pub whatsapp: String,
    #[serde(default)]
    pub category: String,
}

pub fn check_password(errors: &mut ValidationErrors, password: &str, confirmation: Option<&str>) {
    if password.chars().count() < MIN_PASSWORD_LEN {
        errors.add(
            "password",
            format!("The password must be at least {} characters.", MIN_PASSWORD_LEN),
        );
    }
    if let Some(confirmation) = confirmation {
        if confirmation != password {
            errors.add("password", "The password confirmation does not match.");
        }
    }
}

/// Registers an unverified participant. The email doubles as the account name.
pub async fn register(pool: &DbPool, form: Registration) -> AppResult<User> {
    let email = form.email.trim().to_lowercase();
    let mut errors = ValidationErrors::new();
    validation::email(&mut errors, "email", &email);
    check_password(&mut errors, &form.password, Some(&form.password_confirmation));
    validation::required(&mut errors, "full_name", &form.full_name, Some(255));
    validation::required(&mut errors, "affiliation", &form.affiliation, Some(255));
    validation::required(&mut errors, "whatsapp", &form.whatsapp, Some(255));
    validation::one_of(&mut errors, "category", form.category.trim(), CATEGORIES);
    if !errors.contains("email") && users::find_by_email(pool, &email).await?.is_some() {
        errors.add("email", "The email has already been taken.");
    }
    errors.into_result()?;

    let user = users::create_user(
        pool,
        &NewUser {
            name: email.clone(),
            email,
            password_hash: password::hash(&form.password).await?,
            role: Role::Participant,
            full_name: Some(form.full_name.trim().to_string()),
            affiliation: Some(form.affiliation.trim().to_string()),
            whatsapp: Some(form.whatsapp.trim().to_string()),
            category: Some(form.category.trim().to_string()),
            email_verified_at: None,
        },
    )
    .await?;

    tracing::info!(user_id = user.id, email = %user.email, "participant registered");
    Ok(user)
}

/// Checks credentials and opens a session valid for `ttl_hours`.
pub async fn login(
    pool: &DbPool,
    email: &str,
    password: &str,
    ttl_hours: i64,
) -> AppResult<(User, String)> {
    let email = email.trim().to_lowercase();
    let user = match users::find_by_email(pool, &email).await? {
        Some(user) if password::verify(password, &user.password_hash).await? => user,
        _ => {
            tracing::warn!(email = %email, "failed login attempt");
            return Err(AppError::Validation(ValidationErrors::single(
                "email",
                "These credentials do not match our records.",
            )));
        }
    };

    let token = new_session_token();
    sessions::create_session(pool, &token, user.id, Utc::now() + Duration::hours(ttl_hours)).await?;
    tracing::info!(user_id = user.id, role = %user.role, "user logged in");
    Ok((user, token))
}

/// An account created by an admin or from the command line.
#[derive(Debug, Clone, Deserialize)]
pub struct NewAccount {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub role: String,
}

fn parse_role(errors: &mut ValidationErrors, value: &str) -> Option<Role> {
    match value.parse::<Role>() {
        Ok(role) => Some(role),
        Err(_) => {
            errors.add("role", "The selected role is invalid.");
            None
        }
    }
}

/// Creates a pre-verified account with any role.
pub async fn create_account(pool: &DbPool, account: NewAccount) -> AppResult<User> {
    let email = account.email.trim().to_lowercase();
    let mut errors = ValidationErrors::new();
    validation::required(&mut errors, "name", &account.name, Some(255));
    validation::email(&mut errors, "email", &email);
    check_password(&mut errors, &account.password, None);
    let role = parse_role(&mut errors, &account.role);
    if !errors.contains("email") && users::find_by_email(pool, &email).await?.is_some() {
        errors.add("email", "The email has already been taken.");
    }
    errors.into_result()?;
    let role = role.ok_or_else(|| AppError::Internal("validated role missing".to_string()))?;

    let user = users::create_user(
        pool,
        &NewUser {
            name: account.name.trim().to_string(),
            email,
            password_hash: password::hash(&account.password).await?,
            role,
            full_name: None,
            affiliation: None,
            whatsapp: None,
            category: None,
            email_verified_at: Some(Utc::now()),
        },
    )
    .await?;

    tracing::info!(user_id = user.id, role = %user.role, "account created");
    Ok(user)
}

pub async fn change_role(pool: &DbPool, user_id: i64, role: &str) -> AppResult<User> {
    let mut errors = ValidationErrors::new();
    let role = parse_role(&mut errors, role);
    errors.into_result()?;
    let role = role.ok_or_else(|| AppError::Internal("validated role missing".to_string()))?;

    if !users::update_role(pool, user_id, role).await? {
        return Err(AppError::NotFound("user".to_string()));
    }
    tracing::info!(user_id, role = %role, "role changed");
    fetch(pool, user_id).await
}

/// Sets a new password and signs the user out everywhere.
pub async fn reset_password(pool: &DbPool, user_id: i64, password: &str) -> AppResult<()> {
    let mut errors = ValidationErrors::new();
    check_password(&mut errors, password, None);
    errors.into_result()?;

    let hashed = password::hash(password).await?;
    if !users::update_password(pool, user_id, &hashed).await? {
        return Err(AppError::NotFound("user".to_string()));
    }
    sessions::delete_user_sessions(pool, user_id).await?;
    tracing::info!(user_id, "password reset");
    Ok(())
}

async fn fetch(pool: &DbPool, user_id: i64) -> AppResult<User> {
    users::get_user(pool, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("user".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_memory_pool;

    fn registration(email: &str) -> Registration {
        Registration {
            email: email.into(),
            password: "geosea2026".into(),
            password_confirmation: "geosea2026".into(),
            full_name: "Siti Rahma".into(),
            affiliation: "ITB".into(),
            whatsapp: "081234567890".into(),
            category: "International Delegate".into(),
        }
    }

    #[tokio::test]
    async fn registers_unverified_participant_with_lowercased_email() {
        let pool = create_memory_pool().await.unwrap();
        let user = register(&pool, registration("Siti@Example.ORG")).await.unwrap();
        assert_eq!(user.email, "siti@example.org");
        assert_eq!(user.role, Role::Participant);
        assert!(!user.is_verified());

        let err = register(&pool, registration("siti@example.org")).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(ref e) if e.contains("email")));
    }

    #[tokio::test]
    async fn rejects_weak_or_mismatched_passwords_and_unknown_category() {
        let pool = create_memory_pool().await.unwrap();
        let mut form = registration("a@example.org");
        form.password = "short".into();
        form.category = "Alumni".into();
        match register(&pool, form).await.unwrap_err() {
            AppError::Validation(errors) => {
                assert_eq!(errors.fields()["password"].len(), 2);
                assert!(errors.contains("category"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn login_opens_a_session() {
        let pool = create_memory_pool().await.unwrap();
        register(&pool, registration("a@example.org")).await.unwrap();

        let (user, token) = login(&pool, "A@example.org", "geosea2026", 1).await.unwrap();
        let resolved = sessions::user_for_token(&pool, &token, Utc::now()).await.unwrap();
        assert_eq!(resolved.map(|u| u.id), Some(user.id));

        assert!(login(&pool, "a@example.org", "wrong-password", 1).await.is_err());
    }

    fn account(role: &str) -> NewAccount {
        NewAccount {
            name: "Committee Reviewer".into(),
            email: "Reviewer@Example.org".into(),
            password: "reviewer-pass".into(),
            role: role.into(),
        }
    }

    #[tokio::test]
    async fn created_accounts_are_verified_with_normalised_role() {
        let pool = create_memory_pool().await.unwrap();
        let user = create_account(&pool, account("Reviewer")).await.unwrap();
        assert_eq!(user.role, Role::Reviewer);
        assert_eq!(user.email, "reviewer@example.org");
        assert!(user.is_verified());

        let err = create_account(&pool, account("superuser")).await.unwrap_err();
        match err {
            AppError::Validation(errors) => {
                assert!(errors.contains("role"));
                assert!(errors.contains("email"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn role_change_and_password_reset() {
        let pool = create_memory_pool().await.unwrap();
        let user = register(&pool, registration("a@example.org")).await.unwrap();
        let (_, token) = login(&pool, "a@example.org", "geosea2026", 1).await.unwrap();

        let promoted = change_role(&pool, user.id, "ADMIN").await.unwrap();
        assert_eq!(promoted.role, Role::Admin);
        assert!(matches!(
            change_role(&pool, 999, "admin").await,
            Err(AppError::NotFound(_))
        ));

        assert!(reset_password(&pool, user.id, "short").await.is_err());
        reset_password(&pool, user.id, "new-password-1").await.unwrap();
        assert!(sessions::user_for_token(&pool, &token, Utc::now()).await.unwrap().is_none());
        assert!(login(&pool, "a@example.org", "new-password-1", 1).await.is_ok());
    }
}
