use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use super::User;
use crate::auth::Role;

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub full_name: Option<String>,
    pub affiliation: Option<String>,
    pub whatsapp: Option<String>,
    pub category: Option<String>,
    pub email_verified_at: Option<DateTime<Utc>>,
}

pub async fn create_user(pool: &SqlitePool, user: &NewUser) -> Result<User, sqlx::Error> {
    let now = Utc::now();
    sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (name, email, password_hash, role, full_name, affiliation, whatsapp,
                           category, email_verified_at, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(&user.name)
    .bind(user.email.to_lowercase())
    .bind(&user.password_hash)
    .bind(user.role)
    .bind(&user.full_name)
    .bind(&user.affiliation)
    .bind(&user.whatsapp)
    .bind(&user.category)
    .bind(user.email_verified_at)
    .bind(now)
    .bind(now)
    .fetch_one(pool)
    .await
}

pub async fn get_user(pool: &SqlitePool, id: i64) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn find_by_email(pool: &SqlitePool, email: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
        .bind(email.trim().to_lowercase())
        .fetch_optional(pool)
        .await
}

pub async fn list_users(pool: &SqlitePool) -> Result<Vec<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY created_at DESC, id DESC")
        .fetch_all(pool)
        .await
}

pub async fn list_by_role(pool: &SqlitePool, role: Role) -> Result<Vec<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE role = ? ORDER BY name")
        .bind(role)
        .fetch_all(pool)
        .await
}

pub async fn count_by_role(pool: &SqlitePool, role: Role) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = ?")
        .bind(role)
        .fetch_one(pool)
        .await
}

pub async fn update_role(pool: &SqlitePool, id: i64, role: Role) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE users SET role = ?, updated_at = ? WHERE id = ?")
        .bind(role)
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn update_password(
    pool: &SqlitePool,
    id: i64,
    password_hash: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ?")
        .bind(password_hash)
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn set_verified_at(
    pool: &SqlitePool,
    id: i64,
    verified_at: Option<DateTime<Utc>>,
) -> Result<bool, sqlx::Error> {
    let result =
        sqlx::query("UPDATE users SET email_verified_at = ?, updated_at = ? WHERE id = ?")
            .bind(verified_at)
            .bind(Utc::now())
            .bind(id)
            .execute(pool)
            .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn delete_user(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_memory_pool;
    use crate::db::fixtures::participant;

    #[tokio::test]
    async fn emails_are_unique_case_insensitively() {
        let pool = create_memory_pool().await.unwrap();
        create_user(&pool, &participant("Siti@Example.org")).await.unwrap();
        let err = create_user(&pool, &participant("siti@example.org"))
            .await
            .expect_err("duplicate email");
        let err = crate::error::AppError::from(err);
        assert!(matches!(err, crate::error::AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn role_changes_are_persisted_normalized() {
        let pool = create_memory_pool().await.unwrap();
        let user = create_user(&pool, &participant("a@example.org")).await.unwrap();
        assert!(update_role(&pool, user.id, Role::Reviewer).await.unwrap());
        let stored: String = sqlx::query_scalar("SELECT role FROM users WHERE id = ?")
            .bind(user.id)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(stored, "reviewer");
        assert_eq!(list_by_role(&pool, Role::Reviewer).await.unwrap().len(), 1);
    }
}
