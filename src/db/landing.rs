use chrono::Utc;
use sqlx::SqlitePool;

use super::{LandingPageSetting, SettingKind};

#[derive(Debug, Clone)]
pub struct LandingPageInput {
    pub key: String,
    pub value: Option<String>,
    pub kind: SettingKind,
    pub section: Option<String>,
    pub description: Option<String>,
}

pub async fn list_settings(pool: &SqlitePool) -> Result<Vec<LandingPageSetting>, sqlx::Error> {
    sqlx::query_as::<_, LandingPageSetting>(
        "SELECT * FROM landing_page_settings ORDER BY section, key",
    )
    .fetch_all(pool)
    .await
}

pub async fn get_setting(pool: &SqlitePool, id: i64) -> Result<Option<LandingPageSetting>, sqlx::Error> {
    sqlx::query_as::<_, LandingPageSetting>("SELECT * FROM landing_page_settings WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn find_by_key(
    pool: &SqlitePool,
    key: &str,
) -> Result<Option<LandingPageSetting>, sqlx::Error> {
    sqlx::query_as::<_, LandingPageSetting>("SELECT * FROM landing_page_settings WHERE key = ?")
        .bind(key)
        .fetch_optional(pool)
        .await
}

pub async fn insert_setting(
    pool: &SqlitePool,
    input: &LandingPageInput,
) -> Result<LandingPageSetting, sqlx::Error> {
    let now = Utc::now();
    sqlx::query_as::<_, LandingPageSetting>(
        r#"
        INSERT INTO landing_page_settings (key, value, type, section, description, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(&input.key)
    .bind(&input.value)
    .bind(input.kind)
    .bind(&input.section)
    .bind(&input.description)
    .bind(now)
    .bind(now)
    .fetch_one(pool)
    .await
}

pub async fn update_setting(
    pool: &SqlitePool,
    id: i64,
    input: &LandingPageInput,
) -> Result<Option<LandingPageSetting>, sqlx::Error> {
    sqlx::query_as::<_, LandingPageSetting>(
        r#"
        UPDATE landing_page_settings
        SET key = ?, value = ?, type = ?, section = ?, description = ?, updated_at = ?
        WHERE id = ?
        RETURNING *
        "#,
    )
    .bind(&input.key)
    .bind(&input.value)
    .bind(input.kind)
    .bind(&input.section)
    .bind(&input.description)
    .bind(Utc::now())
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// Upserts by key. Existing rows keep their section and description when the
/// input leaves them empty.
pub async fn upsert_by_key(
    pool: &SqlitePool,
    input: &LandingPageInput,
) -> Result<LandingPageSetting, sqlx::Error> {
    let now = Utc::now();
    sqlx::query_as::<_, LandingPageSetting>(
        r#"
        INSERT INTO landing_page_settings (key, value, type, section, description, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT (key) DO UPDATE SET
            value = excluded.value,
            type = excluded.type,
            section = COALESCE(excluded.section, landing_page_settings.section),
            description = COALESCE(excluded.description, landing_page_settings.description),
            updated_at = excluded.updated_at
        RETURNING *
        "#,
    )
    .bind(&input.key)
    .bind(&input.value)
    .bind(input.kind)
    .bind(&input.section)
    .bind(&input.description)
    .bind(now)
    .bind(now)
    .fetch_one(pool)
    .await
}

pub async fn delete_setting(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM landing_page_settings WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
