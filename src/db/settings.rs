use chrono::Utc;
use sqlx::SqlitePool;

/// Reads a key. Missing keys and NULL values both come back as `None`.
pub async fn get_value(pool: &SqlitePool, key: &str) -> Result<Option<String>, sqlx::Error> {
    let value: Option<Option<String>> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(pool)
        .await?;
    Ok(value.flatten())
}

pub async fn set_value(pool: &SqlitePool, key: &str, value: Option<&str>) -> Result<(), sqlx::Error> {
    let now = Utc::now();
    sqlx::query(
        r#"
        INSERT INTO settings (key, value, created_at, updated_at) VALUES (?, ?, ?, ?)
        ON CONFLICT (key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
        "#,
    )
    .bind(key)
    .bind(value)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_memory_pool;

    #[tokio::test]
    async fn seeded_keys_and_upserts() {
        let pool = create_memory_pool().await.unwrap();
        assert_eq!(get_value(&pool, "submission_enabled").await.unwrap().as_deref(), Some("1"));
        assert_eq!(get_value(&pool, "submission_deadline_end").await.unwrap(), None);
        assert_eq!(get_value(&pool, "missing").await.unwrap(), None);

        set_value(&pool, "submission_enabled", Some("0")).await.unwrap();
        set_value(&pool, "custom", Some("x")).await.unwrap();
        assert_eq!(get_value(&pool, "submission_enabled").await.unwrap().as_deref(), Some("0"));
        assert_eq!(get_value(&pool, "custom").await.unwrap().as_deref(), Some("x"));
    }
}
