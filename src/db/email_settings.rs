use chrono::Utc;
use sqlx::SqlitePool;

use super::EmailSetting;

#[derive(Debug, Clone)]
pub struct EmailSettingInput {
    pub mail_host: String,
    pub mail_port: i64,
    pub mail_username: String,
    pub mail_password: String,
    pub mail_encryption: String,
    pub mail_from_address: String,
    pub mail_from_name: String,
}

pub async fn active_settings(pool: &SqlitePool) -> Result<Option<EmailSetting>, sqlx::Error> {
    sqlx::query_as::<_, EmailSetting>(
        "SELECT * FROM email_settings WHERE is_active = 1 ORDER BY id DESC LIMIT 1",
    )
    .fetch_optional(pool)
    .await
}

/// Saves a configuration as the single active one.
pub async fn save_active(
    pool: &SqlitePool,
    input: &EmailSettingInput,
) -> Result<EmailSetting, sqlx::Error> {
    let now = Utc::now();
    let mut tx = pool.begin().await?;
    sqlx::query("UPDATE email_settings SET is_active = 0, updated_at = ? WHERE is_active = 1")
        .bind(now)
        .execute(&mut *tx)
        .await?;
    let saved = sqlx::query_as::<_, EmailSetting>(
        r#"
        INSERT INTO email_settings (
            mail_mailer, mail_host, mail_port, mail_username, mail_password, mail_encryption,
            mail_from_address, mail_from_name, is_active, created_at, updated_at
        )
        VALUES ('smtp', ?, ?, ?, ?, ?, ?, ?, 1, ?, ?)
        RETURNING *
        "#,
    )
    .bind(&input.mail_host)
    .bind(input.mail_port)
    .bind(&input.mail_username)
    .bind(&input.mail_password)
    .bind(&input.mail_encryption)
    .bind(&input.mail_from_address)
    .bind(&input.mail_from_name)
    .bind(now)
    .bind(now)
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;
    Ok(saved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_memory_pool;

    fn input(host: &str) -> EmailSettingInput {
        EmailSettingInput {
            mail_host: host.into(),
            mail_port: 587,
            mail_username: "mailer".into(),
            mail_password: "secret".into(),
            mail_encryption: "tls".into(),
            mail_from_address: "noreply@example.org".into(),
            mail_from_name: "Conference".into(),
        }
    }

    #[tokio::test]
    async fn only_latest_configuration_is_active() {
        let pool = create_memory_pool().await.unwrap();
        assert!(active_settings(&pool).await.unwrap().is_none());

        save_active(&pool, &input("smtp.one.test")).await.unwrap();
        save_active(&pool, &input("smtp.two.test")).await.unwrap();

        let active = active_settings(&pool).await.unwrap().unwrap();
        assert_eq!(active.mail_host, "smtp.two.test");
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM email_settings WHERE is_active = 1")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }
}
