use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use super::NewPageVisit;

pub async fn record_visit(pool: &SqlitePool, visit: &NewPageVisit) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO page_visits (ip_address, user_agent, page, visited_at) VALUES (?, ?, ?, ?)")
        .bind(&visit.ip_address)
        .bind(&visit.user_agent)
        .bind(&visit.page)
        .bind(Utc::now())
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn count_for_page(pool: &SqlitePool, page: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM page_visits WHERE page = ?")
        .bind(page)
        .fetch_one(pool)
        .await
}

/// Counts visits to `page` at or after `since`.
pub async fn count_since(
    pool: &SqlitePool,
    page: &str,
    since: DateTime<Utc>,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM page_visits WHERE page = ? AND visited_at >= ?")
        .bind(page)
        .bind(since)
        .fetch_one(pool)
        .await
}
