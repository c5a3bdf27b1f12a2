use chrono::Utc;
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};

use super::Payment;

/// Payment joined with the owning submission and participant.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PaymentOverview {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub payment: Payment,
    pub submission_code: String,
    pub submission_title: String,
    pub user_name: String,
    pub user_email: String,
}

/// Stores a payment proof for a submission. Re-uploading replaces the proof
/// and resets verification.
pub async fn upsert_payment(
    pool: &SqlitePool,
    user_id: i64,
    submission_id: i64,
    amount: f64,
    proof_path: &str,
) -> Result<Payment, sqlx::Error> {
    let now = Utc::now();
    sqlx::query_as::<_, Payment>(
        r#"
        INSERT INTO payments (user_id, submission_id, amount, payment_proof_url, verified, verified_at, created_at, updated_at)
        VALUES (?, ?, ?, ?, 0, NULL, ?, ?)
        ON CONFLICT (submission_id) DO UPDATE SET
            amount = excluded.amount,
            payment_proof_url = excluded.payment_proof_url,
            verified = 0,
            verified_at = NULL,
            updated_at = excluded.updated_at
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(submission_id)
    .bind(amount)
    .bind(proof_path)
    .bind(now)
    .bind(now)
    .fetch_one(pool)
    .await
}

pub async fn get_payment(pool: &SqlitePool, id: i64) -> Result<Option<Payment>, sqlx::Error> {
    sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn payment_for_submission(
    pool: &SqlitePool,
    submission_id: i64,
) -> Result<Option<Payment>, sqlx::Error> {
    sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE submission_id = ?")
        .bind(submission_id)
        .fetch_optional(pool)
        .await
}

pub async fn payments_for_user(pool: &SqlitePool, user_id: i64) -> Result<Vec<Payment>, sqlx::Error> {
    sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE user_id = ? ORDER BY id DESC")
        .bind(user_id)
        .fetch_all(pool)
        .await
}

pub async fn list_payments(pool: &SqlitePool) -> Result<Vec<PaymentOverview>, sqlx::Error> {
    sqlx::query_as::<_, PaymentOverview>(
        r#"
        SELECT payments.*,
               submissions.submission_code AS submission_code,
               submissions.title AS submission_title,
               users.name AS user_name,
               users.email AS user_email
        FROM payments
        JOIN submissions ON submissions.id = payments.submission_id
        JOIN users ON users.id = payments.user_id
        ORDER BY payments.created_at DESC, payments.id DESC
        "#,
    )
    .fetch_all(pool)
    .await
}

pub async fn set_verified(pool: &SqlitePool, id: i64, verified: bool) -> Result<bool, sqlx::Error> {
    let now = Utc::now();
    let verified_at = verified.then_some(now);
    let result = sqlx::query(
        "UPDATE payments SET verified = ?, verified_at = ?, updated_at = ? WHERE id = ?",
    )
    .bind(verified)
    .bind(verified_at)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn delete_payment(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM payments WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn count_verified(pool: &SqlitePool, verified: bool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM payments WHERE verified = ?")
        .bind(verified)
        .fetch_one(pool)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_memory_pool;
    use crate::db::fixtures::{insert_participant, insert_submission_for};

    #[tokio::test]
    async fn reupload_resets_verification() {
        let pool = create_memory_pool().await.unwrap();
        let user = insert_participant(&pool, "a@example.org").await;
        let submission = insert_submission_for(&pool, &user).await;

        let first = upsert_payment(&pool, user.id, submission.id, 1_500_000.0, "payments/a.png")
            .await
            .unwrap();
        assert!(set_verified(&pool, first.id, true).await.unwrap());
        let verified = get_payment(&pool, first.id).await.unwrap().unwrap();
        assert!(verified.verified);
        assert!(verified.verified_at.is_some());

        let second = upsert_payment(&pool, user.id, submission.id, 1_500_000.0, "payments/b.png")
            .await
            .unwrap();
        assert_eq!(second.id, first.id);
        assert!(!second.verified);
        assert!(second.verified_at.is_none());
        assert_eq!(second.payment_proof_url, "payments/b.png");
    }

    #[tokio::test]
    async fn overview_joins_submission_and_user() {
        let pool = create_memory_pool().await.unwrap();
        let user = insert_participant(&pool, "a@example.org").await;
        let submission = insert_submission_for(&pool, &user).await;
        upsert_payment(&pool, user.id, submission.id, 750_000.0, "payments/a.pdf")
            .await
            .unwrap();

        let rows = list_payments(&pool).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].submission_code, submission.submission_code);
        assert_eq!(rows[0].user_email, "a@example.org");
        assert_eq!(count_verified(&pool, false).await.unwrap(), 1);
    }
}
