use chrono::Utc;
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};

use super::Review;

/// Review row joined with the reviewer's identity.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ReviewWithReviewer {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub review: Review,
    pub reviewer_name: String,
    pub reviewer_email: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scores {
    pub originality: i64,
    pub relevance: i64,
    pub clarity: i64,
    pub methodology: i64,
    pub overall: i64,
}

impl Scores {
    pub fn all(&self) -> [(&'static str, i64); 5] {
        [
            ("originality_score", self.originality),
            ("relevance_score", self.relevance),
            ("clarity_score", self.clarity),
            ("methodology_score", self.methodology),
            ("overall_score", self.overall),
        ]
    }
}

pub async fn assign_reviewer(
    pool: &SqlitePool,
    submission_id: i64,
    reviewer_id: i64,
) -> Result<Review, sqlx::Error> {
    let now = Utc::now();
    sqlx::query_as::<_, Review>(
        "INSERT INTO reviews (submission_id, reviewer_id, created_at, updated_at) VALUES (?, ?, ?, ?) RETURNING *",
    )
    .bind(submission_id)
    .bind(reviewer_id)
    .bind(now)
    .bind(now)
    .fetch_one(pool)
    .await
}

pub async fn find_review(
    pool: &SqlitePool,
    submission_id: i64,
    reviewer_id: i64,
) -> Result<Option<Review>, sqlx::Error> {
    sqlx::query_as::<_, Review>("SELECT * FROM reviews WHERE submission_id = ? AND reviewer_id = ?")
        .bind(submission_id)
        .bind(reviewer_id)
        .fetch_optional(pool)
        .await
}

pub async fn get_review(pool: &SqlitePool, id: i64) -> Result<Option<Review>, sqlx::Error> {
    sqlx::query_as::<_, Review>("SELECT * FROM reviews WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn count_for_submission(pool: &SqlitePool, submission_id: i64) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM reviews WHERE submission_id = ?")
        .bind(submission_id)
        .fetch_one(pool)
        .await
}

pub async fn reviews_for_submission(
    pool: &SqlitePool,
    submission_id: i64,
) -> Result<Vec<ReviewWithReviewer>, sqlx::Error> {
    sqlx::query_as::<_, ReviewWithReviewer>(
        r#"
        SELECT reviews.*, users.name AS reviewer_name, users.email AS reviewer_email
        FROM reviews JOIN users ON users.id = reviews.reviewer_id
        WHERE reviews.submission_id = ?
        ORDER BY reviews.id
        "#,
    )
    .bind(submission_id)
    .fetch_all(pool)
    .await
}

pub async fn reviews_for_reviewer(
    pool: &SqlitePool,
    reviewer_id: i64,
) -> Result<Vec<Review>, sqlx::Error> {
    sqlx::query_as::<_, Review>("SELECT * FROM reviews WHERE reviewer_id = ? ORDER BY id DESC")
        .bind(reviewer_id)
        .fetch_all(pool)
        .await
}

pub async fn submit_scores(
    pool: &SqlitePool,
    review_id: i64,
    scores: &Scores,
    comments: Option<&str>,
) -> Result<Review, sqlx::Error> {
    sqlx::query_as::<_, Review>(
        r#"
        UPDATE reviews SET
            originality_score = ?, relevance_score = ?, clarity_score = ?,
            methodology_score = ?, overall_score = ?, comments = ?, updated_at = ?
        WHERE id = ?
        RETURNING *
        "#,
    )
    .bind(scores.originality)
    .bind(scores.relevance)
    .bind(scores.clarity)
    .bind(scores.methodology)
    .bind(scores.overall)
    .bind(comments)
    .bind(Utc::now())
    .bind(review_id)
    .fetch_one(pool)
    .await
}

pub async fn delete_review(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM reviews WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn count_completed(pool: &SqlitePool, reviewer_id: Option<i64>) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT COUNT(*) FROM reviews WHERE overall_score IS NOT NULL AND (? IS NULL OR reviewer_id = ?)",
    )
    .bind(reviewer_id)
    .bind(reviewer_id)
    .fetch_one(pool)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::db::create_memory_pool;
    use crate::db::fixtures::{insert_participant, insert_submission_for, insert_with_role};
    use crate::error::AppError;

    #[tokio::test]
    async fn reviewer_is_assigned_once_per_submission() {
        let pool = create_memory_pool().await.unwrap();
        let author = insert_participant(&pool, "author@example.org").await;
        let reviewer = insert_with_role(&pool, "rev@example.org", Role::Reviewer).await;
        let submission = insert_submission_for(&pool, &author).await;

        assign_reviewer(&pool, submission.id, reviewer.id).await.unwrap();
        let err = assign_reviewer(&pool, submission.id, reviewer.id)
            .await
            .expect_err("second assignment");
        assert!(matches!(AppError::from(err), AppError::Conflict(_)));
        assert_eq!(count_for_submission(&pool, submission.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn scores_complete_the_review() {
        let pool = create_memory_pool().await.unwrap();
        let author = insert_participant(&pool, "author@example.org").await;
        let reviewer = insert_with_role(&pool, "rev@example.org", Role::Reviewer).await;
        let submission = insert_submission_for(&pool, &author).await;
        let review = assign_reviewer(&pool, submission.id, reviewer.id).await.unwrap();
        assert!(!review.is_completed());

        let scores = Scores {
            originality: 4,
            relevance: 5,
            clarity: 3,
            methodology: 4,
            overall: 4,
        };
        let scored = submit_scores(&pool, review.id, &scores, Some("solid work"))
            .await
            .unwrap();
        assert!(scored.is_completed());
        assert_eq!(scored.average_score(), Some(4.0));

        let listed = reviews_for_submission(&pool, submission.id).await.unwrap();
        assert_eq!(listed[0].reviewer_email, "rev@example.org");
        assert_eq!(count_completed(&pool, Some(reviewer.id)).await.unwrap(), 1);
    }
}
