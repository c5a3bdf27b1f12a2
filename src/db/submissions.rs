use chrono::Utc;
use serde::Serialize;
use sqlx::types::Json;
use sqlx::{FromRow, SqliteConnection, SqlitePool};

use super::{CoAuthor, Submission};
use crate::submissions::{code, ParticipantCategory, SubmissionStatus};

/// Fields captured from the participant's submission form.
#[derive(Debug, Clone)]
pub struct SubmissionFields {
    pub title: String,
    pub author_full_name: String,
    pub co_authors: Vec<CoAuthor>,
    pub mobile_number: String,
    pub corresponding_author_email: String,
    pub institute_organization: String,
    pub paper_theme: Option<String>,
    pub paper_sub_theme: String,
    pub category_submission: String,
    pub participant_category: ParticipantCategory,
    pub abstract_text: String,
    pub keywords: String,
    pub publication_option: Option<String>,
}

/// Stored file paths; `None` leaves an existing path untouched on update.
#[derive(Debug, Clone, Default)]
pub struct SubmissionFiles {
    pub abstract_file: Option<String>,
    pub full_paper_file: Option<String>,
    pub layouting_file: Option<String>,
    pub editor_feedback_file: Option<String>,
}

/// Inserts a submission with an explicit code. The unique index on
/// `submission_code` rejects duplicates.
pub async fn insert_submission(
    conn: &mut SqliteConnection,
    user_id: i64,
    submission_code: &str,
    fields: &SubmissionFields,
    files: &SubmissionFiles,
) -> Result<Submission, sqlx::Error> {
    let now = Utc::now();
    sqlx::query_as::<_, Submission>(
        r#"
        INSERT INTO submissions (
            user_id, submission_code, title, author_full_name, co_authors, mobile_number,
            corresponding_author_email, institute_organization, paper_theme, paper_sub_theme,
            category_submission, participant_category, abstract, keywords, abstract_file,
            full_paper_file, layouting_file, editor_feedback_file, publication_option, status,
            created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(submission_code)
    .bind(&fields.title)
    .bind(&fields.author_full_name)
    .bind(Json(&fields.co_authors))
    .bind(&fields.mobile_number)
    .bind(&fields.corresponding_author_email)
    .bind(&fields.institute_organization)
    .bind(&fields.paper_theme)
    .bind(&fields.paper_sub_theme)
    .bind(&fields.category_submission)
    .bind(fields.participant_category)
    .bind(&fields.abstract_text)
    .bind(&fields.keywords)
    .bind(&files.abstract_file)
    .bind(&files.full_paper_file)
    .bind(&files.layouting_file)
    .bind(&files.editor_feedback_file)
    .bind(&fields.publication_option)
    .bind(SubmissionStatus::Pending)
    .bind(now)
    .bind(now)
    .fetch_one(conn)
    .await
}

/// Creates a pending submission, allocating the next code for its prefix
/// inside one transaction.
pub async fn create_submission(
    pool: &SqlitePool,
    user_id: i64,
    fields: &SubmissionFields,
    files: &SubmissionFiles,
) -> Result<Submission, sqlx::Error> {
    let prefix = code::code_prefix(fields.participant_category, &fields.category_submission);

    let mut tx = pool.begin().await?;
    let last_code: Option<String> = sqlx::query_scalar(
        "SELECT submission_code FROM submissions WHERE submission_code LIKE ? ORDER BY id DESC LIMIT 1",
    )
    .bind(format!("{}-%", prefix))
    .fetch_optional(&mut *tx)
    .await?;

    let submission_code = code::next_code(&prefix, last_code.as_deref());
    let submission = insert_submission(&mut tx, user_id, &submission_code, fields, files).await?;
    tx.commit().await?;

    Ok(submission)
}

pub async fn get_submission(pool: &SqlitePool, id: i64) -> Result<Option<Submission>, sqlx::Error> {
    sqlx::query_as::<_, Submission>("SELECT * FROM submissions WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn get_owned_submission(
    pool: &SqlitePool,
    id: i64,
    user_id: i64,
) -> Result<Option<Submission>, sqlx::Error> {
    sqlx::query_as::<_, Submission>("SELECT * FROM submissions WHERE id = ? AND user_id = ?")
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

pub async fn list_for_user(pool: &SqlitePool, user_id: i64) -> Result<Vec<Submission>, sqlx::Error> {
    sqlx::query_as::<_, Submission>("SELECT * FROM submissions WHERE user_id = ? ORDER BY id")
        .bind(user_id)
        .fetch_all(pool)
        .await
}

pub async fn list_submissions(pool: &SqlitePool) -> Result<Vec<Submission>, sqlx::Error> {
    sqlx::query_as::<_, Submission>("SELECT * FROM submissions ORDER BY created_at DESC, id DESC")
        .fetch_all(pool)
        .await
}

pub async fn recent_submissions(
    pool: &SqlitePool,
    limit: i64,
) -> Result<Vec<Submission>, sqlx::Error> {
    sqlx::query_as::<_, Submission>(
        "SELECT * FROM submissions ORDER BY created_at DESC, id DESC LIMIT ?",
    )
    .bind(limit)
    .fetch_all(pool)
    .await
}

pub async fn get_many(pool: &SqlitePool, ids: &[i64]) -> Result<Vec<Submission>, sqlx::Error> {
    let mut submissions = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(submission) = get_submission(pool, *id).await? {
            submissions.push(submission);
        }
    }
    Ok(submissions)
}

/// Rewrites the editable fields of a submission. File paths that are `None`
/// keep their stored value.
pub async fn update_submission(
    pool: &SqlitePool,
    id: i64,
    fields: &SubmissionFields,
    files: &SubmissionFiles,
    status: SubmissionStatus,
) -> Result<Submission, sqlx::Error> {
    sqlx::query_as::<_, Submission>(
        r#"
        UPDATE submissions SET
            title = ?, author_full_name = ?, co_authors = ?, mobile_number = ?,
            corresponding_author_email = ?, institute_organization = ?, paper_theme = ?,
            paper_sub_theme = ?, category_submission = ?, participant_category = ?,
            abstract = ?, keywords = ?, publication_option = ?,
            abstract_file = COALESCE(?, abstract_file),
            full_paper_file = COALESCE(?, full_paper_file),
            layouting_file = COALESCE(?, layouting_file),
            editor_feedback_file = COALESCE(?, editor_feedback_file),
            status = ?, updated_at = ?
        WHERE id = ?
        RETURNING *
        "#,
    )
    .bind(&fields.title)
    .bind(&fields.author_full_name)
    .bind(Json(&fields.co_authors))
    .bind(&fields.mobile_number)
    .bind(&fields.corresponding_author_email)
    .bind(&fields.institute_organization)
    .bind(&fields.paper_theme)
    .bind(&fields.paper_sub_theme)
    .bind(&fields.category_submission)
    .bind(fields.participant_category)
    .bind(&fields.abstract_text)
    .bind(&fields.keywords)
    .bind(&fields.publication_option)
    .bind(&files.abstract_file)
    .bind(&files.full_paper_file)
    .bind(&files.layouting_file)
    .bind(&files.editor_feedback_file)
    .bind(status)
    .bind(Utc::now())
    .bind(id)
    .fetch_one(pool)
    .await
}

pub async fn update_status(
    pool: &SqlitePool,
    id: i64,
    status: SubmissionStatus,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE submissions SET status = ?, updated_at = ? WHERE id = ?")
        .bind(status)
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn request_deletion(
    pool: &SqlitePool,
    id: i64,
    reason: Option<&str>,
) -> Result<Submission, sqlx::Error> {
    let now = Utc::now();
    sqlx::query_as::<_, Submission>(
        r#"
        UPDATE submissions
        SET status = ?, deletion_requested_at = ?, deletion_reason = ?, updated_at = ?
        WHERE id = ?
        RETURNING *
        "#,
    )
    .bind(SubmissionStatus::DeletionRequested)
    .bind(now)
    .bind(reason)
    .bind(now)
    .bind(id)
    .fetch_one(pool)
    .await
}

/// Deletes a submission together with its reviews and payment.
pub async fn delete_submission(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM reviews WHERE submission_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM payments WHERE submission_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    let result = sqlx::query("DELETE FROM submissions WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(result.rows_affected() > 0)
}

pub async fn count_all(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM submissions")
        .fetch_one(pool)
        .await
}

pub async fn count_by_status(
    pool: &SqlitePool,
    status: SubmissionStatus,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM submissions WHERE status = ?")
        .bind(status)
        .fetch_one(pool)
        .await
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TopicCount {
    pub topic: String,
    pub count: i64,
    pub oral_presentation_count: i64,
    pub poster_presentation_count: i64,
}

pub async fn submissions_per_topic(pool: &SqlitePool) -> Result<Vec<TopicCount>, sqlx::Error> {
    sqlx::query_as::<_, TopicCount>(
        r#"
        SELECT
            COALESCE(NULLIF(paper_sub_theme, ''), 'Tidak Ditentukan') AS topic,
            COUNT(*) AS count,
            SUM(CASE WHEN category_submission LIKE 'Oral%' THEN 1 ELSE 0 END) AS oral_presentation_count,
            SUM(CASE WHEN category_submission LIKE 'Poster%' THEN 1 ELSE 0 END) AS poster_presentation_count
        FROM submissions
        GROUP BY topic
        ORDER BY count DESC
        "#,
    )
    .fetch_all(pool)
    .await
}
