use chrono::Utc;
use serde::Serialize;
use std::collections::BTreeSet;

use super::{is_conventional_transition, SubmissionStatus};
use crate::auth::Role;
use crate::db::reviews::{self, ReviewWithReviewer};
use crate::db::submissions as store;
use crate::db::{payments, users, Payment, Review, Submission, User};
use crate::error::{AppError, AppResult, ValidationErrors};
use crate::notifications::NotificationReport;
use crate::settings::format_local;
use crate::state::AppState;
use crate::storage;

pub const MAX_REVIEWERS: usize = 5;

/// Result of an admin status update. `notification` is `None` when the
/// status did not actually change.
#[derive(Debug, Clone, Serialize)]
pub struct StatusChange {
    pub submission: Submission,
    pub previous: SubmissionStatus,
    pub notification: Option<NotificationReport>,
}

/// A submission as the admin table shows it.
#[derive(Debug, Clone, Serialize)]
pub struct AdminSubmission {
    #[serde(flatten)]
    pub submission: Submission,
    pub user: Option<User>,
    pub reviews: Vec<ReviewWithReviewer>,
    pub payment: Option<Payment>,
}

fn not_found() -> AppError {
    AppError::NotFound("submission".to_string())
}

/// Persists the new status, then notifies the owner when it changed.
/// Channel failures only show up in the returned report.
pub async fn change_status(
    state: &AppState,
    id: i64,
    new: SubmissionStatus,
) -> AppResult<StatusChange> {
    apply_status(state, id, new, false).await
}

async fn apply_status(
    state: &AppState,
    id: i64,
    new: SubmissionStatus,
    notify_unchanged: bool,
) -> AppResult<StatusChange> {
    let current = store::get_submission(&state.pool, id)
        .await?
        .ok_or_else(not_found)?;
    let previous = current.status;

    store::update_status(&state.pool, id, new).await?;
    let submission = store::get_submission(&state.pool, id)
        .await?
        .ok_or_else(not_found)?;

    if previous == new && !notify_unchanged {
        return Ok(StatusChange {
            submission,
            previous,
            notification: None,
        });
    }

    if previous != new && !is_conventional_transition(previous, new) {
        tracing::warn!(
            submission = %submission.submission_code,
            from = %previous,
            to = %new,
            "status set outside the usual review flow"
        );
    }

    let notification = match users::get_user(&state.pool, submission.user_id).await? {
        Some(owner) => Some(
            state
                .notifier
                .status_changed(&owner, &submission, previous, new)
                .await,
        ),
        None => {
            tracing::warn!(
                submission = %submission.submission_code,
                "submission owner missing; no notification sent"
            );
            None
        }
    };

    Ok(StatusChange {
        submission,
        previous,
        notification,
    })
}

/// Applies one status to many submissions. Nothing changes unless every id
/// exists. Every selected owner is notified, including those whose
/// submission already had the status.
pub async fn bulk_change_status(
    state: &AppState,
    ids: &[i64],
    new: SubmissionStatus,
) -> AppResult<Vec<StatusChange>> {
    let mut errors = ValidationErrors::new();
    if ids.is_empty() {
        errors.add("submission_ids", "The submission ids field is required.");
    }
    for (i, id) in ids.iter().enumerate() {
        if store::get_submission(&state.pool, *id).await?.is_none() {
            errors.add(
                &format!("submission_ids.{}", i),
                format!("The selected submission_ids.{} is invalid.", i),
            );
        }
    }
    errors.into_result()?;

    let mut changes = Vec::with_capacity(ids.len());
    for id in ids {
        changes.push(apply_status(state, *id, new, true).await?);
    }
    tracing::info!(count = changes.len(), status = %new, "bulk status update applied");
    Ok(changes)
}

pub async fn list_for_admin(state: &AppState) -> AppResult<Vec<AdminSubmission>> {
    let submissions = store::list_submissions(&state.pool).await?;
    let mut rows = Vec::with_capacity(submissions.len());
    for submission in submissions {
        rows.push(AdminSubmission {
            user: users::get_user(&state.pool, submission.user_id).await?,
            reviews: reviews::reviews_for_submission(&state.pool, submission.id).await?,
            payment: payments::payment_for_submission(&state.pool, submission.id).await?,
            submission,
        });
    }
    Ok(rows)
}

/// Assigns reviewers, skipping those already on the submission. Returns the
/// newly created review rows.
pub async fn assign_reviewers(
    state: &AppState,
    submission_id: i64,
    reviewer_ids: &[i64],
) -> AppResult<Vec<Review>> {
    let mut errors = ValidationErrors::new();
    if reviewer_ids.is_empty() {
        errors.add("reviewer_ids", "The reviewer ids field is required.");
    } else if reviewer_ids.len() > MAX_REVIEWERS {
        errors.add(
            "reviewer_ids",
            format!("The reviewer ids may not have more than {} items.", MAX_REVIEWERS),
        );
    }
    errors.into_result()?;

    let submission = store::get_submission(&state.pool, submission_id)
        .await?
        .ok_or_else(not_found)?;

    let mut errors = ValidationErrors::new();
    let mut seen = BTreeSet::new();
    let mut to_assign = Vec::new();
    for (i, reviewer_id) in reviewer_ids.iter().enumerate() {
        let is_reviewer = users::get_user(&state.pool, *reviewer_id)
            .await?
            .is_some_and(|user| user.role == Role::Reviewer);
        if !is_reviewer {
            errors.add(
                &format!("reviewer_ids.{}", i),
                format!("The selected reviewer_ids.{} is invalid.", i),
            );
            continue;
        }
        if !seen.insert(*reviewer_id) {
            continue;
        }
        if reviews::find_review(&state.pool, submission_id, *reviewer_id)
            .await?
            .is_none()
        {
            to_assign.push(*reviewer_id);
        }
    }
    errors.into_result()?;

    let current = reviews::count_for_submission(&state.pool, submission_id).await? as usize;
    if current + to_assign.len() > MAX_REVIEWERS {
        return Err(AppError::Validation(ValidationErrors::single(
            "reviewer_ids",
            format!(
                "Maximum {} reviewers per submission. Currently assigned: {}",
                MAX_REVIEWERS, current
            ),
        )));
    }

    let mut assigned = Vec::with_capacity(to_assign.len());
    for reviewer_id in to_assign {
        assigned.push(reviews::assign_reviewer(&state.pool, submission_id, reviewer_id).await?);
    }
    tracing::info!(
        submission = %submission.submission_code,
        assigned = assigned.len(),
        "reviewers assigned"
    );
    Ok(assigned)
}

/// Unassigns a reviewer who has not scored the submission yet.
pub async fn remove_reviewer(state: &AppState, submission_id: i64, reviewer_id: i64) -> AppResult<()> {
    let review = reviews::find_review(&state.pool, submission_id, reviewer_id)
        .await?
        .ok_or_else(|| AppError::NotFound("review assignment".to_string()))?;

    if review.originality_score.is_some() || review.overall_score.is_some() {
        return Err(AppError::Conflict(
            "Cannot remove reviewer who has already submitted a review.".to_string(),
        ));
    }

    reviews::delete_review(&state.pool, review.id).await?;
    tracing::info!(submission_id, reviewer_id, "reviewer removed");
    Ok(())
}

/// Deletes the submission with its reviews and payment, then its stored files.
pub async fn delete(state: &AppState, id: i64) -> AppResult<()> {
    let submission = store::get_submission(&state.pool, id)
        .await?
        .ok_or_else(not_found)?;
    let payment = payments::payment_for_submission(&state.pool, id).await?;

    store::delete_submission(&state.pool, id).await?;

    let root = &state.config.storage_folder;
    for relative in submission.stored_files() {
        storage::discard(root, relative).await;
    }
    if let Some(payment) = payment {
        storage::discard(root, &payment.payment_proof_url).await;
    }

    tracing::info!(submission = %submission.submission_code, "submission deleted by admin");
    Ok(())
}

/// Spreadsheet-friendly export of every submission: a UTF-8 BOM followed by CSV.
pub async fn export_csv(state: &AppState) -> AppResult<(String, Vec<u8>)> {
    let offset = state.config.timezone;
    let submissions = store::list_submissions(&state.pool).await?;

    let mut writer = csv::Writer::from_writer(b"\xEF\xBB\xBF".to_vec());
    writer
        .write_record([
            "ID",
            "Code",
            "Title",
            "Author",
            "Email",
            "Phone",
            "Institute",
            "Sub Theme",
            "Status",
            "Payment Status",
            "Submitted At",
        ])
        .map_err(csv_error)?;

    for submission in &submissions {
        let owner = users::get_user(&state.pool, submission.user_id).await?;
        let paid = payments::payment_for_submission(&state.pool, submission.id)
            .await?
            .is_some_and(|p| p.verified);
        let phone = owner
            .as_ref()
            .and_then(|u| u.whatsapp.as_deref())
            .filter(|p| !p.trim().is_empty())
            .unwrap_or("N/A");
        let email = owner.as_ref().map(|u| u.email.as_str()).unwrap_or("N/A");

        let id = submission.id.to_string();
        let status = submission.status.label();
        let submitted_at = format_local(submission.created_at, offset, "%Y-%m-%d %H:%M:%S");
        let record: [&str; 11] = [
            &id,
            &submission.submission_code,
            &submission.title,
            &submission.author_full_name,
            email,
            phone,
            &submission.institute_organization,
            &submission.paper_sub_theme,
            &status,
            if paid { "Paid" } else { "Unpaid" },
            &submitted_at,
        ];
        writer.write_record(record).map_err(csv_error)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|err| AppError::Internal(err.to_string()))?;
    let filename = format!(
        "submissions_{}.csv",
        format_local(Utc::now(), offset, "%Y-%m-%d_%H%M%S")
    );
    tracing::info!(rows = submissions.len(), file = %filename, "submissions exported");
    Ok((filename, bytes))
}

fn csv_error(err: csv::Error) -> AppError {
    AppError::Internal(format!("csv export failed: {}", err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::fixtures::{insert_participant, insert_submission_for, insert_with_role};
    use crate::db::reviews::Scores;
    use crate::state::testing::test_state;

    #[tokio::test]
    async fn status_change_notifies_once_per_channel() {
        let dir = tempfile::tempdir().unwrap();
        let t = test_state(dir.path()).await;
        let user = insert_participant(&t.state.pool, "siti@example.org").await;
        let submission = insert_submission_for(&t.state.pool, &user).await;

        let change = change_status(&t.state, submission.id, SubmissionStatus::Accepted)
            .await
            .unwrap();

        assert_eq!(change.previous, SubmissionStatus::Pending);
        assert_eq!(change.submission.status, SubmissionStatus::Accepted);
        let report = change.notification.unwrap();
        assert!(report.whatsapp_sent && report.email_sent);
        assert_eq!(t.whatsapp.sent.lock().unwrap().len(), 1);
        assert_eq!(t.mail.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unchanged_status_is_silent_and_failures_do_not_roll_back() {
        let dir = tempfile::tempdir().unwrap();
        let t = test_state(dir.path()).await;
        let user = insert_participant(&t.state.pool, "siti@example.org").await;
        let submission = insert_submission_for(&t.state.pool, &user).await;

        let same = change_status(&t.state, submission.id, SubmissionStatus::Pending)
            .await
            .unwrap();
        assert!(same.notification.is_none());
        assert!(t.mail.sent.lock().unwrap().is_empty());

        // rejected -> pending is unusual but still applied
        change_status(&t.state, submission.id, SubmissionStatus::Rejected).await.unwrap();
        let back = change_status(&t.state, submission.id, SubmissionStatus::Pending)
            .await
            .unwrap();
        assert_eq!(back.submission.status, SubmissionStatus::Pending);
        assert_eq!(t.whatsapp.sent.lock().unwrap().len(), 2);

        let missing = change_status(&t.state, 999, SubmissionStatus::Accepted).await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn bulk_update_requires_every_id() {
        let dir = tempfile::tempdir().unwrap();
        let t = test_state(dir.path()).await;
        let user = insert_participant(&t.state.pool, "siti@example.org").await;
        let a = insert_submission_for(&t.state.pool, &user).await;
        let b = insert_submission_for(&t.state.pool, &user).await;

        let err = bulk_change_status(&t.state, &[a.id, 404], SubmissionStatus::UnderReview)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(ref e) if e.contains("submission_ids.1")));
        let untouched = store::get_submission(&t.state.pool, a.id).await.unwrap().unwrap();
        assert_eq!(untouched.status, SubmissionStatus::Pending);

        let changes = bulk_change_status(&t.state, &[a.id, b.id], SubmissionStatus::UnderReview)
            .await
            .unwrap();
        assert_eq!(changes.len(), 2);
        assert_eq!(t.mail.sent.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn bulk_update_notifies_submissions_already_in_the_status() {
        let dir = tempfile::tempdir().unwrap();
        let t = test_state(dir.path()).await;
        let user = insert_participant(&t.state.pool, "siti@example.org").await;
        let a = insert_submission_for(&t.state.pool, &user).await;
        let b = insert_submission_for(&t.state.pool, &user).await;
        change_status(&t.state, a.id, SubmissionStatus::Accepted).await.unwrap();
        assert_eq!(t.mail.sent.lock().unwrap().len(), 1);

        let changes = bulk_change_status(&t.state, &[a.id, b.id], SubmissionStatus::Accepted)
            .await
            .unwrap();

        assert_eq!(changes[0].previous, SubmissionStatus::Accepted);
        assert!(changes.iter().all(|change| change.notification.is_some()));
        assert_eq!(t.mail.sent.lock().unwrap().len(), 3);
        assert_eq!(t.whatsapp.sent.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn reviewer_assignment_is_capped_and_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let t = test_state(dir.path()).await;
        let pool = &t.state.pool;
        let user = insert_participant(pool, "siti@example.org").await;
        let submission = insert_submission_for(pool, &user).await;

        let mut reviewer_ids = Vec::new();
        for i in 0..6 {
            let reviewer = insert_with_role(pool, &format!("r{}@example.org", i), Role::Reviewer).await;
            reviewer_ids.push(reviewer.id);
        }

        let first = assign_reviewers(&t.state, submission.id, &reviewer_ids[..3]).await.unwrap();
        assert_eq!(first.len(), 3);

        let again = assign_reviewers(&t.state, submission.id, &reviewer_ids[1..5]).await.unwrap();
        assert_eq!(again.len(), 2);
        assert_eq!(reviews::count_for_submission(pool, submission.id).await.unwrap(), 5);

        let err = assign_reviewers(&t.state, submission.id, &reviewer_ids[5..]).await.unwrap_err();
        match err {
            AppError::Validation(errors) => assert_eq!(
                errors.fields()["reviewer_ids"][0],
                "Maximum 5 reviewers per submission. Currently assigned: 5"
            ),
            other => panic!("unexpected error: {other:?}"),
        }

        let err = assign_reviewers(&t.state, submission.id, &[user.id]).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(ref e) if e.contains("reviewer_ids.0")));
    }

    #[tokio::test]
    async fn scored_reviewers_cannot_be_removed() {
        let dir = tempfile::tempdir().unwrap();
        let t = test_state(dir.path()).await;
        let pool = &t.state.pool;
        let user = insert_participant(pool, "siti@example.org").await;
        let submission = insert_submission_for(pool, &user).await;
        let done = insert_with_role(pool, "done@example.org", Role::Reviewer).await;
        let idle = insert_with_role(pool, "idle@example.org", Role::Reviewer).await;
        assign_reviewers(&t.state, submission.id, &[done.id, idle.id]).await.unwrap();

        let review = reviews::find_review(pool, submission.id, done.id).await.unwrap().unwrap();
        let scores = Scores {
            originality: 3,
            relevance: 3,
            clarity: 3,
            methodology: 3,
            overall: 3,
        };
        reviews::submit_scores(pool, review.id, &scores, Some("ok")).await.unwrap();

        let err = remove_reviewer(&t.state, submission.id, done.id).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        remove_reviewer(&t.state, submission.id, idle.id).await.unwrap();
        assert_eq!(reviews::count_for_submission(pool, submission.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn delete_removes_rows_and_files() {
        let dir = tempfile::tempdir().unwrap();
        let t = test_state(dir.path()).await;
        let pool = &t.state.pool;
        let user = insert_participant(pool, "siti@example.org").await;
        let submission = insert_submission_for(pool, &user).await;

        std::fs::create_dir_all(dir.path().join("payments/proofs")).unwrap();
        std::fs::write(dir.path().join("payments/proofs/p.png"), b"png").unwrap();
        payments::upsert_payment(pool, user.id, submission.id, 500_000.0, "payments/proofs/p.png")
            .await
            .unwrap();

        delete(&t.state, submission.id).await.unwrap();
        assert!(store::get_submission(pool, submission.id).await.unwrap().is_none());
        assert!(payments::payment_for_submission(pool, submission.id).await.unwrap().is_none());
        assert!(!dir.path().join("payments/proofs/p.png").exists());
    }

    #[tokio::test]
    async fn csv_export_has_bom_header_and_payment_column() {
        let dir = tempfile::tempdir().unwrap();
        let t = test_state(dir.path()).await;
        let user = insert_participant(&t.state.pool, "siti@example.org").await;
        insert_submission_for(&t.state.pool, &user).await;

        let (filename, bytes) = export_csv(&t.state).await.unwrap();
        assert!(filename.starts_with("submissions_") && filename.ends_with(".csv"));
        assert!(bytes.starts_with(b"\xEF\xBB\xBF"));

        let text = String::from_utf8(bytes[3..].to_vec()).unwrap();
        let mut lines = text.lines();
        assert!(lines.next().unwrap().starts_with("ID,Code,Title,Author,Email,Phone"));
        let row = lines.next().unwrap();
        assert!(row.contains("SOIG-001"));
        assert!(row.contains("081234567890"));
        assert!(row.contains("Unpaid"));
    }
}
