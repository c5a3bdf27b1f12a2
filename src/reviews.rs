//! Reviewer-side operations: assignments, scoring and the reviewer dashboard.

use serde::{Deserialize, Serialize};

use crate::db::reviews::{self, Scores};
use crate::db::submissions as store;
use crate::db::{Review, Submission, User};
use crate::error::{AppError, AppResult, ValidationErrors};
use crate::state::AppState;
use crate::validation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReviewerStats {
    pub total_assigned: usize,
    pub completed: usize,
    pub pending: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssignedReview {
    #[serde(flatten)]
    pub review: Review,
    pub submission: Submission,
}

/// Scores as posted by the reviewer form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReviewForm {
    pub originality_score: Option<i64>,
    pub relevance_score: Option<i64>,
    pub clarity_score: Option<i64>,
    pub methodology_score: Option<i64>,
    pub overall_score: Option<i64>,
    #[serde(default)]
    pub comments: String,
}

impl ReviewForm {
    fn validate(&self) -> Result<Scores, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let mut score = |field: &str, value: Option<i64>| match value {
            Some(n) if (1..=5).contains(&n) => n,
            Some(_) => {
                errors.add(
                    field,
                    format!("The {} must be between 1 and 5.", field.replace('_', " ")),
                );
                0
            }
            None => {
                errors.add(
                    field,
                    format!("The {} field is required.", field.replace('_', " ")),
                );
                0
            }
        };

        let scores = Scores {
            originality: score("originality_score", self.originality_score),
            relevance: score("relevance_score", self.relevance_score),
            clarity: score("clarity_score", self.clarity_score),
            methodology: score("methodology_score", self.methodology_score),
            overall: score("overall_score", self.overall_score),
        };
        validation::required(&mut errors, "comments", &self.comments, None);

        if errors.is_empty() {
            Ok(scores)
        } else {
            Err(errors)
        }
    }
}

/// Every assignment of the reviewer, newest first, with its submission.
pub async fn assigned(state: &AppState, reviewer: &User) -> AppResult<Vec<AssignedReview>> {
    let assignments = reviews::reviews_for_reviewer(&state.pool, reviewer.id).await?;
    let mut rows = Vec::with_capacity(assignments.len());
    for review in assignments {
        if let Some(submission) = store::get_submission(&state.pool, review.submission_id).await? {
            rows.push(AssignedReview { review, submission });
        }
    }
    Ok(rows)
}

pub async fn stats(state: &AppState, reviewer: &User) -> AppResult<ReviewerStats> {
    let assignments = reviews::reviews_for_reviewer(&state.pool, reviewer.id).await?;
    let completed = assignments.iter().filter(|r| r.is_completed()).count();
    Ok(ReviewerStats {
        total_assigned: assignments.len(),
        completed,
        pending: assignments.len() - completed,
    })
}

/// The submission behind one of the reviewer's assignments.
pub async fn view_submission(
    state: &AppState,
    reviewer: &User,
    submission_id: i64,
) -> AppResult<AssignedReview> {
    let submission = store::get_submission(&state.pool, submission_id)
        .await?
        .ok_or_else(|| AppError::NotFound("submission".to_string()))?;
    let review = reviews::find_review(&state.pool, submission_id, reviewer.id)
        .await?
        .ok_or_else(|| {
            AppError::Forbidden("You are not assigned to review this submission.".to_string())
        })?;
    Ok(AssignedReview { review, submission })
}

/// Records the five scores and comments on the reviewer's own review.
pub async fn submit(
    state: &AppState,
    reviewer: &User,
    review_id: i64,
    form: ReviewForm,
) -> AppResult<Review> {
    let scores = form.validate().map_err(AppError::Validation)?;

    let review = reviews::get_review(&state.pool, review_id)
        .await?
        .filter(|review| review.reviewer_id == reviewer.id)
        .ok_or_else(|| AppError::NotFound("review".to_string()))?;

    let saved = reviews::submit_scores(&state.pool, review.id, &scores, Some(form.comments.trim())).await?;
    tracing::info!(
        review_id = saved.id,
        submission_id = saved.submission_id,
        reviewer_id = reviewer.id,
        average = saved.average_score().unwrap_or_default(),
        "review submitted"
    );
    Ok(saved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::db::fixtures::{insert_participant, insert_submission_for, insert_with_role};
    use crate::state::testing::test_state;

    fn form(score: i64) -> ReviewForm {
        ReviewForm {
            originality_score: Some(score),
            relevance_score: Some(score),
            clarity_score: Some(score),
            methodology_score: Some(score),
            overall_score: Some(score),
            comments: "Clear methodology.".into(),
        }
    }

    #[test]
    fn scores_must_be_between_one_and_five() {
        let mut bad = form(3);
        bad.originality_score = Some(6);
        bad.overall_score = None;
        bad.comments = " ".into();
        let errors = bad.validate().unwrap_err();
        assert_eq!(
            errors.fields()["originality_score"][0],
            "The originality score must be between 1 and 5."
        );
        assert!(errors.contains("overall_score"));
        assert!(errors.contains("comments"));
        assert!(form(1).validate().is_ok());
    }

    #[tokio::test]
    async fn reviewer_sees_only_own_assignments() {
        let dir = tempfile::tempdir().unwrap();
        let t = test_state(dir.path()).await;
        let pool = &t.state.pool;
        let author = insert_participant(pool, "siti@example.org").await;
        let mine = insert_submission_for(pool, &author).await;
        let other = insert_submission_for(pool, &author).await;
        let reviewer = insert_with_role(pool, "rev@example.org", Role::Reviewer).await;
        let colleague = insert_with_role(pool, "col@example.org", Role::Reviewer).await;
        let review = reviews::assign_reviewer(pool, mine.id, reviewer.id).await.unwrap();
        let foreign = reviews::assign_reviewer(pool, other.id, colleague.id).await.unwrap();

        let view = view_submission(&t.state, &reviewer, mine.id).await.unwrap();
        assert_eq!(view.submission.id, mine.id);
        let err = view_submission(&t.state, &reviewer, other.id).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let err = submit(&t.state, &reviewer, foreign.id, form(4)).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        assert_eq!(
            stats(&t.state, &reviewer).await.unwrap(),
            ReviewerStats {
                total_assigned: 1,
                completed: 0,
                pending: 1
            }
        );
        let saved = submit(&t.state, &reviewer, review.id, form(4)).await.unwrap();
        assert_eq!(saved.average_score(), Some(4.0));
        assert_eq!(saved.comments.as_deref(), Some("Clear methodology."));

        let stats = stats(&t.state, &reviewer).await.unwrap();
        assert_eq!((stats.completed, stats.pending), (1, 0));
        assert_eq!(assigned(&t.state, &reviewer).await.unwrap().len(), 1);
    }
}
