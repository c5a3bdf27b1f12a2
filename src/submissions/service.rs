use chrono::Utc;
use serde::Serialize;

use super::{ParticipantCategory, SubmissionStatus};
use crate::db::submissions::{self as store, SubmissionFields, SubmissionFiles};
use crate::db::{payments, reviews, CoAuthor, Payment, Submission, User};
use crate::error::{AppError, AppResult, ValidationErrors};
use crate::state::AppState;
use crate::storage::{self, Upload};
use crate::validation;

pub const MAX_CO_AUTHORS: usize = 5;
const PARTICIPANT_CATEGORIES: &[&str] = &["student", "professional", "international"];

/// The participant's submission form as received.
#[derive(Debug, Clone, Default)]
pub struct SubmissionForm {
    pub title: String,
    pub author_full_name: String,
    pub co_authors: Vec<CoAuthor>,
    pub mobile_number: String,
    pub corresponding_author_email: String,
    pub institute_organization: String,
    pub paper_theme: Option<String>,
    pub paper_sub_theme: String,
    pub category_submission: String,
    pub participant_category: String,
    pub abstract_text: String,
    pub keywords: String,
    pub publication_option: Option<String>,
    pub consent_agreed: bool,
}

#[derive(Debug, Clone, Default)]
pub struct SubmissionUploads {
    pub abstract_file: Option<Upload>,
    pub full_paper_file: Option<Upload>,
    pub layouting_file: Option<Upload>,
    pub editor_feedback_file: Option<Upload>,
}

impl SubmissionUploads {
    fn iter(&self) -> impl Iterator<Item = (&'static str, &Upload)> {
        [
            ("submissions/abstracts", &self.abstract_file),
            ("submissions/papers", &self.full_paper_file),
            ("submissions/layouting", &self.layouting_file),
            ("submissions/feedback", &self.editor_feedback_file),
        ]
        .into_iter()
        .filter_map(|(dir, upload)| upload.as_ref().map(|u| (dir, u)))
    }
}

/// A participant's submission with its payment and review summary.
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionOverview {
    #[serde(flatten)]
    pub submission: Submission,
    pub payment_status: &'static str,
    pub payment: Option<Payment>,
    pub score: Option<f64>,
}

fn validate(
    form: &SubmissionForm,
    uploads: &SubmissionUploads,
    creating: bool,
) -> Result<SubmissionFields, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    validation::required(&mut errors, "title", &form.title, Some(255));
    validation::required(&mut errors, "author_full_name", &form.author_full_name, Some(255));
    validation::required(&mut errors, "mobile_number", &form.mobile_number, Some(20));
    validation::email(&mut errors, "corresponding_author_email", &form.corresponding_author_email);
    validation::required(&mut errors, "institute_organization", &form.institute_organization, Some(255));
    validation::optional(&mut errors, "paper_theme", form.paper_theme.as_deref(), 255);
    validation::required(&mut errors, "paper_sub_theme", &form.paper_sub_theme, Some(255));
    validation::required(&mut errors, "category_submission", &form.category_submission, Some(255));
    validation::required(&mut errors, "abstract", &form.abstract_text, None);
    validation::required(&mut errors, "keywords", &form.keywords, Some(500));
    validation::one_of(
        &mut errors,
        "participant_category",
        form.participant_category.trim(),
        PARTICIPANT_CATEGORIES,
    );

    if form.co_authors.len() > MAX_CO_AUTHORS {
        errors.add("co_authors", "At most 5 co-authors may be listed.");
    }
    for (i, co_author) in form.co_authors.iter().enumerate() {
        let field = format!("co_author_{}", i + 1);
        validation::optional(&mut errors, &field, Some(&co_author.name), 255);
        validation::optional(
            &mut errors,
            &format!("{}_institute", field),
            co_author.institute.as_deref(),
            255,
        );
    }

    if creating {
        if !form.consent_agreed {
            errors.add("consent_agreed", "The consent agreed must be accepted.");
        }
        if uploads.abstract_file.is_none() && uploads.full_paper_file.is_none() {
            errors.add(
                "full_paper_file",
                "Either an abstract file or a full paper file is required.",
            );
        }
    }

    for (_, upload) in uploads.iter() {
        if let Err(upload_errors) = storage::validate_upload(upload, &storage::SUBMISSION_FILE) {
            for (field, messages) in upload_errors.fields() {
                for message in messages {
                    errors.add(field, message.clone());
                }
            }
        }
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    let participant_category = form
        .participant_category
        .trim()
        .parse::<ParticipantCategory>()
        .map_err(|message| ValidationErrors::single("participant_category", message))?;

    Ok(SubmissionFields {
        title: form.title.trim().to_string(),
        author_full_name: form.author_full_name.trim().to_string(),
        co_authors: form
            .co_authors
            .iter()
            .filter(|c| !c.name.trim().is_empty())
            .cloned()
            .collect(),
        mobile_number: form.mobile_number.trim().to_string(),
        corresponding_author_email: form.corresponding_author_email.trim().to_string(),
        institute_organization: form.institute_organization.trim().to_string(),
        paper_theme: form
            .paper_theme
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string),
        paper_sub_theme: form.paper_sub_theme.trim().to_string(),
        category_submission: form.category_submission.trim().to_string(),
        participant_category,
        abstract_text: form.abstract_text.trim().to_string(),
        keywords: form.keywords.trim().to_string(),
        publication_option: form.publication_option.clone().filter(|o| !o.trim().is_empty()),
    })
}

/// Writes every provided upload. Files already written are removed again
/// when a later one fails.
async fn store_uploads(state: &AppState, uploads: &SubmissionUploads) -> AppResult<SubmissionFiles> {
    let root = &state.config.storage_folder;
    let mut files = SubmissionFiles::default();
    let mut written = Vec::new();

    for (dir, upload) in uploads.iter() {
        match storage::store_upload(root, dir, upload, &storage::SUBMISSION_FILE).await {
            Ok(relative) => {
                written.push(relative.clone());
                let slot = match dir {
                    "submissions/abstracts" => &mut files.abstract_file,
                    "submissions/papers" => &mut files.full_paper_file,
                    "submissions/layouting" => &mut files.layouting_file,
                    _ => &mut files.editor_feedback_file,
                };
                *slot = Some(relative);
            }
            Err(err) => {
                for relative in &written {
                    storage::discard(root, relative).await;
                }
                return Err(err);
            }
        }
    }

    Ok(files)
}

async fn discard_files(state: &AppState, files: &SubmissionFiles) {
    let root = &state.config.storage_folder;
    for relative in [
        &files.abstract_file,
        &files.full_paper_file,
        &files.layouting_file,
        &files.editor_feedback_file,
    ]
    .into_iter()
    .flatten()
    {
        storage::discard(root, relative).await;
    }
}

/// Creates a pending submission while the submission window is open and
/// emails the corresponding author a confirmation.
pub async fn create(
    state: &AppState,
    user: &User,
    form: SubmissionForm,
    uploads: SubmissionUploads,
) -> AppResult<Submission> {
    let window = state.settings.submission_window().await?.status(Utc::now());
    if !window.open {
        return Err(AppError::Forbidden(window.message));
    }

    let fields = validate(&form, &uploads, true).map_err(AppError::Validation)?;

    let files = store_uploads(state, &uploads).await?;
    let submission = match store::create_submission(&state.pool, user.id, &fields, &files).await {
        Ok(submission) => submission,
        Err(err) => {
            discard_files(state, &files).await;
            return Err(err.into());
        }
    };

    tracing::info!(
        submission = %submission.submission_code,
        user_id = user.id,
        "submission created"
    );
    state.notifier.submission_received(user, &submission).await;
    Ok(submission)
}

/// Owner edit. Only pending and revision submissions are editable; a
/// revision goes back to under review. Replaced files are removed.
pub async fn update_own(
    state: &AppState,
    user: &User,
    id: i64,
    form: SubmissionForm,
    uploads: SubmissionUploads,
) -> AppResult<Submission> {
    let current = store::get_owned_submission(&state.pool, id, user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("submission".to_string()))?;

    if !current.status.is_editable_by_owner() {
        return Err(AppError::Forbidden(
            "You cannot edit this submission at its current status.".to_string(),
        ));
    }

    let fields = validate(&form, &uploads, false).map_err(AppError::Validation)?;
    let files = store_uploads(state, &uploads).await?;

    let status = if current.status.is_revision() {
        SubmissionStatus::UnderReview
    } else {
        current.status
    };

    let updated = match store::update_submission(&state.pool, id, &fields, &files, status).await {
        Ok(updated) => updated,
        Err(err) => {
            discard_files(state, &files).await;
            return Err(err.into());
        }
    };

    let replaced = [
        (&files.abstract_file, &current.abstract_file),
        (&files.full_paper_file, &current.full_paper_file),
        (&files.layouting_file, &current.layouting_file),
        (&files.editor_feedback_file, &current.editor_feedback_file),
    ];
    for (new, old) in replaced {
        if let (Some(_), Some(old)) = (new, old) {
            storage::discard(&state.config.storage_folder, old).await;
        }
    }

    tracing::info!(
        submission = %updated.submission_code,
        from = %current.status,
        to = %updated.status,
        "submission updated by owner"
    );
    Ok(updated)
}

/// Flags the owner's submission for deletion. No notification is sent.
pub async fn request_deletion(
    state: &AppState,
    user: &User,
    id: i64,
    reason: Option<&str>,
) -> AppResult<Submission> {
    let reason = reason.map(str::trim).filter(|r| !r.is_empty());
    let mut errors = ValidationErrors::new();
    validation::optional(&mut errors, "reason", reason, 1000);
    errors.into_result()?;

    store::get_owned_submission(&state.pool, id, user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("submission".to_string()))?;

    let submission = store::request_deletion(&state.pool, id, reason).await?;
    tracing::info!(submission = %submission.submission_code, "deletion requested by owner");
    Ok(submission)
}

/// The user's submissions with payment status (`paid` once verified) and
/// the mean score of the completed reviews.
pub async fn overview_for_user(state: &AppState, user_id: i64) -> AppResult<Vec<SubmissionOverview>> {
    let submissions = store::list_for_user(&state.pool, user_id).await?;
    let mut overview = Vec::with_capacity(submissions.len());

    for submission in submissions {
        let payment = payments::payment_for_submission(&state.pool, submission.id).await?;
        let scores: Vec<f64> = reviews::reviews_for_submission(&state.pool, submission.id)
            .await?
            .iter()
            .filter_map(|r| r.review.average_score())
            .collect();

        let score = if scores.is_empty() {
            None
        } else {
            Some(scores.iter().sum::<f64>() / scores.len() as f64)
        };
        let payment_status = if payment.as_ref().is_some_and(|p| p.verified) {
            "paid"
        } else {
            "unpaid"
        };

        overview.push(SubmissionOverview {
            submission,
            payment_status,
            payment,
            score,
        });
    }

    Ok(overview)
}
