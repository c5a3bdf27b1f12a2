//! Committee tools that do not belong to a single submission: analytics,
//! account administration and the outgoing mail configuration.

use chrono::{DateTime, FixedOffset, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::Role;
use crate::db::email_settings::{self, EmailSettingInput};
use crate::db::submissions::{self as submission_store, TopicCount};
use crate::db::{payments, users, visits, EmailSetting, Submission, User};
use crate::error::{AppError, AppResult, ValidationErrors};
use crate::notifications::OutgoingMail;
use crate::state::AppState;
use crate::storage;
use crate::submissions::SubmissionStatus;
use crate::validation;
use crate::visits::LANDING_PAGE;

#[derive(Debug, Clone, Serialize)]
pub struct DashboardStats {
    pub total_submissions: i64,
    pub pending_reviews: i64,
    pub accepted: i64,
    pub rejected: i64,
    pub verified_payments: i64,
    pub pending_payments: i64,
    pub total_users: i64,
    pub visits_total: i64,
    pub visits_today: i64,
    pub recent_submissions: Vec<Submission>,
    pub submissions_per_topic: Vec<TopicCount>,
}

/// Midnight of the current local day, expressed in UTC.
fn start_of_day(now: DateTime<Utc>, offset: FixedOffset) -> DateTime<Utc> {
    now.with_timezone(&offset)
        .date_naive()
        .and_time(NaiveTime::MIN)
        .and_local_timezone(offset)
        .single()
        .map(|midnight| midnight.with_timezone(&Utc))
        .unwrap_or(now)
}

pub async fn dashboard(state: &AppState) -> AppResult<DashboardStats> {
    let pool = &state.pool;
    let today = start_of_day(Utc::now(), state.config.timezone);

    Ok(DashboardStats {
        total_submissions: submission_store::count_all(pool).await?,
        pending_reviews: submission_store::count_by_status(pool, SubmissionStatus::Pending).await?,
        accepted: submission_store::count_by_status(pool, SubmissionStatus::Accepted).await?,
        rejected: submission_store::count_by_status(pool, SubmissionStatus::Rejected).await?,
        verified_payments: payments::count_verified(pool, true).await?,
        pending_payments: payments::count_verified(pool, false).await?,
        total_users: users::count_by_role(pool, Role::Participant).await?,
        visits_total: visits::count_for_page(pool, LANDING_PAGE).await?,
        visits_today: visits::count_since(pool, LANDING_PAGE, today).await?,
        recent_submissions: submission_store::recent_submissions(pool, 5).await?,
        submissions_per_topic: submission_store::submissions_per_topic(pool).await?,
    })
}

/// Verifies or un-verifies an account. Verifying emails the user.
pub async fn set_user_verification(state: &AppState, user_id: i64, verify: bool) -> AppResult<User> {
    let verified_at = verify.then(Utc::now);
    if !users::set_verified_at(&state.pool, user_id, verified_at).await? {
        return Err(AppError::NotFound("user".to_string()));
    }
    let user = users::get_user(&state.pool, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("user".to_string()))?;

    tracing::info!(user_id, verified = verify, "account verification changed");
    if verify {
        state.notifier.account_verified(&user).await;
    }
    Ok(user)
}

/// Deletes an account with everything it owns, including stored files.
pub async fn delete_user(state: &AppState, acting: &User, user_id: i64) -> AppResult<()> {
    if acting.id == user_id {
        return Err(AppError::Forbidden(
            "You cannot delete your own account.".to_string(),
        ));
    }
    let user = users::get_user(&state.pool, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("user".to_string()))?;

    let submissions = submission_store::list_for_user(&state.pool, user.id).await?;
    let proofs = payments::payments_for_user(&state.pool, user.id).await?;
    users::delete_user(&state.pool, user.id).await?;

    let root = &state.config.storage_folder;
    for submission in &submissions {
        for relative in submission.stored_files() {
            storage::discard(root, relative).await;
        }
    }
    for payment in &proofs {
        storage::discard(root, &payment.payment_proof_url).await;
    }

    tracing::info!(user_id, email = %user.email, "user deleted");
    Ok(())
}

/// SMTP settings form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmailSettingsForm {
    #[serde(default)]
    pub mail_host: String,
    pub mail_port: Option<i64>,
    #[serde(default)]
    pub mail_username: String,
    #[serde(default)]
    pub mail_password: String,
    #[serde(default)]
    pub mail_encryption: String,
    #[serde(default)]
    pub mail_from_address: String,
    #[serde(default)]
    pub mail_from_name: String,
}

impl EmailSettingsForm {
    fn validate(self) -> Result<EmailSettingInput, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        validation::required(&mut errors, "mail_host", &self.mail_host, None);
        if self.mail_port.is_none() {
            errors.add("mail_port", "The mail port must be an integer.");
        }
        validation::required(&mut errors, "mail_username", &self.mail_username, None);
        validation::required(&mut errors, "mail_password", &self.mail_password, None);
        validation::one_of(
            &mut errors,
            "mail_encryption",
            self.mail_encryption.trim(),
            &["tls", "ssl"],
        );
        validation::email(&mut errors, "mail_from_address", &self.mail_from_address);
        validation::required(&mut errors, "mail_from_name", &self.mail_from_name, None);

        match (errors.is_empty(), self.mail_port) {
            (true, Some(mail_port)) => Ok(EmailSettingInput {
                mail_host: self.mail_host.trim().to_string(),
                mail_port,
                mail_username: self.mail_username.trim().to_string(),
                mail_password: self.mail_password,
                mail_encryption: self.mail_encryption.trim().to_string(),
                mail_from_address: self.mail_from_address.trim().to_string(),
                mail_from_name: self.mail_from_name.trim().to_string(),
            }),
            _ => Err(errors),
        }
    }
}

pub async fn email_settings(state: &AppState) -> AppResult<Option<EmailSetting>> {
    Ok(email_settings::active_settings(&state.pool).await?)
}

/// Stores the configuration as the only active one and applies it to the
/// running mailer.
pub async fn save_email_settings(state: &AppState, form: EmailSettingsForm) -> AppResult<EmailSetting> {
    let input = form.validate().map_err(AppError::Validation)?;
    let saved = email_settings::save_active(&state.pool, &input).await?;

    if let Err(err) = state.mail.configure(Some(&saved)).await {
        return Err(AppError::Validation(ValidationErrors::single(
            "mail_host",
            format!("The email settings were saved but could not be applied: {}", err),
        )));
    }
    tracing::info!(host = %saved.mail_host, port = saved.mail_port, "email settings applied");
    Ok(saved)
}

/// Sends a fixed test message through the current configuration.
pub async fn send_test_email(state: &AppState, to: &str) -> AppResult<()> {
    let mut errors = ValidationErrors::new();
    validation::email(&mut errors, "test_email", to);
    errors.into_result()?;

    let name = &state.config.conference_name;
    let mail = OutgoingMail {
        to: to.trim().to_string(),
        subject: format!("Test Email - {}", name),
        html: format!(
            "<p>This is a test email from {} Conference Management System.</p>",
            name
        ),
    };
    state.mail.send(&mail).await.map_err(|err| {
        tracing::warn!(to = %mail.to, error = %err, "test email failed");
        AppError::Validation(ValidationErrors::single(
            "test_email",
            format!("Failed to send test email: {}", err),
        ))
    })
}
