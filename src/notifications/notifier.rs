use chrono::{FixedOffset, Utc};
use serde::Serialize;
use std::sync::Arc;
use tera::Context;
use tracing::{error, info, warn};

use super::mail::{MailChannel, OutgoingMail};
use super::messages::{self, WhatsAppStatusMessage};
use super::whatsapp::MessageChannel;
use crate::db::{Submission, User};
use crate::settings::format_local;
use crate::submissions::SubmissionStatus;
use crate::templates;

/// Outcome of one status notification. Failures are only reported here and
/// in the log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NotificationReport {
    pub whatsapp_attempted: bool,
    pub whatsapp_sent: bool,
    pub email_sent: bool,
}

pub struct StatusNotifier {
    whatsapp: Arc<dyn MessageChannel>,
    mail: Arc<dyn MailChannel>,
    conference_name: String,
    app_url: String,
    timezone: FixedOffset,
}

impl StatusNotifier {
    pub fn new(
        whatsapp: Arc<dyn MessageChannel>,
        mail: Arc<dyn MailChannel>,
        conference_name: impl Into<String>,
        app_url: impl Into<String>,
        timezone: FixedOffset,
    ) -> Self {
        Self {
            whatsapp,
            mail,
            conference_name: conference_name.into(),
            app_url: app_url.into(),
            timezone,
        }
    }

    /// Sends one WhatsApp message and one email about a status change.
    pub async fn status_changed(
        &self,
        user: &User,
        submission: &Submission,
        old: SubmissionStatus,
        new: SubmissionStatus,
    ) -> NotificationReport {
        let mut report = NotificationReport::default();

        match user.whatsapp.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
            Some(phone) => {
                let message = WhatsAppStatusMessage {
                    conference_name: &self.conference_name,
                    recipient_name: user.display_name(),
                    submission_code: &submission.submission_code,
                    title: &submission.title,
                    status: new.as_str(),
                }
                .render();
                report.whatsapp_attempted = true;
                report.whatsapp_sent = self.whatsapp.send_message(phone, &message).await;
            }
            None => warn!(user_id = user.id, "user has no WhatsApp number; skipping WhatsApp notification"),
        }

        report.email_sent = match self.status_email(user, submission, old, new) {
            Ok(mail) => self.deliver(&mail).await,
            Err(err) => {
                error!(error = %err, submission = %submission.submission_code, "failed to render status email");
                false
            }
        };

        info!(
            submission = %submission.submission_code,
            from = %old,
            to = %new,
            whatsapp_sent = report.whatsapp_sent,
            email_sent = report.email_sent,
            "status notification dispatched"
        );
        report
    }

    /// Confirmation email for a freshly created submission.
    pub async fn submission_received(&self, user: &User, submission: &Submission) -> bool {
        let mut ctx = self.base_context();
        ctx.insert("author_name", &submission.author_full_name);
        ctx.insert("submission_code", &submission.submission_code);
        ctx.insert("title", &submission.title);
        ctx.insert("presentation_type", &submission.category_submission);
        ctx.insert(
            "submitted_at",
            &format_local(submission.created_at, self.timezone, "%d %B %Y, %H:%M"),
        );

        let subject = format!("Submission Confirmation - {}", self.conference_name);
        match templates::render("emails/submission_confirmation.html", &ctx) {
            Ok(html) => {
                let mail = OutgoingMail {
                    to: recipient(user, submission).to_string(),
                    subject,
                    html,
                };
                self.deliver(&mail).await
            }
            Err(err) => {
                error!(error = %err, "failed to render submission confirmation");
                false
            }
        }
    }

    pub async fn account_verified(&self, user: &User) -> bool {
        let mut ctx = self.base_context();
        ctx.insert("user_name", &user.name);
        ctx.insert("user_email", &user.email);
        ctx.insert(
            "verified_at",
            &format_local(Utc::now(), self.timezone, "%d %B %Y, %H:%M"),
        );

        match templates::render("emails/account_verified.html", &ctx) {
            Ok(html) => {
                let mail = OutgoingMail {
                    to: user.email.clone(),
                    subject: format!("Account Verified - {}", self.conference_name),
                    html,
                };
                self.deliver(&mail).await
            }
            Err(err) => {
                error!(error = %err, "failed to render account verification email");
                false
            }
        }
    }

    fn status_email(
        &self,
        user: &User,
        submission: &Submission,
        old: SubmissionStatus,
        new: SubmissionStatus,
    ) -> Result<OutgoingMail, tera::Error> {
        let banner = messages::status_banner(new.as_str());
        let mut ctx = self.base_context();
        ctx.insert("author_name", &submission.author_full_name);
        ctx.insert("submission_code", &submission.submission_code);
        ctx.insert("title", &submission.title);
        ctx.insert("old_status", &old.label());
        ctx.insert("new_status", &new.label());
        ctx.insert("color", banner.color);
        ctx.insert("icon", banner.icon);
        ctx.insert("headline", banner.headline);
        ctx.insert("next_steps", messages::next_steps(new.as_str()));
        ctx.insert("important_note", &messages::important_note(new.as_str()));
        ctx.insert(
            "updated_at",
            &format_local(Utc::now(), self.timezone, "%d %B %Y, %H:%M"),
        );

        Ok(OutgoingMail {
            to: recipient(user, submission).to_string(),
            subject: format!("Submission Status Update - {}", self.conference_name),
            html: templates::render("emails/status_changed.html", &ctx)?,
        })
    }

    fn base_context(&self) -> Context {
        let mut ctx = Context::new();
        ctx.insert("conference_name", &self.conference_name);
        ctx.insert(
            "dashboard_url",
            &format!("{}/dashboard", self.app_url.trim_end_matches('/')),
        );
        ctx
    }

    async fn deliver(&self, mail: &OutgoingMail) -> bool {
        match self.mail.send(mail).await {
            Ok(()) => true,
            Err(err) => {
                error!(to = %mail.to, subject = %mail.subject, error = %err, "email delivery failed");
                false
            }
        }
    }
}

/// The corresponding author's address, or the account email when none was given.
fn recipient<'a>(user: &'a User, submission: &'a Submission) -> &'a str {
    let corresponding = submission.corresponding_author_email.trim();
    if corresponding.is_empty() {
        &user.email
    } else {
        corresponding
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::db::EmailSetting;
    use crate::notifications::mail::MailError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records every message instead of delivering it.
    #[derive(Default)]
    pub struct RecordingWhatsApp {
        pub sent: Mutex<Vec<(String, String)>>,
        pub fail: bool,
    }

    #[async_trait]
    impl MessageChannel for RecordingWhatsApp {
        async fn send_message(&self, phone: &str, message: &str) -> bool {
            self.sent
                .lock()
                .unwrap()
                .push((phone.to_string(), message.to_string()));
            !self.fail
        }
    }

    #[derive(Default)]
    pub struct RecordingMail {
        pub sent: Mutex<Vec<OutgoingMail>>,
        pub fail: bool,
    }

    #[async_trait]
    impl MailChannel for RecordingMail {
        async fn send(&self, mail: &OutgoingMail) -> Result<(), MailError> {
            self.sent.lock().unwrap().push(mail.clone());
            if self.fail {
                Err(MailError::NotConfigured)
            } else {
                Ok(())
            }
        }

        async fn configure(&self, _settings: Option<&EmailSetting>) -> Result<(), MailError> {
            Ok(())
        }
    }
}
