use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

use crate::auth::Role;
use crate::submissions::{ParticipantCategory, SubmissionStatus};

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub full_name: Option<String>,
    pub affiliation: Option<String>,
    pub whatsapp: Option<String>,
    pub category: Option<String>,
    pub email_verified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_verified(&self) -> bool {
        self.email_verified_at.is_some()
    }

    /// Name used when addressing the user in notifications.
    pub fn display_name(&self) -> &str {
        self.full_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoAuthor {
    pub name: String,
    #[serde(default)]
    pub institute: Option<String>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Submission {
    pub id: i64,
    pub user_id: i64,
    pub submission_code: String,
    pub title: String,
    pub author_full_name: String,
    pub co_authors: Json<Vec<CoAuthor>>,
    pub mobile_number: String,
    pub corresponding_author_email: String,
    pub institute_organization: String,
    pub paper_theme: Option<String>,
    pub paper_sub_theme: String,
    pub category_submission: String,
    pub participant_category: ParticipantCategory,
    #[sqlx(rename = "abstract")]
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub keywords: String,
    pub abstract_file: Option<String>,
    pub full_paper_file: Option<String>,
    pub layouting_file: Option<String>,
    pub editor_feedback_file: Option<String>,
    pub publication_option: Option<String>,
    pub status: SubmissionStatus,
    pub deletion_requested_at: Option<DateTime<Utc>>,
    pub deletion_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Submission {
    pub fn stored_files(&self) -> impl Iterator<Item = &str> {
        [
            &self.abstract_file,
            &self.full_paper_file,
            &self.layouting_file,
            &self.editor_feedback_file,
        ]
        .into_iter()
        .filter_map(|path| path.as_deref())
    }
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Review {
    pub id: i64,
    pub submission_id: i64,
    pub reviewer_id: i64,
    pub originality_score: Option<i64>,
    pub relevance_score: Option<i64>,
    pub clarity_score: Option<i64>,
    pub methodology_score: Option<i64>,
    pub overall_score: Option<i64>,
    pub comments: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Review {
    pub fn is_completed(&self) -> bool {
        self.originality_score.is_some() || self.overall_score.is_some()
    }

    /// Mean of the five criteria, missing criteria counting as zero.
    pub fn average_score(&self) -> Option<f64> {
        self.overall_score?;
        let total: i64 = [
            self.originality_score,
            self.relevance_score,
            self.clarity_score,
            self.methodology_score,
            self.overall_score,
        ]
        .iter()
        .map(|score| score.unwrap_or(0))
        .sum();
        Some(total as f64 / 5.0)
    }
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Payment {
    pub id: i64,
    pub user_id: i64,
    pub submission_id: i64,
    pub amount: f64,
    pub payment_proof_url: String,
    pub verified: bool,
    pub verified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// How a landing page value is interpreted when served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum SettingKind {
    Text,
    Json,
    Date,
    Image,
}

impl std::str::FromStr for SettingKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(SettingKind::Text),
            "json" => Ok(SettingKind::Json),
            "date" => Ok(SettingKind::Date),
            "image" => Ok(SettingKind::Image),
            other => Err(format!("unknown setting type '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct LandingPageSetting {
    pub id: i64,
    pub key: String,
    pub value: Option<String>,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub kind: SettingKind,
    pub section: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct EmailSetting {
    pub id: i64,
    pub mail_mailer: String,
    pub mail_host: String,
    pub mail_port: i64,
    pub mail_username: String,
    #[serde(skip_serializing)]
    pub mail_password: String,
    pub mail_encryption: String,
    pub mail_from_address: String,
    pub mail_from_name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPageVisit {
    pub ip_address: String,
    pub user_agent: Option<String>,
    pub page: String,
}
