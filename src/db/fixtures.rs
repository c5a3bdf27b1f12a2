use chrono::Utc;
use sqlx::SqlitePool;

use super::submissions::{create_submission, SubmissionFields, SubmissionFiles};
use super::users::{create_user, NewUser};
use super::{CoAuthor, Submission, User};
use crate::auth::Role;
use crate::submissions::ParticipantCategory;

pub(crate) fn participant(email: &str) -> NewUser {
    NewUser {
        name: email.to_string(),
        email: email.to_string(),
        password_hash: "salt$hash".to_string(),
        role: Role::Participant,
        full_name: Some("Siti Rahma".to_string()),
        affiliation: Some("Institut Teknologi Bandung".to_string()),
        whatsapp: Some("081234567890".to_string()),
        category: Some("Student".to_string()),
        email_verified_at: None,
    }
}

pub(crate) async fn insert_participant(pool: &SqlitePool, email: &str) -> User {
    let mut user = participant(email);
    user.email_verified_at = Some(Utc::now());
    create_user(pool, &user).await.expect("participant inserted")
}

pub(crate) async fn insert_with_role(pool: &SqlitePool, email: &str, role: Role) -> User {
    let mut user = participant(email);
    user.role = role;
    user.email_verified_at = Some(Utc::now());
    create_user(pool, &user).await.expect("user inserted")
}

pub(crate) fn submission_fields(
    category: ParticipantCategory,
    presentation: &str,
) -> SubmissionFields {
    SubmissionFields {
        title: "Fault Mapping of the Lembang Segment".to_string(),
        author_full_name: "Siti Rahma".to_string(),
        co_authors: vec![CoAuthor {
            name: "Budi Santoso".to_string(),
            institute: Some("UPN Veteran Yogyakarta".to_string()),
        }],
        mobile_number: "081234567890".to_string(),
        corresponding_author_email: "siti@example.org".to_string(),
        institute_organization: "Institut Teknologi Bandung".to_string(),
        paper_theme: Some("Geohazard".to_string()),
        paper_sub_theme: "Active Tectonics".to_string(),
        category_submission: presentation.to_string(),
        participant_category: category,
        abstract_text: "We map the Lembang fault using LiDAR.".to_string(),
        keywords: "fault, lidar".to_string(),
        publication_option: None,
    }
}

pub(crate) async fn insert_submission_for(pool: &SqlitePool, user: &User) -> Submission {
    let fields = submission_fields(ParticipantCategory::Student, "Oral Presentation");
    create_submission(pool, user.id, &fields, &SubmissionFiles::default())
        .await
        .expect("submission inserted")
}
