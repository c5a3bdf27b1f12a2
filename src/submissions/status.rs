use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle stage of a submission.
///
/// Admins and reviewers may move a submission from any status to any other;
/// [`is_conventional_transition`] only describes the usual path so that
/// unusual moves can be flagged in the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
pub enum SubmissionStatus {
    #[serde(rename = "pending")]
    #[sqlx(rename = "pending")]
    Pending,
    #[serde(rename = "under_review")]
    #[sqlx(rename = "under_review")]
    UnderReview,
    #[serde(rename = "revision_required_phase1")]
    #[sqlx(rename = "revision_required_phase1")]
    RevisionRequiredPhase1,
    #[serde(rename = "revision_required_phase2")]
    #[sqlx(rename = "revision_required_phase2")]
    RevisionRequiredPhase2,
    #[serde(rename = "accepted")]
    #[sqlx(rename = "accepted")]
    Accepted,
    #[serde(rename = "rejected")]
    #[sqlx(rename = "rejected")]
    Rejected,
    #[serde(rename = "deletion_requested")]
    #[sqlx(rename = "deletion_requested")]
    DeletionRequested,
}

impl SubmissionStatus {
    pub const ALL: [SubmissionStatus; 7] = [
        SubmissionStatus::Pending,
        SubmissionStatus::UnderReview,
        SubmissionStatus::RevisionRequiredPhase1,
        SubmissionStatus::RevisionRequiredPhase2,
        SubmissionStatus::Accepted,
        SubmissionStatus::Rejected,
        SubmissionStatus::DeletionRequested,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::Pending => "pending",
            SubmissionStatus::UnderReview => "under_review",
            SubmissionStatus::RevisionRequiredPhase1 => "revision_required_phase1",
            SubmissionStatus::RevisionRequiredPhase2 => "revision_required_phase2",
            SubmissionStatus::Accepted => "accepted",
            SubmissionStatus::Rejected => "rejected",
            SubmissionStatus::DeletionRequested => "deletion_requested",
        }
    }

    /// Human label, e.g. `Revision required phase1`.
    pub fn label(&self) -> String {
        let spaced = self.as_str().replace('_', " ");
        let mut chars = spaced.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }

    pub fn is_revision(&self) -> bool {
        matches!(
            self,
            SubmissionStatus::RevisionRequiredPhase1 | SubmissionStatus::RevisionRequiredPhase2
        )
    }

    /// Statuses in which the owner may still edit the submission.
    pub fn is_editable_by_owner(&self) -> bool {
        matches!(self, SubmissionStatus::Pending) || self.is_revision()
    }
}

/// Whether `from -> to` follows the documented review path.
///
/// The path is pending → under_review → {revision phases, accepted, rejected},
/// revisions return to under_review or move on to a decision, and any status
/// may become deletion_requested. Nothing enforces this; callers use it to
/// log transitions that leave the path.
pub fn is_conventional_transition(from: SubmissionStatus, to: SubmissionStatus) -> bool {
    use SubmissionStatus::*;

    if from == to || to == DeletionRequested {
        return true;
    }

    match from {
        Pending => matches!(to, UnderReview),
        UnderReview => matches!(
            to,
            RevisionRequiredPhase1 | RevisionRequiredPhase2 | Accepted | Rejected
        ),
        RevisionRequiredPhase1 => matches!(
            to,
            UnderReview | RevisionRequiredPhase2 | Accepted | Rejected
        ),
        RevisionRequiredPhase2 => matches!(to, UnderReview | Accepted | Rejected),
        Accepted | Rejected | DeletionRequested => false,
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown submission status '{0}'")]
pub struct UnknownStatus(pub String);

impl FromStr for SubmissionStatus {
    type Err = UnknownStatus;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim();
        SubmissionStatus::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| UnknownStatus(value.to_string()))
    }
}
