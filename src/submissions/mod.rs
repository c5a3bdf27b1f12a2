//! Submission lifecycle: codes, statuses and the participant-facing operations.

pub mod code;
pub mod service;
mod status;
pub mod workflow;

pub use code::{code_prefix, next_code, ParticipantCategory};
pub use service::{SubmissionForm, SubmissionOverview, SubmissionUploads};
pub use status::{is_conventional_transition, SubmissionStatus, UnknownStatus};
pub use workflow::{AdminSubmission, StatusChange, MAX_REVIEWERS};
