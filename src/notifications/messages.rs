//! Per-status wording for outbound notifications. Every table falls back to a
//! generic entry for statuses it does not list.

/// Indonesian status paragraph used in WhatsApp messages.
pub fn whatsapp_status_text(status: &str) -> &'static str {
    match status {
        "pending" => "Status submission Anda telah diubah menjadi *Pending*.\n\nSubmission akan segera ditinjau oleh tim kami.",
        "under_review" => "Status submission Anda telah diubah menjadi *Under Review*.\n\nSubmission Anda sedang dalam proses peninjauan oleh reviewer.",
        "revision_required_phase1" => "Status submission Anda telah diubah menjadi *Revision Phase 1*.\n\nSilakan lakukan revisi sesuai dengan komentar reviewer.",
        "revision_required_phase2" => "Status submission Anda telah diubah menjadi *Revision Phase 2*.\n\nSilakan lakukan revisi tambahan sesuai dengan komentar reviewer.",
        "accepted" => "🎉 *Selamat!* 🎉\n\nSubmission Anda telah *DITERIMA* (Accepted).\n\nTerima kasih atas kontribusi Anda dalam konferensi ini.",
        "rejected" => "Status submission Anda telah diubah menjadi *Rejected*.\n\nMohon maaf submission Anda tidak dapat diterima kali ini. Terima kasih atas partisipasi Anda.",
        _ => "Status submission Anda telah diperbarui.",
    }
}

pub struct WhatsAppStatusMessage<'a> {
    pub conference_name: &'a str,
    pub recipient_name: &'a str,
    pub submission_code: &'a str,
    pub title: &'a str,
    pub status: &'a str,
}

impl WhatsAppStatusMessage<'_> {
    pub fn render(&self) -> String {
        let mut message = format!("*{} - Notification*\n\n", self.conference_name);
        message.push_str(&format!("Halo *{}*,\n\n", self.recipient_name));
        message.push_str(&format!("Submission ID: *{}*\n", self.submission_code));
        message.push_str(&format!("Judul: *{}*\n\n", self.title));
        message.push_str(whatsapp_status_text(self.status));
        message.push_str("\n\n");
        message.push_str("Silakan login ke dashboard Anda untuk informasi lebih lanjut.\n\n");
        message.push_str("Terima kasih,\n");
        message.push_str(&format!("Tim {}", self.conference_name));
        message
    }
}

/// Banner shown at the top of the status email.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusBanner {
    pub color: &'static str,
    pub icon: &'static str,
    pub headline: &'static str,
}

pub fn status_banner(status: &str) -> StatusBanner {
    let (color, icon, headline) = match status {
        "accepted" => ("#28a745", "✅", "Congratulations! Your paper has been accepted!"),
        "rejected" => (
            "#dc3545",
            "❌",
            "We regret to inform you that your paper was not accepted.",
        ),
        "revision_required_phase1" => ("#ff9800", "📝", "Your paper requires revisions (Phase 1)."),
        "revision_required_phase2" => ("#ff9800", "📝", "Your paper requires revisions (Phase 2)."),
        "under_review" => ("#2196f3", "🔍", "Your paper is now under review."),
        "pending" => ("#ffc107", "⏳", "Your paper status has been updated to pending."),
        _ => ("#6c757d", "ℹ️", "Your submission status has been updated."),
    };
    StatusBanner {
        color,
        icon,
        headline,
    }
}

pub fn next_steps(status: &str) -> &'static [&'static str] {
    match status {
        "accepted" => &[
            "Congratulations on your paper acceptance!",
            "Prepare your final manuscript following the conference guidelines",
            "Complete your conference registration and payment if not done yet",
            "Upload the camera-ready version of your paper by the deadline",
            "Start preparing your presentation materials for the conference",
        ],
        "rejected" => &[
            "Thank you for your submission to our conference",
            "We encourage you to review the feedback from our reviewers",
            "Consider making improvements for future submissions to other venues",
            "Please contact us if you have any questions about this decision",
        ],
        "revision_required_phase1" | "revision_required_phase2" => &[
            "Please review the detailed comments from our reviewers in your submission portal",
            "Make the necessary revisions to address all reviewer concerns",
            "Prepare a response document explaining how you addressed each comment",
            "Resubmit your revised paper through the submission portal by the deadline",
            "Contact us if you need clarification on any reviewer comments",
        ],
        "under_review" => &[
            "Your paper is currently being evaluated by our scientific committee",
            "The review process typically takes 2-4 weeks depending on reviewer availability",
            "You will receive email notification when the review is completed",
            "No action is required from you at this time",
            "Thank you for your patience during the review process",
        ],
        _ => &[
            "You will receive further updates about your submission via email",
            "Please check your submission portal regularly for any updates",
            "Contact our organizing committee if you have any questions",
        ],
    }
}

pub fn important_note(status: &str) -> Option<&'static str> {
    match status {
        "accepted" => Some(
            "Please ensure you complete all registration requirements and submit your camera-ready paper before the deadline to be included in the conference proceedings.",
        ),
        "revision_required_phase1" | "revision_required_phase2" => Some(
            "Please submit your revisions by the specified deadline to ensure your paper can be reconsidered for acceptance.",
        ),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::submissions::SubmissionStatus;

    #[test]
    fn every_notified_status_has_its_own_text() {
        let fallback = whatsapp_status_text("something-else");
        for status in [
            SubmissionStatus::Pending,
            SubmissionStatus::UnderReview,
            SubmissionStatus::RevisionRequiredPhase1,
            SubmissionStatus::RevisionRequiredPhase2,
            SubmissionStatus::Accepted,
            SubmissionStatus::Rejected,
        ] {
            assert_ne!(whatsapp_status_text(status.as_str()), fallback, "{}", status);
            assert_ne!(status_banner(status.as_str()).color, "#6c757d", "{}", status);
        }
    }

    #[test]
    fn unmapped_status_uses_fallbacks() {
        assert_eq!(
            whatsapp_status_text("deletion_requested"),
            "Status submission Anda telah diperbarui."
        );
        let banner = status_banner("deletion_requested");
        assert_eq!(banner.headline, "Your submission status has been updated.");
        assert_eq!(next_steps("deletion_requested").len(), 3);
        assert_eq!(important_note("deletion_requested"), None);
    }

    #[test]
    fn whatsapp_message_layout() {
        let message = WhatsAppStatusMessage {
            conference_name: "PIT IAGI-GEOSEA 2026",
            recipient_name: "Siti",
            submission_code: "SOIG-001",
            title: "Fault Mapping",
            status: "accepted",
        }
        .render();

        assert!(message.starts_with("*PIT IAGI-GEOSEA 2026 - Notification*\n\nHalo *Siti*,\n\n"));
        assert!(message.contains("Submission ID: *SOIG-001*\nJudul: *Fault Mapping*\n\n🎉 *Selamat!* 🎉"));
        assert!(message.ends_with("Terima kasih,\nTim PIT IAGI-GEOSEA 2026"));
    }

    #[test]
    fn notes_only_for_acceptance_and_revisions() {
        assert!(important_note("accepted").is_some());
        assert!(important_note("revision_required_phase2").is_some());
        assert!(important_note("rejected").is_none());
    }
}
