//! Outbound participant notifications over WhatsApp and email.

pub mod mail;
pub mod messages;
mod notifier;
pub mod whatsapp;

pub use mail::{MailChannel, MailError, OutgoingMail, SmtpMailer};
pub use notifier::{NotificationReport, StatusNotifier};
pub use whatsapp::{normalize_phone, MessageChannel, WhatsAppClient};

#[cfg(test)]
pub(crate) use notifier::testing;
