use chrono::FixedOffset;
use serde::Serialize;

use super::window::{parse_setting_date, SubmissionWindow};
use crate::db::{settings, DbPool};
use crate::error::{AppResult, ValidationErrors};

pub const SUBMISSION_ENABLED: &str = "submission_enabled";
pub const SUBMISSION_START: &str = "submission_deadline_start";
pub const SUBMISSION_END: &str = "submission_deadline_end";

/// Operational key/value settings.
#[derive(Clone)]
pub struct SettingsStore {
    pool: DbPool,
    offset: FixedOffset,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionSettings {
    pub submission_deadline_start: Option<String>,
    pub submission_deadline_end: Option<String>,
    pub submission_enabled: String,
}

impl SettingsStore {
    pub fn new(pool: DbPool, offset: FixedOffset) -> Self {
        Self { pool, offset }
    }

    pub async fn get(&self, key: &str, default: Option<&str>) -> AppResult<Option<String>> {
        let value = settings::get_value(&self.pool, key).await?;
        Ok(value.or_else(|| default.map(str::to_string)))
    }

    pub async fn set(&self, key: &str, value: Option<&str>) -> AppResult<()> {
        settings::set_value(&self.pool, key, value).await?;
        tracing::info!(key, "setting updated");
        Ok(())
    }

    pub async fn submission_window(&self) -> AppResult<SubmissionWindow> {
        let enabled = self.get(SUBMISSION_ENABLED, Some("1")).await?;
        let start = self.get(SUBMISSION_START, None).await?;
        let end = self.get(SUBMISSION_END, None).await?;
        Ok(SubmissionWindow::from_settings(
            enabled.as_deref(),
            start.as_deref(),
            end.as_deref(),
            self.offset,
        ))
    }

    pub async fn submission_settings(&self) -> AppResult<SubmissionSettings> {
        Ok(SubmissionSettings {
            submission_deadline_start: self.get(SUBMISSION_START, None).await?,
            submission_deadline_end: self.get(SUBMISSION_END, None).await?,
            submission_enabled: self
                .get(SUBMISSION_ENABLED, Some("1"))
                .await?
                .unwrap_or_else(|| "1".to_string()),
        })
    }

    /// Stores a new window. Dates must parse and the end may not precede the start.
    pub async fn update_submission_window(
        &self,
        enabled: bool,
        start: Option<&str>,
        end: Option<&str>,
    ) -> AppResult<()> {
        let start = start.map(str::trim).filter(|v| !v.is_empty());
        let end = end.map(str::trim).filter(|v| !v.is_empty());

        let mut errors = ValidationErrors::new();
        let parsed_start = parse_field(&mut errors, SUBMISSION_START, start, self.offset);
        let parsed_end = parse_field(&mut errors, SUBMISSION_END, end, self.offset);
        if let (Some(start), Some(end)) = (parsed_start, parsed_end) {
            if end < start {
                errors.add(
                    SUBMISSION_END,
                    "The submission deadline end must be a date after or equal to the start.",
                );
            }
        }
        errors.into_result()?;

        self.set(SUBMISSION_START, start).await?;
        self.set(SUBMISSION_END, end).await?;
        self.set(SUBMISSION_ENABLED, Some(if enabled { "1" } else { "0" }))
            .await?;
        Ok(())
    }
}

fn parse_field(
    errors: &mut ValidationErrors,
    field: &str,
    value: Option<&str>,
    offset: FixedOffset,
) -> Option<chrono::DateTime<FixedOffset>> {
    let value = value?;
    let parsed = parse_setting_date(value, offset);
    if parsed.is_none() {
        errors.add(field, format!("The {} is not a valid date.", field.replace('_', " ")));
    }
    parsed
}
