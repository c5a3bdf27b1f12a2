use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::Serialize;

use crate::config::parse_flag;

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Parses a stored date setting. Values without an offset are read in `offset`.
pub fn parse_setting_date(value: &str, offset: FixedOffset) -> Option<DateTime<FixedOffset>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed);
    }

    let naive = NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })?;

    offset.from_local_datetime(&naive).single()
}

/// Indonesian zone abbreviation for the common offsets, `UTC+H` otherwise.
pub fn zone_label(offset: FixedOffset) -> String {
    let seconds = offset.local_minus_utc();
    match seconds / 3600 {
        7 if seconds % 3600 == 0 => "WIB".to_string(),
        8 if seconds % 3600 == 0 => "WITA".to_string(),
        9 if seconds % 3600 == 0 => "WIT".to_string(),
        _ => format!("UTC{}", offset),
    }
}

/// Formats `at` in `offset` followed by the zone label, e.g. `01 Mar 2026, 08:00 WIB`.
pub fn format_local<Tz: TimeZone>(at: DateTime<Tz>, offset: FixedOffset, format: &str) -> String {
    format!(
        "{} {}",
        at.with_timezone(&offset).format(format),
        zone_label(offset)
    )
}

/// The submission window as configured by the admin.
#[derive(Debug, Clone)]
pub struct SubmissionWindow {
    pub enabled: bool,
    pub start: Option<DateTime<FixedOffset>>,
    pub end: Option<DateTime<FixedOffset>>,
    raw_start: Option<String>,
    raw_end: Option<String>,
    offset: FixedOffset,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WindowStatus {
    pub open: bool,
    pub message: String,
    #[serde(rename = "startDate", skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(rename = "endDate", skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
}

impl SubmissionWindow {
    /// Builds the window from raw setting values. A missing enabled flag means
    /// enabled; unparsable dates are ignored.
    pub fn from_settings(
        enabled: Option<&str>,
        start: Option<&str>,
        end: Option<&str>,
        offset: FixedOffset,
    ) -> Self {
        let clean = |value: Option<&str>| {
            value
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        let raw_start = clean(start);
        let raw_end = clean(end);

        Self {
            enabled: enabled.map(parse_flag).unwrap_or(true),
            start: raw_start.as_deref().and_then(|v| parse_setting_date(v, offset)),
            end: raw_end.as_deref().and_then(|v| parse_setting_date(v, offset)),
            raw_start,
            raw_end,
            offset,
        }
    }

    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        self.status(now).open
    }

    pub fn status(&self, now: DateTime<Utc>) -> WindowStatus {
        if !self.enabled {
            return WindowStatus {
                open: false,
                message: "Submission is currently disabled by administrator.".to_string(),
                start_date: None,
                end_date: None,
            };
        }

        let closed = |message: String| WindowStatus {
            open: false,
            message,
            start_date: self.raw_start.clone(),
            end_date: self.raw_end.clone(),
        };

        if let Some(start) = self.start {
            if now < start {
                return closed(format!("Submission will open on {}", self.display(start)));
            }
        }

        if let Some(end) = self.end {
            if now > end {
                return closed(format!("Submission deadline has passed on {}", self.display(end)));
            }
        }

        WindowStatus {
            open: true,
            message: match self.end {
                Some(end) => format!("Deadline: {}", self.display(end)),
                None => "Submission is open".to_string(),
            },
            start_date: self.raw_start.clone(),
            end_date: self.raw_end.clone(),
        }
    }

    fn display(&self, at: DateTime<FixedOffset>) -> String {
        format_local(at, self.offset, "%d %b %Y, %H:%M")
    }
}
