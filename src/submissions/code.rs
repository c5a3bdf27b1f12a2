use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum ParticipantCategory {
    Student,
    Professional,
    International,
}

impl ParticipantCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParticipantCategory::Student => "student",
            ParticipantCategory::Professional => "professional",
            ParticipantCategory::International => "international",
        }
    }

    fn code(&self) -> char {
        match self {
            ParticipantCategory::Student => 'S',
            ParticipantCategory::Professional => 'P',
            ParticipantCategory::International => 'I',
        }
    }

    /// Maps the registration category ("International Delegate", ...) onto a submission category.
    pub fn from_registration(category: &str) -> Option<Self> {
        match category.trim() {
            "Student" => Some(ParticipantCategory::Student),
            "Professional" => Some(ParticipantCategory::Professional),
            "International Delegate" => Some(ParticipantCategory::International),
            _ => None,
        }
    }
}

impl FromStr for ParticipantCategory {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "student" => Ok(ParticipantCategory::Student),
            "professional" => Ok(ParticipantCategory::Professional),
            "international" => Ok(ParticipantCategory::International),
            other => Err(format!("unknown participant category '{}'", other)),
        }
    }
}

/// Code prefix such as `SOIG`: participant letter, `O` for oral or `P` for poster, then `IG`.
pub fn code_prefix(category: ParticipantCategory, presentation: &str) -> String {
    let presentation_code = if presentation.trim_start().starts_with("Oral") {
        'O'
    } else {
        'P'
    };
    format!("{}{}IG", category.code(), presentation_code)
}

/// Next code in the sequence for `prefix`, given the latest code already issued with it.
/// A previous code without a usable number restarts the sequence.
pub fn next_code(prefix: &str, last_code: Option<&str>) -> String {
    let next = last_code
        .and_then(|code| code.rsplit('-').next())
        .and_then(|digits| digits.parse::<u64>().ok())
        .and_then(|n| n.checked_add(1))
        .unwrap_or(1);
    format!("{}-{:03}", prefix, next)
}
