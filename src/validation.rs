use regex::Regex;
use std::sync::OnceLock;

use crate::error::ValidationErrors;

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern compiles")
    })
}

pub fn is_valid_email(value: &str) -> bool {
    email_pattern().is_match(value.trim())
}

fn attribute(field: &str) -> String {
    field.rsplit('.').next().unwrap_or(field).replace('_', " ")
}

/// Records a message when `value` is blank or longer than `max` characters.
pub fn required(errors: &mut ValidationErrors, field: &str, value: &str, max: Option<usize>) {
    if value.trim().is_empty() {
        errors.add(field, format!("The {} field is required.", attribute(field)));
        return;
    }
    max_length(errors, field, value, max);
}

pub fn optional(errors: &mut ValidationErrors, field: &str, value: Option<&str>, max: usize) {
    if let Some(value) = value {
        max_length(errors, field, value, Some(max));
    }
}

pub fn email(errors: &mut ValidationErrors, field: &str, value: &str) {
    required(errors, field, value, Some(255));
    if !value.trim().is_empty() && !is_valid_email(value) {
        errors.add(
            field,
            format!("The {} must be a valid email address.", attribute(field)),
        );
    }
}

pub fn one_of(errors: &mut ValidationErrors, field: &str, value: &str, allowed: &[&str]) {
    if !allowed.contains(&value) {
        errors.add(field, format!("The selected {} is invalid.", attribute(field)));
    }
}

fn max_length(errors: &mut ValidationErrors, field: &str, value: &str, max: Option<usize>) {
    if let Some(max) = max {
        if value.chars().count() > max {
            errors.add(
                field,
                format!(
                    "The {} may not be greater than {} characters.",
                    attribute(field),
                    max
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emails() {
        assert!(is_valid_email("siti@itb.ac.id"));
        assert!(is_valid_email(" a.b+c@example.org "));
        assert!(!is_valid_email("siti@localhost"));
        assert!(!is_valid_email("no at sign"));
    }

    #[test]
    fn required_and_length_messages() {
        let mut errors = ValidationErrors::new();
        required(&mut errors, "paper_sub_theme", "  ", Some(255));
        required(&mut errors, "hero_text.theme_label", &"x".repeat(256), Some(255));
        optional(&mut errors, "paper_theme", None, 255);
        one_of(&mut errors, "participant_category", "alien", &["student"]);

        let fields = errors.fields();
        assert_eq!(fields["paper_sub_theme"][0], "The paper sub theme field is required.");
        assert_eq!(
            fields["hero_text.theme_label"][0],
            "The theme label may not be greater than 255 characters."
        );
        assert!(!fields.contains_key("paper_theme"));
        assert_eq!(
            fields["participant_category"][0],
            "The selected participant category is invalid."
        );
    }
}
