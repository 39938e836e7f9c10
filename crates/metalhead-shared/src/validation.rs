//! Input rules shared by every form that talks to the backend.
//!
//! The backend enforces the same limits; checking them locally lets a form
//! reject bad input before a remote call is attempted.

use crate::constants::{
    MAX_DISPLAY_NAME_LENGTH, MAX_POST_LENGTH, MAX_REPORT_DETAILS_LENGTH, MIN_DISPLAY_NAME_LENGTH,
    REPORT_REASONS,
};
use crate::error::ValidationError;

fn is_display_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-'
}

/// Check a display name: 5-50 characters of `[A-Za-z0-9-]`.
///
/// Length is checked first; a name of the right length with a bad character
/// reports the first offending character.
pub fn validate_display_name(name: &str) -> Result<(), ValidationError> {
    let len = name.chars().count();
    if len < MIN_DISPLAY_NAME_LENGTH {
        return Err(ValidationError::DisplayNameTooShort);
    }
    if len > MAX_DISPLAY_NAME_LENGTH {
        return Err(ValidationError::DisplayNameTooLong);
    }
    if let Some(c) = name.chars().find(|c| !is_display_name_char(*c)) {
        return Err(ValidationError::DisplayNameInvalidCharacter(c));
    }
    Ok(())
}

pub fn display_name_rules() -> String {
    format!(
        "{MIN_DISPLAY_NAME_LENGTH}-{MAX_DISPLAY_NAME_LENGTH} characters; letters, numbers, and hyphens only"
    )
}

/// Check post content and return the text to submit (trimmed).
pub fn validate_post_content(content: &str) -> Result<&str, ValidationError> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::PostEmpty);
    }
    if content.chars().count() > MAX_POST_LENGTH {
        return Err(ValidationError::PostTooLong);
    }
    Ok(trimmed)
}

/// Build the reason string sent with a report: `"Reason"` or
/// `"Reason: details"`.
pub fn build_report_reason(reason: &str, details: &str) -> Result<String, ValidationError> {
    if reason.is_empty() {
        return Err(ValidationError::ReportReasonMissing);
    }
    if !REPORT_REASONS.contains(&reason) {
        return Err(ValidationError::ReportReasonUnknown(reason.to_string()));
    }
    if details.chars().count() > MAX_REPORT_DETAILS_LENGTH {
        return Err(ValidationError::ReportDetailsTooLong);
    }
    if details.is_empty() {
        Ok(reason.to_string())
    } else {
        Ok(format!("{reason}: {details}"))
    }
}

/// Split the comma-separated band field into trimmed, non-empty names.
pub fn parse_favorite_bands(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|b| !b.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_accepts_valid() {
        assert!(validate_display_name("Metal-Head42").is_ok());
        assert!(validate_display_name("abcde").is_ok());
        assert!(validate_display_name(&"a".repeat(50)).is_ok());
    }

    #[test]
    fn test_display_name_length_bounds() {
        assert_eq!(
            validate_display_name("abcd"),
            Err(ValidationError::DisplayNameTooShort)
        );
        assert_eq!(validate_display_name(""), Err(ValidationError::DisplayNameTooShort));
        assert_eq!(
            validate_display_name(&"a".repeat(51)),
            Err(ValidationError::DisplayNameTooLong)
        );
    }

    #[test]
    fn test_display_name_reports_first_bad_char() {
        assert_eq!(
            validate_display_name("metal head!"),
            Err(ValidationError::DisplayNameInvalidCharacter(' '))
        );
        assert_eq!(
            validate_display_name("headbanger_99"),
            Err(ValidationError::DisplayNameInvalidCharacter('_'))
        );
        assert_eq!(
            validate_display_name("mötley"),
            Err(ValidationError::DisplayNameInvalidCharacter('ö'))
        );
    }

    #[test]
    fn test_post_content_limits() {
        assert_eq!(validate_post_content(""), Err(ValidationError::PostEmpty));
        assert_eq!(validate_post_content("   \n"), Err(ValidationError::PostEmpty));
        let exact = "x".repeat(500);
        assert_eq!(validate_post_content(&exact), Ok(exact.as_str()));
        assert_eq!(
            validate_post_content(&"x".repeat(501)),
            Err(ValidationError::PostTooLong)
        );
        assert_eq!(validate_post_content("  riff  "), Ok("riff"));
    }

    #[test]
    fn test_report_reason() {
        assert_eq!(build_report_reason("Spam", ""), Ok("Spam".to_string()));
        assert_eq!(
            build_report_reason("Harassment", "keeps posting my address"),
            Ok("Harassment: keeps posting my address".to_string())
        );
        assert_eq!(
            build_report_reason("", "details"),
            Err(ValidationError::ReportReasonMissing)
        );
        assert_eq!(
            build_report_reason("Other", &"d".repeat(151)),
            Err(ValidationError::ReportDetailsTooLong)
        );
        assert!(matches!(
            build_report_reason("Boring", ""),
            Err(ValidationError::ReportReasonUnknown(_))
        ));
    }

    #[test]
    fn test_parse_bands() {
        assert_eq!(
            parse_favorite_bands(" Metallica, ,Slayer ,,  Megadeth"),
            vec!["Metallica", "Slayer", "Megadeth"]
        );
        assert!(parse_favorite_bands(" , ").is_empty());
    }
}
