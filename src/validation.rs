// Validation utilities module
// Provides custom validation functions for domain-specific rules

use once_cell::sync::Lazy;
use regex::Regex;
use validator::ValidationError;

static HAS_LETTER: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Za-z]").unwrap());
static HAS_DIGIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]").unwrap());

/// Minimum accepted password length
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Maximum accepted password length (bounds hashing cost per request)
pub const MAX_PASSWORD_LENGTH: usize = 128;

/// Validates password strength: 8-128 characters with at least one letter and one digit
pub fn validate_password_strength(password: &str) -> Result<(), ValidationError> {
    let length = password.chars().count();
    if length < MIN_PASSWORD_LENGTH {
        return Err(message(
            "password_too_short",
            "Password must be at least 8 characters",
        ));
    }
    if length > MAX_PASSWORD_LENGTH {
        return Err(message(
            "password_too_long",
            "Password must not exceed 128 characters",
        ));
    }
    if !HAS_LETTER.is_match(password) || !HAS_DIGIT.is_match(password) {
        return Err(message(
            "password_too_weak",
            "Password must contain at least one letter and one digit",
        ));
    }
    Ok(())
}

/// Validates that min does not exceed max when both are present
pub fn validate_salary_range(min: Option<i64>, max: Option<i64>) -> Result<(), ValidationError> {
    match (min, max) {
        (Some(min), Some(max)) if min > max => Err(message(
            "salary_range_inverted",
            "Minimum salary must not exceed maximum salary",
        )),
        _ => Ok(()),
    }
}

fn message(code: &'static str, text: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(text.into());
    error
}
