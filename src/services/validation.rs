//! Input validation
//!
//! Rules applied by the services before anything reaches a repository.
//! Every check returns the cleaned value so callers store exactly what was
//! validated.

use once_cell::sync::Lazy;
use regex::Regex;

use super::error::ValidationError;
use crate::models::{MAX_PRICE, MIN_PRICE};

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is valid")
});

pub const PASSWORD_MIN_LEN: usize = 6;
pub const PASSWORD_MAX_LEN: usize = 20;

/// Trimmed, non-empty text
pub fn required(field: &str, value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::new(format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}

/// Trimmed optional text; blank becomes `None`
pub fn optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

pub fn email(value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if !EMAIL_RE.is_match(trimmed) {
        return Err(ValidationError::new("Email address is not valid"));
    }
    Ok(trimmed.to_string())
}

/// 6 to 20 characters with an uppercase letter, a lowercase letter and a digit
pub fn password(value: &str) -> Result<(), ValidationError> {
    let len = value.chars().count();
    if !(PASSWORD_MIN_LEN..=PASSWORD_MAX_LEN).contains(&len) {
        return Err(ValidationError::new(format!(
            "Password must be between {} and {} characters",
            PASSWORD_MIN_LEN, PASSWORD_MAX_LEN
        )));
    }
    let has_upper = value.chars().any(|c| c.is_uppercase());
    let has_lower = value.chars().any(|c| c.is_lowercase());
    let has_digit = value.chars().any(|c| c.is_ascii_digit());
    if !(has_upper && has_lower && has_digit) {
        return Err(ValidationError::new(
            "Password needs an uppercase letter, a lowercase letter and a digit",
        ));
    }
    Ok(())
}

pub fn price(value: i64) -> Result<i64, ValidationError> {
    if !(MIN_PRICE..=MAX_PRICE).contains(&value) {
        return Err(ValidationError::new(format!(
            "Price must be between {} and {}",
            MIN_PRICE, MAX_PRICE
        )));
    }
    Ok(value)
}

pub fn stock(value: i64) -> Result<i64, ValidationError> {
    if value < 0 {
        return Err(ValidationError::new("Stock cannot be negative"));
    }
    Ok(value)
}
