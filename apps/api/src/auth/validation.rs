use email_address::EmailAddress;

use crate::errors::AppError;

pub const MIN_PASSWORD_LEN: usize = 8;

/// Trimmed, non-empty value or a validation error naming the field.
pub fn required(field: &str, value: &str) -> Result<String, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation(format!("{field} cannot be empty")));
    }
    Ok(trimmed.to_string())
}

/// Trimmed, lowercased, well-formed email address. Stored and looked-up
/// emails are always in this form.
pub fn email(value: &str) -> Result<String, AppError> {
    let normalized = required("email", value)?.to_lowercase();
    if !EmailAddress::is_valid(&normalized) {
        return Err(AppError::Validation("Invalid email format".to_string()));
    }
    Ok(normalized)
}

/// Absent, blank or whitespace-only → `None`.
pub fn optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

pub fn password(value: &str) -> Result<(), AppError> {
    if value.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}
