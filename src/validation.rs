//! Request field validation.
//!
//! Each function checks one field and returns `AppError::InvalidRequest`
//! with a message the frontend can show as-is. Functions that normalise
//! their input (trimming, lowercasing) return the normalised value.

use chrono::{DateTime, Utc};

use crate::error::AppError;

pub const MAX_NAME_LEN: usize = 100;
pub const MAX_EMAIL_LEN: usize = 254;
pub const MIN_PASSWORD_LEN: usize = 8;
pub const MAX_PASSWORD_LEN: usize = 128;
pub const MIN_TITLE_LEN: usize = 3;
pub const MAX_TITLE_LEN: usize = 200;
pub const MAX_DESCRIPTION_LEN: usize = 10_000;
pub const MAX_CATEGORY_LEN: usize = 50;
pub const MAX_MESSAGE_LEN: usize = 500;
pub const MAX_BIO_LEN: usize = 1_000;
pub const MAX_URL_LEN: usize = 2048;
pub const MAX_IDEMPOTENCY_KEY_LEN: usize = 255;
/// Ceiling for a single donation and for a campaign goal (1 billion units).
pub const MAX_AMOUNT_CENTS: i64 = 100_000_000_000;

fn invalid(msg: impl Into<String>) -> AppError {
    AppError::InvalidRequest(msg.into())
}

/// Display name: trimmed, 1..=100 characters.
pub fn name(value: &str) -> Result<String, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(invalid("Name must not be empty"));
    }
    if trimmed.chars().count() > MAX_NAME_LEN {
        return Err(invalid(format!(
            "Name must be at most {MAX_NAME_LEN} characters"
        )));
    }
    Ok(trimmed.to_string())
}

/// Email: trimmed and lowercased, shaped like `local@domain.tld`.
pub fn email(value: &str) -> Result<String, AppError> {
    let normalized = value.trim().to_lowercase();
    if normalized.len() > MAX_EMAIL_LEN {
        return Err(invalid("Email is too long"));
    }

    let well_formed = match normalized.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && !normalized.contains(char::is_whitespace)
                && domain.contains('.')
                && domain.split('.').all(|label| !label.is_empty())
        }
        None => false,
    };

    if !well_formed {
        return Err(invalid("Email address is not valid"));
    }
    Ok(normalized)
}

/// Password length only; strength rules are left to the frontend.
pub fn password(value: &str) -> Result<(), AppError> {
    let len = value.chars().count();
    if len < MIN_PASSWORD_LEN {
        return Err(invalid(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    if len > MAX_PASSWORD_LEN {
        return Err(invalid(format!(
            "Password must be at most {MAX_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// Absolute http(s) URL for images and avatars.
pub fn http_url(field: &str, value: &str) -> Result<String, AppError> {
    let trimmed = value.trim();
    if trimmed.len() > MAX_URL_LEN {
        return Err(invalid(format!(
            "{field} exceeds {MAX_URL_LEN} characters"
        )));
    }

    let parsed =
        url::Url::parse(trimmed).map_err(|_| invalid(format!("{field} is not a valid URL")))?;

    match parsed.scheme() {
        "http" | "https" => Ok(trimmed.to_string()),
        _ => Err(invalid(format!("{field} must use http or https"))),
    }
}

pub fn bio(value: &str) -> Result<String, AppError> {
    let trimmed = value.trim();
    if trimmed.chars().count() > MAX_BIO_LEN {
        return Err(invalid(format!("Bio must be at most {MAX_BIO_LEN} characters")));
    }
    Ok(trimmed.to_string())
}

/// Campaign title: trimmed, 3..=200 characters.
pub fn title(value: &str) -> Result<String, AppError> {
    let trimmed = value.trim();
    let len = trimmed.chars().count();
    if !(MIN_TITLE_LEN..=MAX_TITLE_LEN).contains(&len) {
        return Err(invalid(format!(
            "Title must be between {MIN_TITLE_LEN} and {MAX_TITLE_LEN} characters"
        )));
    }
    Ok(trimmed.to_string())
}

pub fn description(value: &str) -> Result<String, AppError> {
    if value.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(invalid(format!(
            "Description must be at most {MAX_DESCRIPTION_LEN} characters"
        )));
    }
    Ok(value.to_string())
}

/// Category tag: trimmed, lowercased, non-empty, at most 50 characters.
pub fn category(value: &str) -> Result<String, AppError> {
    let normalized = value.trim().to_lowercase();
    if normalized.is_empty() {
        return Err(invalid("Category must not be empty"));
    }
    if normalized.chars().count() > MAX_CATEGORY_LEN {
        return Err(invalid(format!(
            "Category must be at most {MAX_CATEGORY_LEN} characters"
        )));
    }
    Ok(normalized)
}

pub fn goal(goal_cents: i64) -> Result<(), AppError> {
    if goal_cents <= 0 {
        return Err(invalid("Goal must be positive"));
    }
    if goal_cents > MAX_AMOUNT_CENTS {
        return Err(invalid(format!(
            "Goal must be at most {MAX_AMOUNT_CENTS} cents"
        )));
    }
    Ok(())
}

/// Deadline, when given, must lie in the future.
pub fn deadline(value: DateTime<Utc>, now: DateTime<Utc>) -> Result<(), AppError> {
    if value <= now {
        return Err(invalid("Deadline must be in the future"));
    }
    Ok(())
}

pub fn amount(amount_cents: i64) -> Result<(), AppError> {
    if amount_cents <= 0 {
        return Err(invalid("Amount must be positive"));
    }
    if amount_cents > MAX_AMOUNT_CENTS {
        return Err(invalid(format!(
            "Amount must be at most {MAX_AMOUNT_CENTS} cents"
        )));
    }
    Ok(())
}

/// Donation message: trimmed, empty becomes `None`.
pub fn message(value: Option<String>) -> Result<Option<String>, AppError> {
    let Some(value) = value else {
        return Ok(None);
    };
    let trimmed = value.trim();
    if trimmed.chars().count() > MAX_MESSAGE_LEN {
        return Err(invalid(format!(
            "Message must be at most {MAX_MESSAGE_LEN} characters"
        )));
    }
    Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
}

pub fn idempotency_key(value: Option<&str>) -> Result<(), AppError> {
    match value {
        Some(key) if key.is_empty() || key.len() > MAX_IDEMPOTENCY_KEY_LEN => Err(invalid(
            format!("Idempotency key must be 1..={MAX_IDEMPOTENCY_KEY_LEN} bytes"),
        )),
        _ => Ok(()),
    }
}
