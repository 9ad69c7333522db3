//! Common validation utilities.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use validator::ValidationError;

lazy_static::lazy_static! {
    static ref SLUG_REGEX: regex::Regex =
        regex::Regex::new(r"^[a-z0-9]+(?:[-_][a-z0-9]+)*$").unwrap();
    static ref EMAIL_REGEX: regex::Regex =
        regex::Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
}

/// Validates that a slug is lowercase alphanumeric words joined by `-` or `_`.
pub fn validate_slug(slug: &str) -> Result<(), ValidationError> {
    if SLUG_REGEX.is_match(slug) {
        Ok(())
    } else {
        let mut err = ValidationError::new("slug_format");
        err.message =
            Some("Slug must contain lowercase letters, digits, '-' or '_' only".into());
        Err(err)
    }
}

/// Returns true if the value looks like a single email address.
pub fn is_email_address(value: &str) -> bool {
    EMAIL_REGEX.is_match(value.trim())
}

/// Validates a comma separated list of email addresses (empty is allowed).
pub fn validate_email_list(value: &str) -> Result<(), ValidationError> {
    let invalid = value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .any(|s| !is_email_address(s));

    if invalid {
        let mut err = ValidationError::new("email_list");
        err.message = Some("Must be a comma separated list of email addresses".into());
        Err(err)
    } else {
        Ok(())
    }
}

/// Returns true if the value is an absolute http(s) URL.
pub fn is_http_url(value: &str) -> bool {
    let value = value.trim();
    let rest = value
        .strip_prefix("https://")
        .or_else(|| value.strip_prefix("http://"));
    matches!(rest, Some(host) if !host.is_empty() && !host.contains(char::is_whitespace))
}

/// Returns true if the value parses as an ISO-8601 date (`YYYY-MM-DD`).
pub fn is_iso_date(value: &str) -> bool {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").is_ok()
}

/// Returns true if the value parses as an ISO-8601 date-time, with or without offset.
pub fn is_iso_datetime(value: &str) -> bool {
    let value = value.trim();
    DateTime::parse_from_rfc3339(value).is_ok()
        || NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S").is_ok()
        || NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M").is_ok()
        || NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S").is_ok()
}

/// Validates that an expiry date, when both are set, is after the publish date.
pub fn validate_publish_window(
    publish_date: Option<DateTime<Utc>>,
    expiry_date: Option<DateTime<Utc>>,
) -> Result<(), ValidationError> {
    match (publish_date, expiry_date) {
        (Some(publish), Some(expiry)) if expiry <= publish => {
            let mut err = ValidationError::new("publish_window");
            err.message = Some("Expiry date must be after the publish date".into());
            Err(err)
        }
        _ => Ok(()),
    }
}
