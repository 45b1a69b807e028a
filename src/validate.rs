//! Request field validation shared by the services.

use chrono::{DateTime, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{AppError, AppResult};

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

static MOBILE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^01[0-9]-\d{4}-\d{4}$").expect("valid mobile regex"));

pub fn email(value: &str) -> AppResult<()> {
    if value.chars().count() > 100 || !EMAIL_RE.is_match(value) {
        return Err(AppError::bad_request(format!("Invalid email address: {}", value)));
    }
    Ok(())
}

/// Account phone numbers use the dashed mobile format `010-1234-5678`.
pub fn mobile_phone(value: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::bad_request("Phone number is required"));
    }
    if !MOBILE_RE.is_match(value) {
        return Err(AppError::bad_request(
            "Invalid phone number format (e.g. 010-1234-5678)",
        ));
    }
    Ok(())
}

pub fn password(value: &str) -> AppResult<()> {
    if value.chars().count() < 6 {
        return Err(AppError::bad_request("Password must be at least 6 characters"));
    }
    Ok(())
}

/// Character length of `value` must fall in `min..=max`.
pub fn length(field: &str, value: &str, min: usize, max: usize) -> AppResult<()> {
    let len = value.chars().count();
    if len < min {
        return Err(AppError::bad_request(format!(
            "{} must be at least {} characters",
            field, min
        )));
    }
    if len > max {
        return Err(AppError::bad_request(format!(
            "{} must be at most {} characters",
            field, max
        )));
    }
    Ok(())
}

pub fn not_blank(field: &str, value: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::bad_request(format!("{} is required", field)));
    }
    Ok(())
}

pub fn non_negative(field: &str, value: i64) -> AppResult<()> {
    if value < 0 {
        return Err(AppError::bad_request(format!("{} must be 0 or greater", field)));
    }
    Ok(())
}

/// Normalized image coordinate in `[0.0, 1.0]`.
pub fn unit_interval(field: &str, value: f64) -> AppResult<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(AppError::bad_request(format!(
            "{} must be between 0.0 and 1.0",
            field
        )));
    }
    Ok(())
}

/// Strip everything but digits and require 10-11 of them.
pub fn guest_phone(guest_name: &str, raw: &str) -> AppResult<String> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() < 10 || digits.len() > 11 {
        return Err(AppError::bad_request(format!(
            "Phone number of guest \"{}\" must have 10-11 digits (got {})",
            guest_name,
            digits.len()
        )));
    }
    Ok(digits)
}

/// Parse an RFC 3339 timestamp or a bare `YYYY-MM-DD` date (midnight UTC).
pub fn date(field: &str, value: &str) -> AppResult<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(day) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        if let Some(midnight) = day.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc());
        }
    }
    Err(AppError::bad_request(format!("{} must be a valid date", field)))
}

pub fn optional_date(field: &str, value: Option<&str>) -> AppResult<Option<DateTime<Utc>>> {
    value.map(|v| date(field, v)).transpose()
}
