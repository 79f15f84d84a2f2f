use chrono::{DateTime, NaiveDate};

use engine::EventData;

use super::error::FieldErrors;

pub fn is_valid_text(value: &str, min_length: usize) -> bool {
    value.trim().chars().count() >= min_length
}

/// Accepts RFC 3339 timestamps and plain `YYYY-MM-DD` dates.
pub fn is_valid_date(value: &str) -> bool {
    let value = value.trim();

    !value.is_empty()
        && (DateTime::parse_from_rfc3339(value).is_ok()
            || NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok())
}

pub fn is_valid_image_url(value: &str) -> bool {
    value.starts_with("http")
}

pub fn is_valid_email(value: &str) -> bool {
    value.contains('@')
}

pub fn validate_event(data: &EventData) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();

    if !is_valid_text(&data.title, 1) {
        errors.insert("title", "Invalid title.".to_owned());
    }

    if !is_valid_text(&data.description, 1) {
        errors.insert("description", "Invalid description.".to_owned());
    }

    if !is_valid_date(&data.date) {
        errors.insert("date", "Invalid date.".to_owned());
    }

    if !is_valid_image_url(&data.image) {
        errors.insert("image", "Invalid image.".to_owned());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

pub fn validate_signup(email: &str, password: &str) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();

    if !is_valid_email(email) {
        errors.insert("email", "Invalid email.".to_owned());
    }

    if !is_valid_text(password, 6) {
        errors.insert(
            "password",
            "Invalid password. Must be at least 6 characters long.".to_owned(),
        );
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
