//! Input rules shared by the server and the client library.
//!
//! The client runs these before sending anything, so a submission that
//! fails here never reaches the network. The server runs them again on
//! receipt.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::models::{BookingDetails, BookingKind, BookingSubmission, Contact};

pub const MAX_GUESTS: i64 = 1000;
pub const PHONE_DIGITS: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ValidationError(pub String);

impl ValidationError {
    fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// A submission that passed every rule for its kind.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidBooking {
    pub date: NaiveDate,
    pub contact: Contact,
    pub documents: Vec<String>,
    pub details: BookingDetails,
}

/// Accepts `YYYY-MM-DD` or a full ISO-8601 timestamp and keeps the date part.
pub fn parse_date(raw: &str) -> Result<NaiveDate, ValidationError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ValidationError::new("Date is required"));
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.date_naive());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(dt.date());
    }
    Err(ValidationError::new(format!("Invalid date: {raw}")))
}

/// A bookable date: parseable and not before `today`.
pub fn validate_booking_date(
    raw: &str,
    today: NaiveDate,
) -> Result<NaiveDate, ValidationError> {
    let date = parse_date(raw)?;
    if date < today {
        return Err(ValidationError::new("Date cannot be in the past"));
    }
    Ok(date)
}

pub fn validate_guest_count(count: Option<i64>) -> Result<u32, ValidationError> {
    match count {
        None => Err(ValidationError::new("Guest count is required")),
        Some(n) if n < 1 => Err(ValidationError::new("Guest count must be at least 1")),
        Some(n) if n > MAX_GUESTS => Err(ValidationError::new(format!(
            "Guest count cannot exceed {MAX_GUESTS}"
        ))),
        Some(n) => Ok(n as u32),
    }
}

/// Returns the phone number reduced to its digits.
pub fn validate_phone(phone: &str) -> Result<String, ValidationError> {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() != PHONE_DIGITS {
        return Err(ValidationError::new(format!(
            "Phone number must be {PHONE_DIGITS} digits"
        )));
    }
    Ok(digits)
}

pub fn validate_email(email: Option<&str>) -> Result<Option<String>, ValidationError> {
    let Some(email) = email.map(str::trim).filter(|e| !e.is_empty()) else {
        return Ok(None);
    };
    let valid = email
        .split_once('@')
        .map(|(local, domain)| !local.is_empty() && domain.contains('.'))
        .unwrap_or(false);
    if !valid {
        return Err(ValidationError::new("Invalid email address"));
    }
    Ok(Some(email.to_string()))
}

pub fn validate_percentage(percentage: Option<f32>) -> Result<f32, ValidationError> {
    match percentage {
        None => Err(ValidationError::new("Percentage is required")),
        Some(p) if !(0.0..=100.0).contains(&p) => Err(ValidationError::new(
            "Percentage must be between 0 and 100",
        )),
        Some(p) => Ok(p),
    }
}

pub fn validate_reason(reason: &str) -> Result<String, ValidationError> {
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(ValidationError::new("Rejection reason is required"));
    }
    Ok(reason.to_string())
}

pub fn required(value: Option<&str>, field: &str) -> Result<String, ValidationError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ValidationError::new(format!("{field} is required")))
}

pub fn validate_contact(
    name: &str,
    phone: &str,
    email: Option<&str>,
) -> Result<Contact, ValidationError> {
    Ok(Contact {
        name: required(Some(name), "Contact name")?,
        phone: validate_phone(phone)?,
        email: validate_email(email)?,
    })
}

pub fn validate_submission(
    kind: BookingKind,
    sub: &BookingSubmission,
    today: NaiveDate,
) -> Result<ValidBooking, ValidationError> {
    let date = validate_booking_date(&sub.date, today)?;

    let contact = validate_contact(
        &sub.contact_name,
        &sub.contact_phone,
        sub.contact_email.as_deref(),
    )?;

    let details = match kind {
        BookingKind::General => BookingDetails::General {
            event_type: required(sub.event_type.as_deref(), "Event type")?,
            guest_count: validate_guest_count(sub.guest_count)?,
        },
        BookingKind::GroupWedding => BookingDetails::GroupWedding {
            bride_name: required(sub.bride_name.as_deref(), "Bride name")?,
            groom_name: required(sub.groom_name.as_deref(), "Groom name")?,
            guest_count: validate_guest_count(sub.guest_count)?,
        },
        BookingKind::StudentAward => BookingDetails::StudentAward {
            student_name: required(sub.student_name.as_deref(), "Student name")?,
            school_name: required(sub.school_name.as_deref(), "School name")?,
            standard: required(sub.standard.as_deref(), "Standard")?,
            percentage: validate_percentage(sub.percentage)?,
        },
    };

    Ok(ValidBooking {
        date,
        contact,
        documents: sub
            .documents
            .iter()
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty())
            .collect(),
        details,
    })
}
