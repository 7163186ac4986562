//! Booking lifecycle.
//!
//! ```text
//! Pending --approve--> Approved --confirm-payment/confirm-booking--> Booked
//! Pending --reject--> Rejected
//! Approved --reject--> Rejected
//! ```
//!
//! Group weddings end in `Confirmed` and student awards in `Awarded`
//! instead of `Booked`. Every precondition is checked here; a refused
//! transition leaves the stored booking untouched.

use chrono::{NaiveDate, NaiveDateTime, Utc};
use rusqlite::Connection;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Booking, BookingDetails, BookingKind, BookingStatus, BookingUpdate};
use crate::validation::{self, ValidBooking, ValidationError};

/// A rejection reason that is known to be non-blank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectionReason(String);

impl RejectionReason {
    pub fn new(raw: &str) -> Result<Self, ValidationError> {
        validation::validate_reason(raw).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Approve,
    Reject { reason: RejectionReason },
    ConfirmPayment,
    ConfirmBooking,
}

impl Transition {
    pub fn name(&self) -> &'static str {
        match self {
            Transition::Approve => "approve",
            Transition::Reject { .. } => "reject",
            Transition::ConfirmPayment => "confirm payment for",
            Transition::ConfirmBooking => "confirm",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("cannot {action} a booking that is {from}")]
    Illegal {
        action: &'static str,
        from: &'static str,
    },
    #[error("payment is already confirmed")]
    PaymentAlreadyConfirmed,
}

pub fn apply(
    booking: &mut Booking,
    transition: Transition,
    now: NaiveDateTime,
) -> Result<(), TransitionError> {
    let kind = booking.kind();

    match (transition, booking.status) {
        (Transition::Approve, BookingStatus::Pending) => {
            booking.status = BookingStatus::Approved;
        }
        (Transition::Reject { reason }, BookingStatus::Pending | BookingStatus::Approved) => {
            booking.status = BookingStatus::Rejected;
            booking.rejection_reason = Some(reason.0);
        }
        (Transition::ConfirmPayment, BookingStatus::Approved) => {
            if booking.payment_confirmed {
                return Err(TransitionError::PaymentAlreadyConfirmed);
            }
            booking.payment_confirmed = true;
            if kind == BookingKind::GroupWedding {
                booking.status = BookingStatus::Confirmed;
            }
        }
        (Transition::ConfirmBooking, BookingStatus::Approved) => {
            booking.status = kind.terminal_status();
            if kind != BookingKind::StudentAward {
                booking.payment_confirmed = true;
            }
        }
        (transition, from) => {
            return Err(TransitionError::Illegal {
                action: transition.name(),
                from: from.as_str(),
            });
        }
    }

    booking.updated_at = now;
    Ok(())
}

/// Loads a booking and checks it belongs to the route's kind.
pub fn load(conn: &Connection, kind: BookingKind, id: &str) -> Result<Booking, AppError> {
    queries::get_booking_by_id(conn, id)?
        .filter(|b| b.kind() == kind)
        .ok_or_else(|| AppError::NotFound(format!("booking {id}")))
}

pub fn create(
    conn: &Connection,
    kind: BookingKind,
    user_id: Option<&str>,
    valid: ValidBooking,
) -> Result<Booking, AppError> {
    if let Some(form) = kind.form() {
        if !queries::is_form_active(conn, form)? {
            return Err(AppError::validation(format!(
                "{} registration is closed",
                form.as_str()
            )));
        }
    }

    let now = Utc::now().naive_utc();
    let booking = Booking {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: user_id.map(str::to_string),
        status: BookingStatus::Pending,
        date: valid.date,
        contact: valid.contact,
        documents: valid.documents,
        payment_confirmed: false,
        rejection_reason: None,
        details: valid.details,
        created_at: now,
        updated_at: now,
    };
    queries::create_booking(conn, &booking)?;

    tracing::info!(
        booking_id = %booking.id,
        kind = kind.as_str(),
        date = %booking.date,
        "booking created"
    );
    Ok(booking)
}

pub fn transition(
    conn: &Connection,
    kind: BookingKind,
    id: &str,
    transition: Transition,
) -> Result<Booking, AppError> {
    let mut booking = load(conn, kind, id)?;
    let action = transition.name();

    if let Err(e) = apply(&mut booking, transition, Utc::now().naive_utc()) {
        tracing::warn!(booking_id = %id, action, error = %e, "transition refused");
        return Err(e.into());
    }
    queries::save_booking(conn, &booking)?;

    tracing::info!(
        booking_id = %id,
        action,
        status = booking.status.as_str(),
        "booking transitioned"
    );
    Ok(booking)
}

pub fn update(
    conn: &Connection,
    kind: BookingKind,
    id: &str,
    update: &BookingUpdate,
) -> Result<Booking, AppError> {
    let mut booking = load(conn, kind, id)?;
    let now = Utc::now().naive_utc();
    apply_update(&mut booking, update, now.date())?;
    booking.updated_at = now;
    queries::save_booking(conn, &booking)?;

    tracing::info!(booking_id = %id, "booking updated");
    Ok(booking)
}

pub fn delete(conn: &Connection, kind: BookingKind, id: &str) -> Result<(), AppError> {
    load(conn, kind, id)?;
    queries::delete_booking(conn, id)?;
    tracing::info!(booking_id = %id, kind = kind.as_str(), "booking deleted");
    Ok(())
}

/// Overwrites the fields present in `update`. Fields belonging to another
/// booking kind are ignored. Status is never touched here. A new date must
/// not be before `today`, as for a fresh submission.
pub fn apply_update(
    booking: &mut Booking,
    update: &BookingUpdate,
    today: NaiveDate,
) -> Result<(), ValidationError> {
    if let Some(date) = &update.date {
        booking.date = validation::validate_booking_date(date, today)?;
    }
    if let Some(name) = &update.contact_name {
        booking.contact.name = validation::required(Some(name), "Contact name")?;
    }
    if let Some(phone) = &update.contact_phone {
        booking.contact.phone = validation::validate_phone(phone)?;
    }
    if let Some(email) = &update.contact_email {
        booking.contact.email = validation::validate_email(Some(email))?;
    }
    if let Some(documents) = &update.documents {
        booking.documents = documents
            .iter()
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty())
            .collect();
    }

    match &mut booking.details {
        BookingDetails::General {
            event_type,
            guest_count,
        } => {
            if let Some(value) = &update.event_type {
                *event_type = validation::required(Some(value), "Event type")?;
            }
            if update.guest_count.is_some() {
                *guest_count = validation::validate_guest_count(update.guest_count)?;
            }
        }
        BookingDetails::GroupWedding {
            bride_name,
            groom_name,
            guest_count,
        } => {
            if let Some(value) = &update.bride_name {
                *bride_name = validation::required(Some(value), "Bride name")?;
            }
            if let Some(value) = &update.groom_name {
                *groom_name = validation::required(Some(value), "Groom name")?;
            }
            if update.guest_count.is_some() {
                *guest_count = validation::validate_guest_count(update.guest_count)?;
            }
        }
        BookingDetails::StudentAward {
            student_name,
            school_name,
            standard,
            percentage,
        } => {
            if let Some(value) = &update.student_name {
                *student_name = validation::required(Some(value), "Student name")?;
            }
            if let Some(value) = &update.school_name {
                *school_name = validation::required(Some(value), "School name")?;
            }
            if let Some(value) = &update.standard {
                *standard = validation::required(Some(value), "Standard")?;
            }
            if update.percentage.is_some() {
                *percentage = validation::validate_percentage(update.percentage)?;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::models::{Contact, FormType};

    fn setup_db() -> Connection {
        db::init_db(":memory:").unwrap()
    }

    fn booking(kind: BookingKind, status: BookingStatus) -> Booking {
        let now = Utc::now().naive_utc();
        let details = match kind {
            BookingKind::General => BookingDetails::General {
                event_type: "Engagement".to_string(),
                guest_count: 150,
            },
            BookingKind::GroupWedding => BookingDetails::GroupWedding {
                bride_name: "Asha".to_string(),
                groom_name: "Ravi".to_string(),
                guest_count: 60,
            },
            BookingKind::StudentAward => BookingDetails::StudentAward {
                student_name: "Kiran".to_string(),
                school_name: "City High".to_string(),
                standard: "10".to_string(),
                percentage: 93.4,
            },
        };
        Booking {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: None,
            status,
            date: NaiveDate::from_ymd_opt(2030, 11, 20).unwrap(),
            contact: Contact {
                name: "Meera".to_string(),
                phone: "9876543210".to_string(),
                email: None,
            },
            documents: vec![],
            payment_confirmed: false,
            rejection_reason: None,
            details,
            created_at: now,
            updated_at: now,
        }
    }

    fn now() -> NaiveDateTime {
        Utc::now().naive_utc()
    }

    fn reason(s: &str) -> Transition {
        Transition::Reject {
            reason: RejectionReason::new(s).unwrap(),
        }
    }

    #[test]
    fn test_general_happy_path() {
        let mut b = booking(BookingKind::General, BookingStatus::Pending);
        apply(&mut b, Transition::Approve, now()).unwrap();
        assert_eq!(b.status, BookingStatus::Approved);
        assert!(!b.payment_confirmed);

        apply(&mut b, Transition::ConfirmPayment, now()).unwrap();
        assert_eq!(b.status, BookingStatus::Approved);
        assert!(b.payment_confirmed);

        apply(&mut b, Transition::ConfirmBooking, now()).unwrap();
        assert_eq!(b.status, BookingStatus::Booked);
        assert_eq!(b.status, BookingKind::General.terminal_status());
    }

    #[test]
    fn test_group_wedding_payment_confirms() {
        let mut b = booking(BookingKind::GroupWedding, BookingStatus::Approved);
        apply(&mut b, Transition::ConfirmPayment, now()).unwrap();
        assert_eq!(b.status, BookingStatus::Confirmed);
        assert!(b.payment_confirmed);
    }

    #[test]
    fn test_student_award_confirm_awards() {
        let mut b = booking(BookingKind::StudentAward, BookingStatus::Approved);
        apply(&mut b, Transition::ConfirmBooking, now()).unwrap();
        assert_eq!(b.status, BookingStatus::Awarded);
        assert!(!b.payment_confirmed);
    }

    #[test]
    fn test_confirm_requires_approved() {
        for status in [
            BookingStatus::Pending,
            BookingStatus::Rejected,
            BookingStatus::Booked,
        ] {
            let mut b = booking(BookingKind::General, status);
            let before = b.clone();
            let err = apply(&mut b, Transition::ConfirmBooking, now()).unwrap_err();
            assert!(matches!(err, TransitionError::Illegal { .. }));
            assert_eq!(b, before);

            let err = apply(&mut b, Transition::ConfirmPayment, now()).unwrap_err();
            assert!(matches!(err, TransitionError::Illegal { .. }));
            assert_eq!(b, before);
        }
    }

    #[test]
    fn test_payment_cannot_be_confirmed_twice() {
        let mut b = booking(BookingKind::General, BookingStatus::Approved);
        apply(&mut b, Transition::ConfirmPayment, now()).unwrap();
        assert_eq!(
            apply(&mut b, Transition::ConfirmPayment, now()).unwrap_err(),
            TransitionError::PaymentAlreadyConfirmed
        );
    }

    #[test]
    fn test_approve_requires_pending() {
        let mut b = booking(BookingKind::General, BookingStatus::Approved);
        let err = apply(&mut b, Transition::Approve, now()).unwrap_err();
        assert_eq!(err.to_string(), "cannot approve a booking that is approved");
    }

    #[test]
    fn test_reject_stores_reason() {
        for status in [BookingStatus::Pending, BookingStatus::Approved] {
            let mut b = booking(BookingKind::General, status);
            apply(&mut b, reason("  Date conflict "), now()).unwrap();
            assert_eq!(b.status, BookingStatus::Rejected);
            assert_eq!(b.rejection_reason.as_deref(), Some("Date conflict"));
        }
    }

    #[test]
    fn test_reject_terminal_refused() {
        let mut b = booking(BookingKind::General, BookingStatus::Booked);
        assert!(apply(&mut b, reason("late"), now()).is_err());
        assert_eq!(b.rejection_reason, None);
    }

    #[test]
    fn test_blank_reason_is_not_constructible() {
        assert!(RejectionReason::new("   ").is_err());
        assert!(RejectionReason::new("").is_err());
    }

    #[test]
    fn test_transition_persists() {
        let conn = setup_db();
        let b = booking(BookingKind::General, BookingStatus::Pending);
        queries::create_booking(&conn, &b).unwrap();

        let updated = transition(&conn, BookingKind::General, &b.id, Transition::Approve).unwrap();
        assert_eq!(updated.status, BookingStatus::Approved);

        let loaded = queries::get_booking_by_id(&conn, &b.id).unwrap().unwrap();
        assert_eq!(loaded.status, BookingStatus::Approved);
    }

    #[test]
    fn test_refused_transition_leaves_store_unchanged() {
        let conn = setup_db();
        let b = booking(BookingKind::General, BookingStatus::Pending);
        queries::create_booking(&conn, &b).unwrap();

        let err = transition(&conn, BookingKind::General, &b.id, Transition::ConfirmBooking)
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition(_)));

        let loaded = queries::get_booking_by_id(&conn, &b.id).unwrap().unwrap();
        assert_eq!(loaded.status, BookingStatus::Pending);
    }

    #[test]
    fn test_kind_mismatch_is_not_found() {
        let conn = setup_db();
        let b = booking(BookingKind::StudentAward, BookingStatus::Pending);
        queries::create_booking(&conn, &b).unwrap();

        let err = transition(&conn, BookingKind::General, &b.id, Transition::Approve).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn test_create_requires_open_form() {
        let conn = setup_db();
        let valid = ValidBooking {
            date: NaiveDate::from_ymd_opt(2030, 12, 1).unwrap(),
            contact: Contact {
                name: "Meera".to_string(),
                phone: "9876543210".to_string(),
                email: None,
            },
            documents: vec![],
            details: booking(BookingKind::GroupWedding, BookingStatus::Pending).details,
        };

        let err = create(&conn, BookingKind::GroupWedding, None, valid.clone()).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        queries::set_form_status(&conn, FormType::SamuhLagan, true).unwrap();
        let created = create(&conn, BookingKind::GroupWedding, None, valid).unwrap();
        assert_eq!(created.status, BookingStatus::Pending);
        assert_eq!(created.kind(), BookingKind::GroupWedding);
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2030, 1, 1).unwrap()
    }

    #[test]
    fn test_apply_update_coerces_and_validates() {
        let mut b = booking(BookingKind::General, BookingStatus::Pending);
        let update: BookingUpdate = serde_json::from_str(
            r#"{"date":"2030-12-24T00:00:00.000Z","guestCount":"400","contactPhone":"98765-43210"}"#,
        )
        .unwrap();
        apply_update(&mut b, &update, today()).unwrap();

        assert_eq!(b.date, NaiveDate::from_ymd_opt(2030, 12, 24).unwrap());
        assert!(matches!(
            b.details,
            BookingDetails::General {
                guest_count: 400,
                ..
            }
        ));
        assert_eq!(b.contact.phone, "9876543210");
        assert_eq!(b.status, BookingStatus::Pending);

        let too_many = BookingUpdate {
            guest_count: Some(1001),
            ..Default::default()
        };
        assert!(apply_update(&mut b, &too_many, today()).is_err());

        let past = BookingUpdate {
            date: Some("2029-06-01".to_string()),
            ..Default::default()
        };
        let err = apply_update(&mut b, &past, today()).unwrap_err();
        assert_eq!(err.0, "Date cannot be in the past");
        assert_eq!(b.date, NaiveDate::from_ymd_opt(2030, 12, 24).unwrap());
    }

    #[test]
    fn test_apply_update_ignores_other_kind_fields() {
        let mut b = booking(BookingKind::StudentAward, BookingStatus::Pending);
        let before = b.details.clone();
        let update = BookingUpdate {
            bride_name: Some("Asha".to_string()),
            guest_count: Some(5000),
            ..Default::default()
        };
        apply_update(&mut b, &update, today()).unwrap();
        assert_eq!(b.details, before);
    }

    #[test]
    fn test_delete_checks_kind() {
        let conn = setup_db();
        let b = booking(BookingKind::General, BookingStatus::Rejected);
        queries::create_booking(&conn, &b).unwrap();

        assert!(delete(&conn, BookingKind::StudentAward, &b.id).is_err());
        delete(&conn, BookingKind::General, &b.id).unwrap();
        assert!(queries::get_booking_by_id(&conn, &b.id).unwrap().is_none());
    }
}
