use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{ok, ApiResult};
use crate::db::queries;
use crate::errors::AppError;
use crate::models::{
    Booking, BookingKind, BookingStatus, BookingSubmission, BookingUpdate, Envelope,
};
use crate::services::calendar;
use crate::services::session::Session;
use crate::services::transitions::{self, RejectionReason, Transition};
use crate::state::AppState;
use crate::validation;

const DEFAULT_LIMIT: i64 = 100;
const MAX_LIMIT: i64 = 500;

// POST /api/bookings{kind}
pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    Extension(kind): Extension<BookingKind>,
    session: Session,
    Json(body): Json<BookingSubmission>,
) -> Result<(StatusCode, Json<Envelope<Booking>>), AppError> {
    let user_id = session.require_authenticated()?;
    let valid = validation::validate_submission(kind, &body, Utc::now().date_naive())?;

    let booking = {
        let db = state.conn()?;
        transitions::create(&db, kind, user_id, valid)?
    };

    Ok((StatusCode::CREATED, ok(booking)))
}

// GET /api/bookings{kind}
#[derive(Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
}

pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
    Extension(kind): Extension<BookingKind>,
    session: Session,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<Booking>> {
    session.require_admin()?;

    let status = match query.status.as_deref().filter(|s| !s.is_empty()) {
        Some(raw) => Some(
            BookingStatus::parse(&raw.to_ascii_lowercase())
                .ok_or_else(|| AppError::validation(format!("unknown status: {raw}")))?,
        ),
        None => None,
    };
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);

    let bookings = {
        let db = state.conn()?;
        queries::list_bookings(&db, Some(kind), status, limit)?
    };
    Ok(ok(bookings))
}

// GET /api/bookings{kind}/mine
pub async fn my_bookings(
    State(state): State<Arc<AppState>>,
    Extension(kind): Extension<BookingKind>,
    session: Session,
) -> ApiResult<Vec<Booking>> {
    let user_id = session.require_user()?;
    let bookings = {
        let db = state.conn()?;
        queries::list_bookings_for_user(&db, user_id, kind)?
    };
    Ok(ok(bookings))
}

/// Admins see every booking, users only their own. Anything else is a 404.
pub(crate) fn check_visible(session: &Session, booking: &Booking) -> Result<(), AppError> {
    let user_id = session.require_authenticated()?;
    if session.is_admin() || (user_id.is_some() && booking.user_id.as_deref() == user_id) {
        return Ok(());
    }
    Err(AppError::NotFound(format!("booking {}", booking.id)))
}

// GET /api/bookings{kind}/:id
pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    Extension(kind): Extension<BookingKind>,
    session: Session,
    Path(id): Path<String>,
) -> ApiResult<Booking> {
    // Anonymous callers learn nothing about which ids exist.
    session.require_authenticated()?;
    let booking = {
        let db = state.conn()?;
        transitions::load(&db, kind, &id)?
    };
    check_visible(&session, &booking)?;
    Ok(ok(booking))
}

fn run_transition(
    state: &AppState,
    session: &Session,
    kind: BookingKind,
    id: &str,
    transition: Transition,
) -> ApiResult<Booking> {
    session.require_admin()?;
    let booking = {
        let db = state.conn()?;
        transitions::transition(&db, kind, id, transition)?
    };
    Ok(ok(booking))
}

// PUT /api/bookings{kind}/approve/:id
pub async fn approve_booking(
    State(state): State<Arc<AppState>>,
    Extension(kind): Extension<BookingKind>,
    session: Session,
    Path(id): Path<String>,
) -> ApiResult<Booking> {
    run_transition(&state, &session, kind, &id, Transition::Approve)
}

// PUT /api/bookings{kind}/reject/:id
#[derive(Deserialize)]
pub struct RejectRequest {
    #[serde(default)]
    pub reason: String,
}

pub async fn reject_booking(
    State(state): State<Arc<AppState>>,
    Extension(kind): Extension<BookingKind>,
    session: Session,
    Path(id): Path<String>,
    Json(body): Json<RejectRequest>,
) -> ApiResult<Booking> {
    session.require_admin()?;
    let reason = RejectionReason::new(&body.reason)?;
    run_transition(&state, &session, kind, &id, Transition::Reject { reason })
}

// PUT /api/bookings{kind}/confirm-payment/:id
pub async fn confirm_payment(
    State(state): State<Arc<AppState>>,
    Extension(kind): Extension<BookingKind>,
    session: Session,
    Path(id): Path<String>,
) -> ApiResult<Booking> {
    run_transition(&state, &session, kind, &id, Transition::ConfirmPayment)
}

// PUT /api/bookings{kind}/confirm-booking/:id
pub async fn confirm_booking(
    State(state): State<Arc<AppState>>,
    Extension(kind): Extension<BookingKind>,
    session: Session,
    Path(id): Path<String>,
) -> ApiResult<Booking> {
    run_transition(&state, &session, kind, &id, Transition::ConfirmBooking)
}

// PUT /api/bookings{kind}/update/:id
pub async fn update_booking(
    State(state): State<Arc<AppState>>,
    Extension(kind): Extension<BookingKind>,
    session: Session,
    Path(id): Path<String>,
    Json(body): Json<BookingUpdate>,
) -> ApiResult<Booking> {
    session.require_admin()?;
    let booking = {
        let db = state.conn()?;
        transitions::update(&db, kind, &id, &body)?
    };
    Ok(ok(booking))
}

// DELETE /api/bookings{kind}/:id?confirm=true
#[derive(Deserialize)]
pub struct DeleteQuery {
    pub confirm: Option<bool>,
}

#[derive(Serialize, Deserialize)]
pub struct DeletedResponse {
    pub id: String,
    pub deleted: bool,
}

pub async fn delete_booking(
    State(state): State<Arc<AppState>>,
    Extension(kind): Extension<BookingKind>,
    session: Session,
    Path(id): Path<String>,
    Query(query): Query<DeleteQuery>,
) -> ApiResult<DeletedResponse> {
    session.require_admin()?;
    if query.confirm != Some(true) {
        return Err(AppError::validation(
            "deletion must be confirmed with ?confirm=true",
        ));
    }

    {
        let db = state.conn()?;
        transitions::delete(&db, kind, &id)?;
    }
    Ok(ok(DeletedResponse { id, deleted: true }))
}

// GET /api/bookings{kind}/booked-dates
#[derive(Deserialize)]
pub struct BookedDatesQuery {
    pub from: Option<String>,
}

pub async fn booked_dates(
    State(state): State<Arc<AppState>>,
    Extension(kind): Extension<BookingKind>,
    Query(query): Query<BookedDatesQuery>,
) -> ApiResult<Vec<NaiveDate>> {
    let from = match query.from.as_deref() {
        Some(raw) => validation::parse_date(raw)?,
        None => Utc::now().date_naive(),
    };

    let bookings = {
        let db = state.conn()?;
        queries::list_calendar_bookings(&db, kind, from)?
    };
    Ok(ok(calendar::blocked_dates(&bookings).into_iter().collect()))
}
