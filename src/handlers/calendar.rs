use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};

use super::bookings::check_visible;
use crate::db::queries;
use crate::errors::AppError;
use crate::services::calendar::generate_ics;
use crate::services::session::Session;
use crate::state::AppState;

// GET /calendar/:booking_id
pub async fn download_ics(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(raw_id): Path<String>,
) -> Result<Response, AppError> {
    session.require_authenticated()?;
    let booking_id = raw_id.strip_suffix(".ics").unwrap_or(&raw_id);

    let booking = {
        let db = state.conn()?;
        queries::get_booking_by_id(&db, booking_id)?
    };
    let booking = booking.ok_or_else(|| AppError::NotFound(format!("booking {booking_id}")))?;
    check_visible(&session, &booking)?;

    let ics = generate_ics(&booking, &state.config.venue_name);
    let disposition = format!("attachment; filename=\"booking-{booking_id}.ics\"");

    Ok((
        [
            (header::CONTENT_TYPE, "text/calendar; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        ics,
    )
        .into_response())
}
