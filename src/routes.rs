use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::routing::{get, post, put};
use axum::{Extension, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::handlers::{auth, bookings, calendar, dashboard, forms, health, notifications, uploads};
use crate::models::BookingKind;
use crate::services::documents::MAX_DOCUMENT_BYTES;
use crate::state::AppState;

/// Multipart framing on top of the largest accepted document.
const UPLOAD_BODY_LIMIT: usize = MAX_DOCUMENT_BYTES + 64 * 1024;

/// Routes shared by every booking kind. The kind is supplied as an extension.
fn booking_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/",
            get(bookings::list_bookings).post(bookings::create_booking),
        )
        .route("/mine", get(bookings::my_bookings))
        .route("/booked-dates", get(bookings::booked_dates))
        .route(
            "/:id",
            get(bookings::get_booking).delete(bookings::delete_booking),
        )
        .route("/approve/:id", put(bookings::approve_booking))
        .route("/reject/:id", put(bookings::reject_booking))
        .route("/confirm-payment/:id", put(bookings::confirm_payment))
        .route("/confirm-booking/:id", put(bookings::confirm_booking))
        .route("/update/:id", put(bookings::update_booking))
}

fn cors_layer(origin: Option<&str>) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    match origin.map(HeaderValue::from_str) {
        Some(Ok(origin)) => layer.allow_origin(origin),
        Some(Err(_)) => {
            tracing::warn!("CORS_ORIGIN is not a valid header value, allowing any origin");
            layer.allow_origin(Any)
        }
        None => layer.allow_origin(Any),
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let mut app = Router::new()
        .route("/health", get(health::health))
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/me", get(auth::me))
        .route("/api/admin/users/:id/admin", put(auth::set_admin))
        .route("/api/admin/dashboard", get(dashboard::get_dashboard))
        .route("/api/admin/forms/:form_type", put(forms::set_form_status))
        .route("/api/forms/status", get(forms::get_form_statuses))
        .route("/api/notifications", get(notifications::list_notifications))
        .route(
            "/api/notifications/form",
            post(notifications::create_form_notification),
        )
        .route("/api/notifications/:id/read", post(notifications::mark_read))
        .route("/api/notifications/events", get(notifications::events_stream))
        .route(
            "/api/uploads/documents",
            post(uploads::upload_document).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route("/calendar/:booking_id", get(calendar::download_ics));

    for kind in BookingKind::ALL {
        let path = format!("/api/bookings{}", kind.route_prefix());
        app = app.nest(&path, booking_routes().layer(Extension(kind)));
    }

    app.nest_service("/uploads", ServeDir::new(&state.config.upload_dir))
        .layer(cors_layer(state.config.cors_origin.as_deref()))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
