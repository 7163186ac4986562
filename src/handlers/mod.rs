pub mod auth;
pub mod bookings;
pub mod calendar;
pub mod dashboard;
pub mod forms;
pub mod health;
pub mod notifications;
pub mod uploads;

use axum::Json;

use crate::errors::AppError;
use crate::models::Envelope;

pub type ApiResult<T> = Result<Json<Envelope<T>>, AppError>;

pub fn ok<T>(data: T) -> Json<Envelope<T>> {
    Json(Envelope { data })
}
