use crate::db::queries;
use crate::errors::AppError;
use crate::models::{FormType, Notification};
use crate::state::AppState;

/// Stores a notification and pushes it to live subscribers.
/// `user_id = None` makes it a broadcast.
pub fn record_notification(
    state: &AppState,
    user_id: Option<&str>,
    form_type: FormType,
    message: &str,
) -> Result<Notification, AppError> {
    let notification = {
        let db = state.conn()?;
        queries::insert_notification(&db, user_id, form_type, message)?
    };

    tracing::info!(
        id = notification.id,
        form_type = form_type.as_str(),
        broadcast = user_id.is_none(),
        "notification recorded"
    );

    // No receivers is fine
    let _ = state.notify_tx.send(notification.clone());
    Ok(notification)
}

/// Sets a form's state; opening a closed form broadcasts its open message.
pub fn set_form_active(
    state: &AppState,
    form_type: FormType,
    is_active: bool,
) -> Result<Option<Notification>, AppError> {
    let was_active = {
        let db = state.conn()?;
        queries::set_form_status(&db, form_type, is_active)?
    };

    tracing::info!(form_type = form_type.as_str(), is_active, was_active, "form status changed");

    if is_active && !was_active {
        let notification = record_notification(state, None, form_type, form_type.open_message())?;
        return Ok(Some(notification));
    }
    Ok(None)
}
