use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::response::sse::{Event, Sse};
use axum::Json;
use serde::{Deserialize, Serialize};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

use super::{ok, ApiResult};
use crate::db::queries;
use crate::errors::AppError;
use crate::models::{FormType, Notification};
use crate::services::notifications::record_notification;
use crate::services::session::{resolve_token, Session};
use crate::state::AppState;

// GET /api/notifications
#[derive(Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
}

pub async fn list_notifications(
    State(state): State<Arc<AppState>>,
    session: Session,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<Notification>> {
    let user_id = session.require_authenticated()?;
    let limit = query.limit.unwrap_or(50).clamp(1, 200);

    let notifications = {
        let db = state.conn()?;
        queries::list_notifications_for_user(&db, user_id, limit)?
    };
    Ok(ok(notifications))
}

// POST /api/notifications/form
#[derive(Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormNotificationRequest {
    pub form_type: FormType,
    #[serde(default)]
    pub message: Option<String>,
}

/// Records a form-opened notice for the calling user. No deduplication:
/// two calls create two records.
pub async fn create_form_notification(
    State(state): State<Arc<AppState>>,
    session: Session,
    Json(body): Json<FormNotificationRequest>,
) -> ApiResult<Notification> {
    let user_id = session.require_user()?;
    let message = body
        .message
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .unwrap_or(body.form_type.open_message());

    let notification = record_notification(&state, Some(user_id), body.form_type, message)?;
    Ok(ok(notification))
}

// POST /api/notifications/:id/read
pub async fn mark_read(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(id): Path<i64>,
) -> ApiResult<serde_json::Value> {
    let user_id = session.require_user()?;
    let updated = {
        let db = state.conn()?;
        queries::mark_notification_read(&db, user_id, id)?
    };

    if !updated {
        return Err(AppError::NotFound(format!("notification {id}")));
    }
    Ok(ok(serde_json::json!({"id": id, "isRead": true})))
}

// GET /api/notifications/events (SSE)
#[derive(Deserialize)]
pub struct SseQuery {
    pub token: Option<String>,
    pub last_id: Option<i64>,
}

pub async fn events_stream(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SseQuery>,
) -> Result<Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>>, AppError> {
    // Auth via query param (EventSource can't set headers)
    let session = resolve_token(&state, query.token.as_deref().unwrap_or(""))?;
    let user_id = session.user_id().map(str::to_string);
    let last_id = query.last_id.unwrap_or(0);

    // Subscribe before the catch-up read so nothing falls in between
    let rx = state.notify_tx.subscribe();

    let catchup = {
        let db = state.conn()?;
        queries::get_notifications_since(&db, user_id.as_deref(), last_id)?
    };
    let caught_up_to = catchup.last().map(|n| n.id).unwrap_or(last_id);

    let catchup_stream = tokio_stream::iter(catchup.into_iter().map(|n| Ok(to_event(&n))));

    let live_stream = BroadcastStream::new(rx).filter_map(move |result| match result {
        Ok(n) if n.id > caught_up_to && n.is_visible_to(user_id.as_deref()) => {
            Some(Ok(to_event(&n)))
        }
        Ok(_) => None,
        Err(tokio_stream::wrappers::errors::BroadcastStreamRecvError::Lagged(skipped)) => {
            tracing::warn!(skipped, "notification subscriber lagged");
            None
        }
    });

    let keepalive_stream = tokio_stream::StreamExt::map(
        tokio_stream::wrappers::IntervalStream::new(tokio::time::interval(Duration::from_secs(30))),
        |_| Ok(Event::default().comment("keepalive")),
    );

    let combined = catchup_stream.chain(live_stream);
    let merged = StreamExt::merge(combined, keepalive_stream);

    Ok(Sse::new(merged))
}

fn to_event(notification: &Notification) -> Event {
    let data = serde_json::to_string(notification).unwrap_or_default();
    Event::default()
        .id(notification.id.to_string())
        .event("notification")
        .data(data)
}
