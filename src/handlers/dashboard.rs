use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::State;

use super::{ok, ApiResult};
use crate::db::queries;
use crate::models::{BookingKind, BookingStatus, DashboardSummary};
use crate::services::session::Session;
use crate::state::AppState;

const RECENT_LIMIT: i64 = 10;

// GET /api/admin/dashboard
pub async fn get_dashboard(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> ApiResult<DashboardSummary> {
    session.require_admin()?;

    let (counts, unread_notifications, recent) = {
        let db = state.conn()?;
        (
            queries::booking_counts(&db)?,
            queries::count_unread_deliveries(&db)?,
            queries::list_bookings(&db, None, None, RECENT_LIMIT)?,
        )
    };

    let mut totals: BTreeMap<String, BTreeMap<String, i64>> = BookingKind::ALL
        .iter()
        .map(|kind| {
            let statuses = BookingStatus::ALL
                .iter()
                .map(|s| (s.as_str().to_string(), 0))
                .collect();
            (kind.as_str().to_string(), statuses)
        })
        .collect();

    let mut pending_total = 0;
    for (kind, status, count) in counts {
        if status == BookingStatus::Pending.as_str() {
            pending_total += count;
        }
        *totals.entry(kind).or_default().entry(status).or_default() += count;
    }

    Ok(ok(DashboardSummary {
        totals,
        pending_total,
        unread_notifications,
        recent,
    }))
}
