use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::booking::Booking;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    /// kind -> status -> count; every kind and status is present.
    pub totals: BTreeMap<String, BTreeMap<String, i64>>,
    pub pending_total: i64,
    /// Unread notification deliveries across all users.
    pub unread_notifications: i64,
    pub recent: Vec<Booking>,
}
