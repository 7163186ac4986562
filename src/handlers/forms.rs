use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use super::{ok, ApiResult};
use crate::db::queries;
use crate::errors::AppError;
use crate::models::{FormStatus, FormType, Notification};
use crate::services::notifications;
use crate::services::session::Session;
use crate::state::AppState;

// GET /api/forms/status
pub async fn get_form_statuses(State(state): State<Arc<AppState>>) -> ApiResult<Vec<FormStatus>> {
    let statuses = {
        let db = state.conn()?;
        queries::get_form_statuses(&db)?
    };
    Ok(ok(statuses))
}

// PUT /api/admin/forms/:form_type
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetFormStatusRequest {
    pub is_active: bool,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormStatusChange {
    pub statuses: Vec<FormStatus>,
    pub notification: Option<Notification>,
}

pub async fn set_form_status(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(form_type): Path<String>,
    Json(body): Json<SetFormStatusRequest>,
) -> ApiResult<FormStatusChange> {
    session.require_admin()?;
    let form_type = FormType::parse(&form_type)
        .ok_or_else(|| AppError::NotFound(format!("form {form_type}")))?;

    let notification = notifications::set_form_active(&state, form_type, body.is_active)?;
    let statuses = {
        let db = state.conn()?;
        queries::get_form_statuses(&db)?
    };

    Ok(ok(FormStatusChange {
        statuses,
        notification,
    }))
}
