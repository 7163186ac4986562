use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{Duration, Utc};
use serde::Deserialize;

use super::{ok, ApiResult};
use crate::db::queries;
use crate::errors::AppError;
use crate::models::{AuthResponse, Envelope, PublicUser, User};
use crate::services::session::{self, Session};
use crate::state::AppState;
use crate::validation;

const MIN_PASSWORD_LEN: usize = 8;

fn issue_token(state: &AppState, user: &User) -> AuthResponse {
    let expires_at = (Utc::now() + Duration::hours(state.config.session_ttl_hours)).timestamp();
    AuthResponse {
        token: session::sign_token(&state.config.session_secret, &user.id, expires_at),
        user: PublicUser::from(user),
    }
}

// POST /api/auth/register
#[derive(Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<Envelope<AuthResponse>>), AppError> {
    let name = validation::required(Some(&body.name), "Name")?;
    let email = validation::validate_email(Some(&body.email))?
        .ok_or_else(|| AppError::validation("Email is required"))?;
    if body.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    let password_hash = session::hash_password(body.password, state.config.bcrypt_cost).await?;
    let user = User {
        id: uuid::Uuid::new_v4().to_string(),
        name,
        password_hash,
        email,
        is_admin: false,
        created_at: Utc::now().naive_utc().format("%Y-%m-%d %H:%M:%S").to_string(),
    };

    {
        let db = state.conn()?;
        if queries::get_user_by_email(&db, &user.email)?.is_some() {
            return Err(AppError::validation("Email is already registered"));
        }
        queries::create_user(&db, &user)?;
    }

    tracing::info!(user_id = %user.id, "user registered");
    Ok((StatusCode::CREATED, ok(issue_token(&state, &user))))
}

// POST /api/auth/login
#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoginRequest>,
) -> ApiResult<AuthResponse> {
    let user = {
        let db = state.conn()?;
        queries::get_user_by_email(&db, body.email.trim())?
    };

    let verified = match &user {
        Some(u) => session::verify_password(body.password, u.password_hash.clone()).await,
        None => false,
    };
    let Some(user) = user.filter(|_| verified) else {
        tracing::warn!("failed login attempt");
        return Err(AppError::Unauthorized("invalid email or password".to_string()));
    };

    Ok(ok(issue_token(&state, &user)))
}

// GET /api/auth/me
pub async fn me(State(state): State<Arc<AppState>>, session: Session) -> ApiResult<PublicUser> {
    let user_id = session.require_user()?;
    let user = {
        let db = state.conn()?;
        queries::get_user_by_id(&db, user_id)?
    };
    let user = user.ok_or_else(|| AppError::Unauthorized("session expired".to_string()))?;
    Ok(ok(PublicUser::from(&user)))
}

// PUT /api/admin/users/:id/admin
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetAdminRequest {
    pub is_admin: bool,
}

pub async fn set_admin(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(id): Path<String>,
    Json(body): Json<SetAdminRequest>,
) -> ApiResult<PublicUser> {
    session.require_admin()?;

    let user = {
        let db = state.conn()?;
        if !queries::set_user_admin(&db, &id, body.is_admin)? {
            return Err(AppError::NotFound(format!("user {id}")));
        }
        queries::get_user_by_id(&db, &id)?
    };
    let user = user.ok_or_else(|| AppError::NotFound(format!("user {id}")))?;

    tracing::info!(user_id = %id, is_admin = body.is_admin, "admin flag changed");
    Ok(ok(PublicUser::from(&user)))
}
