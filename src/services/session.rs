//! Bearer-token sessions.
//!
//! A token is `base64url(user_id|expires_at)` followed by `.` and the
//! base64url HMAC-SHA1 of that payload under the server secret. The
//! configured admin token is accepted verbatim as an administrator
//! session. Every handler receives the resolved [`Session`] explicitly.
//!
//! Passwords are stored as bcrypt digests, independent of the token secret.

use std::sync::Arc;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha1::Sha1;

use crate::db::queries;
use crate::errors::AppError;
use crate::state::AppState;

type HmacSha1 = Hmac<Sha1>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Session {
    Anonymous,
    User { user_id: String },
    /// `user_id` is `None` when authenticated with the static admin token.
    Admin { user_id: Option<String> },
}

impl Session {
    pub fn user_id(&self) -> Option<&str> {
        match self {
            Session::Anonymous => None,
            Session::User { user_id } => Some(user_id),
            Session::Admin { user_id } => user_id.as_deref(),
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Session::Admin { .. })
    }

    /// Any authenticated session; yields the user id if there is one.
    pub fn require_authenticated(&self) -> Result<Option<&str>, AppError> {
        match self {
            Session::Anonymous => Err(AppError::Unauthorized("login required".to_string())),
            _ => Ok(self.user_id()),
        }
    }

    pub fn require_user(&self) -> Result<&str, AppError> {
        self.require_authenticated()?
            .ok_or_else(|| AppError::Forbidden("a user account is required".to_string()))
    }

    pub fn require_admin(&self) -> Result<(), AppError> {
        match self {
            Session::Anonymous => Err(AppError::Unauthorized("login required".to_string())),
            Session::User { .. } => Err(AppError::Forbidden("admin access required".to_string())),
            Session::Admin { .. } => Ok(()),
        }
    }
}

fn mac(secret: &str) -> HmacSha1 {
    match HmacSha1::new_from_slice(secret.as_bytes()) {
        Ok(m) => m,
        Err(_) => unreachable!("hmac accepts keys of any length"),
    }
}

pub fn sign_token(secret: &str, user_id: &str, expires_at: i64) -> String {
    let payload = format!("{user_id}|{expires_at}");
    let mut mac = mac(secret);
    mac.update(payload.as_bytes());
    let signature = mac.finalize().into_bytes();

    format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(payload),
        URL_SAFE_NO_PAD.encode(signature)
    )
}

/// Returns the user id of a well-signed, unexpired token.
pub fn verify_token(secret: &str, token: &str, now: i64) -> Option<String> {
    let (payload_b64, signature_b64) = token.split_once('.')?;
    let payload = URL_SAFE_NO_PAD.decode(payload_b64).ok()?;
    let signature = URL_SAFE_NO_PAD.decode(signature_b64).ok()?;

    let mut mac = mac(secret);
    mac.update(&payload);
    mac.verify_slice(&signature).ok()?;

    let payload = String::from_utf8(payload).ok()?;
    let (user_id, expires_at) = payload.rsplit_once('|')?;
    let expires_at: i64 = expires_at.parse().ok()?;
    if expires_at <= now {
        return None;
    }
    Some(user_id.to_string())
}

/// bcrypt digest of `password`. Runs on the blocking pool.
pub async fn hash_password(password: String, cost: u32) -> anyhow::Result<String> {
    let digest = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost)).await??;
    Ok(digest)
}

/// False for a wrong password and for a malformed stored digest.
pub async fn verify_password(password: String, digest: String) -> bool {
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &digest).unwrap_or(false))
        .await
        .unwrap_or(false)
}

/// Resolves a raw bearer token into a session.
pub fn resolve_token(state: &AppState, token: &str) -> Result<Session, AppError> {
    let token = token.trim();
    if token.is_empty() {
        return Err(AppError::Unauthorized("invalid authorization header".to_string()));
    }
    if token == state.config.admin_token {
        return Ok(Session::Admin { user_id: None });
    }

    let now = chrono::Utc::now().timestamp();
    let user_id = verify_token(&state.config.session_secret, token, now)
        .ok_or_else(|| AppError::Unauthorized("session expired".to_string()))?;

    let user = {
        let db = state.conn()?;
        queries::get_user_by_id(&db, &user_id)?
    };

    match user {
        Some(u) if u.is_admin => Ok(Session::Admin { user_id: Some(u.id) }),
        Some(u) => Ok(Session::User { user_id: u.id }),
        None => Err(AppError::Unauthorized("session expired".to_string())),
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for Session {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let Some(auth) = parts.headers.get(AUTHORIZATION) else {
            return Ok(Session::Anonymous);
        };
        let auth = auth
            .to_str()
            .map_err(|_| AppError::Unauthorized("invalid authorization header".to_string()))?;
        let token = auth.strip_prefix("Bearer ").unwrap_or("");
        resolve_token(state, token)
    }
}
