//! Typed HTTP client for the booking API.
//!
//! The caller owns a [`ClientSession`] and an [`AbortToken`] and passes
//! both into every call. Responses are unwrapped from the `{"data": ...}`
//! envelope here, so callers only ever see domain types or a
//! [`ClientError`]. A 401 clears the session in one place.

pub mod abort;
pub mod error;
pub mod poller;

use std::sync::RwLock;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::handlers::bookings::DeletedResponse;
use crate::handlers::forms::FormStatusChange;
use crate::handlers::notifications::FormNotificationRequest;
use crate::handlers::uploads::UploadResponse;
use crate::models::{
    AuthResponse, Booking, BookingKind, BookingStatus, BookingSubmission, BookingUpdate,
    DashboardSummary, Envelope, ErrorBody, FormStatus, FormType, Notification,
};
use crate::validation;

pub use abort::AbortToken;
pub use error::ClientError;

/// Bearer token of the logged-in user, if any.
#[derive(Debug, Default)]
pub struct ClientSession {
    token: RwLock<Option<String>>,
}

impl ClientSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: RwLock::new(Some(token.into())),
        }
    }

    pub fn token(&self) -> Option<String> {
        self.token.read().ok().and_then(|t| t.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }

    pub fn set(&self, token: impl Into<String>) {
        if let Ok(mut t) = self.token.write() {
            *t = Some(token.into());
        }
    }

    pub fn clear(&self) {
        if let Ok(mut t) = self.token.write() {
            *t = None;
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(4),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt + 1` (zero-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn booking_url(&self, kind: BookingKind, rest: &str) -> String {
        self.url(&format!("/api/bookings{}{rest}", kind.route_prefix()))
    }

    async fn send<T: DeserializeOwned>(
        &self,
        session: &ClientSession,
        abort: &AbortToken,
        request: RequestBuilder,
    ) -> Result<T, ClientError> {
        if abort.is_aborted() {
            return Err(ClientError::Aborted);
        }

        let request = match session.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = abort.run(request.send()).await??;
        let status = response.status();

        if status.is_success() {
            let envelope: Envelope<T> = abort
                .run(response.json::<Envelope<T>>())
                .await?
                .map_err(|e| ClientError::Decode(e.to_string()))?;
            return Ok(envelope.data);
        }

        let body: Option<ErrorBody> = abort.run(response.json::<ErrorBody>()).await?.ok();
        let message = body
            .as_ref()
            .map(|b| b.error.clone())
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());

        Err(match status.as_u16() {
            401 => {
                tracing::warn!("session rejected by server, clearing it");
                session.clear();
                ClientError::SessionExpired
            }
            403 => ClientError::Forbidden(message),
            s if s >= 500 => ClientError::Server { status: s, message },
            s => ClientError::Api {
                status: s,
                code: body.map(|b| b.code).unwrap_or_default(),
                message,
            },
        })
    }

    async fn get<T: DeserializeOwned>(
        &self,
        session: &ClientSession,
        abort: &AbortToken,
        url: String,
    ) -> Result<T, ClientError> {
        self.send(session, abort, self.http.get(url)).await
    }

    async fn put<T: DeserializeOwned, B: Serialize>(
        &self,
        session: &ClientSession,
        abort: &AbortToken,
        url: String,
        body: &B,
    ) -> Result<T, ClientError> {
        self.send(session, abort, self.http.put(url).json(body)).await
    }

    async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        session: &ClientSession,
        abort: &AbortToken,
        url: String,
        body: &B,
    ) -> Result<T, ClientError> {
        self.send(session, abort, self.http.post(url).json(body)).await
    }

    // ── Auth ──

    pub async fn register(
        &self,
        session: &ClientSession,
        abort: &AbortToken,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthResponse, ClientError> {
        let body = serde_json::json!({"name": name, "email": email, "password": password});
        let auth: AuthResponse = self
            .post(session, abort, self.url("/api/auth/register"), &body)
            .await?;
        session.set(auth.token.clone());
        Ok(auth)
    }

    pub async fn login(
        &self,
        session: &ClientSession,
        abort: &AbortToken,
        email: &str,
        password: &str,
    ) -> Result<AuthResponse, ClientError> {
        let body = serde_json::json!({"email": email, "password": password});
        let auth: AuthResponse = self
            .post(session, abort, self.url("/api/auth/login"), &body)
            .await?;
        session.set(auth.token.clone());
        Ok(auth)
    }

    // ── Bookings ──

    /// Validates locally first; an invalid submission never leaves the client.
    pub async fn submit_booking(
        &self,
        session: &ClientSession,
        abort: &AbortToken,
        kind: BookingKind,
        submission: &BookingSubmission,
    ) -> Result<Booking, ClientError> {
        validation::validate_submission(kind, submission, Utc::now().date_naive())?;
        self.post(session, abort, self.booking_url(kind, ""), submission)
            .await
    }

    pub async fn get_booking(
        &self,
        session: &ClientSession,
        abort: &AbortToken,
        kind: BookingKind,
        id: &str,
    ) -> Result<Booking, ClientError> {
        self.get(session, abort, self.booking_url(kind, &format!("/{id}")))
            .await
    }

    pub async fn list_bookings(
        &self,
        session: &ClientSession,
        abort: &AbortToken,
        kind: BookingKind,
        status: Option<BookingStatus>,
    ) -> Result<Vec<Booking>, ClientError> {
        let mut request = self.http.get(self.booking_url(kind, ""));
        if let Some(status) = status {
            request = request.query(&[("status", status.as_str())]);
        }
        self.send(session, abort, request).await
    }

    pub async fn my_bookings(
        &self,
        session: &ClientSession,
        abort: &AbortToken,
        kind: BookingKind,
    ) -> Result<Vec<Booking>, ClientError> {
        self.get(session, abort, self.booking_url(kind, "/mine"))
            .await
    }

    pub async fn approve(
        &self,
        session: &ClientSession,
        abort: &AbortToken,
        kind: BookingKind,
        id: &str,
    ) -> Result<Booking, ClientError> {
        let url = self.booking_url(kind, &format!("/approve/{id}"));
        self.put(session, abort, url, &serde_json::json!({})).await
    }

    pub async fn reject(
        &self,
        session: &ClientSession,
        abort: &AbortToken,
        kind: BookingKind,
        id: &str,
        reason: &str,
    ) -> Result<Booking, ClientError> {
        let reason = validation::validate_reason(reason)?;
        let url = self.booking_url(kind, &format!("/reject/{id}"));
        self.put(session, abort, url, &serde_json::json!({"reason": reason}))
            .await
    }

    pub async fn confirm_payment(
        &self,
        session: &ClientSession,
        abort: &AbortToken,
        kind: BookingKind,
        id: &str,
    ) -> Result<Booking, ClientError> {
        let url = self.booking_url(kind, &format!("/confirm-payment/{id}"));
        self.put(session, abort, url, &serde_json::json!({})).await
    }

    pub async fn confirm_booking(
        &self,
        session: &ClientSession,
        abort: &AbortToken,
        kind: BookingKind,
        id: &str,
    ) -> Result<Booking, ClientError> {
        let url = self.booking_url(kind, &format!("/confirm-booking/{id}"));
        self.put(session, abort, url, &serde_json::json!({})).await
    }

    pub async fn update_booking(
        &self,
        session: &ClientSession,
        abort: &AbortToken,
        kind: BookingKind,
        id: &str,
        update: &BookingUpdate,
    ) -> Result<Booking, ClientError> {
        let url = self.booking_url(kind, &format!("/update/{id}"));
        self.put(session, abort, url, update).await
    }

    pub async fn delete_booking(
        &self,
        session: &ClientSession,
        abort: &AbortToken,
        kind: BookingKind,
        id: &str,
    ) -> Result<(), ClientError> {
        let request = self
            .http
            .delete(self.booking_url(kind, &format!("/{id}")))
            .query(&[("confirm", "true")]);
        let _: DeletedResponse = self.send(session, abort, request).await?;
        Ok(())
    }

    pub async fn booked_dates(
        &self,
        session: &ClientSession,
        abort: &AbortToken,
        kind: BookingKind,
        from: Option<NaiveDate>,
    ) -> Result<Vec<NaiveDate>, ClientError> {
        let mut request = self.http.get(self.booking_url(kind, "/booked-dates"));
        if let Some(from) = from {
            request = request.query(&[("from", from.format("%Y-%m-%d").to_string())]);
        }
        self.send(session, abort, request).await
    }

    // ── Dashboard ──

    pub async fn dashboard(
        &self,
        session: &ClientSession,
        abort: &AbortToken,
    ) -> Result<DashboardSummary, ClientError> {
        self.get(session, abort, self.url("/api/admin/dashboard"))
            .await
    }

    /// The one call that retries: network and 5xx failures are retried with
    /// capped exponential backoff, up to `policy.max_attempts` in total.
    pub async fn dashboard_with_retry(
        &self,
        session: &ClientSession,
        abort: &AbortToken,
        policy: RetryPolicy,
    ) -> Result<DashboardSummary, ClientError> {
        let mut attempt = 0;
        loop {
            match self.dashboard(session, abort).await {
                Err(e) if e.is_retryable() && attempt + 1 < policy.max_attempts => {
                    let delay = policy.delay_for(attempt);
                    tracing::warn!(
                        attempt = attempt + 1,
                        error = %e,
                        ?delay,
                        "dashboard fetch failed, retrying"
                    );
                    abort.run(tokio::time::sleep(delay)).await?;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    // ── Forms & notifications ──

    pub async fn form_statuses(
        &self,
        session: &ClientSession,
        abort: &AbortToken,
    ) -> Result<Vec<FormStatus>, ClientError> {
        self.get(session, abort, self.url("/api/forms/status"))
            .await
    }

    pub async fn set_form_status(
        &self,
        session: &ClientSession,
        abort: &AbortToken,
        form_type: FormType,
        is_active: bool,
    ) -> Result<FormStatusChange, ClientError> {
        let url = self.url(&format!("/api/admin/forms/{}", form_type.as_str()));
        self.put(session, abort, url, &serde_json::json!({"isActive": is_active}))
            .await
    }

    /// `Ok(None)` without a request when nobody is logged in.
    pub async fn create_form_notification(
        &self,
        session: &ClientSession,
        abort: &AbortToken,
        form_type: FormType,
        message: &str,
    ) -> Result<Option<Notification>, ClientError> {
        if !session.is_authenticated() {
            return Ok(None);
        }
        let body = FormNotificationRequest {
            form_type,
            message: Some(message.to_string()),
        };
        let notification = self
            .post(session, abort, self.url("/api/notifications/form"), &body)
            .await?;
        Ok(Some(notification))
    }

    pub async fn notifications(
        &self,
        session: &ClientSession,
        abort: &AbortToken,
    ) -> Result<Vec<Notification>, ClientError> {
        self.get(session, abort, self.url("/api/notifications"))
            .await
    }

    // ── Uploads ──

    pub async fn upload_document(
        &self,
        session: &ClientSession,
        abort: &AbortToken,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<String, ClientError> {
        let part = reqwest::multipart::Part::bytes(bytes).file_name(filename.to_string());
        let form = reqwest::multipart::Form::new().part("file", part);
        let request = self
            .http
            .post(self.url("/api/uploads/documents"))
            .multipart(form);
        let upload: UploadResponse = self.send(session, abort, request).await?;
        Ok(upload.url)
    }
}
