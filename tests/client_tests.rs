use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};

use venuebook::client::poller::{FormStatusPoller, LastStatusStore, MemoryStatusStore};
use venuebook::client::{AbortToken, ApiClient, ClientError, ClientSession, RetryPolicy};
use venuebook::config::AppConfig;
use venuebook::db;
use venuebook::models::{
    BookingKind, BookingStatus, BookingSubmission, DashboardSummary, Envelope, ErrorBody, FormType,
};
use venuebook::routes::build_router;
use venuebook::services::documents::LocalDocumentStore;
use venuebook::state::AppState;

const ADMIN: &str = "client-admin-token";

// ── Helpers ──

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

async fn spawn_server() -> String {
    let dir = std::env::temp_dir().join(format!("venuebook-client-{}", uuid::Uuid::new_v4()));
    let config = AppConfig {
        port: 0,
        database_url: ":memory:".to_string(),
        admin_token: ADMIN.to_string(),
        session_secret: "client-secret".to_string(),
        session_ttl_hours: 1,
        bcrypt_cost: 4,
        upload_dir: dir.display().to_string(),
        public_base_url: "http://venue.test".to_string(),
        cors_origin: None,
        venue_name: "Test Hall".to_string(),
    };
    let conn = db::init_db(":memory:").unwrap();
    let documents = LocalDocumentStore::new(&dir, &config.public_base_url);
    let state = Arc::new(AppState::new(conn, config, Box::new(documents)));
    serve(build_router(state)).await
}

fn submission(guests: i64) -> BookingSubmission {
    BookingSubmission {
        date: "2099-04-04".to_string(),
        contact_name: "Asha Patel".to_string(),
        contact_phone: "9876543210".to_string(),
        event_type: Some("Reception".to_string()),
        guest_count: Some(guests),
        ..Default::default()
    }
}

fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        base_delay: Duration::from_millis(5),
        max_delay: Duration::from_millis(20),
    }
}

fn empty_dashboard() -> DashboardSummary {
    DashboardSummary {
        totals: BTreeMap::new(),
        pending_total: 0,
        unread_notifications: 0,
        recent: vec![],
    }
}

/// Dashboard stub that fails with a 503 for the first `failures` calls.
async fn flaky_dashboard(State((hits, failures)): State<(Arc<AtomicUsize>, usize)>) -> Response {
    let n = hits.fetch_add(1, Ordering::SeqCst);
    if n < failures {
        let body = ErrorBody {
            error: "warming up".to_string(),
            code: "INTERNAL".to_string(),
        };
        return (StatusCode::SERVICE_UNAVAILABLE, Json(body)).into_response();
    }
    Json(Envelope {
        data: empty_dashboard(),
    })
    .into_response()
}

async fn spawn_flaky(failures: usize) -> (String, Arc<AtomicUsize>) {
    let hits = Arc::new(AtomicUsize::new(0));
    let app = Router::new()
        .route("/api/admin/dashboard", get(flaky_dashboard))
        .with_state((hits.clone(), failures));
    (serve(app).await, hits)
}

// ── Bookings through the client ──

#[tokio::test]
async fn test_client_booking_flow() {
    let base = spawn_server().await;
    let client = ApiClient::new(&base);
    let abort = AbortToken::new();
    let user = ClientSession::new();
    let admin = ClientSession::with_token(ADMIN);

    client
        .register(&user, &abort, "Asha Patel", "asha@example.com", "hunter2hunter2")
        .await
        .unwrap();
    assert!(user.is_authenticated());

    let booking = client
        .submit_booking(&user, &abort, BookingKind::General, &submission(200))
        .await
        .unwrap();
    assert_eq!(booking.status, BookingStatus::Pending);

    let approved = client
        .approve(&admin, &abort, BookingKind::General, &booking.id)
        .await
        .unwrap();
    assert_eq!(approved.status, BookingStatus::Approved);

    let booked = client
        .confirm_booking(&admin, &abort, BookingKind::General, &booking.id)
        .await
        .unwrap();
    assert_eq!(booked.status, BookingStatus::Booked);
    assert!(booked.payment_confirmed);

    let dates = client
        .booked_dates(&user, &abort, BookingKind::General, None)
        .await
        .unwrap();
    assert_eq!(dates, vec![booked.date]);

    let pending = client
        .list_bookings(&admin, &abort, BookingKind::General, Some(BookingStatus::Pending))
        .await
        .unwrap();
    assert!(pending.is_empty());

    client
        .delete_booking(&admin, &abort, BookingKind::General, &booking.id)
        .await
        .unwrap();
    let mine = client
        .my_bookings(&user, &abort, BookingKind::General)
        .await
        .unwrap();
    assert!(mine.is_empty());
}

#[tokio::test]
async fn test_invalid_submission_never_reaches_server() {
    let base = spawn_server().await;
    let client = ApiClient::new(&base);
    let abort = AbortToken::new();
    let user = ClientSession::new();
    client
        .login(&user, &abort, "nobody@example.com", "whatever1")
        .await
        .unwrap_err();
    client
        .register(&user, &abort, "Asha", "asha@example.com", "hunter2hunter2")
        .await
        .unwrap();

    let err = client
        .submit_booking(&user, &abort, BookingKind::General, &submission(1500))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Validation(_)));
    assert_eq!(err.to_string(), "Guest count cannot exceed 1000");

    let mine = client
        .my_bookings(&user, &abort, BookingKind::General)
        .await
        .unwrap();
    assert!(mine.is_empty());
}

// ── Error taxonomy ──

#[tokio::test]
async fn test_unauthorized_clears_session() {
    let base = spawn_server().await;
    let client = ApiClient::new(&base);
    let session = ClientSession::with_token("stale-token");

    let err = client
        .my_bookings(&session, &AbortToken::new(), BookingKind::General)
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::SessionExpired));
    assert!(!session.is_authenticated());
}

#[tokio::test]
async fn test_non_admin_gets_forbidden() {
    let base = spawn_server().await;
    let client = ApiClient::new(&base);
    let abort = AbortToken::new();
    let user = ClientSession::new();
    client
        .register(&user, &abort, "Asha", "asha@example.com", "hunter2hunter2")
        .await
        .unwrap();

    let err = client.dashboard(&user, &abort).await.unwrap_err();
    assert!(matches!(err, ClientError::Forbidden(_)));
    assert!(user.is_authenticated());
}

#[tokio::test]
async fn test_illegal_transition_surfaces_api_error() {
    let base = spawn_server().await;
    let client = ApiClient::new(&base);
    let abort = AbortToken::new();
    let admin = ClientSession::with_token(ADMIN);

    let booking = client
        .submit_booking(&admin, &abort, BookingKind::General, &submission(50))
        .await
        .unwrap();
    let err = client
        .confirm_payment(&admin, &abort, BookingKind::General, &booking.id)
        .await
        .unwrap_err();
    match err {
        ClientError::Api { status, code, .. } => {
            assert_eq!(status, 409);
            assert_eq!(code, "INVALID_TRANSITION");
        }
        other => panic!("expected api error, got {other:?}"),
    }
}

// ── Retry ──

#[tokio::test]
async fn test_dashboard_retries_server_errors() {
    let (base, hits) = spawn_flaky(2).await;
    let client = ApiClient::new(&base);
    let session = ClientSession::with_token(ADMIN);

    let summary = client
        .dashboard_with_retry(&session, &AbortToken::new(), fast_retry())
        .await
        .unwrap();
    assert_eq!(summary.pending_total, 0);
    assert_eq!(hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_dashboard_gives_up_after_max_attempts() {
    let (base, hits) = spawn_flaky(10).await;
    let client = ApiClient::new(&base);
    let session = ClientSession::with_token(ADMIN);

    let err = client
        .dashboard_with_retry(&session, &AbortToken::new(), fast_retry())
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Server { status: 503, .. }));
    assert_eq!(hits.load(Ordering::SeqCst), 3);
}

// ── Abort ──

async fn slow_dashboard() -> Json<Envelope<DashboardSummary>> {
    tokio::time::sleep(Duration::from_secs(30)).await;
    Json(Envelope {
        data: empty_dashboard(),
    })
}

#[tokio::test]
async fn test_abort_cancels_in_flight_request() {
    let base = serve(Router::new().route("/api/admin/dashboard", get(slow_dashboard))).await;
    let client = ApiClient::new(&base);
    let session = ClientSession::with_token(ADMIN);
    let abort = AbortToken::new();

    let trigger = abort.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.abort();
    });

    let result = tokio::time::timeout(
        Duration::from_secs(5),
        client.dashboard_with_retry(&session, &abort, fast_retry()),
    )
    .await
    .unwrap();
    assert!(matches!(result, Err(ClientError::Aborted)));
    // An aborted call leaves the session alone.
    assert!(session.is_authenticated());
}

// ── Form status poller ──

/// Store whose writes land late, widening the load/save window.
struct SlowSaveStore {
    inner: MemoryStatusStore,
    delay: Duration,
}

#[async_trait]
impl LastStatusStore for SlowSaveStore {
    async fn load(&self, form_type: FormType) -> Option<bool> {
        self.inner.load(form_type).await
    }

    async fn save(&self, form_type: FormType, is_active: bool) {
        tokio::time::sleep(self.delay).await;
        self.inner.save(form_type, is_active).await;
    }
}

async fn poller_setup() -> (Arc<ApiClient>, Arc<ClientSession>) {
    let base = spawn_server().await;
    let client = Arc::new(ApiClient::new(&base));
    let abort = AbortToken::new();
    let session = Arc::new(ClientSession::new());
    client
        .register(&session, &abort, "Asha", "asha@example.com", "hunter2hunter2")
        .await
        .unwrap();
    client
        .set_form_status(
            &ClientSession::with_token(ADMIN),
            &abort,
            FormType::SamuhLagan,
            true,
        )
        .await
        .unwrap();
    (client, session)
}

#[tokio::test]
async fn test_sequential_polls_notify_once() {
    let (client, session) = poller_setup().await;
    let poller = FormStatusPoller::new(
        client.clone(),
        session.clone(),
        Arc::new(MemoryStatusStore::new()),
    );
    let abort = AbortToken::new();

    let first = poller.poll_once(&abort).await.unwrap();
    let second = poller.poll_once(&abort).await.unwrap();
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].form_type, FormType::SamuhLagan);
    assert!(second.is_empty());

    let own = client
        .notifications(&session, &abort)
        .await
        .unwrap()
        .into_iter()
        .filter(|n| n.user_id.is_some())
        .count();
    assert_eq!(own, 1);
}

#[tokio::test]
async fn test_concurrent_polls_can_both_notify() {
    let (client, session) = poller_setup().await;
    let store: Arc<dyn LastStatusStore> = Arc::new(SlowSaveStore {
        inner: MemoryStatusStore::new(),
        delay: Duration::from_millis(200),
    });
    let a = FormStatusPoller::new(client.clone(), session.clone(), store.clone());
    let b = FormStatusPoller::new(client.clone(), session.clone(), store);
    let abort = AbortToken::new();

    let (first, second) = tokio::join!(a.poll_once(&abort), b.poll_once(&abort));
    assert_eq!(first.unwrap().len() + second.unwrap().len(), 2);

    let own = client
        .notifications(&session, &abort)
        .await
        .unwrap()
        .into_iter()
        .filter(|n| n.user_id.is_some())
        .count();
    assert_eq!(own, 2);
}

#[tokio::test]
async fn test_poller_skips_notification_without_session() {
    let base = spawn_server().await;
    let client = Arc::new(ApiClient::new(&base));
    let abort = AbortToken::new();
    client
        .set_form_status(
            &ClientSession::with_token(ADMIN),
            &abort,
            FormType::StudentAward,
            true,
        )
        .await
        .unwrap();

    let store = Arc::new(MemoryStatusStore::new());
    let poller = FormStatusPoller::new(client, Arc::new(ClientSession::new()), store.clone());
    let created = poller.poll_once(&abort).await.unwrap();
    assert!(created.is_empty());
    assert_eq!(store.load(FormType::StudentAward).await, Some(true));
}
