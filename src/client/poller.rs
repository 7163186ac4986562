use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use super::{AbortToken, ApiClient, ClientError, ClientSession};
use crate::models::{FormType, Notification};

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(30);

/// Remembers the last form status the poller saw, per form.
#[async_trait]
pub trait LastStatusStore: Send + Sync {
    async fn load(&self, form_type: FormType) -> Option<bool>;
    async fn save(&self, form_type: FormType, is_active: bool);
}

#[derive(Debug, Default)]
pub struct MemoryStatusStore {
    seen: Mutex<HashMap<FormType, bool>>,
}

impl MemoryStatusStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LastStatusStore for MemoryStatusStore {
    async fn load(&self, form_type: FormType) -> Option<bool> {
        self.seen.lock().ok().and_then(|m| m.get(&form_type).copied())
    }

    async fn save(&self, form_type: FormType, is_active: bool) {
        if let Ok(mut m) = self.seen.lock() {
            m.insert(form_type, is_active);
        }
    }
}

/// Watches form statuses and records a notification for the logged-in user
/// whenever a form flips from closed to open.
///
/// The load/compare/save sequence is not atomic. Two pollers sharing a store
/// can both see the old value and both create a notification.
pub struct FormStatusPoller {
    client: Arc<ApiClient>,
    session: Arc<ClientSession>,
    store: Arc<dyn LastStatusStore>,
    interval: Duration,
}

impl FormStatusPoller {
    pub fn new(
        client: Arc<ApiClient>,
        session: Arc<ClientSession>,
        store: Arc<dyn LastStatusStore>,
    ) -> Self {
        Self {
            client,
            session,
            store,
            interval: DEFAULT_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// One check. Returns the notifications it created.
    pub async fn poll_once(&self, abort: &AbortToken) -> Result<Vec<Notification>, ClientError> {
        let statuses = self.client.form_statuses(&self.session, abort).await?;
        let mut created = Vec::new();

        for status in statuses {
            let was_active = self.store.load(status.form_type).await.unwrap_or(false);
            if status.is_active && !was_active {
                let notification = self
                    .client
                    .create_form_notification(
                        &self.session,
                        abort,
                        status.form_type,
                        status.form_type.open_message(),
                    )
                    .await?;
                if let Some(n) = notification {
                    tracing::info!(form = status.form_type.as_str(), id = n.id, "form opened");
                    created.push(n);
                }
            }
            self.store.save(status.form_type, status.is_active).await;
        }

        Ok(created)
    }

    /// Polls until aborted. Failures other than abort are logged and the
    /// next tick tries again.
    pub async fn run(&self, abort: &AbortToken) {
        let mut ticker = tokio::time::interval(self.interval);
        loop {
            if abort.run(ticker.tick()).await.is_err() {
                break;
            }
            match self.poll_once(abort).await {
                Ok(_) => {}
                Err(ClientError::Aborted) => break,
                Err(e) => tracing::warn!(error = %e, "form status poll failed"),
            }
        }
        tracing::debug!("form status poller stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_round_trip() {
        let store = MemoryStatusStore::new();
        assert_eq!(store.load(FormType::SamuhLagan).await, None);
        store.save(FormType::SamuhLagan, true).await;
        assert_eq!(store.load(FormType::SamuhLagan).await, Some(true));
        assert_eq!(store.load(FormType::StudentAward).await, None);
    }

    #[tokio::test]
    async fn test_run_stops_when_aborted() {
        let poller = FormStatusPoller::new(
            Arc::new(ApiClient::new("http://127.0.0.1:9")),
            Arc::new(ClientSession::new()),
            Arc::new(MemoryStatusStore::new()),
        )
        .with_interval(Duration::from_millis(10));
        let abort = AbortToken::new();
        abort.abort();
        tokio::time::timeout(Duration::from_secs(5), poller.run(&abort))
            .await
            .unwrap();
    }
}
