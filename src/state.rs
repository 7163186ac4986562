use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::Connection;
use tokio::sync::broadcast;

use crate::config::AppConfig;
use crate::errors::AppError;
use crate::models::Notification;
use crate::services::documents::DocumentStore;

pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
    pub config: AppConfig,
    pub documents: Box<dyn DocumentStore>,
    pub notify_tx: broadcast::Sender<Notification>,
}

impl AppState {
    pub fn new(conn: Connection, config: AppConfig, documents: Box<dyn DocumentStore>) -> Self {
        let (notify_tx, _) = broadcast::channel(256);
        Self {
            db: Arc::new(Mutex::new(conn)),
            config,
            documents,
            notify_tx,
        }
    }

    /// Locks the database. Never hold the guard across an `.await`.
    pub fn conn(&self) -> Result<MutexGuard<'_, Connection>, AppError> {
        self.db
            .lock()
            .map_err(|_| AppError::Internal(anyhow::anyhow!("database mutex poisoned")))
    }
}
