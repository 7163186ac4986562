use crate::validation::ValidationError;

/// Everything a client call can fail with. Callers turn these into a
/// user-facing banner; only `Network` and `Server` are worth retrying.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// 401. The session has been cleared; the user must log in again.
    #[error("session expired, please log in again")]
    SessionExpired,

    #[error("permission denied: {0}")]
    Forbidden(String),

    /// Rejected before any request was made.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("{message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    #[error("request aborted")]
    Aborted,

    #[error("unexpected response: {0}")]
    Decode(String),
}

impl ClientError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ClientError::Network(_) | ClientError::Server { .. })
    }
}
