use mission_core::{BackendError, QueueError, store::StoreError};

/// Everything that can end a relay session.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// The client connection went away, on read or on write.
    #[error("client disconnected: {0}")]
    ClientDisconnected(String),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("failed to serialize backend event: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error(transparent)]
    Queue(#[from] QueueError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("relay task failed: {0}")]
    Task(String),
}

impl RelayError {
    /// Client disconnects are an expected way for a session to end.
    pub fn is_disconnect(&self) -> bool {
        matches!(self, RelayError::ClientDisconnected(_))
    }
}
