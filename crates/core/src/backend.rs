use crate::{event::BackendEvent, initializer::SessionConfig, queue::IngressReceiver, store::SessionKey};
use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("Failed to connect to live backend: {0}")]
    Connect(String),
    #[error("Live backend transport error: {0}")]
    Transport(String),
    #[error("Live backend protocol error: {0}")]
    Protocol(String),
}

/// Ordered output of one live session. Ends when the backend completes.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<BackendEvent, BackendError>> + Send>>;

/// Everything the backend needs to open a session.
#[derive(Debug, Clone)]
pub struct LiveConnectRequest {
    pub key: SessionKey,
    pub config: SessionConfig,
}

/// A hosted streaming-inference backend.
///
/// The backend consumes the ingress receiver until the queue is closed and
/// drained, and reports its output through the returned stream. Closing the
/// queue is what lets the stream complete on its own.
#[async_trait]
pub trait LiveBackend: Send + Sync {
    async fn connect(
        &self,
        request: LiveConnectRequest,
        ingress: IngressReceiver,
    ) -> Result<EventStream, BackendError>;
}
