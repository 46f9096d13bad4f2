//! Session supervision: opens a relay session and runs its two loops as a
//! fail-together pair.

use super::{
    downstream::run_downstream, error::RelayError, protocol::ClientFrame, upstream::run_upstream,
};
use futures_util::{Sink, Stream};
use mission_core::{
    EventStream, IngressQueue, LiveBackend, LiveConnectRequest, SessionConfig, SessionKey,
    SessionOptions, SessionStore, initializer, store,
};
use std::{fmt::Display, sync::Arc};
use tokio::{sync::watch, task::JoinSet};
use tracing::{debug, error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Initializing,
    Active,
    Draining,
    Closed,
}

/// How a session ended.
#[derive(Debug)]
pub enum SessionOutcome {
    /// The client closed or dropped the connection.
    ClientDisconnected,
    /// The backend finished its stream.
    BackendCompleted,
    Failed(RelayError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Loop {
    Upstream,
    Downstream,
}

/// Process-wide relay wiring: the session store, the backend and the settings
/// every session is opened with.
pub struct Relay {
    store: Arc<dyn SessionStore>,
    backend: Arc<dyn LiveBackend>,
    app_name: String,
    model_id: Option<String>,
    queue_depth_warning: usize,
}

impl Relay {
    pub fn new(
        store: Arc<dyn SessionStore>,
        backend: Arc<dyn LiveBackend>,
        app_name: impl Into<String>,
        model_id: Option<String>,
        queue_depth_warning: usize,
    ) -> Self {
        Self {
            store,
            backend,
            app_name: app_name.into(),
            model_id,
            queue_depth_warning,
        }
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    /// Initializes a session: negotiates the configuration, resumes or creates
    /// the stored session, connects the backend and enqueues the priming frame.
    pub async fn open(
        &self,
        user_id: &str,
        session_id: &str,
        options: SessionOptions,
    ) -> Result<RelaySession, RelayError> {
        let (state, _) = watch::channel(SessionState::Initializing);
        let key = SessionKey::new(&self.app_name, user_id, session_id);
        let config = SessionConfig::negotiate(self.model_id.as_deref(), options);

        store::get_or_create(self.store.as_ref(), &key).await?;

        let (queue, ingress) = IngressQueue::new();
        let closer = QueueCloser(queue);
        let request = LiveConnectRequest {
            key: key.clone(),
            config: config.clone(),
        };
        let events = self.backend.connect(request, ingress).await?;
        initializer::prime(&closer.0)?;

        Ok(RelaySession {
            key,
            config,
            closer,
            events,
            state,
            queue_depth_warning: self.queue_depth_warning,
        })
    }
}

/// One initialized session, ready to be attached to a client connection.
pub struct RelaySession {
    key: SessionKey,
    config: SessionConfig,
    closer: QueueCloser,
    events: EventStream,
    state: watch::Sender<SessionState>,
    queue_depth_warning: usize,
}

/// Closes the ingress queue when dropped, so cancellation can't skip it.
struct QueueCloser(IngressQueue);

impl Drop for QueueCloser {
    fn drop(&mut self) {
        self.0.close();
    }
}

impl RelaySession {
    pub fn key(&self) -> &SessionKey {
        &self.key
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn queue(&self) -> &IngressQueue {
        &self.closer.0
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Runs the upstream and downstream loops until either finishes.
    ///
    /// Whichever loop ends first, the other is aborted and awaited before the
    /// ingress queue is closed. The queue is closed on every exit path,
    /// including this future being dropped before or while it runs.
    pub async fn run<C, W>(self, client_rx: C, client_tx: W) -> SessionOutcome
    where
        C: Stream<Item = Result<ClientFrame, RelayError>> + Send + Unpin + 'static,
        W: Sink<String> + Send + Unpin + 'static,
        W::Error: Display,
    {
        let RelaySession {
            closer,
            events,
            state,
            queue_depth_warning,
            ..
        } = self;
        let queue = closer.0.clone();

        transition(&state, SessionState::Active);
        let mut loops = JoinSet::new();
        loops.spawn(async move {
            let result = run_upstream(client_rx, queue, queue_depth_warning).await;
            (Loop::Upstream, result.map(drop))
        });
        loops.spawn(async move {
            let result = run_downstream(events, client_tx).await;
            (Loop::Downstream, result.map(drop))
        });

        let outcome = match loops.join_next().await {
            Some(Ok((Loop::Upstream, Ok(())))) => SessionOutcome::ClientDisconnected,
            Some(Ok((Loop::Downstream, Ok(())))) => SessionOutcome::BackendCompleted,
            Some(Ok((_, Err(e)))) if e.is_disconnect() => {
                debug!("Client connection lost: {}", e);
                SessionOutcome::ClientDisconnected
            }
            Some(Ok((which, Err(e)))) => {
                debug!(?which, "Relay loop failed.");
                SessionOutcome::Failed(e)
            }
            Some(Err(e)) => SessionOutcome::Failed(RelayError::Task(e.to_string())),
            None => SessionOutcome::ClientDisconnected,
        };

        transition(&state, SessionState::Draining);
        loops.abort_all();
        while loops.join_next().await.is_some() {}
        drop(closer);
        transition(&state, SessionState::Closed);

        match &outcome {
            SessionOutcome::ClientDisconnected => info!("Client disconnected."),
            SessionOutcome::BackendCompleted => info!("Live session completed."),
            SessionOutcome::Failed(e) => error!("Error: {}", e),
        }
        outcome
    }
}

fn transition(state: &watch::Sender<SessionState>, next: SessionState) {
    debug!(?next, "Session state transition.");
    state.send_replace(next);
}
