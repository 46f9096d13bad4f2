//! Manages the client WebSocket connection lifecycle for a relay session.

use super::protocol::ClientFrame;
use crate::state::AppState;
use axum::{
    extract::{
        Path, Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt, future};
use mission_core::SessionOptions;
use std::sync::Arc;
use tracing::{error, info, instrument};

/// Axum handler to upgrade `/ws/{user_id}/{session_id}` to a WebSocket.
///
/// `proactivity` and `affective_dialog` may be given as query parameters.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path((user_id, session_id)): Path<(String, String)>,
    Query(options): Query<SessionOptions>,
    State(state): State<Arc<AppState>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state, user_id, session_id, options))
}

/// Main handler for an individual WebSocket connection.
///
/// Opens the relay session, then hands the socket's read half to the upstream
/// loop and its write half to the downstream loop. Failures stay inside this
/// connection; the socket is dropped when the session ends.
#[instrument(name = "ws_session", skip_all, fields(user_id = %user_id, session_id = %session_id))]
async fn handle_socket(
    socket: WebSocket,
    state: Arc<AppState>,
    user_id: String,
    session_id: String,
    options: SessionOptions,
) {
    info!("WebSocket connected.");

    let session = match state.relay.open(&user_id, &session_id, options).await {
        Ok(session) => session,
        Err(e) => {
            error!("Session initialization failed: {}", e);
            return;
        }
    };

    let (socket_tx, socket_rx) = socket.split();
    let client_rx = socket_rx
        .filter_map(|msg| future::ready(ClientFrame::from_ws(msg)))
        .boxed();
    let client_tx = socket_tx.with(|text: String| {
        future::ready(Ok::<_, axum::Error>(Message::Text(text.into())))
    });

    session.run(client_rx, client_tx).await;
}
