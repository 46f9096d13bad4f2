//! Backend → client: forwards every backend event as one text message.

use super::error::RelayError;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use mission_core::{BackendError, BackendEvent};
use std::fmt::Display;
use tracing::info;

/// Drains the backend event stream into the client until the backend completes.
///
/// Returns the number of events forwarded. A backend error or a failed write
/// ends the loop with an error.
pub async fn run_downstream<E, W>(mut events: E, mut client: W) -> Result<usize, RelayError>
where
    E: Stream<Item = Result<BackendEvent, BackendError>> + Unpin,
    W: Sink<String> + Unpin,
    W::Error: Display,
{
    info!("Streaming from live backend.");
    let mut forwarded = 0;

    while let Some(event) = events.next().await {
        let event = event?;
        log_signals(&event);

        let payload = event.to_json()?;
        client
            .send(payload)
            .await
            .map_err(|e| RelayError::ClientDisconnected(e.to_string()))?;
        forwarded += 1;
    }

    info!(forwarded, "Live backend stream closed.");
    Ok(forwarded)
}

fn log_signals(event: &BackendEvent) {
    let signals = event.signals();
    if let Some(calls) = signals.tool_calls {
        for call in calls {
            info!(tool = %call.name, args = %call.args, "[SERVER-SIDE TOOL EXECUTION]");
        }
    }
    if let Some(text) = signals.input_transcript {
        info!("USER: {}", text);
    }
    if let Some(text) = signals.output_transcript {
        info!("GEMINI: {}", text);
    }
}
