//! Live backend over the hosted `BidiGenerateContent` WebSocket.

use crate::types::{ClientMessage, ServerMessage, Setup};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt, stream::SplitSink, stream::SplitStream};
use mission_core::{
    BackendError, BackendEvent, EventStream, IngressReceiver, LiveBackend, LiveConnectRequest,
    event::Transcription,
};
use serde_json::Value;
use tokio::{net::TcpStream, sync::oneshot, task::JoinHandle};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async,
    tungstenite::protocol::{CloseFrame, Message, frame::coding::CloseCode},
};
use tracing::{debug, error, info, warn};

pub const DEFAULT_LIVE_URL: &str = "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent";

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsWriter = SplitSink<WsStream, Message>;
type WsReader = SplitStream<WsStream>;

/// Connects one live session per relay session.
pub struct GeminiLiveBackend {
    api_key: String,
    url: String,
}

impl GeminiLiveBackend {
    pub fn new(api_key: impl Into<String>, url: Option<String>) -> Self {
        Self {
            api_key: api_key.into(),
            url: url.unwrap_or_else(|| DEFAULT_LIVE_URL.to_string()),
        }
    }
}

#[async_trait]
impl LiveBackend for GeminiLiveBackend {
    async fn connect(
        &self,
        request: LiveConnectRequest,
        ingress: IngressReceiver,
    ) -> Result<EventStream, BackendError> {
        let url = format!("{}?key={}", self.url, self.api_key);
        let (ws_stream, _) = connect_async(url)
            .await
            .map_err(|e| BackendError::Connect(e.to_string()))?;
        info!(
            user_id = %request.key.user_id,
            session_id = %request.key.session_id,
            "Connected to Gemini Live WebSocket."
        );
        let (mut writer, reader) = ws_stream.split();

        let setup = ClientMessage::Setup(Setup::from_config(&request.config));
        let payload =
            serde_json::to_string(&setup).map_err(|e| BackendError::Protocol(e.to_string()))?;
        writer
            .send(Message::Text(payload.into()))
            .await
            .map_err(|e| BackendError::Connect(e.to_string()))?;

        let (ready_tx, ready_rx) = oneshot::channel();
        let pump = tokio::spawn(pump_ingress(writer, ingress, ready_rx));

        let state = ReaderState {
            reader,
            ready: Some(ready_tx),
            transcripts: TranscriptAggregator::default(),
            _pump: PumpGuard(pump),
        };
        Ok(Box::pin(futures_util::stream::unfold(state, next_event)))
    }
}

/// Forwards ingress frames to the socket once setup has completed.
///
/// The queue closing is the end-of-input signal: the socket gets a close frame
/// and the server finishes the session from its side.
async fn pump_ingress(
    mut writer: WsWriter,
    mut ingress: IngressReceiver,
    ready: oneshot::Receiver<()>,
) {
    if ready.await.is_err() {
        debug!("Live session ended before setup completed.");
        return;
    }

    while let Some(frame) = ingress.recv().await {
        let message = ClientMessage::from_frame(&frame);
        let payload = match serde_json::to_string(&message) {
            Ok(p) => p,
            Err(e) => {
                error!("Failed to serialize {} frame: {}", frame.kind(), e);
                continue;
            }
        };
        if let Err(e) = writer.send(Message::Text(payload.into())).await {
            error!("Failed to send frame to Gemini Live: {}", e);
            return;
        }
    }

    info!("Ingress queue drained. Closing Gemini Live connection.");
    if let Err(e) = writer.send(Message::Close(None)).await {
        debug!("Failed to send close frame to Gemini Live: {}", e);
    }
}

/// Aborts the pump task when the event stream is dropped.
struct PumpGuard(JoinHandle<()>);

impl Drop for PumpGuard {
    fn drop(&mut self) {
        self.0.abort();
    }
}

struct ReaderState {
    reader: WsReader,
    ready: Option<oneshot::Sender<()>>,
    transcripts: TranscriptAggregator,
    _pump: PumpGuard,
}

async fn next_event(
    mut state: ReaderState,
) -> Option<(Result<BackendEvent, BackendError>, ReaderState)> {
    loop {
        let payload = match state.reader.next().await? {
            Ok(Message::Text(text)) => text.as_bytes().to_vec(),
            // The Live API frames its JSON as binary messages as often as text.
            Ok(Message::Binary(bytes)) => bytes.to_vec(),
            Ok(Message::Close(frame)) => {
                return close_outcome(frame).map(|err| (Err(err), state));
            }
            Ok(_) => continue,
            Err(e) => return Some((Err(BackendError::Transport(e.to_string())), state)),
        };

        let message: ServerMessage = match serde_json::from_slice(&payload) {
            Ok(m) => m,
            Err(e) => {
                warn!("Skipping unparsable Gemini Live message: {}", e);
                continue;
            }
        };

        if message.setup_complete.is_some() {
            info!("Gemini Live setup complete. Ready for bidirectional streaming.");
            if let Some(ready) = state.ready.take() {
                let _ = ready.send(());
            }
        }

        if let Some(event) = state.transcripts.relay_event(message) {
            return Some((Ok(event), state));
        }
    }
}

/// A normal close ends the stream; anything else is reported once as an error.
fn close_outcome(frame: Option<CloseFrame>) -> Option<BackendError> {
    match frame {
        Some(f) if f.code != CloseCode::Normal && f.code != CloseCode::Away => {
            Some(BackendError::Protocol(format!(
                "connection closed with {}: {}",
                u16::from(f.code),
                f.reason
            )))
        }
        _ => {
            info!("Gemini Live connection closed.");
            None
        }
    }
}

/// Accumulates streamed transcript fragments into a final transcript per turn.
#[derive(Default)]
pub(crate) struct TranscriptAggregator {
    input: String,
    output: String,
}

impl TranscriptAggregator {
    /// Converts a server message into a relay event. Messages with nothing to
    /// forward (such as `setupComplete`) yield `None`.
    pub(crate) fn relay_event(&mut self, message: ServerMessage) -> Option<BackendEvent> {
        let mut event = BackendEvent::default();

        if let Some(content) = message.server_content {
            event.content = content.model_turn;
            event.turn_complete = content.turn_complete;
            event.interrupted = content.interrupted;
            event.input_transcription = content
                .input_transcription
                .map(|chunk| observe(&mut self.input, chunk));
            event.output_transcription = content
                .output_transcription
                .map(|chunk| observe(&mut self.output, chunk));

            // The model was cut off; what it had said so far never completes.
            if content.interrupted == Some(true) {
                self.output.clear();
            }
            if content.turn_complete == Some(true) {
                if let Some(done) = finish(&mut self.input) {
                    event.input_transcription = Some(done);
                }
                if let Some(done) = finish(&mut self.output) {
                    event.output_transcription = Some(done);
                }
            }
            if let Some(generation_complete) = content.generation_complete {
                event
                    .extra
                    .insert("generationComplete".into(), Value::Bool(generation_complete));
            }
        }

        event.tool_call = message.tool_call;
        for (key, value) in [
            ("toolCallCancellation", message.tool_call_cancellation),
            ("goAway", message.go_away),
            ("sessionResumptionUpdate", message.session_resumption_update),
            ("usageMetadata", message.usage_metadata),
        ] {
            if let Some(value) = value {
                event.extra.insert(key.into(), value);
            }
        }

        (event != BackendEvent::default()).then_some(event)
    }
}

fn observe(buffer: &mut String, chunk: Transcription) -> Transcription {
    if let Some(text) = &chunk.text {
        buffer.push_str(text);
    }
    if chunk.finished == Some(true) {
        return finish(buffer).unwrap_or(chunk);
    }
    chunk
}

fn finish(buffer: &mut String) -> Option<Transcription> {
    let text = std::mem::take(buffer);
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    Some(Transcription {
        text: Some(text.to_string()),
        finished: Some(true),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mission_core::{
        IngressQueue, MediaFrame, SessionConfig, SessionKey, SessionOptions,
        initializer::{self, PRIMING_TEXT},
    };
    use serde_json::json;
    use std::time::Duration;
    use tokio::{net::TcpListener, time::timeout};
    use tokio_tungstenite::accept_async;

    fn server_message(value: Value) -> ServerMessage {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_setup_complete_is_not_forwarded() {
        let mut agg = TranscriptAggregator::default();
        assert!(agg.relay_event(server_message(json!({"setupComplete": {}}))).is_none());
    }

    #[test]
    fn test_transcripts_finalize_on_turn_complete() {
        let mut agg = TranscriptAggregator::default();

        let first = agg
            .relay_event(server_message(json!({
                "serverContent": {"inputTranscription": {"text": "show me "}}
            })))
            .unwrap();
        assert_eq!(first.signals().input_transcript, None);

        agg.relay_event(server_message(json!({
            "serverContent": {"inputTranscription": {"text": "three"}, "outputTranscription": {"text": "I see "}}
        })))
        .unwrap();

        let last = agg
            .relay_event(server_message(json!({
                "serverContent": {"outputTranscription": {"text": "three."}, "turnComplete": true}
            })))
            .unwrap();
        let signals = last.signals();
        assert_eq!(signals.input_transcript, Some("show me three"));
        assert_eq!(signals.output_transcript, Some("I see three."));
        assert_eq!(last.turn_complete, Some(true));

        // Buffers reset for the next turn.
        let next = agg
            .relay_event(server_message(json!({"serverContent": {"turnComplete": true}})))
            .unwrap();
        assert_eq!(next.signals().output_transcript, None);
    }

    #[test]
    fn test_interrupted_turn_does_not_leak_into_next_transcript() {
        let mut agg = TranscriptAggregator::default();
        agg.relay_event(server_message(json!({
            "serverContent": {"outputTranscription": {"text": "Let me expl"}}
        })));

        let interrupted = agg
            .relay_event(server_message(json!({"serverContent": {"interrupted": true}})))
            .unwrap();
        assert_eq!(interrupted.interrupted, Some(true));
        assert_eq!(interrupted.signals().output_transcript, None);

        agg.relay_event(server_message(json!({
            "serverContent": {"outputTranscription": {"text": "Sure, two."}}
        })));
        let last = agg
            .relay_event(server_message(json!({"serverContent": {"turnComplete": true}})))
            .unwrap();
        assert_eq!(last.signals().output_transcript, Some("Sure, two."));
    }

    #[test]
    fn test_tool_calls_and_extras_are_carried() {
        let mut agg = TranscriptAggregator::default();
        let event = agg
            .relay_event(server_message(json!({
                "toolCall": {"functionCalls": [{"id": "c1", "name": "unlock", "args": {}}]},
                "usageMetadata": {"totalTokenCount": 7}
            })))
            .unwrap();

        assert_eq!(event.signals().tool_calls.unwrap()[0].name, "unlock");
        assert_eq!(event.extra["usageMetadata"], json!({"totalTokenCount": 7}));
    }

    #[test]
    fn test_model_turn_is_forwarded_as_content() {
        let mut agg = TranscriptAggregator::default();
        let event = agg
            .relay_event(server_message(json!({
                "serverContent": {"modelTurn": {"parts": [{"inlineData": {"mimeType": "audio/pcm;rate=24000", "data": "AAA="}}]}}
            })))
            .unwrap();

        let wire: Value = serde_json::from_str(&event.to_json().unwrap()).unwrap();
        assert_eq!(
            wire,
            json!({"content": {"parts": [{"inlineData": {"mimeType": "audio/pcm;rate=24000", "data": "AAA="}}]}})
        );
    }

    #[test]
    fn test_abnormal_close_is_an_error() {
        assert!(close_outcome(None).is_none());
        assert!(
            close_outcome(Some(CloseFrame {
                code: CloseCode::Normal,
                reason: "".into(),
            }))
            .is_none()
        );
        let err = close_outcome(Some(CloseFrame {
            code: CloseCode::Policy,
            reason: "quota".into(),
        }))
        .unwrap();
        assert!(err.to_string().contains("1008"));
    }

    fn connect_request() -> LiveConnectRequest {
        LiveConnectRequest {
            key: SessionKey::new("mission-relay", "pilot-7", "sortie-1"),
            config: SessionConfig::negotiate(None, SessionOptions::default()),
        }
    }

    async fn live_server() -> (TcpListener, GeminiLiveBackend) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}/live", listener.local_addr().unwrap());
        (listener, GeminiLiveBackend::new("test-key", Some(url)))
    }

    async fn accept(listener: &TcpListener) -> WebSocketStream<TcpStream> {
        let (stream, _) = listener.accept().await.unwrap();
        accept_async(stream).await.unwrap()
    }

    async fn next_json(server: &mut WebSocketStream<TcpStream>) -> Value {
        match server.next().await {
            Some(Ok(Message::Text(text))) => serde_json::from_str(text.as_str()).unwrap(),
            other => panic!("expected a text message, got {:?}", other),
        }
    }

    fn user_text(message: &Value) -> &Value {
        &message["clientContent"]["turns"][0]["parts"][0]["text"]
    }

    #[tokio::test]
    async fn test_frames_wait_for_setup_complete_and_close_follows_queue() {
        let (listener, backend) = live_server().await;
        let (queue, ingress) = IngressQueue::new();
        initializer::prime(&queue).unwrap();
        queue.push(MediaFrame::text("open the hatch")).unwrap();

        let client = tokio::spawn(async move {
            let events = backend.connect(connect_request(), ingress).await.unwrap();
            events.collect::<Vec<_>>().await
        });
        let mut server = accept(&listener).await;

        let setup = next_json(&mut server).await;
        assert!(setup["setup"]["model"].as_str().unwrap().starts_with("models/"));
        assert!(
            timeout(Duration::from_millis(100), server.next()).await.is_err(),
            "frames were sent before setupComplete"
        );

        server
            .send(Message::Text(r#"{"setupComplete":{}}"#.into()))
            .await
            .unwrap();
        let first = next_json(&mut server).await;
        assert_eq!(user_text(&first), PRIMING_TEXT);
        let second = next_json(&mut server).await;
        assert_eq!(user_text(&second), "open the hatch");

        server
            .send(Message::Text(r#"{"serverContent":{"turnComplete":true}}"#.into()))
            .await
            .unwrap();
        queue.close();
        match server.next().await {
            Some(Ok(Message::Close(_))) => {}
            other => panic!("expected a close frame, got {:?}", other),
        }
        let _ = server.close(None).await;
        drop(server);

        let events = client.await.unwrap();
        let first_event = events[0].as_ref().unwrap();
        assert_eq!(first_event.turn_complete, Some(true));
    }

    #[tokio::test]
    async fn test_abnormal_server_close_surfaces_as_protocol_error() {
        let (listener, backend) = live_server().await;
        let (_queue, ingress) = IngressQueue::new();

        let client = tokio::spawn(async move {
            let mut events = backend.connect(connect_request(), ingress).await.unwrap();
            events.next().await
        });
        let mut server = accept(&listener).await;
        next_json(&mut server).await;

        server
            .send(Message::Close(Some(CloseFrame {
                code: CloseCode::Policy,
                reason: "quota exceeded".into(),
            })))
            .await
            .unwrap();

        match client.await.unwrap() {
            Some(Err(BackendError::Protocol(msg))) => assert!(msg.contains("quota exceeded")),
            other => panic!("expected a protocol error, got {:?}", other),
        }
    }
}
