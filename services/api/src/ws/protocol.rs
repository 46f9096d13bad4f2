//! Defines the WebSocket message protocol between the browser client and the relay.
//!
//! Inbound, the client sends raw PCM as binary messages, or JSON envelopes as
//! text messages. Outbound, every message is a JSON-serialized backend event.

use super::error::RelayError;
use axum::extract::ws::Message;
use base64::Engine;
use bytes::Bytes;
use mission_core::MediaFrame;
use serde::Deserialize;

/// One message read off the client connection, independent of the transport.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientFrame {
    Binary(Bytes),
    Text(String),
    Closed,
}

/// JSON envelope carried by text messages.
#[derive(Deserialize, Debug)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientEnvelope {
    /// A typed user message.
    Text { text: String },
    /// A base64 PCM16 microphone chunk.
    Audio {
        #[serde(default)]
        data: String,
    },
    /// A base64 camera frame.
    Image {
        data: String,
        #[serde(rename = "mimeType")]
        mime_type: Option<String>,
    },
}

impl ClientFrame {
    /// Maps an axum WebSocket read. Ping and pong carry nothing for the relay.
    pub fn from_ws(message: Result<Message, axum::Error>) -> Option<Result<ClientFrame, RelayError>> {
        match message {
            Ok(Message::Binary(data)) => Some(Ok(ClientFrame::Binary(data))),
            Ok(Message::Text(text)) => Some(Ok(ClientFrame::Text(text.to_string()))),
            Ok(Message::Close(_)) => Some(Ok(ClientFrame::Closed)),
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => None,
            Err(e) => Some(Err(RelayError::ClientDisconnected(e.to_string()))),
        }
    }
}

impl ClientEnvelope {
    /// Decodes the transport encoding and builds the frame. Bad base64 yields `None`.
    pub fn into_frame(self) -> Option<MediaFrame> {
        match self {
            ClientEnvelope::Text { text } => Some(MediaFrame::text(text)),
            ClientEnvelope::Audio { data } => decode_base64(&data).map(MediaFrame::audio),
            ClientEnvelope::Image { data, mime_type } => {
                decode_base64(&data).map(|bytes| MediaFrame::image(bytes, mime_type))
            }
        }
    }
}

/// Parses a text message into a frame. Malformed or unknown envelopes yield `None`.
pub fn decode_text_message(text: &str) -> Option<MediaFrame> {
    serde_json::from_str::<ClientEnvelope>(text)
        .ok()?
        .into_frame()
}

fn decode_base64(data: &str) -> Option<Vec<u8>> {
    base64::engine::general_purpose::STANDARD.decode(data).ok()
}
