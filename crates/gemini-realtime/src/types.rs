//! Wire types for the Live `BidiGenerateContent` WebSocket protocol.

use base64::Engine;
use mission_core::{
    FrameKind, MediaFrame, SessionConfig,
    event::{Content as EventContent, ToolCall, Transcription},
    initializer::ResponseModality,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// --- Outgoing ---

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub enum ClientMessage {
    Setup(Setup),
    RealtimeInput(RealtimeInput),
    ClientContent(ClientContent),
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Setup {
    pub model: String,
    pub generation_config: GenerationConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_audio_transcription: Option<EmptyConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_audio_transcription: Option<EmptyConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_resumption: Option<EmptyConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proactivity: Option<ProactivityConfig>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_modalities: Vec<ResponseModality>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_affective_dialog: Option<bool>,
}

/// Serializes as `{}`; presence alone switches the feature on.
#[derive(Serialize, Debug, PartialEq)]
pub struct EmptyConfig {}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ProactivityConfig {
    pub proactive_audio: bool,
}

#[derive(Serialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio: Option<Blob>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video: Option<Blob>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ClientContent {
    pub turns: Vec<Turn>,
    pub turn_complete: bool,
}

#[derive(Serialize, Debug)]
pub struct Turn {
    pub role: String,
    pub parts: Vec<TextPart>,
}

#[derive(Serialize, Debug)]
pub struct TextPart {
    pub text: String,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Blob {
    pub mime_type: String,
    pub data: String,
}

impl Setup {
    pub fn from_config(config: &SessionConfig) -> Self {
        let model = if config.model_id.starts_with("models/") {
            config.model_id.clone()
        } else {
            format!("models/{}", config.model_id)
        };
        let enabled = |on: bool| on.then_some(EmptyConfig {});
        Self {
            model,
            generation_config: GenerationConfig {
                response_modalities: config.response_modalities().to_vec(),
                enable_affective_dialog: config.affective_dialog.then_some(true),
            },
            input_audio_transcription: enabled(config.input_transcription),
            output_audio_transcription: enabled(config.output_transcription),
            session_resumption: enabled(config.session_resumption),
            proactivity: config.proactivity.then_some(ProactivityConfig {
                proactive_audio: true,
            }),
        }
    }
}

impl ClientMessage {
    /// Text becomes a complete user turn; media goes out as realtime input.
    pub fn from_frame(frame: &MediaFrame) -> Self {
        match frame.kind() {
            FrameKind::Text => ClientMessage::ClientContent(ClientContent {
                turns: vec![Turn {
                    role: "user".to_string(),
                    parts: vec![TextPart {
                        text: String::from_utf8_lossy(frame.payload()).into_owned(),
                    }],
                }],
                turn_complete: true,
            }),
            FrameKind::Audio | FrameKind::BinaryAudio => {
                ClientMessage::RealtimeInput(RealtimeInput {
                    audio: Some(Blob::from_frame(frame)),
                    ..Default::default()
                })
            }
            FrameKind::Image => ClientMessage::RealtimeInput(RealtimeInput {
                video: Some(Blob::from_frame(frame)),
                ..Default::default()
            }),
        }
    }
}

impl Blob {
    fn from_frame(frame: &MediaFrame) -> Self {
        Self {
            mime_type: frame.mime_type().unwrap_or_default().to_string(),
            data: base64::engine::general_purpose::STANDARD.encode(frame.payload()),
        }
    }
}

// --- Incoming ---

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct ServerMessage {
    pub setup_complete: Option<Value>,
    pub server_content: Option<ServerContent>,
    pub tool_call: Option<ToolCall>,
    pub tool_call_cancellation: Option<Value>,
    pub go_away: Option<Value>,
    pub session_resumption_update: Option<Value>,
    pub usage_metadata: Option<Value>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct ServerContent {
    pub model_turn: Option<EventContent>,
    pub input_transcription: Option<Transcription>,
    pub output_transcription: Option<Transcription>,
    pub turn_complete: Option<bool>,
    pub generation_complete: Option<bool>,
    pub interrupted: Option<bool>,
}
