//! Session initialization: capability negotiation and backend priming.
//!
//! The response modality is derived from the model identifier alone. Native-audio
//! models only speak, so they get audio output with both transcription directions
//! on. Every other model is driven as a text cascade.

use crate::{
    frame::MediaFrame,
    queue::{IngressQueue, QueueError},
};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

/// Model used when none is configured.
pub const DEFAULT_MODEL_ID: &str = "gemini-live-2.5-flash-preview-native-audio-09-2025";

/// Content of the synthetic first turn that wakes the backend up.
pub const PRIMING_TEXT: &str = "Hello";

const NATIVE_AUDIO_MARKERS: [&str; 3] = ["native-audio", "native_audio", "live"];

/// The single response channel a session is configured for.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResponseModality {
    Audio,
    Text,
}

impl fmt::Display for ResponseModality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseModality::Audio => write!(f, "AUDIO"),
            ResponseModality::Text => write!(f, "TEXT"),
        }
    }
}

/// Caller-requested toggles, taken from the connection's query string.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct SessionOptions {
    pub proactivity: bool,
    pub affective_dialog: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            proactivity: true,
            affective_dialog: false,
        }
    }
}

/// Immutable per-session backend configuration.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub model_id: String,
    pub response_modality: ResponseModality,
    pub input_transcription: bool,
    pub output_transcription: bool,
    pub session_resumption: bool,
    pub proactivity: bool,
    pub affective_dialog: bool,
}

impl SessionConfig {
    /// Decides the configuration for `model_id`. Never fails: a missing or blank
    /// identifier resolves to [`DEFAULT_MODEL_ID`].
    pub fn negotiate(model_id: Option<&str>, options: SessionOptions) -> Self {
        let model_id = resolve_model_id(model_id);

        let config = if is_native_audio(&model_id) {
            Self {
                model_id,
                response_modality: ResponseModality::Audio,
                input_transcription: true,
                output_transcription: true,
                session_resumption: true,
                proactivity: options.proactivity,
                affective_dialog: options.affective_dialog,
            }
        } else {
            // Text cascades support neither proactive audio nor affective dialog.
            Self {
                model_id,
                response_modality: ResponseModality::Text,
                input_transcription: false,
                output_transcription: false,
                session_resumption: true,
                proactivity: false,
                affective_dialog: false,
            }
        };

        info!(
            model = %config.model_id,
            modality = %config.response_modality,
            proactivity = config.proactivity,
            affective_dialog = config.affective_dialog,
            "Session model configured."
        );
        config
    }

    pub fn response_modalities(&self) -> &[ResponseModality] {
        std::slice::from_ref(&self.response_modality)
    }
}

/// Picks the configured model or falls back to the default.
pub fn resolve_model_id(model_id: Option<&str>) -> String {
    model_id
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .unwrap_or(DEFAULT_MODEL_ID)
        .to_string()
}

/// Case-insensitive check for a native-audio or live marker in the identifier.
pub fn is_native_audio(model_id: &str) -> bool {
    let lowered = model_id.to_lowercase();
    NATIVE_AUDIO_MARKERS.iter().any(|m| lowered.contains(m))
}

/// Enqueues the priming frame. Must run before any client frame is pushed.
pub fn prime(queue: &IngressQueue) -> Result<usize, QueueError> {
    info!("Sending initial '{}' stimulus to model.", PRIMING_TEXT);
    queue.push(MediaFrame::text(PRIMING_TEXT))
}
