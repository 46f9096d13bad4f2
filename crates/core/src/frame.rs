//! Media frames: the classified, decoded unit of client input bound for the backend.

use bytes::Bytes;
use std::fmt;

/// MIME type attached to every microphone chunk (16 kHz mono PCM16).
pub const PCM_MIME_TYPE: &str = "audio/pcm;rate=16000";

/// MIME type used for camera frames that don't declare one.
pub const DEFAULT_IMAGE_MIME_TYPE: &str = "image/jpeg";

/// What a frame carries. The relay never inspects the payload beyond this tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameKind {
    /// A user text turn.
    Text,
    /// Audio that arrived inside a JSON envelope (base64 on the wire).
    Audio,
    /// A still image, typically a camera frame.
    Image,
    /// Audio that arrived as a raw binary WebSocket message.
    BinaryAudio,
}

impl FrameKind {
    /// True for both audio variants; the backend treats them identically.
    pub fn is_audio(self) -> bool {
        matches!(self, FrameKind::Audio | FrameKind::BinaryAudio)
    }
}

impl fmt::Display for FrameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameKind::Text => write!(f, "text"),
            FrameKind::Audio => write!(f, "audio"),
            FrameKind::Image => write!(f, "image"),
            FrameKind::BinaryAudio => write!(f, "binary-audio"),
        }
    }
}

/// One unit of client input, already stripped of any transport encoding.
///
/// The constructors are the only way to build a frame, which keeps the
/// `mime_type` rule in one place: present for media, absent for text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFrame {
    kind: FrameKind,
    payload: Bytes,
    mime_type: Option<String>,
}

impl MediaFrame {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            kind: FrameKind::Text,
            payload: Bytes::from(text.into()),
            mime_type: None,
        }
    }

    /// Decoded PCM from a JSON `audio` envelope.
    pub fn audio(pcm: impl Into<Bytes>) -> Self {
        Self {
            kind: FrameKind::Audio,
            payload: pcm.into(),
            mime_type: Some(PCM_MIME_TYPE.to_string()),
        }
    }

    /// Raw PCM from a binary WebSocket message.
    pub fn binary_audio(pcm: impl Into<Bytes>) -> Self {
        Self {
            kind: FrameKind::BinaryAudio,
            payload: pcm.into(),
            mime_type: Some(PCM_MIME_TYPE.to_string()),
        }
    }

    /// Decoded image bytes. A missing or blank MIME type falls back to JPEG.
    pub fn image(data: impl Into<Bytes>, mime_type: Option<String>) -> Self {
        let mime_type = mime_type
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_IMAGE_MIME_TYPE.to_string());
        Self {
            kind: FrameKind::Image,
            payload: data.into(),
            mime_type: Some(mime_type),
        }
    }

    pub fn kind(&self) -> FrameKind {
        self.kind
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    pub fn mime_type(&self) -> Option<&str> {
        self.mime_type.as_deref()
    }

    /// The payload as UTF-8, for text frames only.
    pub fn as_text(&self) -> Option<&str> {
        match self.kind {
            FrameKind::Text => std::str::from_utf8(&self.payload).ok(),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}
