//! Backend events: one unit of output from the live session.
//!
//! Every sub-field is optional. The relay forwards events whole and only peeks
//! at tool calls and final transcripts for logging.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BackendEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Content>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call: Option<ToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_transcription: Option<Transcription>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_transcription: Option<Transcription>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub turn_complete: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interrupted: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partial: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Fields this relay has no opinion on, carried through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Model output. Parts are opaque to the relay.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parts: Vec<Value>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ToolCall {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub function_calls: Vec<FunctionCall>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FunctionCall {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub args: Value,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Transcription {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished: Option<bool>,
}

impl Transcription {
    /// The transcript text, only once the backend has marked it finished.
    pub fn final_text(&self) -> Option<&str> {
        if self.finished != Some(true) {
            return None;
        }
        self.text.as_deref().filter(|t| !t.trim().is_empty())
    }
}

/// Logging signals pulled out of an event. Absent fields just stay `None`.
#[derive(Debug, Default, PartialEq)]
pub struct EventSignals<'a> {
    pub tool_calls: Option<&'a [FunctionCall]>,
    pub input_transcript: Option<&'a str>,
    pub output_transcript: Option<&'a str>,
}

impl BackendEvent {
    pub fn signals(&self) -> EventSignals<'_> {
        EventSignals {
            tool_calls: self
                .tool_call
                .as_ref()
                .map(|tc| tc.function_calls.as_slice())
                .filter(|calls| !calls.is_empty()),
            input_transcript: self
                .input_transcription
                .as_ref()
                .and_then(Transcription::final_text),
            output_transcript: self
                .output_transcription
                .as_ref()
                .and_then(Transcription::final_text),
        }
    }

    /// Serializes the whole event for the client, leaving out absent fields.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
