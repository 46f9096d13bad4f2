//! Gemini Live binding for the session relay.
//!
//! Implements [`mission_core::LiveBackend`] on top of the hosted
//! `BidiGenerateContent` WebSocket: ingress frames become `realtimeInput` /
//! `clientContent` messages, and server messages become backend events.

pub mod client;
pub mod types;

pub use client::{DEFAULT_LIVE_URL, GeminiLiveBackend};
