//! WebSocket Session Relay
//!
//! This module bridges one client WebSocket to one live backend session. It is
//! structured into submodules:
//!
//! - `protocol`: The client message envelope and its decoding into media frames.
//! - `upstream`: Client → backend loop feeding the ingress queue.
//! - `downstream`: Backend → client loop forwarding backend events.
//! - `supervisor`: Session opening and fail-together supervision of both loops.
//! - `session`: The axum WebSocket handler tying a connection to a session.

pub mod downstream;
pub mod error;
pub mod protocol;
pub mod session;
pub mod supervisor;
pub mod upstream;

pub use error::RelayError;
pub use session::ws_handler;
pub use supervisor::{Relay, RelaySession, SessionOutcome, SessionState};
