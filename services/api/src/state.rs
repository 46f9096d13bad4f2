//! Shared Application State
//!
//! This module defines the `AppState` struct, which holds the relay wiring
//! shared by all handlers.

use crate::ws::Relay;

/// The shared application state, created once at startup and passed to all handlers.
pub struct AppState {
    pub relay: Relay,
}
