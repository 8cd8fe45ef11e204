//! State management module
//!
//! This module contains the relay's live-connection registry and its counters.

pub mod relay_state;

// Re-export main types
pub use relay_state::{ConnectionId, Payload, RelayState, RelayStats};
