//! Wire protocol module
//!
//! This module contains the JSON message shape exchanged between timer clients
//! through the relay.

pub mod message;

// Re-export main types
pub use message::{MessageType, TimerMessage};
