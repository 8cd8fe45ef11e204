//! Client-side timer module
//!
//! This module contains the countdown state machine, the connection to the
//! relay, the completion alert and the controller that ties them together.

pub mod alert;
pub mod channel;
pub mod controller;
pub mod state;

// Re-export main types
pub use alert::{CompletionAlert, TerminalBell, Tone, ToneAlert};
pub use channel::SyncChannel;
pub use controller::{TimerController, TimerOptions};
pub use state::{RemoteEffect, TimerSnapshot, TimerState};
