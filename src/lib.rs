//! Rest Timer Sync - real-time workout timer synchronization
//!
//! This library provides the broadcast relay that fans timer messages out to
//! every connected client, and the timer controller each client runs to keep
//! its countdown in step with the rest of its workout session.

pub mod config;
pub mod protocol;
pub mod state;
pub mod api;
pub mod timer;
pub mod utils;

// Re-export commonly used types
pub use config::{ClientConfig, Config};
pub use protocol::{MessageType, TimerMessage};
pub use state::RelayState;
pub use api::create_router;
pub use timer::{TimerController, TimerOptions, TimerSnapshot};
pub use utils::signals::shutdown_signal;
