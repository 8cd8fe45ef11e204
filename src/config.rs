//! Configuration and CLI argument handling

use clap::Parser;

/// Relay server arguments
#[derive(Parser, Debug, Clone)]
#[command(name = "rest-timer-sync")]
#[command(about = "WebSocket relay keeping workout rest timers in sync across devices")]
#[command(version)]
pub struct Config {
    /// Port to bind the server to
    #[arg(short, long, default_value = "5000")]
    pub port: u16,

    /// Host address to bind to
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    /// Path the WebSocket relay is served on
    #[arg(long, default_value = "/ws")]
    pub ws_path: String,

    /// Frames queued per connection before the relay drops further ones
    #[arg(long, default_value = "256")]
    pub queue_capacity: usize,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    /// Parse configuration from command line arguments
    pub fn parse() -> Self {
        Parser::parse()
    }

    /// Get the server address as a formatted string
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get the appropriate log level based on verbose flag
    pub fn log_level(&self) -> &'static str {
        log_level(self.verbose)
    }
}

/// Terminal timer client arguments
#[derive(Parser, Debug, Clone)]
#[command(name = "rest-timer")]
#[command(about = "Countdown rest timer synchronized with other devices in the same session")]
#[command(version)]
pub struct ClientConfig {
    /// Relay WebSocket URL
    #[arg(short, long, default_value = "ws://127.0.0.1:5000/ws")]
    pub url: String,

    /// Workout session identifier shared by all synchronized devices
    #[arg(short, long)]
    pub session: String,

    /// Exercise the rest timer belongs to
    #[arg(short, long, default_value = "Rest")]
    pub exercise: String,

    /// Countdown length in seconds
    #[arg(short, long, default_value = "60")]
    pub duration: u32,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl ClientConfig {
    /// Parse configuration from command line arguments
    pub fn parse() -> Self {
        Parser::parse()
    }

    pub fn log_level(&self) -> &'static str {
        log_level(self.verbose)
    }
}

fn log_level(verbose: bool) -> &'static str {
    if verbose { "debug" } else { "info" }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_defaults() {
        let config = Config::try_parse_from(["rest-timer-sync"]).unwrap();
        assert_eq!(config.address(), "0.0.0.0:5000");
        assert_eq!(config.ws_path, "/ws");
        assert_eq!(config.queue_capacity, 256);
        assert_eq!(config.log_level(), "info");

        let config = Config::try_parse_from(["rest-timer-sync", "--queue-capacity", "16"]).unwrap();
        assert_eq!(config.queue_capacity, 16);
    }

    #[test]
    fn client_requires_session() {
        assert!(ClientConfig::try_parse_from(["rest-timer"]).is_err());

        let config =
            ClientConfig::try_parse_from(["rest-timer", "--session", "abc", "-d", "90", "-v"]).unwrap();
        assert_eq!(config.session, "abc");
        assert_eq!(config.duration, 90);
        assert_eq!(config.exercise, "Rest");
        assert_eq!(config.log_level(), "debug");
    }
}
