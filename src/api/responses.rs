//! API response structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::state::RelayStats;

/// Relay status response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub live_connections: usize,
    pub stats: RelayStats,
    pub uptime: String,
    pub port: u16,
    pub host: String,
    pub timestamp: DateTime<Utc>,
}

impl StatusResponse {
    pub fn new(live_connections: usize, stats: RelayStats, uptime: String, port: u16, host: String) -> Self {
        Self {
            live_connections,
            stats,
            uptime,
            port,
            host,
            timestamp: Utc::now(),
        }
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

impl HealthResponse {
    /// Create a new health response
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
