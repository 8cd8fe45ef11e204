//! Broadcast relay state: the set of live connections

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Mutex,
    },
    time::Instant,
};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, error, info, warn};

/// Frames a single recipient may have waiting before further ones are dropped
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Identifier assigned to each accepted connection
pub type ConnectionId = u64;

/// Opaque frame forwarded by the relay without interpretation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Text(String),
    Binary(Vec<u8>),
}

impl Payload {
    pub fn len(&self) -> usize {
        match self {
            Payload::Text(text) => text.len(),
            Payload::Binary(bytes) => bytes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Relay counters exposed on the status endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelayStats {
    pub connections_accepted: u64,
    pub messages_received: u64,
    pub messages_forwarded: u64,
    pub forward_failures: u64,
}

/// Relay state shared by every connection handler.
///
/// The connection map is written only by `on_connect` and `on_disconnect`
/// and read by `on_message`. Each recipient's outbound queue is bounded; a
/// recipient that stops reading loses frames instead of growing the relay.
#[derive(Debug)]
pub struct RelayState {
    connections: Mutex<HashMap<ConnectionId, mpsc::Sender<Payload>>>,
    next_id: AtomicU64,
    queue_capacity: usize,
    stats: Mutex<RelayStats>,
    /// Server metadata
    pub start_time: Instant,
    pub port: u16,
    pub host: String,
}

impl RelayState {
    /// Create an empty relay
    pub fn new(port: u16, host: String) -> Self {
        Self::with_queue_capacity(port, host, DEFAULT_QUEUE_CAPACITY)
    }

    /// Create an empty relay whose per-connection queues hold `capacity` frames
    pub fn with_queue_capacity(port: u16, host: String, capacity: usize) -> Self {
        Self {
            connections: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            queue_capacity: capacity.max(1),
            stats: Mutex::new(RelayStats::default()),
            start_time: Instant::now(),
            port,
            host,
        }
    }

    /// Register a new connection and hand back its outbound queue
    pub fn on_connect(&self) -> Result<(ConnectionId, mpsc::Receiver<Payload>), String> {
        let (tx, rx) = mpsc::channel(self.queue_capacity);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        let mut connections = self.connections.lock()
            .map_err(|e| format!("Failed to lock connection set: {}", e))?;
        connections.insert(id, tx);
        let live = connections.len();
        drop(connections);

        self.record(|stats| stats.connections_accepted += 1);
        info!("Client {} connected ({} live)", id, live);
        Ok((id, rx))
    }

    /// Forward a payload to every live connection except its sender.
    ///
    /// Returns the number of copies handed to recipients. Never waits on a
    /// recipient: one whose queue is full or closed is logged and skipped, and
    /// nothing is surfaced to the caller.
    pub fn on_message(&self, from: ConnectionId, payload: Payload) -> usize {
        self.record(|stats| stats.messages_received += 1);

        let connections = match self.connections.lock() {
            Ok(connections) => connections,
            Err(e) => {
                error!("Failed to lock connection set: {}", e);
                return 0;
            }
        };

        let mut delivered = 0;
        let mut failed = 0;
        for (&id, tx) in connections.iter() {
            if id == from {
                continue;
            }
            if tx.is_closed() {
                debug!("Skipping client {}: outbound queue closed", id);
                failed += 1;
                continue;
            }
            match tx.try_send(payload.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    warn!("Dropping message for client {}: outbound queue full", id);
                    failed += 1;
                }
                Err(TrySendError::Closed(_)) => {
                    warn!("Failed to forward message to client {}: queue closed", id);
                    failed += 1;
                }
            }
        }
        drop(connections);

        debug!("Relayed {} bytes from client {} to {} clients", payload.len(), from, delivered);
        self.record(|stats| {
            stats.messages_forwarded += delivered as u64;
            stats.forward_failures += failed;
        });
        delivered
    }

    /// Remove a connection. Returns false if it was already gone.
    pub fn on_disconnect(&self, id: ConnectionId) -> bool {
        let mut connections = match self.connections.lock() {
            Ok(connections) => connections,
            Err(e) => {
                error!("Failed to lock connection set: {}", e);
                return false;
            }
        };

        let removed = connections.remove(&id).is_some();
        let live = connections.len();
        drop(connections);

        if removed {
            info!("Client {} disconnected ({} live)", id, live);
        } else {
            debug!("Client {} already removed", id);
        }
        removed
    }

    /// Number of currently registered connections
    pub fn connection_count(&self) -> usize {
        self.connections.lock().map(|c| c.len()).unwrap_or(0)
    }

    /// Snapshot of the relay counters
    pub fn stats(&self) -> Result<RelayStats, String> {
        self.stats.lock()
            .map(|stats| stats.clone())
            .map_err(|e| format!("Failed to lock relay stats: {}", e))
    }

    /// Calculate server uptime as a formatted string
    pub fn get_uptime(&self) -> String {
        let duration = self.start_time.elapsed();
        let hours = duration.as_secs() / 3600;
        let minutes = (duration.as_secs() % 3600) / 60;
        let seconds = duration.as_secs() % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}s", seconds)
        }
    }

    fn record<F>(&self, update: F)
    where
        F: FnOnce(&mut RelayStats),
    {
        match self.stats.lock() {
            Ok(mut stats) => update(&mut stats),
            Err(e) => warn!("Failed to update relay stats: {}", e),
        }
    }
}
