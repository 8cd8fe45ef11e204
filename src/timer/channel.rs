//! Client side of the synchronization channel

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};
use futures::{SinkExt, StreamExt};
use tokio::{sync::mpsc, task::JoinHandle, time::timeout};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

/// How long the background handshake may take before sync is given up
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// How long closing waits for the writer to flush the close frame
const CLOSE_GRACE: Duration = Duration::from_secs(1);

/// Persistent connection to the relay, owned by one timer controller.
///
/// Frames are plain JSON text. Sending never blocks; a channel that is not
/// yet open, or already closed, reports an error the caller is expected to
/// log and move past.
#[derive(Debug)]
pub struct SyncChannel {
    outbound: Option<mpsc::UnboundedSender<String>>,
    inbound: mpsc::UnboundedReceiver<String>,
    connected: Arc<AtomicBool>,
    connection: Option<JoinHandle<()>>,
}

impl SyncChannel {
    /// Start connecting to the relay at `url` in the background.
    ///
    /// Returns at once. Sends are refused until the handshake completes; if it
    /// fails or exceeds `CONNECT_TIMEOUT` the inbound side ends and the
    /// channel stays closed.
    pub fn open(url: &str) -> Self {
        Self::open_with_timeout(url, CONNECT_TIMEOUT)
    }

    pub fn open_with_timeout(url: &str, connect_timeout: Duration) -> Self {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel::<String>();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel::<String>();
        let connected = Arc::new(AtomicBool::new(false));

        let connection = tokio::spawn(run_connection(
            url.to_string(),
            connect_timeout,
            outbound_rx,
            inbound_tx,
            Arc::clone(&connected),
        ));

        Self {
            outbound: Some(outbound_tx),
            inbound: inbound_rx,
            connected,
            connection: Some(connection),
        }
    }

    /// A channel that never connects. Sends fail soft and nothing is received.
    pub fn detached() -> Self {
        let (_, inbound) = mpsc::unbounded_channel();
        Self {
            outbound: None,
            inbound,
            connected: Arc::new(AtomicBool::new(false)),
            connection: None,
        }
    }

    /// Wrap an existing, already open transport given as a pair of text queues
    pub fn from_parts(
        outbound: mpsc::UnboundedSender<String>,
        inbound: mpsc::UnboundedReceiver<String>,
    ) -> Self {
        Self {
            outbound: Some(outbound),
            inbound,
            connected: Arc::new(AtomicBool::new(true)),
            connection: None,
        }
    }

    /// Shared flag that is true while the relay connection is established
    pub fn connected_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.connected)
    }

    pub fn is_open(&self) -> bool {
        self.connected.load(Ordering::Acquire)
            && self.outbound.as_ref().is_some_and(|tx| !tx.is_closed())
    }

    /// Queue a text frame for the relay
    pub fn send(&self, text: String) -> Result<(), String> {
        let Some(tx) = &self.outbound else {
            return Err("channel not connected".to_string());
        };
        if !self.connected.load(Ordering::Acquire) {
            return Err("channel not yet open".to_string());
        }
        tx.send(text).map_err(|_| "channel closed".to_string())
    }

    /// Next inbound frame; `None` once the relay side is gone
    pub async fn recv(&mut self) -> Option<String> {
        self.inbound.recv().await
    }

    /// Close the connection. Safe to call more than once.
    pub async fn close(&mut self) {
        if self.outbound.take().is_none() {
            return;
        }
        self.inbound.close();

        if let Some(connection) = self.connection.take() {
            if !self.connected.load(Ordering::Acquire) {
                // Still handshaking, or already gone: nothing to flush
                connection.abort();
            } else if timeout(CLOSE_GRACE, connection).await.is_err() {
                debug!("Timer sync writer did not finish within {:?}", CLOSE_GRACE);
            }
        }
        self.connected.store(false, Ordering::Release);
        debug!("Timer sync channel closed");
    }
}

impl Drop for SyncChannel {
    fn drop(&mut self) {
        if let Some(connection) = self.connection.take() {
            connection.abort();
        }
    }
}

/// Handshake, then pump frames both ways until either side ends
async fn run_connection(
    url: String,
    connect_timeout: Duration,
    mut outbound_rx: mpsc::UnboundedReceiver<String>,
    inbound_tx: mpsc::UnboundedSender<String>,
    connected: Arc<AtomicBool>,
) {
    let stream = match timeout(connect_timeout, connect_async(url.as_str())).await {
        Ok(Ok((stream, _))) => stream,
        Ok(Err(e)) => {
            warn!("Timer sync unavailable ({}), counting down locally", e);
            return;
        }
        Err(_) => {
            warn!("Timer sync handshake with {} timed out after {:?}, counting down locally", url, connect_timeout);
            return;
        }
    };
    connected.store(true, Ordering::Release);
    info!("Timer sync connected to {}", url);

    let (mut ws_sender, mut ws_receiver) = stream.split();

    let writer = async {
        while let Some(text) = outbound_rx.recv().await {
            if let Err(e) = ws_sender.send(Message::Text(text)).await {
                warn!("Timer sync send failed: {}", e);
                return;
            }
        }
        if let Err(e) = ws_sender.send(Message::Close(None)).await {
            debug!("Timer sync close frame not sent: {}", e);
        }
    };

    let reader = async {
        while let Some(frame) = ws_receiver.next().await {
            let text = match frame {
                Ok(Message::Text(text)) => text,
                Ok(Message::Binary(bytes)) => match String::from_utf8(bytes) {
                    Ok(text) => text,
                    Err(_) => {
                        debug!("Dropping non UTF-8 binary frame");
                        continue;
                    }
                },
                Ok(Message::Close(_)) => {
                    info!("Timer sync connection closed by relay");
                    break;
                }
                Ok(_) => continue,
                Err(e) => {
                    warn!("Timer sync read error: {}", e);
                    break;
                }
            };
            if inbound_tx.send(text).is_err() {
                break;
            }
        }
    };

    tokio::select! {
        _ = writer => {}
        _ = reader => {}
    }
    connected.store(false, Ordering::Release);
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn detached_channel_fails_soft() {
        let mut channel = SyncChannel::detached();
        assert!(!channel.is_open());
        assert!(channel.send("{}".into()).is_err());
        assert_eq!(channel.recv().await, None);
        channel.close().await;
        channel.close().await;
    }

    #[tokio::test]
    async fn in_memory_transport_round_trip() {
        let (out_tx, mut out_rx) = mpsc::unbounded_channel();
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        let mut channel = SyncChannel::from_parts(out_tx, in_rx);

        assert!(channel.is_open());
        channel.send("ping".into()).unwrap();
        assert_eq!(out_rx.recv().await.as_deref(), Some("ping"));

        in_tx.send("pong".into()).unwrap();
        assert_eq!(channel.recv().await.as_deref(), Some("pong"));

        channel.close().await;
        assert!(!channel.is_open());
        assert!(channel.send("late".into()).is_err());
        assert_eq!(out_rx.recv().await, None);
    }

    #[tokio::test]
    async fn unreachable_relay_ends_inbound() {
        let mut channel = SyncChannel::open("ws://127.0.0.1:1/ws");
        assert!(!channel.is_open());
        assert!(channel.send("{}".into()).is_err());

        let end = timeout(Duration::from_secs(5), channel.recv()).await;
        assert_eq!(end.unwrap(), None);
        assert!(!channel.is_open());
    }

    #[tokio::test]
    async fn silent_relay_does_not_block_and_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let holder = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let mut channel =
            SyncChannel::open_with_timeout(&format!("ws://{}/ws", addr), Duration::from_millis(300));
        assert!(!channel.is_open());
        assert_eq!(channel.send("{}".into()), Err("channel not yet open".to_string()));

        let end = timeout(Duration::from_secs(5), channel.recv()).await;
        assert_eq!(end.unwrap(), None);

        timeout(Duration::from_secs(1), channel.close()).await.unwrap();
        holder.abort();
    }
}
