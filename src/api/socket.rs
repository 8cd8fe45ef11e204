//! Per-connection WebSocket pump for the broadcast relay

use std::sync::Arc;
use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tracing::{debug, error, warn};

use crate::state::{Payload, RelayState};

/// Drive one client connection until it closes.
///
/// Outbound frames are written by a dedicated task draining the connection's
/// queue; inbound frames are handed to the relay one at a time, so frames from
/// this client reach every recipient in the order they were read.
pub async fn handle_socket(socket: WebSocket, state: Arc<RelayState>) {
    let (id, mut outbound) = match state.on_connect() {
        Ok(registered) => registered,
        Err(e) => {
            error!("Failed to register connection: {}", e);
            return;
        }
    };

    let (mut ws_sender, mut ws_receiver) = socket.split();

    let mut writer = tokio::spawn(async move {
        while let Some(payload) = outbound.recv().await {
            let frame = match payload {
                Payload::Text(text) => Message::Text(text),
                Payload::Binary(bytes) => Message::Binary(bytes),
            };
            if let Err(e) = ws_sender.send(frame).await {
                debug!("Client {} write failed: {}", id, e);
                break;
            }
        }
    });

    loop {
        tokio::select! {
            frame = ws_receiver.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    state.on_message(id, Payload::Text(text));
                }
                Some(Ok(Message::Binary(bytes))) => {
                    state.on_message(id, Payload::Binary(bytes));
                }
                Some(Ok(Message::Close(_))) | None => {
                    debug!("Client {} closed the connection", id);
                    break;
                }
                // Ping/pong are answered by axum
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!("Client {} read error: {}", id, e);
                    break;
                }
            },
            _ = &mut writer => {
                debug!("Client {} writer stopped", id);
                break;
            }
        }
    }

    state.on_disconnect(id);
    writer.abort();
}
