use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::bus::SnapshotBus;
use crate::error::ServerError;
use crate::state::{ControlAction, ControlEvent, ServerMessage};

// -------------------------------
// Inbound frames
// -------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientMessage {
    Ping,
    Control(ControlEvent),
}

impl ClientMessage {
    /// `None` for anything malformed or unrecognized; the caller drops it.
    pub fn from_json(txt: &str) -> Option<Self> {
        let v = serde_json::from_str::<serde_json::Value>(txt).ok()?;

        match v.get("type").and_then(|t| t.as_str()) {
            Some("ping") => return Some(ClientMessage::Ping),
            None | Some("control_input") => {}
            Some(_) => return None,
        }

        let action = ControlAction::parse(v.get("action")?.as_str()?)?;
        let active = v.get("active")?.as_bool()?;

        Some(ClientMessage::Control(ControlEvent { action, active }))
    }
}

pub async fn bind(addr: &str) -> Result<TcpListener, ServerError> {
    let listener = TcpListener::bind(addr).await.map_err(|source| ServerError::Bind {
        addr: addr.to_string(),
        source,
    })?;

    info!(addr = %listener.local_addr()?, "websocket listening");
    Ok(listener)
}

/// Accept observers forever. Each one gets the snapshot feed and may send
/// control events back.
pub async fn serve(listener: TcpListener, bus: SnapshotBus, controls: UnboundedSender<ControlEvent>) {
    loop {
        let (raw, peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                warn!(error = %e, "accept failed");
                continue;
            }
        };

        let bus = bus.clone();
        let controls = controls.clone();

        tokio::spawn(async move {
            if let Err(e) = handle_observer(raw, peer, bus, controls).await {
                debug!(%peer, error = %e, "observer connection ended with error");
            }
        });
    }
}

async fn handle_observer(
    raw: TcpStream,
    peer: SocketAddr,
    bus: SnapshotBus,
    controls: UnboundedSender<ControlEvent>,
) -> Result<(), ServerError> {
    let ws = accept_async(raw).await?;
    let (mut write, mut read) = ws.split();

    let observer_id = Uuid::new_v4();
    let mut feed = bus.subscribe();

    // -------------------------------
    // 1) Outgoing replies (welcome, pong)
    // -------------------------------
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let _ = tx.send(
        ServerMessage::Welcome { observer_id: observer_id.to_string() }.to_json(),
    );

    // -------------------------------
    // 2) Send loop: replies first, then snapshots
    // -------------------------------
    let send_task = tokio::spawn(async move {
        loop {
            let text = tokio::select! {
                biased;
                Some(reply) = rx.recv() => reply,
                snapshot = feed.recv() => match snapshot {
                    Some(s) => ServerMessage::CarSignal(s).to_json(),
                    None => break,
                },
            };
            if write.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    info!(%observer_id, %peer, observers = bus.observer_count(), "observer connected");

    // -------------------------------
    // 3) Receive loop
    // -------------------------------
    while let Some(msg) = read.next().await {
        let msg = match msg {
            Ok(m) => m,
            Err(_) => break,
        };

        if msg.is_close() {
            break;
        }
        let text = match msg.to_text() {
            Ok(t) if msg.is_text() => t,
            _ => continue,
        };

        match ClientMessage::from_json(text) {
            Some(ClientMessage::Ping) => {
                let _ = tx.send(ServerMessage::Pong.to_json());
            }
            Some(ClientMessage::Control(event)) => {
                if controls.send(event).is_err() {
                    // simulation gone
                    break;
                }
            }
            None => debug!(%observer_id, frame = text, "ignored malformed frame"),
        }
    }

    // dropping the feed takes this observer out of the broadcast set
    send_task.abort();
    let _ = send_task.await;
    info!(%observer_id, observers = bus.observer_count(), "observer disconnected");

    Ok(())
}
