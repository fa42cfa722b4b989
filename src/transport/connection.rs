use super::handlers::dispatch;
use super::protocol::Packet;
use crate::coordinator::{Connection, ConnectionMeta, StateServer};
use crate::delivery::InstanceSocket;
use crate::error::{Result, StateError};
use crate::registry::ConnectionId;
use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use dashmap::DashMap;
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

/// Server side of one message socket.
///
/// Outgoing frames go through a channel drained by the writer task; replies
/// to server-initiated requests are matched by `cid`.
pub struct WsSocket {
    id: ConnectionId,
    outgoing: mpsc::UnboundedSender<String>,
    pending: DashMap<u64, oneshot::Sender<Result<Value>>>,
    next_cid: AtomicU64,
    open: AtomicBool,
    ack_timeout: Duration,
}

impl WsSocket {
    pub fn new(
        id: ConnectionId,
        outgoing: mpsc::UnboundedSender<String>,
        ack_timeout: Duration,
    ) -> Self {
        Self {
            id,
            outgoing,
            pending: DashMap::new(),
            next_cid: AtomicU64::new(1),
            open: AtomicBool::new(true),
            ack_timeout,
        }
    }

    fn send(&self, packet: &Packet) -> Result<()> {
        let text = serde_json::to_string(packet).map_err(|e| StateError::Encode(e.to_string()))?;
        self.outgoing
            .send(text)
            .map_err(|_| StateError::SocketClosed)
    }

    /// Answers a client request.
    pub fn respond(&self, rid: u64, result: Result<Value>) {
        if let Err(e) = self.send(&Packet::reply(rid, result)) {
            tracing::debug!("Dropping response {} for socket {}: {}", rid, self.id, e);
        }
    }

    /// Completes a pending `emit` with the client's answer.
    pub fn resolve(&self, rid: u64, result: Result<Value>) {
        match self.pending.remove(&rid) {
            Some((_, waiter)) => {
                let _ = waiter.send(result);
            }
            None => tracing::debug!("Unexpected response {} on socket {}", rid, self.id),
        }
    }

    /// Marks the socket closed and fails every pending `emit`.
    pub fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
        self.pending.clear();
    }
}

#[async_trait]
impl InstanceSocket for WsSocket {
    fn id(&self) -> &ConnectionId {
        &self.id
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    async fn emit(&self, event: &str, payload: Value) -> Result<Value> {
        if !self.is_open() {
            return Err(StateError::SocketClosed);
        }

        let cid = self.next_cid.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.pending.insert(cid, tx);

        let request = Packet::Request {
            cid,
            event: event.to_string(),
            data: payload,
        };
        if let Err(e) = self.send(&request) {
            self.pending.remove(&cid);
            return Err(e);
        }

        match tokio::time::timeout(self.ack_timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(StateError::SocketClosed),
            Err(_) => {
                self.pending.remove(&cid);
                Err(StateError::AckTimeout {
                    event: event.to_string(),
                    timeout_ms: self.ack_timeout.as_millis() as u64,
                })
            }
        }
    }
}

/// Serves one upgraded socket until it closes, then runs the leave logic.
pub async fn run(server: Arc<StateServer>, socket: WebSocket, meta: ConnectionMeta) {
    let id = ConnectionId::new();
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    let ws = Arc::new(WsSocket::new(id.clone(), tx, server.config().ack_timeout));
    server.attach(Connection {
        socket: ws.clone(),
        meta,
    });

    let writer = tokio::spawn(async move {
        while let Some(text) = rx.recv().await {
            if sink.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
        let _ = sink.close().await;
    });

    while let Some(message) = stream.next().await {
        match message {
            Ok(Message::Text(text)) => handle_frame(&server, &ws, &text).await,
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::warn!("Socket {} failed: {}", id, e);
                break;
            }
        }
    }

    ws.close();
    writer.abort();
    server.detach(&id).await;
}

async fn handle_frame(server: &Arc<StateServer>, ws: &WsSocket, text: &str) {
    let packet: Packet = match serde_json::from_str(text) {
        Ok(packet) => packet,
        Err(e) => {
            tracing::warn!("Malformed frame on socket {}: {}", ws.id(), e);
            return;
        }
    };

    match packet {
        Packet::Request { cid, event, data } => {
            tracing::debug!("Socket {} invoked {}", ws.id(), event);
            let result = dispatch(server, ws.id(), &event, data).await;
            ws.respond(cid, result);
        }
        Packet::Response { rid, data, error } => {
            let result = match error {
                Some(error) => Err(error.into()),
                None => Ok(data.unwrap_or(Value::Null)),
            };
            ws.resolve(rid, result);
        }
    }
}
