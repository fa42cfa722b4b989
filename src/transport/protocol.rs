//! Message Socket Protocol
//!
//! Event names and frame layouts exchanged over the message socket.
//!
//! Every frame is one JSON text message. Either side may send a request;
//! the other side answers it with exactly one response carrying the
//! request's `cid` as `rid`.

use crate::error::StateError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// --- HTTP Endpoints ---

/// Liveness probe, answered outside the message protocol.
pub const ENDPOINT_HEALTH_CHECK: &str = "/health-check";

// --- Client -> Server Events ---

pub const EVENT_BROKER_JOIN: &str = "brokerJoin";
pub const EVENT_BROKER_LEAVE: &str = "brokerLeave";
pub const EVENT_WORKER_JOIN: &str = "workerJoin";
pub const EVENT_WORKER_LEAVE: &str = "workerLeave";
pub const EVENT_MASTER_REGISTER: &str = "masterRegister";
pub const EVENT_MASTER_RECONNECT: &str = "masterReconnect";
pub const EVENT_MASTER_JOIN: &str = "masterJoin";
pub const EVENT_MASTER_LEAVE: &str = "masterLeave";
/// Diagnostic snapshot; payload `true` asks for the dynamic part only.
pub const EVENT_STATE: &str = "state";

// --- Frames ---

/// One message on the socket.
///
/// Requests carry `cid` and `event`, responses carry `rid`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Packet {
    Request {
        cid: u64,
        event: String,
        #[serde(default)]
        data: Value,
    },
    Response {
        rid: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<WireError>,
    },
}

impl Packet {
    pub fn reply(rid: u64, result: Result<Value, StateError>) -> Self {
        match result {
            Ok(data) => Packet::Response {
                rid,
                data: Some(data),
                error: None,
            },
            Err(e) => Packet::Response {
                rid,
                data: None,
                error: Some(WireError::from(&e)),
            },
        }
    }
}

/// Error body used in responses and handshake refusals.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WireError {
    pub name: String,
    pub message: String,
}

impl From<&StateError> for WireError {
    fn from(err: &StateError) -> Self {
        Self {
            name: err.name().to_string(),
            message: err.to_string(),
        }
    }
}

impl From<WireError> for StateError {
    fn from(err: WireError) -> Self {
        StateError::Remote {
            name: err.name,
            message: err.message,
        }
    }
}
