use crate::delivery::InstanceSocket;
use crate::handshake::InstanceType;
use crate::license::License;
use crate::reconnect::WindowMode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::net::IpAddr;
use std::sync::Arc;

/// Settings every master in the cluster must agree on.
///
/// The first master after a clean slate defines them.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSettings {
    #[serde(default, alias = "useClusterSecretKey")]
    pub use_secret_auth: bool,
    #[serde(default)]
    pub use_share_token_auth: bool,
}

impl std::fmt::Display for ClusterSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "UseSecretAuth: {}, UseShareTokenAuth: {}",
            self.use_secret_auth, self.use_share_token_auth
        )
    }
}

/// What the transport learned about a socket during the handshake.
#[derive(Debug, Clone)]
pub struct ConnectionMeta {
    pub remote_ip: IpAddr,
    /// Raw value of the configured forwarded-for header, if any.
    pub forwarded_for: Option<String>,
    pub instance_port: Option<u16>,
    pub instance_type: Option<InstanceType>,
}

/// A live socket plus its handshake metadata.
#[derive(Clone)]
pub struct Connection {
    pub socket: Arc<dyn InstanceSocket>,
    pub meta: ConnectionMeta,
}

// --- Requests ---

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrokerJoinRequest {
    pub instance_id: String,
    pub instance_ip: Option<String>,
    pub instance_ip_family: Option<String>,
    #[serde(default, alias = "instanceSecure")]
    pub secure: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerJoinRequest {
    pub instance_id: String,
    pub instance_ip: Option<String>,
    pub instance_ip_family: Option<String>,
    #[serde(default)]
    pub license: Option<License>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MasterRegisterRequest {
    pub instance_id: String,
    pub instance_ip: Option<String>,
    pub instance_ip_family: Option<String>,
    pub settings: ClusterSettings,
    #[serde(default)]
    pub shared_data: Value,
    #[serde(default)]
    pub license: Option<License>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MasterReconnectRequest {
    pub instance_id: String,
    pub instance_ip: Option<String>,
    pub instance_ip_family: Option<String>,
    #[serde(alias = "reconnectUUID")]
    pub reconnect_token: String,
    pub settings: ClusterSettings,
    #[serde(default)]
    pub shared_data: Value,
    #[serde(default)]
    pub was_leader: bool,
}

// --- Answers ---

/// Answer to `masterRegister`. None of these are errors.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "info", rename_all = "camelCase")]
pub enum RegisterAnswer {
    /// This master defined the cluster settings.
    #[serde(rename_all = "camelCase")]
    First { reconnect_token: String },
    #[serde(rename_all = "camelCase")]
    Ok {
        reconnect_token: String,
        shared_data: Value,
    },
    NotSameSettings,
    InstanceIdAlreadyReg,
    /// Registration deferred; try again after `try_in` ms.
    #[serde(rename_all = "camelCase")]
    ReconnectMode { try_in: u64, mode: WindowMode },
}

/// Answer to `masterReconnect`.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(tag = "info", rename_all = "camelCase")]
pub enum ReconnectAnswer {
    Ok,
    /// Another master already holds leadership; demote yourself.
    RemoveLeadership,
    #[serde(rename = "wrongReconnectUUID")]
    WrongReconnectToken,
    AlreadyJoined,
}

/// Effects of removing a master that the server must act on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MasterLeave {
    pub removed: bool,
    pub was_leader: bool,
    /// The registered set became empty and the wait window opened.
    pub cluster_emptied: bool,
}

/// Effects of a socket going away.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Disconnect {
    pub broker_removed: bool,
    pub worker_removed: bool,
    pub master: MasterLeave,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeaderCommit {
    Committed,
    /// Someone else became leader while the candidate was asked.
    AlreadyLed,
    /// The candidate left the joined set in the meantime.
    CandidateGone,
}

/// Helper to get the current system time in milliseconds.
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
