use crate::license::License;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub String);

impl ConnectionId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum IpFamily {
    IPv4,
    IPv6,
}

impl IpFamily {
    /// Infers the family from the textual address; anything that is not a
    /// plain IPv4 literal but contains a colon is treated as IPv6.
    pub fn infer(ip: &str) -> Self {
        match ip.parse::<IpAddr>() {
            Ok(IpAddr::V4(_)) => IpFamily::IPv4,
            Ok(IpAddr::V6(_)) => IpFamily::IPv6,
            Err(_) if ip.contains(':') => IpFamily::IPv6,
            Err(_) => IpFamily::IPv4,
        }
    }
}

/// Represents one connected broker or worker.
///
/// Created on a successful join and dropped on leave or disconnect.
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceRecord {
    pub connection_id: ConnectionId,
    pub instance_id: String,
    pub ip: String,
    pub ip_family: IpFamily,
    pub port: Option<u16>,
    /// Only meaningful for brokers.
    pub secure: bool,
    pub license: Option<License>,
}

impl InstanceRecord {
    /// `ws://host:port` or `wss://host:port`, host bracketed for IPv6.
    pub fn uri(&self) -> String {
        let scheme = if self.secure { "wss" } else { "ws" };
        let host = match self.ip_family {
            IpFamily::IPv4 => self.ip.clone(),
            IpFamily::IPv6 => format!("[{}]", self.ip),
        };
        match self.port {
            Some(port) => format!("{}://{}:{}", scheme, host, port),
            None => format!("{}://{}", scheme, host),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MasterPhase {
    /// Accepted by the settings check, not yet part of the election pool.
    Registered,
    /// Member of the election pool.
    Joined,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MasterRecord {
    pub instance: InstanceRecord,
    pub phase: MasterPhase,
}
