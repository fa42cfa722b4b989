use crate::error::{Result, StateError};
use serde::Deserialize;

/// Version of the master coordination protocol this server speaks.
pub const CLUSTER_PROTOCOL_VERSION: u32 = 1;

/// Connection parameters sent as URL query arguments.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandshakeParams {
    pub version: Option<String>,
    pub instance_type: Option<String>,
    pub instance_port: Option<String>,
    #[serde(alias = "authKey")]
    pub secret: Option<String>,
    pub cluster_version: Option<String>,
}

impl HandshakeParams {
    pub fn port(&self) -> Option<u16> {
        self.instance_port.as_deref()?.trim().parse().ok()
    }

    pub fn instance_type(&self) -> Option<InstanceType> {
        self.instance_type.as_deref().map(InstanceType::from)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstanceType {
    Broker,
    Worker,
    Master,
    Other(String),
}

impl From<&str> for InstanceType {
    fn from(value: &str) -> Self {
        match value {
            "broker" => InstanceType::Broker,
            "worker" => InstanceType::Worker,
            "master" => InstanceType::Master,
            other => InstanceType::Other(other.to_string()),
        }
    }
}

/// What this server accepts from connecting instances.
#[derive(Debug, Clone)]
pub struct Compatibility {
    pub server_version: String,
    pub required_major: u64,
    pub cluster_protocol_version: u32,
}

impl Compatibility {
    pub fn new(server_version: &str, cluster_protocol_version: u32) -> Self {
        Self {
            server_version: server_version.to_string(),
            required_major: parse_major(server_version).unwrap_or(0),
            cluster_protocol_version,
        }
    }

    /// Compatibility derived from this crate's own version.
    pub fn current() -> Self {
        Self::new(env!("CARGO_PKG_VERSION"), CLUSTER_PROTOCOL_VERSION)
    }

    /// Full gate: auth, then master cluster version, then semver.
    pub fn admit(
        &self,
        params: &HandshakeParams,
        secret: Option<&str>,
        remote_address: &str,
    ) -> Result<()> {
        check_auth(params, secret)?;
        self.check_cluster_version(params)?;
        self.check_version(params, remote_address)
    }

    pub fn check_cluster_version(&self, params: &HandshakeParams) -> Result<()> {
        if params.instance_type() != Some(InstanceType::Master) {
            return Ok(());
        }
        let declared = params
            .cluster_version
            .as_deref()
            .and_then(|v| v.trim().parse::<u32>().ok());
        if declared == Some(self.cluster_protocol_version) {
            Ok(())
        } else {
            Err(StateError::BadClusterVersion)
        }
    }

    pub fn check_version(&self, params: &HandshakeParams, remote_address: &str) -> Result<()> {
        let version = params.version.clone().unwrap_or_default();
        let reported = params.version.as_deref().and_then(parse_major);

        if reported == Some(self.required_major) {
            return Ok(());
        }

        let (instance_type, reported) = match (params.instance_type.as_deref(), reported) {
            (Some(t), Some(major)) if !t.is_empty() => (t.to_string(), major),
            _ => {
                return Err(StateError::ObsoleteComponent {
                    address: remote_address.to_string(),
                    server_version: self.server_version.clone(),
                    required_major: self.required_major,
                });
            }
        };

        if reported > self.required_major {
            Err(StateError::ServerOutdated {
                server_version: self.server_version.clone(),
                instance_type,
                version,
                reported_major: reported,
            })
        } else {
            let port = params.instance_port.clone().unwrap_or_default();
            Err(StateError::ClientOutdated {
                instance_type,
                version,
                address: format!("{}:{}", remote_address, port),
                server_version: self.server_version.clone(),
                required_major: self.required_major,
            })
        }
    }
}

/// Only enforced when the server has a secret configured.
pub fn check_auth(params: &HandshakeParams, secret: Option<&str>) -> Result<()> {
    match secret {
        None => Ok(()),
        Some(expected) if params.secret.as_deref() == Some(expected) => Ok(()),
        Some(_) => Err(StateError::BadClusterAuth),
    }
}

/// Major component of a `MAJOR.MINOR.PATCH` string.
///
/// The string must start with the three numeric components; anything after
/// the patch number (pre-release, build metadata) is ignored.
pub fn parse_major(version: &str) -> Option<u64> {
    let mut parts = version.trim().splitn(3, '.');
    let major = parts.next()?;
    let minor = parts.next()?;
    let patch = parts.next()?;

    let is_number = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if !is_number(major) || !is_number(minor) {
        return None;
    }
    if !patch.bytes().next().is_some_and(|b| b.is_ascii_digit()) {
        return None;
    }
    major.parse().ok()
}
