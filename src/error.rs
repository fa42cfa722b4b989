//! Error types for the state server
//!
//! Every variant maps to a stable wire name so clients can react to
//! refusals without parsing messages.

use thiserror::Error;

/// Primary error type for all state server operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StateError {
    // ========== Handshake Errors ==========
    /// Missing or wrong shared secret
    #[error(
        "Cannot connect to the state server without providing a valid secret as a URL query argument"
    )]
    BadClusterAuth,

    /// Client sent no instance type or an unparsable version
    #[error(
        "An obsolete cluster component at address {address} is incompatible with the state server@^{server_version}. Please, update the component up to version ^{required_major}.0.0"
    )]
    ObsoleteComponent {
        address: String,
        server_version: String,
        required_major: u64,
    },

    /// Client is newer than this server
    #[error(
        "The state server@{server_version} is incompatible with the {instance_type}@{version}. Please, update the state server up to version ^{reported_major}.0.0"
    )]
    ServerOutdated {
        server_version: String,
        instance_type: String,
        version: String,
        reported_major: u64,
    },

    /// Client is older than this server
    #[error(
        "The {instance_type}@{version} at address {address} is incompatible with the state server@^{server_version}. Please, update the {instance_type} up to version ^{required_major}.0.0"
    )]
    ClientOutdated {
        instance_type: String,
        version: String,
        address: String,
        server_version: String,
        required_major: u64,
    },

    /// Master declared a different cluster protocol version
    #[error("Master cannot connect to the state server with an incompatible cluster version")]
    BadClusterVersion,

    // ========== Protocol Errors ==========
    /// Worker joined before the server finished warming up
    #[error("The server is waiting for initial broker connections")]
    NotReady,

    /// Joining would exceed what the attached licenses allow
    #[error("Join blocked because of license term violation")]
    LicenseTermViolation,

    /// Master tried to join without registering first
    #[error("Register master before joining the cluster")]
    MasterNotRegistered,

    /// Payload did not match the event's schema
    #[error("Invalid payload for event {event}: {reason}")]
    InvalidPayload { event: String, reason: String },

    /// Event name is not part of the protocol
    #[error("Unknown event: {event}")]
    UnknownEvent { event: String },

    /// A response could not be serialized
    #[error("Failed to encode response: {0}")]
    Encode(String),

    // ========== Delivery Errors ==========
    /// Peer did not answer within the acknowledgment timeout
    #[error("Event {event} was not acknowledged within {timeout_ms}ms")]
    AckTimeout { event: String, timeout_ms: u64 },

    /// Socket is no longer open
    #[error("Socket closed")]
    SocketClosed,

    /// Peer answered with an error
    #[error("{name}: {message}")]
    Remote { name: String, message: String },
}

impl StateError {
    /// Name sent to clients in error responses and handshake refusals
    pub fn name(&self) -> &str {
        match self {
            StateError::BadClusterAuth => "BadClusterAuthError",
            StateError::ObsoleteComponent { .. }
            | StateError::ServerOutdated { .. }
            | StateError::ClientOutdated { .. } => "CompatibilityError",
            StateError::BadClusterVersion => "BadClusterVersion",
            StateError::NotReady => "NotReadyError",
            StateError::LicenseTermViolation => "LicenseTermViolation",
            StateError::MasterNotRegistered => "MasterNotRegistered",
            StateError::InvalidPayload { .. } => "InvalidPayload",
            StateError::UnknownEvent { .. } => "UnknownEvent",
            StateError::Encode(_) => "EncodeError",
            StateError::AckTimeout { .. } => "AckTimeout",
            StateError::SocketClosed => "SocketClosed",
            StateError::Remote { name, .. } => name,
        }
    }

    /// True for refusals raised before a socket is admitted
    pub fn is_handshake_refusal(&self) -> bool {
        matches!(
            self,
            StateError::BadClusterAuth
                | StateError::ObsoleteComponent { .. }
                | StateError::ServerOutdated { .. }
                | StateError::ClientOutdated { .. }
                | StateError::BadClusterVersion
        )
    }
}

/// Result type alias for state server operations
pub type Result<T> = std::result::Result<T, StateError>;
