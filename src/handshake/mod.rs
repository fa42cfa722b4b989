//! Handshake Gate Module
//!
//! Runs before a socket is upgraded: shared-secret auth first, then the
//! cluster-protocol check for masters, then the semantic-version check.
//! A refusal never reaches the registries.

pub mod address;
pub mod gate;

pub use address::resolve_instance_ip;
pub use gate::{CLUSTER_PROTOCOL_VERSION, Compatibility, HandshakeParams, InstanceType};
