//! Instance Registry Module
//!
//! Keeps track of every broker, worker and master connected to this state server.
//!
//! ## Core Concepts
//! - **Connection ids**: one per live socket; the key of every mapping.
//! - **Instance ids**: chosen by the client and stable across reconnects.
//! - **Master phases**: masters register first and join later, and the phase tag on
//!   the record makes "joined implies registered" hold by construction.

pub mod service;
pub mod types;

pub use service::InstanceRegistry;
pub use types::{ConnectionId, InstanceRecord, IpFamily, MasterPhase, MasterRecord};

#[cfg(test)]
mod tests;
