//! Topology Broadcaster Module
//!
//! Derives the broker set workers should connect to and announces changes.
//!
//! ## Core Mechanisms
//! - **Snapshot**: deduplicated `ws(s)://host:port` URIs plus a generation time.
//! - **Debounce**: every broker join/leave reschedules one cluster-wide timer;
//!   joins wait longer (scale-out) than leaves (scale-back).

pub mod broadcaster;
pub mod types;

pub use broadcaster::TopologyBroadcaster;
pub use types::{BrokerClusterState, TopologyChange};

#[cfg(test)]
mod tests;
