//! Reliable Delivery Module
//!
//! Pushes server-initiated events to member sockets and keeps retrying until
//! the peer acknowledges or the socket closes.
//!
//! ## Submodules
//! - **`socket`**: the `InstanceSocket` seam shared by transport, election and tests.
//! - **`reliable`**: `deliver` (one target, retry forever) and `broadcast` (fan-out).

pub mod reliable;
pub mod socket;

pub use reliable::{broadcast, deliver};
pub use socket::InstanceSocket;

#[cfg(test)]
pub mod testing;
