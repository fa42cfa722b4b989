//! Cluster State Server Library
//!
//! This library crate defines the modules of the cluster state server, the
//! rendezvous point brokers, workers and masters connect to. It serves as the
//! foundation for the binary executable (`main.rs`).
//!
//! ## Architecture Modules
//!
//! - **`registry`**: Connection-keyed records of every broker, worker and master.
//! - **`handshake`**: Auth and version gate run before a socket is admitted.
//! - **`delivery`**: Retry-until-acknowledged event delivery to member sockets.
//! - **`topology`**: Broker snapshots and the debounced change announcement.
//! - **`reconnect`**: Grace windows that let masters reclaim their session.
//! - **`license`**: Aggregate license-term checks applied at join time.
//! - **`coordinator`**: Master settings, reconnects, leader election and the
//!   `StateServer` that ties every other module together.
//! - **`transport`**: HTTP routes and the JSON message socket.
//! - **`scheduler`**, **`config`**, **`error`**: shared plumbing.

pub mod config;
pub mod coordinator;
pub mod delivery;
pub mod error;
pub mod handshake;
pub mod license;
pub mod reconnect;
pub mod registry;
pub mod scheduler;
pub mod topology;
pub mod transport;
