//! Master Coordinator Module
//!
//! Owns the cluster state and drives every membership transition.
//!
//! ## Core Mechanisms
//! - **Settings**: the first master after a clean slate defines the cluster
//!   settings and shared data; later masters must declare identical settings.
//! - **Reconnect**: masters from the previous session present the reconnect
//!   token and go straight into the joined set, optionally reclaiming leadership.
//! - **Election**: one loop at a time draws random joined masters until one
//!   acknowledges `newLeader`.
//!
//! ## Layout
//! - **`state`**: [`ClusterState`], pure synchronous transitions.
//! - **`server`**: [`StateServer`], sockets, timers and broadcasts around it.
//! - **`election`**: the election loop.

pub mod election;
pub mod server;
pub mod state;
pub mod types;

pub use server::StateServer;
pub use state::ClusterState;
pub use types::{
    BrokerJoinRequest, ClusterSettings, Connection, ConnectionMeta, MasterReconnectRequest,
    MasterRegisterRequest, ReconnectAnswer, RegisterAnswer, WorkerJoinRequest,
};
