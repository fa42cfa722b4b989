//! Transport Module
//!
//! HTTP and message-socket surface of the state server.
//!
//! ## Routes
//! - `GET /health-check`: liveness, answers `OK`.
//! - `GET <path>`: handshake gate, then WebSocket upgrade.
//! - anything else: `404 Not found`.
//!
//! ## Submodules
//! - **`protocol`**: event names and JSON frames.
//! - **`connection`**: per-socket reader/writer and the `InstanceSocket` impl.
//! - **`handlers`**: router, handshake handler and event dispatch.

pub mod connection;
pub mod handlers;
pub mod protocol;

pub use handlers::{router, serve};
