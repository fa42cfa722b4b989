//! Reconnect Window Module
//!
//! Grace periods during which master registrations are deferred so that
//! masters from the previous session can reclaim it first.
//!
//! ## States
//! - **Start**: opened once at boot.
//! - **Wait**: opened whenever the last registered master leaves.
//! - **Inactive**: normal operation.
//!
//! The machine itself is time-agnostic; the coordinator owns the timers and
//! calls [`ReconnectWindow::expire`] when they fire.

pub mod window;

pub use window::{ReconnectWindow, WindowMode};
