use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WindowMode {
    Inactive,
    Start,
    Wait,
}

impl std::fmt::Display for WindowMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            WindowMode::Inactive => "inactive",
            WindowMode::Start => "start",
            WindowMode::Wait => "wait",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectWindow {
    mode: WindowMode,
    /// Wall-clock ms at which the current window ends (0 when inactive).
    end_timestamp: u64,
}

impl ReconnectWindow {
    pub fn inactive() -> Self {
        Self {
            mode: WindowMode::Inactive,
            end_timestamp: 0,
        }
    }

    /// Boot state: `Start` for `duration`, or `Inactive` when disabled.
    pub fn at_boot(now: u64, duration: Duration, enabled: bool) -> Self {
        if !enabled || duration.is_zero() {
            return Self::inactive();
        }
        Self {
            mode: WindowMode::Start,
            end_timestamp: now + duration.as_millis() as u64,
        }
    }

    /// `* -> Wait`, replacing whatever window was open.
    pub fn enter_wait(&mut self, now: u64, duration: Duration) {
        self.mode = WindowMode::Wait;
        self.end_timestamp = now + duration.as_millis() as u64;
    }

    /// Closes the window if it is still in `expected` mode.
    ///
    /// Returns `true` when a transition to `Inactive` happened; a timer that
    /// belongs to an already replaced window changes nothing.
    pub fn expire(&mut self, expected: WindowMode) -> bool {
        if self.mode != expected || expected == WindowMode::Inactive {
            return false;
        }
        self.mode = WindowMode::Inactive;
        self.end_timestamp = 0;
        true
    }

    pub fn mode(&self) -> WindowMode {
        self.mode
    }

    pub fn is_active(&self) -> bool {
        self.mode != WindowMode::Inactive
    }

    pub fn is_start(&self) -> bool {
        self.mode == WindowMode::Start
    }

    pub fn end_timestamp(&self) -> u64 {
        self.end_timestamp
    }

    /// Milliseconds until the window ends, never negative.
    pub fn remaining_ms(&self, now: u64) -> u64 {
        self.end_timestamp.saturating_sub(now)
    }
}

impl Default for ReconnectWindow {
    fn default() -> Self {
        Self::inactive()
    }
}
