//! Command line and environment configuration
//!
//! Every setting can come from a flag, an environment variable, or its
//! hardcoded default. The parsed [`Cli`] is turned into an immutable
//! [`ServerConfig`] once at startup.

use clap::Parser;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 7777;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 2000;
pub const DEFAULT_SCALE_OUT_DELAY_MS: u64 = 5000;
pub const DEFAULT_SCALE_BACK_DELAY_MS: u64 = 1000;
pub const DEFAULT_STARTUP_DELAY_MS: i64 = 5000;
pub const DEFAULT_START_RECONNECT_DURATION_MS: u64 = 2500;
pub const DEFAULT_WAIT_RECONNECT_DURATION_MS: u64 = 5000;
pub const DEFAULT_ACK_TIMEOUT_MS: u64 = 10_000;

/// Cluster State Server
///
/// Rendezvous point for brokers, workers and masters. Tracks membership,
/// elects a leading master and announces broker topology changes.
#[derive(Parser, Debug, Clone)]
#[command(name = "cluster-state")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Listening port
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "STATE_SERVER_PORT")]
    pub port: u16,

    /// Path the message socket is served on
    #[arg(long, default_value = "/", env = "STATE_SERVER_PATH")]
    pub path: String,

    /// Shared secret every connecting instance must present
    #[arg(long, env = "CLUSTER_SECRET", hide_env_values = true)]
    pub secret: Option<String>,

    /// Header carrying the original client address behind a proxy
    #[arg(long, env = "FORWARDED_FOR_HEADER")]
    pub forwarded_for_header: Option<String>,

    /// Delay between delivery retries (ms)
    #[arg(short, long, default_value_t = DEFAULT_RETRY_DELAY_MS, env = "STATE_SERVER_RETRY_DELAY")]
    pub retry_delay: u64,

    /// Debounce delay after a broker joins (ms)
    #[arg(long, default_value_t = DEFAULT_SCALE_OUT_DELAY_MS, env = "STATE_SERVER_SCALE_OUT_DELAY")]
    pub scale_out_delay: u64,

    /// Debounce delay after a broker leaves (ms)
    #[arg(long, default_value_t = DEFAULT_SCALE_BACK_DELAY_MS, env = "STATE_SERVER_SCALE_BACK_DELAY")]
    pub scale_back_delay: u64,

    /// Time workers must wait for initial brokers (ms, <= 0 disables)
    #[arg(
        short,
        long,
        default_value_t = DEFAULT_STARTUP_DELAY_MS,
        env = "STATE_SERVER_STARTUP_DELAY",
        allow_hyphen_values = true
    )]
    pub startup_delay: i64,

    /// Reconnect window opened at boot (ms)
    #[arg(long, default_value_t = DEFAULT_START_RECONNECT_DURATION_MS, env = "START_RECONNECT_DURATION")]
    pub start_reconnect_duration: u64,

    /// Reconnect window opened when the last master leaves (ms)
    #[arg(long, default_value_t = DEFAULT_WAIT_RECONNECT_DURATION_MS, env = "WAIT_RECONNECT_DURATION")]
    pub wait_reconnect_duration: u64,

    /// How long to wait for a client to acknowledge a server event (ms)
    #[arg(long, default_value_t = DEFAULT_ACK_TIMEOUT_MS, env = "STATE_SERVER_ACK_TIMEOUT")]
    pub ack_timeout: u64,

    /// Log level: 0 nothing, 1 errors, 2 info, 3 everything
    #[arg(short, long, default_value_t = 2, env = "LOG_LEVEL")]
    pub log_level: u8,
}

impl Cli {
    /// Tracing filter directive for the numeric log level
    pub fn log_directive(&self) -> &'static str {
        match self.log_level {
            0 => "off",
            1 => "error",
            2 => "info",
            _ => "debug",
        }
    }

    pub fn into_config(self) -> ServerConfig {
        ServerConfig {
            port: self.port,
            path: normalize_path(&self.path),
            secret: self.secret.filter(|s| !s.is_empty()),
            forwarded_for_header: self
                .forwarded_for_header
                .filter(|h| !h.is_empty())
                .map(|h| h.to_ascii_lowercase()),
            retry_delay: Duration::from_millis(self.retry_delay),
            scale_out_delay: Duration::from_millis(self.scale_out_delay),
            scale_back_delay: Duration::from_millis(self.scale_back_delay),
            startup_delay_ms: self.startup_delay,
            start_reconnect_duration: Duration::from_millis(self.start_reconnect_duration),
            wait_reconnect_duration: Duration::from_millis(self.wait_reconnect_duration),
            ack_timeout: Duration::from_millis(self.ack_timeout),
        }
    }
}

/// Runtime configuration of the state server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub path: String,
    pub secret: Option<String>,
    /// Lowercased header name
    pub forwarded_for_header: Option<String>,
    pub retry_delay: Duration,
    pub scale_out_delay: Duration,
    pub scale_back_delay: Duration,
    /// Signed: zero or negative disables the warm-up and the start window.
    pub startup_delay_ms: i64,
    pub start_reconnect_duration: Duration,
    pub wait_reconnect_duration: Duration,
    pub ack_timeout: Duration,
}

impl ServerConfig {
    pub fn warm_up_enabled(&self) -> bool {
        self.startup_delay_ms > 0
    }

    pub fn startup_delay(&self) -> Duration {
        Duration::from_millis(self.startup_delay_ms.max(0) as u64)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            path: "/".into(),
            secret: None,
            forwarded_for_header: None,
            retry_delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
            scale_out_delay: Duration::from_millis(DEFAULT_SCALE_OUT_DELAY_MS),
            scale_back_delay: Duration::from_millis(DEFAULT_SCALE_BACK_DELAY_MS),
            startup_delay_ms: DEFAULT_STARTUP_DELAY_MS,
            start_reconnect_duration: Duration::from_millis(DEFAULT_START_RECONNECT_DURATION_MS),
            wait_reconnect_duration: Duration::from_millis(DEFAULT_WAIT_RECONNECT_DURATION_MS),
            ack_timeout: Duration::from_millis(DEFAULT_ACK_TIMEOUT_MS),
        }
    }
}

fn normalize_path(path: &str) -> String {
    let trimmed = path.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}
