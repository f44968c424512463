use crate::error::ConnectError;
use log::Level;
use std::backtrace::{Backtrace, BacktraceStatus};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::Write;

/// Installs `env_logger` with `info` as the default filter. `RUST_LOG`
/// overrides it. Safe to call more than once.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}

/// Top-level failure report: message, kind, cause chain, and the stack
/// trace when one was captured (`RUST_BACKTRACE=1`).
pub fn render_failure(error: &ConnectError, backtrace: &Backtrace) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "✗ Error: {}", error);
    let _ = writeln!(out, "  kind: {:?}", error.kind());
    if let Some(sqlstate) = error.sqlstate() {
        let _ = writeln!(out, "  sqlstate: {}", sqlstate);
    }
    let mut source = error.source();
    while let Some(cause) = source {
        let _ = writeln!(out, "  caused by: {}", cause);
        source = cause.source();
    }
    if backtrace.status() == BacktraceStatus::Captured {
        let _ = writeln!(out, "stack backtrace:\n{}", backtrace);
    }
    out
}

/// Lifecycle log lines for one connection scope.
pub struct ConnectionLogger {
    enabled: bool,
}

impl ConnectionLogger {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn log_connection(&self, level: Level, endpoint: &str, action: &str) {
        if !self.enabled {
            return;
        }

        log::log!(level, "Connection {}: {}", action, endpoint);
    }

    pub fn log_connecting(&self, endpoint: &str) {
        if !self.enabled {
            return;
        }

        log::info!("Connecting to {}", endpoint);
    }

    pub fn log_error(&self, error: &str, metadata: &HashMap<String, String>) {
        if !self.enabled {
            return;
        }

        let mut message = format!("Connection failed: {}", error);
        let mut keys: Vec<&String> = metadata.keys().collect();
        keys.sort();
        for key in keys {
            message.push_str(&format!(", {}={}", key, metadata[key]));
        }

        log::error!("{}", message);
    }

    pub fn log_query(&self, sql: &str, rows: usize) {
        if !self.enabled {
            return;
        }

        log::debug!("Query returned {} row(s): {}", rows, sql);
    }
}

impl Default for ConnectionLogger {
    fn default() -> Self {
        Self::new(true)
    }
}
