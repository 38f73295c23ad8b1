//! Diagnostic message routing.
//!
//! The bridge reports through a [`Logger`]: messages below the configured
//! threshold are dropped, the rest go to a callback. The default callback
//! forwards to the `log` crate.

use serde::Deserialize;
use std::fmt;
use std::sync::Arc;

/// Message severity, most severe first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Disables all messages when used as a threshold.
    None,
    Fatal,
    #[default]
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_log(self) -> Option<log::Level> {
        match self {
            LogLevel::None => None,
            LogLevel::Fatal | LogLevel::Error => Some(log::Level::Error),
            LogLevel::Warn => Some(log::Level::Warn),
            LogLevel::Info => Some(log::Level::Info),
            LogLevel::Debug => Some(log::Level::Debug),
            LogLevel::Trace => Some(log::Level::Trace),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogLevel::None => "none",
            LogLevel::Fatal => "fatal",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        };
        f.write_str(name)
    }
}

/// Receives every message that passes the threshold.
pub type LogCallback = Arc<dyn Fn(LogLevel, &str) + Send + Sync>;

fn forward_to_log(level: LogLevel, msg: &str) {
    if let Some(level) = level.to_log() {
        log::log!(target: "placebo_bridge", level, "{}", msg);
    }
}

/// Threshold-filtered message sink.
#[derive(Clone)]
pub struct Logger {
    threshold: LogLevel,
    callback: LogCallback,
}

impl Logger {
    pub fn new(threshold: LogLevel, callback: LogCallback) -> Self {
        Self {
            threshold,
            callback,
        }
    }

    /// Logger that forwards to the `log` crate.
    pub fn with_log_crate(threshold: LogLevel) -> Self {
        Self::new(threshold, Arc::new(forward_to_log))
    }

    pub fn threshold(&self) -> LogLevel {
        self.threshold
    }

    pub fn enabled(&self, level: LogLevel) -> bool {
        level != LogLevel::None && level <= self.threshold
    }

    pub fn log(&self, level: LogLevel, msg: &str) {
        if self.enabled(level) {
            (self.callback)(level, msg);
        }
    }

    pub fn error(&self, msg: &str) {
        self.log(LogLevel::Error, msg);
    }

    pub fn warn(&self, msg: &str) {
        self.log(LogLevel::Warn, msg);
    }

    pub fn info(&self, msg: &str) {
        self.log(LogLevel::Info, msg);
    }

    pub fn debug(&self, msg: &str) {
        self.log(LogLevel::Debug, msg);
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::with_log_crate(LogLevel::default())
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("threshold", &self.threshold)
            .finish_non_exhaustive()
    }
}

/// Install `env_logger` as the process logger (`RUST_LOG`, default `warn`).
///
/// Returns `false` when another logger was already installed.
pub fn init_env_logger() -> bool {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .try_init()
        .is_ok()
}
