//! Severity-filtered diagnostic logging.
//!
//! A [`Logger`] is handed to each component explicitly. It drops anything
//! less severe than its threshold and forwards the rest to a [`LogSink`].

use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use crate::ForgeError;

pub const DIAGNOSTIC_TARGET: &str = "kernelforge::diagnostic";

/// Message severity, most severe first. `a < b` means `a` is more severe.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    InternalError,
    Error,
    Warning,
    #[default]
    Info,
    Verbose,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::InternalError => "internal-error",
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
            Severity::Verbose => "verbose",
        })
    }
}

impl FromStr for Severity {
    type Err = ForgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "internal-error" | "internal_error" => Ok(Severity::InternalError),
            "error" => Ok(Severity::Error),
            "warning" | "warn" => Ok(Severity::Warning),
            "info" => Ok(Severity::Info),
            "verbose" => Ok(Severity::Verbose),
            _ => Err(ForgeError::UnknownSeverity(s.to_string())),
        }
    }
}

pub trait LogSink: Send + Sync {
    fn write(&self, severity: Severity, message: &str);
}

/// Forwards diagnostics to `tracing` under [`DIAGNOSTIC_TARGET`].
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn write(&self, severity: Severity, message: &str) {
        match severity {
            Severity::InternalError | Severity::Error => {
                tracing::error!(target: DIAGNOSTIC_TARGET, "{message}")
            }
            Severity::Warning => tracing::warn!(target: DIAGNOSTIC_TARGET, "{message}"),
            Severity::Info => tracing::info!(target: DIAGNOSTIC_TARGET, "{message}"),
            Severity::Verbose => tracing::debug!(target: DIAGNOSTIC_TARGET, "{message}"),
        }
    }
}

/// Keeps every forwarded line in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<(Severity, String)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<(Severity, String)> {
        self.lines
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.lines().into_iter().map(|(_, msg)| msg).collect()
    }
}

impl LogSink for MemorySink {
    fn write(&self, severity: Severity, message: &str) {
        self.lines
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((severity, message.to_string()));
    }
}

#[derive(Clone)]
pub struct Logger {
    threshold: Severity,
    sink: Arc<dyn LogSink>,
}

impl Logger {
    pub fn new(threshold: Severity, sink: Arc<dyn LogSink>) -> Self {
        Self { threshold, sink }
    }

    pub fn tracing(threshold: Severity) -> Self {
        Self::new(threshold, Arc::new(TracingSink))
    }

    pub fn enabled(&self, severity: Severity) -> bool {
        severity <= self.threshold
    }

    pub fn log(&self, severity: Severity, message: impl AsRef<str>) {
        if self.enabled(severity) {
            self.sink.write(severity, message.as_ref());
        }
    }

    pub fn error(&self, message: impl AsRef<str>) {
        self.log(Severity::Error, message);
    }

    pub fn warning(&self, message: impl AsRef<str>) {
        self.log(Severity::Warning, message);
    }

    pub fn info(&self, message: impl AsRef<str>) {
        self.log(Severity::Info, message);
    }

    pub fn verbose(&self, message: impl AsRef<str>) {
        self.log(Severity::Verbose, message);
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("threshold", &self.threshold)
            .finish_non_exhaustive()
    }
}
