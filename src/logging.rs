//! Structured logging for the fleet benchmark orchestrator
//!
//! Every significant phase transition and per-device outcome is logged as a
//! single timestamped line, so a run transcript reads as an ordered record of
//! what happened to which device.

use crate::error::{AppError, Result};
use chrono::{SecondsFormat, Utc};

/// Log level enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    /// Debug level - detailed information for debugging
    Debug = 0,
    /// Info level - general run progress
    Info = 1,
    /// Warning level - potentially harmful situations
    Warn = 2,
    /// Error level - error events, the run may still continue
    Error = 3,
}

impl LogLevel {
    /// Get log level name as string
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
            "DEBUG" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            "WARN" | "WARNING" => Ok(LogLevel::Warn),
            "ERROR" => Ok(LogLevel::Error),
            _ => Err(AppError::parse(format!("Invalid log level: {}", s))),
        }
    }
}

/// Timestamped line logger shared by every run phase
#[derive(Debug, Clone)]
pub struct Logger {
    /// Minimum log level to output
    min_level: LogLevel,
    /// Whether to use colored output
    use_color: bool,
}

impl Logger {
    /// Create a new logger
    pub fn new(use_color: bool) -> Self {
        Self {
            min_level: LogLevel::Info,
            use_color,
        }
    }

    /// Set the minimum level that will be emitted
    pub fn with_min_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    /// Format a single log line without emitting it
    pub fn format_line(&self, level: LogLevel, message: &str) -> String {
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let label = if self.use_color {
            use colored::Colorize;
            match level {
                LogLevel::Debug => level.as_str().cyan().to_string(),
                LogLevel::Info => level.as_str().green().to_string(),
                LogLevel::Warn => level.as_str().yellow().to_string(),
                LogLevel::Error => level.as_str().red().to_string(),
            }
        } else {
            level.as_str().to_string()
        };
        format!("{} [{}] {}", timestamp, label, message)
    }

    /// Emit a line at the given level
    pub fn log(&self, level: LogLevel, message: &str) {
        if level < self.min_level {
            return;
        }
        let line = self.format_line(level, message);
        if level >= LogLevel::Warn {
            eprintln!("{}", line);
        } else {
            println!("{}", line);
        }
    }

    pub fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message);
    }

    pub fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    pub fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, message);
    }

    pub fn error(&self, message: &str) {
        self.log(LogLevel::Error, message);
    }

    /// Per-device outcome line, `<device>: <message>`
    pub fn device(&self, device: &str, message: &str) {
        self.info(&format!("{}: {}", device, message));
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new(false)
    }
}
