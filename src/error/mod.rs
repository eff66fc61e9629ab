//! Error handling for the fleet benchmark orchestrator

use thiserror::Error;

/// Custom error types for the fleet benchmark orchestrator
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors (bad CLI input, missing token, ...)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Validation errors (device pairing, empty selections, ...)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Transport errors: the remote session could not be established or
    /// broke before the command finished
    #[error("Transport error: {0}")]
    Transport(String),

    /// A remote command ran but exited non-zero
    #[error("Command failed on {host} (exit {exit_code}): {message}")]
    Command {
        host: String,
        exit_code: i32,
        message: String,
    },

    /// The resource provider rejected or could not fulfil a request
    #[error("Resource API error: {0}")]
    ResourceApi(String),

    /// Device provisioning failed (creation or readiness polling)
    #[error("Provisioning error: {0}")]
    Provision(String),

    /// A benchmark suite failed mid-run
    #[error("Suite error: {0}")]
    Suite(String),

    /// Several independent per-item failures joined into one phase failure
    #[error("{context}: {} item(s) failed: {}", .failures.len(), .failures.join("; "))]
    Aggregate {
        context: String,
        failures: Vec<String>,
    },

    /// I/O errors (key files, script directories, ...)
    #[error("I/O error: {0}")]
    Io(String),

    /// Parsing errors (JSON bodies, addresses, flag values, ...)
    #[error("Parsing error: {0}")]
    Parse(String),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation(message.into())
    }

    /// Create a new transport error
    pub fn transport<S: Into<String>>(message: S) -> Self {
        Self::Transport(message.into())
    }

    /// Create a new command error with the remote exit code
    pub fn command<H: Into<String>, S: Into<String>>(host: H, exit_code: i32, message: S) -> Self {
        Self::Command {
            host: host.into(),
            exit_code,
            message: message.into(),
        }
    }

    /// Create a new resource API error
    pub fn resource_api<S: Into<String>>(message: S) -> Self {
        Self::ResourceApi(message.into())
    }

    /// Create a new provisioning error
    pub fn provision<S: Into<String>>(message: S) -> Self {
        Self::Provision(message.into())
    }

    /// Create a new suite error
    pub fn suite<S: Into<String>>(message: S) -> Self {
        Self::Suite(message.into())
    }

    /// Join per-item failures from a fan-out phase into one phase error
    pub fn aggregate<S: Into<String>>(context: S, failures: Vec<AppError>) -> Self {
        Self::Aggregate {
            context: context.into(),
            failures: failures.into_iter().map(|e| e.to_string()).collect(),
        }
    }

    /// Like [`AppError::aggregate`] for failures already rendered as
    /// `item: error` strings
    pub fn aggregate_messages<S: Into<String>>(context: S, failures: Vec<String>) -> Self {
        Self::Aggregate {
            context: context.into(),
            failures,
        }
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        Self::Io(message.into())
    }

    /// Create a new parsing error
    pub fn parse<S: Into<String>>(message: S) -> Self {
        Self::Parse(message.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal(message.into())
    }

    /// Get error category for logging and reporting
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIG",
            Self::Validation(_) => "VALIDATION",
            Self::Transport(_) => "TRANSPORT",
            Self::Command { .. } => "COMMAND",
            Self::ResourceApi(_) => "RESOURCE",
            Self::Provision(_) => "PROVISION",
            Self::Suite(_) => "SUITE",
            Self::Aggregate { .. } => "AGGREGATE",
            Self::Io(_) => "IO",
            Self::Parse(_) => "PARSE",
            Self::Internal(_) => "INTERNAL",
        }
    }

    /// Check if error is recoverable (a retry of the whole run may help)
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Command { .. } | Self::ResourceApi(_) => true,
            Self::Provision(_) | Self::Suite(_) | Self::Aggregate { .. } => true,
            Self::Config(_) | Self::Validation(_) | Self::Parse(_) => false,
            Self::Io(_) | Self::Internal(_) => false,
        }
    }

    /// Get exit code for this error type
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Validation(_) | Self::Parse(_) => 1, // invalid usage
            Self::ResourceApi(_) | Self::Provision(_) => 2,              // provider issues
            Self::Transport(_) => 3,                                     // remote session issues
            Self::Command { .. } => 4,                                   // remote command issues
            Self::Suite(_) | Self::Aggregate { .. } => 5,                // test execution issues
            Self::Io(_) => 6,                                            // local I/O issues
            Self::Internal(_) => 99,                                     // unexpected errors
        }
    }

    /// Format error for console display with color coding
    pub fn format_for_console(&self, use_color: bool) -> String {
        let category = self.category();
        let message = self.to_string();

        if use_color {
            use colored::Colorize;
            match self {
                Self::Config(_) | Self::Validation(_) | Self::Parse(_) => {
                    format!("[{}] {}", category.red().bold(), message.red())
                }
                Self::Transport(_) | Self::ResourceApi(_) | Self::Provision(_) => {
                    format!("[{}] {}", category.yellow().bold(), message.yellow())
                }
                Self::Command { .. } | Self::Suite(_) | Self::Aggregate { .. } => {
                    format!("[{}] {}", category.cyan().bold(), message.cyan())
                }
                Self::Io(_) => {
                    format!("[{}] {}", category.magenta().bold(), message.magenta())
                }
                Self::Internal(_) => {
                    format!("[{}] {}", category.bright_red().bold(), message.bright_red())
                }
            }
        } else {
            format!("[{}] {}", category, message)
        }
    }
}

// Standard library error conversions
impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::io(error.to_string())
    }
}

impl From<url::ParseError> for AppError {
    fn from(error: url::ParseError) -> Self {
        Self::parse(format!("URL parse error: {}", error))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(error: serde_json::Error) -> Self {
        Self::parse(format!("JSON parse error: {}", error))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(error: reqwest::Error) -> Self {
        Self::resource_api(error.to_string())
    }
}

impl From<std::net::AddrParseError> for AppError {
    fn from(error: std::net::AddrParseError) -> Self {
        Self::parse(format!("IP address parse error: {}", error))
    }
}

impl From<std::num::ParseIntError> for AppError {
    fn from(error: std::num::ParseIntError) -> Self {
        Self::parse(format!("Integer parse error: {}", error))
    }
}

// Anyhow integration
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::internal(error.to_string())
    }
}

/// Custom Result type for the application
pub type Result<T> = std::result::Result<T, AppError>;
