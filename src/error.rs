//! Error types for loopguard
//!
//! This module defines the top-level error type used throughout the crate.
//! Module-specific errors convert into it at the public surface.

use std::fmt;
use std::io;

use crate::config::ConfigError;
use crate::script::ScriptError;

/// Result type alias for loopguard operations
pub type Result<T> = std::result::Result<T, GuardError>;

/// Main error type for loopguard operations
#[derive(Debug)]
pub enum GuardError {
    /// Script parsing or execution errors
    Script(ScriptError),

    /// Configuration errors
    Config(ConfigError),

    /// File IO errors
    Io(String),
}

impl fmt::Display for GuardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GuardError::Script(err) => write!(f, "{}", err),
            GuardError::Config(err) => write!(f, "{}", err),
            GuardError::Io(msg) => write!(f, "io error: {}", msg),
        }
    }
}

impl std::error::Error for GuardError {}

impl From<ScriptError> for GuardError {
    fn from(err: ScriptError) -> Self {
        GuardError::Script(err)
    }
}

impl From<ConfigError> for GuardError {
    fn from(err: ConfigError) -> Self {
        GuardError::Config(err)
    }
}

impl From<io::Error> for GuardError {
    fn from(err: io::Error) -> Self {
        GuardError::Io(err.to_string())
    }
}
