//! Configuration module for loopguard
//!
//! Holds the instrumentation options: the watchdog timeout and the
//! break-notification. Both are fixed for the lifetime of one pass.

mod cli;

pub use cli::{parse_args, parse_cli_args, CliArgs};

/// Default watchdog timeout in milliseconds
pub const DEFAULT_TIMEOUT_MILLIS: u64 = 2000;

/// What the injected guard does when a loop exceeds the timeout
#[derive(Debug, Clone, PartialEq)]
pub enum OnBreak {
    /// Do nothing beyond breaking the loop
    Noop,

    /// Report a fixed message through the host `report` primitive
    Message(String),

    /// Invoke a user-supplied callable, given as script source text; it is
    /// called with the loop's line and column
    Callable(String),
}

impl Default for OnBreak {
    fn default() -> Self {
        OnBreak::Noop
    }
}

/// Options for one instrumentation pass
#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentConfig {
    /// Watchdog timeout in milliseconds; a loop breaks once its elapsed
    /// time strictly exceeds this
    pub timeout_millis: u64,

    /// Break notification
    pub on_break: OnBreak,
}

impl Default for InstrumentConfig {
    fn default() -> Self {
        InstrumentConfig {
            timeout_millis: DEFAULT_TIMEOUT_MILLIS,
            on_break: OnBreak::default(),
        }
    }
}

impl InstrumentConfig {
    /// Create a validated configuration
    pub fn new(timeout_millis: u64, on_break: OnBreak) -> Result<Self, ConfigError> {
        let config = InstrumentConfig {
            timeout_millis,
            on_break,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check the configuration invariants
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_millis == 0 {
            return Err(ConfigError::InvalidTimeout(self.timeout_millis));
        }
        Ok(())
    }
}

/// Errors that can occur during configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Timeout outside the accepted range
    #[error("timeout must be a positive number of milliseconds (got {0})")]
    InvalidTimeout(u64),

    /// Both notifier forms given at once
    #[error("--message and --callback are mutually exclusive")]
    ConflictingNotifier,

    /// Invalid parameter value
    #[error("invalid value for option '{0}': {1}")]
    Value(String, String),
}

/// Build an instrumentation config from parsed command-line arguments
pub fn config_from_args(args: &CliArgs) -> Result<InstrumentConfig, ConfigError> {
    if args.message.is_some() && args.callback.is_some() {
        return Err(ConfigError::ConflictingNotifier);
    }

    let on_break = if let Some(message) = &args.message {
        OnBreak::Message(message.clone())
    } else if let Some(callback) = &args.callback {
        OnBreak::Callable(callback.clone())
    } else {
        OnBreak::Noop
    };

    InstrumentConfig::new(args.timeout.unwrap_or(DEFAULT_TIMEOUT_MILLIS), on_break)
}
