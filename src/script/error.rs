//! Script Error Types
//!
//! This module defines error types shared by the script frontend and the
//! bundled runtime.

/// Result type for script operations
pub type ScriptResult<T> = Result<T, ScriptError>;

/// Errors that can occur while parsing or executing a script
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptError {
    // Syntax errors
    SyntaxError {
        message: String,
        line: usize,
        column: usize,
    },

    // Runtime errors
    RuntimeError(String),
    TypeError {
        expected: String,
        got: String,
    },
    UndefinedVariable(String),

    // Resource errors
    StepLimitExceeded {
        limit: u64,
    },

    // Internal invariant violations
    Internal(String),
}

impl std::fmt::Display for ScriptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScriptError::SyntaxError {
                message,
                line,
                column,
            } => {
                write!(f, "syntax error at line {}:{}: {}", line, column, message)
            }
            ScriptError::RuntimeError(msg) => write!(f, "runtime error: {}", msg),
            ScriptError::TypeError { expected, got } => {
                write!(f, "type error: expected {}, got {}", expected, got)
            }
            ScriptError::UndefinedVariable(name) => {
                write!(f, "undefined variable '{}'", name)
            }
            ScriptError::StepLimitExceeded { limit } => {
                write!(f, "step limit of {} exceeded", limit)
            }
            ScriptError::Internal(msg) => write!(f, "internal error: {}", msg),
        }
    }
}

impl std::error::Error for ScriptError {}
