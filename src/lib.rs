//! Loopguard library
//!
//! Source-to-source loop watchdog instrumentation for sandboxed scripts:
//! every counted, pre-test and post-test loop is rewritten to monitor its
//! own elapsed time and break with a configurable notification once a
//! timeout is exceeded.

pub mod config;
pub mod error;
pub mod guard;
pub mod runtime;
pub mod script;

// Re-export commonly used types
pub use config::{InstrumentConfig, OnBreak};
pub use error::{GuardError, Result};
pub use guard::{Instrumenter, LoopGuard};
pub use runtime::{Host, Interpreter, SystemHost};
pub use script::{parse, render, ScriptError};
