//! Instrumented Script Cache
//!
//! A convenience pipeline around the pass: source in, instrumented source
//! out, with results cached by the SHA1 of the input so a hot script is
//! rewritten only once per pass lifetime.

use std::collections::HashMap;

use sha1::{Digest, Sha1};

use super::LoopGuard;
use crate::config::InstrumentConfig;
use crate::error::Result;
use crate::script;

/// Source-to-source instrumentation pipeline with a SHA1-keyed cache
#[derive(Debug)]
pub struct Instrumenter {
    guard: LoopGuard,
    cache: HashMap<String, String>,
}

impl Instrumenter {
    /// Create an instrumenter; the notification callback is synthesized
    /// here, once
    pub fn new(config: InstrumentConfig) -> Result<Self> {
        Ok(Instrumenter {
            guard: LoopGuard::new(&config)?,
            cache: HashMap::new(),
        })
    }

    /// Parse, instrument and render a script, consulting the cache first
    pub fn run(&mut self, source: &str) -> Result<String> {
        let key = script_hash(source);
        if let Some(cached) = self.cache.get(&key) {
            return Ok(cached.clone());
        }

        let mut chunk = script::parse(source)?;
        self.guard.instrument(&mut chunk);
        let rendered = script::render(&chunk);

        self.cache.insert(key, rendered.clone());
        Ok(rendered)
    }

    /// Check whether an instrumented script is cached under the given hash
    pub fn contains(&self, hash: &str) -> bool {
        self.cache.contains_key(hash)
    }

    /// Flush all cached scripts
    pub fn flush(&mut self) {
        self.cache.clear();
    }
}

/// Compute the SHA1 hex digest of a script source
pub fn script_hash(source: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(source.as_bytes());
    hex::encode(hasher.finalize())
}
