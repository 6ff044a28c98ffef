//! Environment variable access.

use std::collections::HashMap;

/// Reads environment variables with a fallback.
///
/// Unset and empty variables both yield `default`.
pub trait EnvironmentAccessor {
    fn fetch(&self, key: &str, default: &str) -> String;
}

/// The real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvironmentAccessor for ProcessEnv {
    fn fetch(&self, key: &str, default: &str) -> String {
        match std::env::var(key) {
            Ok(value) if !value.is_empty() => value,
            _ => default.to_string(),
        }
    }
}

/// A fixed set of variables.
#[derive(Debug, Clone, Default)]
pub struct MapEnv {
    vars: HashMap<String, String>,
}

impl MapEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.vars.insert(key.to_string(), value.to_string());
        self
    }
}

impl EnvironmentAccessor for MapEnv {
    fn fetch(&self, key: &str, default: &str) -> String {
        match self.vars.get(key) {
            Some(value) if !value.is_empty() => value.clone(),
            _ => default.to_string(),
        }
    }
}
