//! Typed configuration.
//!
//! Layered: built-in defaults, then an optional TOML file, then
//! environment variables. Fails fast on malformed values.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::engine::{EngineConfig, ReconnectPolicy};
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub log_level: String,
    pub otel_endpoint: Option<String>,
    pub service_name: String,
    /// Broadcast channel capacity per subscriber.
    pub event_buffer: usize,
    /// Number of recent events kept for `events_since`.
    pub event_journal: usize,
    pub connect_max_retries: u32,
    pub connect_backoff_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            otel_endpoint: None,
            service_name: "jobmarket".to_string(),
            event_buffer: 1024,
            event_journal: 4096,
            connect_max_retries: 3,
            connect_backoff_ms: 500,
        }
    }
}

impl Config {
    /// Defaults overridden by environment variables.
    ///
    /// In local dev, call `dotenvy::dotenv().ok()` before this.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| Error::Config(format!("invalid config file: {e}")))
    }

    /// Defaults, then `path` if given, then the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_toml_str(&std::fs::read_to_string(path)?)?,
            None => Self::default(),
        };
        config.apply_env()?;
        Ok(config)
    }

    /// Override fields from any environment variables that are set.
    pub fn apply_env(&mut self) -> Result<()> {
        if let Some(v) = optional_var("LOG_LEVEL") {
            self.log_level = v;
        }
        if let Some(v) = optional_var("OTEL_ENDPOINT") {
            self.otel_endpoint = Some(v);
        }
        if let Some(v) = optional_var("JOBMARKET_SERVICE_NAME") {
            self.service_name = v;
        }
        if let Some(v) = parsed_var("JOBMARKET_EVENT_BUFFER")? {
            self.event_buffer = v;
        }
        if let Some(v) = parsed_var("JOBMARKET_EVENT_JOURNAL")? {
            self.event_journal = v;
        }
        if let Some(v) = parsed_var("JOBMARKET_CONNECT_RETRIES")? {
            self.connect_max_retries = v;
        }
        if let Some(v) = parsed_var("JOBMARKET_CONNECT_BACKOFF_MS")? {
            self.connect_backoff_ms = v;
        }
        if self.event_buffer == 0 {
            return Err(Error::Config("event_buffer must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            event_buffer: self.event_buffer,
            event_journal: self.event_journal,
            reconnect: ReconnectPolicy {
                max_retries: self.connect_max_retries,
                backoff: Duration::from_millis(self.connect_backoff_ms),
            },
        }
    }
}

fn optional_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parsed_var<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match optional_var(name) {
        None => Ok(None),
        Some(raw) => raw.trim().parse().map(Some).map_err(|_| {
            Error::Config(format!("environment variable {name} has invalid value '{raw}'"))
        }),
    }
}
