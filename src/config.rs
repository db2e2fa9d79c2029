use crate::core::{EsqlError, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Top-level configuration structure parsed from a TOML file.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    pub session: Option<SessionConfig>,
    pub trace: Option<TraceConfig>,
}

/// Session-related configuration.
#[derive(Debug, Deserialize)]
pub struct SessionConfig {
    pub autocommit: Option<bool>,
    pub default_target: Option<String>,
    pub default_user: Option<String>,
}

/// Verbose trace configuration.
#[derive(Debug, Deserialize)]
pub struct TraceConfig {
    pub enabled: Option<bool>,
    pub file: Option<String>,
}

impl Config {
    /// Whether new connections start in autocommit mode. Off by default,
    /// matching the embedded-SQL convention.
    pub fn autocommit(&self) -> bool {
        self.session
            .as_ref()
            .and_then(|s| s.autocommit)
            .unwrap_or(false)
    }

    pub fn trace_enabled(&self) -> bool {
        self.trace
            .as_ref()
            .and_then(|t| t.enabled)
            .unwrap_or(false)
    }
}

/// Loads configuration from a TOML file at the given path.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = fs::read_to_string(path).map_err(|e| EsqlError::Config(e.to_string()))?;
    toml::from_str(&content).map_err(|e| EsqlError::Config(e.to_string()))
}
