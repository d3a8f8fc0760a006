//! Pipeline runtime configuration.
//!
//! Resolved once at process startup and passed into the pipeline; nothing reads
//! environment variables while a request is running.

use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use crate::resolver::PUBCHEM_BASE_URL;

pub const DEFAULT_DATABASE_PATH: &str = "interactions.db";
pub const DEFAULT_RESOLVER_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_STORE_BUSY_TIMEOUT_MS: u64 = 2_000;
pub const DEFAULT_MAX_RESOLVER_WORKERS: usize = 4;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{var} must be a number, got '{value}'")]
    InvalidNumber { var: &'static str, value: String },

    #[error("{0} cannot be empty")]
    Empty(&'static str),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

/// Settings for name resolution, the interaction store and fan-out.
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineConfig {
    database_path: PathBuf,
    pubchem_base_url: String,
    resolver_timeout_secs: u64,
    store_busy_timeout_ms: u64,
    max_resolver_workers: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from(DEFAULT_DATABASE_PATH),
            pubchem_base_url: PUBCHEM_BASE_URL.to_string(),
            resolver_timeout_secs: DEFAULT_RESOLVER_TIMEOUT_SECS,
            store_busy_timeout_ms: DEFAULT_STORE_BUSY_TIMEOUT_MS,
            max_resolver_workers: DEFAULT_MAX_RESOLVER_WORKERS,
        }
    }
}

impl PipelineConfig {
    /// Read `MEDCHECK_*` variables from the process environment, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (tests pass a map).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(path) = lookup("MEDCHECK_DATABASE") {
            config = config.with_database_path(path)?;
        }
        if let Some(url) = lookup("MEDCHECK_PUBCHEM_URL") {
            config = config.with_pubchem_base_url(url)?;
        }
        if let Some(value) = lookup("MEDCHECK_RESOLVER_TIMEOUT_SECS") {
            let secs = parse_number("MEDCHECK_RESOLVER_TIMEOUT_SECS", &value)?;
            config = config.with_resolver_timeout_secs(secs)?;
        }
        if let Some(value) = lookup("MEDCHECK_STORE_BUSY_TIMEOUT_MS") {
            config.store_busy_timeout_ms = parse_number("MEDCHECK_STORE_BUSY_TIMEOUT_MS", &value)?;
        }
        if let Some(value) = lookup("MEDCHECK_MAX_RESOLVER_WORKERS") {
            let workers = parse_number("MEDCHECK_MAX_RESOLVER_WORKERS", &value)?;
            config = config.with_max_resolver_workers(workers as usize);
        }

        Ok(config)
    }

    pub fn with_database_path(mut self, path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        if path.as_os_str().is_empty() {
            return Err(ConfigError::Empty("database path"));
        }
        self.database_path = path;
        Ok(self)
    }

    pub fn with_pubchem_base_url(mut self, url: impl Into<String>) -> Result<Self, ConfigError> {
        let url = url.into();
        if url.trim().is_empty() {
            return Err(ConfigError::Empty("PubChem base URL"));
        }
        self.pubchem_base_url = url;
        Ok(self)
    }

    pub fn with_resolver_timeout_secs(mut self, secs: u64) -> Result<Self, ConfigError> {
        if secs == 0 {
            return Err(ConfigError::Zero("resolver timeout"));
        }
        self.resolver_timeout_secs = secs;
        Ok(self)
    }

    /// Worker count is clamped to at least one.
    pub fn with_max_resolver_workers(mut self, workers: usize) -> Self {
        self.max_resolver_workers = workers.max(1);
        self
    }

    pub fn database_path(&self) -> &Path {
        &self.database_path
    }

    pub fn pubchem_base_url(&self) -> &str {
        &self.pubchem_base_url
    }

    pub fn resolver_timeout_secs(&self) -> u64 {
        self.resolver_timeout_secs
    }

    pub fn store_busy_timeout(&self) -> Duration {
        Duration::from_millis(self.store_busy_timeout_ms)
    }

    pub fn max_resolver_workers(&self) -> usize {
        self.max_resolver_workers
    }
}

fn parse_number(var: &'static str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidNumber {
        var,
        value: value.to_string(),
    })
}
