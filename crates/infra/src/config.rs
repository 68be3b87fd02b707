//! Configuration loading and representation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use stockroom_core::Page;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?} ({reason})")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Runtime settings shared by the services and the HTTP surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StockroomConfig {
    pub bind_addr: String,
    /// Bounded re-read/re-apply attempts for versioned stock mutations.
    pub max_cas_attempts: u32,
    pub default_page_limit: usize,
    pub max_page_limit: usize,
}

impl Default for StockroomConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            max_cas_attempts: 8,
            default_page_limit: 50,
            max_page_limit: 500,
        }
    }
}

impl StockroomConfig {
    pub const ENV_BIND_ADDR: &'static str = "STOCKROOM_BIND_ADDR";
    pub const ENV_MAX_CAS_ATTEMPTS: &'static str = "STOCKROOM_MAX_CAS_ATTEMPTS";
    pub const ENV_DEFAULT_PAGE_LIMIT: &'static str = "STOCKROOM_DEFAULT_PAGE_LIMIT";
    pub const ENV_MAX_PAGE_LIMIT: &'static str = "STOCKROOM_MAX_PAGE_LIMIT";

    /// Load from the process environment, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using an arbitrary key lookup (tests pass a map).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut cfg = Self::default();

        if let Some(addr) = lookup(Self::ENV_BIND_ADDR) {
            cfg.bind_addr = addr;
        }
        if let Some(raw) = lookup(Self::ENV_MAX_CAS_ATTEMPTS) {
            cfg.max_cas_attempts = parse(Self::ENV_MAX_CAS_ATTEMPTS, &raw)?;
        }
        if let Some(raw) = lookup(Self::ENV_DEFAULT_PAGE_LIMIT) {
            cfg.default_page_limit = parse(Self::ENV_DEFAULT_PAGE_LIMIT, &raw)?;
        }
        if let Some(raw) = lookup(Self::ENV_MAX_PAGE_LIMIT) {
            cfg.max_page_limit = parse(Self::ENV_MAX_PAGE_LIMIT, &raw)?;
        }

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_cas_attempts == 0 {
            return Err(ConfigError::Invalid(
                "max_cas_attempts must be at least 1".to_string(),
            ));
        }
        if self.max_page_limit == 0 {
            return Err(ConfigError::Invalid(
                "max_page_limit must be at least 1".to_string(),
            ));
        }
        if self.default_page_limit == 0 || self.default_page_limit > self.max_page_limit {
            return Err(ConfigError::Invalid(format!(
                "default_page_limit must be within 1..={}",
                self.max_page_limit
            )));
        }
        Ok(())
    }

    /// Apply configured defaults/clamps to a caller-supplied page.
    pub fn page(&self, page: Page) -> Page {
        page.normalized(self.default_page_limit, self.max_page_limit)
    }
}

fn parse<T>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: core::str::FromStr,
    T::Err: core::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        key,
        value: raw.to_string(),
        reason: e.to_string(),
    })
}
