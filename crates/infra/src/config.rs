//! Runtime configuration, read from the environment.
//!
//! | Variable                       | Default        |
//! |--------------------------------|----------------|
//! | `STOREFRONT_BIND_ADDR`         | `0.0.0.0:8080` |
//! | `STOREFRONT_LOG_FORMAT`        | `json`         |
//! | `STOREFRONT_DISPATCH_ATTEMPTS` | `3`            |
//!
//! Log verbosity is not configured here; the subscriber reads `RUST_LOG`.

use std::net::SocketAddr;

use thiserror::Error;

pub use storefront_observability::LogFormat;

use crate::command_dispatcher::DEFAULT_MAX_ATTEMPTS;

pub const BIND_ADDR_VAR: &str = "STOREFRONT_BIND_ADDR";
pub const LOG_FORMAT_VAR: &str = "STOREFRONT_LOG_FORMAT";
pub const DISPATCH_ATTEMPTS_VAR: &str = "STOREFRONT_DISPATCH_ATTEMPTS";

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var}: invalid value '{value}': {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    fn invalid(var: &'static str, value: &str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            var,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub log_format: LogFormat,
    /// Attempts per command before an append race is reported as a conflict.
    pub dispatch_attempts: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            log_format: LogFormat::default(),
            dispatch_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl AppConfig {
    /// Read the process environment. Unset or blank variables take their
    /// defaults; set but unparseable ones are an error.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Same as [`Self::from_env`] over an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        let bind_raw = get(BIND_ADDR_VAR).unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_raw
            .trim()
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::invalid(BIND_ADDR_VAR, &bind_raw, e.to_string()))?;

        let log_format = match get(LOG_FORMAT_VAR) {
            Some(raw) => raw
                .parse::<LogFormat>()
                .map_err(|e| ConfigError::invalid(LOG_FORMAT_VAR, &raw, e))?,
            None => LogFormat::default(),
        };

        let dispatch_attempts = match get(DISPATCH_ATTEMPTS_VAR) {
            Some(raw) => match raw.trim().parse::<u32>() {
                Ok(n) if n >= 1 => n,
                Ok(_) => return Err(ConfigError::invalid(DISPATCH_ATTEMPTS_VAR, &raw, "must be at least 1")),
                Err(e) => return Err(ConfigError::invalid(DISPATCH_ATTEMPTS_VAR, &raw, e.to_string())),
            },
            None => DEFAULT_MAX_ATTEMPTS,
        };

        Ok(Self {
            bind_addr,
            log_format,
            dispatch_attempts,
        })
    }
}
