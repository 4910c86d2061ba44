//! Relay connection configuration.

use std::time::Duration;

use thiserror::Error;

pub const ENV_CONNECT_TIMEOUT_MS: &str = "NOSTRAIN_CONNECT_TIMEOUT_MS";
pub const ENV_PUBLISH_TIMEOUT_MS: &str = "NOSTRAIN_PUBLISH_TIMEOUT_MS";
pub const ENV_VERIFY_EVENTS: &str = "NOSTRAIN_VERIFY_EVENTS";
pub const ENV_MATCH_FILTERS: &str = "NOSTRAIN_MATCH_FILTERS";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name}: invalid value {value:?}: {reason}")]
    InvalidValue {
        name: String,
        value: String,
        reason: String,
    },
}

/// Relay connection configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    /// Time allowed for the transport handshake.
    pub connect_timeout: Duration,
    /// Default deadline for publications; `None` waits for the relay forever.
    pub publish_timeout: Option<Duration>,
    /// Drop events whose id or signature does not verify.
    pub verify_events: bool,
    /// Drop events that do not match the subscription's own filters.
    pub match_filters: bool,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            publish_timeout: Some(Duration::from_secs(10)),
            verify_events: true,
            match_filters: false,
        }
    }
}

impl RelayConfig {
    /// Defaults overridden by `NOSTRAIN_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each variable.
    ///
    /// A publish timeout of `0` disables the publication deadline.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup(ENV_CONNECT_TIMEOUT_MS) {
            config.connect_timeout = Duration::from_millis(parse_millis(ENV_CONNECT_TIMEOUT_MS, &value)?);
        }
        if let Some(value) = lookup(ENV_PUBLISH_TIMEOUT_MS) {
            config.publish_timeout = match parse_millis(ENV_PUBLISH_TIMEOUT_MS, &value)? {
                0 => None,
                millis => Some(Duration::from_millis(millis)),
            };
        }
        if let Some(value) = lookup(ENV_VERIFY_EVENTS) {
            config.verify_events = parse_bool(ENV_VERIFY_EVENTS, &value)?;
        }
        if let Some(value) = lookup(ENV_MATCH_FILTERS) {
            config.match_filters = parse_bool(ENV_MATCH_FILTERS, &value)?;
        }

        Ok(config)
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_publish_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.publish_timeout = timeout;
        self
    }

    pub fn with_verify_events(mut self, verify: bool) -> Self {
        self.verify_events = verify;
        self
    }

    pub fn with_match_filters(mut self, match_filters: bool) -> Self {
        self.match_filters = match_filters;
        self
    }
}

fn parse_millis(name: &str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        name: name.to_string(),
        value: value.to_string(),
        reason: "expected a whole number of milliseconds".to_string(),
    })
}

fn parse_bool(name: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            name: name.to_string(),
            value: value.to_string(),
            reason: "expected true or false".to_string(),
        }),
    }
}
