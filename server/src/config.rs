//! Server and policy configuration.
//!
//! This module provides configuration loading for the lagstore server from
//! environment variables, plus the flat key-value maps that pluggable
//! policies are built from.
//!
//! # Environment Variables
//!
//! - `LAGSTORE_LISTEN_PORT`: Port to listen on (default: `3000`)
//! - `LAGSTORE_SHARDS`: Number of shards (default: `1`)
//! - `LAGSTORE_REPLICAS`: Replica nodes per shard (default: `3`)
//! - `LAGSTORE_STALENESS`: Staleness policy map
//!   (default: `class=constant;ownReads=0;foreignReads=500`)
//! - `LAGSTORE_REPLICATION_DELAY`: Replication delay policy map
//!   (default: `class=constant;defaultDelay=0`)
//! - `LAGSTORE_CLIENT_DELAY`: Client delay policy map (default: `class=none`)
//! - `LAGSTORE_SHARDING`: Sharding strategy map (default: `class=hash`)
//! - `LAGSTORE_BLOCK_ON_REPLICATION`: Whether writes block for the
//!   replication delay (default: `true`)
//! - `LAGSTORE_CLOCK`: `real` or `virtual` (default: `real`)
//!
//! # Policy maps
//!
//! A policy map is written `class=<kind>;key=value;...`. The `class` entry
//! is the discriminator the [`PolicyRegistry`](crate::registry::PolicyRegistry)
//! resolves; every other entry is a typed parameter of that policy.
//!
//! # Invariants
//!
//! - `listen_port` is always a valid port number (1-65535)
//! - `shards` and `replicas` are at least 1

use std::collections::BTreeMap;
use std::str::FromStr;

/// Error returned when loading configuration or building a policy fails.
///
/// Every variant is fatal at startup; none occurs at request time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment variable has an invalid value.
    InvalidValue { name: String, message: String },
    /// A policy map has no `class` entry.
    MissingClass { policy: String },
    /// A policy map names a class the registry does not know.
    UnknownClass { policy: String, class: String },
    /// A policy parameter is required but absent.
    MissingParameter { class: String, name: String },
    /// A policy parameter could not be parsed or is out of range.
    InvalidParameter {
        class: String,
        name: String,
        message: String,
    },
    /// The sharding strategy and the shard list disagree.
    ShardCountMismatch { expected: usize, actual: usize },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue { name, message } => {
                write!(f, "invalid value for {name}: {message}")
            }
            Self::MissingClass { policy } => {
                write!(f, "{policy} configuration has no 'class' entry")
            }
            Self::UnknownClass { policy, class } => {
                write!(f, "unknown {policy} class '{class}'")
            }
            Self::MissingParameter { class, name } => {
                write!(f, "'{class}' requires parameter '{name}'")
            }
            Self::InvalidParameter {
                class,
                name,
                message,
            } => write!(f, "invalid parameter '{name}' for '{class}': {message}"),
            Self::ShardCountMismatch { expected, actual } => write!(
                f,
                "sharding strategy expects {expected} shards but {actual} were configured"
            ),
        }
    }
}

impl std::error::Error for ConfigError {}

/// A flat key-value policy configuration with a `class` discriminator.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PolicyConfig {
    entries: BTreeMap<String, String>,
}

impl PolicyConfig {
    /// The discriminator key.
    pub const CLASS: &'static str = "class";

    /// Parse `key=value` pairs separated by `;`.
    ///
    /// Whitespace around keys and values is trimmed; empty segments are
    /// ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if a segment has no `=`.
    pub fn parse(name: &str, text: &str) -> Result<Self, ConfigError> {
        let mut entries = BTreeMap::new();
        for segment in text.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            let Some((key, value)) = segment.split_once('=') else {
                return Err(ConfigError::InvalidValue {
                    name: name.to_string(),
                    message: format!("'{segment}' is not a key=value pair"),
                });
            };
            entries.insert(key.trim().to_string(), value.trim().to_string());
        }
        Ok(Self { entries })
    }

    /// Return the config with `key` set, for chaining.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.entries.insert(key.into(), value.into());
        self
    }

    /// A config holding only a `class` entry.
    #[must_use]
    pub fn class_only(class: &str) -> Self {
        Self::default().with(Self::CLASS, class)
    }

    /// The discriminator.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingClass`] naming `policy` if absent.
    pub fn class(&self, policy: &str) -> Result<&str, ConfigError> {
        self.get(Self::CLASS)
            .ok_or_else(|| ConfigError::MissingClass {
                policy: policy.to_string(),
            })
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// A required parameter parsed as `T`.
    pub fn require<T>(&self, name: &str) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get(name) {
            Some(raw) => self.parse_value(name, raw),
            None => Err(ConfigError::MissingParameter {
                class: self.class_name(),
                name: name.to_string(),
            }),
        }
    }

    /// An optional parameter parsed as `T`, or `default` when absent.
    pub fn get_or<T>(&self, name: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.get(name)
            .map_or(Ok(default), |raw| self.parse_value(name, raw))
    }

    /// A required comma-separated list. Items are trimmed; empty items are
    /// kept out.
    pub fn require_list(&self, name: &str) -> Result<Vec<String>, ConfigError> {
        let raw = self.get(name).ok_or_else(|| ConfigError::MissingParameter {
            class: self.class_name(),
            name: name.to_string(),
        })?;
        Ok(raw
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect())
    }

    fn parse_value<T>(&self, name: &str, raw: &str) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        raw.parse::<T>().map_err(|e| ConfigError::InvalidParameter {
            class: self.class_name(),
            name: name.to_string(),
            message: format!("'{raw}': {e}"),
        })
    }

    fn class_name(&self) -> String {
        self.get(Self::CLASS).unwrap_or("<none>").to_string()
    }
}

/// Which time source the server runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockKind {
    /// Wall-clock time; replication sleeps block.
    Real,
    /// A virtual clock that only advances on sleeps.
    Virtual,
}

/// Server configuration.
///
/// # Post-conditions
///
/// - `listen_port` is always in the valid range (1-65535)
/// - `shards >= 1` and `replicas >= 1`
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to listen on for WebSocket connections.
    pub listen_port: u16,
    /// Number of shards.
    pub shards: usize,
    /// Replica nodes per shard.
    pub replicas: usize,
    pub staleness: PolicyConfig,
    pub replication_delay: PolicyConfig,
    pub client_delay: PolicyConfig,
    pub sharding: PolicyConfig,
    /// Whether writes block the caller for the replication delay.
    pub block_on_replication: bool,
    pub clock: ClockKind,
}

impl ServerConfig {
    /// Default port for the server.
    pub const DEFAULT_PORT: u16 = 3000;
    pub const DEFAULT_SHARDS: usize = 1;
    pub const DEFAULT_REPLICAS: usize = 3;
    pub const DEFAULT_STALENESS: &'static str = "class=constant;ownReads=0;foreignReads=500";
    pub const DEFAULT_REPLICATION_DELAY: &'static str = "class=constant;defaultDelay=0";
    pub const DEFAULT_CLIENT_DELAY: &'static str = "class=none";
    pub const DEFAULT_SHARDING: &'static str = "class=hash";

    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if any variable is set but invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if any variable is set but invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let listen_port = Self::load_number(&lookup, "LAGSTORE_LISTEN_PORT", Self::DEFAULT_PORT)?;
        if listen_port == 0 {
            return Err(ConfigError::InvalidValue {
                name: "LAGSTORE_LISTEN_PORT".to_string(),
                message: "'0' is not a valid port number (must be 1-65535)".to_string(),
            });
        }
        let shards = Self::load_positive(&lookup, "LAGSTORE_SHARDS", Self::DEFAULT_SHARDS)?;
        let replicas = Self::load_positive(&lookup, "LAGSTORE_REPLICAS", Self::DEFAULT_REPLICAS)?;

        let staleness =
            Self::load_policy(&lookup, "LAGSTORE_STALENESS", Self::DEFAULT_STALENESS)?;
        let replication_delay = Self::load_policy(
            &lookup,
            "LAGSTORE_REPLICATION_DELAY",
            Self::DEFAULT_REPLICATION_DELAY,
        )?;
        let client_delay =
            Self::load_policy(&lookup, "LAGSTORE_CLIENT_DELAY", Self::DEFAULT_CLIENT_DELAY)?;
        let sharding = Self::load_policy(&lookup, "LAGSTORE_SHARDING", Self::DEFAULT_SHARDING)?;

        let block_on_replication =
            Self::load_number(&lookup, "LAGSTORE_BLOCK_ON_REPLICATION", true)?;
        let clock = match lookup("LAGSTORE_CLOCK").as_deref() {
            None | Some("real") => ClockKind::Real,
            Some("virtual") => ClockKind::Virtual,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    name: "LAGSTORE_CLOCK".to_string(),
                    message: format!("'{other}' is not one of 'real', 'virtual'"),
                });
            }
        };

        Ok(Self {
            listen_port,
            shards,
            replicas,
            staleness,
            replication_delay,
            client_delay,
            sharding,
            block_on_replication,
            clock,
        })
    }

    fn load_number<T>(
        lookup: &impl Fn(&str) -> Option<String>,
        name: &str,
        default: T,
    ) -> Result<T, ConfigError>
    where
        T: FromStr,
    {
        match lookup(name) {
            Some(value) => value.trim().parse::<T>().map_err(|_| ConfigError::InvalidValue {
                name: name.to_string(),
                message: format!("'{value}' could not be parsed"),
            }),
            None => Ok(default),
        }
    }

    fn load_positive(
        lookup: &impl Fn(&str) -> Option<String>,
        name: &str,
        default: usize,
    ) -> Result<usize, ConfigError> {
        let value = Self::load_number(lookup, name, default)?;
        if value == 0 {
            return Err(ConfigError::InvalidValue {
                name: name.to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        Ok(value)
    }

    fn load_policy(
        lookup: &impl Fn(&str) -> Option<String>,
        name: &str,
        default: &str,
    ) -> Result<PolicyConfig, ConfigError> {
        let text = lookup(name).unwrap_or_else(|| default.to_string());
        PolicyConfig::parse(name, &text)
    }
}
