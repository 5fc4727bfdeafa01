//! Configuration Module
//!
//! Handles loading and validating cache configuration from environment variables.

use std::env;
use std::fmt;
use std::str::FromStr;

use crate::error::{CacheError, Result};

/// Default store byte budget: 512 MiB.
pub const DEFAULT_MAX_SIZE: u64 = 512 << 20;

/// Default cache identifier reported in `Cache-Status`.
pub const DEFAULT_CACHE_NAME: &str = "MiniHttpCache";

/// Network topology of the backing store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreEnv {
    /// Single process, loopback only
    #[default]
    Local,
    /// Members on the same local network
    Lan,
    /// Members spread over a wide-area network
    Wan,
}

impl FromStr for StoreEnv {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "local" => Ok(StoreEnv::Local),
            "lan" => Ok(StoreEnv::Lan),
            "wan" => Ok(StoreEnv::Wan),
            other => Err(CacheError::Config(format!(
                "unknown store environment '{}': available environments are local, lan and wan",
                other
            ))),
        }
    }
}

impl fmt::Display for StoreEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StoreEnv::Local => "local",
            StoreEnv::Lan => "lan",
            StoreEnv::Wan => "wan",
        };
        f.write_str(name)
    }
}

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Maximum number of bytes the store may hold
    pub max_size: u64,
    /// TTL in seconds for responses without explicit freshness; 0 disables it
    pub default_ttl: u64,
    /// Whether POST requests are cache candidates
    pub cache_post: bool,
    /// Identifier written at the start of every `Cache-Status` value
    pub cache_name: String,
    /// Store topology
    pub store_env: StoreEnv,
    /// HTTP server port
    pub server_port: u16,
    /// Background cleanup task interval in seconds
    pub cleanup_interval: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `MAX_SIZE` - Store byte budget (default: 512 MiB)
    /// - `DEFAULT_TTL` - Fallback TTL in seconds (default: 0)
    /// - `CACHE_POST` - Cache POST requests (default: true)
    /// - `CACHE_NAME` - Cache-Status identifier (default: MiniHttpCache)
    /// - `STORE_ENV` - local, lan or wan (default: local)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CLEANUP_INTERVAL` - Cleanup frequency in seconds (default: 1)
    ///
    /// Unparseable numbers fall back to their defaults; an unknown
    /// `STORE_ENV` is an error.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let store_env = match env::var("STORE_ENV") {
            Ok(value) => value.parse()?,
            Err(_) => defaults.store_env,
        };

        Ok(Self {
            max_size: parse_var("MAX_SIZE").unwrap_or(defaults.max_size),
            default_ttl: parse_var("DEFAULT_TTL").unwrap_or(defaults.default_ttl),
            cache_post: parse_var("CACHE_POST").unwrap_or(defaults.cache_post),
            cache_name: env::var("CACHE_NAME").unwrap_or(defaults.cache_name),
            store_env,
            server_port: parse_var("SERVER_PORT").unwrap_or(defaults.server_port),
            cleanup_interval: parse_var("CLEANUP_INTERVAL").unwrap_or(defaults.cleanup_interval),
        })
    }

    /// Checks the semantic constraints that parsing alone cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.max_size == 0 {
            return Err(CacheError::Config(
                "max_size must be greater than 0".to_string(),
            ));
        }
        if self.cleanup_interval == 0 {
            return Err(CacheError::Config(
                "cleanup_interval must be greater than 0".to_string(),
            ));
        }
        if self.cache_name.trim().is_empty() {
            return Err(CacheError::Config("cache_name cannot be empty".to_string()));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_MAX_SIZE,
            default_ttl: 0,
            cache_post: true,
            cache_name: DEFAULT_CACHE_NAME.to_string(),
            store_env: StoreEnv::Local,
            server_port: 3000,
            cleanup_interval: 1,
        }
    }
}

fn parse_var<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}
