//! Configuration Module
//!
//! Handles loading cache and server configuration from environment variables.
//! All values are fixed at construction; there is no dynamic reconfiguration.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Cache and server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding the persistent tier's files
    pub cache_dir: PathBuf,
    /// Maximum number of entries the memory tier can hold
    pub memory_capacity: usize,
    /// Default TTL in seconds for the memory tier (0 = never expires)
    pub memory_default_ttl: u64,
    /// Default TTL in seconds for the persistent tier (0 = never expires)
    pub persistent_default_ttl: u64,
    /// Whether a persistent hit rewrites its file with updated access stats
    pub persistent_record_access: bool,
    /// Background sweep interval in seconds
    pub sweep_interval: u64,
    /// HTTP server port
    pub server_port: u16,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_DIR` - Persistent tier directory (default: `cache`)
    /// - `MEMORY_CAPACITY` - Maximum memory entries (default: 1000)
    /// - `MEMORY_DEFAULT_TTL` - Memory tier TTL in seconds (default: 3600)
    /// - `PERSISTENT_DEFAULT_TTL` - Persistent tier TTL in seconds (default: 86400)
    /// - `PERSISTENT_RECORD_ACCESS` - Rewrite files on hit (default: true)
    /// - `SWEEP_INTERVAL` - Sweep frequency in seconds (default: 300)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            cache_dir: env::var("CACHE_DIR")
                .ok()
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.cache_dir),
            memory_capacity: parse_var("MEMORY_CAPACITY").unwrap_or(defaults.memory_capacity),
            memory_default_ttl: parse_var("MEMORY_DEFAULT_TTL")
                .unwrap_or(defaults.memory_default_ttl),
            persistent_default_ttl: parse_var("PERSISTENT_DEFAULT_TTL")
                .unwrap_or(defaults.persistent_default_ttl),
            persistent_record_access: parse_var("PERSISTENT_RECORD_ACCESS")
                .unwrap_or(defaults.persistent_record_access),
            sweep_interval: parse_var("SWEEP_INTERVAL").unwrap_or(defaults.sweep_interval),
            server_port: parse_var("SERVER_PORT").unwrap_or(defaults.server_port),
        }
    }

    /// Returns the sweep interval as a Duration, never shorter than one second.
    pub fn sweep_period(&self) -> Duration {
        Duration::from_secs(self.sweep_interval.max(1))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("cache"),
            memory_capacity: 1000,
            memory_default_ttl: 3600,
            persistent_default_ttl: 86_400,
            persistent_record_access: true,
            sweep_interval: 300,
            server_port: 3000,
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.cache_dir, PathBuf::from("cache"));
        assert_eq!(config.memory_capacity, 1000);
        assert_eq!(config.memory_default_ttl, 3600);
        assert_eq!(config.persistent_default_ttl, 86_400);
        assert!(config.persistent_record_access);
        assert_eq!(config.sweep_interval, 300);
        assert_eq!(config.server_port, 3000);
    }

    #[test]
    fn test_config_from_env_defaults() {
        // Clear any existing env vars to test defaults
        for name in [
            "CACHE_DIR",
            "MEMORY_CAPACITY",
            "MEMORY_DEFAULT_TTL",
            "PERSISTENT_DEFAULT_TTL",
            "PERSISTENT_RECORD_ACCESS",
            "SWEEP_INTERVAL",
            "SERVER_PORT",
        ] {
            env::remove_var(name);
        }

        let config = Config::from_env();
        assert_eq!(config.memory_capacity, 1000);
        assert_eq!(config.memory_default_ttl, 3600);
        assert_eq!(config.persistent_default_ttl, 86_400);
        assert_eq!(config.sweep_interval, 300);
        assert_eq!(config.server_port, 3000);
    }

    #[test]
    fn test_sweep_period_floor() {
        let config = Config {
            sweep_interval: 0,
            ..Config::default()
        };
        assert_eq!(config.sweep_period(), Duration::from_secs(1));
    }
}
