//! Configuration for the cache system

use crate::error::{CacheError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Configuration for the query cache
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// When false the cache is a pure passthrough
    pub enabled: bool,

    /// Time-to-live measured from entry creation
    #[serde(rename = "ttl_seconds", with = "duration_secs")]
    pub ttl: Duration,

    /// Maximum number of entries in the cache
    pub max_entries: usize,

    /// How many entries the stats report lists
    pub top_entries: usize,

    /// Run a background sweep of expired entries
    pub enable_auto_cleanup: bool,

    /// Interval for the background sweep
    #[serde(rename = "cleanup_interval_seconds", with = "duration_secs")]
    pub cleanup_interval: Duration,

    /// Upper bound an invalidation hook waits for the store lock
    #[serde(rename = "invalidation_timeout_ms", with = "duration_millis")]
    pub invalidation_timeout: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            // 1 hour
            ttl: Duration::from_secs(3600),
            max_entries: 1_000,
            top_entries: 10,
            enable_auto_cleanup: false,
            // Sweep every 5 minutes
            cleanup_interval: Duration::from_secs(300),
            invalidation_timeout: Duration::from_secs(2),
        }
    }
}

impl CacheConfig {
    /// Create a new builder for cache configuration
    pub fn builder() -> CacheConfigBuilder {
        CacheConfigBuilder::default()
    }

    /// A configuration with caching turned off
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.ttl.is_zero() {
            return Err(CacheError::ConfigError(
                "ttl must be greater than 0".to_string(),
            ));
        }

        if self.max_entries == 0 {
            return Err(CacheError::ConfigError(
                "max_entries must be greater than 0".to_string(),
            ));
        }

        if self.top_entries == 0 {
            return Err(CacheError::ConfigError(
                "top_entries must be greater than 0".to_string(),
            ));
        }

        if self.enable_auto_cleanup && self.cleanup_interval.is_zero() {
            return Err(CacheError::ConfigError(
                "cleanup_interval must be greater than 0 when auto cleanup is enabled".to_string(),
            ));
        }

        if self.invalidation_timeout.is_zero() {
            return Err(CacheError::ConfigError(
                "invalidation_timeout must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Load configuration from the environment (and a `.env` file if present)
    ///
    /// Recognized variables: `CACHE_ENABLED`, `CACHE_TTL_SECONDS`,
    /// `CACHE_MAX_SIZE`, `CACHE_TOP_ENTRIES`, `CACHE_AUTO_CLEANUP`,
    /// `CACHE_CLEANUP_INTERVAL_SECONDS`, `CACHE_INVALIDATION_TIMEOUT_MS`.
    /// Unset variables keep their defaults.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = Self::builder();

        if let Some(raw) = lookup("CACHE_ENABLED") {
            builder = builder.enabled(parse_bool("CACHE_ENABLED", &raw)?);
        }
        if let Some(raw) = lookup("CACHE_TTL_SECONDS") {
            builder = builder.ttl(Duration::from_secs(parse_number("CACHE_TTL_SECONDS", &raw)?));
        }
        if let Some(raw) = lookup("CACHE_MAX_SIZE") {
            builder = builder.max_entries(parse_number("CACHE_MAX_SIZE", &raw)?);
        }
        if let Some(raw) = lookup("CACHE_TOP_ENTRIES") {
            builder = builder.top_entries(parse_number("CACHE_TOP_ENTRIES", &raw)?);
        }
        if let Some(raw) = lookup("CACHE_AUTO_CLEANUP") {
            builder = builder.enable_auto_cleanup(parse_bool("CACHE_AUTO_CLEANUP", &raw)?);
        }
        if let Some(raw) = lookup("CACHE_CLEANUP_INTERVAL_SECONDS") {
            builder = builder.cleanup_interval(Duration::from_secs(parse_number(
                "CACHE_CLEANUP_INTERVAL_SECONDS",
                &raw,
            )?));
        }
        if let Some(raw) = lookup("CACHE_INVALIDATION_TIMEOUT_MS") {
            builder = builder.invalidation_timeout(Duration::from_millis(parse_number(
                "CACHE_INVALIDATION_TIMEOUT_MS",
                &raw,
            )?));
        }

        let config = builder.build();
        config.validate()?;
        Ok(config)
    }
}

fn parse_number<T: FromStr>(name: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| CacheError::ConfigError(format!("{} is not a valid number: {:?}", name, raw)))
}

fn parse_bool(name: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(CacheError::ConfigError(format!(
            "{} is not a valid boolean: {:?}",
            name, raw
        ))),
    }
}

/// Durations as whole seconds, matching the `*_SECONDS` variables
mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

/// Builder for cache configuration
#[derive(Debug, Default)]
pub struct CacheConfigBuilder {
    enabled: Option<bool>,
    ttl: Option<Duration>,
    max_entries: Option<usize>,
    top_entries: Option<usize>,
    enable_auto_cleanup: Option<bool>,
    cleanup_interval: Option<Duration>,
    invalidation_timeout: Option<Duration>,
}

impl CacheConfigBuilder {
    /// Turn caching on or off
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    /// Set TTL for cache entries
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Set maximum number of cache entries
    pub fn max_entries(mut self, max: usize) -> Self {
        self.max_entries = Some(max);
        self
    }

    /// Set how many entries the stats report lists
    pub fn top_entries(mut self, count: usize) -> Self {
        self.top_entries = Some(count);
        self
    }

    /// Enable or disable the background sweep
    pub fn enable_auto_cleanup(mut self, enable: bool) -> Self {
        self.enable_auto_cleanup = Some(enable);
        self
    }

    /// Set cleanup interval
    pub fn cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = Some(interval);
        self
    }

    /// Set how long invalidation hooks wait for the store
    pub fn invalidation_timeout(mut self, timeout: Duration) -> Self {
        self.invalidation_timeout = Some(timeout);
        self
    }

    /// Build the cache configuration
    pub fn build(self) -> CacheConfig {
        let defaults = CacheConfig::default();

        CacheConfig {
            enabled: self.enabled.unwrap_or(defaults.enabled),
            ttl: self.ttl.unwrap_or(defaults.ttl),
            max_entries: self.max_entries.unwrap_or(defaults.max_entries),
            top_entries: self.top_entries.unwrap_or(defaults.top_entries),
            enable_auto_cleanup: self
                .enable_auto_cleanup
                .unwrap_or(defaults.enable_auto_cleanup),
            cleanup_interval: self.cleanup_interval.unwrap_or(defaults.cleanup_interval),
            invalidation_timeout: self
                .invalidation_timeout
                .unwrap_or(defaults.invalidation_timeout),
        }
    }
}
