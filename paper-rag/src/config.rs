//! Service configuration read from the environment

use anyhow::{bail, Context, Result};
use paper_cache::CacheConfig;
use serde::{Deserialize, Serialize};

/// Effective configuration of the QA service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Address the HTTP API binds to
    pub host: String,
    pub port: u16,

    /// Number of chunks retrieved when a query does not say
    pub default_top_k: usize,

    /// Largest `top_k` a query may ask for
    pub max_top_k: usize,

    pub cache: CacheConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            default_top_k: 5,
            max_top_k: 20,
            cache: CacheConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load `.env`, then read `API_HOST`, `API_PORT`, `TOP_K_RESULTS`,
    /// `MAX_TOP_K` and the `CACHE_*` variables
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self {
            cache: CacheConfig::from_lookup(&lookup).context("Invalid cache configuration")?,
            ..Default::default()
        };

        if let Some(host) = lookup("API_HOST") {
            config.host = host;
        }
        if let Some(raw) = lookup("API_PORT") {
            config.port = raw
                .trim()
                .parse()
                .with_context(|| format!("API_PORT is not a valid port: {:?}", raw))?;
        }
        if let Some(raw) = lookup("TOP_K_RESULTS") {
            config.default_top_k = raw
                .trim()
                .parse()
                .with_context(|| format!("TOP_K_RESULTS is not a valid number: {:?}", raw))?;
        }
        if let Some(raw) = lookup("MAX_TOP_K") {
            config.max_top_k = raw
                .trim()
                .parse()
                .with_context(|| format!("MAX_TOP_K is not a valid number: {:?}", raw))?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_top_k == 0 {
            bail!("MAX_TOP_K must be at least 1");
        }
        if self.default_top_k == 0 || self.default_top_k > self.max_top_k {
            bail!(
                "TOP_K_RESULTS must be between 1 and {}, got {}",
                self.max_top_k,
                self.default_top_k
            );
        }
        self.cache.validate()?;
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::time::Duration;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_lookup(lookup_from(&[])).unwrap();

        assert_eq!(config.bind_address(), "0.0.0.0:8000");
        assert_eq!(config.default_top_k, 5);
        assert_eq!(config.max_top_k, 20);
        assert!(config.cache.enabled);
    }

    #[test]
    fn test_overrides() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("API_HOST", "127.0.0.1"),
            ("API_PORT", "9000"),
            ("TOP_K_RESULTS", "8"),
            ("CACHE_TTL_SECONDS", "120"),
            ("CACHE_ENABLED", "false"),
        ]))
        .unwrap();

        assert_eq!(config.bind_address(), "127.0.0.1:9000");
        assert_eq!(config.default_top_k, 8);
        assert_eq!(config.cache.ttl, Duration::from_secs(120));
        assert!(!config.cache.enabled);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(AppConfig::from_lookup(lookup_from(&[("API_PORT", "http")])).is_err());
        assert!(AppConfig::from_lookup(lookup_from(&[("TOP_K_RESULTS", "50")])).is_err());
        assert!(AppConfig::from_lookup(lookup_from(&[("CACHE_MAX_SIZE", "0")])).is_err());
    }

    #[test]
    fn test_printed_config_uses_variable_units() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("CACHE_TTL_SECONDS", "900"),
            ("CACHE_CLEANUP_INTERVAL_SECONDS", "45"),
        ]))
        .unwrap();

        let printed: serde_json::Value =
            serde_json::from_str(&serde_json::to_string_pretty(&config).unwrap()).unwrap();
        assert_eq!(printed["cache"]["ttl_seconds"], 900);
        assert_eq!(printed["cache"]["cleanup_interval_seconds"], 45);
        assert_eq!(printed["cache"]["invalidation_timeout_ms"], 2000);
    }
}
