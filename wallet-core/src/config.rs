//! Configuration for the wallet cores

use record_store::StoreConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Wallet configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Service name
    pub service_name: String,

    /// Record store configuration
    pub store: StoreConfig,

    /// Conflict retry policy
    pub retry: RetryConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_name: "wallet-core".to_string(),
            store: StoreConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

/// Retry policy for optimistic commit conflicts
///
/// Conflicts are expected to be rare and each retry is one cheap
/// read-validate-commit cycle; the ceiling only guards against livelock
/// under pathological contention.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum commit attempts before surfacing a transient-conflict error
    pub max_attempts: u32,

    /// Base backoff between attempts (milliseconds)
    pub backoff_base_ms: u64,

    /// Backoff cap (milliseconds)
    pub backoff_cap_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 25,
            backoff_base_ms: 1,
            backoff_cap_ms: 50,
        }
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::Error::Config(format!("Failed to read config: {}", e)))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();

        if let Ok(data_dir) = std::env::var("WALLET_DATA_DIR") {
            config.store.data_dir = PathBuf::from(data_dir);
        }

        if let Ok(attempts) = std::env::var("WALLET_MAX_COMMIT_ATTEMPTS") {
            config.retry.max_attempts = attempts
                .parse()
                .map_err(|e| crate::Error::Config(format!("Bad WALLET_MAX_COMMIT_ATTEMPTS: {}", e)))?;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.service_name, "wallet-core");
        assert_eq!(config.retry.max_attempts, 25);
        assert!(config.retry.backoff_base_ms <= config.retry.backoff_cap_ms);
    }

    #[test]
    fn test_roundtrip_toml() {
        let config = Config::default();
        let text = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.service_name, config.service_name);
        assert_eq!(parsed.retry.max_attempts, config.retry.max_attempts);
    }
}
