//! Configuration loading and management for newsbrief.
//!
//! Loads settings from `newsbrief.toml` with environment variable overrides for sensitive data.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("missing GEMINI_API_KEY (set it in the environment or in newsbrief.toml)")]
    MissingApiKey,
}

/// Generative backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Primary model identifier
    #[serde(default = "default_primary_model")]
    pub primary_model: String,
    /// Older model identifier used as a fallback
    #[serde(default = "default_secondary_model")]
    pub secondary_model: String,
    /// Minimum interval between backend calls, in milliseconds
    #[serde(default = "default_min_interval_ms")]
    pub min_interval_ms: u64,
}

/// Article fetching configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// HTTP request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Minimum extracted length for a result to count as article text
    #[serde(default = "default_min_content_len")]
    pub min_content_len: usize,
}

/// API keys configuration (loaded from environment)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ApiConfig {
    #[serde(default)]
    pub gemini_key: Option<String>,
}

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

fn default_primary_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_secondary_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_min_interval_ms() -> u64 {
    1_000
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_min_content_len() -> usize {
    80
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            primary_model: default_primary_model(),
            secondary_model: default_secondary_model(),
            min_interval_ms: default_min_interval_ms(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            min_content_len: default_min_content_len(),
        }
    }
}

impl Config {
    /// Load configuration from the default location (newsbrief.toml in cwd or home).
    ///
    /// A missing config file is not an error; defaults apply and the API key
    /// can come from the environment alone.
    pub fn load() -> Result<Self, ConfigError> {
        match Self::find_config_file() {
            Some(path) => Self::load_from(&path),
            None => {
                let mut config = Config::default();
                config.apply_env_overrides();
                Ok(config)
            }
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &PathBuf) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Override API keys from environment variables
    fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var("GEMINI_API_KEY") {
            self.api.gemini_key = Some(key);
        }
    }

    /// Find the config file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        // Check current directory first
        let local_config = PathBuf::from("newsbrief.toml");
        if local_config.exists() {
            return Some(local_config);
        }

        // Check home directory
        if let Some(home) = dirs::home_dir() {
            let home_config = home
                .join(".config")
                .join("newsbrief")
                .join("newsbrief.toml");
            if home_config.exists() {
                return Some(home_config);
            }
        }

        None
    }

    /// Get the backend API key
    pub fn api_key(&self) -> Result<&str, ConfigError> {
        self.api
            .gemini_key
            .as_deref()
            .ok_or(ConfigError::MissingApiKey)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.agent.primary_model, "gemini-2.5-flash");
        assert_eq!(config.agent.secondary_model, "gemini-2.0-flash");
        assert_eq!(config.agent.min_interval_ms, 1_000);
        assert_eq!(config.fetch.timeout_secs, 10);
        assert_eq!(config.fetch.min_content_len, 80);
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let config: Config = toml::from_str(
            r#"
            [agent]
            primary_model = "gemini-2.5-pro"
            "#,
        )
        .unwrap();
        assert_eq!(config.agent.primary_model, "gemini-2.5-pro");
        assert_eq!(config.agent.secondary_model, "gemini-2.0-flash");
        assert_eq!(config.fetch.min_content_len, 80);
    }

    #[test]
    fn missing_key_is_a_config_error() {
        let config = Config {
            api: ApiConfig { gemini_key: None },
            ..Config::default()
        };
        assert!(matches!(config.api_key(), Err(ConfigError::MissingApiKey)));
    }
}
