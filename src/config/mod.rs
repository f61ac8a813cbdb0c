use serde::{Deserialize, Serialize};

/// Error type for configuration loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Streaming translator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Seconds of upstream silence before a keep-alive frame is written.
    #[serde(default = "default_keepalive_secs")]
    pub keepalive_secs: u64,
    /// Bounded capacity of the outbound event channel; a full channel
    /// blocks the upstream read loop (transport backpressure).
    #[serde(default = "default_sink_capacity")]
    pub sink_capacity: usize,
}

fn default_keepalive_secs() -> u64 {
    15
}
fn default_sink_capacity() -> usize {
    32
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            keepalive_secs: default_keepalive_secs(),
            sink_capacity: default_sink_capacity(),
        }
    }
}

/// Feature flags and settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeaturesConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "INFO".to_string()
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub stream: StreamConfig,
    #[serde(default)]
    pub features: FeaturesConfig,
}

/// Load configuration from a YAML file and validate it.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] when reading the file fails, [`ConfigError::Yaml`]
/// when parsing fails, or [`ConfigError::Validation`] when semantic validation fails.
pub fn load_config(path: &str) -> Result<AppConfig, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    let config: AppConfig = serde_yaml::from_str(&contents)?;
    validate_config(&config)?;
    Ok(config)
}

fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    if config.stream.keepalive_secs == 0 {
        return Err(ConfigError::Validation(
            "stream.keepalive_secs must be at least 1".into(),
        ));
    }
    if config.stream.sink_capacity == 0 {
        return Err(ConfigError::Validation(
            "stream.sink_capacity must be at least 1".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_example_config() {
        let config = load_config("config.example.yaml");
        assert!(
            config.is_ok(),
            "Failed to load example config: {:?}",
            config.err()
        );
        let config = config.unwrap();
        assert_eq!(config.stream.keepalive_secs, 15);
        assert_eq!(config.stream.sink_capacity, 32);
        assert_eq!(config.features.log_level, "INFO");
    }

    #[test]
    fn test_defaults_for_empty_document() {
        let config: AppConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.stream.keepalive_secs, 15);
        assert_eq!(config.features.log_level, "INFO");
    }

    #[test]
    fn test_zero_keepalive_rejected() {
        let config: AppConfig = serde_yaml::from_str("stream:\n  keepalive_secs: 0\n").unwrap();
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::Validation(_))
        ));
    }
}
