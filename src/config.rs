//! Configuration management for Marginalia

use std::env;
use std::time::Duration;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub anchor: AnchorConfig,
    pub session: SessionConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Upper bound on uploaded documents and import files
    pub max_document_bytes: usize,
}

/// How annotations are stored on document elements and found again
#[derive(Debug, Clone, Deserialize)]
pub struct AnchorConfig {
    /// Attribute holding the annotation id
    pub id_attribute: String,
    /// Attribute holding the creation timestamp
    pub timestamp_attribute: String,
    /// Attribute holding the optional comment
    pub comment_attribute: String,
    /// Suffix left by truncating extraction
    pub truncation_marker: String,
    /// A truncated prefix must be longer than this many characters to be searched
    pub min_truncated_prefix: usize,
    /// Whether text search distinguishes letter case
    pub case_sensitive: bool,
    /// Draws of a temporary marker color before accepting a collision
    pub marker_attempts: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Wait after a selection is released before reading it
    pub settle_delay_ms: u64,
}

impl SessionConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

impl Default for AnchorConfig {
    fn default() -> Self {
        Self {
            id_attribute: "data-annotation-id".to_string(),
            timestamp_attribute: "data-timestamp".to_string(),
            comment_attribute: "data-comment".to_string(),
            truncation_marker: "...".to_string(),
            min_truncated_prefix: 15,
            case_sensitive: false,
            marker_attempts: 16,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { settle_delay_ms: 10 }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
                max_document_bytes: 10 * 1024 * 1024,
            },
            anchor: AnchorConfig::default(),
            session: SessionConfig::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Config::default();

        Ok(Config {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or(defaults.server.host),
                port: parse_var("SERVER_PORT", defaults.server.port)?,
                max_document_bytes: parse_var(
                    "MARGINALIA_MAX_DOCUMENT_BYTES",
                    defaults.server.max_document_bytes,
                )?,
            },
            anchor: AnchorConfig {
                case_sensitive: parse_var("MARGINALIA_CASE_SENSITIVE", defaults.anchor.case_sensitive)?,
                ..defaults.anchor
            },
            session: SessionConfig {
                settle_delay_ms: parse_var(
                    "MARGINALIA_SETTLE_DELAY_MS",
                    defaults.session.settle_delay_ms,
                )?,
            },
        })
    }
}

/// Invalid environment configuration
#[derive(Debug, thiserror::Error)]
#[error("Invalid value for {name}: {value:?}")]
pub struct ConfigError {
    pub name: &'static str,
    pub value: String,
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value.trim().parse().map_err(|_| ConfigError { name, value }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_anchor_config() {
        let config = AnchorConfig::default();
        assert_eq!(config.id_attribute, "data-annotation-id");
        assert_eq!(config.truncation_marker, "...");
        assert_eq!(config.min_truncated_prefix, 15);
        assert!(!config.case_sensitive);
    }

    #[test]
    fn test_parse_var_falls_back_to_default() {
        let value: u16 = parse_var("MARGINALIA_TEST_UNSET_VARIABLE", 42).unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn test_settle_delay() {
        assert_eq!(SessionConfig::default().settle_delay(), Duration::from_millis(10));
    }
}
